//! Structured observability for sessions.
//!
//! Helpers never log ad hoc. They emit a [`ProbeEvent`] through the session's
//! [`EventSink`]; the default [`TracingSink`] turns events into `tracing`
//! records and [`RecordingSink`] keeps them for assertions.

use crate::wait::LoadState;
use serde::Serialize;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use uuid::Uuid;

/// Filter directives for [`init_tracing`] (falls back to `RUST_LOG`)
pub const LOG_ENV: &str = "PORTAL_PROBE_LOG";
/// Set to `json` for JSON log lines
pub const LOG_FORMAT_ENV: &str = "PORTAL_PROBE_LOG_FORMAT";

static INIT: OnceLock<()> = OnceLock::new();

/// Install the global subscriber. Later calls are no-ops, as is the first
/// one when another subscriber is already installed.
pub fn init_tracing() {
    INIT.get_or_init(|| {
        let directives = std::env::var(LOG_ENV)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| "info".to_string());
        let filter = EnvFilter::try_new(&directives).unwrap_or_else(|_| EnvFilter::new("info"));
        let json = std::env::var(LOG_FORMAT_ENV).is_ok_and(|v| v.eq_ignore_ascii_case("json"));

        let registry = tracing_subscriber::registry().with(filter);
        let installed = if json {
            registry.with(fmt::layer().json().with_target(false)).try_init()
        } else {
            registry
                .with(fmt::layer().with_target(false).with_test_writer())
                .try_init()
        };
        if installed.is_err() {
            tracing::debug!("global subscriber already installed");
        }
    });
}

/// Something worth recording about a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProbeEvent {
    /// Driver launched and start page ready
    SessionOpened { url: String, elapsed_ms: u64 },
    /// Explicit navigation finished
    Navigated { url: String, elapsed_ms: u64 },
    /// Executor action completed
    Action {
        action: String,
        query: String,
        elapsed_ms: u64,
    },
    /// Settle wait completed
    Settled { state: LoadState, elapsed_ms: u64 },
    /// Permissive helper turned a failure into a negative result
    Recovered { helper: String, error: String },
    /// Helper took its documented fallback path
    FallbackUsed { helper: String, fallback: String },
    /// Page and context released
    SessionClosed { elapsed_ms: u64 },
    /// Releasing a resource failed; the failure was swallowed
    ReleaseFailed { resource: String, error: String },
}

impl ProbeEvent {
    /// Stable event name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SessionOpened { .. } => "session_opened",
            Self::Navigated { .. } => "navigated",
            Self::Action { .. } => "action",
            Self::Settled { .. } => "settled",
            Self::Recovered { .. } => "recovered",
            Self::FallbackUsed { .. } => "fallback_used",
            Self::SessionClosed { .. } => "session_closed",
            Self::ReleaseFailed { .. } => "release_failed",
        }
    }
}

/// Receives session events
pub trait EventSink: Send + Sync {
    fn emit(&self, session_id: Uuid, event: &ProbeEvent);
}

/// Forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, session_id: Uuid, event: &ProbeEvent) {
        match event {
            ProbeEvent::SessionOpened { url, elapsed_ms } => {
                tracing::info!(%session_id, url = %url, elapsed_ms, "session opened");
            }
            ProbeEvent::Navigated { url, elapsed_ms } => {
                tracing::info!(%session_id, url = %url, elapsed_ms, "navigated");
            }
            ProbeEvent::Action {
                action,
                query,
                elapsed_ms,
            } => {
                tracing::debug!(%session_id, action = %action, query = %query, elapsed_ms, "action");
            }
            ProbeEvent::Settled { state, elapsed_ms } => {
                tracing::debug!(%session_id, state = %state, elapsed_ms, "settled");
            }
            ProbeEvent::Recovered { helper, error } => {
                tracing::debug!(%session_id, helper = %helper, error = %error, "recovered");
            }
            ProbeEvent::FallbackUsed { helper, fallback } => {
                tracing::info!(%session_id, helper = %helper, fallback = %fallback, "fallback used");
            }
            ProbeEvent::SessionClosed { elapsed_ms } => {
                tracing::info!(%session_id, elapsed_ms, "session closed");
            }
            ProbeEvent::ReleaseFailed { resource, error } => {
                tracing::warn!(%session_id, resource = %resource, error = %error, "release failed");
            }
        }
    }
}

/// Keeps every event in memory; clones share one buffer
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    events: Arc<Mutex<Vec<ProbeEvent>>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded events
    #[must_use]
    pub fn events(&self) -> Vec<ProbeEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Recorded event names, in order
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.events().iter().map(ProbeEvent::name).collect()
    }

    /// How many events carry `name`
    #[must_use]
    pub fn count(&self, name: &str) -> usize {
        self.events().iter().filter(|e| e.name() == name).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, session_id: Uuid, event: &ProbeEvent) {
        TracingSink.emit(session_id, event);
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event.clone());
    }
}
