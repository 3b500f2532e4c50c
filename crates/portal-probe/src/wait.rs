//! Wait Mechanisms
//!
//! Load states and bounded async polling used by the
//! executor's actionability waits and settle waits.

use crate::result::{ProbeError, ProbeResult};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

// =============================================================================
// CONSTANTS
// =============================================================================

/// Default timeout for settle waits (30 seconds)
pub const DEFAULT_WAIT_TIMEOUT_MS: u64 = 30_000;

/// Default timeout for actionability waits (5 seconds)
pub const DEFAULT_ACTION_TIMEOUT_MS: u64 = 5_000;

/// Network idle threshold (500ms without new resource entries)
pub const NETWORK_IDLE_THRESHOLD_MS: u64 = 500;

/// How long an action gets to start a navigation before the current
/// document is taken as the settled one
pub const NAVIGATION_GRACE_MS: u64 = 250;

// =============================================================================
// LOAD STATE
// =============================================================================

/// Page load states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadState {
    /// Wait for the `load` event to fire
    #[default]
    Load,
    /// Wait for `DOMContentLoaded` event
    DomContentLoaded,
    /// Wait for network to be idle (no requests for 500ms)
    NetworkIdle,
}

impl LoadState {
    /// Get the JavaScript event name for this load state
    #[must_use]
    pub const fn event_name(&self) -> &'static str {
        match self {
            Self::Load => "load",
            Self::DomContentLoaded => "DOMContentLoaded",
            Self::NetworkIdle => "networkidle",
        }
    }

    /// Whether reaching `self` also satisfies a wait for `other`.
    ///
    /// States are ordered `DomContentLoaded < Load < NetworkIdle`.
    #[must_use]
    pub const fn satisfies(&self, other: Self) -> bool {
        self.rank() >= other.rank()
    }

    const fn rank(self) -> u8 {
        match self {
            Self::DomContentLoaded => 0,
            Self::Load => 1,
            Self::NetworkIdle => 2,
        }
    }
}

impl std::fmt::Display for LoadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.event_name())
    }
}

// =============================================================================
// WAIT OPTIONS
// =============================================================================

/// Options for wait operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitOptions {
    /// Timeout in milliseconds
    pub timeout_ms: u64,
    /// Polling interval in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for WaitOptions {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: crate::locator::DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl WaitOptions {
    /// Create new wait options with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set timeout in milliseconds
    #[must_use]
    pub const fn with_timeout(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    /// Set polling interval in milliseconds
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    /// Get timeout as Duration
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Get poll interval as Duration
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

// =============================================================================
// WAIT RESULT
// =============================================================================

/// Outcome of a successful wait
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitResult {
    /// Time spent waiting
    pub elapsed: Duration,
    /// Number of polls performed
    pub polls: u32,
    /// What was waited for
    pub waited_for: String,
}

/// Poll `probe` until it yields `Some`, or fail with `Timeout`.
///
/// The probe runs at least once even with a zero timeout. Probe errors end the
/// wait immediately.
pub async fn poll_until<T, F, Fut>(
    options: WaitOptions,
    waited_for: &str,
    mut probe: F,
) -> ProbeResult<(T, WaitResult)>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProbeResult<Option<T>>>,
{
    let start = Instant::now();
    let deadline = start + options.timeout();
    let mut polls = 0u32;
    loop {
        polls += 1;
        if let Some(value) = probe().await? {
            return Ok((
                value,
                WaitResult {
                    elapsed: start.elapsed(),
                    polls,
                    waited_for: waited_for.to_string(),
                },
            ));
        }
        if Instant::now() >= deadline {
            return Err(ProbeError::Timeout {
                ms: options.timeout_ms,
                waited_for: waited_for.to_string(),
            });
        }
        tokio::time::sleep(options.poll_interval()).await;
    }
}

// =============================================================================
// DOCUMENT SETTLING
// =============================================================================

/// What a live page reports about its current document
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSnapshot {
    /// `performance.timeOrigin`; changes with every new document
    pub time_origin: f64,
    /// `document.readyState`
    pub ready_state: String,
    /// Resource timing entries so far
    pub resources: u64,
    /// `beforeunload` fired since the last action
    #[serde(default)]
    pub leaving: bool,
}

impl DocumentSnapshot {
    /// Whether the ready state satisfies `state` (network idle needs `complete`)
    #[must_use]
    pub fn reached(&self, state: LoadState) -> bool {
        match state {
            LoadState::DomContentLoaded => {
                matches!(self.ready_state.as_str(), "interactive" | "complete")
            }
            LoadState::Load | LoadState::NetworkIdle => self.ready_state == "complete",
        }
    }
}

/// Decides when a page has settled after an action that may navigate.
///
/// With a `previous_origin` the document that was current before the action
/// does not count until either a new document shows up or the grace window
/// passes without any sign of navigation. A missing snapshot (the execution
/// context went away) or a fired `beforeunload` marks a navigation in flight,
/// which cancels the grace window.
#[derive(Debug, Clone)]
pub struct SettleTracker {
    state: LoadState,
    previous_origin: Option<f64>,
    grace: Duration,
    navigated: bool,
    in_flight: bool,
    resources: Option<(u64, Duration)>,
}

impl SettleTracker {
    #[must_use]
    pub fn new(state: LoadState, previous_origin: Option<f64>, timeout: Duration) -> Self {
        Self {
            state,
            previous_origin,
            grace: Duration::from_millis(NAVIGATION_GRACE_MS).min(timeout),
            navigated: previous_origin.is_none(),
            in_flight: false,
            resources: None,
        }
    }

    /// Feed one observation taken `elapsed` into the wait; `true` once settled
    pub fn observe(&mut self, elapsed: Duration, snapshot: Option<&DocumentSnapshot>) -> bool {
        let Some(snapshot) = snapshot else {
            self.in_flight = true;
            self.resources = None;
            return false;
        };
        if !self.navigated {
            if self.previous_origin != Some(snapshot.time_origin) {
                self.navigated = true;
            } else if snapshot.leaving {
                self.in_flight = true;
            } else if !self.in_flight && elapsed >= self.grace {
                self.navigated = true;
            }
        }
        if !self.navigated || !snapshot.reached(self.state) {
            self.resources = None;
            return false;
        }
        if self.state != LoadState::NetworkIdle {
            return true;
        }
        // Idle once the resource entry count holds still for the threshold.
        match self.resources {
            Some((count, since)) if count == snapshot.resources => {
                elapsed.saturating_sub(since) >= Duration::from_millis(NETWORK_IDLE_THRESHOLD_MS)
            }
            _ => {
                self.resources = Some((snapshot.resources, elapsed));
                false
            }
        }
    }
}

/// Poll document snapshots until [`SettleTracker`] reports the page settled.
///
/// Snapshot errors count as "not settled yet" since evaluation fails while a
/// navigation commits; only `SessionClosed` ends the wait early.
pub async fn settle_document<F, Fut>(
    options: WaitOptions,
    state: LoadState,
    previous_origin: Option<f64>,
    mut snapshot: F,
) -> ProbeResult<WaitResult>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = ProbeResult<DocumentSnapshot>>,
{
    let mut tracker = SettleTracker::new(state, previous_origin, options.timeout());
    let start = Instant::now();
    let mut polls = 0u32;
    loop {
        polls += 1;
        let observed = match snapshot().await {
            Ok(snapshot) => Some(snapshot),
            Err(ProbeError::SessionClosed) => return Err(ProbeError::SessionClosed),
            Err(e) => {
                tracing::trace!(error = %e, "document unavailable while settling");
                None
            }
        };
        if tracker.observe(start.elapsed(), observed.as_ref()) {
            return Ok(WaitResult {
                elapsed: start.elapsed(),
                polls,
                waited_for: state.to_string(),
            });
        }
        if start.elapsed() >= options.timeout() {
            return Err(ProbeError::Timeout {
                ms: options.timeout_ms,
                waited_for: state.to_string(),
            });
        }
        tokio::time::sleep(options.poll_interval()).await;
    }
}

// =============================================================================
// EXTREME TDD: Tests
// =============================================================================
