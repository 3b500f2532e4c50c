//! Session lifecycle.
//!
//! A [`Session`] is one driver page/context pair owned by one scenario.
//! [`with_session`] is the only way scenarios get one: it launches a driver,
//! opens the base URL, runs the body, and releases page then context on every
//! exit path, including errors and panics.
//!
//! ```ignore
//! let fixture = SessionFixture::new(ProbeConfig::load()?, CdpLauncher);
//! with_session(&fixture, |session| Box::pin(async move {
//!     perform_search(session, "passport").await?;
//!     assert!(count_main_links(session).await > 0);
//!     Ok(())
//! }))
//! .await?;
//! ```

use crate::config::{PortalProfile, ProbeConfig};
use crate::driver::{DriverLauncher, PageDriver};
use crate::executor::{Action, ActionExecutor};
use crate::locator::{ElementQuery, Located, SelectorChain};
use crate::observe::{EventSink, ProbeEvent, TracingSink};
use crate::result::ProbeResult;
use crate::wait::LoadState;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::time::Instant;
use uuid::Uuid;

/// Where a session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Driver launched, start page not ready yet
    Unloaded,
    /// Start page (or an explicit `goto`) ready
    Loaded,
    /// A search was submitted
    Searched,
    /// A navigation click settled
    Navigated,
    /// A filter was applied
    FilterApplied,
    /// A job application was submitted
    Applied,
    /// Page and context released
    Closed,
}

/// One scenario's page
pub struct Session {
    id: Uuid,
    driver: Box<dyn PageDriver>,
    config: ProbeConfig,
    executor: ActionExecutor,
    sink: Arc<dyn EventSink>,
    state: SessionState,
    opened_at: Instant,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("base_url", &self.config.base_url)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Session {
    async fn open(
        config: ProbeConfig,
        launcher: &dyn DriverLauncher,
        sink: Arc<dyn EventSink>,
    ) -> ProbeResult<Self> {
        let opened_at = Instant::now();
        let driver = launcher.launch(&config).await?;
        let mut session = Self {
            id: Uuid::new_v4(),
            executor: ActionExecutor::from_config(&config),
            driver,
            config,
            sink,
            state: SessionState::Unloaded,
            opened_at,
        };

        let base_url = session.config.base_url.clone();
        let start_state = session.config.start_state;
        let timeout = session.config.navigation_timeout();
        if let Err(e) = session.driver.navigate(&base_url, start_state, timeout).await {
            session.close().await;
            return Err(e);
        }
        session.state = SessionState::Loaded;
        session.emit(ProbeEvent::SessionOpened {
            url: base_url,
            elapsed_ms: elapsed_ms(opened_at),
        });
        Ok(session)
    }

    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub const fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Selector profile of the target site
    #[must_use]
    pub const fn profile(&self) -> &PortalProfile {
        &self.config.profile
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    pub(crate) fn set_state(&mut self, state: SessionState) {
        tracing::trace!(session_id = %self.id, from = ?self.state, to = ?state, "state change");
        self.state = state;
    }

    /// Underlying driver
    #[must_use]
    pub fn driver(&self) -> &dyn PageDriver {
        self.driver.as_ref()
    }

    /// Bind a query to this page. Never fails.
    #[must_use]
    pub fn locate(&self, query: impl Into<ElementQuery>) -> Located<'_> {
        Located::new(self.driver.as_ref(), query.into(), self.config.probe_timing())
    }

    /// First alternative of `chain` whose target exists
    pub async fn resolve(&self, chain: &SelectorChain) -> ProbeResult<ElementQuery> {
        chain.resolve(self.driver.as_ref()).await.cloned()
    }

    /// First alternative of `chain` whose target is visible
    pub async fn resolve_visible(&self, chain: &SelectorChain) -> ProbeResult<ElementQuery> {
        chain.resolve_visible(self.driver.as_ref()).await.cloned()
    }

    async fn perform(&mut self, query: &ElementQuery, action: Action) -> ProbeResult<()> {
        let elapsed = self
            .executor
            .perform(self.driver.as_mut(), query, &action)
            .await?;
        self.emit(ProbeEvent::Action {
            action: action.name().to_string(),
            query: query.describe(),
            elapsed_ms: elapsed.as_millis() as u64,
        });
        Ok(())
    }

    /// Replace the value of an input
    pub async fn fill(&mut self, query: &ElementQuery, text: &str) -> ProbeResult<()> {
        self.perform(query, Action::Fill(text.to_string())).await
    }

    pub async fn click(&mut self, query: &ElementQuery) -> ProbeResult<()> {
        self.perform(query, Action::Click).await
    }

    pub async fn check(&mut self, query: &ElementQuery) -> ProbeResult<()> {
        self.perform(query, Action::Check).await
    }

    pub async fn uncheck(&mut self, query: &ElementQuery) -> ProbeResult<()> {
        self.perform(query, Action::Uncheck).await
    }

    /// Empty an input
    pub async fn clear(&mut self, query: &ElementQuery) -> ProbeResult<()> {
        self.perform(query, Action::Clear).await
    }

    /// Focus the target and press `key`
    pub async fn press_key(&mut self, query: &ElementQuery, key: &str) -> ProbeResult<()> {
        self.perform(query, Action::Press(key.to_string())).await
    }

    /// Wait for the page to reach `state`
    pub async fn await_settled(&mut self, state: LoadState) -> ProbeResult<()> {
        let elapsed = self
            .executor
            .await_settled(self.driver.as_ref(), state)
            .await?;
        self.emit(ProbeEvent::Settled {
            state,
            elapsed_ms: elapsed.as_millis() as u64,
        });
        Ok(())
    }

    /// Settle to the configured `settle_state`
    pub async fn settle(&mut self) -> ProbeResult<()> {
        self.await_settled(self.config.settle_state).await
    }

    /// Navigate to a site path or absolute URL
    pub async fn goto(&mut self, path: &str) -> ProbeResult<()> {
        let start = Instant::now();
        let url = self.config.url_for(path)?;
        self.driver
            .navigate(&url, self.config.start_state, self.config.navigation_timeout())
            .await?;
        self.set_state(SessionState::Loaded);
        self.emit(ProbeEvent::Navigated {
            url,
            elapsed_ms: elapsed_ms(start),
        });
        Ok(())
    }

    pub async fn title(&self) -> ProbeResult<String> {
        self.driver.title().await
    }

    pub async fn url(&self) -> ProbeResult<String> {
        self.driver.current_url().await
    }

    /// Evaluate a script in the page
    pub async fn evaluate(&self, script: &str) -> ProbeResult<serde_json::Value> {
        self.driver.evaluate(script).await
    }

    /// Send an event to the session's sink
    pub fn emit(&self, event: ProbeEvent) {
        self.sink.emit(self.id, &event);
    }

    /// Unwrap `result`, or record the failure and return `fallback`
    pub fn recover<T>(&self, helper: &str, result: ProbeResult<T>, fallback: T) -> T {
        match result {
            Ok(value) => value,
            Err(e) => {
                self.emit(ProbeEvent::Recovered {
                    helper: helper.to_string(),
                    error: e.to_string(),
                });
                fallback
            }
        }
    }

    /// Release page then context. Failures are reported, never returned.
    async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        if let Err(e) = self.driver.close_page().await {
            self.emit(ProbeEvent::ReleaseFailed {
                resource: "page".to_string(),
                error: e.to_string(),
            });
        }
        if let Err(e) = self.driver.close_context().await {
            self.emit(ProbeEvent::ReleaseFailed {
                resource: "context".to_string(),
                error: e.to_string(),
            });
        }
        self.state = SessionState::Closed;
        self.emit(ProbeEvent::SessionClosed {
            elapsed_ms: elapsed_ms(self.opened_at),
        });
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

/// Everything needed to open sessions: config, launcher, event sink
#[derive(Clone)]
pub struct SessionFixture {
    config: ProbeConfig,
    launcher: Arc<dyn DriverLauncher>,
    sink: Arc<dyn EventSink>,
}

impl std::fmt::Debug for SessionFixture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionFixture")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl SessionFixture {
    /// Fixture logging through `tracing`
    #[must_use]
    pub fn new(config: ProbeConfig, launcher: impl DriverLauncher + 'static) -> Self {
        Self {
            config,
            launcher: Arc::new(launcher),
            sink: Arc::new(TracingSink),
        }
    }

    /// Replace the event sink
    #[must_use]
    pub fn with_sink(mut self, sink: impl EventSink + 'static) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    #[must_use]
    pub const fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Open a session, run `body`, and always tear down
    pub async fn run<T, F>(&self, body: F) -> ProbeResult<T>
    where
        F: for<'s> FnOnce(&'s mut Session) -> BoxFuture<'s, ProbeResult<T>>,
    {
        let mut session =
            Session::open(self.config.clone(), self.launcher.as_ref(), Arc::clone(&self.sink))
                .await?;

        let outcome = AssertUnwindSafe(body(&mut session)).catch_unwind().await;
        session.close().await;

        match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

/// Run `body` against a fresh session from `fixture`
pub async fn with_session<T, F>(fixture: &SessionFixture, body: F) -> ProbeResult<T>
where
    F: for<'s> FnOnce(&'s mut Session) -> BoxFuture<'s, ProbeResult<T>>,
{
    fixture.run(body).await
}
