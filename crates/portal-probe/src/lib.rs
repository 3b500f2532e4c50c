//! Portal Probe: page interaction facade for end-to-end testing of public
//! government web portals.
//!
//! Scenarios drive a browser page through a thin locator/action layer and
//! assert on DOM facts: visibility, counts, attributes, text.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                   PORTAL PROBE Architecture                     │
//! ├─────────────────────────────────────────────────────────────────┤
//! │   ┌────────────┐    ┌────────────┐    ┌────────────┐            │
//! │   │ Scenario   │    │ Helpers    │    │ Locator +  │            │
//! │   │ (tokio     │───►│ (search,   │───►│ Executor   │            │
//! │   │  test)     │    │  nav, a11y)│    │            │            │
//! │   └────────────┘    └────────────┘    └─────┬──────┘            │
//! │         │                                   ▼                   │
//! │   ┌─────┴──────┐                     ┌────────────┐            │
//! │   │with_session│────── launches ────►│ PageDriver │            │
//! │   │ (teardown) │                     │ CDP/static │            │
//! │   └────────────┘                     └────────────┘            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use portal_probe::prelude::*;
//!
//! #[tokio::test]
//! async fn search_finds_passport_pages() -> ProbeResult<()> {
//!     init_tracing();
//!     let fixture = SessionFixture::new(ProbeConfig::load()?, CdpLauncher);
//!     with_session(&fixture, |session| Box::pin(async move {
//!         perform_search(session, "passport").await?;
//!         assert!(count_main_links(session).await > 0);
//!         Ok(())
//!     }))
//!     .await
//! }
//! ```

#![cfg_attr(test, allow(clippy::large_stack_arrays, clippy::large_stack_frames))]

/// Headless Chromium driver over the DevTools protocol
#[cfg(feature = "browser")]
#[allow(clippy::missing_errors_doc, clippy::doc_markdown)]
mod browser;
mod config;
mod dataset;
/// In-memory DOM backing the static driver
pub mod dom;
mod driver;
mod executor;
mod fixture;
/// Domain helpers grouped by page area
#[allow(clippy::missing_errors_doc)]
pub mod helpers;
mod locator;
mod observe;
mod result;
mod static_site;
mod wait;

#[cfg(feature = "browser")]
pub use browser::{CdpDriver, CdpLauncher};
pub use config::{
    PortalProfile, ProbeConfig, Viewport, BASE_URL_ENV, CHROMIUM_PATH_ENV, CONFIG_ENV,
    DEFAULT_BASE_URL, HEADLESS_ENV,
};
pub use dataset::{
    CriticalLink, EdgeCase, FilterStep, JobCase, NavigationCase, ScenarioDataset, SearchCase,
    SiteCopy, VERY_LONG_INPUT_LEN,
};
pub use driver::{DriverLauncher, ElementState, PageDriver};
pub use executor::{Action, ActionExecutor};
pub use fixture::{with_session, Session, SessionFixture, SessionState};
pub use locator::{
    normalize_whitespace, Cardinality, ElementQuery, Located, NamePattern, ProbeTiming, Role,
    Selector, SelectorChain, DEFAULT_POLL_INTERVAL_MS, DEFAULT_PROBE_TIMEOUT_MS,
};
pub use observe::{
    init_tracing, EventSink, ProbeEvent, RecordingSink, TracingSink, LOG_ENV, LOG_FORMAT_ENV,
};
pub use result::{ProbeError, ProbeResult};
pub use static_site::{
    CallJournal, PageRequest, Resource, StaticDriver, StaticSite, NOT_FOUND_TITLE,
};
pub use wait::{
    poll_until, settle_document, DocumentSnapshot, LoadState, SettleTracker, WaitOptions,
    WaitResult, DEFAULT_ACTION_TIMEOUT_MS, DEFAULT_WAIT_TIMEOUT_MS, NAVIGATION_GRACE_MS,
    NETWORK_IDLE_THRESHOLD_MS,
};

/// Everything a scenario file needs
pub mod prelude {
    #[cfg(feature = "browser")]
    pub use super::browser::*;
    pub use super::config::*;
    pub use super::dataset::*;
    pub use super::driver::*;
    pub use super::executor::*;
    pub use super::fixture::*;
    pub use super::helpers::accessibility::*;
    pub use super::helpers::application::*;
    pub use super::helpers::content::*;
    pub use super::helpers::filters::*;
    pub use super::helpers::forms::*;
    pub use super::helpers::links::*;
    pub use super::helpers::navigation::*;
    pub use super::helpers::search::*;
    pub use super::locator::*;
    pub use super::observe::*;
    pub use super::result::*;
    pub use super::static_site::*;
    pub use super::wait::*;
}
