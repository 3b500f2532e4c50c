//! Action executor.
//!
//! Every action first waits, bounded by the action timeout, for its target to
//! be attached, visible and enabled. A target that never attached fails with
//! `ElementNotFound`; one that attached but never became actionable fails
//! with `Timeout`. Settling after navigation is a separate, explicit call.

use crate::config::ProbeConfig;
use crate::driver::PageDriver;
use crate::locator::ElementQuery;
use crate::result::{ProbeError, ProbeResult};
use crate::wait::{poll_until, LoadState, WaitOptions, WaitResult};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Executor actions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Fill(String),
    Click,
    Check,
    Uncheck,
    Clear,
    Press(String),
}

impl Action {
    /// Short name used in events
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Fill(_) => "fill",
            Self::Click => "click",
            Self::Check => "check",
            Self::Uncheck => "uncheck",
            Self::Clear => "clear",
            Self::Press(_) => "press",
        }
    }
}

/// Performs actions after an actionability wait
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionExecutor {
    action_wait: WaitOptions,
    settle_timeout: Duration,
}

impl ActionExecutor {
    #[must_use]
    pub const fn new(action_wait: WaitOptions, settle_timeout: Duration) -> Self {
        Self {
            action_wait,
            settle_timeout,
        }
    }

    /// Executor using the configured action and settle bounds
    #[must_use]
    pub const fn from_config(config: &ProbeConfig) -> Self {
        Self::new(config.action_wait(), config.settle_timeout())
    }

    #[must_use]
    pub const fn action_wait(&self) -> WaitOptions {
        self.action_wait
    }

    /// Wait until the target of `query` is actionable
    pub async fn wait_actionable(
        &self,
        driver: &dyn PageDriver,
        query: &ElementQuery,
    ) -> ProbeResult<WaitResult> {
        let attached = AtomicBool::new(false);
        let waited_for = format!("{} to be actionable", query.describe());
        let outcome = poll_until(self.action_wait, &waited_for, || async {
            match driver
                .element_state(query.selector(), query.target_index())
                .await?
            {
                Some(state) => {
                    attached.store(true, Ordering::Relaxed);
                    Ok(state.is_actionable().then_some(()))
                }
                None => Ok(None),
            }
        })
        .await;

        match outcome {
            Ok((_, result)) => Ok(result),
            Err(ProbeError::Timeout { .. }) if !attached.load(Ordering::Relaxed) => {
                Err(ProbeError::not_found(query.describe()))
            }
            Err(e) => Err(e),
        }
    }

    /// Perform `action` on the target of `query`; returns the total time taken
    pub async fn perform(
        &self,
        driver: &mut dyn PageDriver,
        query: &ElementQuery,
        action: &Action,
    ) -> ProbeResult<Duration> {
        let start = Instant::now();
        self.wait_actionable(&*driver, query).await?;

        let selector = query.selector();
        let index = query.target_index();
        match action {
            Action::Fill(text) => driver.fill(selector, index, text).await?,
            Action::Clear => driver.fill(selector, index, "").await?,
            Action::Click => driver.click(selector, index).await?,
            Action::Check => driver.set_checked(selector, index, true).await?,
            Action::Uncheck => driver.set_checked(selector, index, false).await?,
            Action::Press(key) => driver.press_key(selector, index, key).await?,
        }
        Ok(start.elapsed())
    }

    /// Wait for the page to reach `state`, bounded by the settle timeout
    pub async fn await_settled(
        &self,
        driver: &dyn PageDriver,
        state: LoadState,
    ) -> ProbeResult<Duration> {
        let start = Instant::now();
        driver
            .wait_for_load_state(state, self.settle_timeout)
            .await?;
        Ok(start.elapsed())
    }
}
