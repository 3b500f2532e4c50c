//! PageDriver - Abstract Browser Automation Trait
//!
//! The facade never talks to a browser directly. Everything it needs from the
//! automation layer goes through [`PageDriver`], addressed by a [`Selector`]
//! and a zero-based match index.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │  PageDriver (Abstract Trait)                                      │
//! ├──────────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────┐        ┌─────────────────────────────┐  │
//! │  │  CdpDriver          │        │  StaticDriver               │  │
//! │  │  (`browser` feature)│        │  (in-memory DOM, offline)   │  │
//! │  │  chromiumoxide      │        │  used by the crate's tests  │  │
//! │  └─────────────────────┘        └─────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Single-element operations return `Ok(None)` when the index is past the last
//! match; callers decide whether that is an error.

use crate::config::ProbeConfig;
use crate::locator::Selector;
use crate::result::ProbeResult;
use crate::wait::LoadState;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Snapshot of a matched element's actionability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementState {
    /// Lower-case tag name
    pub tag_name: String,
    /// Rendered and not hidden
    pub visible: bool,
    /// Not disabled
    pub enabled: bool,
}

impl ElementState {
    /// Attached, visible, and enabled
    #[must_use]
    pub const fn is_actionable(&self) -> bool {
        self.visible && self.enabled
    }

    /// Heading level for `h1`..`h6`
    #[must_use]
    pub fn heading_level(&self) -> Option<u8> {
        let rest = self.tag_name.strip_prefix('h')?;
        match rest.parse::<u8>() {
            Ok(level @ 1..=6) => Some(level),
            _ => None,
        }
    }
}

/// Abstract driver trait for browser automation.
///
/// One driver instance backs exactly one session and is never shared between
/// concurrently running scenarios.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Navigate to URL and wait for `wait_until`
    async fn navigate(&mut self, url: &str, wait_until: LoadState, timeout: Duration)
        -> ProbeResult<()>;

    /// Number of elements matching the selector
    async fn count(&self, selector: &Selector) -> ProbeResult<usize>;

    /// State of the `index`-th match
    async fn element_state(
        &self,
        selector: &Selector,
        index: usize,
    ) -> ProbeResult<Option<ElementState>>;

    /// Attribute of the `index`-th match. Outer `None`: no such element.
    async fn attribute(
        &self,
        selector: &Selector,
        index: usize,
        name: &str,
    ) -> ProbeResult<Option<Option<String>>>;

    /// Text content of the `index`-th match
    async fn text_content(&self, selector: &Selector, index: usize)
        -> ProbeResult<Option<String>>;

    /// Form value of the `index`-th match
    async fn input_value(&self, selector: &Selector, index: usize) -> ProbeResult<Option<String>>;

    /// Replace the value of the `index`-th match
    async fn fill(&mut self, selector: &Selector, index: usize, text: &str) -> ProbeResult<()>;

    /// Click the `index`-th match
    async fn click(&mut self, selector: &Selector, index: usize) -> ProbeResult<()>;

    /// Set the checked state of the `index`-th match
    async fn set_checked(&mut self, selector: &Selector, index: usize, checked: bool)
        -> ProbeResult<()>;

    /// Focus the `index`-th match and press a key (e.g. `Enter`, `Tab`)
    async fn press_key(&mut self, selector: &Selector, index: usize, key: &str)
        -> ProbeResult<()>;

    /// Document title
    async fn title(&self) -> ProbeResult<String>;

    /// Current URL
    async fn current_url(&self) -> ProbeResult<String>;

    /// Evaluate a JavaScript expression in the page
    async fn evaluate(&self, script: &str) -> ProbeResult<serde_json::Value>;

    /// Wait until the page reaches `state`
    async fn wait_for_load_state(&self, state: LoadState, timeout: Duration) -> ProbeResult<()>;

    /// Release the page
    async fn close_page(&mut self) -> ProbeResult<()>;

    /// Release the browser context
    async fn close_context(&mut self) -> ProbeResult<()>;
}

/// Creates one fresh driver per session
#[async_trait]
pub trait DriverLauncher: Send + Sync {
    /// Launch a driver configured by `config`
    async fn launch(&self, config: &ProbeConfig) -> ProbeResult<Box<dyn PageDriver>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(tag: &str) -> ElementState {
        ElementState {
            tag_name: tag.to_string(),
            visible: true,
            enabled: true,
        }
    }

    #[test]
    fn test_heading_level() {
        assert_eq!(state("h1").heading_level(), Some(1));
        assert_eq!(state("h6").heading_level(), Some(6));
        assert_eq!(state("h7").heading_level(), None);
        assert_eq!(state("header").heading_level(), None);
        assert_eq!(state("html").heading_level(), None);
    }

    #[test]
    fn test_actionable_requires_visible_and_enabled() {
        let mut s = state("button");
        assert!(s.is_actionable());
        s.enabled = false;
        assert!(!s.is_actionable());
        s.enabled = true;
        s.visible = false;
        assert!(!s.is_actionable());
    }
}
