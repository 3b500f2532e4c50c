//! Probe configuration.
//!
//! [`ProbeConfig`] carries timeouts, browser options, and the
//! [`PortalProfile`] of selectors every helper resolves against. It loads from
//! YAML and accepts a handful of environment overrides so CI can retarget a
//! run without editing files.

use crate::locator::{ElementQuery, NamePattern, ProbeTiming, Role, Selector, SelectorChain};
use crate::result::{ProbeError, ProbeResult};
use crate::wait::{LoadState, WaitOptions};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Names the YAML file [`ProbeConfig::load`] reads
pub const CONFIG_ENV: &str = "PORTAL_PROBE_CONFIG";
/// Overrides `base_url`
pub const BASE_URL_ENV: &str = "PORTAL_BASE_URL";
/// Overrides `headless`
pub const HEADLESS_ENV: &str = "PORTAL_HEADLESS";
/// Overrides `chromium_path`
pub const CHROMIUM_PATH_ENV: &str = "CHROMIUM_PATH";

/// Default portal
pub const DEFAULT_BASE_URL: &str = "https://www.usa.gov";

/// Browser viewport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

// Literal patterns always compile.
fn role_named(role: Role, pattern: &str) -> ElementQuery {
    match NamePattern::new(pattern) {
        Ok(name) => ElementQuery::role_named(role, name),
        Err(_) => ElementQuery::role(role),
    }
}

/// Selectors describing the target site's surface
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalProfile {
    /// Search input, role first
    pub search_input: SelectorChain,
    /// Search submit control, role first
    pub search_submit: SelectorChain,
    /// Search result entries
    pub search_results: Selector,
    /// Primary navigation landmark
    pub primary_nav: Selector,
    /// Any navigation region, used when clicking nav items
    pub nav_region: Selector,
    /// Main content landmark
    pub main_region: Selector,
    /// Page header landmark
    pub header_region: Selector,
    /// Page footer landmark
    pub footer_region: Selector,
    /// Links into topic pages
    pub topic_links: Selector,
    /// Home link
    pub logo: SelectorChain,
    /// Text-bearing content blocks
    pub readable_text: Selector,
    /// Job keyword input
    pub job_keywords: Selector,
    /// Job search button
    pub job_search_button: Selector,
    /// Job result titles
    pub job_titles: Selector,
    /// Button applying the current filter
    pub filter_apply: Selector,
    /// Next-page link of the job results pager
    pub results_next: Selector,
    /// Apply button on a job listing
    pub job_apply: Selector,
    /// Application submit control
    pub application_submit: Selector,
    /// Confirmation shown after an application is submitted
    pub application_confirmation: Selector,
    /// Control reopening a submitted application
    pub application_edit: Selector,
    /// Number of links sampled by link checks
    pub link_sample_limit: usize,
    /// Number of links sampled by the keyboard check
    pub keyboard_sample_limit: usize,
}

impl Default for PortalProfile {
    fn default() -> Self {
        Self {
            search_input: SelectorChain::single(
                role_named(Role::Searchbox, "search").described("search input"),
            )
            .or(ElementQuery::css(r#"input[type="search"]"#))
            .or(ElementQuery::css(r#"input[name="query"]"#)),
            search_submit: SelectorChain::single(
                role_named(Role::Button, "search").described("search button"),
            )
            .or(ElementQuery::css(r#"form[role="search"] button[type="submit"]"#)),
            search_results: Selector::css(
                r#"[data-test*="search-result"], .search-result, [class*="result"]"#,
            ),
            primary_nav: Selector::css(r#"nav[aria-label="Primary navigation"]"#),
            nav_region: Selector::css("nav"),
            main_region: Selector::css("main"),
            header_region: Selector::css("header"),
            footer_region: Selector::css("footer"),
            topic_links: Selector::css(r#"a[href*="/topics/"]"#),
            logo: SelectorChain::single(ElementQuery::css(r#"a[href="/"]"#).described("logo link")),
            readable_text: Selector::css("main p, main li, main span"),
            job_keywords: Selector::css("#keywords"),
            job_search_button: Selector::css("#searchButton"),
            job_titles: Selector::css(".jobTitle"),
            filter_apply: Selector::css("#applyFilter"),
            results_next: Selector::css("a.next"),
            job_apply: Selector::css("button.apply"),
            application_submit: Selector::css("#submitApplication"),
            application_confirmation: Selector::css("div.emailConfirmation"),
            application_edit: Selector::css("#editApplication"),
            link_sample_limit: 10,
            keyboard_sample_limit: 5,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Portal origin every session starts at
    pub base_url: String,
    /// Run the browser headless
    pub headless: bool,
    /// Chromium binary (None = auto-detect)
    pub chromium_path: Option<String>,
    pub viewport: Viewport,
    /// Bound for `navigate`
    pub navigation_timeout_ms: u64,
    /// Bound for actionability waits
    pub action_timeout_ms: u64,
    /// Bound for `exists` probes
    pub probe_timeout_ms: u64,
    /// Bound for settle waits
    pub settle_timeout_ms: u64,
    /// Polling interval shared by every wait
    pub poll_interval_ms: u64,
    /// Readiness awaited when a session opens
    pub start_state: LoadState,
    /// Readiness awaited after navigation-triggering helpers
    pub settle_state: LoadState,
    pub profile: PortalProfile,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            headless: true,
            chromium_path: None,
            viewport: Viewport::default(),
            navigation_timeout_ms: crate::wait::DEFAULT_WAIT_TIMEOUT_MS,
            action_timeout_ms: crate::wait::DEFAULT_ACTION_TIMEOUT_MS,
            probe_timeout_ms: crate::locator::DEFAULT_PROBE_TIMEOUT_MS,
            settle_timeout_ms: crate::wait::DEFAULT_WAIT_TIMEOUT_MS,
            poll_interval_ms: crate::locator::DEFAULT_POLL_INTERVAL_MS,
            start_state: LoadState::DomContentLoaded,
            settle_state: LoadState::NetworkIdle,
            profile: PortalProfile::default(),
        }
    }
}

impl ProbeConfig {
    /// Set the base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set headless mode
    #[must_use]
    pub const fn with_headless(mut self, headless: bool) -> Self {
        self.headless = headless;
        self
    }

    /// Set chromium path
    #[must_use]
    pub fn with_chromium_path(mut self, path: impl Into<String>) -> Self {
        self.chromium_path = Some(path.into());
        self
    }

    /// Set the actionability timeout
    #[must_use]
    pub const fn with_action_timeout(mut self, ms: u64) -> Self {
        self.action_timeout_ms = ms;
        self
    }

    /// Set the `exists` probe timeout
    #[must_use]
    pub const fn with_probe_timeout(mut self, ms: u64) -> Self {
        self.probe_timeout_ms = ms;
        self
    }

    /// Set the settle timeout
    #[must_use]
    pub const fn with_settle_timeout(mut self, ms: u64) -> Self {
        self.settle_timeout_ms = ms;
        self
    }

    /// Set the polling interval
    #[must_use]
    pub const fn with_poll_interval(mut self, ms: u64) -> Self {
        self.poll_interval_ms = ms;
        self
    }

    /// Replace the selector profile
    #[must_use]
    pub fn with_profile(mut self, profile: PortalProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Parse and validate YAML
    pub fn from_yaml_str(yaml: &str) -> ProbeResult<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a YAML file
    pub fn from_file(path: &Path) -> ProbeResult<Self> {
        let yaml = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&yaml).map_err(|e| ProbeError::ConfigError {
            message: format!("{}: {e}", path.display()),
        })
    }

    /// Configuration for this process.
    ///
    /// Reads the file named by `PORTAL_PROBE_CONFIG` when set, otherwise
    /// starts from defaults, then applies environment overrides.
    pub fn load() -> ProbeResult<Self> {
        let mut config = match std::env::var(CONFIG_ENV) {
            Ok(path) if !path.trim().is_empty() => Self::from_file(Path::new(&path))?,
            _ => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        tracing::debug!(base_url = %config.base_url, headless = config.headless, "loaded probe config");
        Ok(config)
    }

    /// Apply overrides from a key lookup (the environment, in [`Self::load`])
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> ProbeResult<()> {
        if let Some(url) = lookup(BASE_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.base_url = url.trim().to_string();
        }
        if let Some(raw) = lookup(HEADLESS_ENV) {
            self.headless = parse_bool(HEADLESS_ENV, &raw)?;
        }
        if let Some(path) = lookup(CHROMIUM_PATH_ENV).filter(|v| !v.trim().is_empty()) {
            self.chromium_path = Some(path);
        }
        self.validate()
    }

    /// Reject configurations no session could run with
    pub fn validate(&self) -> ProbeResult<()> {
        let url = url::Url::parse(&self.base_url).map_err(|e| ProbeError::ConfigError {
            message: format!("invalid base_url '{}': {e}", self.base_url),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ProbeError::ConfigError {
                message: format!("base_url must be http(s), got '{}'", url.scheme()),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(ProbeError::ConfigError {
                message: "poll_interval_ms must be positive".to_string(),
            });
        }
        if self.profile.search_input.alternatives().is_empty() {
            return Err(ProbeError::ConfigError {
                message: "profile.search_input needs at least one alternative".to_string(),
            });
        }
        Ok(())
    }

    /// Resolve a site path or absolute URL against `base_url`
    pub fn url_for(&self, path: &str) -> ProbeResult<String> {
        let base = url::Url::parse(&self.base_url).map_err(|e| ProbeError::ConfigError {
            message: format!("invalid base_url '{}': {e}", self.base_url),
        })?;
        base.join(path)
            .map(String::from)
            .map_err(|e| ProbeError::NavigationError {
                url: path.to_string(),
                message: e.to_string(),
            })
    }

    #[must_use]
    pub const fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    #[must_use]
    pub const fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }

    /// Wait options for actionability waits
    #[must_use]
    pub const fn action_wait(&self) -> WaitOptions {
        WaitOptions {
            timeout_ms: self.action_timeout_ms,
            poll_interval_ms: self.poll_interval_ms,
        }
    }

    /// Timing for `exists` probes
    #[must_use]
    pub const fn probe_timing(&self) -> ProbeTiming {
        ProbeTiming {
            timeout: Duration::from_millis(self.probe_timeout_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }
}

fn parse_bool(key: &str, raw: &str) -> ProbeResult<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ProbeError::ConfigError {
            message: format!("{key} must be a boolean, got '{other}'"),
        }),
    }
}
