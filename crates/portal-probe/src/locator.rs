//! Locator abstraction for element selection.
//!
//! A [`Selector`] is a semantic description of page elements (ARIA role plus
//! accessible name, CSS, text pattern, or one selector scoped inside another).
//! An [`ElementQuery`] pairs a selector with a [`Cardinality`]. Neither is ever
//! cached against the DOM: every operation resolves the query again, because
//! the page may have changed since the query was built.
//!
//! # Design Philosophy
//!
//! - **Lazy resolution**: queries are values; the driver resolves them on use
//! - **Never throws on absence**: [`Located::count`] and [`Located::exists`]
//!   degrade to `0`/`false`
//! - **Explicit fallbacks**: [`SelectorChain`] evaluates alternatives in a
//!   fixed, testable order instead of inline `if`/`else` chains

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::time::Duration;

use crate::driver::PageDriver;
use crate::result::{ProbeError, ProbeResult};
use crate::wait::{poll_until, WaitOptions};

/// Default timeout for visibility probes (1 second)
pub const DEFAULT_PROBE_TIMEOUT_MS: u64 = 1000;

/// Default polling interval for probes and actionability waits (50ms)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// ARIA roles understood by role selectors.
///
/// Each role maps to a fixed CSS fragment covering its implicit HTML elements
/// and the explicit `role` attribute, so every driver resolves roles the same
/// way.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Search input
    Searchbox,
    /// Button or submit control
    Button,
    /// Hyperlink
    Link,
    /// Single or multi-line text input
    Textbox,
    /// Checkbox
    Checkbox,
    /// Heading `h1`..`h6`
    Heading,
    /// Navigation landmark
    Navigation,
    /// Main landmark
    Main,
    /// Page header landmark
    Banner,
    /// Page footer landmark
    ContentInfo,
    /// Image
    Img,
    /// Select box
    Combobox,
}

impl Role {
    /// ARIA role name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Searchbox => "searchbox",
            Self::Button => "button",
            Self::Link => "link",
            Self::Textbox => "textbox",
            Self::Checkbox => "checkbox",
            Self::Heading => "heading",
            Self::Navigation => "navigation",
            Self::Main => "main",
            Self::Banner => "banner",
            Self::ContentInfo => "contentinfo",
            Self::Img => "img",
            Self::Combobox => "combobox",
        }
    }

    /// CSS fragment matching every element that carries this role
    #[must_use]
    pub const fn implicit_css(&self) -> &'static str {
        match self {
            Self::Searchbox => r#"input[type="search"], [role="searchbox"]"#,
            Self::Button => {
                r#"button, input[type="submit"], input[type="button"], input[type="reset"], [role="button"]"#
            }
            Self::Link => r#"a[href], [role="link"]"#,
            Self::Textbox => {
                r#"input:not([type]), input[type="text"], input[type="email"], input[type="tel"], input[type="url"], textarea, [role="textbox"]"#
            }
            Self::Checkbox => r#"input[type="checkbox"], [role="checkbox"]"#,
            Self::Heading => r#"h1, h2, h3, h4, h5, h6, [role="heading"]"#,
            Self::Navigation => r#"nav, [role="navigation"]"#,
            Self::Main => r#"main, [role="main"]"#,
            Self::Banner => r#"header, [role="banner"]"#,
            Self::ContentInfo => r#"footer, [role="contentinfo"]"#,
            Self::Img => r#"img, [role="img"]"#,
            Self::Combobox => r#"select, [role="combobox"]"#,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pattern matched against accessible names and text content.
///
/// Whitespace in the subject is collapsed before matching. The pattern uses
/// the shared subset of Rust and JavaScript regex syntax so the CDP driver can
/// evaluate it in the page unchanged.
#[derive(Clone, Serialize, Deserialize)]
#[serde(try_from = "NamePatternRepr", into = "NamePatternRepr")]
pub struct NamePattern {
    source: String,
    ignore_case: bool,
    regex: Regex,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum NamePatternRepr {
    Full {
        source: String,
        #[serde(default = "default_ignore_case")]
        ignore_case: bool,
    },
    Short(String),
}

const fn default_ignore_case() -> bool {
    true
}

impl TryFrom<NamePatternRepr> for NamePattern {
    type Error = ProbeError;

    fn try_from(repr: NamePatternRepr) -> Result<Self, Self::Error> {
        match repr {
            NamePatternRepr::Full {
                source,
                ignore_case,
            } => Self::build(source, ignore_case),
            NamePatternRepr::Short(source) => Self::build(source, true),
        }
    }
}

impl From<NamePattern> for NamePatternRepr {
    fn from(pattern: NamePattern) -> Self {
        Self::Full {
            source: pattern.source,
            ignore_case: pattern.ignore_case,
        }
    }
}

impl NamePattern {
    /// Case-insensitive pattern, like `/source/i`
    pub fn new(source: impl Into<String>) -> ProbeResult<Self> {
        Self::build(source.into(), true)
    }

    /// Case-sensitive pattern
    pub fn case_sensitive(source: impl Into<String>) -> ProbeResult<Self> {
        Self::build(source.into(), false)
    }

    /// Matches exactly `text`, case-sensitively
    pub fn exact(text: &str) -> ProbeResult<Self> {
        Self::build(format!("^{}$", regex::escape(text)), false)
    }

    /// Matches any subject containing `text`, ignoring case
    pub fn contains(text: &str) -> ProbeResult<Self> {
        Self::build(regex::escape(text), true)
    }

    fn build(source: String, ignore_case: bool) -> ProbeResult<Self> {
        let regex = RegexBuilder::new(&source)
            .case_insensitive(ignore_case)
            .build()
            .map_err(|e| ProbeError::InvalidPattern {
                pattern: source.clone(),
                message: e.to_string(),
            })?;
        Ok(Self {
            source,
            ignore_case,
            regex,
        })
    }

    /// Test a subject after collapsing its whitespace
    #[must_use]
    pub fn is_match(&self, subject: &str) -> bool {
        self.regex.is_match(&normalize_whitespace(subject))
    }

    /// Pattern source
    #[must_use]
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Whether matching ignores case
    #[must_use]
    pub const fn ignore_case(&self) -> bool {
        self.ignore_case
    }

    fn to_wire(&self) -> Value {
        json!({ "source": self.source, "ignore_case": self.ignore_case })
    }
}

impl PartialEq for NamePattern {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source && self.ignore_case == other.ignore_case
    }
}

impl Eq for NamePattern {}

impl fmt::Debug for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for NamePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "/{}/{}",
            self.source,
            if self.ignore_case { "i" } else { "" }
        )
    }
}

/// Collapse runs of whitespace and trim, the way accessible names are compared
#[must_use]
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Selector type for locating elements
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum Selector {
    /// ARIA role, optionally filtered by accessible name
    Role {
        /// Role to match
        role: Role,
        /// Accessible name filter
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<NamePattern>,
    },
    /// CSS selector (e.g., `nav[aria-label="Primary navigation"] a`)
    Css {
        /// Selector text
        css: String,
    },
    /// Innermost elements whose text content matches
    Text {
        /// Text pattern
        text: NamePattern,
    },
    /// `inner` matches that are descendants of some `scope` match
    Within {
        /// Scoping selector
        scope: Box<Selector>,
        /// Selector evaluated inside the scope
        inner: Box<Selector>,
    },
}

impl Selector {
    /// Create a CSS selector
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::Css {
            css: selector.into(),
        }
    }

    /// Create a role selector without a name filter
    #[must_use]
    pub const fn role(role: Role) -> Self {
        Self::Role { role, name: None }
    }

    /// Create a role selector filtered by accessible name
    #[must_use]
    pub const fn role_named(role: Role, name: NamePattern) -> Self {
        Self::Role {
            role,
            name: Some(name),
        }
    }

    /// Create a text selector
    #[must_use]
    pub const fn text(pattern: NamePattern) -> Self {
        Self::Text { text: pattern }
    }

    /// Scope this selector inside `scope`
    #[must_use]
    pub fn inside(self, scope: Self) -> Self {
        Self::Within {
            scope: Box::new(scope),
            inner: Box::new(self),
        }
    }

    /// Human-readable form used in logs and error messages
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Role { role, name: None } => format!("role={role}"),
            Self::Role {
                role,
                name: Some(name),
            } => format!("role={role}[name={name}]"),
            Self::Css { css } => format!("css={css}"),
            Self::Text { text } => format!("text={text}"),
            Self::Within { scope, inner } => {
                format!("{} >> {}", scope.describe(), inner.describe())
            }
        }
    }

    /// JSON form consumed by the in-page resolver script.
    ///
    /// Roles are expanded to their CSS fragment here so the page never needs
    /// its own role table.
    #[must_use]
    pub fn to_wire(&self) -> Value {
        match self {
            Self::Role { role, name } => json!({
                "kind": "role",
                "css": role.implicit_css(),
                "name": name.as_ref().map(NamePattern::to_wire),
            }),
            Self::Css { css } => json!({ "kind": "css", "css": css }),
            Self::Text { text } => json!({ "kind": "text", "pattern": text.to_wire() }),
            Self::Within { scope, inner } => json!({
                "kind": "within",
                "scope": scope.to_wire(),
                "inner": inner.to_wire(),
            }),
        }
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.describe())
    }
}

/// How many of the matched elements an operation addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", content = "index", rename_all = "snake_case")]
pub enum Cardinality {
    /// The first match in document order
    #[default]
    First,
    /// The match at a zero-based index
    Nth(usize),
    /// Every match
    All,
    /// Only the number of matches
    Count,
}

/// A selector plus cardinality, resolved lazily against the live page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementQuery {
    selector: Selector,
    #[serde(default)]
    cardinality: Cardinality,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

impl ElementQuery {
    /// Query the first match of a selector
    #[must_use]
    pub const fn new(selector: Selector) -> Self {
        Self {
            selector,
            cardinality: Cardinality::First,
            description: None,
        }
    }

    /// Query by CSS
    #[must_use]
    pub fn css(selector: impl Into<String>) -> Self {
        Self::new(Selector::css(selector))
    }

    /// Query by role
    #[must_use]
    pub const fn role(role: Role) -> Self {
        Self::new(Selector::role(role))
    }

    /// Query by role and accessible name
    #[must_use]
    pub const fn role_named(role: Role, name: NamePattern) -> Self {
        Self::new(Selector::role_named(role, name))
    }

    /// Query by text pattern
    #[must_use]
    pub const fn text(pattern: NamePattern) -> Self {
        Self::new(Selector::text(pattern))
    }

    /// Address the first match
    #[must_use]
    pub const fn first(mut self) -> Self {
        self.cardinality = Cardinality::First;
        self
    }

    /// Address the match at `index`
    #[must_use]
    pub const fn nth(mut self, index: usize) -> Self {
        self.cardinality = Cardinality::Nth(index);
        self
    }

    /// Address every match
    #[must_use]
    pub const fn all(mut self) -> Self {
        self.cardinality = Cardinality::All;
        self
    }

    /// Address only the match count
    #[must_use]
    pub const fn counted(mut self) -> Self {
        self.cardinality = Cardinality::Count;
        self
    }

    /// Scope this query's selector inside another selector
    #[must_use]
    pub fn inside(mut self, scope: Selector) -> Self {
        self.selector = self.selector.inside(scope);
        self
    }

    /// Attach a description used instead of the selector in messages
    #[must_use]
    pub fn described(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The selector
    #[must_use]
    pub const fn selector(&self) -> &Selector {
        &self.selector
    }

    /// The cardinality
    #[must_use]
    pub const fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// Index of the element single-target operations act on.
    ///
    /// `All` and `Count` act on the first match.
    #[must_use]
    pub const fn target_index(&self) -> usize {
        match self.cardinality {
            Cardinality::Nth(index) => index,
            Cardinality::First | Cardinality::All | Cardinality::Count => 0,
        }
    }

    /// Human-readable form used in logs and error messages
    #[must_use]
    pub fn describe(&self) -> String {
        if let Some(description) = &self.description {
            return description.clone();
        }
        match self.cardinality {
            Cardinality::First => self.selector.describe(),
            Cardinality::Nth(index) => format!("{} >> nth={index}", self.selector.describe()),
            Cardinality::All => format!("{} >> all", self.selector.describe()),
            Cardinality::Count => format!("{} >> count", self.selector.describe()),
        }
    }
}

impl From<Selector> for ElementQuery {
    fn from(selector: Selector) -> Self {
        Self::new(selector)
    }
}

/// Prioritized alternatives evaluated in order until one resolves.
///
/// Role-based alternatives go first by convention, then CSS, then text.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SelectorChain {
    alternatives: Vec<ElementQuery>,
}

impl SelectorChain {
    /// Create a chain from alternatives in priority order
    #[must_use]
    pub fn new(alternatives: Vec<ElementQuery>) -> Self {
        Self { alternatives }
    }

    /// Chain with a single alternative
    #[must_use]
    pub fn single(query: ElementQuery) -> Self {
        Self::new(vec![query])
    }

    /// Append a lower-priority alternative
    #[must_use]
    pub fn or(mut self, query: ElementQuery) -> Self {
        self.alternatives.push(query);
        self
    }

    /// Alternatives in priority order
    #[must_use]
    pub fn alternatives(&self) -> &[ElementQuery] {
        &self.alternatives
    }

    /// Human-readable form listing every alternative
    #[must_use]
    pub fn describe(&self) -> String {
        self.alternatives
            .iter()
            .map(ElementQuery::describe)
            .collect::<Vec<_>>()
            .join(" | ")
    }

    /// First alternative whose target element exists.
    ///
    /// Alternatives the driver cannot evaluate are skipped.
    pub async fn resolve(&self, driver: &dyn PageDriver) -> ProbeResult<&ElementQuery> {
        for query in &self.alternatives {
            match driver.count(query.selector()).await {
                Ok(count) if count > query.target_index() => return Ok(query),
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(query = %query.describe(), error = %e, "skipping alternative");
                }
            }
        }
        Err(ProbeError::not_found(self.describe()))
    }

    /// First alternative whose target element is currently visible
    pub async fn resolve_visible(&self, driver: &dyn PageDriver) -> ProbeResult<&ElementQuery> {
        for query in &self.alternatives {
            if let Ok(Some(state)) = driver
                .element_state(query.selector(), query.target_index())
                .await
            {
                if state.visible {
                    return Ok(query);
                }
            }
        }
        Err(ProbeError::not_found(self.describe()))
    }
}

/// Probe timing for [`Located`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeTiming {
    /// Upper bound for `exists`
    pub timeout: Duration,
    /// Polling interval
    pub poll_interval: Duration,
}

impl Default for ProbeTiming {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_PROBE_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
        }
    }
}

/// A query bound to a live page.
///
/// Creating one never fails, whatever the page contains. Read operations
/// resolve the query at call time.
pub struct Located<'a> {
    driver: &'a dyn PageDriver,
    query: ElementQuery,
    timing: ProbeTiming,
}

impl fmt::Debug for Located<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Located")
            .field("query", &self.query)
            .field("timing", &self.timing)
            .finish_non_exhaustive()
    }
}

impl<'a> Located<'a> {
    /// Bind a query to a driver
    #[must_use]
    pub fn new(driver: &'a dyn PageDriver, query: ElementQuery, timing: ProbeTiming) -> Self {
        Self {
            driver,
            query,
            timing,
        }
    }

    /// The bound query
    #[must_use]
    pub const fn query(&self) -> &ElementQuery {
        &self.query
    }

    /// Rebind to the match at `index`
    #[must_use]
    pub fn nth(&self, index: usize) -> Self {
        Self::new(self.driver, self.query.clone().nth(index), self.timing)
    }

    /// Rebind to the first match
    #[must_use]
    pub fn first(&self) -> Self {
        Self::new(self.driver, self.query.clone().first(), self.timing)
    }

    /// Number of matches; `0` when the page cannot be queried
    pub async fn count(&self) -> usize {
        self.try_count().await.unwrap_or_else(|e| {
            tracing::debug!(query = %self.query.describe(), error = %e, "count degraded to 0");
            0
        })
    }

    /// Number of matches, surfacing driver errors
    pub async fn try_count(&self) -> ProbeResult<usize> {
        self.driver.count(self.query.selector()).await
    }

    /// Whether the target is visible right now; `false` on any failure
    pub async fn is_visible(&self) -> bool {
        matches!(
            self.driver
                .element_state(self.query.selector(), self.query.target_index())
                .await,
            Ok(Some(state)) if state.visible
        )
    }

    /// Bounded-time visibility probe.
    ///
    /// Polls until the target is visible or the probe timeout elapses. Never
    /// fails: detached, absent, or unqueryable targets yield `false`.
    pub async fn exists(&self) -> bool {
        let options = WaitOptions::new()
            .with_timeout(self.timing.timeout.as_millis() as u64)
            .with_poll_interval(self.timing.poll_interval.as_millis() as u64);
        let waited_for = self.query.describe();
        poll_until(options, &waited_for, || async {
            Ok(self.is_visible().await.then_some(()))
        })
        .await
        .is_ok()
    }

    /// Attribute of the target; `ElementNotFound` when there is no target
    pub async fn attribute(&self, name: &str) -> ProbeResult<Option<String>> {
        self.driver
            .attribute(self.query.selector(), self.query.target_index(), name)
            .await?
            .ok_or_else(|| ProbeError::not_found(self.query.describe()))
    }

    /// Text content of the target; `ElementNotFound` when there is no target
    pub async fn text_content(&self) -> ProbeResult<String> {
        self.driver
            .text_content(self.query.selector(), self.query.target_index())
            .await?
            .ok_or_else(|| ProbeError::not_found(self.query.describe()))
    }

    /// Current value of the target form control
    pub async fn input_value(&self) -> ProbeResult<String> {
        self.driver
            .input_value(self.query.selector(), self.query.target_index())
            .await?
            .ok_or_else(|| ProbeError::not_found(self.query.describe()))
    }

    /// Lower-case tag name of the target
    pub async fn tag_name(&self) -> ProbeResult<String> {
        self.driver
            .element_state(self.query.selector(), self.query.target_index())
            .await?
            .map(|state| state.tag_name)
            .ok_or_else(|| ProbeError::not_found(self.query.describe()))
    }

    /// Text content of every match, in document order
    pub async fn all_text_contents(&self) -> ProbeResult<Vec<String>> {
        let count = self.try_count().await?;
        let mut texts = Vec::with_capacity(count);
        for index in 0..count {
            let text = self
                .driver
                .text_content(self.query.selector(), index)
                .await?
                .unwrap_or_default();
            texts.push(text);
        }
        Ok(texts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod name_pattern_tests {
        use super::*;

        #[test]
        fn test_new_ignores_case() {
            let pattern = NamePattern::new("search").unwrap();
            assert!(pattern.is_match("Search USAGov"));
            assert!(pattern.ignore_case());
        }

        #[test]
        fn test_case_sensitive() {
            let pattern = NamePattern::case_sensitive("Search").unwrap();
            assert!(pattern.is_match("Search"));
            assert!(!pattern.is_match("search"));
        }

        #[test]
        fn test_exact_escapes_metacharacters() {
            let pattern = NamePattern::exact("Get or renew a passport (online)").unwrap();
            assert!(pattern.is_match("Get or renew a passport (online)"));
            assert!(!pattern.is_match("Get or renew a passport (online) now"));
        }

        #[test]
        fn test_contains_collapses_whitespace() {
            let pattern = NamePattern::contains("skip to main").unwrap();
            assert!(pattern.is_match("  Skip   to\n main content "));
        }

        #[test]
        fn test_invalid_pattern_rejected() {
            let err = NamePattern::new("(unclosed").unwrap_err();
            assert!(matches!(err, ProbeError::InvalidPattern { .. }));
        }

        #[test]
        fn test_display() {
            let pattern = NamePattern::new("skip.*main").unwrap();
            assert_eq!(pattern.to_string(), "/skip.*main/i");
        }

        #[test]
        fn test_deserialize_short_and_full_forms() {
            let short: NamePattern = serde_json::from_str(r#""search""#).unwrap();
            assert!(short.ignore_case());
            let full: NamePattern =
                serde_json::from_str(r#"{"source": "Search", "ignore_case": false}"#).unwrap();
            assert!(!full.ignore_case());
            assert_eq!(full.source(), "Search");
        }

        #[test]
        fn test_deserialize_invalid_pattern_fails() {
            let result: Result<NamePattern, _> = serde_json::from_str(r#""[oops""#);
            assert!(result.is_err());
        }
    }

    mod selector_tests {
        use super::*;

        #[test]
        fn test_describe_role_with_name() {
            let selector = Selector::role_named(Role::Searchbox, NamePattern::new("search").unwrap());
            assert_eq!(selector.describe(), "role=searchbox[name=/search/i]");
        }

        #[test]
        fn test_describe_within() {
            let selector = Selector::css("a").inside(Selector::css("main"));
            assert_eq!(selector.describe(), "css=main >> css=a");
        }

        #[test]
        fn test_wire_expands_role_css() {
            let wire = Selector::role(Role::Main).to_wire();
            assert_eq!(wire["kind"], "role");
            assert_eq!(wire["css"], r#"main, [role="main"]"#);
            assert!(wire["name"].is_null());
        }

        #[test]
        fn test_wire_nested_within() {
            let wire = Selector::text(NamePattern::new("Benefits").unwrap())
                .inside(Selector::css("nav"))
                .to_wire();
            assert_eq!(wire["kind"], "within");
            assert_eq!(wire["scope"]["css"], "nav");
            assert_eq!(wire["inner"]["pattern"]["source"], "Benefits");
        }

        #[test]
        fn test_yaml_round_trip_of_role_selector() {
            let yaml = "by: role\nrole: button\nname: search\n";
            let selector: Selector = serde_yaml_ng::from_str(yaml).unwrap();
            assert_eq!(
                selector,
                Selector::role_named(Role::Button, NamePattern::new("search").unwrap())
            );
        }

        #[test]
        fn test_role_css_is_stable() {
            assert_eq!(Role::ContentInfo.implicit_css(), r#"footer, [role="contentinfo"]"#);
            assert_eq!(Role::ContentInfo.as_str(), "contentinfo");
        }
    }

    mod element_query_tests {
        use super::*;

        #[test]
        fn test_default_cardinality_is_first() {
            let query = ElementQuery::css("a");
            assert_eq!(query.cardinality(), Cardinality::First);
            assert_eq!(query.target_index(), 0);
        }

        #[test]
        fn test_nth_target_index() {
            let query = ElementQuery::css("a").nth(3);
            assert_eq!(query.target_index(), 3);
            assert_eq!(query.describe(), "css=a >> nth=3");
        }

        #[test]
        fn test_all_and_count_target_first() {
            assert_eq!(ElementQuery::css("a").all().target_index(), 0);
            assert_eq!(ElementQuery::css("a").counted().target_index(), 0);
        }

        #[test]
        fn test_description_overrides_selector() {
            let query = ElementQuery::css("#q").described("search input");
            assert_eq!(query.describe(), "search input");
        }

        #[test]
        fn test_inside_scopes_selector() {
            let query = ElementQuery::css("a").inside(Selector::css("footer"));
            assert!(matches!(query.selector(), Selector::Within { .. }));
        }
    }

    mod selector_chain_tests {
        use super::*;

        #[test]
        fn test_chain_preserves_priority_order() {
            let chain = SelectorChain::single(ElementQuery::role(Role::Searchbox))
                .or(ElementQuery::css("input[name=query]"));
            assert_eq!(chain.alternatives().len(), 2);
            assert_eq!(
                chain.describe(),
                "role=searchbox | css=input[name=query]"
            );
        }

        #[test]
        fn test_chain_deserializes_from_list() {
            let yaml = "- selector: {by: css, css: '#a'}\n- selector: {by: css, css: '#b'}\n  cardinality: {mode: nth, index: 1}\n";
            let chain: SelectorChain = serde_yaml_ng::from_str(yaml).unwrap();
            assert_eq!(chain.alternatives()[1].target_index(), 1);
        }
    }

    mod located_tests {
        use super::*;
        use crate::dom::{el, Document};
        use crate::static_site::{StaticDriver, StaticSite};
        use crate::wait::LoadState;

        async fn driver() -> StaticDriver {
            let page = Document::new(
                "Home",
                el("html").child(
                    el("body")
                        .child(el("input").attr("type", "search").attr("aria-label", "Search"))
                        .child(el("div").id("panel").hidden().text("Filters")),
                ),
            );
            let site = StaticSite::new("https://portal.test").unwrap().page("/", page);
            let mut driver = StaticDriver::new(site);
            driver
                .navigate("https://portal.test/", LoadState::Load, Duration::from_secs(1))
                .await
                .unwrap();
            driver
        }

        fn timing(ms: u64) -> ProbeTiming {
            ProbeTiming {
                timeout: Duration::from_millis(ms),
                poll_interval: Duration::from_millis(5),
            }
        }

        #[tokio::test]
        async fn test_exists_for_visible_target() {
            let driver = driver().await;
            let located = Located::new(&driver, ElementQuery::role(Role::Searchbox), timing(30));
            assert!(located.exists().await);
        }

        #[tokio::test]
        async fn test_exists_waits_out_its_bound_for_hidden_target() {
            let driver = driver().await;
            let located = Located::new(&driver, ElementQuery::css("#panel"), timing(30));
            let start = tokio::time::Instant::now();
            assert!(!located.exists().await);
            assert!(start.elapsed() >= Duration::from_millis(30));
            assert_eq!(located.count().await, 1);
        }

        #[tokio::test]
        async fn test_exists_with_zero_bound_checks_once() {
            let driver = driver().await;
            let located = Located::new(&driver, ElementQuery::css("input"), timing(0));
            assert!(located.exists().await);
        }
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_exact_matches_its_own_text(text in "[ -~]{1,40}") {
                let pattern = NamePattern::exact(&normalize_whitespace(&text)).unwrap();
                prop_assert!(pattern.is_match(&text));
            }

            #[test]
            fn prop_contains_matches_padded_text(text in "[a-zA-Z0-9 ]{1,20}") {
                let pattern = NamePattern::contains(&normalize_whitespace(&text)).unwrap();
                let padded = format!("prefix {text} suffix");
                prop_assert!(pattern.is_match(&padded));
            }
        }
    }
}
