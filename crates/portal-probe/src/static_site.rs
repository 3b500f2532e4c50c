//! Offline driver over in-memory pages.
//!
//! A [`StaticSite`] maps paths on one origin to [`Document`]s, either fixed or
//! built per request from the query string. [`StaticDriver`] implements
//! [`PageDriver`] on top of it: links navigate, submit controls and `Enter`
//! submit their form as a GET, checkboxes toggle, and an element carrying
//! `data-reveals="<id>"` un-hides the element with that id when clicked.
//!
//! Every driver call is recorded in a shared [`CallJournal`].

use crate::config::ProbeConfig;
use crate::dom::{el, Document, NodeId};
use crate::driver::{DriverLauncher, ElementState, PageDriver};
use crate::locator::Selector;
use crate::result::{ProbeError, ProbeResult};
use crate::wait::LoadState;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

/// Title of the page served for unregistered paths
pub const NOT_FOUND_TITLE: &str = "Page Not Found";

/// Request seen by a dynamic page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl PageRequest {
    /// First value of a query parameter
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

type PageBuilder = dyn Fn(&PageRequest) -> Document + Send + Sync;

#[derive(Clone)]
enum Route {
    Fixed(Document),
    Dynamic(Arc<PageBuilder>),
}

/// Resource released at teardown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Page,
    Context,
}

/// Shared record of driver calls
#[derive(Debug, Clone, Default)]
pub struct CallJournal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallJournal {
    fn record(&self, entry: impl Into<String>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry.into());
    }

    /// Every entry, oldest first
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Entries starting with `prefix`
    #[must_use]
    pub fn matching(&self, prefix: &str) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|e| e.starts_with(prefix))
            .collect()
    }

    /// Number of entries starting with `prefix`
    #[must_use]
    pub fn count(&self, prefix: &str) -> usize {
        self.matching(prefix).len()
    }
}

/// A set of in-memory pages on one origin
#[derive(Clone)]
pub struct StaticSite {
    origin: Url,
    routes: HashMap<String, Route>,
    scripts: HashMap<String, Value>,
    failing_close: Vec<Resource>,
    launch_failure: Option<String>,
    network_idle_after: Duration,
    journal: CallJournal,
}

impl fmt::Debug for StaticSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut paths: Vec<&String> = self.routes.keys().collect();
        paths.sort();
        f.debug_struct("StaticSite")
            .field("origin", &self.origin.as_str())
            .field("paths", &paths)
            .finish_non_exhaustive()
    }
}

impl StaticSite {
    /// Empty site on `origin`
    pub fn new(origin: &str) -> ProbeResult<Self> {
        let origin = Url::parse(origin).map_err(|e| ProbeError::ConfigError {
            message: format!("invalid origin '{origin}': {e}"),
        })?;
        Ok(Self {
            origin,
            routes: HashMap::new(),
            scripts: HashMap::new(),
            failing_close: Vec::new(),
            launch_failure: None,
            network_idle_after: Duration::ZERO,
            journal: CallJournal::default(),
        })
    }

    /// Serve a fixed document at `path`
    #[must_use]
    pub fn page(mut self, path: &str, document: Document) -> Self {
        self.routes.insert(path.to_string(), Route::Fixed(document));
        self
    }

    /// Build the document at `path` from each request
    #[must_use]
    pub fn dynamic_page(
        mut self,
        path: &str,
        build: impl Fn(&PageRequest) -> Document + Send + Sync + 'static,
    ) -> Self {
        self.routes
            .insert(path.to_string(), Route::Dynamic(Arc::new(build)));
        self
    }

    /// Result returned by `evaluate` for an exact script
    #[must_use]
    pub fn script(mut self, script: &str, result: Value) -> Self {
        self.scripts.insert(script.trim().to_string(), result);
        self
    }

    /// Make releasing `resource` fail
    #[must_use]
    pub fn failing_close(mut self, resource: Resource) -> Self {
        self.failing_close.push(resource);
        self
    }

    /// Make every launch fail
    #[must_use]
    pub fn failing_launch(mut self, message: impl Into<String>) -> Self {
        self.launch_failure = Some(message.into());
        self
    }

    /// Network goes idle this long after each page load
    #[must_use]
    pub const fn network_idle_after(mut self, delay: Duration) -> Self {
        self.network_idle_after = delay;
        self
    }

    /// Journal shared by every driver this site launches
    #[must_use]
    pub fn journal(&self) -> CallJournal {
        self.journal.clone()
    }

    #[must_use]
    pub fn origin(&self) -> &str {
        self.origin.as_str()
    }

    fn resolve(&self, url: &Url) -> Document {
        let same_origin = url.origin() == self.origin.origin();
        let route = same_origin
            .then(|| self.routes.get(url.path()))
            .flatten();
        match route {
            Some(Route::Fixed(doc)) => doc.clone(),
            Some(Route::Dynamic(build)) => build(&PageRequest {
                path: url.path().to_string(),
                query: url.query_pairs().into_owned().collect(),
            }),
            None => Document::new(
                NOT_FOUND_TITLE,
                el("html")
                    .attr("lang", "en")
                    .child(el("body").child(el("main").child(el("h1").text(NOT_FOUND_TITLE)))),
            ),
        }
    }
}

#[async_trait]
impl DriverLauncher for StaticSite {
    async fn launch(&self, config: &ProbeConfig) -> ProbeResult<Box<dyn PageDriver>> {
        if let Some(message) = &self.launch_failure {
            return Err(ProbeError::BrowserLaunchError {
                message: message.clone(),
            });
        }
        self.journal.record("launch");
        tracing::debug!(origin = %self.origin, base_url = %config.base_url, "static driver launched");
        Ok(Box::new(StaticDriver::new(self.clone())))
    }
}

/// [`PageDriver`] over a [`StaticSite`]
#[derive(Debug)]
pub struct StaticDriver {
    site: StaticSite,
    url: Url,
    document: Document,
    loaded_at: Instant,
    page_open: bool,
    context_open: bool,
}

impl StaticDriver {
    /// Driver on `about:blank`
    #[must_use]
    pub fn new(site: StaticSite) -> Self {
        let url = Url::parse("about:blank").unwrap_or_else(|_| site.origin.clone());
        Self {
            site,
            url,
            document: Document::new("", el("html").child(el("body"))),
            loaded_at: Instant::now(),
            page_open: true,
            context_open: true,
        }
    }

    /// The current document
    #[must_use]
    pub const fn document(&self) -> &Document {
        &self.document
    }

    fn ensure_open(&self) -> ProbeResult<()> {
        if self.page_open && self.context_open {
            Ok(())
        } else {
            Err(ProbeError::SessionClosed)
        }
    }

    fn node(&self, selector: &Selector, index: usize) -> ProbeResult<Option<NodeId>> {
        self.ensure_open()?;
        Ok(self.document.select(selector)?.get(index).copied())
    }

    fn require(&self, selector: &Selector, index: usize) -> ProbeResult<NodeId> {
        self.node(selector, index)?
            .ok_or_else(|| ProbeError::not_found(format!("{} >> nth={index}", selector.describe())))
    }

    fn join(&self, href: &str) -> ProbeResult<Url> {
        let base = if self.url.cannot_be_a_base() {
            &self.site.origin
        } else {
            &self.url
        };
        base.join(href).map_err(|e| ProbeError::NavigationError {
            url: href.to_string(),
            message: e.to_string(),
        })
    }

    fn load(&mut self, url: Url) {
        self.site.journal.record(format!("navigate:{url}"));
        self.document = self.site.resolve(&url);
        self.url = url;
        self.loaded_at = Instant::now();
    }

    fn submit(&mut self, form: NodeId) -> ProbeResult<()> {
        let action = self.document.attr(form, "action").unwrap_or_default().to_string();
        let fields = self.document.form_fields(form);
        let mut target = self.join(&action)?;
        target.set_fragment(None);
        if fields.is_empty() {
            target.set_query(None);
        } else {
            target.query_pairs_mut().clear().extend_pairs(fields);
        }
        self.load(target);
        Ok(())
    }

    fn activate(&mut self, node: NodeId) -> ProbeResult<()> {
        let doc = &self.document;
        if let Some(target) = doc.attr(node, "data-reveals").and_then(|id| doc.element_by_id(id)) {
            self.document.remove_attr(target, "hidden");
            return Ok(());
        }
        if doc.is_checkable(node) {
            if doc.has_attr(node, "checked") {
                self.document.remove_attr(node, "checked");
            } else {
                self.document.set_attr(node, "checked", "");
            }
            return Ok(());
        }
        if doc.is_submit_control(node) {
            if let Some(form) = doc.closest(node, "form") {
                return self.submit(form);
            }
            return Ok(());
        }
        let href = doc
            .closest(node, "a")
            .and_then(|a| doc.attr(a, "href"))
            .map(str::to_string);
        if let Some(href) = href {
            let target = self.join(&href)?;
            self.load(target);
        }
        Ok(())
    }
}

#[async_trait]
impl PageDriver for StaticDriver {
    async fn navigate(
        &mut self,
        url: &str,
        wait_until: LoadState,
        timeout: Duration,
    ) -> ProbeResult<()> {
        self.ensure_open()?;
        let target = Url::parse(url).or_else(|_| self.join(url))?;
        self.load(target);
        self.wait_for_load_state(wait_until, timeout).await
    }

    async fn count(&self, selector: &Selector) -> ProbeResult<usize> {
        self.ensure_open()?;
        Ok(self.document.select(selector)?.len())
    }

    async fn element_state(
        &self,
        selector: &Selector,
        index: usize,
    ) -> ProbeResult<Option<ElementState>> {
        Ok(self.node(selector, index)?.map(|node| ElementState {
            tag_name: self.document.tag_name(node).unwrap_or_default().to_string(),
            visible: self.document.is_visible(node),
            enabled: self.document.is_enabled(node),
        }))
    }

    async fn attribute(
        &self,
        selector: &Selector,
        index: usize,
        name: &str,
    ) -> ProbeResult<Option<Option<String>>> {
        Ok(self
            .node(selector, index)?
            .map(|node| self.document.attr(node, name).map(str::to_string)))
    }

    async fn text_content(
        &self,
        selector: &Selector,
        index: usize,
    ) -> ProbeResult<Option<String>> {
        Ok(self
            .node(selector, index)?
            .map(|node| self.document.text_content(node)))
    }

    async fn input_value(&self, selector: &Selector, index: usize) -> ProbeResult<Option<String>> {
        let Some(node) = self.node(selector, index)? else {
            return Ok(None);
        };
        self.document
            .value(node)
            .map(Some)
            .ok_or_else(|| ProbeError::PageError {
                message: format!("{} is not a form control", selector.describe()),
            })
    }

    async fn fill(&mut self, selector: &Selector, index: usize, text: &str) -> ProbeResult<()> {
        let node = self.require(selector, index)?;
        let fillable = matches!(self.document.tag_name(node), Some("input" | "textarea"))
            && !self.document.is_checkable(node);
        if !fillable {
            return Err(ProbeError::PageError {
                message: format!("{} cannot be filled", selector.describe()),
            });
        }
        self.site
            .journal
            .record(format!("fill:{}={text}", selector.describe()));
        self.document.set_value(node, text);
        Ok(())
    }

    async fn click(&mut self, selector: &Selector, index: usize) -> ProbeResult<()> {
        let node = self.require(selector, index)?;
        self.site
            .journal
            .record(format!("click:{}", selector.describe()));
        self.activate(node)
    }

    async fn set_checked(
        &mut self,
        selector: &Selector,
        index: usize,
        checked: bool,
    ) -> ProbeResult<()> {
        let node = self.require(selector, index)?;
        if !self.document.is_checkable(node) {
            return Err(ProbeError::PageError {
                message: format!("{} is not a checkbox or radio", selector.describe()),
            });
        }
        self.site
            .journal
            .record(format!("check:{}={checked}", selector.describe()));
        if checked {
            self.document.set_attr(node, "checked", "");
        } else {
            self.document.remove_attr(node, "checked");
        }
        Ok(())
    }

    async fn press_key(
        &mut self,
        selector: &Selector,
        index: usize,
        key: &str,
    ) -> ProbeResult<()> {
        let node = self.require(selector, index)?;
        self.site
            .journal
            .record(format!("press:{}:{key}", selector.describe()));
        if key == "Enter" && self.document.tag_name(node) == Some("input") {
            if let Some(form) = self.document.closest(node, "form") {
                return self.submit(form);
            }
        }
        Ok(())
    }

    async fn title(&self) -> ProbeResult<String> {
        self.ensure_open()?;
        Ok(self.document.title().to_string())
    }

    async fn current_url(&self) -> ProbeResult<String> {
        self.ensure_open()?;
        Ok(self.url.to_string())
    }

    async fn evaluate(&self, script: &str) -> ProbeResult<Value> {
        self.ensure_open()?;
        let script = script.trim();
        if let Some(value) = self.site.scripts.get(script) {
            return Ok(value.clone());
        }
        match script {
            "document.readyState" => Ok(Value::from("complete")),
            "document.title" => Ok(Value::from(self.document.title())),
            "location.href" | "window.location.href" => Ok(Value::from(self.url.as_str())),
            _ => Err(ProbeError::PageError {
                message: format!("no scripted result for `{script}`"),
            }),
        }
    }

    async fn wait_for_load_state(&self, state: LoadState, timeout: Duration) -> ProbeResult<()> {
        self.ensure_open()?;
        if state != LoadState::NetworkIdle {
            return Ok(());
        }
        let idle_at = self.loaded_at + self.site.network_idle_after;
        let now = Instant::now();
        if idle_at <= now {
            return Ok(());
        }
        if idle_at - now > timeout {
            tokio::time::sleep(timeout).await;
            return Err(ProbeError::Timeout {
                ms: timeout.as_millis() as u64,
                waited_for: state.to_string(),
            });
        }
        tokio::time::sleep_until(idle_at).await;
        Ok(())
    }

    async fn close_page(&mut self) -> ProbeResult<()> {
        self.site.journal.record("close:page");
        if !self.page_open {
            return Err(ProbeError::SessionClosed);
        }
        self.page_open = false;
        if self.site.failing_close.contains(&Resource::Page) {
            return Err(ProbeError::PageError {
                message: "page close failed".to_string(),
            });
        }
        Ok(())
    }

    async fn close_context(&mut self) -> ProbeResult<()> {
        self.site.journal.record("close:context");
        if !self.context_open {
            return Err(ProbeError::SessionClosed);
        }
        self.context_open = false;
        if self.site.failing_close.contains(&Resource::Context) {
            return Err(ProbeError::PageError {
                message: "context close failed".to_string(),
            });
        }
        Ok(())
    }
}
