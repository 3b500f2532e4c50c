//! Browser control over the Chrome `DevTools` Protocol.
//!
//! [`CdpLauncher`] starts one Chromium per session through `chromiumoxide`.
//! [`CdpDriver`] resolves every selector with a single injected resolver
//! function, so role, name and text semantics are identical for reads and
//! actions and match the static driver's rules.

use crate::config::ProbeConfig;
use crate::driver::{DriverLauncher, ElementState, PageDriver};
use crate::locator::{Selector, DEFAULT_POLL_INTERVAL_MS};
use crate::result::{ProbeError, ProbeResult};
use crate::wait::{settle_document, DocumentSnapshot, LoadState, WaitOptions};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
use chromiumoxide::page::Page as CdpPage;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tokio::sync::Mutex;

/// In-page resolver: `(selector, index, op, arg) -> {found, value}`
const RESOLVER: &str = r#"(sel, index, op, arg) => {
  const norm = (s) => (s || '').replace(/\s+/g, ' ').trim();
  const re = (p) => new RegExp(p.source, p.ignore_case ? 'i' : '');
  const visible = (el) => {
    if (!el.isConnected || el.closest('[hidden]')) return false;
    const st = getComputedStyle(el);
    if (st.display === 'none' || st.visibility === 'hidden') return false;
    return el.getClientRects().length > 0;
  };
  const textOf = (el) => (el ? el.textContent || '' : '');
  const accName = (el) => {
    const aria = el.getAttribute('aria-label');
    if (aria && aria.trim()) return norm(aria);
    const by = el.getAttribute('aria-labelledby');
    if (by) {
      const t = by.split(/\s+/).map((id) => textOf(document.getElementById(id))).join(' ');
      if (t.trim()) return norm(t);
    }
    const tag = el.tagName.toLowerCase();
    let candidates;
    if (tag === 'input' || tag === 'textarea' || tag === 'select') {
      const type = (el.getAttribute('type') || 'text').toLowerCase();
      candidates = [
        el.id ? textOf(document.querySelector(`label[for="${CSS.escape(el.id)}"]`)) : '',
        textOf(el.closest('label')),
        tag === 'input' && ['submit', 'button', 'reset'].includes(type) ? el.getAttribute('value') : '',
        el.getAttribute('title'),
        el.getAttribute('placeholder'),
      ];
    } else if (tag === 'img') {
      candidates = [el.getAttribute('alt'), el.getAttribute('title')];
    } else {
      candidates = [el.textContent, el.getAttribute('title')];
    }
    return candidates.map(norm).find((c) => c) || '';
  };
  const resolve = (s) => {
    switch (s.kind) {
      case 'css':
        return Array.from(document.querySelectorAll(s.css));
      case 'role': {
        let els = Array.from(document.querySelectorAll(s.css)).filter(visible);
        if (s.name) {
          const r = re(s.name);
          els = els.filter((e) => r.test(accName(e)));
        }
        return els;
      }
      case 'text': {
        if (!document.body) return [];
        const r = re(s.pattern);
        const all = Array.from(document.body.querySelectorAll('*')).filter((e) => r.test(norm(e.textContent)));
        return all.filter((e) => !all.some((o) => o !== e && e.contains(o)));
      }
      case 'within': {
        const scopes = resolve(s.scope);
        return resolve(s.inner).filter((e) => scopes.some((sc) => sc !== e && sc.contains(e)));
      }
      default:
        throw new Error(`unknown selector kind ${s.kind}`);
    }
  };
  const els = resolve(sel);
  if (op === 'count') return { found: true, value: els.length };
  const el = els[index];
  if (!el) return { found: false, value: null };
  switch (op) {
    case 'state':
      return { found: true, value: {
        tag_name: el.tagName.toLowerCase(),
        visible: visible(el),
        enabled: !el.disabled && !el.closest('fieldset[disabled]'),
      } };
    case 'attr':
      return { found: true, value: el.getAttribute(arg) };
    case 'text':
      return { found: true, value: el.textContent || '' };
    case 'value':
      if (!('value' in el)) throw new Error('not a form control');
      return { found: true, value: String(el.value) };
    case 'fill':
      el.focus();
      el.value = arg;
      el.dispatchEvent(new Event('input', { bubbles: true }));
      el.dispatchEvent(new Event('change', { bubbles: true }));
      return { found: true, value: null };
    case 'click':
      el.scrollIntoView({ block: 'center' });
      el.click();
      return { found: true, value: null };
    case 'check':
      if (el.checked !== arg) el.click();
      return { found: true, value: null };
    case 'focus':
      el.focus();
      return { found: true, value: null };
    default:
      throw new Error(`unknown op ${op}`);
  }
}"#;

#[derive(Debug, Deserialize)]
struct Resolved {
    found: bool,
    #[serde(default)]
    value: Value,
}

/// Marks the current document before an action that may navigate away
const ARM_NAVIGATION: &str = "(() => {
  window.__portalLeaving = false;
  window.addEventListener('beforeunload', () => { window.__portalLeaving = true; }, { once: true });
  return performance.timeOrigin;
})()";

const SNAPSHOT: &str = "({
  timeOrigin: performance.timeOrigin,
  readyState: document.readyState,
  resources: performance.getEntriesByType('resource').length,
  leaving: window.__portalLeaving === true,
})";

fn page_error(e: impl std::fmt::Display) -> ProbeError {
    ProbeError::PageError {
        message: e.to_string(),
    }
}

/// Launches Chromium for each session
#[derive(Debug, Clone, Copy, Default)]
pub struct CdpLauncher;

#[async_trait]
impl DriverLauncher for CdpLauncher {
    async fn launch(&self, config: &ProbeConfig) -> ProbeResult<Box<dyn PageDriver>> {
        Ok(Box::new(CdpDriver::launch(config).await?))
    }
}

/// [`PageDriver`] backed by a real Chromium page
#[derive(Debug)]
pub struct CdpDriver {
    browser: Mutex<Option<CdpBrowser>>,
    page: Option<CdpPage>,
    handler: tokio::task::JoinHandle<()>,
    /// Time origin of the document an action started on
    armed_origin: Mutex<Option<f64>>,
}

impl CdpDriver {
    /// Launch Chromium and open a blank page
    pub async fn launch(config: &ProbeConfig) -> ProbeResult<Self> {
        let mut builder = CdpConfig::builder().window_size(config.viewport.width, config.viewport.height);
        if !config.headless {
            builder = builder.with_head();
        }
        if let Some(ref path) = config.chromium_path {
            builder = builder.chrome_executable(path);
        }
        let cdp_config = builder
            .build()
            .map_err(|message| ProbeError::BrowserLaunchError { message })?;

        let (browser, mut handler) =
            CdpBrowser::launch(cdp_config)
                .await
                .map_err(|e| ProbeError::BrowserLaunchError {
                    message: e.to_string(),
                })?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        let page = browser.new_page("about:blank").await.map_err(page_error)?;
        tracing::debug!(headless = config.headless, "chromium launched");

        Ok(Self {
            browser: Mutex::new(Some(browser)),
            page: Some(page),
            handler,
            armed_origin: Mutex::new(None),
        })
    }

    fn page(&self) -> ProbeResult<&CdpPage> {
        self.page.as_ref().ok_or(ProbeError::SessionClosed)
    }

    async fn eval(&self, script: &str) -> ProbeResult<Value> {
        let result = self.page()?.evaluate(script).await.map_err(page_error)?;
        Ok(result.value().cloned().unwrap_or(Value::Null))
    }

    async fn run(&self, selector: &Selector, index: usize, op: &str, arg: Value) -> ProbeResult<Resolved> {
        let script = format!(
            "({RESOLVER})({}, {index}, {}, {})",
            selector.to_wire(),
            json!(op),
            arg
        );
        let value = self.eval(&script).await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn act(&self, selector: &Selector, index: usize, op: &str, arg: Value) -> ProbeResult<()> {
        let resolved = self.run(selector, index, op, arg).await?;
        if resolved.found {
            Ok(())
        } else {
            Err(ProbeError::not_found(format!("{} >> nth={index}", selector.describe())))
        }
    }

    /// Remember the current document so the next settle waits past it.
    /// A page that cannot be evaluated leaves nothing armed.
    async fn arm_navigation(&self) {
        let origin = self.eval(ARM_NAVIGATION).await.ok().and_then(|v| v.as_f64());
        *self.armed_origin.lock().await = origin;
    }

    async fn snapshot(&self) -> ProbeResult<DocumentSnapshot> {
        Ok(serde_json::from_value(self.eval(SNAPSHOT).await?)?)
    }
}

#[async_trait]
impl PageDriver for CdpDriver {
    async fn navigate(
        &mut self,
        url: &str,
        wait_until: LoadState,
        timeout: Duration,
    ) -> ProbeResult<()> {
        let page = self.page()?;
        tokio::time::timeout(timeout, page.goto(url))
            .await
            .map_err(|_| ProbeError::Timeout {
                ms: timeout.as_millis() as u64,
                waited_for: format!("navigation to {url}"),
            })?
            .map_err(|e| ProbeError::NavigationError {
                url: url.to_string(),
                message: e.to_string(),
            })?;
        self.wait_for_load_state(wait_until, timeout).await
    }

    async fn count(&self, selector: &Selector) -> ProbeResult<usize> {
        let resolved = self.run(selector, 0, "count", Value::Null).await?;
        Ok(resolved.value.as_u64().unwrap_or(0) as usize)
    }

    async fn element_state(
        &self,
        selector: &Selector,
        index: usize,
    ) -> ProbeResult<Option<ElementState>> {
        let resolved = self.run(selector, index, "state", Value::Null).await?;
        if !resolved.found {
            return Ok(None);
        }
        Ok(Some(serde_json::from_value(resolved.value)?))
    }

    async fn attribute(
        &self,
        selector: &Selector,
        index: usize,
        name: &str,
    ) -> ProbeResult<Option<Option<String>>> {
        let resolved = self.run(selector, index, "attr", json!(name)).await?;
        Ok(resolved
            .found
            .then(|| resolved.value.as_str().map(str::to_string)))
    }

    async fn text_content(
        &self,
        selector: &Selector,
        index: usize,
    ) -> ProbeResult<Option<String>> {
        let resolved = self.run(selector, index, "text", Value::Null).await?;
        Ok(resolved
            .found
            .then(|| resolved.value.as_str().unwrap_or_default().to_string()))
    }

    async fn input_value(&self, selector: &Selector, index: usize) -> ProbeResult<Option<String>> {
        let resolved = self.run(selector, index, "value", Value::Null).await?;
        Ok(resolved
            .found
            .then(|| resolved.value.as_str().unwrap_or_default().to_string()))
    }

    async fn fill(&mut self, selector: &Selector, index: usize, text: &str) -> ProbeResult<()> {
        self.act(selector, index, "fill", json!(text)).await
    }

    async fn click(&mut self, selector: &Selector, index: usize) -> ProbeResult<()> {
        self.arm_navigation().await;
        self.act(selector, index, "click", Value::Null).await
    }

    async fn set_checked(
        &mut self,
        selector: &Selector,
        index: usize,
        checked: bool,
    ) -> ProbeResult<()> {
        self.act(selector, index, "check", json!(checked)).await
    }

    async fn press_key(
        &mut self,
        selector: &Selector,
        index: usize,
        key: &str,
    ) -> ProbeResult<()> {
        self.act(selector, index, "focus", Value::Null).await?;
        self.arm_navigation().await;
        let focused = self.page()?.find_element(":focus").await.map_err(page_error)?;
        focused.press_key(key).await.map_err(page_error)?;
        Ok(())
    }

    async fn title(&self) -> ProbeResult<String> {
        Ok(self
            .page()?
            .get_title()
            .await
            .map_err(page_error)?
            .unwrap_or_default())
    }

    async fn current_url(&self) -> ProbeResult<String> {
        Ok(self
            .page()?
            .url()
            .await
            .map_err(page_error)?
            .unwrap_or_default())
    }

    async fn evaluate(&self, script: &str) -> ProbeResult<Value> {
        self.eval(script).await
    }

    async fn wait_for_load_state(&self, state: LoadState, timeout: Duration) -> ProbeResult<()> {
        let previous_origin = self.armed_origin.lock().await.take();
        let options = WaitOptions::new()
            .with_timeout(timeout.as_millis() as u64)
            .with_poll_interval(DEFAULT_POLL_INTERVAL_MS);
        let settled =
            settle_document(options, state, previous_origin, move || self.snapshot()).await?;
        tracing::trace!(
            state = %state,
            polls = settled.polls,
            elapsed_ms = settled.elapsed.as_millis() as u64,
            "page settled"
        );
        Ok(())
    }

    async fn close_page(&mut self) -> ProbeResult<()> {
        let page = self.page.take().ok_or(ProbeError::SessionClosed)?;
        page.close().await.map_err(page_error)
    }

    async fn close_context(&mut self) -> ProbeResult<()> {
        let mut guard = self.browser.lock().await;
        let mut browser = guard.take().ok_or(ProbeError::SessionClosed)?;
        browser.close().await.map_err(page_error)?;
        let _ = browser.wait().await;
        self.handler.abort();
        Ok(())
    }
}
