//! Form filling and inspection.

use super::scoped;
use crate::fixture::Session;
use crate::locator::{ElementQuery, NamePattern, Selector};
use crate::result::{ProbeError, ProbeResult};

const FORM_CONTROLS: &str = "input, textarea, select";

/// Click the submit button inside the form matching `form_css`
pub async fn submit_form(session: &mut Session, form_css: &str) -> ProbeResult<()> {
    let submit = scoped(r#"button[type="submit"]"#, &Selector::css(form_css))
        .described(format!("submit button in '{form_css}'"));
    session.click(&submit).await
}

/// Fill the control whose label text contains `label_text`.
///
/// A matching `label[for]` wins; otherwise a control whose `aria-label`
/// matches is used.
pub async fn fill_form_input(session: &mut Session, label_text: &str, value: &str) -> ProbeResult<()> {
    let control = labelled_control(session, label_text).await?;
    session.fill(&control, value).await
}

async fn labelled_control(session: &Session, label_text: &str) -> ProbeResult<ElementQuery> {
    let pattern = NamePattern::contains(label_text)?;
    let description = format!("form control labelled '{label_text}'");

    let labels = session.locate(ElementQuery::css("label"));
    for index in 0..labels.try_count().await? {
        let label = labels.nth(index);
        if !pattern.is_match(&label.text_content().await?) {
            continue;
        }
        if let Some(id) = label.attribute("for").await?.filter(|id| !id.is_empty()) {
            return Ok(ElementQuery::css(format!(r#"[id="{id}"]"#)).described(description));
        }
    }

    let controls = session.locate(ElementQuery::css(FORM_CONTROLS));
    for index in 0..controls.try_count().await? {
        let aria_label = controls.nth(index).attribute("aria-label").await?;
        if aria_label.is_some_and(|label| pattern.is_match(&label)) {
            return Ok(ElementQuery::css(FORM_CONTROLS)
                .nth(index)
                .described(description));
        }
    }

    Err(ProbeError::not_found(description))
}

/// Empty the control matching `css`
pub async fn clear_form_input(session: &mut Session, css: &str) -> ProbeResult<()> {
    session.clear(&ElementQuery::css(css)).await
}

/// Whether the control matching `css` carries `required`
pub async fn is_input_required(session: &Session, css: &str) -> bool {
    let required = session.locate(ElementQuery::css(css)).attribute("required").await;
    session
        .recover("is_input_required", required, None)
        .is_some()
}

/// Value of the control matching `css`; `""` when there is none
pub async fn form_input_value(session: &Session, css: &str) -> String {
    let value = session.locate(ElementQuery::css(css)).input_value().await;
    session.recover("form_input_value", value, String::new())
}

/// Inputs, text areas and selects inside the form matching `form_css`
pub async fn form_input_count(session: &Session, form_css: &str) -> usize {
    session
        .locate(scoped(FORM_CONTROLS, &Selector::css(form_css)))
        .count()
        .await
}
