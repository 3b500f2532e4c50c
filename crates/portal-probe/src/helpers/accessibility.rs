//! Accessibility checks: landmarks, headings, alt text, labels.

use super::scoped;
use crate::fixture::Session;
use crate::locator::{ElementQuery, NamePattern, Selector};
use crate::result::{ProbeError, ProbeResult};

const HEADINGS: &str = "h1, h2, h3, h4, h5, h6";
const LABELLED_INPUTS: &str = r#"form input[type="text"], form input[type="email"], form textarea"#;

/// Heading levels never skip downwards.
///
/// The previous level starts at 0, so the first heading must be `h1`. Going
/// back up to any level is always allowed.
pub fn heading_levels_valid(levels: &[u8]) -> bool {
    let mut previous = 0u8;
    for &level in levels {
        if level > previous.saturating_add(1) {
            return false;
        }
        previous = level;
    }
    true
}

/// Main content, primary navigation and footer are all present
pub async fn has_main_landmarks(session: &Session) -> bool {
    let profile = session.profile();
    for landmark in [&profile.main_region, &profile.primary_nav, &profile.footer_region] {
        if !session.locate(landmark.clone()).first().exists().await {
            return false;
        }
    }
    true
}

/// Whether a visible element's text matches `pattern`
pub async fn has_skip_link(session: &Session, pattern: &NamePattern) -> bool {
    session
        .locate(Selector::text(pattern.clone()))
        .first()
        .exists()
        .await
}

/// Images in the main region with no `alt` attribute at all.
///
/// `alt=""` marks a decorative image and is not counted.
pub async fn count_images_missing_alt(session: &Session) -> usize {
    session
        .locate(scoped("img:not([alt])", &session.profile().main_region))
        .count()
        .await
}

/// Heading levels inside the main region satisfy [`heading_levels_valid`]
pub async fn heading_hierarchy_valid(session: &Session) -> bool {
    match heading_levels(session).await {
        Ok(levels) => heading_levels_valid(&levels),
        Err(e) => session.recover("heading_hierarchy_valid", Err(e), false),
    }
}

async fn heading_levels(session: &Session) -> ProbeResult<Vec<u8>> {
    let query = scoped(HEADINGS, &session.profile().main_region);
    let count = session.locate(query.clone()).try_count().await?;
    let mut levels = Vec::with_capacity(count);
    for index in 0..count {
        let level = session
            .driver()
            .element_state(query.selector(), index)
            .await?
            .and_then(|state| state.heading_level())
            .ok_or_else(|| ProbeError::not_found(format!("{} >> nth={index}", query.describe())))?;
        levels.push(level);
    }
    Ok(levels)
}

/// `lang` of the document element
pub async fn lang_attribute(session: &Session) -> Option<String> {
    let lang = session.locate(ElementQuery::css("html")).attribute("lang").await;
    session.recover("lang_attribute", lang, None)
}

/// Text inputs in forms have a visible `label[for]` or an `aria-label`.
///
/// Vacuously true when there are no such inputs.
pub async fn form_inputs_have_labels(session: &Session) -> bool {
    let labelled = inputs_labelled(session).await;
    session.recover("form_inputs_have_labels", labelled, false)
}

async fn inputs_labelled(session: &Session) -> ProbeResult<bool> {
    let inputs = session.locate(ElementQuery::css(LABELLED_INPUTS));
    let count = inputs.try_count().await?;
    for index in 0..count {
        let input = inputs.nth(index);
        let has_aria_label = input
            .attribute("aria-label")
            .await?
            .is_some_and(|label| !label.trim().is_empty());
        if has_aria_label {
            continue;
        }
        let Some(id) = input.attribute("id").await?.filter(|id| !id.is_empty()) else {
            return Ok(false);
        };
        let label = session.locate(ElementQuery::css(format!(r#"label[for="{id}"]"#)));
        if !label.is_visible().await {
            return Ok(false);
        }
    }
    Ok(true)
}

/// None of the first sampled main-region links is removed from tab order
pub async fn links_keyboard_accessible(session: &Session) -> bool {
    let reachable = keyboard_reachable(session).await;
    session.recover("links_keyboard_accessible", reachable, false)
}

async fn keyboard_reachable(session: &Session) -> ProbeResult<bool> {
    let links = session.locate(scoped("a", &session.profile().main_region));
    let sample = links
        .try_count()
        .await?
        .min(session.profile().keyboard_sample_limit);
    for index in 0..sample {
        if links.nth(index).attribute("tabindex").await?.as_deref() == Some("-1") {
            return Ok(false);
        }
    }
    Ok(true)
}

/// The main region holds paragraphs, list items or other text blocks
pub async fn has_readable_text(session: &Session) -> bool {
    session
        .locate(session.profile().readable_text.clone())
        .count()
        .await
        > 0
}

/// Fail unless main, header and footer landmarks are all visible
pub async fn verify_page_accessibility(session: &Session) -> ProbeResult<()> {
    let profile = session.profile();
    let landmarks = [
        ("main", &profile.main_region),
        ("header", &profile.header_region),
        ("footer", &profile.footer_region),
    ];
    let mut missing = Vec::new();
    for (name, selector) in landmarks {
        if !session.locate(selector.clone()).first().exists().await {
            missing.push(name);
        }
    }
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ProbeError::assertion(format!(
            "landmarks not visible: {}",
            missing.join(", ")
        )))
    }
}
