//! Domain helpers scenarios are written in.
//!
//! Query helpers never fail: any resolution error becomes a definite negative
//! value (`false`, `0`, `""`, `None`, an empty list) and a `recovered` event.
//! Mutating helpers return [`ProbeResult`](crate::result::ProbeResult) and
//! fail only when an essential element is missing or never actionable.

pub mod accessibility;
pub mod application;
pub mod content;
pub mod filters;
pub mod forms;
pub mod links;
pub mod navigation;
pub mod search;

pub use accessibility::{
    count_images_missing_alt, form_inputs_have_labels, has_main_landmarks, has_readable_text,
    has_skip_link, heading_hierarchy_valid, heading_levels_valid, lang_attribute,
    links_keyboard_accessible, verify_page_accessibility,
};
pub use application::{
    confirmation_visible, edit_application, start_application, submit_application,
};
pub use content::{
    click_topic, count_headings, count_topic_links, is_main_heading_present, main_heading_text,
    page_contains_text, title, url,
};
pub use filters::{apply_filter, next_results_page, result_titles, search_jobs};
pub use forms::{
    clear_form_input, fill_form_input, form_input_count, form_input_value, is_input_required,
    submit_form,
};
pub use links::{
    all_links_have_href, all_links_have_text, collect_hrefs, count_external_links,
    count_main_links, internal_links_valid,
};
pub use navigation::{
    all_nav_items_have_href, click_logo, click_nav_item, count_footer_items,
    count_primary_nav_items, is_footer_present, list_footer_labels, list_primary_nav_labels,
};
pub use search::{
    clear_search, is_search_box_visible, perform_search, search_input_accepts_text,
    search_results_count, search_results_displayed, search_value,
};

use crate::fixture::{Session, SessionState};
use crate::locator::{normalize_whitespace, ElementQuery, Selector};
use crate::result::ProbeResult;

/// `css` matches inside `scope`
pub(crate) fn scoped(css: &str, scope: &Selector) -> ElementQuery {
    ElementQuery::new(Selector::css(css).inside(scope.clone()))
}

/// Normalized, non-blank text of every match
pub(crate) async fn visible_labels(session: &Session, query: ElementQuery) -> ProbeResult<Vec<String>> {
    let texts = session.locate(query).all_text_contents().await?;
    Ok(texts
        .iter()
        .map(|t| normalize_whitespace(t))
        .filter(|t| !t.is_empty())
        .collect())
}

/// `href` of the first `limit` matches, in document order
pub(crate) async fn hrefs(
    session: &Session,
    query: ElementQuery,
    limit: usize,
) -> ProbeResult<Vec<Option<String>>> {
    let located = session.locate(query);
    let count = located.try_count().await?.min(limit);
    let mut out = Vec::with_capacity(count);
    for index in 0..count {
        out.push(located.nth(index).attribute("href").await?);
    }
    Ok(out)
}

/// Click a link-like target and wait for the next page to settle
pub(crate) async fn follow(session: &mut Session, query: &ElementQuery) -> ProbeResult<()> {
    session.click(query).await?;
    session.settle().await?;
    session.set_state(SessionState::Navigated);
    Ok(())
}
