//! Site search.

use crate::fixture::{Session, SessionState};
use crate::observe::ProbeEvent;
use crate::result::ProbeResult;

/// Whether the search input is visible, probing briefly
pub async fn is_search_box_visible(session: &Session) -> bool {
    match session.resolve(&session.profile().search_input).await {
        Ok(query) => session.locate(query).exists().await,
        Err(e) => session.recover("is_search_box_visible", Err(e), false),
    }
}

/// Current value of the search input; `""` when there is none
pub async fn search_value(session: &Session) -> String {
    let value = async {
        let query = session.resolve(&session.profile().search_input).await?;
        session.locate(query).input_value().await
    }
    .await;
    session.recover("search_value", value, String::new())
}

pub async fn search_results_displayed(session: &Session) -> bool {
    session
        .locate(session.profile().search_results.clone())
        .first()
        .exists()
        .await
}

pub async fn search_results_count(session: &Session) -> usize {
    session
        .locate(session.profile().search_results.clone())
        .count()
        .await
}

/// Type `text` into the search input, read it back, then clear it
pub async fn search_input_accepts_text(session: &mut Session, text: &str) -> bool {
    let outcome = try_accepts_text(session, text).await;
    session.recover("search_input_accepts_text", outcome, false)
}

async fn try_accepts_text(session: &mut Session, text: &str) -> ProbeResult<bool> {
    let input = session.resolve(&session.profile().search_input).await?;
    session.fill(&input, text).await?;
    let value = session.locate(input.clone()).input_value().await?;
    session.clear(&input).await?;
    Ok(value == text)
}

/// Submit `query` through the site search.
///
/// Clicks the first visible submit control; when there is none, presses
/// Enter in the input instead. Waits for the results page to settle.
pub async fn perform_search(session: &mut Session, query: &str) -> ProbeResult<()> {
    let input = session.resolve(&session.profile().search_input).await?;
    session.fill(&input, query).await?;

    match session.resolve_visible(&session.profile().search_submit).await {
        Ok(submit) => session.click(&submit).await?,
        Err(e) => {
            tracing::debug!(session_id = %session.id(), error = %e, "no visible search submit control");
            session.emit(ProbeEvent::FallbackUsed {
                helper: "perform_search".to_string(),
                fallback: "press Enter in search input".to_string(),
            });
            session.press_key(&input, "Enter").await?;
        }
    }

    session.settle().await?;
    session.set_state(SessionState::Searched);
    Ok(())
}

/// Empty the search input
pub async fn clear_search(session: &mut Session) -> ProbeResult<()> {
    let input = session.resolve(&session.profile().search_input).await?;
    session.clear(&input).await
}
