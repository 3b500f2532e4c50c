//! Job search and result filtering.

use crate::dataset::FilterStep;
use crate::fixture::{Session, SessionState};
use crate::locator::{normalize_whitespace, ElementQuery};
use crate::result::ProbeResult;

/// Search jobs by keyword and wait for the results to settle
pub async fn search_jobs(session: &mut Session, keyword: &str) -> ProbeResult<()> {
    let keywords =
        ElementQuery::new(session.profile().job_keywords.clone()).described("job keyword field");
    let button = ElementQuery::new(session.profile().job_search_button.clone())
        .described("job search button");
    session.fill(&keywords, keyword).await?;
    session.click(&button).await?;
    session.settle().await?;
    session.set_state(SessionState::Searched);
    Ok(())
}

/// Open the filter, enter its value, apply it and wait for the results
pub async fn apply_filter(session: &mut Session, step: &FilterStep) -> ProbeResult<()> {
    let apply =
        ElementQuery::new(session.profile().filter_apply.clone()).described("apply filter button");
    session.click(&ElementQuery::new(step.trigger.clone())).await?;
    session.fill(&ElementQuery::new(step.input.clone()), &step.value).await?;
    session.click(&apply).await?;
    session.settle().await?;
    session.set_state(SessionState::FilterApplied);
    Ok(())
}

/// Follow the results pager to the next page.
///
/// `false`, with the page left as it was, once the next link is missing,
/// hidden or disabled.
pub async fn next_results_page(session: &mut Session) -> bool {
    let next = ElementQuery::new(session.profile().results_next.clone())
        .first()
        .described("next results link");
    let state = session
        .driver()
        .element_state(next.selector(), next.target_index())
        .await;
    let disabled = session.locate(next.clone()).attribute("aria-disabled").await;
    let available = match (state, disabled) {
        (Ok(None), _) => false,
        (Ok(Some(state)), Ok(disabled)) => {
            state.is_actionable() && disabled.as_deref() != Some("true")
        }
        (Err(e), _) | (_, Err(e)) => return session.recover("next_results_page", Err(e), false),
    };
    if !available {
        return false;
    }
    let followed = match session.click(&next).await {
        Ok(()) => session.settle().await,
        Err(e) => Err(e),
    };
    session.recover("next_results_page", followed.map(|()| true), false)
}

/// Job result titles, whitespace collapsed, in order
pub async fn result_titles(session: &Session) -> Vec<String> {
    let titles = session
        .locate(session.profile().job_titles.clone())
        .all_text_contents()
        .await
        .map(|titles| titles.iter().map(|t| normalize_whitespace(t)).collect());
    session.recover("result_titles", titles, Vec::new())
}
