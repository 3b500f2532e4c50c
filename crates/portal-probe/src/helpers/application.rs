//! Job application flow: apply from a listing, submit, confirm, edit and
//! resubmit.

use crate::fixture::{Session, SessionState};
use crate::locator::ElementQuery;
use crate::result::ProbeResult;

/// Open the application for the first listed job
pub async fn start_application(session: &mut Session) -> ProbeResult<()> {
    let apply = ElementQuery::new(session.profile().job_apply.clone())
        .first()
        .described("apply button");
    session.click(&apply).await?;
    session.settle().await
}

/// Submit the open application and wait for the confirmation page
pub async fn submit_application(session: &mut Session) -> ProbeResult<()> {
    let submit = ElementQuery::new(session.profile().application_submit.clone())
        .described("submit application button");
    session.click(&submit).await?;
    session.settle().await?;
    session.set_state(SessionState::Applied);
    Ok(())
}

/// Whether an application confirmation is showing
pub async fn confirmation_visible(session: &Session) -> bool {
    session
        .locate(session.profile().application_confirmation.clone())
        .exists()
        .await
}

/// Reopen a submitted application and overwrite fields by `name`.
///
/// Resubmit with [`submit_application`].
pub async fn edit_application(session: &mut Session, edits: &[(&str, &str)]) -> ProbeResult<()> {
    let edit = ElementQuery::new(session.profile().application_edit.clone())
        .described("edit application control");
    session.click(&edit).await?;
    session.settle().await?;
    for (name, value) in edits {
        let field = ElementQuery::css(format!(r#"[name="{name}"]"#))
            .described(format!("application field '{name}'"));
        session.fill(&field, value).await?;
    }
    Ok(())
}
