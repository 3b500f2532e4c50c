//! Primary navigation, footer and logo.

use super::{follow, hrefs, scoped, visible_labels};
use crate::fixture::Session;
use crate::locator::{ElementQuery, NamePattern, Role, Selector};
use crate::result::ProbeResult;

fn primary_nav_links(session: &Session) -> ElementQuery {
    scoped("a", &session.profile().primary_nav)
}

fn footer_links(session: &Session) -> ElementQuery {
    scoped("a", &session.profile().footer_region)
}

/// Non-blank labels of the primary navigation links, in order
pub async fn list_primary_nav_labels(session: &Session) -> Vec<String> {
    let labels = visible_labels(session, primary_nav_links(session)).await;
    session.recover("list_primary_nav_labels", labels, Vec::new())
}

pub async fn count_primary_nav_items(session: &Session) -> usize {
    session.locate(primary_nav_links(session)).count().await
}

/// Every primary navigation link carries a non-empty `href`.
///
/// `false` when the navigation has no links.
pub async fn all_nav_items_have_href(session: &Session) -> bool {
    let hrefs = hrefs(session, primary_nav_links(session), usize::MAX).await;
    let hrefs = session.recover("all_nav_items_have_href", hrefs, Vec::new());
    !hrefs.is_empty()
        && hrefs
            .iter()
            .all(|href| href.as_deref().is_some_and(|h| !h.trim().is_empty()))
}

pub async fn list_footer_labels(session: &Session) -> Vec<String> {
    let labels = visible_labels(session, footer_links(session)).await;
    session.recover("list_footer_labels", labels, Vec::new())
}

pub async fn count_footer_items(session: &Session) -> usize {
    session.locate(footer_links(session)).count().await
}

pub async fn is_footer_present(session: &Session) -> bool {
    session
        .locate(session.profile().footer_region.clone())
        .first()
        .exists()
        .await
}

/// Follow the navigation link whose accessible name contains `label`
pub async fn click_nav_item(session: &mut Session, label: &str) -> ProbeResult<()> {
    let query = ElementQuery::new(
        Selector::role_named(Role::Link, NamePattern::contains(label)?)
            .inside(session.profile().nav_region.clone()),
    )
    .described(format!("navigation item '{label}'"));
    follow(session, &query).await
}

/// Follow the home link
pub async fn click_logo(session: &mut Session) -> ProbeResult<()> {
    let logo = session.resolve(&session.profile().logo).await?;
    follow(session, &logo).await
}
