//! Links in the main content region.

use super::{hrefs, scoped};
use crate::fixture::Session;
use crate::locator::{normalize_whitespace, ElementQuery};
use crate::result::ProbeResult;
use url::Url;

fn main_links(session: &Session) -> ElementQuery {
    scoped("a", &session.profile().main_region)
}

pub async fn count_main_links(session: &Session) -> usize {
    session.locate(main_links(session)).count().await
}

/// Sampled main links all have visible text; `false` when there are none
pub async fn all_links_have_text(session: &Session) -> bool {
    let texts = sampled_texts(session).await;
    let texts = session.recover("all_links_have_text", texts, Vec::new());
    !texts.is_empty() && texts.iter().all(|t| !normalize_whitespace(t).is_empty())
}

async fn sampled_texts(session: &Session) -> ProbeResult<Vec<String>> {
    let links = session.locate(main_links(session));
    let sample = links
        .try_count()
        .await?
        .min(session.profile().link_sample_limit);
    let mut texts = Vec::with_capacity(sample);
    for index in 0..sample {
        texts.push(links.nth(index).text_content().await?);
    }
    Ok(texts)
}

/// Sampled main links all have a non-empty `href`; `false` when there are none
pub async fn all_links_have_href(session: &Session) -> bool {
    let sample = collect_hrefs(session, session.profile().link_sample_limit).await;
    !sample.is_empty()
        && sample
            .iter()
            .all(|href| href.as_deref().is_some_and(|h| !h.trim().is_empty()))
}

/// `href` of at most `limit` main links in document order; `None` where absent
pub async fn collect_hrefs(session: &Session, limit: usize) -> Vec<Option<String>> {
    let collected = hrefs(session, main_links(session), limit).await;
    session.recover("collect_hrefs", collected, Vec::new())
}

/// Every main link `href` is site-relative or an http(s) URL
pub async fn internal_links_valid(session: &Session) -> bool {
    collect_hrefs(session, usize::MAX)
        .await
        .iter()
        .flatten()
        .all(|href| href.starts_with('/') || href.starts_with("http"))
}

/// Main links pointing at another host
pub async fn count_external_links(session: &Session) -> usize {
    let base_host = Url::parse(&session.config().base_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned));
    collect_hrefs(session, usize::MAX)
        .await
        .iter()
        .flatten()
        .filter_map(|href| Url::parse(href).ok())
        .filter(|url| matches!(url.scheme(), "http" | "https"))
        .filter(|url| url.host_str() != base_host.as_deref())
        .count()
}
