//! Page content: title, headings, topics.

use super::follow;
use crate::fixture::Session;
use crate::locator::{normalize_whitespace, ElementQuery, NamePattern, Role, Selector};
use crate::result::ProbeResult;

const HEADINGS: &str = "h1, h2, h3, h4, h5, h6";

/// Page title; `""` when it cannot be read
pub async fn title(session: &Session) -> String {
    let title = session.title().await;
    session.recover("title", title, String::new())
}

/// Current URL; `""` when it cannot be read
pub async fn url(session: &Session) -> String {
    let url = session.url().await;
    session.recover("url", url, String::new())
}

pub async fn count_topic_links(session: &Session) -> usize {
    session
        .locate(session.profile().topic_links.clone())
        .count()
        .await
}

/// Headings anywhere on the page
pub async fn count_headings(session: &Session) -> usize {
    session.locate(ElementQuery::css(HEADINGS)).count().await
}

pub async fn is_main_heading_present(session: &Session) -> bool {
    session.locate(ElementQuery::css("h1")).exists().await
}

/// Text of the first `h1`, whitespace collapsed
pub async fn main_heading_text(session: &Session) -> String {
    let text = session.locate(ElementQuery::css("h1")).text_content().await;
    normalize_whitespace(&session.recover("main_heading_text", text, String::new()))
}

/// Whether some element's text contains `text`, ignoring case
pub async fn page_contains_text(session: &Session, text: &str) -> bool {
    match NamePattern::contains(text) {
        Ok(pattern) => session.locate(Selector::text(pattern)).exists().await,
        Err(e) => session.recover("page_contains_text", Err(e), false),
    }
}

/// Follow the topic link whose accessible name contains `name`
pub async fn click_topic(session: &mut Session, name: &str) -> ProbeResult<()> {
    let query = ElementQuery::role_named(Role::Link, NamePattern::contains(name)?)
        .described(format!("topic link '{name}'"));
    follow(session, &query).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{el, Document};
    use crate::fixture::SessionState;
    use crate::helpers::testing::{run, site};
    use crate::static_site::StaticSite;

    fn portal() -> StaticSite {
        site(
            el("body").child(
                el("main")
                    .child(el("h1").text("  Making government\n services easier "))
                    .child(el("h2").text("Popular topics"))
                    .child(el("a").attr("href", "/topics/housing").text("Housing help"))
                    .child(el("a").attr("href", "/topics/money").text("Money"))
                    .child(el("h3").text("More"))
                    .child(el("p").text("Find benefits and services.")),
            ),
        )
        .page(
            "/topics/housing",
            Document::new("Housing", el("html").child(el("body").child(el("h1").text("Housing")))),
        )
    }

    mod query_tests {
        use super::*;

        #[tokio::test]
        async fn test_title_and_url() {
            let (out, _) = run(portal(), |s| {
                Box::pin(async move { Ok((title(s).await, url(s).await)) })
            })
            .await;
            let (title, url) = out.unwrap();
            assert_eq!(title, "Home");
            assert_eq!(url, "https://portal.test/");
        }

        #[tokio::test]
        async fn test_headings_and_topics() {
            let (out, _) = run(portal(), |s| {
                Box::pin(async move {
                    Ok((
                        count_headings(s).await,
                        count_topic_links(s).await,
                        is_main_heading_present(s).await,
                        main_heading_text(s).await,
                    ))
                })
            })
            .await;
            assert_eq!(
                out.unwrap(),
                (3, 2, true, "Making government services easier".to_string())
            );
        }

        #[tokio::test]
        async fn test_page_contains_text() {
            let (out, _) = run(portal(), |s| {
                Box::pin(async move {
                    Ok((
                        page_contains_text(s, "benefits and SERVICES").await,
                        page_contains_text(s, "weather (forecast)").await,
                    ))
                })
            })
            .await;
            assert_eq!(out.unwrap(), (true, false));
        }

        #[tokio::test]
        async fn test_absent_content() {
            let (out, sink) = run(site(el("body")), |s| {
                Box::pin(async move {
                    Ok((
                        count_headings(s).await,
                        count_topic_links(s).await,
                        is_main_heading_present(s).await,
                        main_heading_text(s).await,
                    ))
                })
            })
            .await;
            assert_eq!(out.unwrap(), (0, 0, false, String::new()));
            assert_eq!(sink.count("recovered"), 1);
        }
    }

    mod click_tests {
        use super::*;

        #[tokio::test]
        async fn test_click_topic() {
            let (out, _) = run(portal(), |s| {
                Box::pin(async move {
                    click_topic(s, "housing").await?;
                    Ok((s.state(), title(s).await))
                })
            })
            .await;
            assert_eq!(out.unwrap(), (SessionState::Navigated, "Housing".to_string()));
        }
    }
}
