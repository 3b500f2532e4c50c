//! End-to-end scenarios against the static portal.
//!
//! These mirror the live suite: one session per scenario, helpers to reach a
//! state, plain assertions on the facts they return.

#![allow(clippy::expect_used, clippy::unwrap_used)]

mod common;

use common::{blank_site, fixture, portal};
use portal_probe::prelude::*;

// ============================================================================
// Search
// ============================================================================

#[tokio::test]
async fn test_search_scenarios_reach_results() {
    let (fixture, _) = fixture(portal());
    for case in &ScenarioDataset::builtin().search_cases {
        let query = case.query.clone();
        let keywords = case.expected_keywords.clone();
        let (before, after, title, links, titles) = with_session(&fixture, |s| {
            Box::pin(async move {
                let before = url(s).await;
                perform_search(s, &query).await?;
                let titles = s
                    .locate(s.profile().search_results.clone())
                    .all_text_contents()
                    .await?;
                Ok((before, url(s).await, title(s).await, count_main_links(s).await, titles))
            })
        })
        .await
        .unwrap();

        assert!(after != before || !title.is_empty(), "{}", case.description);
        assert!(links > 0, "{}", case.description);
        for keyword in &keywords {
            assert!(titles.iter().any(|t| t.to_lowercase().contains(keyword)), "{keyword}");
        }
    }
}

#[tokio::test]
async fn test_empty_search_leaves_empty_value() {
    let (fixture, _) = fixture(portal());
    let value = with_session(&fixture, |s| {
        Box::pin(async move {
            perform_search(s, "").await?;
            Ok(search_value(s).await)
        })
    })
    .await
    .unwrap();
    assert_eq!(value, "");
}

#[tokio::test]
async fn test_clear_search_twice() {
    let (fixture, _) = fixture(portal());
    let values = with_session(&fixture, |s| {
        Box::pin(async move {
            let input = s.resolve(&s.profile().search_input).await?;
            s.fill(&input, "passport").await?;
            clear_search(s).await?;
            let first = search_value(s).await;
            clear_search(s).await?;
            Ok((first, search_value(s).await))
        })
    })
    .await
    .unwrap();
    assert_eq!(values, (String::new(), String::new()));
}

#[tokio::test]
async fn test_search_input_takes_edge_case_input() {
    let (fixture, _) = fixture(portal());
    let edge_cases = ScenarioDataset::builtin().edge_cases.clone();
    let accepted = with_session(&fixture, |s| {
        Box::pin(async move {
            let mut accepted = Vec::new();
            for case in &edge_cases {
                accepted.push((case.name.clone(), search_input_accepts_text(s, &case.input).await));
            }
            Ok(accepted)
        })
    })
    .await
    .unwrap();
    for (name, ok) in accepted {
        assert!(ok, "search input rejected {name} input");
    }
}

#[tokio::test]
async fn test_search_box_carries_dataset_name() {
    let (fixture, _) = fixture(portal());
    let name = ScenarioDataset::builtin().site_copy.search_control_pattern().unwrap();
    let visible = with_session(&fixture, |s| {
        Box::pin(async move {
            let named = ElementQuery::role_named(Role::Searchbox, name);
            Ok(is_search_box_visible(s).await && s.locate(named).exists().await)
        })
    })
    .await
    .unwrap();
    assert!(visible);
}

// ============================================================================
// Navigation
// ============================================================================

#[tokio::test]
async fn test_primary_navigation_is_well_formed() {
    let (fixture, _) = fixture(portal());
    let (labels, count, hrefs) = with_session(&fixture, |s| {
        Box::pin(async move {
            Ok((
                list_primary_nav_labels(s).await,
                count_primary_nav_items(s).await,
                all_nav_items_have_href(s).await,
            ))
        })
    })
    .await
    .unwrap();
    assert!(!labels.is_empty());
    assert!(labels.iter().all(|l| !l.trim().is_empty()));
    assert_eq!(labels.len(), count);
    assert!(hrefs);
}

#[tokio::test]
async fn test_navigation_cases_reach_their_paths() {
    let (fixture, sink) = fixture(portal());
    for case in &ScenarioDataset::builtin().navigation_cases {
        let label = case.label.clone();
        let (state, url) = with_session(&fixture, |s| {
            Box::pin(async move {
                click_nav_item(s, &label).await?;
                Ok((s.state(), url(s).await))
            })
        })
        .await
        .unwrap();
        assert_eq!(state, SessionState::Navigated);
        assert!(url.ends_with(&case.path), "{}", case.description);
    }
    assert_eq!(sink.count("session_opened"), sink.count("session_closed"));
}

#[tokio::test]
async fn test_critical_links_are_reachable() {
    let (fixture, _) = fixture(portal());
    for link in &ScenarioDataset::builtin().critical_links {
        let name = link.name.clone();
        let title = with_session(&fixture, |s| {
            Box::pin(async move {
                click_nav_item(s, &name).await?;
                Ok(title(s).await)
            })
        })
        .await
        .unwrap();
        assert_ne!(title, NOT_FOUND_TITLE, "{}", link.description);
    }
}

#[tokio::test]
async fn test_logo_returns_home_from_topic() {
    let (fixture, _) = fixture(portal());
    let home_title = ScenarioDataset::builtin().site_copy.home_title.clone();
    let title = with_session(&fixture, |s| {
        Box::pin(async move {
            click_topic(s, "housing").await?;
            click_logo(s).await?;
            Ok(title(s).await)
        })
    })
    .await
    .unwrap();
    assert_eq!(title, home_title);
}

#[tokio::test]
async fn test_footer_links() {
    let (fixture, _) = fixture(portal());
    let (present, labels, count) = with_session(&fixture, |s| {
        Box::pin(async move {
            Ok((
                is_footer_present(s).await,
                list_footer_labels(s).await,
                count_footer_items(s).await,
            ))
        })
    })
    .await
    .unwrap();
    assert!(present);
    assert_eq!(labels.len(), count);
    assert!(labels.contains(&"Privacy policy".to_string()));
}

// ============================================================================
// Content, links, accessibility
// ============================================================================

#[tokio::test]
async fn test_home_page_content() {
    let (fixture, _) = fixture(portal());
    let (topics, headings, h1, readable) = with_session(&fixture, |s| {
        Box::pin(async move {
            Ok((
                count_topic_links(s).await,
                count_headings(s).await,
                main_heading_text(s).await,
                has_readable_text(s).await,
            ))
        })
    })
    .await
    .unwrap();
    assert_eq!(topics, 3);
    assert_eq!(headings, 3);
    assert_eq!(h1, "Making government services easier to find");
    assert!(readable);
}

#[tokio::test]
async fn test_main_links() {
    let (fixture, _) = fixture(portal());
    let (count, text, href, sample, internal, external) = with_session(&fixture, |s| {
        Box::pin(async move {
            Ok((
                count_main_links(s).await,
                all_links_have_text(s).await,
                all_links_have_href(s).await,
                collect_hrefs(s, 20).await,
                internal_links_valid(s).await,
                count_external_links(s).await,
            ))
        })
    })
    .await
    .unwrap();
    assert_eq!(count, 3);
    assert!(text && href && internal);
    assert_eq!(
        sample,
        vec![
            Some("/topics/housing".to_string()),
            Some("/topics/money".to_string()),
            Some("/topics/jobs".to_string()),
        ]
    );
    assert_eq!(external, 0);
}

#[tokio::test]
async fn test_home_page_is_accessible() {
    let (fixture, _) = fixture(portal());
    let skip = ScenarioDataset::builtin().site_copy.skip_link_pattern().unwrap();
    let checks = with_session(&fixture, |s| {
        Box::pin(async move {
            verify_page_accessibility(s).await?;
            Ok([
                ("landmarks", has_main_landmarks(s).await),
                ("skip link", has_skip_link(s, &skip).await),
                ("alt text", count_images_missing_alt(s).await == 0),
                ("headings", heading_hierarchy_valid(s).await),
                ("lang", lang_attribute(s).await.is_some()),
                ("labels", form_inputs_have_labels(s).await),
                ("keyboard", links_keyboard_accessible(s).await),
            ])
        })
    })
    .await
    .unwrap();
    for (name, ok) in checks {
        assert!(ok, "{name} check failed");
    }
}

#[tokio::test]
async fn test_blank_page_answers_negatively() {
    let (fixture, sink) = fixture(blank_site());
    let skip = ScenarioDataset::builtin().site_copy.skip_link_pattern().unwrap();
    let booleans = with_session(&fixture, |s| {
        Box::pin(async move {
            Ok(vec![
                is_search_box_visible(s).await,
                search_results_displayed(s).await,
                all_nav_items_have_href(s).await,
                is_footer_present(s).await,
                is_main_heading_present(s).await,
                has_main_landmarks(s).await,
                has_skip_link(s, &skip).await,
                has_readable_text(s).await,
                all_links_have_text(s).await,
                all_links_have_href(s).await,
                is_input_required(s, "#email").await,
            ])
        })
    })
    .await
    .unwrap();
    assert!(booleans.iter().all(|b| !b));
    assert!(sink.count("recovered") >= 2);
}

#[tokio::test]
async fn test_blank_page_fails_strict_checks() {
    let (fixture, _) = fixture(blank_site());
    let err = with_session(&fixture, |s| {
        Box::pin(async move { verify_page_accessibility(s).await })
    })
    .await
    .unwrap_err();
    assert!(matches!(err, ProbeError::AssertionFailed { .. }));

    let err = with_session(&fixture, |s| Box::pin(async move { perform_search(s, "passport").await }))
        .await
        .unwrap_err();
    assert!(matches!(err, ProbeError::ElementNotFound { .. }));
}

// ============================================================================
// Forms
// ============================================================================

#[tokio::test]
async fn test_contact_form() {
    let (fixture, _) = fixture(portal());
    let (required, count, value, url) = with_session(&fixture, |s| {
        Box::pin(async move {
            fill_form_input(s, "Email address", "ada@example.gov").await?;
            fill_form_input(s, "your question", "How do I renew?").await?;
            let required = is_input_required(s, "#email").await;
            let count = form_input_count(s, "#contact").await;
            let value = form_input_value(s, "#email").await;
            submit_form(s, "#contact").await?;
            Ok((required, count, value, url(s).await))
        })
    })
    .await
    .unwrap();
    assert!(required);
    assert_eq!(count, 2);
    assert_eq!(value, "ada@example.gov");
    assert!(url.contains("/contact?email=ada%40example.gov"));
}
