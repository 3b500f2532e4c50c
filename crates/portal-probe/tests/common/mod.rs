//! Shared page fixtures for the scenario tests.
//!
//! `portal()` is a small static rendition of the target portal's surface:
//! landmarks, labelled search, primary navigation, topic links, a contact form
//! and a results page that echoes the query.

#![allow(dead_code)]

use portal_probe::dom::{el, Document, El};
use portal_probe::{
    ProbeConfig, RecordingSink, ScenarioDataset, SessionFixture, StaticSite,
};

pub const ORIGIN: &str = "https://portal.test";

/// Short bounds so negative probes finish quickly
pub fn config() -> ProbeConfig {
    ProbeConfig::default()
        .with_base_url(ORIGIN)
        .with_probe_timeout(25)
        .with_action_timeout(100)
        .with_poll_interval(5)
        .with_settle_timeout(1_000)
}

pub fn fixture(site: StaticSite) -> (SessionFixture, RecordingSink) {
    let sink = RecordingSink::new();
    let fixture = SessionFixture::new(config(), site).with_sink(sink.clone());
    (fixture, sink)
}

fn search_form(value: &str) -> El {
    el("form")
        .attr("role", "search")
        .attr("action", "/search")
        .child(el("label").attr("for", "search-field").text("Search all government"))
        .child(
            el("input")
                .id("search-field")
                .attr("type", "search")
                .attr("name", "query")
                .attr("aria-label", "Search")
                .attr("value", value),
        )
        .child(el("button").attr("type", "submit").text("Search"))
}

fn header(search_value: &str) -> El {
    let copy = &ScenarioDataset::builtin().site_copy;
    el("header")
        .child(el("a").attr("href", "/").child(el("img").attr("src", "/logo.svg").attr("alt", copy.logo_alt.as_str())))
        .child(search_form(search_value))
        .child(
            el("nav").attr("aria-label", "Primary navigation").child(el("ul").children(
                [
                    ("/benefits", "Government benefits"),
                    ("/agencies", "Government agencies"),
                    ("/passport", "Get or renew a passport"),
                    ("/about", "About the U.S."),
                ]
                .into_iter()
                .map(|(href, label)| el("li").child(el("a").attr("href", href).text(label))),
            )),
        )
}

fn footer() -> El {
    el("footer").child(el("ul").children(
        [("/privacy", "Privacy policy"), ("/accessibility", "Accessibility"), ("/contact", "Contact USAGov")]
            .into_iter()
            .map(|(href, label)| el("li").child(el("a").attr("href", href).text(label))),
    ))
}

/// Full page shell around `main`
pub fn shell(title: &str, search_value: &str, main: El) -> Document {
    Document::new(
        title,
        el("html").attr("lang", "en").child(
            el("body")
                .child(el("a").class("usa-skipnav").attr("href", "#main-content").text("Skip to main content"))
                .child(header(search_value))
                .child(main.id("main-content"))
                .child(footer()),
        ),
    )
}

fn home() -> Document {
    let topics = [("housing", "Housing help"), ("money", "Money"), ("jobs", "Jobs and unemployment")]
        .into_iter()
        .map(|(slug, label)| el("li").child(el("a").attr("href", format!("/topics/{slug}")).text(label)));
    shell(
        &ScenarioDataset::builtin().site_copy.home_title,
        "",
        el("main")
            .child(el("h1").text("Making government services easier to find"))
            .child(el("img").attr("src", "/hero.jpg").attr("alt", "Family at a service center"))
            .child(el("img").attr("src", "/divider.svg").attr("alt", ""))
            .child(el("h2").text("All topics and services"))
            .child(el("ul").children(topics))
            .child(el("h2").text("Get help"))
            .child(el("p").text("Find answers to common questions about government services."))
            .child(
                el("form")
                    .id("contact")
                    .attr("action", "/contact")
                    .child(el("label").attr("for", "email").text("Email address"))
                    .child(el("input").id("email").attr("type", "email").attr("name", "email").attr("required", ""))
                    .child(el("textarea").attr("name", "message").attr("aria-label", "Your question"))
                    .child(el("button").attr("type", "submit").text("Send")),
            ),
    )
}

fn results(query: &str) -> Document {
    let normalized = query.trim().to_lowercase();
    let entries: Vec<El> = if normalized.is_empty() {
        Vec::new()
    } else {
        (1..=3)
            .map(|i| {
                el("li").class("search-result").child(
                    el("a")
                        .attr("href", format!("/{normalized}/result-{i}"))
                        .text(format!("{normalized} result {i}")),
                )
            })
            .collect()
    };
    shell(
        "Search results | USAGov",
        query,
        el("main")
            .child(el("h1").text("Search results"))
            .child(el("ul").children(entries))
            .child(el("a").attr("href", "/").text("Back to home")),
    )
}

fn topic(title: &str) -> Document {
    shell(
        title,
        "",
        el("main")
            .child(el("h1").text(title))
            .child(el("p").text(format!("Information about {}.", title.to_lowercase()))),
    )
}

/// The static portal
pub fn portal() -> StaticSite {
    StaticSite::new(ORIGIN)
        .unwrap()
        .page("/", home())
        .dynamic_page("/search", |req| results(req.param("query").unwrap_or_default()))
        .page("/benefits", topic("Government benefits"))
        .page("/passport", topic("Passports"))
        .page("/topics/housing", topic("Housing help"))
}

/// A page with none of the portal's surface
pub fn blank_site() -> StaticSite {
    StaticSite::new(ORIGIN)
        .unwrap()
        .page("/", Document::new("", el("html").child(el("body").child(el("div").text("Under construction")))))
}
