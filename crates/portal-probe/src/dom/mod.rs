//! In-memory DOM for the static driver.
//!
//! Pages are built in code with the [`el`] builder rather than parsed from
//! HTML. The tree keeps nodes in document order, so a node's id is also its
//! position in a pre-order walk.

mod css;

pub use css::SelectorList;

use crate::locator::{normalize_whitespace, Selector};
use crate::result::ProbeResult;

/// Index of a node inside its [`Document`]
pub type NodeId = usize;

/// Element builder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct El {
    tag: String,
    attrs: Vec<(String, String)>,
    children: Vec<Child>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Child {
    El(El),
    Text(String),
}

/// Start building an element
#[must_use]
pub fn el(tag: &str) -> El {
    El {
        tag: tag.to_ascii_lowercase(),
        attrs: Vec::new(),
        children: Vec::new(),
    }
}

impl El {
    /// Set an attribute, replacing any previous value
    #[must_use]
    pub fn attr(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        if let Some(slot) = self.attrs.iter_mut().find(|(n, _)| n == name) {
            slot.1 = value;
        } else {
            self.attrs.push((name.to_string(), value));
        }
        self
    }

    #[must_use]
    pub fn id(self, id: &str) -> Self {
        self.attr("id", id)
    }

    #[must_use]
    pub fn class(self, class: &str) -> Self {
        self.attr("class", class)
    }

    /// Append a text node
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Child::Text(text.into()));
        self
    }

    /// Append a child element
    #[must_use]
    pub fn child(mut self, child: El) -> Self {
        self.children.push(Child::El(child));
        self
    }

    /// Append several child elements
    #[must_use]
    pub fn children(mut self, children: impl IntoIterator<Item = El>) -> Self {
        self.children.extend(children.into_iter().map(Child::El));
        self
    }

    /// Mark with the `hidden` attribute
    #[must_use]
    pub fn hidden(self) -> Self {
        self.attr("hidden", "")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeKind {
    Element {
        tag: String,
        attrs: Vec<(String, String)>,
    },
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A static page: title plus element tree rooted at `html`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    nodes: Vec<Node>,
    root: NodeId,
    title: String,
}

impl Document {
    /// Build a document from a title and its `html` element
    #[must_use]
    pub fn new(title: impl Into<String>, html: El) -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: 0,
            title: title.into(),
        };
        doc.root = doc.push_element(html, None);
        doc
    }

    fn push_element(&mut self, el: El, parent: Option<NodeId>) -> NodeId {
        let id = self.nodes.len();
        self.nodes.push(Node {
            kind: NodeKind::Element {
                tag: el.tag,
                attrs: el.attrs,
            },
            parent,
            children: Vec::new(),
        });
        for child in el.children {
            let child_id = match child {
                Child::El(child) => self.push_element(child, Some(id)),
                Child::Text(text) => {
                    let text_id = self.nodes.len();
                    self.nodes.push(Node {
                        kind: NodeKind::Text(text),
                        parent: Some(id),
                        children: Vec::new(),
                    });
                    text_id
                }
            };
            self.nodes[id].children.push(child_id);
        }
        id
    }

    /// Document title
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Root `html` element
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Every element in document order
    #[must_use]
    pub fn elements(&self) -> Vec<NodeId> {
        (0..self.nodes.len())
            .filter(|id| matches!(self.nodes[*id].kind, NodeKind::Element { .. }))
            .collect()
    }

    /// Lower-case tag name; `None` for text nodes
    #[must_use]
    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Element { tag, .. } => Some(tag),
            NodeKind::Text(_) => None,
        }
    }

    #[must_use]
    pub fn attr(&self, id: NodeId, name: &str) -> Option<&str> {
        match &self.nodes.get(id)?.kind {
            NodeKind::Element { attrs, .. } => attrs
                .iter()
                .find(|(n, _)| n.eq_ignore_ascii_case(name))
                .map(|(_, v)| v.as_str()),
            NodeKind::Text(_) => None,
        }
    }

    #[must_use]
    pub fn has_attr(&self, id: NodeId, name: &str) -> bool {
        self.attr(id, name).is_some()
    }

    pub fn set_attr(&mut self, id: NodeId, name: &str, value: impl Into<String>) {
        if let Some(Node {
            kind: NodeKind::Element { attrs, .. },
            ..
        }) = self.nodes.get_mut(id)
        {
            let value = value.into();
            if let Some(slot) = attrs.iter_mut().find(|(n, _)| n == name) {
                slot.1 = value;
            } else {
                attrs.push((name.to_string(), value));
            }
        }
    }

    pub fn remove_attr(&mut self, id: NodeId, name: &str) {
        if let Some(Node {
            kind: NodeKind::Element { attrs, .. },
            ..
        }) = self.nodes.get_mut(id)
        {
            attrs.retain(|(n, _)| n != name);
        }
    }

    /// Parent element
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id)?.parent
    }

    /// Proper ancestors, nearest first
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |p| self.parent(*p))
    }

    /// Nearest inclusive ancestor with the given tag
    #[must_use]
    pub fn closest(&self, id: NodeId, tag: &str) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|n| self.tag_name(*n) == Some(tag))
    }

    /// Whether `id` lies strictly inside `ancestor`
    #[must_use]
    pub fn is_descendant_of(&self, id: NodeId, ancestor: NodeId) -> bool {
        self.ancestors(id).any(|a| a == ancestor)
    }

    /// Element children in order
    #[must_use]
    pub fn child_elements(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(id)
            .map(|node| {
                node.children
                    .iter()
                    .copied()
                    .filter(|c| self.tag_name(*c).is_some())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Element descendants in document order
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        self.elements()
            .into_iter()
            .filter(|n| self.is_descendant_of(*n, id))
            .collect()
    }

    /// Element with the given `id` attribute
    #[must_use]
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.elements()
            .into_iter()
            .find(|n| self.attr(*n, "id") == Some(id))
    }

    /// The `body` element
    #[must_use]
    pub fn body(&self) -> Option<NodeId> {
        self.elements()
            .into_iter()
            .find(|n| self.tag_name(*n) == Some("body"))
    }

    /// Concatenated text of every descendant text node
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.collect_text(id, &mut out);
        out
    }

    fn collect_text(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.nodes.get(id) else {
            return;
        };
        match &node.kind {
            NodeKind::Text(text) => out.push_str(text),
            NodeKind::Element { .. } => {
                for child in &node.children {
                    self.collect_text(*child, out);
                }
            }
        }
    }

    fn hides_itself(&self, id: NodeId) -> bool {
        let Some(tag) = self.tag_name(id) else {
            return false;
        };
        if matches!(tag, "head" | "script" | "style" | "template" | "title") {
            return true;
        }
        if self.has_attr(id, "hidden") {
            return true;
        }
        if tag == "input"
            && self
                .attr(id, "type")
                .is_some_and(|t| t.eq_ignore_ascii_case("hidden"))
        {
            return true;
        }
        self.attr(id, "style").is_some_and(|style| {
            let compact: String = style
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect::<String>()
                .to_ascii_lowercase();
            compact.contains("display:none") || compact.contains("visibility:hidden")
        })
    }

    /// Rendered: neither the element nor an ancestor hides it
    #[must_use]
    pub fn is_visible(&self, id: NodeId) -> bool {
        self.tag_name(id).is_some()
            && !std::iter::once(id)
                .chain(self.ancestors(id))
                .any(|n| self.hides_itself(n))
    }

    /// Not disabled, directly or through a disabled `fieldset`
    #[must_use]
    pub fn is_enabled(&self, id: NodeId) -> bool {
        !self.has_attr(id, "disabled")
            && !self
                .ancestors(id)
                .any(|a| self.tag_name(a) == Some("fieldset") && self.has_attr(a, "disabled"))
    }

    /// Whether the element is a form control holding a value
    #[must_use]
    pub fn is_form_control(&self, id: NodeId) -> bool {
        matches!(self.tag_name(id), Some("input" | "textarea" | "select"))
    }

    /// Current value of a form control
    #[must_use]
    pub fn value(&self, id: NodeId) -> Option<String> {
        match self.tag_name(id)? {
            "input" => Some(self.attr(id, "value").unwrap_or_default().to_string()),
            "textarea" => Some(
                self.attr(id, "value")
                    .map_or_else(|| self.text_content(id), str::to_string),
            ),
            "select" => {
                let options: Vec<NodeId> = self
                    .descendants(id)
                    .into_iter()
                    .filter(|n| self.tag_name(*n) == Some("option"))
                    .collect();
                let chosen = options
                    .iter()
                    .copied()
                    .find(|o| self.has_attr(*o, "selected"))
                    .or_else(|| options.first().copied());
                Some(chosen.map_or_else(String::new, |o| {
                    self.attr(o, "value")
                        .map_or_else(|| normalize_whitespace(&self.text_content(o)), str::to_string)
                }))
            }
            _ => None,
        }
    }

    pub fn set_value(&mut self, id: NodeId, value: &str) {
        self.set_attr(id, "value", value);
    }

    fn input_type(&self, id: NodeId) -> String {
        self.attr(id, "type").unwrap_or("text").to_ascii_lowercase()
    }

    /// Whether the control is a checkbox or radio button
    #[must_use]
    pub fn is_checkable(&self, id: NodeId) -> bool {
        self.tag_name(id) == Some("input")
            && matches!(self.input_type(id).as_str(), "checkbox" | "radio")
    }

    /// Whether the control submits its form when clicked
    #[must_use]
    pub fn is_submit_control(&self, id: NodeId) -> bool {
        match self.tag_name(id) {
            Some("button") => self.input_type_or(id, "submit") == "submit",
            Some("input") => matches!(self.input_type(id).as_str(), "submit" | "image"),
            _ => false,
        }
    }

    fn input_type_or(&self, id: NodeId, default: &str) -> String {
        self.attr(id, "type").unwrap_or(default).to_ascii_lowercase()
    }

    /// Name/value pairs a GET submission of `form` would send
    #[must_use]
    pub fn form_fields(&self, form: NodeId) -> Vec<(String, String)> {
        self.descendants(form)
            .into_iter()
            .filter(|n| self.is_form_control(*n) && self.is_enabled(*n))
            .filter(|n| !self.is_submit_control(*n))
            .filter(|n| {
                self.tag_name(*n) != Some("input")
                    || !matches!(self.input_type(*n).as_str(), "button" | "reset")
            })
            .filter(|n| !self.is_checkable(*n) || self.has_attr(*n, "checked"))
            .filter_map(|n| {
                let name = self.attr(n, "name")?.to_string();
                let value = if self.is_checkable(n) {
                    self.attr(n, "value").unwrap_or("on").to_string()
                } else {
                    self.value(n).unwrap_or_default()
                };
                Some((name, value))
            })
            .collect()
    }

    /// Accessible name, whitespace-collapsed
    #[must_use]
    pub fn accessible_name(&self, id: NodeId) -> String {
        if let Some(label) = self.attr(id, "aria-label").filter(|l| !l.trim().is_empty()) {
            return normalize_whitespace(label);
        }
        if let Some(ids) = self.attr(id, "aria-labelledby") {
            let text = ids
                .split_whitespace()
                .filter_map(|ref_id| self.element_by_id(ref_id))
                .map(|n| self.text_content(n))
                .collect::<Vec<_>>()
                .join(" ");
            if !text.trim().is_empty() {
                return normalize_whitespace(&text);
            }
        }

        let tag = self.tag_name(id).unwrap_or_default();
        let candidates: Vec<Option<String>> = match tag {
            "input" | "textarea" | "select" => vec![
                self.label_for(id),
                self.closest_label(id),
                (tag == "input"
                    && matches!(self.input_type(id).as_str(), "submit" | "button" | "reset"))
                .then(|| self.attr(id, "value").map(str::to_string))
                .flatten(),
                self.attr(id, "title").map(str::to_string),
                self.attr(id, "placeholder").map(str::to_string),
            ],
            "img" => vec![
                self.attr(id, "alt").map(str::to_string),
                self.attr(id, "title").map(str::to_string),
            ],
            _ => vec![
                Some(self.text_content(id)),
                self.attr(id, "title").map(str::to_string),
            ],
        };
        candidates
            .into_iter()
            .flatten()
            .map(|name| normalize_whitespace(&name))
            .find(|name| !name.is_empty())
            .unwrap_or_default()
    }

    fn label_for(&self, id: NodeId) -> Option<String> {
        let control_id = self.attr(id, "id")?;
        self.elements()
            .into_iter()
            .find(|n| self.tag_name(*n) == Some("label") && self.attr(*n, "for") == Some(control_id))
            .map(|label| self.text_content(label))
    }

    fn closest_label(&self, id: NodeId) -> Option<String> {
        self.ancestors(id)
            .find(|a| self.tag_name(*a) == Some("label"))
            .map(|label| self.text_content(label))
    }

    /// Elements matching a CSS selector list, in document order
    pub fn select_css(&self, css: &str) -> ProbeResult<Vec<NodeId>> {
        let list = SelectorList::parse(css)?;
        Ok(self
            .elements()
            .into_iter()
            .filter(|n| list.matches(self, *n))
            .collect())
    }

    /// Elements matching a selector, in document order.
    ///
    /// Role selectors only see rendered elements, like an accessibility tree.
    pub fn select(&self, selector: &Selector) -> ProbeResult<Vec<NodeId>> {
        match selector {
            Selector::Css { css } => self.select_css(css),
            Selector::Role { role, name } => Ok(self
                .select_css(role.implicit_css())?
                .into_iter()
                .filter(|n| self.is_visible(*n))
                .filter(|n| {
                    name.as_ref()
                        .map_or(true, |pattern| pattern.is_match(&self.accessible_name(*n)))
                })
                .collect()),
            Selector::Text { text } => {
                let Some(body) = self.body() else {
                    return Ok(Vec::new());
                };
                let candidates: Vec<NodeId> = self
                    .descendants(body)
                    .into_iter()
                    .filter(|n| text.is_match(&self.text_content(*n)))
                    .collect();
                Ok(candidates
                    .iter()
                    .copied()
                    .filter(|n| {
                        !candidates
                            .iter()
                            .any(|other| self.is_descendant_of(*other, *n))
                    })
                    .collect())
            }
            Selector::Within { scope, inner } => {
                let scopes = self.select(scope)?;
                Ok(self
                    .select(inner)?
                    .into_iter()
                    .filter(|n| scopes.iter().any(|s| self.is_descendant_of(*n, *s)))
                    .collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locator::{NamePattern, Role};

    fn form_page() -> Document {
        Document::new(
            "Forms",
            el("html").attr("lang", "en").child(
                el("body").child(
                    el("main")
                        .child(el("h1").text("Contact"))
                        .child(
                            el("form")
                                .id("contact")
                                .child(el("label").attr("for", "email").text("Email address"))
                                .child(el("input").id("email").attr("type", "email").attr("name", "email"))
                                .child(
                                    el("label")
                                        .text("Phone ")
                                        .child(el("input").attr("type", "tel").attr("name", "phone")),
                                )
                                .child(el("input").attr("aria-label", "Zip code").attr("name", "zip"))
                                .child(el("input").attr("type", "hidden").attr("name", "token").attr("value", "t"))
                                .child(el("input").attr("type", "checkbox").attr("name", "news"))
                                .child(el("button").attr("type", "submit").text(" Send  message ")),
                        )
                        .child(el("img").attr("src", "/a.png").attr("alt", "Seal"))
                        .child(el("p").attr("style", "display: none").text("secret")),
                ),
            ),
        )
    }

    mod tree_tests {
        use super::*;

        #[test]
        fn test_node_ids_follow_document_order() {
            let doc = form_page();
            let tags: Vec<&str> = doc
                .elements()
                .into_iter()
                .filter_map(|n| doc.tag_name(n))
                .take(4)
                .collect();
            assert_eq!(tags, vec!["html", "body", "main", "h1"]);
        }

        #[test]
        fn test_text_content_concatenates() {
            let doc = form_page();
            let button = doc.select_css("button").unwrap()[0];
            assert_eq!(doc.text_content(button), " Send  message ");
        }

        #[test]
        fn test_closest_and_descendant() {
            let doc = form_page();
            let email = doc.element_by_id("email").unwrap();
            let form = doc.closest(email, "form").unwrap();
            assert_eq!(doc.attr(form, "id"), Some("contact"));
            assert!(doc.is_descendant_of(email, form));
            assert!(!doc.is_descendant_of(form, form));
        }
    }

    mod visibility_tests {
        use super::*;

        #[test]
        fn test_display_none_is_hidden() {
            let doc = form_page();
            let p = doc.select_css("p").unwrap()[0];
            assert!(!doc.is_visible(p));
        }

        #[test]
        fn test_hidden_input_is_hidden() {
            let doc = form_page();
            let token = doc.select_css(r#"input[name="token"]"#).unwrap()[0];
            assert!(!doc.is_visible(token));
        }

        #[test]
        fn test_hidden_ancestor_hides_descendants() {
            let doc = Document::new(
                "t",
                el("html").child(el("body").child(el("div").hidden().child(el("a").attr("href", "/")))),
            );
            let a = doc.select_css("a").unwrap()[0];
            assert!(!doc.is_visible(a));
        }

        #[test]
        fn test_disabled_fieldset_disables_controls() {
            let doc = Document::new(
                "t",
                el("html").child(
                    el("body").child(el("fieldset").attr("disabled", "").child(el("input"))),
                ),
            );
            let input = doc.select_css("input").unwrap()[0];
            assert!(!doc.is_enabled(input));
        }
    }

    mod accessible_name_tests {
        use super::*;

        #[test]
        fn test_label_for() {
            let doc = form_page();
            let email = doc.element_by_id("email").unwrap();
            assert_eq!(doc.accessible_name(email), "Email address");
        }

        #[test]
        fn test_wrapping_label() {
            let doc = form_page();
            let phone = doc.select_css(r#"input[name="phone"]"#).unwrap()[0];
            assert_eq!(doc.accessible_name(phone), "Phone");
        }

        #[test]
        fn test_aria_label_wins() {
            let doc = form_page();
            let zip = doc.select_css(r#"input[name="zip"]"#).unwrap()[0];
            assert_eq!(doc.accessible_name(zip), "Zip code");
        }

        #[test]
        fn test_aria_labelledby() {
            let doc = Document::new(
                "t",
                el("html").child(
                    el("body")
                        .child(el("h2").id("nav-title").text("Site  sections"))
                        .child(el("nav").attr("aria-labelledby", "nav-title")),
                ),
            );
            let nav = doc.select_css("nav").unwrap()[0];
            assert_eq!(doc.accessible_name(nav), "Site sections");
        }

        #[test]
        fn test_button_text_collapsed() {
            let doc = form_page();
            let button = doc.select_css("button").unwrap()[0];
            assert_eq!(doc.accessible_name(button), "Send message");
        }

        #[test]
        fn test_img_alt() {
            let doc = form_page();
            let img = doc.select_css("img").unwrap()[0];
            assert_eq!(doc.accessible_name(img), "Seal");
        }

        #[test]
        fn test_submit_input_value() {
            let doc = Document::new(
                "t",
                el("html").child(el("body").child(el("input").attr("type", "submit").attr("value", "Search"))),
            );
            let input = doc.select_css("input").unwrap()[0];
            assert_eq!(doc.accessible_name(input), "Search");
        }
    }

    mod select_tests {
        use super::*;

        #[test]
        fn test_role_with_name() {
            let doc = form_page();
            let found = doc
                .select(&Selector::role_named(
                    Role::Button,
                    NamePattern::new("send").unwrap(),
                ))
                .unwrap();
            assert_eq!(found.len(), 1);
        }

        #[test]
        fn test_role_textbox_covers_untyped_input() {
            let doc = form_page();
            let found = doc.select(&Selector::role(Role::Textbox)).unwrap();
            // email, tel, untyped zip; hidden and checkbox excluded
            assert_eq!(found.len(), 3);
        }

        #[test]
        fn test_role_skips_hidden_elements() {
            let doc = Document::new(
                "t",
                el("html").child(
                    el("body")
                        .child(el("button").hidden().text("Search"))
                        .child(el("button").text("Search")),
                ),
            );
            let found = doc
                .select(&Selector::role_named(Role::Button, NamePattern::new("search").unwrap()))
                .unwrap();
            assert_eq!(found.len(), 1);
        }

        #[test]
        fn test_text_selector_returns_innermost() {
            let doc = form_page();
            let found = doc
                .select(&Selector::text(NamePattern::new("send message").unwrap()))
                .unwrap();
            assert_eq!(found.len(), 1);
            assert_eq!(doc.tag_name(found[0]), Some("button"));
        }

        #[test]
        fn test_within_scopes_to_descendants() {
            let doc = form_page();
            let inside = doc
                .select(&Selector::css("input").inside(Selector::css("label")))
                .unwrap();
            assert_eq!(inside.len(), 1);
            assert_eq!(doc.attr(inside[0], "name"), Some("phone"));
        }

        #[test]
        fn test_bad_css_is_an_error() {
            let doc = form_page();
            assert!(doc.select(&Selector::css("a::before")).is_err());
        }
    }

    mod form_tests {
        use super::*;

        #[test]
        fn test_form_fields_skip_unchecked_and_submit() {
            let mut doc = form_page();
            let email = doc.element_by_id("email").unwrap();
            doc.set_value(email, "a@b.gov");
            let form = doc.element_by_id("contact").unwrap();
            let fields = doc.form_fields(form);
            assert_eq!(
                fields,
                vec![
                    ("email".to_string(), "a@b.gov".to_string()),
                    ("phone".to_string(), String::new()),
                    ("zip".to_string(), String::new()),
                    ("token".to_string(), "t".to_string()),
                ]
            );
        }

        #[test]
        fn test_checked_checkbox_submits_on() {
            let mut doc = form_page();
            let news = doc.select_css(r#"input[name="news"]"#).unwrap()[0];
            doc.set_attr(news, "checked", "");
            let form = doc.element_by_id("contact").unwrap();
            assert!(doc
                .form_fields(form)
                .contains(&("news".to_string(), "on".to_string())));
        }

        #[test]
        fn test_select_value_defaults_to_first_option() {
            let doc = Document::new(
                "t",
                el("html").child(el("body").child(
                    el("select")
                        .child(el("option").attr("value", "all").text("All"))
                        .child(el("option").attr("value", "dc").text("DC")),
                )),
            );
            let select = doc.select_css("select").unwrap()[0];
            assert_eq!(doc.value(select).as_deref(), Some("all"));
        }
    }
}
