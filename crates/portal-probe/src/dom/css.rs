//! CSS selector subset for the in-memory DOM.
//!
//! Supported: selector lists (`,`), descendant and child (`>`) combinators,
//! type, universal, `#id`, `.class`, attribute conditions (`[a]`, `[a=v]`,
//! `[a*=v]`, `[a^=v]`, `[a$=v]`, `[a~=v]`) and `:not(<compound>)`.
//! Anything else is rejected with `UnsupportedSelector` rather than silently
//! matching nothing.

use super::{Document, NodeId};
use crate::result::{ProbeError, ProbeResult};

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals(String),
    Contains(String),
    Prefix(String),
    Suffix(String),
    Includes(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrCondition {
    name: String,
    op: AttrOp,
}

impl AttrCondition {
    fn matches(&self, value: Option<&str>) -> bool {
        let Some(value) = value else {
            return false;
        };
        match &self.op {
            AttrOp::Exists => true,
            AttrOp::Equals(expected) => value == expected,
            AttrOp::Contains(expected) => !expected.is_empty() && value.contains(expected.as_str()),
            AttrOp::Prefix(expected) => !expected.is_empty() && value.starts_with(expected.as_str()),
            AttrOp::Suffix(expected) => !expected.is_empty() && value.ends_with(expected.as_str()),
            AttrOp::Includes(expected) => value.split_whitespace().any(|token| token == expected),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrCondition>,
    negations: Vec<Compound>,
}

impl Compound {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        let Some(tag) = doc.tag_name(node) else {
            return false;
        };
        if let Some(expected) = &self.tag {
            if !tag.eq_ignore_ascii_case(expected) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if doc.attr(node, "id") != Some(id.as_str()) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let classes = doc.attr(node, "class").unwrap_or_default();
            if self
                .classes
                .iter()
                .any(|class| !classes.split_whitespace().any(|c| c == class))
            {
                return false;
            }
        }
        if self
            .attrs
            .iter()
            .any(|cond| !cond.matches(doc.attr(node, &cond.name)))
        {
            return false;
        }
        !self.negations.iter().any(|neg| neg.matches(doc, node))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Part {
    compound: Compound,
    // Relation to the part on the left.
    combinator: Option<Combinator>,
}

/// A parsed selector list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    groups: Vec<Vec<Part>>,
}

impl SelectorList {
    /// Parse a selector list
    pub fn parse(css: &str) -> ProbeResult<Self> {
        let groups = split_top_level(css, |c| c == ',', false)?
            .iter()
            .map(|group| parse_complex(css, group))
            .collect::<ProbeResult<Vec<_>>>()?;
        if groups.is_empty() {
            return Err(unsupported(css, "empty selector"));
        }
        Ok(Self { groups })
    }

    /// Whether `node` matches any selector in the list
    #[must_use]
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.groups.iter().any(|parts| matches_chain(doc, node, parts))
    }
}

fn unsupported(selector: &str, reason: &str) -> ProbeError {
    ProbeError::UnsupportedSelector {
        selector: selector.to_string(),
        reason: reason.to_string(),
    }
}

fn matches_chain(doc: &Document, node: NodeId, parts: &[Part]) -> bool {
    let Some(last) = parts.last() else {
        return false;
    };
    if !last.compound.matches(doc, node) {
        return false;
    }

    let mut current = node;
    for idx in (1..parts.len()).rev() {
        let left = &parts[idx - 1].compound;
        let combinator = parts[idx].combinator.unwrap_or(Combinator::Descendant);
        let matched = match combinator {
            Combinator::Child => doc.parent(current).filter(|p| left.matches(doc, *p)),
            Combinator::Descendant => doc.ancestors(current).find(|p| left.matches(doc, *p)),
        };
        let Some(matched) = matched else {
            return false;
        };
        current = matched;
    }
    true
}

/// Split at top-level separator characters, ignoring brackets, parens and
/// quoted strings. With `emit_sep`, each separator becomes its own token.
fn split_top_level(
    src: &str,
    is_sep: impl Fn(char) -> bool,
    emit_sep: bool,
) -> ProbeResult<Vec<String>> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    for ch in src.chars() {
        if let Some(q) = quote {
            current.push(ch);
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => {
                quote = Some(ch);
                current.push(ch);
            }
            '[' | '(' => {
                depth += 1;
                current.push(ch);
            }
            ']' | ')' => {
                depth = depth
                    .checked_sub(1)
                    .ok_or_else(|| unsupported(src, "unbalanced brackets"))?;
                current.push(ch);
            }
            c if depth == 0 && is_sep(c) => {
                if !current.trim().is_empty() {
                    parts.push(current.trim().to_string());
                } else if !emit_sep {
                    return Err(unsupported(src, "empty selector group"));
                }
                current.clear();
                if emit_sep && !c.is_whitespace() {
                    parts.push(c.to_string());
                }
            }
            _ => current.push(ch),
        }
    }

    if depth != 0 || quote.is_some() {
        return Err(unsupported(src, "unbalanced brackets or quotes"));
    }
    if !current.trim().is_empty() {
        parts.push(current.trim().to_string());
    } else if !emit_sep {
        return Err(unsupported(src, "empty selector group"));
    }
    Ok(parts)
}

fn parse_complex(full: &str, group: &str) -> ProbeResult<Vec<Part>> {
    let tokens = split_top_level(group, |c| c.is_whitespace() || c == '>', true)?;
    let mut parts = Vec::new();
    let mut pending: Option<Combinator> = None;

    for token in tokens {
        if token == ">" {
            if pending.is_some() || parts.is_empty() {
                return Err(unsupported(full, "dangling combinator"));
            }
            pending = Some(Combinator::Child);
            continue;
        }
        let compound = parse_compound(full, &token)?;
        let combinator = if parts.is_empty() {
            None
        } else {
            Some(pending.take().unwrap_or(Combinator::Descendant))
        };
        parts.push(Part {
            compound,
            combinator,
        });
    }

    if parts.is_empty() || pending.is_some() {
        return Err(unsupported(full, "dangling combinator"));
    }
    Ok(parts)
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn read_ident(chars: &[char], start: usize) -> (String, usize) {
    let mut end = start;
    while end < chars.len() && is_ident_char(chars[end]) {
        end += 1;
    }
    (chars[start..end].iter().collect(), end)
}

fn parse_compound(full: &str, token: &str) -> ProbeResult<Compound> {
    let chars: Vec<char> = token.chars().collect();
    let mut compound = Compound::default();
    let mut universal = false;
    let mut i = 0usize;

    while i < chars.len() {
        match chars[i] {
            '*' if i == 0 => {
                universal = true;
                i += 1;
            }
            '#' => {
                let (id, next) = read_ident(&chars, i + 1);
                if id.is_empty() || compound.id.replace(id).is_some() {
                    return Err(unsupported(full, "bad id selector"));
                }
                i = next;
            }
            '.' => {
                let (class, next) = read_ident(&chars, i + 1);
                if class.is_empty() {
                    return Err(unsupported(full, "bad class selector"));
                }
                compound.classes.push(class);
                i = next;
            }
            '[' => {
                let (cond, next) = parse_attr(full, &chars, i)?;
                compound.attrs.push(cond);
                i = next;
            }
            ':' => {
                let rest: String = chars[i..].iter().collect();
                let Some(inner) = rest.strip_prefix(":not(") else {
                    return Err(unsupported(full, "only :not() is supported"));
                };
                let close = matching_paren(inner)
                    .ok_or_else(|| unsupported(full, "unterminated :not()"))?;
                compound.negations.push(parse_compound(full, &inner[..close])?);
                i += ":not(".len() + inner[..close].chars().count() + 1;
            }
            c if i == 0 && is_ident_char(c) => {
                let (tag, next) = read_ident(&chars, i);
                compound.tag = Some(tag.to_ascii_lowercase());
                i = next;
            }
            _ => return Err(unsupported(full, "unexpected character")),
        }
    }

    if compound == Compound::default() && !universal {
        return Err(unsupported(full, "empty compound selector"));
    }
    Ok(compound)
}

/// Byte offset of the `)` closing an already-opened paren
fn matching_paren(src: &str) -> Option<usize> {
    let mut depth = 1usize;
    let mut quote: Option<char> = None;
    for (offset, ch) in src.char_indices() {
        if let Some(q) = quote {
            if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(offset);
                }
            }
            _ => {}
        }
    }
    None
}

fn parse_attr(full: &str, chars: &[char], start: usize) -> ProbeResult<(AttrCondition, usize)> {
    let mut i = start + 1;
    let skip_ws = |i: &mut usize| {
        while *i < chars.len() && chars[*i].is_whitespace() {
            *i += 1;
        }
    };

    skip_ws(&mut i);
    let (name, next) = read_ident(chars, i);
    if name.is_empty() {
        return Err(unsupported(full, "missing attribute name"));
    }
    i = next;
    skip_ws(&mut i);

    if chars.get(i) == Some(&']') {
        return Ok((
            AttrCondition {
                name,
                op: AttrOp::Exists,
            },
            i + 1,
        ));
    }

    let op_char = chars.get(i).copied();
    let kind = match op_char {
        Some('=') => {
            i += 1;
            '='
        }
        Some(c @ ('*' | '^' | '$' | '~')) if chars.get(i + 1) == Some(&'=') => {
            i += 2;
            c
        }
        _ => return Err(unsupported(full, "bad attribute operator")),
    };
    skip_ws(&mut i);

    let value = match chars.get(i).copied() {
        Some(q @ ('"' | '\'')) => {
            let mut end = i + 1;
            while end < chars.len() && chars[end] != q {
                end += 1;
            }
            if end >= chars.len() {
                return Err(unsupported(full, "unterminated attribute value"));
            }
            let value: String = chars[i + 1..end].iter().collect();
            i = end + 1;
            value
        }
        _ => {
            let (value, next) = read_ident(chars, i);
            i = next;
            value
        }
    };
    skip_ws(&mut i);
    if chars.get(i) != Some(&']') {
        return Err(unsupported(full, "unterminated attribute selector"));
    }

    let op = match kind {
        '=' => AttrOp::Equals(value),
        '*' => AttrOp::Contains(value),
        '^' => AttrOp::Prefix(value),
        '$' => AttrOp::Suffix(value),
        _ => AttrOp::Includes(value),
    };
    Ok((AttrCondition { name, op }, i + 1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{el, Document};

    fn doc() -> Document {
        Document::new(
            "Fixture",
            el("html").attr("lang", "en").child(
                el("body")
                    .child(
                        el("nav")
                            .attr("aria-label", "Primary navigation")
                            .child(el("a").attr("href", "/benefits").text("Benefits"))
                            .child(el("a").attr("href", "/topics/travel").text("Travel")),
                    )
                    .child(
                        el("main")
                            .child(el("div").class("card wide").child(el("a").attr("href", "/x").text("X")))
                            .child(el("input").attr("id", "q"))
                            .child(el("input").attr("type", "search").attr("id", "s")),
                    ),
            ),
        )
    }

    fn select(doc: &Document, css: &str) -> Vec<String> {
        let list = SelectorList::parse(css).unwrap();
        doc.elements()
            .into_iter()
            .filter(|n| list.matches(doc, *n))
            .map(|n| {
                doc.attr(n, "href")
                    .or_else(|| doc.attr(n, "id"))
                    .unwrap_or_else(|| doc.tag_name(n).unwrap_or_default())
                    .to_string()
            })
            .collect()
    }

    #[test]
    fn test_descendant_combinator() {
        assert_eq!(select(&doc(), "main a"), vec!["/x"]);
    }

    #[test]
    fn test_child_combinator() {
        assert_eq!(select(&doc(), "nav > a").len(), 2);
        assert!(select(&doc(), "main > a").is_empty());
    }

    #[test]
    fn test_quoted_attribute_with_spaces() {
        assert_eq!(
            select(&doc(), r#"nav[aria-label="Primary navigation"] a"#),
            vec!["/benefits", "/topics/travel"]
        );
    }

    #[test]
    fn test_attribute_operators() {
        assert_eq!(select(&doc(), r#"a[href*="/topics/"]"#), vec!["/topics/travel"]);
        assert_eq!(select(&doc(), "a[href^='/b']"), vec!["/benefits"]);
        assert_eq!(select(&doc(), r#"a[href$="/x"]"#), vec!["/x"]);
        assert_eq!(select(&doc(), "div[class~=wide]"), vec!["div"]);
    }

    #[test]
    fn test_selector_list_keeps_document_order() {
        assert_eq!(select(&doc(), "main a, nav a"), vec!["/benefits", "/topics/travel", "/x"]);
    }

    #[test]
    fn test_id_class_and_not() {
        assert_eq!(select(&doc(), "#q"), vec!["q"]);
        assert_eq!(select(&doc(), ".card"), vec!["div"]);
        assert_eq!(select(&doc(), "input:not([type])"), vec!["q"]);
    }

    #[test]
    fn test_universal() {
        assert_eq!(select(&doc(), "nav *").len(), 2);
    }

    #[test]
    fn test_unsupported_pseudo_rejected() {
        let err = SelectorList::parse("a:hover").unwrap_err();
        assert!(matches!(err, ProbeError::UnsupportedSelector { .. }));
    }

    #[test]
    fn test_malformed_selectors_rejected() {
        for css in ["", "a,", "> a", "a >", "a[href", "[=x]", "a[href=\"x]"] {
            assert!(SelectorList::parse(css).is_err(), "accepted {css:?}");
        }
    }
}
