//! Markup snapshots of [`MemoryDom`](super::MemoryDom) roots.
//!
//! Selector and XPath matching run on real parsers: each tree root (the
//! document, a shadow root or a frame document) is rendered into markup
//! whose elements carry their [`NodeId`] in [`NODE_ATTR`]. Matches are
//! mapped back through that attribute.
//!
//! | Query | Backend |
//! |-------|---------|
//! | CSS | [`scraper::Html`] + [`scraper::Selector`] |
//! | XPath | [`sxd_document`] + [`sxd_xpath`] |
//!
//! Element state without a markup form is rendered as attributes: the
//! checked state becomes `checked`, and `:checked`, `:disabled` and
//! `:enabled` are rewritten to attribute selectors before parsing.

// ============================================================================
// Imports
// ============================================================================

use std::borrow::Cow;
use std::fmt::Write as _;

use scraper::{Html, Selector};
use sxd_document::Package;
use sxd_document::dom::{Document, Element};
use sxd_xpath::Value;
use sxd_xpath::nodeset::Node as XPathNode;

use crate::error::{Error, Result};
use crate::identifiers::NodeId;

// ============================================================================
// Constants
// ============================================================================

/// Attribute carrying the raw [`NodeId`] of every rendered element.
pub(super) const NODE_ATTR: &str = "data-memory-node";

/// Elements that never have a closing tag.
const VOID_ELEMENTS: [&str; 13] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// State pseudo-classes and their attribute form.
const STATE_PSEUDO_CLASSES: [(&str, &str); 3] = [
    (":checked", "[checked]"),
    (":disabled", "[disabled]"),
    (":enabled", ":not([disabled])"),
];

// ============================================================================
// MarkupSink
// ============================================================================

/// Receives a tree root in document order.
pub(super) trait MarkupSink {
    /// Opens an element. Its own text and children follow before `close`.
    fn open(&mut self, node: NodeId, tag: &str, attrs: &[(String, String)], checked: bool);

    /// Appends a text node to the open element.
    fn text(&mut self, text: &str);

    /// Closes the innermost open element.
    fn close(&mut self, tag: &str);
}

/// Attributes rendered from the author list.
fn authored<'a>(attrs: &'a [(String, String)]) -> impl Iterator<Item = &'a (String, String)> {
    attrs
        .iter()
        .filter(|(name, _)| name != NODE_ATTR && name != "checked")
}

// ============================================================================
// HTML
// ============================================================================

#[derive(Default)]
struct HtmlMarkup {
    out: String,
}

impl HtmlMarkup {
    fn escape(&mut self, text: &str, in_attribute: bool) {
        for c in text.chars() {
            match c {
                '&' => self.out.push_str("&amp;"),
                '<' => self.out.push_str("&lt;"),
                '>' => self.out.push_str("&gt;"),
                '"' if in_attribute => self.out.push_str("&quot;"),
                _ => self.out.push(c),
            }
        }
    }
}

impl MarkupSink for HtmlMarkup {
    fn open(&mut self, node: NodeId, tag: &str, attrs: &[(String, String)], checked: bool) {
        let _ = write!(self.out, "<{tag} {NODE_ATTR}=\"{}\"", node.as_u64());
        for (name, value) in authored(attrs) {
            let _ = write!(self.out, " {name}=\"");
            self.escape(value, true);
            self.out.push('"');
        }
        if checked {
            self.out.push_str(" checked");
        }
        self.out.push('>');
    }

    fn text(&mut self, text: &str) {
        self.escape(text, false);
    }

    fn close(&mut self, tag: &str) {
        if !VOID_ELEMENTS.contains(&tag) {
            let _ = write!(self.out, "</{tag}>");
        }
    }
}

/// Parsed HTML snapshot of one tree root.
pub(super) struct Snapshot {
    html: Html,
}

impl Snapshot {
    /// Renders a root through `write` and parses it.
    pub(super) fn build(write: impl FnOnce(&mut dyn MarkupSink)) -> Self {
        let mut markup = HtmlMarkup::default();
        write(&mut markup);
        Self {
            html: Html::parse_document(&markup.out),
        }
    }

    /// Matching elements in document order.
    pub(super) fn select(&self, selector: &Selector) -> Vec<NodeId> {
        self.html
            .select(selector)
            .filter_map(|element| element.value().attr(NODE_ATTR))
            .filter_map(|raw| raw.parse().ok())
            .map(NodeId::new)
            .collect()
    }
}

/// Parses a CSS selector list.
///
/// # Errors
///
/// Returns [`Error::UnsupportedSelector`] when the list does not parse.
pub(super) fn compile(selector: &str) -> Result<Selector> {
    Selector::parse(&state_as_attributes(selector))
        .map_err(|_| Error::unsupported_selector(selector))
}

/// Rewrites state pseudo-classes outside quoted strings.
fn state_as_attributes(selector: &str) -> Cow<'_, str> {
    if !STATE_PSEUDO_CLASSES
        .iter()
        .any(|(name, _)| selector.contains(name))
    {
        return Cow::Borrowed(selector);
    }

    let mut out = String::with_capacity(selector.len() + 8);
    let mut quote = None;
    let mut pos = 0;
    while let Some(c) = selector[pos..].chars().next() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => {}
            None if c == '"' || c == '\'' => quote = Some(c),
            None if c == ':' => {
                let tail = &selector[pos..];
                let state = STATE_PSEUDO_CLASSES.iter().find(|(name, _)| {
                    tail.starts_with(name)
                        && !tail[name.len()..]
                            .starts_with(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_')
                });
                if let Some((name, attribute)) = state {
                    out.push_str(attribute);
                    pos += name.len();
                    continue;
                }
            }
            None => {}
        }
        out.push(c);
        pos += c.len_utf8();
    }
    Cow::Owned(out)
}

// ============================================================================
// XPath
// ============================================================================

struct XmlMarkup<'a, 'd> {
    document: &'a Document<'d>,
    open: Vec<Element<'d>>,
}

impl MarkupSink for XmlMarkup<'_, '_> {
    fn open(&mut self, node: NodeId, tag: &str, attrs: &[(String, String)], checked: bool) {
        let element = self.document.create_element(tag);
        element.set_attribute_value(NODE_ATTR, &node.as_u64().to_string());
        for (name, value) in authored(attrs) {
            element.set_attribute_value(name.as_str(), value);
        }
        if checked {
            element.set_attribute_value("checked", "checked");
        }
        if let Some(parent) = self.open.last() {
            parent.append_child(element);
        }
        self.open.push(element);
    }

    fn text(&mut self, text: &str) {
        if let Some(parent) = self.open.last() {
            parent.append_child(self.document.create_text(text));
        }
    }

    fn close(&mut self, _tag: &str) {
        self.open.pop();
    }
}

/// Evaluates an XPath expression against a root rendered through `write`.
///
/// Text and attribute matches resolve to their element.
///
/// # Errors
///
/// Returns [`Error::UnsupportedSelector`] if the expression does not
/// parse or does not produce a node-set.
pub(super) fn evaluate_xpath(
    expression: &str,
    write: impl FnOnce(&mut dyn MarkupSink),
) -> Result<Vec<NodeId>> {
    let package = Package::new();
    let document = package.as_document();
    let html = document.create_element("html");
    let body = document.create_element("body");
    html.append_child(body);
    document.root().append_child(html);

    let mut markup = XmlMarkup {
        document: &document,
        open: vec![body],
    };
    write(&mut markup);

    let unsupported = || Error::unsupported_selector(format!("xpath/{expression}"));
    let value = sxd_xpath::evaluate_xpath(&document, expression).map_err(|_| unsupported())?;
    let Value::Nodeset(nodes) = value else {
        return Err(unsupported());
    };

    let mut found = Vec::new();
    for node in nodes.document_order() {
        let element = match node {
            XPathNode::Element(element) => Some(element),
            XPathNode::Text(text) => text.parent(),
            XPathNode::Attribute(attribute) => attribute.parent(),
            _ => None,
        };
        let id = element
            .and_then(|e| e.attribute_value(NODE_ATTR))
            .and_then(|raw| raw.parse().ok())
            .map(NodeId::new);
        if let Some(id) = id
            && !found.contains(&id)
        {
            found.push(id);
        }
    }
    Ok(found)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_pseudo_classes_become_attributes() {
        assert_eq!(state_as_attributes("input:checked"), "input[checked]");
        assert_eq!(
            state_as_attributes(".a:not(:checked):enabled"),
            ".a:not([checked]):not([disabled])"
        );
        assert_eq!(state_as_attributes("[title=':checked']"), "[title=':checked']");
        assert_eq!(state_as_attributes("a:checked-ish"), "a:checked-ish");
        assert!(matches!(state_as_attributes("div > a"), Cow::Borrowed(_)));
    }

    #[test]
    fn test_html_markup_escapes_and_skips_void_close() {
        let mut markup = HtmlMarkup::default();
        let attrs = vec![
            ("title".to_string(), "a \"b\" & c".to_string()),
            ("checked".to_string(), String::new()),
        ];
        markup.open(NodeId::new(3), "input", &attrs, true);
        markup.close("input");
        markup.open(NodeId::new(4), "p", &[], false);
        markup.text("1 < 2");
        markup.close("p");
        assert_eq!(
            markup.out,
            "<input data-memory-node=\"3\" title=\"a &quot;b&quot; &amp; c\" checked><p data-memory-node=\"4\">1 &lt; 2</p>"
        );
    }

    #[test]
    fn test_compile_rejects_invalid_syntax() {
        assert!(compile("div > .a, #b:checked").is_ok());
        assert!(compile("div[").is_err_and(|e| matches!(e, Error::UnsupportedSelector { .. })));
    }
}
