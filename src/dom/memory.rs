//! In-memory document implementing [`DomEnvironment`].
//!
//! Used for tests, benchmarks and headless runs. The tree is a flat node
//! table behind a [`parking_lot::RwLock`]; [`MemoryDom`] is a cheap-clone
//! handle over it.
//!
//! Rendering is modelled coarsely:
//!
//! | Property | Source |
//! |----------|--------|
//! | `display` | injected hiding rules, explicit style, `hidden()` |
//! | offset parent | rendered, attached, not `position: fixed` |
//! | `offsetHeight` | rect height when rendered, else 0 |
//! | `innerText` | own text of rendered elements, newline separated |
//!
//! Selectors, XPath and injected style rules are matched on a parsed
//! snapshot of the queried root (see [`markup`](super::markup)), so the
//! tree follows HTML content rules: void elements such as `input` hold no
//! children.
//!
//! # Example
//!
//! ```ignore
//! use consent_engine::dom::{ElementSpec, MemoryDom};
//!
//! let dom = MemoryDom::new().with_location("https://example.com/");
//! let banner = dom.append(None, ElementSpec::new("div").id("cmp"));
//! let reject = dom.append(Some(banner), ElementSpec::new("button").class("reject").text("Reject"));
//!
//! dom.on_click(reject, |dom| dom.remove(banner));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::{FxHashMap, FxHashSet};
use scraper::Selector;

use crate::error::{Error, Result};
use crate::identifiers::{NodeId, NodeIdAllocator};

use super::environment::{DomEnvironment, MouseEvent, ReadyState, Rect};
use super::markup::{self, MarkupSink, Snapshot};

// ============================================================================
// Types
// ============================================================================

/// Callback fired after an element is clicked.
pub type ClickHandler = Arc<dyn Fn(&MemoryDom) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq)]
enum NodeKind {
    Document,
    Element { tag: String },
    ShadowRoot { host: NodeId },
    FrameDocument { frame: NodeId },
}

struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    attrs: Vec<(String, String)>,
    text: String,
    style: FxHashMap<String, String>,
    hidden: bool,
    checked: bool,
    rect: Rect,
    shadow_root: Option<NodeId>,
    content_document: Option<NodeId>,
    clicks: u32,
    mouse_events: Vec<MouseEvent>,
    on_click: Option<ClickHandler>,
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            parent: None,
            children: Vec::new(),
            attrs: Vec::new(),
            text: String::new(),
            style: FxHashMap::default(),
            hidden: false,
            checked: false,
            rect: Rect::default(),
            shadow_root: None,
            content_document: None,
            clicks: 0,
            mouse_events: Vec::new(),
            on_click: None,
        }
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn set_attr(&mut self, name: &str, value: String) {
        match self.attrs.iter_mut().find(|(k, _)| k == name) {
            Some(entry) => entry.1 = value,
            None => self.attrs.push((name.to_string(), value)),
        }
    }

    fn is_checkbox(&self) -> bool {
        matches!(&self.kind, NodeKind::Element { tag } if tag == "input")
            && matches!(self.attr("type"), Some("checkbox" | "radio"))
    }
}

// ============================================================================
// ElementSpec
// ============================================================================

/// Builder describing an element to insert.
#[derive(Debug, Clone)]
pub struct ElementSpec {
    tag: String,
    attrs: Vec<(String, String)>,
    text: String,
    style: Vec<(String, String)>,
    hidden: bool,
    checked: bool,
    rect: Rect,
}

impl ElementSpec {
    /// Starts an element with the given tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into().to_ascii_lowercase(),
            attrs: Vec::new(),
            text: String::new(),
            style: Vec::new(),
            hidden: false,
            checked: false,
            rect: Rect {
                left: 0.0,
                top: 0.0,
                width: 100.0,
                height: 20.0,
            },
        }
    }

    /// Sets the `id` attribute.
    #[must_use]
    pub fn id(self, id: impl Into<String>) -> Self {
        self.attr("id", id)
    }

    /// Adds a class.
    #[must_use]
    pub fn class(mut self, class: &str) -> Self {
        match self.attrs.iter_mut().find(|(k, _)| k == "class") {
            Some(entry) => {
                entry.1.push(' ');
                entry.1.push_str(class);
            }
            None => self.attrs.push(("class".to_string(), class.to_string())),
        }
        self
    }

    /// Sets an attribute.
    #[must_use]
    pub fn attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into().to_ascii_lowercase(), value.into()));
        self
    }

    /// Sets the element's own text.
    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    /// Sets a computed style property.
    #[must_use]
    pub fn style(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        self.style.push((property.into(), value.into()));
        self
    }

    /// Renders the element with `display: none`.
    #[must_use]
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Positions the element with `position: fixed`.
    #[must_use]
    pub fn fixed(self) -> Self {
        self.style("position", "fixed")
    }

    /// Marks a checkbox as checked.
    #[must_use]
    pub fn checked(mut self) -> Self {
        self.checked = true;
        self
    }

    /// Sets the bounding box.
    #[must_use]
    pub fn rect(mut self, rect: Rect) -> Self {
        self.rect = rect;
        self
    }
}

// ============================================================================
// Tree
// ============================================================================

struct Tree {
    nodes: FxHashMap<NodeId, Node>,
    document: NodeId,
    styles: BTreeMap<String, String>,
    cookie: String,
    location: String,
    top_frame: bool,
    ready_state: ReadyState,
    closed: bool,
}

impl Tree {
    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    fn tag(&self, id: NodeId) -> Option<&str> {
        match &self.node(id)?.kind {
            NodeKind::Element { tag } => Some(tag.as_str()),
            _ => None,
        }
    }

    fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.node(id)?.parent?;
        self.tag(parent).map(|_| parent)
    }

    /// Document, shadow root or frame document holding `id`.
    fn root_of(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.node(current).and_then(|n| n.parent) {
            current = parent;
        }
        current
    }

    /// Renders the element children of a root, depth first.
    fn write_markup(&self, root: NodeId, sink: &mut dyn MarkupSink) {
        let Some(node) = self.node(root) else {
            return;
        };
        for child in &node.children {
            self.write_element(*child, sink);
        }
    }

    fn write_element(&self, id: NodeId, sink: &mut dyn MarkupSink) {
        let Some(node) = self.node(id) else {
            return;
        };
        let NodeKind::Element { tag } = &node.kind else {
            return;
        };
        sink.open(id, tag, &node.attrs, node.checked);
        if !node.text.is_empty() {
            sink.text(&node.text);
        }
        for child in &node.children {
            self.write_element(*child, sink);
        }
        sink.close(tag);
    }

    /// Strict element descendants of `scope` as a lookup set.
    fn scope_members(&self, scope: NodeId) -> FxHashSet<NodeId> {
        let mut members = Vec::new();
        self.collect_descendants(scope, &mut members);
        members.into_iter().collect()
    }

    /// Element descendants of `root`, not crossing into shadow trees.
    fn collect_descendants(&self, root: NodeId, out: &mut Vec<NodeId>) {
        let Some(node) = self.node(root) else {
            return;
        };
        for child in &node.children {
            if self.tag(*child).is_some() {
                out.push(*child);
            }
            self.collect_descendants(*child, out);
        }
    }

    fn is_attached(&self, id: NodeId) -> bool {
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if current == self.document {
                return true;
            }
            let Some(node) = self.node(current) else {
                return false;
            };
            cursor = match node.kind {
                NodeKind::ShadowRoot { host } => Some(host),
                NodeKind::FrameDocument { frame } => Some(frame),
                _ => node.parent,
            };
        }
        false
    }

    /// Composed-tree parent: shadow roots lead to their host.
    fn composed_parent(&self, id: NodeId) -> Option<NodeId> {
        let node = self.node(id)?;
        match node.kind {
            NodeKind::ShadowRoot { host } => Some(host),
            NodeKind::FrameDocument { frame } => Some(frame),
            _ => node.parent,
        }
    }

    /// Declarations of injected style sheets matched against every root.
    fn injected_styles(&self) -> InjectedStyles {
        let mut rules: Vec<(Selector, String, String)> = Vec::new();
        for text in self.styles.values() {
            for block in text.split('}') {
                let Some((selector, body)) = block.split_once('{') else {
                    continue;
                };
                let Ok(selector) = markup::compile(selector.trim()) else {
                    continue;
                };
                for decl in body.split(';') {
                    if let Some((prop, value)) = decl.split_once(':') {
                        let value = value.replace("!important", "");
                        rules.push((selector.clone(), prop.trim().to_string(), value.trim().to_string()));
                    }
                }
            }
        }

        let mut styles = InjectedStyles::default();
        if rules.is_empty() {
            return styles;
        }
        let roots = self
            .nodes
            .iter()
            .filter(|(_, n)| !matches!(n.kind, NodeKind::Element { .. }))
            .map(|(id, _)| *id);
        for root in roots {
            let snapshot = Snapshot::build(|sink| self.write_markup(root, sink));
            for (selector, prop, value) in &rules {
                for node in snapshot.select(selector) {
                    styles.0.entry(node).or_default().insert(prop.clone(), value.clone());
                }
            }
        }
        styles
    }

    fn own_style(&self, id: NodeId, property: &str, styles: &InjectedStyles) -> Option<String> {
        let node = self.node(id)?;
        if !matches!(node.kind, NodeKind::Element { .. }) {
            return None;
        }
        if let Some(value) = styles.0.get(&id).and_then(|s| s.get(property)) {
            return Some(value.clone());
        }
        if property == "display" && node.hidden {
            return Some("none".to_string());
        }
        if let Some(value) = node.style.get(property) {
            return Some(value.clone());
        }
        Some(
            match property {
                "display" => "block",
                "position" => "static",
                "visibility" => "visible",
                "opacity" => "1",
                _ => "",
            }
            .to_string(),
        )
    }

    fn is_rendered(&self, id: NodeId, styles: &InjectedStyles) -> bool {
        if !self.is_attached(id) {
            return false;
        }
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if self.own_style(current, "display", styles).as_deref() == Some("none") {
                return false;
            }
            cursor = self.composed_parent(current);
        }
        true
    }

    fn text_content(&self, id: NodeId, out: &mut String) {
        let Some(node) = self.node(id) else {
            return;
        };
        out.push_str(&node.text);
        for child in &node.children {
            self.text_content(*child, out);
        }
    }

    fn inner_text(&self, id: NodeId, styles: &InjectedStyles, out: &mut Vec<String>) {
        let Some(node) = self.node(id) else {
            return;
        };
        if matches!(node.kind, NodeKind::Element { .. })
            && self.own_style(id, "display", styles).as_deref() == Some("none")
        {
            return;
        }
        if !node.text.is_empty() {
            out.push(node.text.clone());
        }
        if let Some(shadow) = node.shadow_root {
            self.inner_text(shadow, styles, out);
        }
        for child in &node.children {
            self.inner_text(*child, styles, out);
        }
    }
}

/// Injected declarations per element; later rules win.
#[derive(Default)]
struct InjectedStyles(FxHashMap<NodeId, FxHashMap<String, String>>);

// ============================================================================
// MemoryDom
// ============================================================================

/// Cheap-clone handle to an in-memory document.
#[derive(Clone)]
pub struct MemoryDom {
    tree: Arc<RwLock<Tree>>,
    ids: Arc<NodeIdAllocator>,
}

impl fmt::Debug for MemoryDom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tree = self.tree.read();
        f.debug_struct("MemoryDom")
            .field("location", &tree.location)
            .field("nodes", &tree.nodes.len())
            .finish()
    }
}

impl Default for MemoryDom {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDom {
    /// Creates an empty, fully loaded top-frame document.
    #[must_use]
    pub fn new() -> Self {
        let ids = NodeIdAllocator::new();
        let document = ids.next();
        let mut nodes = FxHashMap::default();
        nodes.insert(document, Node::new(NodeKind::Document));

        Self {
            tree: Arc::new(RwLock::new(Tree {
                nodes,
                document,
                styles: BTreeMap::new(),
                cookie: String::new(),
                location: "about:blank".to_string(),
                top_frame: true,
                ready_state: ReadyState::Complete,
                closed: false,
            })),
            ids: Arc::new(ids),
        }
    }

    /// Sets the document URL.
    #[must_use]
    pub fn with_location(self, url: impl Into<String>) -> Self {
        self.tree.write().location = url.into();
        self
    }

    /// Marks the document as a sub-frame.
    #[must_use]
    pub fn as_subframe(self) -> Self {
        self.tree.write().top_frame = false;
        self
    }

    /// Changes the ready state.
    pub fn set_ready_state(&self, state: ReadyState) {
        self.tree.write().ready_state = state;
    }

    /// Appends an element under `parent` (or the document) and returns it.
    pub fn append(&self, parent: Option<NodeId>, spec: ElementSpec) -> NodeId {
        let id = self.ids.next();
        let mut node = Node::new(NodeKind::Element { tag: spec.tag });
        node.attrs = spec.attrs;
        node.text = spec.text;
        node.style = spec.style.into_iter().collect();
        node.hidden = spec.hidden;
        node.checked = spec.checked;
        node.rect = spec.rect;

        let mut tree = self.tree.write();
        let parent = parent
            .filter(|p| tree.nodes.contains_key(p))
            .unwrap_or(tree.document);
        node.parent = Some(parent);
        tree.nodes.insert(id, node);
        if let Some(parent_node) = tree.nodes.get_mut(&parent) {
            parent_node.children.push(id);
        }
        id
    }

    /// Attaches an open shadow root to `host` and returns it.
    pub fn attach_shadow(&self, host: NodeId) -> NodeId {
        let mut tree = self.tree.write();
        if let Some(existing) = tree.node(host).and_then(|n| n.shadow_root) {
            return existing;
        }
        let id = self.ids.next();
        tree.nodes.insert(id, Node::new(NodeKind::ShadowRoot { host }));
        if let Some(host_node) = tree.nodes.get_mut(&host) {
            host_node.shadow_root = Some(id);
        }
        id
    }

    /// Attaches a same-origin document to an `<iframe>` and returns it.
    pub fn attach_frame_document(&self, frame: NodeId) -> NodeId {
        let mut tree = self.tree.write();
        if let Some(existing) = tree.node(frame).and_then(|n| n.content_document) {
            return existing;
        }
        let id = self.ids.next();
        tree.nodes.insert(id, Node::new(NodeKind::FrameDocument { frame }));
        if let Some(frame_node) = tree.nodes.get_mut(&frame) {
            frame_node.content_document = Some(id);
        }
        id
    }

    /// Replaces `document.cookie`.
    pub fn set_cookie(&self, cookie: impl Into<String>) {
        self.tree.write().cookie = cookie.into();
    }

    /// Detaches a node and its subtree.
    pub fn remove(&self, node: NodeId) {
        let mut tree = self.tree.write();
        let mut stack = vec![node];
        let parent = tree.node(node).and_then(|n| n.parent);
        if let Some(parent) = parent.and_then(|p| tree.nodes.get_mut(&p)) {
            parent.children.retain(|c| *c != node);
        }
        while let Some(current) = stack.pop() {
            if let Some(removed) = tree.nodes.remove(&current) {
                stack.extend(removed.children);
                stack.extend(removed.shadow_root);
                stack.extend(removed.content_document);
            }
        }
    }

    /// Shows or hides an element.
    pub fn set_hidden(&self, node: NodeId, hidden: bool) {
        if let Some(n) = self.tree.write().nodes.get_mut(&node) {
            n.hidden = hidden;
        }
    }

    /// Sets an attribute on an existing element.
    pub fn set_attr(&self, node: NodeId, name: &str, value: impl Into<String>) {
        if let Some(n) = self.tree.write().nodes.get_mut(&node) {
            n.set_attr(name, value.into());
        }
    }

    /// Sets the `checked` state.
    pub fn set_checked(&self, node: NodeId, checked: bool) {
        if let Some(n) = self.tree.write().nodes.get_mut(&node) {
            n.checked = checked;
        }
    }

    /// Registers a handler run after every click on `node`.
    pub fn on_click<F>(&self, node: NodeId, handler: F)
    where
        F: Fn(&MemoryDom) + Send + Sync + 'static,
    {
        if let Some(n) = self.tree.write().nodes.get_mut(&node) {
            n.on_click = Some(Arc::new(handler));
        }
    }

    /// Number of clicks received by `node`.
    #[must_use]
    pub fn click_count(&self, node: NodeId) -> u32 {
        self.tree.read().node(node).map_or(0, |n| n.clicks)
    }

    /// Mouse events dispatched on `node`.
    #[must_use]
    pub fn mouse_events(&self, node: NodeId) -> Vec<MouseEvent> {
        self.tree
            .read()
            .node(node)
            .map(|n| n.mouse_events.clone())
            .unwrap_or_default()
    }

    /// Returns `true` if `node` carries `class`.
    #[must_use]
    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.tree
            .read()
            .node(node)
            .and_then(|n| n.attr("class"))
            .is_some_and(|c| c.split_whitespace().any(|c| c == class))
    }

    /// Whether `close_window` was called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tree.read().closed
    }

    /// Whether `node` is still in the tree.
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        self.tree.read().is_attached(node)
    }

    /// First document match of a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedSelector`] for unsupported syntax.
    pub fn query(&self, selector: &str) -> Result<Option<NodeId>> {
        Ok(self.query_selector_all(None, selector)?.into_iter().next())
    }
}

// ============================================================================
// DomEnvironment
// ============================================================================

impl DomEnvironment for MemoryDom {
    fn query_selector_all(&self, scope: Option<NodeId>, selector: &str) -> Result<Vec<NodeId>> {
        let selector = markup::compile(selector)?;
        let tree = self.tree.read();
        let scope = scope.unwrap_or(tree.document);
        if !tree.nodes.contains_key(&scope) {
            return Err(Error::node_not_found(scope));
        }
        let root = tree.root_of(scope);
        let members = tree.scope_members(scope);
        let snapshot = Snapshot::build(|sink| tree.write_markup(root, sink));
        Ok(snapshot
            .select(&selector)
            .into_iter()
            .filter(|node| members.contains(node))
            .collect())
    }

    fn evaluate_xpath(&self, scope: Option<NodeId>, expression: &str) -> Result<Vec<NodeId>> {
        let tree = self.tree.read();
        let scope = scope.unwrap_or(tree.document);
        if !tree.nodes.contains_key(&scope) {
            return Err(Error::node_not_found(scope));
        }
        let root = tree.root_of(scope);
        let members = tree.scope_members(scope);
        let found = markup::evaluate_xpath(expression, |sink| tree.write_markup(root, sink))?;
        Ok(found.into_iter().filter(|node| members.contains(node)).collect())
    }

    fn shadow_root(&self, node: NodeId) -> Option<NodeId> {
        self.tree.read().node(node)?.shadow_root
    }

    fn parent_element(&self, node: NodeId) -> Option<NodeId> {
        self.tree.read().parent_element(node)
    }

    fn content_document(&self, node: NodeId) -> Option<NodeId> {
        self.tree.read().node(node)?.content_document
    }

    fn text_content(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.tree.read().text_content(node, &mut out);
        out
    }

    fn inner_text(&self) -> String {
        let tree = self.tree.read();
        let styles = tree.injected_styles();
        let mut out = Vec::new();
        tree.inner_text(tree.document, &styles, &mut out);
        out.join("\n")
    }

    fn computed_style(&self, node: NodeId, property: &str) -> Option<String> {
        let tree = self.tree.read();
        let styles = tree.injected_styles();
        tree.own_style(node, property, &styles)
    }

    fn offset_height(&self, node: NodeId) -> f64 {
        let tree = self.tree.read();
        let styles = tree.injected_styles();
        if tree.is_rendered(node, &styles) {
            tree.node(node).map_or(0.0, |n| n.rect.height)
        } else {
            0.0
        }
    }

    fn has_offset_parent(&self, node: NodeId) -> bool {
        let tree = self.tree.read();
        let styles = tree.injected_styles();
        tree.is_rendered(node, &styles)
            && tree.own_style(node, "position", &styles).as_deref() != Some("fixed")
    }

    fn is_checked(&self, node: NodeId) -> bool {
        self.tree.read().node(node).is_some_and(|n| n.checked)
    }

    fn click(&self, node: NodeId) {
        let handler = {
            let mut tree = self.tree.write();
            let Some(n) = tree.nodes.get_mut(&node) else {
                return;
            };
            n.clicks += 1;
            if n.is_checkbox() {
                n.checked = !n.checked;
            }
            n.on_click.clone()
        };
        if let Some(handler) = handler {
            handler(self);
        }
    }

    fn add_class(&self, node: NodeId, class: &str) {
        let mut tree = self.tree.write();
        let Some(n) = tree.nodes.get_mut(&node) else {
            return;
        };
        let current = n.attr("class").unwrap_or_default().to_string();
        if current.split_whitespace().any(|c| c == class) {
            return;
        }
        let updated = if current.is_empty() {
            class.to_string()
        } else {
            format!("{current} {class}")
        };
        n.set_attr("class", updated);
    }

    fn bounding_rect(&self, node: NodeId) -> Rect {
        self.tree.read().node(node).map(|n| n.rect).unwrap_or_default()
    }

    fn dispatch_mouse(&self, node: NodeId, event: MouseEvent) {
        if let Some(n) = self.tree.write().nodes.get_mut(&node) {
            n.mouse_events.push(event);
        }
    }

    fn append_style_rule(&self, style_id: &str, css: &str) -> bool {
        self.tree
            .write()
            .styles
            .entry(style_id.to_string())
            .or_default()
            .push_str(css);
        true
    }

    fn remove_style(&self, style_id: &str) -> bool {
        self.tree.write().styles.remove(style_id).is_some()
    }

    fn style_text(&self, style_id: &str) -> Option<String> {
        self.tree.read().styles.get(style_id).cloned()
    }

    fn is_top_frame(&self) -> bool {
        self.tree.read().top_frame
    }

    fn location(&self) -> String {
        self.tree.read().location.clone()
    }

    fn cookie(&self) -> String {
        self.tree.read().cookie.clone()
    }

    fn ready_state(&self) -> ReadyState {
        self.tree.read().ready_state
    }

    fn close_window(&self) {
        self.tree.write().closed = true;
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::style::{HideMethod, hiding_rule};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_query_document_order() {
        let dom = MemoryDom::new();
        let outer = dom.append(None, ElementSpec::new("div").class("a"));
        let inner = dom.append(Some(outer), ElementSpec::new("div").class("a"));
        let sibling = dom.append(None, ElementSpec::new("div").class("a"));

        let found = dom.query_selector_all(None, ".a").expect("query");
        assert_eq!(found, vec![outer, inner, sibling]);

        let scoped = dom.query_selector_all(Some(outer), ".a").expect("query");
        assert_eq!(scoped, vec![inner]);
    }

    #[test]
    fn test_document_query_skips_shadow_tree() {
        let dom = MemoryDom::new();
        let host = dom.append(None, ElementSpec::new("div").id("host"));
        let root = dom.attach_shadow(host);
        let inner = dom.append(Some(root), ElementSpec::new("button"));

        assert!(dom.query_selector_all(None, "button").expect("query").is_empty());
        assert_eq!(dom.query_selector_all(Some(root), "button").expect("query"), vec![inner]);
        assert_eq!(dom.shadow_root(host), Some(root));
    }

    #[test]
    fn test_unsupported_selector() {
        let dom = MemoryDom::new();
        let err = dom.query_selector_all(None, "a:hover").unwrap_err();
        assert!(matches!(err, Error::UnsupportedSelector { .. }));
        let err = dom.query_selector_all(None, "div[").unwrap_err();
        assert!(matches!(err, Error::UnsupportedSelector { .. }));
    }

    #[test]
    fn test_combinators_and_pseudo_classes() {
        let dom = MemoryDom::new();
        let dialog = dom.append(None, ElementSpec::new("div").id("cmp").attr("data-testid", "cookie-dialog"));
        let first = dom.append(Some(dialog), ElementSpec::new("button").class("btn"));
        let second = dom.append(Some(dialog), ElementSpec::new("button").class("btn primary"));
        let on = dom.append(Some(dialog), ElementSpec::new("input").attr("type", "checkbox").checked());
        let off = dom.append(Some(dialog), ElementSpec::new("input").attr("type", "checkbox").attr("disabled", ""));

        let query = |selector: &str| dom.query_selector_all(None, selector).expect("query");
        assert_eq!(query("#cmp > button:first-child"), vec![first]);
        assert_eq!(query(".btn:not(.primary)"), vec![first]);
        assert_eq!(query("button:nth-child(2)"), vec![second]);
        assert_eq!(query(".btn + .btn"), vec![second]);
        assert_eq!(query("button ~ input"), vec![on, off]);
        assert_eq!(query("[data-testid^=cookie] input:checked"), vec![on]);
        assert_eq!(query("input:not(:checked):enabled"), Vec::<NodeId>::new());
        assert_eq!(query("input:disabled"), vec![off]);

        dom.set_checked(on, false);
        assert_eq!(query("input:not(:checked):enabled"), vec![on]);
    }

    #[test]
    fn test_scoped_query_sees_ancestors_outside_scope() {
        let dom = MemoryDom::new();
        let banner = dom.append(None, ElementSpec::new("section").class("banner"));
        let inner = dom.append(Some(banner), ElementSpec::new("div"));
        let button = dom.append(Some(inner), ElementSpec::new("button"));

        assert_eq!(dom.query_selector_all(Some(inner), ".banner button").expect("query"), vec![button]);
        assert!(dom.query_selector_all(Some(inner), ".banner").expect("query").is_empty());
    }

    #[test]
    fn test_injected_rule_hides_element() {
        let dom = MemoryDom::new();
        let node = dom.append(None, ElementSpec::new("div").id("cmp"));
        assert!(dom.has_offset_parent(node));

        dom.append_style_rule("s", &hiding_rule("#cmp", HideMethod::Display));
        assert!(!dom.has_offset_parent(node));
        assert_eq!(dom.offset_height(node), 0.0);
        assert_eq!(dom.computed_style(node, "display").as_deref(), Some("none"));

        dom.remove_style("s");
        assert!(dom.has_offset_parent(node));
    }

    #[test]
    fn test_injected_rule_with_combinator() {
        let dom = MemoryDom::new();
        let wrapper = dom.append(None, ElementSpec::new("div").class("overlay"));
        let inner = dom.append(Some(wrapper), ElementSpec::new("div").class("modal"));
        let outside = dom.append(None, ElementSpec::new("div").class("modal"));

        dom.append_style_rule("s", ".overlay > .modal { display: none !important; }");
        assert!(!dom.has_offset_parent(inner));
        assert!(dom.has_offset_parent(outside));
    }

    #[test]
    fn test_hidden_ancestor_hides_descendants() {
        let dom = MemoryDom::new();
        let parent = dom.append(None, ElementSpec::new("div").hidden());
        let child = dom.append(Some(parent), ElementSpec::new("span").text("hi"));
        assert!(!dom.has_offset_parent(child));
        assert_eq!(dom.inner_text(), "");
    }

    #[test]
    fn test_click_handler_and_checkbox() {
        let dom = MemoryDom::new();
        let button = dom.append(None, ElementSpec::new("button"));
        let checkbox = dom.append(None, ElementSpec::new("input").attr("type", "checkbox"));
        let calls = Arc::new(AtomicU32::new(0));

        let counter = Arc::clone(&calls);
        dom.on_click(button, move |dom| {
            counter.fetch_add(1, Ordering::SeqCst);
            dom.remove(checkbox);
        });

        dom.click(checkbox);
        assert!(dom.is_checked(checkbox));
        dom.click(button);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!dom.contains(checkbox));
    }

    #[test]
    fn test_text_content_and_inner_text() {
        let dom = MemoryDom::new();
        let banner = dom.append(None, ElementSpec::new("div").text("We use cookies. "));
        dom.append(Some(banner), ElementSpec::new("button").text("Accept all"));
        assert_eq!(dom.text_content(banner), "We use cookies. Accept all");
        assert_eq!(dom.inner_text(), "We use cookies. \nAccept all");
    }

    #[test]
    fn test_xpath_queries() {
        let dom = MemoryDom::new();
        let accept = dom.append(None, ElementSpec::new("button").text("Accept"));
        let reject = dom.append(None, ElementSpec::new("button").attr("data-x", "r").text("Reject all"));

        assert_eq!(dom.evaluate_xpath(None, "//button").expect("xpath").len(), 2);
        assert_eq!(dom.evaluate_xpath(None, "//button[@data-x='r']").expect("xpath"), vec![reject]);
        assert_eq!(dom.evaluate_xpath(None, "//button[text()='Accept']").expect("xpath"), vec![accept]);
        assert_eq!(
            dom.evaluate_xpath(None, "//*[contains(text(), 'Reject')]").expect("xpath"),
            vec![reject]
        );
        assert_eq!(
            dom.evaluate_xpath(None, "//button[@data-x='r']/text()").expect("xpath"),
            vec![reject]
        );
        assert!(dom.evaluate_xpath(None, "/html/body").expect("xpath").is_empty());
        assert!(dom.evaluate_xpath(None, "//button[").is_err());
        assert!(dom.evaluate_xpath(None, "count(//button)").is_err());
    }

    #[test]
    fn test_xpath_scoped_to_shadow_root() {
        let dom = MemoryDom::new();
        dom.append(None, ElementSpec::new("button").text("Accept"));
        let host = dom.append(None, ElementSpec::new("div"));
        let root = dom.attach_shadow(host);
        let inner = dom.append(Some(root), ElementSpec::new("button").text("Accept"));

        assert_eq!(dom.evaluate_xpath(None, "//button").expect("xpath").len(), 1);
        assert_eq!(dom.evaluate_xpath(Some(root), "//button").expect("xpath"), vec![inner]);
    }

    #[test]
    fn test_xpath_or_alternatives_use_deep_text() {
        let dom = MemoryDom::new();
        let button = dom.append(None, ElementSpec::new("button"));
        dom.append(Some(button), ElementSpec::new("span").text("Alles ablehnen"));
        let found = dom
            .evaluate_xpath(None, "//button[contains(., 'Reject all') or contains(., 'Alles ablehnen')]")
            .expect("xpath");
        assert_eq!(found, vec![button]);
    }

    #[test]
    fn test_frame_document_scope_and_cookie() {
        let dom = MemoryDom::new();
        let iframe = dom.append(None, ElementSpec::new("iframe"));
        let doc = dom.attach_frame_document(iframe);
        let inner = dom.append(Some(doc), ElementSpec::new("button").class("is-primary"));

        assert_eq!(dom.content_document(iframe), Some(doc));
        assert!(dom.query_selector_all(None, ".is-primary").expect("query").is_empty());
        assert_eq!(dom.query_selector_all(Some(doc), ".is-primary").expect("query"), vec![inner]);
        assert!(dom.has_offset_parent(inner));

        dom.set_cookie("cmp-data=0");
        assert_eq!(dom.cookie(), "cmp-data=0");
    }

    #[test]
    fn test_add_class_idempotent() {
        let dom = MemoryDom::new();
        let node = dom.append(None, ElementSpec::new("div").class("a"));
        dom.add_class(node, "b");
        dom.add_class(node, "b");
        assert!(dom.has_class(node, "a"));
        assert!(dom.has_class(node, "b"));
        assert_eq!(dom.query_selector_all(None, ".a.b").expect("query"), vec![node]);
    }
}
