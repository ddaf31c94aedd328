//! The page capability the engine runs against.
//!
//! Every DOM access of the engine goes through [`DomEnvironment`]. A host
//! implements it over a real document (content script, WebDriver bridge);
//! [`MemoryDom`](super::MemoryDom) implements it in memory.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::identifiers::NodeId;

// ============================================================================
// Types
// ============================================================================

/// Document loading state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadyState {
    /// Still parsing.
    Loading,
    /// Parsed, subresources loading.
    Interactive,
    /// Fully loaded.
    #[default]
    Complete,
}

/// Element box in viewport coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Rect {
    /// Left edge.
    pub left: f64,
    /// Top edge.
    pub top: f64,
    /// Box width.
    pub width: f64,
    /// Box height.
    pub height: f64,
}

impl Rect {
    /// Returns the box center.
    #[inline]
    #[must_use]
    pub fn center(&self) -> (f64, f64) {
        (self.left + self.width / 2.0, self.top + self.height / 2.0)
    }
}

/// Synthetic mouse event kinds dispatched by drag gestures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseEventKind {
    /// `mousedown`.
    Down,
    /// `mousemove`.
    Move,
    /// `mouseup`.
    Up,
}

impl MouseEventKind {
    /// DOM event type name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Down => "mousedown",
            Self::Move => "mousemove",
            Self::Up => "mouseup",
        }
    }
}

/// A synthetic mouse event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MouseEvent {
    /// Event kind.
    pub kind: MouseEventKind,
    /// Viewport x.
    pub client_x: f64,
    /// Viewport y.
    pub client_y: f64,
}

// ============================================================================
// DomEnvironment
// ============================================================================

/// Injected access to the page document.
///
/// Queries return nodes in document order. A `scope` of `None` means the
/// whole document; `Some(node)` restricts results to descendants of `node`
/// (for a shadow root, descendants inside that root).
pub trait DomEnvironment: Send + Sync {
    /// Runs a CSS query.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedSelector`] for syntax the environment
    /// cannot evaluate.
    fn query_selector_all(&self, scope: Option<NodeId>, selector: &str) -> Result<Vec<NodeId>>;

    /// Evaluates an XPath expression.
    ///
    /// # Errors
    ///
    /// The default implementation reports the expression as unsupported.
    fn evaluate_xpath(&self, scope: Option<NodeId>, expression: &str) -> Result<Vec<NodeId>> {
        let _ = scope;
        Err(Error::unsupported_selector(format!("xpath/{expression}")))
    }

    /// Returns the open shadow root of `node`, if any.
    fn shadow_root(&self, node: NodeId) -> Option<NodeId>;

    /// `parentElement` of a node.
    fn parent_element(&self, node: NodeId) -> Option<NodeId>;

    /// Document of a same-origin `<iframe>`, usable as a query scope.
    fn content_document(&self, node: NodeId) -> Option<NodeId> {
        let _ = node;
        None
    }

    /// `textContent` of a node.
    fn text_content(&self, node: NodeId) -> String;

    /// `innerText` of the document element.
    fn inner_text(&self) -> String;

    /// Computed value of a CSS property.
    fn computed_style(&self, node: NodeId, property: &str) -> Option<String>;

    /// `offsetHeight` of a node.
    fn offset_height(&self, node: NodeId) -> f64;

    /// Whether `offsetParent` is non-null.
    fn has_offset_parent(&self, node: NodeId) -> bool;

    /// `checked` state of an input.
    fn is_checked(&self, node: NodeId) -> bool;

    /// Calls `element.click()`.
    fn click(&self, node: NodeId);

    /// Adds a class to an element.
    fn add_class(&self, node: NodeId, class: &str);

    /// `getBoundingClientRect()`.
    fn bounding_rect(&self, node: NodeId) -> Rect;

    /// Dispatches a synthetic mouse event on `node`.
    fn dispatch_mouse(&self, node: NodeId, event: MouseEvent);

    /// Appends CSS text to the `<style id=style_id>` element, creating it in
    /// the document head when missing. Returns `false` if it could not be
    /// written.
    fn append_style_rule(&self, style_id: &str, css: &str) -> bool;

    /// Removes the `<style id=style_id>` element. Returns whether it existed.
    fn remove_style(&self, style_id: &str) -> bool;

    /// Current text of the `<style id=style_id>` element.
    fn style_text(&self, style_id: &str) -> Option<String>;

    /// Whether the `<style id=style_id>` element exists.
    fn has_style(&self, style_id: &str) -> bool {
        self.style_text(style_id).is_some()
    }

    /// Whether this document is the top frame.
    fn is_top_frame(&self) -> bool;

    /// `location.href`.
    fn location(&self) -> String;

    /// `document.cookie`.
    fn cookie(&self) -> String {
        String::new()
    }

    /// `document.readyState`.
    fn ready_state(&self) -> ReadyState;

    /// `window.close()`.
    fn close_window(&self) {}
}

// ============================================================================
// Tests
// ============================================================================
