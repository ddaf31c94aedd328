//! Consent-o-matic rule format.
//!
//! # Format
//!
//! ```json
//! {
//!   "detectors": [{
//!     "presentMatcher": { "type": "css", "target": { "selector": "#cmp" } },
//!     "showingMatcher": { "type": "css", "target": { "selector": "#cmp", "displayFilter": true } }
//!   }],
//!   "methods": [
//!     { "name": "HIDE_CMP", "action": { "type": "hide", "target": { "selector": "#cmp" } } },
//!     { "name": "SAVE_CONSENT", "action": { "type": "click", "target": { "selector": ".save" } } }
//!   ]
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

// ============================================================================
// Element Selection
// ============================================================================

/// Case-insensitive text filter: one needle or any of several.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextFilter {
    /// Single needle.
    One(String),
    /// Any of these needles.
    Any(Vec<String>),
}

impl TextFilter {
    /// Whether `text` contains a needle, ignoring case.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        let text = text.to_lowercase();
        match self {
            Self::One(needle) => text.contains(&needle.to_lowercase()),
            Self::Any(needles) => needles.iter().any(|n| text.contains(&n.to_lowercase())),
        }
    }
}

/// Computed-style comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StyleFilter {
    /// CSS property.
    pub option: String,
    /// Expected value.
    pub value: String,
    /// Require inequality instead.
    #[serde(default)]
    pub negated: bool,
}

/// Selector plus candidate filters.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementOptions {
    /// CSS selector.
    pub selector: String,
    /// Text-content filter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_filter: Option<TextFilter>,
    /// Computed-style filters, all must hold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_filters: Option<Vec<StyleFilter>>,
    /// `true`: rendered with height; `false`: zero height.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_filter: Option<bool>,
    /// `true`: only inside sub-frames; `false`: only in the top frame.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iframe_filter: Option<bool>,
    /// A nested search that must find something inside the candidate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub child_filter: Option<Box<FindSpec>>,
}

impl ElementOptions {
    /// Options with only a selector.
    #[must_use]
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            ..Self::default()
        }
    }

    /// Adds a text filter.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_filter = Some(TextFilter::One(text.into()));
        self
    }

    /// Adds a display filter.
    #[must_use]
    pub fn with_display(mut self, displayed: bool) -> Self {
        self.display_filter = Some(displayed);
        self
    }
}

/// Target, optionally searched inside each match of a parent.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FindSpec {
    /// Parent search.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<ElementOptions>,
    /// Target search.
    pub target: ElementOptions,
}

impl FindSpec {
    /// Searches `selector` in the document.
    #[must_use]
    pub fn target(selector: impl Into<String>) -> Self {
        Self {
            parent: None,
            target: ElementOptions::new(selector),
        }
    }
}

// ============================================================================
// Matchers
// ============================================================================

/// Boolean test over a search.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Matcher {
    /// Target exists.
    Css {
        /// Search.
        #[serde(flatten)]
        find: FindSpec,
    },
    /// Target exists and is checked.
    Checkbox {
        /// Search.
        #[serde(flatten)]
        find: FindSpec,
    },
}

// ============================================================================
// Actions
// ============================================================================

/// One consent category handled by a `consent` action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConsentConfig {
    /// Category letter (`A`, `B`, `D`, `E`, `F`, `X`).
    #[serde(rename = "type")]
    pub consent_type: String,
    /// Current state of the category.
    #[serde(default)]
    pub matcher: Option<Matcher>,
    /// Flips the category.
    #[serde(default)]
    pub toggle_action: Option<Action>,
    /// Enables the category.
    #[serde(default)]
    pub true_action: Option<Action>,
    /// Disables the category.
    #[serde(default)]
    pub false_action: Option<Action>,
}

/// Consent-o-matic action tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum Action {
    /// Click the target.
    Click {
        /// Search.
        #[serde(flatten)]
        find: FindSpec,
    },
    /// Run actions in order.
    List {
        /// Sub-actions.
        actions: Vec<Action>,
    },
    /// Set each category according to the requested consent types.
    Consent {
        /// Categories.
        consents: Vec<ConsentConfig>,
    },
    /// Branch on whether the target is absent (`trueAction`) or present
    /// (`falseAction`).
    Ifcss {
        /// Search.
        #[serde(flatten)]
        find: FindSpec,
        /// Run when nothing matches.
        #[serde(default)]
        true_action: Option<Box<Action>>,
        /// Run when the target matches.
        #[serde(default)]
        false_action: Option<Box<Action>>,
    },
    /// Poll until the target appears (or disappears with `negated`).
    Waitcss {
        /// Search.
        #[serde(flatten)]
        find: FindSpec,
        /// Extra polls; `0` or missing means 10.
        #[serde(default)]
        retries: Option<u32>,
        /// Poll interval in ms; `0` or missing means 250.
        #[serde(default)]
        wait_time: Option<u64>,
        /// Wait for absence.
        #[serde(default)]
        negated: bool,
    },
    /// Run `action` scoped to each match.
    Foreach {
        /// Search.
        #[serde(flatten)]
        find: FindSpec,
        /// Per-match action.
        action: Box<Action>,
    },
    /// Add the hidden marker class to the target.
    Hide {
        /// Search.
        #[serde(flatten)]
        find: FindSpec,
    },
    /// Drag the target towards `dragTarget`.
    Slide {
        /// Search.
        #[serde(flatten)]
        find: FindSpec,
        /// Where to drag to.
        drag_target: FindSpec,
        /// `x`, `y` or anything else for both.
        #[serde(default)]
        axis: String,
    },
    /// Close the window.
    Close,
    /// Sleep.
    Wait {
        /// Milliseconds.
        #[serde(default)]
        wait_time: u64,
    },
    /// Evaluate code in the page context.
    Eval {
        /// Source.
        code: String,
        /// Read `window.__consentCheckResult` after `timeout`.
        #[serde(default, rename = "async")]
        is_async: bool,
        /// Delay for async evals in ms; missing means 250.
        #[serde(default)]
        timeout: Option<u64>,
    },
    /// Any other `type`.
    #[serde(other)]
    Unknown,
}

impl Action {
    /// The `type` tag.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Click { .. } => "click",
            Self::List { .. } => "list",
            Self::Consent { .. } => "consent",
            Self::Ifcss { .. } => "ifcss",
            Self::Waitcss { .. } => "waitcss",
            Self::Foreach { .. } => "foreach",
            Self::Hide { .. } => "hide",
            Self::Slide { .. } => "slide",
            Self::Close => "close",
            Self::Wait { .. } => "wait",
            Self::Eval { .. } => "eval",
            Self::Unknown => "unknown",
        }
    }
}

// ============================================================================
// Config
// ============================================================================

/// Detection matchers of one CMP variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detector {
    /// CMP is present.
    pub present_matcher: Matcher,
    /// CMP popup is showing.
    pub showing_matcher: Matcher,
}

/// Named method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MethodConfig {
    /// `HIDE_CMP`, `OPEN_OPTIONS`, `DO_CONSENT`, `SAVE_CONSENT`, ...
    pub name: String,
    /// Body; methods without one are skipped.
    #[serde(default)]
    pub action: Option<Action>,
}

/// One consent-o-matic CMP.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsentOMaticConfig {
    /// Detectors, ORed.
    pub detectors: Vec<Detector>,
    /// Methods.
    pub methods: Vec<MethodConfig>,
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_actions() {
        let json = r##"{
            "type": "list",
            "actions": [
                {"type": "click", "target": {"selector": ".more", "textFilter": ["More", "Mehr"]}},
                {"type": "waitcss", "target": {"selector": ".panel"}, "retries": 5, "waitTime": 100},
                {"type": "foreach", "parent": {"selector": "#list"}, "target": {"selector": ".row"},
                 "action": {"type": "hide", "target": {"selector": ".x"}}},
                {"type": "eval", "code": "window.x = 1", "async": true},
                {"type": "drag"}
            ]
        }"##;
        let action: Action = serde_json::from_str(json).expect("parse");
        let Action::List { actions } = action else {
            panic!("expected list");
        };
        assert_eq!(actions.len(), 5);
        assert!(matches!(
            &actions[1],
            Action::Waitcss { retries: Some(5), wait_time: Some(100), negated: false, .. }
        ));
        assert!(matches!(&actions[2], Action::Foreach { find, .. } if find.parent.is_some()));
        assert!(matches!(&actions[3], Action::Eval { is_async: true, .. }));
        assert_eq!(actions[4], Action::Unknown);
    }

    #[test]
    fn test_parse_config() {
        let json = r##"{
            "detectors": [{
                "presentMatcher": {"type": "css", "target": {"selector": "#cmp"}},
                "showingMatcher": {"type": "checkbox", "target": {"selector": "#cmp input", "displayFilter": true}}
            }],
            "methods": [{"name": "HIDE_CMP"}, {"name": "SAVE_CONSENT", "action": {"type": "close"}}]
        }"##;
        let config: ConsentOMaticConfig = serde_json::from_str(json).expect("parse");
        assert_eq!(config.detectors.len(), 1);
        assert!(matches!(config.detectors[0].showing_matcher, Matcher::Checkbox { .. }));
        assert_eq!(config.methods[1].action, Some(Action::Close));
        assert!(config.methods[0].action.is_none());
    }

    #[test]
    fn test_text_filter() {
        assert!(TextFilter::One("Reject".into()).matches("REJECT ALL"));
        assert!(TextFilter::Any(vec!["nope".into(), "all".into()]).matches("Reject all"));
        assert!(!TextFilter::Any(vec![]).matches("x"));
    }
}
