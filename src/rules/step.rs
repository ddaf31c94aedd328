//! One instruction of the rule language.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::dom::{ElementSelector, HideMethod, VisibilityCheck};

// ============================================================================
// ActionStep
// ============================================================================

/// A rule step.
///
/// Every present field becomes one operation; the operations of a step run
/// concurrently and their results are ANDed. `if`/`then`/`else` adds a
/// conditional branch and `any` an ordered, short-circuiting OR.
///
/// Fields follow JavaScript truthiness: an empty selector string, an empty
/// snippet id and `wait: 0` count as absent.
///
/// # Format
///
/// ```json
/// { "waitForThenClick": "#reject", "timeout": 2000, "optional": true }
/// { "if": { "exists": ".modal" }, "then": [{ "click": ".deny" }] }
/// { "any": [{ "exists": "#a" }, { "visible": "#b", "check": "any" }] }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ActionStep {
    /// Selector must match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exists: Option<ElementSelector>,

    /// Selector must be visible according to `check` (default `all`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible: Option<ElementSelector>,

    /// Visibility aggregation for `visible` and `waitForVisible`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub check: Option<VisibilityCheck>,

    /// Snippet id run in the page context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eval: Option<String>,

    /// Wait until the selector matches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_for: Option<ElementSelector>,

    /// Wait until the selector is visible (default check `any`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_for_visible: Option<ElementSelector>,

    /// Timeout of waits, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u64>,

    /// Click the first match (or all with `all`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub click: Option<ElementSelector>,

    /// Click every match.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub all: bool,

    /// Wait for the selector, then click.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait_for_then_click: Option<ElementSelector>,

    /// Sleep, in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wait: Option<u64>,

    /// CSS selector to hide through the rules style element.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hide: Option<String>,

    /// Hiding method for `hide`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<HideMethod>,

    /// Condition; must carry `exists` or `visible`.
    #[serde(rename = "if", skip_serializing_if = "Option::is_none")]
    pub if_: Option<Box<ActionStep>>,

    /// Steps run when the condition holds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub then: Option<Vec<ActionStep>>,

    /// Steps run when the condition fails.
    #[serde(rename = "else", skip_serializing_if = "Option::is_none")]
    pub else_: Option<Vec<ActionStep>>,

    /// Alternatives; the first success wins.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub any: Option<Vec<ActionStep>>,

    /// Failure does not abort a sequential run.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub optional: bool,
}

// ============================================================================
// Truthiness
// ============================================================================

fn truthy_selector(selector: Option<&ElementSelector>) -> Option<&ElementSelector> {
    selector.filter(|s| match s {
        ElementSelector::Single(s) => !s.is_empty(),
        ElementSelector::Chain(_) => true,
    })
}

impl ActionStep {
    /// `exists`, if set.
    #[must_use]
    pub fn exists_selector(&self) -> Option<&ElementSelector> {
        truthy_selector(self.exists.as_ref())
    }

    /// `visible`, if set.
    #[must_use]
    pub fn visible_selector(&self) -> Option<&ElementSelector> {
        truthy_selector(self.visible.as_ref())
    }

    /// `waitFor`, if set.
    #[must_use]
    pub fn wait_for_selector(&self) -> Option<&ElementSelector> {
        truthy_selector(self.wait_for.as_ref())
    }

    /// `waitForVisible`, if set.
    #[must_use]
    pub fn wait_for_visible_selector(&self) -> Option<&ElementSelector> {
        truthy_selector(self.wait_for_visible.as_ref())
    }

    /// `click`, if set.
    #[must_use]
    pub fn click_selector(&self) -> Option<&ElementSelector> {
        truthy_selector(self.click.as_ref())
    }

    /// `waitForThenClick`, if set.
    #[must_use]
    pub fn wait_for_then_click_selector(&self) -> Option<&ElementSelector> {
        truthy_selector(self.wait_for_then_click.as_ref())
    }

    /// `eval`, if set.
    #[must_use]
    pub fn eval_snippet(&self) -> Option<&str> {
        self.eval.as_deref().filter(|s| !s.is_empty())
    }

    /// `wait`, if non-zero.
    #[must_use]
    pub fn wait_ms(&self) -> Option<u64> {
        self.wait.filter(|ms| *ms > 0)
    }

    /// `hide`, if set.
    #[must_use]
    pub fn hide_selector(&self) -> Option<&str> {
        self.hide.as_deref().filter(|s| !s.is_empty())
    }

    /// Whether the step is a usable `if` condition.
    #[must_use]
    pub fn is_condition(&self) -> bool {
        self.exists_selector().is_some() || self.visible_selector().is_some()
    }
}

// ============================================================================
// Builders
// ============================================================================

impl ActionStep {
    /// `{exists: selector}`.
    #[must_use]
    pub fn exists(selector: impl Into<ElementSelector>) -> Self {
        Self {
            exists: Some(selector.into()),
            ..Self::default()
        }
    }

    /// `{visible: selector}`.
    #[must_use]
    pub fn visible(selector: impl Into<ElementSelector>) -> Self {
        Self {
            visible: Some(selector.into()),
            ..Self::default()
        }
    }

    /// `{click: selector}`.
    #[must_use]
    pub fn click(selector: impl Into<ElementSelector>) -> Self {
        Self {
            click: Some(selector.into()),
            ..Self::default()
        }
    }

    /// `{waitFor: selector}`.
    #[must_use]
    pub fn wait_for(selector: impl Into<ElementSelector>) -> Self {
        Self {
            wait_for: Some(selector.into()),
            ..Self::default()
        }
    }

    /// `{waitForThenClick: selector}`.
    #[must_use]
    pub fn wait_for_then_click(selector: impl Into<ElementSelector>) -> Self {
        Self {
            wait_for_then_click: Some(selector.into()),
            ..Self::default()
        }
    }

    /// `{eval: snippet_id}`.
    #[must_use]
    pub fn eval(snippet_id: impl Into<String>) -> Self {
        Self {
            eval: Some(snippet_id.into()),
            ..Self::default()
        }
    }

    /// `{wait: ms}`.
    #[must_use]
    pub fn wait(ms: u64) -> Self {
        Self {
            wait: Some(ms),
            ..Self::default()
        }
    }

    /// `{hide: selector}`.
    #[must_use]
    pub fn hide(selector: impl Into<String>) -> Self {
        Self {
            hide: Some(selector.into()),
            ..Self::default()
        }
    }

    /// `{any: steps}`.
    #[must_use]
    pub fn any(steps: Vec<ActionStep>) -> Self {
        Self {
            any: Some(steps),
            ..Self::default()
        }
    }

    /// `{if: condition, then, else}`.
    #[must_use]
    pub fn if_then(condition: ActionStep, then: Vec<ActionStep>, otherwise: Option<Vec<ActionStep>>) -> Self {
        Self {
            if_: Some(Box::new(condition)),
            then: Some(then),
            else_: otherwise,
            ..Self::default()
        }
    }

    /// Sets `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, ms: u64) -> Self {
        self.timeout = Some(ms);
        self
    }

    /// Sets `all`.
    #[must_use]
    pub fn with_all(mut self) -> Self {
        self.all = true;
        self
    }

    /// Sets `check`.
    #[must_use]
    pub fn with_check(mut self, check: VisibilityCheck) -> Self {
        self.check = Some(check);
        self
    }

    /// Marks the step optional.
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
