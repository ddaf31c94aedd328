//! DOM action primitives shared by every CMP strategy.
//!
//! [`DomActions`] is a cheap-clone handle over the injected
//! [`DomEnvironment`]. All selector arguments accept an
//! [`ElementSelector`]; resolution never fails, an unresolvable selector
//! simply matches nothing.
//!
//! # Visibility
//!
//! An element is visible when it has an offset parent, or when its computed
//! `position` is `fixed` and its `display` is not `none`.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::sleep;
use tracing::{debug, trace, warn};

use crate::engine::LogsConfig;
use crate::identifiers::NodeId;

use super::environment::DomEnvironment;
use super::selector::{ElementSelector, SelectorKind};
use super::style::{CSS_RULES_STYLE_ID, HideMethod, PREHIDE_STYLE_ID, hiding_rule};
use super::wait::{poll_count, wait_for};

// ============================================================================
// Constants
// ============================================================================

/// Default timeout of element waits.
pub const DEFAULT_WAIT_TIMEOUT: Duration = Duration::from_millis(10_000);

/// Poll interval of element waits.
pub const WAIT_POLL_INTERVAL: Duration = Duration::from_millis(200);

// ============================================================================
// VisibilityCheck
// ============================================================================

/// Aggregation of per-element visibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisibilityCheck {
    /// Every match visible (and at least one match).
    #[default]
    All,
    /// At least one match visible.
    Any,
    /// No match visible; vacuously true for zero matches.
    None,
}

// ============================================================================
// DomActions
// ============================================================================

/// DOM primitives over an injected document.
#[derive(Clone)]
pub struct DomActions {
    env: Arc<dyn DomEnvironment>,
    logs: LogsConfig,
}

impl fmt::Debug for DomActions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomActions")
            .field("logs", &self.logs)
            .finish_non_exhaustive()
    }
}

impl DomActions {
    /// Creates an action provider.
    #[must_use]
    pub fn new(env: Arc<dyn DomEnvironment>, logs: LogsConfig) -> Self {
        Self { env, logs }
    }

    /// Returns the underlying environment.
    #[inline]
    #[must_use]
    pub fn env(&self) -> &Arc<dyn DomEnvironment> {
        &self.env
    }

    /// Returns the active log channels.
    #[inline]
    #[must_use]
    pub fn logs(&self) -> LogsConfig {
        self.logs
    }

    /// Returns a copy using different log channels.
    #[must_use]
    pub fn with_logs(&self, logs: LogsConfig) -> Self {
        Self {
            env: Arc::clone(&self.env),
            logs,
        }
    }
}

// ============================================================================
// Selector Resolution
// ============================================================================

impl DomActions {
    /// Resolves one selector string below `parent` (or the document).
    ///
    /// `aria/`, `text/` and `pierce/` selectors resolve to nothing. If the
    /// parent hosts a shadow root, CSS queries run inside that root.
    #[must_use]
    pub fn query_single_reply_selector(&self, selector: &str, parent: Option<NodeId>) -> Vec<NodeId> {
        let result = match SelectorKind::parse(selector) {
            SelectorKind::Aria(_) | SelectorKind::Text(_) | SelectorKind::Pierce(_) => {
                return Vec::new();
            }
            SelectorKind::XPath(expr) => self.env.evaluate_xpath(parent, expr),
            SelectorKind::Css(css) => {
                let scope = parent.map(|p| self.env.shadow_root(p).unwrap_or(p));
                self.env.query_selector_all(scope, css)
            }
        };

        match result {
            Ok(nodes) => nodes,
            Err(e) => {
                if self.logs.errors {
                    warn!(selector, error = %e, "Selector could not be resolved");
                }
                Vec::new()
            }
        }
    }

    /// Resolves a chain: each step runs inside the first match of the
    /// previous one. Returns the matches of the last step.
    #[must_use]
    pub fn query_selector_chain(&self, selectors: &[impl AsRef<str>]) -> Vec<NodeId> {
        let mut parent = None;
        let mut matches = Vec::new();
        for selector in selectors {
            matches = self.query_single_reply_selector(selector.as_ref(), parent);
            match matches.first() {
                Some(first) => parent = Some(*first),
                None => return Vec::new(),
            }
        }
        matches
    }

    /// Resolves a single selector or a chain.
    #[must_use]
    pub fn element_selector(&self, selector: &ElementSelector) -> Vec<NodeId> {
        match selector {
            ElementSelector::Single(s) => self.query_single_reply_selector(s, None),
            ElementSelector::Chain(chain) => self.query_selector_chain(chain),
        }
    }
}

// ============================================================================
// Queries
// ============================================================================

impl DomActions {
    /// Returns `true` if the selector matches anything.
    #[must_use]
    pub fn element_exists(&self, selector: &ElementSelector) -> bool {
        !self.element_selector(selector).is_empty()
    }

    /// Visibility of a single node.
    #[must_use]
    pub fn is_element_visible(&self, node: NodeId) -> bool {
        if self.env.has_offset_parent(node) {
            return true;
        }
        let fixed = self.env.computed_style(node, "position").as_deref() == Some("fixed");
        let displayed = self.env.computed_style(node, "display").as_deref() != Some("none");
        fixed && displayed
    }

    /// Aggregated visibility of all matches.
    #[must_use]
    pub fn element_visible(&self, selector: &ElementSelector, check: VisibilityCheck) -> bool {
        let nodes = self.element_selector(selector);
        let mut results = nodes.iter().map(|n| self.is_element_visible(*n));

        match check {
            VisibilityCheck::None => results.all(|visible| !visible),
            _ if nodes.is_empty() => false,
            VisibilityCheck::Any => results.any(|visible| visible),
            VisibilityCheck::All => results.all(|visible| visible),
        }
    }
}

// ============================================================================
// Mutations
// ============================================================================

impl DomActions {
    /// Clicks the first match, or all of them. Returns whether anything
    /// matched.
    pub fn click(&self, selector: &ElementSelector, all: bool) -> bool {
        let nodes = self.element_selector(selector);
        if self.logs.rulesteps {
            trace!(%selector, all, matches = nodes.len(), "click");
        }

        if all {
            for node in &nodes {
                self.env.click(*node);
            }
        } else if let Some(first) = nodes.first() {
            self.env.click(*first);
        }
        !nodes.is_empty()
    }

    /// Hides matches of a CSS selector through the rules style element.
    pub fn hide(&self, selector: &str, method: HideMethod) -> bool {
        if self.logs.rulesteps {
            trace!(selector, ?method, "hide");
        }
        self.hide_with_style(CSS_RULES_STYLE_ID, selector, method)
    }

    /// Hides a selector through the prehide style element.
    pub fn prehide(&self, selector: &str) -> bool {
        if self.logs.lifecycle {
            debug!(selector, url = %self.env.location(), "prehide");
        }
        self.hide_with_style(PREHIDE_STYLE_ID, selector, HideMethod::Opacity)
    }

    /// Removes the prehide style element. Returns whether it existed.
    pub fn undo_prehide(&self) -> bool {
        if self.logs.lifecycle {
            debug!(url = %self.env.location(), "undo prehide");
        }
        self.env.remove_style(PREHIDE_STYLE_ID)
    }

    /// Appends a hiding rule to the given style element.
    pub fn hide_with_style(&self, style_id: &str, selector: &str, method: HideMethod) -> bool {
        let written = self.env.append_style_rule(style_id, &hiding_rule(selector, method));
        written && !selector.is_empty()
    }
}

// ============================================================================
// Waits
// ============================================================================

impl DomActions {
    /// Polls until the selector matches or `timeout` elapses.
    pub async fn wait_for_element(&self, selector: &ElementSelector, timeout: Duration) -> bool {
        if self.logs.rulesteps {
            trace!(%selector, ?timeout, "waitForElement");
        }
        let times = poll_count(timeout, WAIT_POLL_INTERVAL);
        wait_for(|| self.element_exists(selector), times, WAIT_POLL_INTERVAL).await
    }

    /// Polls until the visibility check passes or `timeout` elapses.
    pub async fn wait_for_visible(
        &self,
        selector: &ElementSelector,
        timeout: Duration,
        check: VisibilityCheck,
    ) -> bool {
        if self.logs.rulesteps {
            trace!(%selector, ?timeout, ?check, "waitForVisible");
        }
        let times = poll_count(timeout, WAIT_POLL_INTERVAL);
        wait_for(|| self.element_visible(selector, check), times, WAIT_POLL_INTERVAL).await
    }

    /// Waits for the selector, then clicks whatever matches.
    pub async fn wait_for_then_click(&self, selector: &ElementSelector, timeout: Duration, all: bool) -> bool {
        self.wait_for_element(selector, timeout).await;
        self.click(selector, all)
    }

    /// Sleeps for `ms` milliseconds. Always `true`.
    pub async fn wait(&self, ms: u64) -> bool {
        if self.logs.rulesteps && self.logs.waits {
            trace!(ms, "wait");
        }
        sleep(Duration::from_millis(ms)).await;
        true
    }
}

// ============================================================================
// Tests
// ============================================================================
