//! The strategy trait and the context every strategy runs against.
//!
//! A [`CmpStrategy`] never owns the page. Each call receives a
//! [`CmpContext`] carrying the shared [`DomActions`] provider and the
//! [`EvalBridge`], so one strategy instance can serve the whole engine
//! lifetime.
//!
//! # Defaults
//!
//! | Method | Default |
//! |--------|---------|
//! | `run_context` | top frame, any URL |
//! | `prehide_selectors` | none |
//! | `is_cosmetic` / `is_intermediate` | `false` |
//! | `detect_popup` | `false` |
//! | `open_cmp` | `false` |
//! | `test` | `true` |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use crate::bridge::EvalBridge;
use crate::dom::{DomActions, DomEnvironment, HideMethod, VisibilityCheck};
use crate::engine::LogsConfig;
use crate::identifiers::NodeId;
use crate::rules::{Interpreter, RunContext};

// ============================================================================
// CmpContext
// ============================================================================

/// Shared DOM and eval access for strategies.
#[derive(Clone)]
pub struct CmpContext {
    dom: DomActions,
    bridge: EvalBridge,
}

impl fmt::Debug for CmpContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CmpContext")
            .field("dom", &self.dom)
            .field("bridge", &self.bridge)
            .finish()
    }
}

impl CmpContext {
    /// Creates a context.
    #[must_use]
    pub fn new(dom: DomActions, bridge: EvalBridge) -> Self {
        Self { dom, bridge }
    }

    /// DOM primitives.
    #[inline]
    #[must_use]
    pub fn dom(&self) -> &DomActions {
        &self.dom
    }

    /// Eval bridge.
    #[inline]
    #[must_use]
    pub fn bridge(&self) -> &EvalBridge {
        &self.bridge
    }

    /// Underlying document.
    #[inline]
    #[must_use]
    pub fn env(&self) -> &dyn DomEnvironment {
        self.dom.env().as_ref()
    }

    /// Active log channels.
    #[inline]
    #[must_use]
    pub fn logs(&self) -> LogsConfig {
        self.dom.logs()
    }

    /// Step interpreter bound to this context.
    #[must_use]
    pub fn interpreter(&self) -> Interpreter<'_> {
        Interpreter::new(&self.dom, &self.bridge)
    }

    /// Whether this context sits in the top frame.
    #[must_use]
    pub fn is_top_frame(&self) -> bool {
        self.env().is_top_frame()
    }

    /// Current page URL.
    #[must_use]
    pub fn location(&self) -> String {
        self.env().location()
    }
}

// ============================================================================
// Provider Shortcuts
// ============================================================================

impl CmpContext {
    /// Clicks the first match.
    pub fn click(&self, selector: &str) -> bool {
        self.dom.click(&selector.into(), false)
    }

    /// Clicks every match.
    pub fn click_all(&self, selector: &str) -> bool {
        self.dom.click(&selector.into(), true)
    }

    /// Whether the selector matches anything.
    #[must_use]
    pub fn exists(&self, selector: &str) -> bool {
        self.dom.element_exists(&selector.into())
    }

    /// Aggregated visibility of the matches.
    #[must_use]
    pub fn visible(&self, selector: &str, check: VisibilityCheck) -> bool {
        self.dom.element_visible(&selector.into(), check)
    }

    /// First document match of a CSS selector.
    #[must_use]
    pub fn query(&self, selector: &str) -> Option<NodeId> {
        self.query_in(None, selector)
    }

    /// First match of a CSS selector below `scope`.
    #[must_use]
    pub fn query_in(&self, scope: Option<NodeId>, selector: &str) -> Option<NodeId> {
        self.query_all_in(scope, selector).into_iter().next()
    }

    /// All document matches of a CSS selector.
    #[must_use]
    pub fn query_all(&self, selector: &str) -> Vec<NodeId> {
        self.query_all_in(None, selector)
    }

    /// All matches of a CSS selector below `scope`.
    #[must_use]
    pub fn query_all_in(&self, scope: Option<NodeId>, selector: &str) -> Vec<NodeId> {
        self.env().query_selector_all(scope, selector).unwrap_or_default()
    }

    /// Polls for the selector.
    pub async fn wait_for_element(&self, selector: &str, timeout: Duration) -> bool {
        self.dom.wait_for_element(&selector.into(), timeout).await
    }

    /// Polls for visibility.
    pub async fn wait_for_visible(&self, selector: &str, timeout: Duration, check: VisibilityCheck) -> bool {
        self.dom.wait_for_visible(&selector.into(), timeout, check).await
    }

    /// Polls for the selector, then clicks the first match.
    pub async fn wait_for_then_click(&self, selector: &str, timeout: Duration) -> bool {
        self.dom.wait_for_then_click(&selector.into(), timeout, false).await
    }

    /// Sleeps.
    pub async fn wait(&self, ms: u64) -> bool {
        self.dom.wait(ms).await
    }

    /// Hides through the rules style element.
    pub fn hide(&self, selector: &str, method: HideMethod) -> bool {
        self.dom.hide(selector, method)
    }

    /// Runs a registered snippet in the page context.
    pub async fn eval(&self, snippet_id: &str) -> bool {
        self.bridge.eval_snippet(snippet_id).await
    }

    /// Waits for the selector in the background and clicks it when it
    /// shows up. The caller does not observe the outcome.
    pub fn spawn_wait_for_then_click(&self, selector: &'static str, timeout: Duration) {
        let dom = self.dom.clone();
        tokio::spawn(async move {
            dom.wait_for_then_click(&selector.into(), timeout, false).await;
        });
    }
}

// ============================================================================
// CmpStrategy
// ============================================================================

/// One way of recognizing and driving a consent UI.
#[async_trait]
pub trait CmpStrategy: Send + Sync {
    /// Name reported in messages and matched against `disabledCmps`.
    fn name(&self) -> &str;

    /// Frame and URL scope.
    fn run_context(&self) -> RunContext {
        RunContext::default()
    }

    /// CSS hidden while a decision is pending.
    fn prehide_selectors(&self) -> Vec<String> {
        Vec::new()
    }

    /// Only hides the popup instead of answering it.
    fn is_cosmetic(&self) -> bool {
        false
    }

    /// Success does not finish the flow.
    fn is_intermediate(&self) -> bool {
        false
    }

    /// Whether [`test`](Self::test) is meaningful after an opt-out.
    fn has_self_test(&self) -> bool;

    /// Whether the strategy may run in this frame and URL.
    fn check_run_context(&self, cx: &CmpContext) -> bool {
        self.run_context().check(cx.is_top_frame(), &cx.location())
    }

    /// Whether the CMP is present on the page.
    async fn detect_cmp(&self, cx: &CmpContext) -> bool;

    /// Whether the CMP popup is currently showing.
    async fn detect_popup(&self, _cx: &CmpContext) -> bool {
        false
    }

    /// Declines everything that can be declined.
    async fn opt_out(&self, cx: &CmpContext) -> bool;

    /// Accepts everything.
    async fn opt_in(&self, cx: &CmpContext) -> bool;

    /// Opens the CMP settings.
    async fn open_cmp(&self, _cx: &CmpContext) -> bool {
        false
    }

    /// Verifies the stored decision.
    async fn test(&self, _cx: &CmpContext) -> bool {
        true
    }
}

impl fmt::Debug for dyn CmpStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CmpStrategy")
            .field("name", &self.name())
            .field("cosmetic", &self.is_cosmetic())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
