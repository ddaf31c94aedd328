//! Klaro consent manager.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::cmps::{CmpContext, CmpStrategy};
use crate::dom::VisibilityCheck;

const PURPOSE_TOGGLES: &str = ".cm-purpose:not(.cm-toggle-all) > input:not(.half-checked,.required,.only-required),\
                               .cm-purpose:not(.cm-toggle-all) > div > input:not(.half-checked,.required,.only-required)";

/// Klaro notice and modal.
#[derive(Debug, Default)]
pub struct Klaro {
    settings_open: AtomicBool,
}

impl Klaro {
    /// Creates the strategy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CmpStrategy for Klaro {
    fn name(&self) -> &str {
        "Klaro"
    }

    fn prehide_selectors(&self) -> Vec<String> {
        vec![".klaro".to_string()]
    }

    fn has_self_test(&self) -> bool {
        true
    }

    async fn detect_cmp(&self, cx: &CmpContext) -> bool {
        if cx.exists(".klaro > .cookie-modal") {
            self.settings_open.store(true, Ordering::Release);
            return true;
        }
        cx.exists(".klaro > .cookie-notice")
    }

    async fn detect_popup(&self, cx: &CmpContext) -> bool {
        cx.visible(".klaro > .cookie-notice,.klaro > .cookie-modal", VisibilityCheck::Any)
    }

    async fn opt_out(&self, cx: &CmpContext) -> bool {
        if cx.eval("EVAL_KLARO_TRY_API_OPT_OUT").await {
            return true;
        }
        if cx.click(".klaro .cn-decline") {
            return true;
        }
        cx.eval("EVAL_KLARO_OPEN_POPUP").await;
        if cx.click(".klaro .cn-decline") {
            return true;
        }
        cx.click_all(PURPOSE_TOGGLES);
        cx.click(".cm-btn-accept,.cm-button")
    }

    async fn opt_in(&self, cx: &CmpContext) -> bool {
        if cx.click(".klaro .cm-btn-accept-all") {
            return true;
        }
        if self.settings_open.load(Ordering::Acquire) {
            cx.click_all(".cm-purpose:not(.cm-toggle-all) > input.half-checked");
            return cx.click(".cm-btn-accept");
        }
        cx.click(".klaro .cookie-notice .cm-btn-success")
    }

    async fn test(&self, cx: &CmpContext) -> bool {
        cx.eval("EVAL_KLARO_1").await
    }
}
