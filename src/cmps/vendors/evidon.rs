//! Evidon banner.

use std::time::Duration;

use async_trait::async_trait;

use crate::cmps::{CmpContext, CmpStrategy};
use crate::dom::{DEFAULT_WAIT_TIMEOUT, HideMethod, VisibilityCheck};

/// Evidon banner and preference dialog.
#[derive(Debug, Default)]
pub struct Evidon;

impl Evidon {
    /// Creates the strategy.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CmpStrategy for Evidon {
    fn name(&self) -> &str {
        "Evidon"
    }

    fn has_self_test(&self) -> bool {
        false
    }

    async fn detect_cmp(&self, cx: &CmpContext) -> bool {
        cx.exists("#_evidon_banner")
    }

    async fn detect_popup(&self, cx: &CmpContext) -> bool {
        cx.visible("#_evidon_banner", VisibilityCheck::Any)
    }

    async fn opt_out(&self, cx: &CmpContext) -> bool {
        if cx.click("#_evidon-decline-button") {
            return true;
        }
        cx.hide(
            "#evidon-prefdiag-overlay,#evidon-prefdiag-background,#_evidon-background",
            HideMethod::Display,
        );
        cx.wait_for_then_click("#_evidon-option-button", DEFAULT_WAIT_TIMEOUT).await;
        cx.wait_for_element("#evidon-prefdiag-overlay", Duration::from_millis(5000)).await;
        cx.wait(500).await;
        cx.wait_for_then_click("#evidon-prefdiag-decline", DEFAULT_WAIT_TIMEOUT).await;
        true
    }

    async fn opt_in(&self, cx: &CmpContext) -> bool {
        cx.click("#_evidon-accept-button")
    }
}
