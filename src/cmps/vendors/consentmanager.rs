//! consentmanager.net, through its page API when available.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::cmps::{CmpContext, CmpStrategy};
use crate::dom::{HideMethod, VisibilityCheck};

/// consentmanager.net box.
///
/// Detection queries the `__cmp` API first. When it answers, every later
/// step goes through the API and a self-test becomes available.
#[derive(Debug, Default)]
pub struct ConsentManager {
    api_available: AtomicBool,
}

impl ConsentManager {
    /// Creates the strategy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn api(&self) -> bool {
        self.api_available.load(Ordering::Acquire)
    }
}

#[async_trait]
impl CmpStrategy for ConsentManager {
    fn name(&self) -> &str {
        "consentmanager.net"
    }

    fn prehide_selectors(&self) -> Vec<String> {
        vec!["#cmpbox,#cmpbox2".to_string()]
    }

    fn has_self_test(&self) -> bool {
        self.api()
    }

    async fn detect_cmp(&self, cx: &CmpContext) -> bool {
        let api = cx.eval("EVAL_CONSENTMANAGER_1").await;
        self.api_available.store(api, Ordering::Release);
        api || cx.exists("#cmpbox")
    }

    async fn detect_popup(&self, cx: &CmpContext) -> bool {
        if self.api() {
            cx.wait(500).await;
            return cx.eval("EVAL_CONSENTMANAGER_2").await;
        }
        cx.visible("#cmpbox .cmpmore", VisibilityCheck::Any)
    }

    async fn opt_out(&self, cx: &CmpContext) -> bool {
        cx.wait(500).await;
        if self.api() {
            return cx.eval("EVAL_CONSENTMANAGER_3").await;
        }
        if cx.click(".cmpboxbtnno") {
            return true;
        }
        if cx.exists(".cmpwelcomeprpsbtn") {
            cx.click_all(".cmpwelcomeprpsbtn > a[aria-checked=true]");
            cx.click(".cmpboxbtnsave");
            return true;
        }
        cx.click(".cmpboxbtncustom");
        cx.wait_for_element(".cmptblbox", Duration::from_millis(2000)).await;
        cx.click_all(".cmptdchoice > a[aria-checked=true]");
        cx.click(".cmpboxbtnyescustomchoices");
        cx.hide("#cmpwrapper,#cmpbox", HideMethod::Display);
        true
    }

    async fn opt_in(&self, cx: &CmpContext) -> bool {
        if self.api() {
            return cx.eval("EVAL_CONSENTMANAGER_4").await;
        }
        cx.click(".cmpboxbtnyes")
    }

    async fn test(&self, cx: &CmpContext) -> bool {
        self.api() && cx.eval("EVAL_CONSENTMANAGER_5").await
    }
}
