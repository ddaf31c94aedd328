//! Sourcepoint message and privacy-manager frames.
//!
//! Detection is purely URL based: the message frame and the privacy manager
//! live on known paths, and the CCPA variants on their own hosts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;
use url::Url;

use crate::cmps::{CmpContext, CmpStrategy};
use crate::dom::wait::wait_for;
use crate::dom::{DEFAULT_WAIT_TIMEOUT, VisibilityCheck};
use crate::rules::RunContext;

const CCPA_NOTICE_HOST: &str = "ccpa-notice.sp-prod.net";
const CCPA_MANAGER_HOST: &str = "ccpa-pm.sp-prod.net";
const MESSAGE_PATHS: &[&str] = &["/index.html", "/privacy-manager/index.html", "/ccpa_pm/index.html"];
const MANAGER_PATHS: &[&str] = &["/privacy-manager/index.html", "/ccpa_pm/index.html"];
const MESSAGE_PARAMS: &[&str] = &["message_id", "requestUUID", "consentUUID"];

const REJECT_ALL: &str = ".sp_choice_type_REJECT_ALL";
const REJECT_TOGGLE: &str = ".reject-toggle";
const FEATURES: &str = ".pm-features";

/// Which privacy-manager layout showed up first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ManagerLayout {
    RejectAll,
    RejectToggle,
    Features,
}

fn has_param(url: &Url, name: &str) -> bool {
    url.query_pairs().any(|(key, _)| key == name)
}

/// Sourcepoint consent frames.
#[derive(Debug, Default)]
pub struct SourcePoint {
    ccpa_notice: AtomicBool,
    ccpa_popup: AtomicBool,
}

impl SourcePoint {
    /// Creates the strategy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn is_manager_open(cx: &CmpContext) -> bool {
        Url::parse(&cx.location()).is_ok_and(|url| MANAGER_PATHS.contains(&url.path()))
    }

    async fn race_manager_layout(cx: &CmpContext) -> Option<ManagerLayout> {
        let timeout = Duration::from_millis(2000);
        let find_layout = move |selector: &'static str, layout: ManagerLayout| async move {
            cx.wait_for_element(selector, timeout).await.then_some(layout)
        };
        tokio::select! {
            biased;
            found = find_layout(REJECT_ALL, ManagerLayout::RejectAll) => found,
            found = find_layout(REJECT_TOGGLE, ManagerLayout::RejectToggle) => found,
            found = find_layout(FEATURES, ManagerLayout::Features) => found,
        }
    }
}

#[async_trait]
impl CmpStrategy for SourcePoint {
    fn name(&self) -> &str {
        "Sourcepoint-frame"
    }

    fn run_context(&self) -> RunContext {
        RunContext::everywhere()
    }

    fn prehide_selectors(&self) -> Vec<String> {
        vec![
            "div[id^='sp_message_container_'],.message-overlay".to_string(),
            "#sp_privacy_manager_container".to_string(),
        ]
    }

    fn has_self_test(&self) -> bool {
        false
    }

    async fn detect_cmp(&self, cx: &CmpContext) -> bool {
        let Ok(url) = Url::parse(&cx.location()) else {
            return false;
        };
        let host = url.host_str().unwrap_or_default();
        if has_param(&url, "message_id") && host == CCPA_NOTICE_HOST {
            self.ccpa_notice.store(true, Ordering::Release);
            return true;
        }
        if host == CCPA_MANAGER_HOST {
            self.ccpa_popup.store(true, Ordering::Release);
            return true;
        }
        MESSAGE_PATHS.contains(&url.path()) && MESSAGE_PARAMS.iter().any(|p| has_param(&url, p))
    }

    async fn detect_popup(&self, cx: &CmpContext) -> bool {
        if self.ccpa_notice.load(Ordering::Acquire) {
            return true;
        }
        let timeout = Duration::from_millis(2000);
        if self.ccpa_popup.load(Ordering::Acquire) {
            return cx.wait_for_element(".priv-save-btn", timeout).await;
        }
        cx.wait_for_element(
            ".sp_choice_type_11,.sp_choice_type_12,.sp_choice_type_13,.sp_choice_type_ACCEPT_ALL,.sp_choice_type_SAVE_AND_EXIT",
            timeout,
        )
        .await;
        !cx.exists(".sp_choice_type_9")
    }

    async fn opt_in(&self, cx: &CmpContext) -> bool {
        cx.wait_for_element(".sp_choice_type_11,.sp_choice_type_ACCEPT_ALL", Duration::from_millis(2000))
            .await;
        cx.click(".sp_choice_type_11") || cx.click(".sp_choice_type_ACCEPT_ALL")
    }

    async fn opt_out(&self, cx: &CmpContext) -> bool {
        if self.ccpa_popup.load(Ordering::Acquire) {
            let env = cx.env();
            for toggle in cx.query_all(".priv-purpose-container .sp-switch-arrow-block a.neutral.on .right") {
                env.click(toggle);
            }
            for switch in cx.query_all(".priv-purpose-container .sp-switch-arrow-block a.switch-bg.on") {
                env.click(switch);
            }
            return cx.click(".priv-save-btn");
        }

        if !Self::is_manager_open(cx) {
            if !cx
                .wait_for_element(".sp_choice_type_12,.sp_choice_type_13", DEFAULT_WAIT_TIMEOUT)
                .await
            {
                return false;
            }
            if !cx.exists(".sp_choice_type_12") {
                return cx.click(".sp_choice_type_13");
            }
            cx.click(".sp_choice_type_12");
            wait_for(|| Self::is_manager_open(cx), 200, Duration::from_millis(100)).await;
        }

        cx.wait_for_element(".type-modal", Duration::from_secs(20)).await;
        let dom = cx.dom().clone();
        tokio::spawn(async move {
            dom.wait_for_then_click(
                &".ccpa-stack .pm-switch[aria-checked=true] .slider".into(),
                Duration::from_millis(500),
                true,
            )
            .await;
        });

        let layout = Self::race_manager_layout(cx).await;
        if cx.logs().rulesteps {
            debug!(?layout, "Privacy manager layout");
        }
        match layout {
            Some(ManagerLayout::RejectAll) => {
                cx.wait_for_visible(REJECT_ALL, DEFAULT_WAIT_TIMEOUT, VisibilityCheck::Any)
                    .await;
                return cx.click(REJECT_ALL);
            }
            Some(ManagerLayout::RejectToggle) => {
                cx.click(REJECT_TOGGLE);
            }
            Some(ManagerLayout::Features) => {
                cx.wait_for_element(FEATURES, Duration::from_secs(10)).await;
                cx.click_all(".checked > span");
                cx.click(".chevron");
            }
            None => {}
        }
        cx.click(".sp_choice_type_SAVE_AND_EXIT")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmps::vendors::tests::context;
    use crate::dom::{ElementSpec, MemoryDom};

    #[tokio::test]
    async fn test_detects_message_frame_by_url() {
        let cmp = SourcePoint::new();
        let dom = MemoryDom::new()
            .as_subframe()
            .with_location("https://cdn.privacy-mgmt.com/index.html?message_id=123");
        let cx = context(&dom);
        assert!(cmp.check_run_context(&cx));
        assert!(cmp.detect_cmp(&cx).await);

        let plain = MemoryDom::new().with_location("https://cdn.privacy-mgmt.com/index.html");
        assert!(!cmp.detect_cmp(&context(&plain)).await);
    }

    #[tokio::test]
    async fn test_ccpa_notice_popup_is_immediate() {
        let cmp = SourcePoint::new();
        let dom = MemoryDom::new().with_location("https://ccpa-notice.sp-prod.net/?message_id=9");
        let cx = context(&dom);
        assert!(cmp.detect_cmp(&cx).await);
        assert!(cmp.detect_popup(&cx).await);
    }

    #[tokio::test]
    async fn test_ccpa_manager_opt_out() {
        let cmp = SourcePoint::new();
        let dom = MemoryDom::new().with_location("https://ccpa-pm.sp-prod.net/");
        let container = dom.append(None, ElementSpec::new("div").class("priv-purpose-container"));
        let block = dom.append(Some(container), ElementSpec::new("div").class("sp-switch-arrow-block"));
        let on = dom.append(Some(block), ElementSpec::new("a").class("switch-bg").class("on"));
        let save = dom.append(None, ElementSpec::new("button").class("priv-save-btn"));
        let cx = context(&dom);

        assert!(cmp.detect_cmp(&cx).await);
        assert!(cmp.opt_out(&cx).await);
        assert_eq!(dom.click_count(on), 1);
        assert_eq!(dom.click_count(save), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_message_opt_out_without_manager() {
        let cmp = SourcePoint::new();
        let dom = MemoryDom::new().with_location("https://cdn.privacy-mgmt.com/index.html?message_id=1");
        let reject = dom.append(None, ElementSpec::new("button").class("sp_choice_type_13"));
        let cx = context(&dom);

        assert!(cmp.opt_out(&cx).await);
        assert_eq!(dom.click_count(reject), 1);
    }
}
