//! TrustArc: the top-frame banner and the preference-manager frame.

use std::sync::{Arc, LazyLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::sleep;

use crate::cmps::{CmpContext, CmpStrategy};
use crate::dom::style::CSS_RULES_STYLE_ID;
use crate::dom::wait::wait_for;
use crate::dom::{HideMethod, ReadyState, VisibilityCheck};
use crate::identifiers::NodeId;
use crate::rules::RunContext;

static RUN_CONTEXT: LazyLock<RunContext> =
    LazyLock::new(|| RunContext::frame_only().with_url_pattern(r"^https://consent-pref\.trustarc\.com/\?"));

// ============================================================================
// TrustArc-top
// ============================================================================

const COOKIE_SETTINGS_BUTTON: &str = "#truste-show-consent";
const SHORTCUT_OPT_OUT: &str = "#truste-consent-required";
const SHORTCUT_OPT_IN: &str = "#truste-consent-button";
const POPUP_CONTENT: &str = "#truste-consent-content";
const BANNER_OVERLAY: &str = "#trustarc-banner-overlay";
const BANNER_CONTAINER: &str = "#truste-consent-track";

/// How long the banner stays hidden after the settings frame is opened.
const SETTINGS_HIDE_DURATION: Duration = Duration::from_secs(10);

/// TrustArc banner in the top frame.
///
/// When the banner offers a "required only" button, opting out is a single
/// click. Otherwise the settings frame is opened and the rest happens in
/// [`TrustArcFrame`], so the opt-out is intermediate.
#[derive(Debug, Default)]
pub struct TrustArcTop {
    shortcut: Mutex<Option<NodeId>>,
    opt_in_done: AtomicBool,
}

impl TrustArcTop {
    /// Creates the strategy.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CmpStrategy for TrustArcTop {
    fn name(&self) -> &str {
        "TrustArc-top"
    }

    fn prehide_selectors(&self) -> Vec<String> {
        vec![
            ".trustarc-banner-container".to_string(),
            format!(".truste_popframe,.truste_overlay,.truste_box_overlay,{BANNER_CONTAINER}"),
        ]
    }

    fn is_intermediate(&self) -> bool {
        if self.opt_in_done.load(Ordering::Acquire) {
            return false;
        }
        self.shortcut.lock().is_none()
    }

    fn has_self_test(&self) -> bool {
        true
    }

    async fn detect_cmp(&self, cx: &CmpContext) -> bool {
        let found = cx.exists(&format!("{COOKIE_SETTINGS_BUTTON},{BANNER_CONTAINER}"));
        if found {
            *self.shortcut.lock() = cx.query(SHORTCUT_OPT_OUT);
        }
        found
    }

    async fn detect_popup(&self, cx: &CmpContext) -> bool {
        cx.visible(
            &format!("{POPUP_CONTENT},{BANNER_OVERLAY},{BANNER_CONTAINER}"),
            VisibilityCheck::Any,
        )
    }

    async fn opt_out(&self, cx: &CmpContext) -> bool {
        let shortcut = *self.shortcut.lock();
        if let Some(button) = shortcut {
            cx.env().click(button);
            return true;
        }

        cx.hide(
            &format!(".truste_popframe, .truste_overlay, .truste_box_overlay, {BANNER_CONTAINER}"),
            HideMethod::Display,
        );
        cx.click(COOKIE_SETTINGS_BUTTON);

        let env = Arc::clone(cx.dom().env());
        tokio::spawn(async move {
            sleep(SETTINGS_HIDE_DURATION).await;
            env.remove_style(CSS_RULES_STYLE_ID);
        });
        true
    }

    async fn opt_in(&self, cx: &CmpContext) -> bool {
        self.opt_in_done.store(true, Ordering::Release);
        cx.click(SHORTCUT_OPT_IN)
    }

    async fn open_cmp(&self, _cx: &CmpContext) -> bool {
        true
    }

    async fn test(&self, cx: &CmpContext) -> bool {
        cx.wait(500).await;
        cx.eval("EVAL_TRUSTARC_TOP").await
    }
}

// ============================================================================
// TrustArc-frame
// ============================================================================

const CLOSE_BUTTON: &str = "#gwt-debug-close_id";

/// TrustArc preference manager running inside its own frame.
#[derive(Debug, Default)]
pub struct TrustArcFrame;

impl TrustArcFrame {
    /// Creates the strategy.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    async fn navigate_to_settings(cx: &CmpContext) -> bool {
        wait_for(
            || {
                cx.exists(".shp")
                    || cx.visible(".advance", VisibilityCheck::Any)
                    || cx.exists(".switch span:first-child")
            },
            10,
            Duration::from_millis(500),
        )
        .await;
        if cx.exists(".shp") {
            cx.click(".shp");
        }
        cx.wait_for_element(".prefPanel", Duration::from_millis(5000)).await;
        if cx.visible(".advance", VisibilityCheck::Any) {
            cx.click(".advance");
        }
        wait_for(
            || cx.visible(".switch span:first-child", VisibilityCheck::Any),
            5,
            Duration::from_millis(1000),
        )
        .await
    }
}

#[async_trait]
impl CmpStrategy for TrustArcFrame {
    fn name(&self) -> &str {
        "TrustArc-frame"
    }

    fn run_context(&self) -> RunContext {
        RUN_CONTEXT.clone()
    }

    fn has_self_test(&self) -> bool {
        true
    }

    async fn detect_cmp(&self, _cx: &CmpContext) -> bool {
        true
    }

    async fn detect_popup(&self, cx: &CmpContext) -> bool {
        cx.visible("#defaultpreferencemanager", VisibilityCheck::Any) && cx.visible(".mainContent", VisibilityCheck::Any)
    }

    async fn opt_out(&self, cx: &CmpContext) -> bool {
        if cx.eval("EVAL_TRUSTARC_FRAME_TEST").await {
            return true;
        }
        let timeout_ms = if cx.eval("EVAL_TRUSTARC_FRAME_GTM").await { 1500 } else { 3000 };
        let timeout = Duration::from_millis(timeout_ms);

        let env = cx.env();
        wait_for(|| env.ready_state() == ReadyState::Complete, 20, Duration::from_millis(100)).await;
        cx.wait_for_element(".mainContent[aria-hidden=false]", timeout).await;

        if cx.click(".rejectAll") {
            return true;
        }
        if cx.exists(".prefPanel") {
            cx.wait_for_element(r#".prefPanel[style="visibility: visible;"]"#, timeout).await;
        }
        if cx.click("#catDetails0") {
            cx.click(".submit");
            cx.spawn_wait_for_then_click(CLOSE_BUTTON, timeout);
            return true;
        }
        if cx.click(".required") {
            cx.spawn_wait_for_then_click(CLOSE_BUTTON, timeout);
            return true;
        }

        Self::navigate_to_settings(cx).await;
        cx.click_all(".switch span:nth-child(1):not(.active)");
        cx.click(".submit");
        cx.spawn_wait_for_then_click(CLOSE_BUTTON, timeout * 10);
        true
    }

    async fn opt_in(&self, cx: &CmpContext) -> bool {
        if cx.click(".call") {
            return true;
        }
        Self::navigate_to_settings(cx).await;
        cx.click_all(".switch span:nth-child(2)");
        cx.click(".submit");
        cx.spawn_wait_for_then_click(CLOSE_BUTTON, Duration::from_secs(300));
        true
    }

    async fn test(&self, cx: &CmpContext) -> bool {
        cx.wait(500).await;
        cx.eval("EVAL_TRUSTARC_FRAME_TEST").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmps::vendors::tests::context;
    use crate::dom::{DomEnvironment, ElementSpec, MemoryDom};

    #[tokio::test]
    async fn test_top_shortcut_opt_out_is_final() {
        let dom = MemoryDom::new();
        dom.append(None, ElementSpec::new("div").id("truste-consent-track"));
        let required = dom.append(None, ElementSpec::new("button").id("truste-consent-required"));
        let cx = context(&dom);

        let cmp = TrustArcTop::new();
        assert!(cmp.detect_cmp(&cx).await);
        assert!(cmp.detect_popup(&cx).await);
        assert!(!cmp.is_intermediate());
        assert!(cmp.opt_out(&cx).await);
        assert_eq!(dom.click_count(required), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_top_settings_path_is_intermediate() {
        let dom = MemoryDom::new();
        let settings = dom.append(None, ElementSpec::new("a").id("truste-show-consent"));
        let cx = context(&dom);

        let cmp = TrustArcTop::new();
        assert!(cmp.detect_cmp(&cx).await);
        assert!(cmp.is_intermediate());
        assert!(cmp.opt_out(&cx).await);
        assert_eq!(dom.click_count(settings), 1);
        assert!(dom.has_style(CSS_RULES_STYLE_ID));

        sleep(SETTINGS_HIDE_DURATION + Duration::from_millis(10)).await;
        assert!(!dom.has_style(CSS_RULES_STYLE_ID));
    }

    #[tokio::test]
    async fn test_top_opt_in_clears_intermediate() {
        let dom = MemoryDom::new();
        dom.append(None, ElementSpec::new("a").id("truste-show-consent"));
        let cx = context(&dom);
        let cmp = TrustArcTop::new();
        cmp.detect_cmp(&cx).await;
        assert!(cmp.is_intermediate());
        assert!(!cmp.opt_in(&cx).await);
        assert!(!cmp.is_intermediate());
    }

    #[tokio::test]
    async fn test_frame_run_context() {
        let cmp = TrustArcFrame::new();
        let top = MemoryDom::new().with_location("https://consent-pref.trustarc.com/?x=1");
        assert!(!cmp.check_run_context(&context(&top)));

        let frame = MemoryDom::new()
            .as_subframe()
            .with_location("https://consent-pref.trustarc.com/?x=1");
        assert!(cmp.check_run_context(&context(&frame)));

        let other = MemoryDom::new().as_subframe().with_location("https://example.com/");
        assert!(!cmp.check_run_context(&context(&other)));
    }
}
