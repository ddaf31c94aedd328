//! Cybot Cookiebot, driven mostly through its page-side API.

use async_trait::async_trait;

use crate::cmps::{CmpContext, CmpStrategy};

/// Cookiebot dialog.
#[derive(Debug, Default)]
pub struct Cookiebot;

impl Cookiebot {
    /// Creates the strategy.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CmpStrategy for Cookiebot {
    fn name(&self) -> &str {
        "Cybotcookiebot"
    }

    fn prehide_selectors(&self) -> Vec<String> {
        vec![
            "#CybotCookiebotDialog,#CybotCookiebotDialogBodyUnderlay,#dtcookie-container,#cookiebanner,\
             #cb-cookieoverlay,.modal--cookie-banner,#cookiebanner_outer,#CookieBanner"
                .to_string(),
        ]
    }

    fn has_self_test(&self) -> bool {
        true
    }

    async fn detect_cmp(&self, cx: &CmpContext) -> bool {
        cx.eval("EVAL_COOKIEBOT_1").await
    }

    async fn detect_popup(&self, cx: &CmpContext) -> bool {
        cx.eval("EVAL_COOKIEBOT_2").await
    }

    async fn opt_out(&self, cx: &CmpContext) -> bool {
        cx.wait(500).await;
        let declined = cx.eval("EVAL_COOKIEBOT_3").await;
        cx.wait(500).await;
        declined && cx.eval("EVAL_COOKIEBOT_4").await
    }

    async fn opt_in(&self, cx: &CmpContext) -> bool {
        if cx.exists("#dtcookie-container") {
            return cx.click(".h-dtcookie-accept");
        }
        cx.click_all(".CybotCookiebotDialogBodyLevelButton:not(:checked):enabled");
        cx.click("#CybotCookiebotDialogBodyLevelButtonAccept");
        cx.click("#CybotCookiebotDialogBodyButtonAccept");
        true
    }

    async fn test(&self, cx: &CmpContext) -> bool {
        cx.wait(500).await;
        cx.eval("EVAL_COOKIEBOT_5").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmps::vendors::tests::context;
    use crate::dom::{ElementSpec, MemoryDom};

    #[tokio::test]
    async fn test_opt_in_checks_every_level() {
        let dom = MemoryDom::new();
        let level = |checked: bool| {
            let spec = ElementSpec::new("input")
                .class("CybotCookiebotDialogBodyLevelButton")
                .attr("type", "checkbox");
            dom.append(None, if checked { spec.checked() } else { spec })
        };
        let unchecked = level(false);
        let checked = level(true);
        let accept = dom.append(None, ElementSpec::new("a").id("CybotCookiebotDialogBodyButtonAccept"));
        let cx = context(&dom);

        assert!(Cookiebot::new().opt_in(&cx).await);
        assert_eq!(dom.click_count(unchecked), 1);
        assert_eq!(dom.click_count(checked), 0);
        assert_eq!(dom.click_count(accept), 1);
    }

    #[tokio::test]
    async fn test_detection_without_host_is_false() {
        let dom = MemoryDom::new();
        let cx = context(&dom);
        assert!(!Cookiebot::new().detect_cmp(&cx).await);
    }
}
