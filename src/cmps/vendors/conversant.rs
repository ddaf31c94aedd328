//! Conversant CMP.

use std::time::Duration;

use async_trait::async_trait;

use crate::cmps::{CmpContext, CmpStrategy};
use crate::dom::wait::wait_for;
use crate::dom::{DEFAULT_WAIT_TIMEOUT, VisibilityCheck};

const SECONDARY_BUTTON: &str = ".cmp-main-button:not(.cmp-main-button--primary)";
const ACTIVE_CONTENT: &str = ".cmp-accordion-item-content.cmp-active";

/// Conversant receptacle.
#[derive(Debug, Default)]
pub struct Conversant;

impl Conversant {
    /// Creates the strategy.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CmpStrategy for Conversant {
    fn name(&self) -> &str {
        "Conversant"
    }

    fn prehide_selectors(&self) -> Vec<String> {
        vec![".cmp-root".to_string()]
    }

    fn has_self_test(&self) -> bool {
        true
    }

    async fn detect_cmp(&self, cx: &CmpContext) -> bool {
        cx.exists(".cmp-root .cmp-receptacle")
    }

    async fn detect_popup(&self, cx: &CmpContext) -> bool {
        cx.visible(".cmp-root .cmp-receptacle", VisibilityCheck::Any)
    }

    async fn opt_out(&self, cx: &CmpContext) -> bool {
        if !cx.wait_for_then_click(SECONDARY_BUTTON, DEFAULT_WAIT_TIMEOUT).await {
            return false;
        }
        if !cx.wait_for_element(".cmp-view-tab-tabs", DEFAULT_WAIT_TIMEOUT).await {
            return false;
        }
        cx.wait_for_then_click(".cmp-view-tab-tabs > :first-child", DEFAULT_WAIT_TIMEOUT)
            .await;
        cx.wait_for_then_click(".cmp-view-tab-tabs > .cmp-view-tab--active:first-child", DEFAULT_WAIT_TIMEOUT)
            .await;

        let env = cx.env();
        for item in cx.query_all(".cmp-accordion-item") {
            let Some(title) = cx.query_in(Some(item), ".cmp-accordion-item-title") else {
                continue;
            };
            env.click(title);
            wait_for(
                || cx.query_in(Some(item), ACTIVE_CONTENT).is_some(),
                10,
                Duration::from_millis(50),
            )
            .await;
            let Some(content) = cx.query_in(Some(item), ACTIVE_CONTENT) else {
                continue;
            };
            let toggles = cx
                .query_all_in(
                    Some(content),
                    ".cmp-toggle-actions .cmp-toggle-deny:not(.cmp-toggle-deny--active)",
                )
                .into_iter()
                .chain(cx.query_all_in(
                    Some(content),
                    ".cmp-toggle-actions .cmp-toggle-checkbox:not(.cmp-toggle-checkbox--active)",
                ));
            for toggle in toggles {
                env.click(toggle);
            }
        }
        cx.click(SECONDARY_BUTTON);
        true
    }

    async fn opt_in(&self, cx: &CmpContext) -> bool {
        cx.wait_for_then_click(".cmp-main-button.cmp-main-button--primary", DEFAULT_WAIT_TIMEOUT)
            .await
    }

    async fn test(&self, cx: &CmpContext) -> bool {
        cx.env().cookie().contains("cmp-data=0")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmps::vendors::tests::context;
    use crate::dom::{ElementSpec, MemoryDom};

    #[tokio::test(start_paused = true)]
    async fn test_denies_every_purpose() {
        let dom = MemoryDom::new();
        let root = dom.append(None, ElementSpec::new("div").class("cmp-root"));
        dom.append(Some(root), ElementSpec::new("div").class("cmp-receptacle"));
        let settings = dom.append(Some(root), ElementSpec::new("button").class("cmp-main-button"));
        let tabs = dom.append(Some(root), ElementSpec::new("div").class("cmp-view-tab-tabs"));
        dom.append(Some(tabs), ElementSpec::new("div").class("cmp-view-tab--active"));
        let item = dom.append(Some(root), ElementSpec::new("div").class("cmp-accordion-item"));
        dom.append(Some(item), ElementSpec::new("div").class("cmp-accordion-item-title"));
        let content = dom.append(
            Some(item),
            ElementSpec::new("div")
                .class("cmp-accordion-item-content")
                .class("cmp-active"),
        );
        let actions = dom.append(Some(content), ElementSpec::new("div").class("cmp-toggle-actions"));
        let deny = dom.append(Some(actions), ElementSpec::new("span").class("cmp-toggle-deny"));
        let cx = context(&dom);

        let cmp = Conversant::new();
        assert!(cmp.detect_cmp(&cx).await);
        assert!(cmp.opt_out(&cx).await);
        assert_eq!(dom.click_count(settings), 2);
        assert_eq!(dom.click_count(deny), 1);

        assert!(!cmp.test(&cx).await);
        dom.set_cookie("cmp-data=0; other=1");
        assert!(cmp.test(&cx).await);
    }
}
