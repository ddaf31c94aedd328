//! Tumblr, whose dialog lives in a same-origin iframe.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;

use crate::cmps::{CmpContext, CmpStrategy};
use crate::dom::VisibilityCheck;
use crate::dom::wait::wait_for;
use crate::identifiers::NodeId;
use crate::rules::RunContext;

static RUN_CONTEXT: LazyLock<RunContext> =
    LazyLock::new(|| RunContext::main_only().with_url_pattern(r"^https://(www\.)?tumblr\.com/"));

const CONTAINER: &str = "#cmp-app-container";

/// Tumblr consent app.
#[derive(Debug, Default)]
pub struct Tumblr;

impl Tumblr {
    /// Creates the strategy.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// First match of `selector` inside the app iframe's document.
    fn query_frame(cx: &CmpContext, selector: &str) -> Option<NodeId> {
        let iframe = cx.query(&format!("{CONTAINER} iframe"))?;
        let document = cx.env().content_document(iframe)?;
        cx.query_in(Some(document), selector)
    }

    fn click_frame_button(cx: &CmpContext, selector: &str) -> bool {
        match Self::query_frame(cx, selector) {
            Some(button) => {
                cx.env().click(button);
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl CmpStrategy for Tumblr {
    fn name(&self) -> &str {
        "tumblr-com"
    }

    fn run_context(&self) -> RunContext {
        RUN_CONTEXT.clone()
    }

    fn prehide_selectors(&self) -> Vec<String> {
        vec![CONTAINER.to_string()]
    }

    fn has_self_test(&self) -> bool {
        false
    }

    async fn detect_cmp(&self, cx: &CmpContext) -> bool {
        cx.exists(CONTAINER)
    }

    async fn detect_popup(&self, cx: &CmpContext) -> bool {
        cx.visible(CONTAINER, VisibilityCheck::Any)
    }

    async fn opt_out(&self, cx: &CmpContext) -> bool {
        const SECONDARY: &str = ".cmp-components-button.is-secondary";
        if !Self::click_frame_button(cx, SECONDARY) {
            return false;
        }
        wait_for(
            || Self::query_frame(cx, ".cmp__dialog input").is_some(),
            5,
            Duration::from_millis(500),
        )
        .await;
        Self::click_frame_button(cx, SECONDARY)
    }

    async fn opt_in(&self, cx: &CmpContext) -> bool {
        Self::click_frame_button(cx, ".cmp-components-button.is-primary")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmps::vendors::tests::context;
    use crate::dom::{ElementSpec, MemoryDom};

    #[tokio::test(start_paused = true)]
    async fn test_opt_out_through_frame() {
        let dom = MemoryDom::new().with_location("https://www.tumblr.com/explore");
        let container = dom.append(None, ElementSpec::new("div").id("cmp-app-container"));
        let iframe = dom.append(Some(container), ElementSpec::new("iframe"));
        let document = dom.attach_frame_document(iframe);
        let manage = dom.append(
            Some(document),
            ElementSpec::new("button")
                .class("cmp-components-button")
                .class("is-secondary"),
        );
        dom.on_click(manage, move |dom| {
            let dialog = dom.append(Some(document), ElementSpec::new("div").class("cmp__dialog"));
            dom.append(Some(dialog), ElementSpec::new("input"));
        });
        let cx = context(&dom);

        let cmp = Tumblr::new();
        assert!(cmp.check_run_context(&cx));
        assert!(cmp.detect_cmp(&cx).await);
        assert!(cmp.opt_out(&cx).await);
        assert_eq!(dom.click_count(manage), 2);
    }

    #[tokio::test]
    async fn test_missing_frame_document() {
        let dom = MemoryDom::new().with_location("https://tumblr.com/");
        let container = dom.append(None, ElementSpec::new("div").id("cmp-app-container"));
        dom.append(Some(container), ElementSpec::new("iframe"));
        let cx = context(&dom);
        assert!(!Tumblr::new().opt_out(&cx).await);
        assert!(!Tumblr::new().opt_in(&cx).await);
    }
}
