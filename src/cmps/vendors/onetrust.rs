//! OneTrust banner and preference center.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;

use crate::cmps::{CmpContext, CmpStrategy};
use crate::dom::VisibilityCheck;
use crate::dom::wait::wait_for_async;
use crate::rules::RunContext;

/// Top frame, except sites running their own OneTrust integration.
static RUN_CONTEXT: LazyLock<RunContext> =
    LazyLock::new(|| RunContext::main_only().with_url_pattern(r"^(?!.*https://www\.nba\.com/)"));

const REJECT_BUTTONS: &str = "#onetrust-reject-all-handler,.ot-pc-refuse-all-handler,.js-reject-cookies";

/// OneTrust.
#[derive(Debug, Default)]
pub struct Onetrust;

impl Onetrust {
    /// Creates the strategy.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CmpStrategy for Onetrust {
    fn name(&self) -> &str {
        "Onetrust"
    }

    fn prehide_selectors(&self) -> Vec<String> {
        vec!["#onetrust-banner-sdk,#onetrust-consent-sdk,.onetrust-pc-dark-filter,.js-consent-banner".to_string()]
    }

    fn has_self_test(&self) -> bool {
        true
    }

    fn run_context(&self) -> RunContext {
        RUN_CONTEXT.clone()
    }

    async fn detect_cmp(&self, cx: &CmpContext) -> bool {
        cx.exists("#onetrust-banner-sdk,#onetrust-pc-sdk")
    }

    async fn detect_popup(&self, cx: &CmpContext) -> bool {
        cx.visible("#onetrust-banner-sdk,#onetrust-pc-sdk", VisibilityCheck::Any)
    }

    async fn opt_out(&self, cx: &CmpContext) -> bool {
        if cx.visible(REJECT_BUTTONS, VisibilityCheck::Any) {
            return cx.click(REJECT_BUTTONS);
        }
        if cx.exists("#onetrust-pc-btn-handler") {
            cx.click("#onetrust-pc-btn-handler");
        } else {
            cx.click(".ot-sdk-show-settings,button.js-cookie-settings");
        }

        let short = Duration::from_millis(2000);
        cx.wait_for_element("#onetrust-consent-sdk", short).await;
        cx.wait(1000).await;
        cx.click_all("#onetrust-consent-sdk input.category-switch-handler:checked,.js-editor-toggle-state:checked");
        cx.wait(1000).await;
        cx.wait_for_element(".save-preference-btn-handler,.js-consent-save", short).await;
        cx.click(".save-preference-btn-handler,.js-consent-save");
        cx.wait_for_visible("#onetrust-banner-sdk", Duration::from_millis(5000), VisibilityCheck::None)
            .await;
        true
    }

    async fn opt_in(&self, cx: &CmpContext) -> bool {
        cx.click("#onetrust-accept-btn-handler,#accept-recommended-btn-handler,.js-accept-cookies")
    }

    async fn test(&self, cx: &CmpContext) -> bool {
        wait_for_async(|| cx.eval("EVAL_ONETRUST_1"), 10, Duration::from_millis(500)).await
    }
}
