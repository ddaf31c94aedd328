//! Airbnb's in-house banner.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;

use crate::cmps::{CmpContext, CmpStrategy};
use crate::dom::wait::wait_for;
use crate::dom::{DEFAULT_WAIT_TIMEOUT, VisibilityCheck};
use crate::rules::RunContext;

static RUN_CONTEXT: LazyLock<RunContext> =
    LazyLock::new(|| RunContext::main_only().with_url_pattern(r"^https://(www\.)?airbnb\.[^/]+/"));

const BANNER: &str = "div[data-testid=main-cookies-banner-container]";
const CHECKED_SWITCH: &str = "[data-testid=modal-container] button[aria-checked=true]:not([disabled])";

/// Upper bound on switch clicks, for switches that never flip.
const MAX_SWITCH_CLICKS: usize = 100;

/// Airbnb.
#[derive(Debug, Default)]
pub struct Airbnb;

impl Airbnb {
    /// Creates the strategy.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CmpStrategy for Airbnb {
    fn name(&self) -> &str {
        "airbnb"
    }

    fn run_context(&self) -> RunContext {
        RUN_CONTEXT.clone()
    }

    fn prehide_selectors(&self) -> Vec<String> {
        vec![
            BANNER.to_string(),
            r#"div:has(> div:first-child):has(> div:last-child):has(> section [data-testid="strictly-necessary-cookies"])"#
                .to_string(),
        ]
    }

    fn has_self_test(&self) -> bool {
        true
    }

    async fn detect_cmp(&self, cx: &CmpContext) -> bool {
        cx.exists(BANNER)
    }

    async fn detect_popup(&self, cx: &CmpContext) -> bool {
        cx.visible(BANNER, VisibilityCheck::Any)
    }

    async fn opt_out(&self, cx: &CmpContext) -> bool {
        cx.wait_for_then_click(&format!("{BANNER} button._snbhip0"), DEFAULT_WAIT_TIMEOUT)
            .await;
        for _ in 0..MAX_SWITCH_CLICKS {
            let Some(switch) = cx.query(CHECKED_SWITCH) else {
                break;
            };
            cx.env().click(switch);
        }
        cx.wait_for_then_click("button[data-testid=save-btn]", DEFAULT_WAIT_TIMEOUT)
            .await
    }

    async fn opt_in(&self, cx: &CmpContext) -> bool {
        cx.wait_for_then_click(&format!("{BANNER} button._148dgdpk"), DEFAULT_WAIT_TIMEOUT)
            .await
    }

    async fn test(&self, cx: &CmpContext) -> bool {
        let env = cx.env();
        wait_for(
            || env.cookie().contains("OptanonAlertBoxClosed"),
            20,
            Duration::from_millis(200),
        )
        .await
    }
}
