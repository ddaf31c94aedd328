//! TikTok's banner, rendered inside a shadow root.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use tracing::{trace, warn};

use crate::cmps::{CmpContext, CmpStrategy};
use crate::identifiers::NodeId;
use crate::rules::RunContext;

static CONSENT_COOKIE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"cookie-consent=([^;]+)").ok());

static RUN_CONTEXT: LazyLock<RunContext> =
    LazyLock::new(|| RunContext::main_only().with_url_pattern("tiktok"));

/// `tiktok-cookie-banner` custom element.
#[derive(Debug, Default)]
pub struct Tiktok;

impl Tiktok {
    /// Creates the strategy.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn shadow_root(cx: &CmpContext) -> Option<NodeId> {
        let container = cx.query("tiktok-cookie-banner")?;
        cx.env().shadow_root(container)
    }

    fn click_banner_button(cx: &CmpContext, selector: &str, missing: &str) -> bool {
        let button = Self::shadow_root(cx).and_then(|root| cx.query_in(Some(root), selector));
        match button {
            Some(button) => {
                if cx.logs().rulesteps {
                    trace!(%button, "[clicking]");
                }
                cx.env().click(button);
                true
            }
            None => {
                if cx.logs().errors {
                    warn!("{missing}");
                }
                false
            }
        }
    }

    /// Whether the stored consent cookie turns every category off.
    fn cookie_declines_all(cookie: &str) -> bool {
        let Some(pattern) = CONSENT_COOKIE.as_ref() else {
            return false;
        };
        let Some(raw) = pattern.captures(cookie).and_then(|c| c.get(1)) else {
            return false;
        };
        let Ok(decoded) = urlencoding::decode(raw.as_str()) else {
            return false;
        };
        match serde_json::from_str::<Value>(&decoded) {
            Ok(Value::Object(values)) => values.values().all(|v| v.as_bool() != Some(true)),
            Ok(Value::Array(values)) => values.iter().all(|v| v.as_bool() != Some(true)),
            Ok(Value::Null) | Err(_) => false,
            Ok(_) => true,
        }
    }
}

#[async_trait]
impl CmpStrategy for Tiktok {
    fn name(&self) -> &str {
        "tiktok.com"
    }

    fn run_context(&self) -> RunContext {
        RUN_CONTEXT.clone()
    }

    fn has_self_test(&self) -> bool {
        true
    }

    async fn detect_cmp(&self, cx: &CmpContext) -> bool {
        cx.exists("tiktok-cookie-banner")
    }

    async fn detect_popup(&self, cx: &CmpContext) -> bool {
        Self::shadow_root(cx)
            .and_then(|root| cx.query_in(Some(root), ".tiktok-cookie-banner"))
            .is_some_and(|banner| cx.dom().is_element_visible(banner))
    }

    async fn opt_out(&self, cx: &CmpContext) -> bool {
        Self::click_banner_button(cx, ".button-wrapper button:first-child", "no decline button found")
    }

    async fn opt_in(&self, cx: &CmpContext) -> bool {
        Self::click_banner_button(cx, ".button-wrapper button:last-child", "no accept button found")
    }

    async fn test(&self, cx: &CmpContext) -> bool {
        Self::cookie_declines_all(&cx.env().cookie())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmps::vendors::tests::context;
    use crate::dom::{ElementSpec, MemoryDom};

    #[test]
    fn test_cookie_check() {
        let declined = urlencoding::encode(r#"{"analytics":false,"ads":false,"version":"2"}"#);
        assert!(Tiktok::cookie_declines_all(&format!("a=1; cookie-consent={declined}; b=2")));

        let accepted = urlencoding::encode(r#"{"analytics":true}"#);
        assert!(!Tiktok::cookie_declines_all(&format!("cookie-consent={accepted}")));

        assert!(!Tiktok::cookie_declines_all("other=1"));
        assert!(!Tiktok::cookie_declines_all("cookie-consent=%7Bnot-json"));
    }

    #[tokio::test]
    async fn test_shadow_buttons() {
        let dom = MemoryDom::new().with_location("https://www.tiktok.com/");
        let host = dom.append(None, ElementSpec::new("tiktok-cookie-banner"));
        let root = dom.attach_shadow(host);
        let banner = dom.append(Some(root), ElementSpec::new("div").class("tiktok-cookie-banner"));
        let wrapper = dom.append(Some(banner), ElementSpec::new("div").class("button-wrapper"));
        let decline = dom.append(Some(wrapper), ElementSpec::new("button").text("Decline"));
        let accept = dom.append(Some(wrapper), ElementSpec::new("button").text("Accept"));
        let cx = context(&dom);

        let cmp = Tiktok::new();
        assert!(cmp.check_run_context(&cx));
        assert!(cmp.detect_cmp(&cx).await);
        assert!(cmp.detect_popup(&cx).await);
        assert!(cmp.opt_out(&cx).await);
        assert_eq!((dom.click_count(decline), dom.click_count(accept)), (1, 0));
        assert!(cmp.opt_in(&cx).await);
        assert_eq!(dom.click_count(accept), 1);
    }

    #[tokio::test]
    async fn test_missing_shadow_root() {
        let dom = MemoryDom::new().with_location("https://www.tiktok.com/");
        dom.append(None, ElementSpec::new("tiktok-cookie-banner"));
        let cx = context(&dom);
        assert!(!Tiktok::new().detect_popup(&cx).await);
        assert!(!Tiktok::new().opt_out(&cx).await);
    }
}
