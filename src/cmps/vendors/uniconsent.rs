//! UniConsent.

use std::time::Duration;

use async_trait::async_trait;

use crate::cmps::{CmpContext, CmpStrategy};
use crate::dom::{DEFAULT_WAIT_TIMEOUT, VisibilityCheck};

const POPUP: &str = ".unic .unic-box,.unic .unic-bar,.unic .unic-modal";
const MANAGE_LABELS: &[&str] = &["Manage Options", "Optionen verwalten"];
const SAVE_LABELS: &[&str] = &["Confirm Choices", "Save Choices", "Auswahl speichern"];

/// UniConsent box, bar or modal.
#[derive(Debug, Default)]
pub struct Uniconsent;

impl Uniconsent {
    /// Creates the strategy.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CmpStrategy for Uniconsent {
    fn name(&self) -> &str {
        "Uniconsent"
    }

    fn prehide_selectors(&self) -> Vec<String> {
        vec![".unic".to_string(), ".modal:has(.unic)".to_string()]
    }

    fn has_self_test(&self) -> bool {
        true
    }

    async fn detect_cmp(&self, cx: &CmpContext) -> bool {
        cx.exists(POPUP)
    }

    async fn detect_popup(&self, cx: &CmpContext) -> bool {
        cx.visible(POPUP, VisibilityCheck::Any)
    }

    async fn opt_out(&self, cx: &CmpContext) -> bool {
        let short = Duration::from_millis(1000);
        let env = cx.env();
        cx.wait_for_element(".unic button", short).await;
        for button in cx.query_all(".unic button") {
            let text = env.text_content(button);
            if MANAGE_LABELS.iter().any(|label| text.contains(label)) {
                env.click(button);
            }
        }

        if !cx.wait_for_element(".unic input[type=checkbox]", short).await {
            return false;
        }
        cx.wait_for_element(".unic button", short).await;
        for checkbox in cx.query_all(".unic input[type=checkbox]") {
            if env.is_checked(checkbox) {
                env.click(checkbox);
            }
        }
        for button in cx.query_all(".unic button") {
            let text = env.text_content(button);
            if SAVE_LABELS.iter().any(|label| text.contains(label)) {
                env.click(button);
                cx.wait(500).await;
                return true;
            }
        }
        false
    }

    async fn opt_in(&self, cx: &CmpContext) -> bool {
        cx.wait_for_then_click(".unic #unic-agree", DEFAULT_WAIT_TIMEOUT).await
    }

    async fn test(&self, cx: &CmpContext) -> bool {
        cx.wait(1000).await;
        !cx.exists(".unic .unic-box,.unic .unic-bar")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmps::vendors::tests::context;
    use crate::dom::{ElementSpec, MemoryDom};

    #[tokio::test(start_paused = true)]
    async fn test_manage_then_save() {
        let dom = MemoryDom::new();
        let unic = dom.append(None, ElementSpec::new("div").class("unic"));
        let bar = dom.append(Some(unic), ElementSpec::new("div").class("unic-bar"));
        let manage = dom.append(Some(bar), ElementSpec::new("button").text("Manage Options"));
        let purpose = dom.append(Some(bar), ElementSpec::new("input").attr("type", "checkbox").checked());
        let save = dom.append(Some(bar), ElementSpec::new("button").text("Save Choices"));
        let cx = context(&dom);

        let cmp = Uniconsent::new();
        assert!(cmp.detect_cmp(&cx).await);
        assert!(cmp.opt_out(&cx).await);
        assert_eq!(dom.click_count(manage), 1);
        assert_eq!(dom.click_count(purpose), 1);
        assert_eq!(dom.click_count(save), 1);

        assert!(!cmp.test(&cx).await);
        dom.remove(unic);
        assert!(cmp.test(&cx).await);
    }
}
