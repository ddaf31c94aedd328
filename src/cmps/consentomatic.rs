//! Strategy backed by a consent-o-matic config.

use async_trait::async_trait;
use rustc_hash::FxHashMap;
use tracing::warn;

use crate::consentomatic::{Action, ConsentOMaticConfig, Executor, matches};

use super::base::{CmpContext, CmpStrategy};

const HIDE_CMP: &str = "HIDE_CMP";
const OPEN_OPTIONS: &str = "OPEN_OPTIONS";
const DO_CONSENT: &str = "DO_CONSENT";
const SAVE_CONSENT: &str = "SAVE_CONSENT";

/// Consent types accepted by an opt-in.
const OPT_IN_TYPES: &[&str] = &["D", "A", "B", "E", "F", "X"];

/// Runs the named methods of a consent-o-matic config.
///
/// Runs in every frame and URL. Missing methods succeed vacuously.
#[derive(Debug, Clone)]
pub struct ConsentOMaticCmp {
    name: String,
    config: ConsentOMaticConfig,
    methods: FxHashMap<String, Action>,
}

impl ConsentOMaticCmp {
    /// Builds the strategy `com_<name>`.
    #[must_use]
    pub fn new(name: &str, config: ConsentOMaticConfig) -> Self {
        let methods = config
            .methods
            .iter()
            .filter_map(|m| m.action.clone().map(|action| (m.name.clone(), action)))
            .collect();
        Self {
            name: format!("com_{name}"),
            config,
            methods,
        }
    }

    /// Whether the config defines `method` with a body.
    #[must_use]
    pub fn has_method(&self, method: &str) -> bool {
        self.methods.contains_key(method)
    }

    async fn execute_method(&self, cx: &CmpContext, method: &str, consent_types: &[&str]) -> bool {
        let Some(action) = self.methods.get(method) else {
            return true;
        };
        let executor = Executor::new(&self.name, cx.dom(), cx.bridge());
        match executor.execute(action, consent_types, None).await {
            Ok(()) => true,
            Err(e) => {
                if cx.logs().errors {
                    warn!(cmp = %self.name, method, error = %e, "Method failed");
                }
                false
            }
        }
    }

    async fn run_consent_flow(&self, cx: &CmpContext, consent_types: &[&str]) -> bool {
        let mut ok = self.execute_method(cx, HIDE_CMP, &[]).await;
        ok &= self.execute_method(cx, OPEN_OPTIONS, &[]).await;
        ok &= self.execute_method(cx, HIDE_CMP, &[]).await;
        ok &= self.execute_method(cx, DO_CONSENT, consent_types).await;
        ok &= self.execute_method(cx, SAVE_CONSENT, &[]).await;
        ok
    }
}

#[async_trait]
impl CmpStrategy for ConsentOMaticCmp {
    fn name(&self) -> &str {
        &self.name
    }

    fn has_self_test(&self) -> bool {
        false
    }

    fn check_run_context(&self, _cx: &CmpContext) -> bool {
        true
    }

    async fn detect_cmp(&self, cx: &CmpContext) -> bool {
        self.config
            .detectors
            .iter()
            .any(|d| matches(cx.env(), &d.present_matcher, None))
    }

    async fn detect_popup(&self, cx: &CmpContext) -> bool {
        self.config
            .detectors
            .iter()
            .any(|d| matches(cx.env(), &d.showing_matcher, None))
    }

    async fn opt_out(&self, cx: &CmpContext) -> bool {
        self.run_consent_flow(cx, &[]).await
    }

    async fn opt_in(&self, cx: &CmpContext) -> bool {
        self.run_consent_flow(cx, OPT_IN_TYPES).await
    }

    async fn open_cmp(&self, cx: &CmpContext) -> bool {
        let hidden = self.execute_method(cx, HIDE_CMP, &[]).await;
        hidden & self.execute_method(cx, OPEN_OPTIONS, &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::bridge::{DEFAULT_EVAL_TIMEOUT, EvalBridge};
    use crate::dom::{DomActions, ElementSpec, MemoryDom};
    use crate::engine::LogsConfig;
    use crate::protocol::Messenger;

    const CONFIG: &str = r##"{
        "detectors": [{
            "presentMatcher": {"type": "css", "target": {"selector": "#cmp"}},
            "showingMatcher": {"type": "css", "target": {"selector": "#cmp", "displayFilter": true}}
        }],
        "methods": [
            {"name": "HIDE_CMP", "action": {"type": "hide", "target": {"selector": "#cmp"}}},
            {"name": "OPEN_OPTIONS", "action": {"type": "click", "target": {"selector": "#more"}}},
            {"name": "DO_CONSENT", "action": {"type": "consent", "consents": [{
                "type": "A",
                "matcher": {"type": "checkbox", "target": {"selector": "#ads"}},
                "toggleAction": {"type": "click", "target": {"selector": "#ads"}}
            }]}},
            {"name": "SAVE_CONSENT", "action": {"type": "click", "target": {"selector": "#save"}}},
            {"name": "UNUSED"}
        ]
    }"##;

    fn context(dom: &MemoryDom) -> CmpContext {
        let (messenger, _rx) = Messenger::channel();
        CmpContext::new(
            DomActions::new(Arc::new(dom.clone()), LogsConfig::default()),
            EvalBridge::new(messenger, DEFAULT_EVAL_TIMEOUT),
        )
    }

    fn cmp() -> ConsentOMaticCmp {
        ConsentOMaticCmp::new("example", serde_json::from_str(CONFIG).expect("config"))
    }

    #[tokio::test]
    async fn test_name_and_flags() {
        let dom = MemoryDom::new().as_subframe();
        let cx = context(&dom);
        let cmp = cmp();
        assert_eq!(cmp.name(), "com_example");
        assert!(cmp.check_run_context(&cx));
        assert!(!cmp.has_self_test());
        assert!(!cmp.has_method("UNUSED"));
        assert!(cmp.test(&cx).await);
    }

    #[tokio::test]
    async fn test_detection_and_opt_out() {
        let dom = MemoryDom::new();
        let root = dom.append(None, ElementSpec::new("div").id("cmp"));
        let more = dom.append(Some(root), ElementSpec::new("button").id("more"));
        let ads = dom.append(Some(root), ElementSpec::new("input").id("ads").attr("type", "checkbox").checked());
        let save = dom.append(Some(root), ElementSpec::new("button").id("save"));
        let cx = context(&dom);
        let cmp = cmp();

        assert!(cmp.detect_cmp(&cx).await);
        assert!(cmp.detect_popup(&cx).await);
        assert!(cmp.opt_out(&cx).await);
        assert!(dom.has_class(root, crate::dom::style::HIDDEN_CLASS));
        assert_eq!(dom.click_count(more), 1);
        assert_eq!(dom.click_count(ads), 1);
        assert_eq!(dom.click_count(save), 1);
    }

    #[tokio::test]
    async fn test_opt_in_keeps_accepted_category() {
        let dom = MemoryDom::new();
        let root = dom.append(None, ElementSpec::new("div").id("cmp"));
        let ads = dom.append(Some(root), ElementSpec::new("input").id("ads").attr("type", "checkbox").checked());
        let cx = context(&dom);

        assert!(cmp().opt_in(&cx).await);
        assert_eq!(dom.click_count(ads), 0);
    }

    #[tokio::test]
    async fn test_empty_config_succeeds_vacuously() {
        let dom = MemoryDom::new();
        let cx = context(&dom);
        let cmp = ConsentOMaticCmp::new("none", ConsentOMaticConfig::default());
        assert!(!cmp.detect_cmp(&cx).await);
        assert!(cmp.opt_out(&cx).await);
        assert!(cmp.open_cmp(&cx).await);
    }

    #[tokio::test]
    async fn test_unknown_action_fails_flow() {
        let dom = MemoryDom::new();
        let cx = context(&dom);
        let config: ConsentOMaticConfig = serde_json::from_str(
            r#"{"detectors": [], "methods": [{"name": "SAVE_CONSENT", "action": {"type": "teleport"}}]}"#,
        )
        .expect("config");
        let cmp = ConsentOMaticCmp::new("broken", config);
        assert!(!cmp.opt_out(&cx).await);
    }
}
