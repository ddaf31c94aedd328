//! Consent-o-matic action executor.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt};
use tokio::time::sleep;
use tracing::{debug, trace};

use crate::bridge::EvalBridge;
use crate::dom::style::HIDDEN_CLASS;
use crate::dom::{DomActions, DomEnvironment, MouseEvent, MouseEventKind};
use crate::error::{Error, Result};
use crate::identifiers::NodeId;

use super::config::{Action, ConsentConfig, FindSpec};
use super::tools::{find, find_all, matches};

// ============================================================================
// Constants
// ============================================================================

const WAITCSS_RETRIES: u32 = 10;
const WAITCSS_INTERVAL_MS: u64 = 250;
const EVAL_ASYNC_DELAY_MS: u64 = 250;
const SLIDE_STEP: Duration = Duration::from_millis(10);
const CONSENT_CHECK_RESULT: &str = "window.__consentCheckResult";

// ============================================================================
// Executor
// ============================================================================

/// Runs action trees of one consent-o-matic CMP.
#[derive(Debug, Clone, Copy)]
pub struct Executor<'a> {
    name: &'a str,
    dom: &'a DomActions,
    bridge: &'a EvalBridge,
}

impl<'a> Executor<'a> {
    /// Creates an executor for the CMP `name`.
    #[must_use]
    pub fn new(name: &'a str, dom: &'a DomActions, bridge: &'a EvalBridge) -> Self {
        Self { name, dom, bridge }
    }

    fn env(&self) -> &dyn DomEnvironment {
        self.dom.env().as_ref()
    }

    /// Executes `action` with the requested consent types below `scope`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRule`] for an unknown action type.
    pub fn execute<'s>(
        &'s self,
        action: &'s Action,
        consent_types: &'s [&'s str],
        scope: Option<NodeId>,
    ) -> BoxFuture<'s, Result<()>> {
        async move {
            if self.dom.logs().rulesteps {
                trace!(cmp = self.name, action = action.kind(), "Executing action");
            }
            match action {
                Action::Click { find: spec } => {
                    if let Some(target) = find(self.env(), spec, scope).target {
                        self.env().click(target);
                    }
                    tokio::task::yield_now().await;
                }
                Action::List { actions } => {
                    for action in actions {
                        self.execute(action, consent_types, scope).await?;
                    }
                }
                Action::Consent { consents } => {
                    for consent in consents {
                        self.apply_consent(consent, consent_types, scope).await?;
                    }
                }
                Action::Ifcss {
                    find: spec,
                    true_action,
                    false_action,
                } => {
                    let branch = if find(self.env(), spec, scope).target.is_none() {
                        true_action
                    } else {
                        false_action
                    };
                    if let Some(branch) = branch {
                        self.execute(branch, consent_types, scope).await?;
                    }
                }
                Action::Waitcss {
                    find: spec,
                    retries,
                    wait_time,
                    negated,
                } => {
                    let retries = retries.filter(|r| *r > 0).unwrap_or(WAITCSS_RETRIES);
                    let interval = Duration::from_millis(wait_time.filter(|w| *w > 0).unwrap_or(WAITCSS_INTERVAL_MS));
                    self.wait_css(spec, scope, retries, interval, *negated).await;
                }
                Action::Foreach { find: spec, action } => {
                    for result in find_all(self.env(), spec, scope) {
                        if let Some(target) = result.target {
                            self.execute(action, consent_types, Some(target)).await?;
                        }
                    }
                }
                Action::Hide { find: spec } => {
                    if let Some(target) = find(self.env(), spec, scope).target {
                        self.env().add_class(target, HIDDEN_CLASS);
                    }
                }
                Action::Slide {
                    find: spec,
                    drag_target,
                    axis,
                } => self.slide(spec, drag_target, axis, scope).await,
                Action::Close => self.env().close_window(),
                Action::Wait { wait_time } => sleep(Duration::from_millis(*wait_time)).await,
                Action::Eval { code, is_async, timeout } => {
                    self.eval(code, *is_async, *timeout).await;
                }
                Action::Unknown => {
                    return Err(Error::invalid_rule(self.name, "Unknown action type"));
                }
            }
            Ok(())
        }
        .boxed()
    }

    async fn apply_consent(&self, consent: &ConsentConfig, consent_types: &[&str], scope: Option<NodeId>) -> Result<()> {
        let should_enable = consent_types.contains(&consent.consent_type.as_str());
        if let (Some(matcher), Some(toggle)) = (&consent.matcher, &consent.toggle_action) {
            let enabled = matches(self.env(), matcher, scope);
            if enabled != should_enable {
                self.execute(toggle, &[], scope).await?;
            }
            return Ok(());
        }
        let action = if should_enable {
            &consent.true_action
        } else {
            &consent.false_action
        };
        if let Some(action) = action {
            self.execute(action, &[], scope).await?;
        }
        Ok(())
    }

    async fn wait_css(&self, spec: &FindSpec, scope: Option<NodeId>, retries: u32, interval: Duration, negated: bool) {
        for attempt in 0..=retries {
            let found = find(self.env(), spec, scope).target.is_some();
            if found != negated {
                return;
            }
            if attempt < retries {
                sleep(interval).await;
            }
        }
    }

    async fn slide(&self, spec: &FindSpec, drag_target: &FindSpec, axis: &str, scope: Option<NodeId>) {
        let env = self.env();
        let Some(target) = find(env, spec, scope).target else {
            return;
        };
        let Some(destination) = find(env, drag_target, scope).target else {
            return;
        };

        let from = env.bounding_rect(target);
        let to = env.bounding_rect(destination);
        let mut dx = to.left - from.left;
        let mut dy = to.top - from.top;
        match axis.to_ascii_lowercase().as_str() {
            "y" => dx = 0.0,
            "x" => dy = 0.0,
            _ => {}
        }

        let (x, y) = from.center();
        let event = |kind, client_x, client_y| MouseEvent { kind, client_x, client_y };
        env.dispatch_mouse(target, event(MouseEventKind::Down, x, y));
        sleep(SLIDE_STEP).await;
        env.dispatch_mouse(target, event(MouseEventKind::Move, x + dx, y + dy));
        sleep(SLIDE_STEP).await;
        env.dispatch_mouse(target, event(MouseEventKind::Up, x + dx, y + dy));
    }

    async fn eval(&self, code: &str, is_async: bool, timeout: Option<u64>) -> bool {
        debug!(cmp = self.name, code, "eval!");
        if !is_async {
            return self.bridge.eval_code(code, self.name).await;
        }
        self.bridge.eval_code(code, self.name).await;
        sleep(Duration::from_millis(timeout.unwrap_or(EVAL_ASYNC_DELAY_MS))).await;
        self.bridge.eval_code(CONSENT_CHECK_RESULT, self.name).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::bridge::DEFAULT_EVAL_TIMEOUT;
    use crate::consentomatic::config::{ElementOptions, Matcher};
    use crate::dom::{ElementSpec, MemoryDom, Rect};
    use crate::engine::LogsConfig;
    use crate::protocol::Messenger;

    fn fixture() -> (MemoryDom, DomActions, EvalBridge) {
        let dom = MemoryDom::new();
        let actions = DomActions::new(Arc::new(dom.clone()), LogsConfig::default());
        let (messenger, _rx) = Messenger::channel();
        (dom, actions, EvalBridge::new(messenger, DEFAULT_EVAL_TIMEOUT))
    }

    fn click(selector: &str) -> Action {
        Action::Click {
            find: FindSpec::target(selector),
        }
    }

    #[tokio::test]
    async fn test_click_and_list() {
        let (dom, actions, bridge) = fixture();
        let a = dom.append(None, ElementSpec::new("button").id("a"));
        let b = dom.append(None, ElementSpec::new("button").id("b"));
        let executor = Executor::new("com_test", &actions, &bridge);

        let list = Action::List {
            actions: vec![click("#a"), click("#b"), click("#missing")],
        };
        executor.execute(&list, &[], None).await.expect("execute");
        assert_eq!((dom.click_count(a), dom.click_count(b)), (1, 1));
    }

    #[tokio::test]
    async fn test_consent_toggles_mismatched_categories() {
        let (dom, actions, bridge) = fixture();
        let marketing = dom.append(None, ElementSpec::new("input").id("f").attr("type", "checkbox").checked());
        let stats = dom.append(None, ElementSpec::new("input").id("b").attr("type", "checkbox"));
        let executor = Executor::new("com_test", &actions, &bridge);

        let consent = |letter: &str, id: &str| ConsentConfig {
            consent_type: letter.into(),
            matcher: Some(Matcher::Checkbox {
                find: FindSpec::target(format!("#{id}")),
            }),
            toggle_action: Some(click(&format!("#{id}"))),
            true_action: None,
            false_action: None,
        };
        let action = Action::Consent {
            consents: vec![consent("F", "f"), consent("B", "b")],
        };

        executor.execute(&action, &[], None).await.expect("opt out");
        assert!(!dom.is_checked(marketing));
        assert!(!dom.is_checked(stats));

        executor.execute(&action, &["B", "F"], None).await.expect("opt in");
        assert!(dom.is_checked(marketing));
        assert!(dom.is_checked(stats));
    }

    #[tokio::test]
    async fn test_foreach_scopes_to_each_match() {
        let (dom, actions, bridge) = fixture();
        let rows: Vec<_> = (0..3)
            .map(|_| {
                let row = dom.append(None, ElementSpec::new("div").class("row"));
                dom.append(Some(row), ElementSpec::new("button"))
            })
            .collect();
        let executor = Executor::new("com_test", &actions, &bridge);

        let action = Action::Foreach {
            find: FindSpec::target(".row"),
            action: Box::new(click("button")),
        };
        executor.execute(&action, &[], None).await.expect("execute");
        assert!(rows.iter().all(|b| dom.click_count(*b) == 1));
    }

    #[tokio::test]
    async fn test_ifcss_runs_true_action_when_absent() {
        let (dom, actions, bridge) = fixture();
        let yes = dom.append(None, ElementSpec::new("button").id("yes"));
        let no = dom.append(None, ElementSpec::new("button").id("no"));
        let executor = Executor::new("com_test", &actions, &bridge);

        let action = Action::Ifcss {
            find: FindSpec::target("#absent"),
            true_action: Some(Box::new(click("#yes"))),
            false_action: Some(Box::new(click("#no"))),
        };
        executor.execute(&action, &[], None).await.expect("execute");
        assert_eq!((dom.click_count(yes), dom.click_count(no)), (1, 0));
    }

    #[tokio::test(start_paused = true)]
    async fn test_waitcss_gives_up_after_retries() {
        let (_dom, actions, bridge) = fixture();
        let executor = Executor::new("com_test", &actions, &bridge);
        let start = tokio::time::Instant::now();
        let action = Action::Waitcss {
            find: FindSpec::target(".never"),
            retries: Some(3),
            wait_time: Some(100),
            negated: false,
        };
        executor.execute(&action, &[], None).await.expect("execute");
        assert_eq!(start.elapsed(), Duration::from_millis(300));
    }

    #[tokio::test]
    async fn test_hide_adds_marker_class() {
        let (dom, actions, bridge) = fixture();
        let node = dom.append(None, ElementSpec::new("div").id("cmp"));
        let executor = Executor::new("com_test", &actions, &bridge);
        let action = Action::Hide {
            find: FindSpec {
                parent: None,
                target: ElementOptions::new("#cmp"),
            },
        };
        executor.execute(&action, &[], None).await.expect("execute");
        assert!(dom.has_class(node, HIDDEN_CLASS));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slide_along_x_axis() {
        let (dom, actions, bridge) = fixture();
        let handle = dom.append(
            None,
            ElementSpec::new("div").id("handle").rect(Rect { left: 0.0, top: 0.0, width: 10.0, height: 10.0 }),
        );
        dom.append(
            None,
            ElementSpec::new("div").id("end").rect(Rect { left: 200.0, top: 50.0, width: 10.0, height: 10.0 }),
        );
        let executor = Executor::new("com_test", &actions, &bridge);
        let action = Action::Slide {
            find: FindSpec::target("#handle"),
            drag_target: FindSpec::target("#end"),
            axis: "X".into(),
        };
        executor.execute(&action, &[], None).await.expect("execute");

        let events = dom.mouse_events(handle);
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].kind, MouseEventKind::Down);
        assert_eq!((events[2].client_x, events[2].client_y), (205.0, 5.0));
    }

    #[tokio::test]
    async fn test_close_and_unknown() {
        let (dom, actions, bridge) = fixture();
        let executor = Executor::new("com_test", &actions, &bridge);
        executor.execute(&Action::Close, &[], None).await.expect("close");
        assert!(dom.is_closed());

        let err = executor.execute(&Action::Unknown, &[], None).await.unwrap_err();
        assert!(err.is_config_error());
    }
}
