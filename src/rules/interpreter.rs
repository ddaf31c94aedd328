//! Evaluation of [`ActionStep`] trees.
//!
//! # Semantics
//!
//! | Construct | Combination |
//! |-----------|-------------|
//! | fields of one step | concurrent, AND |
//! | `if` / `then` / `else` | condition first, branch sequential, missing branch is `true` |
//! | `any` | sequential, first `true` wins; settles the step, abandoning other fields |
//! | step list (sequential) | in order, stops at the first non-optional failure |
//! | step list (parallel) | concurrent, AND |
//!
//! A step with no recognized field evaluates to `false`.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use futures_util::StreamExt;
use futures_util::future::{self, BoxFuture, FutureExt, join_all};
use futures_util::stream::FuturesUnordered;
use tracing::{error, trace, warn};

use crate::bridge::EvalBridge;
use crate::dom::{DEFAULT_WAIT_TIMEOUT, DomActions, VisibilityCheck};

use super::step::ActionStep;

// ============================================================================
// Interpreter
// ============================================================================

/// Evaluates steps against a document and the eval bridge.
#[derive(Debug, Clone, Copy)]
pub struct Interpreter<'a> {
    dom: &'a DomActions,
    bridge: &'a EvalBridge,
}

impl<'a> Interpreter<'a> {
    /// Creates an interpreter.
    #[inline]
    #[must_use]
    pub fn new(dom: &'a DomActions, bridge: &'a EvalBridge) -> Self {
        Self { dom, bridge }
    }

    fn timeout(step: &ActionStep) -> Duration {
        step.timeout.map_or(DEFAULT_WAIT_TIMEOUT, Duration::from_millis)
    }

    /// Evaluates one step.
    pub fn evaluate_rule_step<'s>(&'s self, step: &'s ActionStep) -> BoxFuture<'s, bool> {
        async move {
            let logs = self.dom.logs();
            let mut results: Vec<BoxFuture<'s, bool>> = Vec::new();

            if let Some(selector) = step.exists_selector() {
                results.push(future::ready(self.dom.element_exists(selector)).boxed());
            }
            if let Some(selector) = step.visible_selector() {
                let check = step.check.unwrap_or(VisibilityCheck::All);
                results.push(future::ready(self.dom.element_visible(selector, check)).boxed());
            }
            if let Some(snippet_id) = step.eval_snippet() {
                results.push(self.bridge.eval_snippet(snippet_id).boxed());
            }
            if let Some(selector) = step.wait_for_selector() {
                results.push(self.dom.wait_for_element(selector, Self::timeout(step)).boxed());
            }
            if let Some(selector) = step.wait_for_visible_selector() {
                let check = step.check.unwrap_or(VisibilityCheck::Any);
                results.push(
                    self.dom
                        .wait_for_visible(selector, Self::timeout(step), check)
                        .boxed(),
                );
            }
            if let Some(selector) = step.click_selector() {
                results.push(future::ready(self.dom.click(selector, step.all)).boxed());
            }
            if let Some(selector) = step.wait_for_then_click_selector() {
                results.push(
                    self.dom
                        .wait_for_then_click(selector, Self::timeout(step), step.all)
                        .boxed(),
                );
            }
            if let Some(ms) = step.wait_ms() {
                results.push(self.dom.wait(ms).boxed());
            }
            if let Some(selector) = step.hide_selector() {
                let method = step.method.unwrap_or_default();
                results.push(future::ready(self.dom.hide(selector, method)).boxed());
            }

            if let Some(condition) = step.if_.as_deref() {
                if !condition.is_condition() {
                    if logs.errors {
                        error!(?condition, "Invalid conditional rule");
                    }
                    return false;
                }
                let holds = self.evaluate_rule_step(condition).await;
                if logs.rulesteps {
                    trace!(holds, "Condition evaluated");
                }
                if holds {
                    let then = step.then.as_deref().unwrap_or_default();
                    results.push(self.run_rules_sequentially(then).boxed());
                } else if let Some(otherwise) = step.else_.as_deref() {
                    results.push(self.run_rules_sequentially(otherwise).boxed());
                } else {
                    results.push(future::ready(true).boxed());
                }
            }

            if let Some(alternatives) = step.any.as_deref() {
                let any = async move {
                    for alternative in alternatives {
                        if self.evaluate_rule_step(alternative).await {
                            return Some(true);
                        }
                    }
                    Some(false)
                };
                // Other fields run alongside until `any` settles.
                let mut running: FuturesUnordered<BoxFuture<'s, Option<bool>>> =
                    results.into_iter().map(|field| field.map(|_| None).boxed()).collect();
                running.push(any.boxed());
                while let Some(outcome) = running.next().await {
                    if let Some(matched) = outcome {
                        return matched;
                    }
                }
                return false;
            }

            if results.is_empty() {
                if logs.errors {
                    warn!(?step, "Unrecognized rule");
                }
                return false;
            }

            join_all(results).await.into_iter().all(|r| r)
        }
        .boxed()
    }

    /// Evaluates every step concurrently; `true` if all succeed.
    pub async fn run_rules_parallel(&self, steps: &[ActionStep]) -> bool {
        join_all(steps.iter().map(|step| self.evaluate_rule_step(step)))
            .await
            .into_iter()
            .all(|r| r)
    }

    /// Evaluates steps in order, stopping at the first non-optional failure.
    pub async fn run_rules_sequentially(&self, steps: &[ActionStep]) -> bool {
        let logs = self.dom.logs();
        for step in steps {
            if logs.rulesteps {
                trace!(?step, "Running rule");
            }
            let result = self.evaluate_rule_step(step).await;
            if logs.rulesteps {
                trace!(result, "Rule result");
            }
            if !result && !step.optional {
                return false;
            }
        }
        true
    }
}

// ============================================================================
// Tests
// ============================================================================
