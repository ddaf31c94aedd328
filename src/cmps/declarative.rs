//! Strategy backed by a declarative [`Rule`].

use async_trait::async_trait;
use tracing::debug;

use crate::rules::{ActionStep, Rule, RunContext};

use super::base::{CmpContext, CmpStrategy};

/// Runs the step lists of a [`Rule`].
///
/// `detectCmp` runs in parallel, every other list sequentially. A missing
/// list fails, except `test`, which passes.
#[derive(Debug, Clone)]
pub struct DeclarativeCmp {
    rule: Rule,
}

impl DeclarativeCmp {
    /// Wraps a rule.
    #[must_use]
    pub fn new(rule: Rule) -> Self {
        Self { rule }
    }

    /// The wrapped rule.
    #[inline]
    #[must_use]
    pub fn rule(&self) -> &Rule {
        &self.rule
    }

    async fn run_sequentially(cx: &CmpContext, steps: Option<&[ActionStep]>) -> bool {
        match steps {
            Some(steps) => cx.interpreter().run_rules_sequentially(steps).await,
            None => false,
        }
    }
}

#[async_trait]
impl CmpStrategy for DeclarativeCmp {
    fn name(&self) -> &str {
        &self.rule.name
    }

    fn run_context(&self) -> RunContext {
        self.rule.run_context.clone()
    }

    fn prehide_selectors(&self) -> Vec<String> {
        self.rule.prehide_selectors.clone()
    }

    fn is_cosmetic(&self) -> bool {
        self.rule.cosmetic
    }

    fn is_intermediate(&self) -> bool {
        self.rule.intermediate
    }

    fn has_self_test(&self) -> bool {
        self.rule.has_self_test()
    }

    async fn detect_cmp(&self, cx: &CmpContext) -> bool {
        match self.rule.detect_cmp.as_deref() {
            Some(steps) => cx.interpreter().run_rules_parallel(steps).await,
            None => false,
        }
    }

    async fn detect_popup(&self, cx: &CmpContext) -> bool {
        Self::run_sequentially(cx, self.rule.detect_popup.as_deref()).await
    }

    async fn opt_out(&self, cx: &CmpContext) -> bool {
        if cx.logs().lifecycle && self.rule.opt_out.is_some() {
            debug!(cmp = %self.rule.name, "Initiated optOut()");
        }
        Self::run_sequentially(cx, self.rule.opt_out.as_deref()).await
    }

    async fn opt_in(&self, cx: &CmpContext) -> bool {
        if cx.logs().lifecycle && self.rule.opt_in.is_some() {
            debug!(cmp = %self.rule.name, "Initiated optIn()");
        }
        Self::run_sequentially(cx, self.rule.opt_in.as_deref()).await
    }

    async fn open_cmp(&self, cx: &CmpContext) -> bool {
        Self::run_sequentially(cx, self.rule.open_cmp.as_deref()).await
    }

    async fn test(&self, cx: &CmpContext) -> bool {
        match self.rule.test.as_deref() {
            Some(steps) => cx.interpreter().run_rules_sequentially(steps).await,
            None => true,
        }
    }
}
