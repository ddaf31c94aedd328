//! Builder for [`AutoConsent`] instances.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use consent_engine::{AutoConsent, Config, MemoryDom, Messenger, RuleSet};
//!
//! let (messenger, rx) = Messenger::channel();
//! let engine = AutoConsent::builder(Arc::new(MemoryDom::new()), messenger)
//!     .config(Config::new(), RuleSet::default())
//!     .build()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use crate::bridge::MainWorldExecutor;
use crate::dom::DomEnvironment;
use crate::error::Result;
use crate::protocol::Messenger;
use crate::rules::RuleSet;

use super::config::{Config, EngineOptions};
use super::core::AutoConsent;

// ============================================================================
// EngineBuilder
// ============================================================================

/// Builder for an [`AutoConsent`] engine.
///
/// Use [`AutoConsent::builder()`] to create one.
pub struct EngineBuilder {
    /// Page the engine runs in.
    env: Arc<dyn DomEnvironment>,
    /// Host channel.
    messenger: Messenger,
    /// Timing tunables.
    options: EngineOptions,
    /// Main-world snippet runner.
    executor: Option<Arc<dyn MainWorldExecutor>>,
    /// Configuration known up front; skips the `init` round trip.
    initial: Option<(Config, RuleSet)>,
}

impl fmt::Debug for EngineBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineBuilder")
            .field("options", &self.options)
            .field("executor", &self.executor.is_some())
            .field("configured", &self.initial.is_some())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// EngineBuilder Implementation
// ============================================================================

impl EngineBuilder {
    /// Creates a builder with default options and no configuration.
    #[must_use]
    pub fn new(env: Arc<dyn DomEnvironment>, messenger: Messenger) -> Self {
        Self {
            env,
            messenger,
            options: EngineOptions::default(),
            executor: None,
            initial: None,
        }
    }

    /// Sets the timing tunables.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: EngineOptions) -> Self {
        self.options = options;
        self
    }

    /// Runs snippets through `executor` when the config selects main-world
    /// mode.
    #[inline]
    #[must_use]
    pub fn executor(mut self, executor: Arc<dyn MainWorldExecutor>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Supplies configuration and rules directly.
    ///
    /// The engine then initializes and starts detection on [`build`](Self::build)
    /// instead of asking the host with an `init` message.
    #[inline]
    #[must_use]
    pub fn config(mut self, config: Config, rules: RuleSet) -> Self {
        self.initial = Some((config, rules));
        self
    }

    /// Builds the engine.
    ///
    /// Without a configuration the engine sends `init` and waits for
    /// `initResp`. With one it initializes right away and spawns detection,
    /// so this must run inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`](crate::Error::Config) if the supplied
    /// configuration fails validation.
    pub fn build(self) -> Result<AutoConsent> {
        if let Some((config, _)) = &self.initial {
            config.validate()?;
        }
        let engine = AutoConsent::from_parts(self.env, self.messenger, self.options, self.executor);
        match self.initial {
            Some((config, rules)) => {
                if engine.initialize(config, &rules) {
                    engine.spawn_start();
                }
            }
            None => engine.request_config(),
        }
        Ok(engine)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::MemoryDom;
    use crate::engine::Lifecycle;
    use crate::protocol::OutboundMessage;

    #[test]
    fn test_build_without_config_requests_it() {
        let (messenger, mut rx) = Messenger::channel();
        let engine = AutoConsent::builder(Arc::new(MemoryDom::new().with_location("https://a.test/")), messenger)
            .build()
            .expect("build");

        assert_eq!(engine.state().lifecycle, Lifecycle::WaitingForInitResponse);
        let mut kinds = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            if let OutboundMessage::Init { url } = &msg {
                assert_eq!(url, "https://a.test/");
            }
            kinds.push(msg.kind());
        }
        assert_eq!(kinds, ["report", "init", "report"]);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let (messenger, _rx) = Messenger::channel();
        let result = AutoConsent::builder(Arc::new(MemoryDom::new()), messenger)
            .config(Config::new().with_prehide_timeout(0), RuleSet::default())
            .build();
        assert!(result.is_err_and(|e| e.is_config_error()));
    }
}
