//! Engine configuration.
//!
//! [`Config`] is the flat options record delivered by the host in the
//! `initResp` message. Keys absent from the delivered record take their
//! defaults. [`EngineOptions`] holds Rust-side timing tunables that are not
//! part of the wire format.
//!
//! # Example
//!
//! ```ignore
//! use consent_engine::{AutoAction, Config};
//!
//! let config = Config::new()
//!     .with_auto_action(Some(AutoAction::OptIn))
//!     .with_disabled_cmp("Onetrust")
//!     .with_prehide_timeout(1500);
//!
//! config.validate()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

// ============================================================================
// AutoAction
// ============================================================================

/// Action taken automatically once a popup is confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AutoAction {
    /// Reject everything optional.
    OptOut,
    /// Accept everything.
    OptIn,
}

/// Accepts `"optOut"`, `"optIn"` or any falsy value (wait for a signal).
fn deserialize_auto_action<'de, D>(deserializer: D) -> std::result::Result<Option<AutoAction>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(s) if s == "optOut" => Some(AutoAction::OptOut),
        Value::String(s) if s == "optIn" => Some(AutoAction::OptIn),
        _ => None,
    })
}

// ============================================================================
// LogsConfig
// ============================================================================

/// Log channels. Each flag gates one family of tracing events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LogsConfig {
    /// Lifecycle transitions and detection results.
    pub lifecycle: bool,
    /// Individual rule steps.
    pub rulesteps: bool,
    /// Page-context evals.
    pub evals: bool,
    /// Recoverable errors.
    pub errors: bool,
    /// Messages received from the host.
    pub messages: bool,
    /// Fixed waits (only with `rulesteps`).
    pub waits: bool,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            lifecycle: false,
            rulesteps: false,
            evals: false,
            errors: true,
            messages: false,
            waits: false,
        }
    }
}

impl LogsConfig {
    /// Enables every channel.
    #[must_use]
    pub const fn verbose() -> Self {
        Self {
            lifecycle: true,
            rulesteps: true,
            evals: true,
            errors: true,
            messages: true,
            waits: true,
        }
    }
}

// ============================================================================
// Config
// ============================================================================

/// Options record delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Master switch.
    pub enabled: bool,

    /// Action taken after a popup is confirmed; `None` waits for the host.
    #[serde(deserialize_with = "deserialize_auto_action")]
    pub auto_action: Option<AutoAction>,

    /// CMP names that are never considered.
    pub disabled_cmps: Vec<String>,

    /// Hide known banners while a decision is pending.
    pub enable_prehide: bool,

    /// Consider cosmetic (hide-only) rules.
    pub enable_cosmetic_rules: bool,

    /// Scan page text for consent wording.
    pub enable_heuristic_detection: bool,

    /// Extra detection attempts after the first one.
    pub detect_retries: u32,

    /// Running inside the page's own script context.
    pub is_main_world: bool,

    /// Milliseconds after which prehide is undone if no opt action started.
    pub prehide_timeout: u64,

    /// Apply the filter-list cosmetic rules.
    pub enable_filter_list: bool,

    /// Log channels.
    pub logs: LogsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            auto_action: Some(AutoAction::OptOut),
            disabled_cmps: Vec::new(),
            enable_prehide: true,
            enable_cosmetic_rules: true,
            enable_heuristic_detection: false,
            detect_retries: 20,
            is_main_world: false,
            prehide_timeout: 2000,
            enable_filter_list: false,
            logs: LogsConfig::default(),
        }
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl Config {
    /// Creates a configuration with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON options record, filling in defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if the record is not a JSON object of the
    /// expected shape.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl Config {
    /// Enables or disables the engine.
    #[inline]
    #[must_use]
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the automatic action.
    #[inline]
    #[must_use]
    pub fn with_auto_action(mut self, action: Option<AutoAction>) -> Self {
        self.auto_action = action;
        self
    }

    /// Disables one CMP by name.
    #[inline]
    #[must_use]
    pub fn with_disabled_cmp(mut self, name: impl Into<String>) -> Self {
        self.disabled_cmps.push(name.into());
        self
    }

    /// Enables or disables prehide.
    #[inline]
    #[must_use]
    pub fn with_prehide(mut self, enabled: bool) -> Self {
        self.enable_prehide = enabled;
        self
    }

    /// Enables or disables cosmetic rules.
    #[inline]
    #[must_use]
    pub fn with_cosmetic_rules(mut self, enabled: bool) -> Self {
        self.enable_cosmetic_rules = enabled;
        self
    }

    /// Enables or disables heuristic text detection.
    #[inline]
    #[must_use]
    pub fn with_heuristic_detection(mut self, enabled: bool) -> Self {
        self.enable_heuristic_detection = enabled;
        self
    }

    /// Sets the number of detection retries.
    #[inline]
    #[must_use]
    pub fn with_detect_retries(mut self, retries: u32) -> Self {
        self.detect_retries = retries;
        self
    }

    /// Marks the engine as running in the page's main world.
    #[inline]
    #[must_use]
    pub fn with_main_world(mut self, main_world: bool) -> Self {
        self.is_main_world = main_world;
        self
    }

    /// Sets the prehide safety timeout in milliseconds.
    #[inline]
    #[must_use]
    pub fn with_prehide_timeout(mut self, timeout_ms: u64) -> Self {
        self.prehide_timeout = timeout_ms;
        self
    }

    /// Enables or disables the filter list.
    #[inline]
    #[must_use]
    pub fn with_filter_list(mut self, enabled: bool) -> Self {
        self.enable_filter_list = enabled;
        self
    }

    /// Sets the log channels.
    #[inline]
    #[must_use]
    pub fn with_logs(mut self, logs: LogsConfig) -> Self {
        self.logs = logs;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if prehide is enabled with a zero timeout.
    pub fn validate(&self) -> Result<()> {
        if self.enable_prehide && self.prehide_timeout == 0 {
            return Err(Error::config(
                "prehideTimeout must be greater than zero when prehide is enabled",
            ));
        }
        Ok(())
    }

    /// Returns the prehide timeout as a duration.
    #[inline]
    #[must_use]
    pub fn prehide_timeout(&self) -> Duration {
        Duration::from_millis(self.prehide_timeout)
    }

    /// Returns `true` if `name` is disabled.
    #[inline]
    #[must_use]
    pub fn is_disabled(&self, name: &str) -> bool {
        self.disabled_cmps.iter().any(|d| d == name)
    }
}

// ============================================================================
// EngineOptions
// ============================================================================

/// Timing tunables of the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineOptions {
    /// Timeout of one cross-context eval round trip.
    pub eval_timeout: Duration,
    /// Extra `detect_popup` attempts per CMP.
    pub popup_retries: u32,
    /// Delay between `detect_popup` attempts.
    pub popup_interval: Duration,
    /// Delay between CMP detection rounds.
    pub find_cmp_interval: Duration,
    /// Delay before checking whether filter-list rules matched anything.
    pub filter_list_check_delay: Duration,
    /// Polls while waiting for the document to finish loading.
    pub dom_ready_retries: u32,
    /// Delay between document readiness polls.
    pub dom_ready_interval: Duration,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            eval_timeout: Duration::from_millis(1000),
            popup_retries: 5,
            popup_interval: Duration::from_millis(500),
            find_cmp_interval: Duration::from_millis(500),
            filter_list_check_delay: Duration::from_millis(2000),
            dom_ready_retries: 100,
            dom_ready_interval: Duration::from_millis(100),
        }
    }
}

impl EngineOptions {
    /// Sets the eval timeout.
    #[inline]
    #[must_use]
    pub fn with_eval_timeout(mut self, timeout: Duration) -> Self {
        self.eval_timeout = timeout;
        self
    }

    /// Sets popup check retries and interval.
    #[inline]
    #[must_use]
    pub fn with_popup_polling(mut self, retries: u32, interval: Duration) -> Self {
        self.popup_retries = retries;
        self.popup_interval = interval;
        self
    }

    /// Sets the delay between detection rounds.
    #[inline]
    #[must_use]
    pub fn with_find_cmp_interval(mut self, interval: Duration) -> Self {
        self.find_cmp_interval = interval;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::new();
        assert!(config.enabled);
        assert_eq!(config.auto_action, Some(AutoAction::OptOut));
        assert!(config.enable_prehide);
        assert!(config.enable_cosmetic_rules);
        assert!(!config.enable_heuristic_detection);
        assert_eq!(config.detect_retries, 20);
        assert_eq!(config.prehide_timeout, 2000);
        assert!(config.logs.errors);
        assert!(!config.logs.lifecycle);
    }

    #[test]
    fn test_partial_record_keeps_defaults() {
        let config = Config::from_json(r#"{"detectRetries": 3, "logs": {"lifecycle": true}}"#)
            .expect("parse");
        assert_eq!(config.detect_retries, 3);
        assert!(config.enable_prehide);
        assert!(config.logs.lifecycle);
        assert!(config.logs.errors);
    }

    #[test]
    fn test_auto_action_values() {
        let opt_in = Config::from_json(r#"{"autoAction": "optIn"}"#).expect("parse");
        assert_eq!(opt_in.auto_action, Some(AutoAction::OptIn));

        for falsy in ["null", "false", "\"\"", "0"] {
            let json = format!(r#"{{"autoAction": {falsy}}}"#);
            let config = Config::from_json(&json).expect("parse");
            assert_eq!(config.auto_action, None, "autoAction {falsy}");
        }
    }

    #[test]
    fn test_builder_chain() {
        let config = Config::new()
            .with_auto_action(None)
            .with_disabled_cmp("Onetrust")
            .with_prehide(false)
            .with_detect_retries(0);

        assert_eq!(config.auto_action, None);
        assert!(config.is_disabled("Onetrust"));
        assert!(!config.is_disabled("Klaro"));
        assert!(!config.enable_prehide);
        assert_eq!(config.detect_retries, 0);
    }

    #[test]
    fn test_validate_zero_prehide_timeout() {
        let config = Config::new().with_prehide_timeout(0);
        assert!(config.validate().is_err());

        let config = Config::new().with_prehide_timeout(0).with_prehide(false);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_engine_options_defaults() {
        let options = EngineOptions::default();
        assert_eq!(options.eval_timeout, Duration::from_millis(1000));
        assert_eq!(options.popup_retries, 5);
        assert_eq!(options.popup_interval, Duration::from_millis(500));
    }
}
