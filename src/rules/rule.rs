//! Declarative rules and the rule-set payload.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;
use std::result::Result as StdResult;
use std::sync::{Arc, OnceLock};

use fancy_regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::consentomatic::ConsentOMaticConfig;
use crate::error::{Error, Result};

use super::step::ActionStep;

// ============================================================================
// RunContext
// ============================================================================

/// Compiled `url_pattern`, or the compile error message.
type CompiledPattern = StdResult<Regex, String>;

/// Where a CMP may activate.
///
/// `url_pattern` supports lookaround (`^(?!.*example\.com/)`). It is
/// compiled on first use; clones share the compiled pattern.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RunContext {
    /// Allowed in the top frame.
    pub main: bool,
    /// Allowed in sub-frames.
    pub frame: bool,
    /// Regex the page URL must match; empty accepts every URL.
    pub url_pattern: String,
    #[serde(skip)]
    compiled: Arc<OnceLock<CompiledPattern>>,
}

impl Default for RunContext {
    fn default() -> Self {
        Self {
            main: true,
            frame: false,
            url_pattern: String::new(),
            compiled: Arc::default(),
        }
    }
}

impl fmt::Debug for RunContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunContext")
            .field("main", &self.main)
            .field("frame", &self.frame)
            .field("url_pattern", &self.url_pattern)
            .finish_non_exhaustive()
    }
}

impl PartialEq for RunContext {
    fn eq(&self, other: &Self) -> bool {
        self.main == other.main && self.frame == other.frame && self.url_pattern == other.url_pattern
    }
}

impl Eq for RunContext {}

impl RunContext {
    /// Top frame only, any URL.
    #[must_use]
    pub fn main_only() -> Self {
        Self::default()
    }

    /// Sub-frames only.
    #[must_use]
    pub fn frame_only() -> Self {
        Self {
            main: false,
            frame: true,
            ..Self::default()
        }
    }

    /// Top frame and sub-frames.
    #[must_use]
    pub fn everywhere() -> Self {
        Self {
            main: true,
            frame: true,
            ..Self::default()
        }
    }

    /// Sets the URL pattern.
    #[must_use]
    pub fn with_url_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.url_pattern = pattern.into();
        self.compiled = Arc::default();
        self
    }

    /// Whether `url` matches the pattern.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRule`] if the pattern does not compile and
    /// [`Error::Regex`] if matching exceeds the backtracking limit.
    pub fn matches_url(&self, url: &str) -> Result<bool> {
        if self.url_pattern.is_empty() {
            return Ok(true);
        }
        let compiled = self
            .compiled
            .get_or_init(|| Regex::new(&self.url_pattern).map_err(|e| e.to_string()));
        match compiled {
            Ok(regex) => Ok(regex.is_match(url)?),
            Err(message) => Err(Error::invalid_rule(
                format!("urlPattern {}", self.url_pattern),
                message.clone(),
            )),
        }
    }

    /// Whether a CMP with this context may run in the given frame.
    ///
    /// An invalid pattern excludes the CMP.
    #[must_use]
    pub fn check(&self, is_top: bool, url: &str) -> bool {
        if is_top && !self.main {
            return false;
        }
        if !is_top && !self.frame {
            return false;
        }
        match self.matches_url(url) {
            Ok(matched) => matched,
            Err(e) => {
                warn!(pattern = %self.url_pattern, error = %e, "Invalid urlPattern");
                false
            }
        }
    }
}

// ============================================================================
// Rule
// ============================================================================

/// A declarative CMP description.
///
/// # Format
///
/// ```json
/// {
///   "name": "example",
///   "prehideSelectors": ["#cmp"],
///   "detectCmp": [{ "exists": "#cmp" }],
///   "detectPopup": [{ "visible": "#cmp" }],
///   "optOut": [{ "waitForThenClick": "#cmp .reject" }],
///   "optIn": [{ "click": "#cmp .accept" }]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Rule {
    /// CMP name.
    pub name: String,
    /// CSS hidden while a decision is pending.
    pub prehide_selectors: Vec<String>,
    /// Activation scope.
    pub run_context: RunContext,
    /// Only hides the popup.
    pub cosmetic: bool,
    /// Success does not finish the flow.
    pub intermediate: bool,
    /// Detection steps, run in parallel.
    pub detect_cmp: Option<Vec<ActionStep>>,
    /// Popup steps.
    pub detect_popup: Option<Vec<ActionStep>>,
    /// Opt-out steps.
    pub opt_out: Option<Vec<ActionStep>>,
    /// Opt-in steps.
    pub opt_in: Option<Vec<ActionStep>>,
    /// Steps that open the settings.
    pub open_cmp: Option<Vec<ActionStep>>,
    /// Self-test steps.
    pub test: Option<Vec<ActionStep>>,
}

impl Rule {
    /// Starts a rule with the given name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Whether the rule declares a self-test.
    #[inline]
    #[must_use]
    pub fn has_self_test(&self) -> bool {
        self.test.is_some()
    }
}

// ============================================================================
// RuleSet
// ============================================================================

/// Rules delivered in `initResp`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RuleSet {
    /// Consent-o-matic configs by name.
    pub consentomatic: BTreeMap<String, ConsentOMaticConfig>,
    /// Declarative rules.
    pub autoconsent: Vec<Rule>,
    /// Cosmetic filter-list rules (`selector` or `selector { style }`).
    pub filter_list: Vec<String>,
}

impl RuleSet {
    /// Parses a rule-set payload.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) on malformed input.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Whether the set holds no rules at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.consentomatic.is_empty() && self.autoconsent.is_empty() && self.filter_list.is_empty()
    }
}

// ============================================================================
// Tests
// ============================================================================
