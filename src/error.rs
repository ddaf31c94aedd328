//! Error types for the consent engine.
//!
//! Almost every failure inside the engine is recovered locally and surfaces
//! as a `false` result plus an outbound report message. The variants below
//! cover the remaining cases: malformed input at the parsing boundary,
//! unsupported selector syntax, and transport problems with the host.
//!
//! # Usage
//!
//! ```ignore
//! use consent_engine::{Result, RuleSet};
//!
//! fn load(json: &str) -> Result<RuleSet> {
//!     let rules = RuleSet::from_json(json)?;
//!     Ok(rules)
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`], [`Error::InvalidRule`] |
//! | DOM | [`Error::UnsupportedSelector`], [`Error::NodeNotFound`] |
//! | Evaluation | [`Error::EvalTimeout`], [`Error::EvalFailed`], [`Error::SnippetNotFound`] |
//! | Host | [`Error::ChannelClosed`] |
//! | External | [`Error::Json`], [`Error::Regex`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;

use crate::identifiers::{EvalId, NodeId};

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when the engine configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// Malformed rule or consent-o-matic action.
    #[error("Invalid rule {rule}: {message}")]
    InvalidRule {
        /// Rule or action name.
        rule: String,
        /// What is wrong with it.
        message: String,
    },

    // ========================================================================
    // DOM Errors
    // ========================================================================
    /// Selector syntax the DOM environment cannot evaluate.
    #[error("Unsupported selector: {selector}")]
    UnsupportedSelector {
        /// The offending selector.
        selector: String,
    },

    /// Node handle does not exist in the document.
    #[error("Node not found: {node_id}")]
    NodeNotFound {
        /// The missing node.
        node_id: NodeId,
    },

    // ========================================================================
    // Evaluation Errors
    // ========================================================================
    /// Cross-context eval was not answered in time.
    #[error("Eval {eval_id} timed out after {timeout_ms}ms")]
    EvalTimeout {
        /// Correlation id of the request.
        eval_id: EvalId,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Snippet threw or the executor failed.
    #[error("Eval failed: {message}")]
    EvalFailed {
        /// Error message from the page context.
        message: String,
    },

    /// Snippet id is not registered.
    #[error("Snippet not found: {snippet_id}")]
    SnippetNotFound {
        /// The unknown snippet id.
        snippet_id: String,
    },

    // ========================================================================
    // Host Errors
    // ========================================================================
    /// Host message channel closed.
    #[error("Host channel closed")]
    ChannelClosed,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL pattern matching failed (backtracking limit).
    #[error("Regex error: {0}")]
    Regex(#[from] fancy_regex::Error),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an invalid rule error.
    #[inline]
    pub fn invalid_rule(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRule {
            rule: rule.into(),
            message: message.into(),
        }
    }

    /// Creates an unsupported selector error.
    #[inline]
    pub fn unsupported_selector(selector: impl Into<String>) -> Self {
        Self::UnsupportedSelector {
            selector: selector.into(),
        }
    }

    /// Creates a node not found error.
    #[inline]
    pub fn node_not_found(node_id: NodeId) -> Self {
        Self::NodeNotFound { node_id }
    }

    /// Creates an eval timeout error.
    #[inline]
    pub fn eval_timeout(eval_id: EvalId, timeout_ms: u64) -> Self {
        Self::EvalTimeout {
            eval_id,
            timeout_ms,
        }
    }

    /// Creates an eval failure error.
    #[inline]
    pub fn eval_failed(message: impl Into<String>) -> Self {
        Self::EvalFailed {
            message: message.into(),
        }
    }

    /// Creates a snippet not found error.
    #[inline]
    pub fn snippet_not_found(snippet_id: impl Into<String>) -> Self {
        Self::SnippetNotFound {
            snippet_id: snippet_id.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::EvalTimeout { .. })
    }

    /// Returns `true` if this error comes from page-context evaluation.
    #[inline]
    #[must_use]
    pub fn is_eval_error(&self) -> bool {
        matches!(
            self,
            Self::EvalTimeout { .. } | Self::EvalFailed { .. } | Self::SnippetNotFound { .. }
        )
    }

    /// Returns `true` if this error is caused by bad rules or configuration.
    #[inline]
    #[must_use]
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::InvalidRule { .. } | Self::Json(_) | Self::Regex(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
