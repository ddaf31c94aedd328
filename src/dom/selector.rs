//! Element selectors used by rule steps and procedural CMPs.
//!
//! A selector is either a single string or a chain of strings. Single
//! strings may carry a strategy prefix:
//!
//! ```ignore
//! use consent_engine::dom::ElementSelector;
//!
//! // CSS selector (default)
//! let css: ElementSelector = "#onetrust-reject-all-handler".into();
//!
//! // XPath
//! let xpath: ElementSelector = "xpath///button[@type='submit']".into();
//!
//! // Chain: each step resolves inside the first match of the previous one,
//! // descending into its shadow root when it has one.
//! let chain = ElementSelector::chain(["#usercentrics-root", "button[data-testid=uc-deny-all-button]"]);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// SelectorKind
// ============================================================================

/// Resolution strategy of a single selector string, derived from its prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorKind<'a> {
    /// Plain CSS selector.
    Css(&'a str),
    /// `xpath/` prefixed expression.
    XPath(&'a str),
    /// `text/` prefixed selector (not resolvable from content scripts).
    Text(&'a str),
    /// `pierce/` prefixed selector (not resolvable from content scripts).
    Pierce(&'a str),
    /// `aria/` prefixed selector (not resolvable from content scripts).
    Aria(&'a str),
}

impl<'a> SelectorKind<'a> {
    /// Splits a selector string into strategy and value.
    #[must_use]
    pub fn parse(selector: &'a str) -> Self {
        if let Some(rest) = selector.strip_prefix("xpath/") {
            Self::XPath(rest)
        } else if let Some(rest) = selector.strip_prefix("text/") {
            Self::Text(rest)
        } else if let Some(rest) = selector.strip_prefix("pierce/") {
            Self::Pierce(rest)
        } else if let Some(rest) = selector.strip_prefix("aria/") {
            Self::Aria(rest)
        } else {
            Self::Css(selector)
        }
    }

    /// Returns the strategy name.
    #[must_use]
    pub fn strategy(&self) -> &'static str {
        match self {
            Self::Css(_) => "css",
            Self::XPath(_) => "xpath",
            Self::Text(_) => "text",
            Self::Pierce(_) => "pierce",
            Self::Aria(_) => "aria",
        }
    }

    /// Returns the selector value without its prefix.
    #[must_use]
    pub fn value(&self) -> &'a str {
        match self {
            Self::Css(v) | Self::XPath(v) | Self::Text(v) | Self::Pierce(v) | Self::Aria(v) => v,
        }
    }
}

// ============================================================================
// ElementSelector
// ============================================================================

/// A single selector or an ordered chain of selectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ElementSelector {
    /// One selector string, possibly prefixed.
    Single(String),
    /// Selectors resolved one after another.
    Chain(Vec<String>),
}

impl ElementSelector {
    /// Creates a single selector.
    #[inline]
    pub fn single(selector: impl Into<String>) -> Self {
        Self::Single(selector.into())
    }

    /// Creates a selector chain.
    #[inline]
    pub fn chain(selectors: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::Chain(selectors.into_iter().map(Into::into).collect())
    }

    /// Returns the selector strings in resolution order.
    #[must_use]
    pub fn parts(&self) -> Vec<&str> {
        match self {
            Self::Single(s) => vec![s.as_str()],
            Self::Chain(chain) => chain.iter().map(String::as_str).collect(),
        }
    }
}

impl fmt::Display for ElementSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(s) => f.write_str(s),
            Self::Chain(chain) => write!(f, "[{}]", chain.join(" >> ")),
        }
    }
}

// ============================================================================
// From implementations for ergonomics
// ============================================================================

impl From<&str> for ElementSelector {
    fn from(s: &str) -> Self {
        Self::Single(s.to_string())
    }
}

impl From<String> for ElementSelector {
    fn from(s: String) -> Self {
        Self::Single(s)
    }
}

impl From<Vec<String>> for ElementSelector {
    fn from(chain: Vec<String>) -> Self {
        Self::Chain(chain)
    }
}

// ============================================================================
// Tests
// ============================================================================
