//! Messages received from the host.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::Config;
use crate::identifiers::EvalId;
use crate::rules::RuleSet;

/// A message from the host to the engine.
///
/// # Format
///
/// ```json
/// { "type": "initResp", "config": { "autoAction": "optIn" },
///   "rules": { "autoconsent": [], "consentomatic": {} } }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum InboundMessage {
    /// Configuration and rules; starts the engine.
    InitResp {
        /// Options record (missing keys take defaults).
        #[serde(default)]
        config: Config,
        /// Rule set.
        #[serde(default)]
        rules: RuleSet,
    },

    /// Explicit opt-in signal.
    OptIn,

    /// Explicit opt-out signal.
    OptOut,

    /// Run the detected CMP's self-test.
    SelfTest,

    /// Result of an `eval` request.
    EvalResp {
        /// Correlation id of the request.
        id: EvalId,
        /// Snippet result, coerced to a boolean by JS truthiness.
        #[serde(default)]
        result: Value,
    },
}

impl InboundMessage {
    /// Parses a JSON message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) for unknown types or
    /// malformed payloads.
    pub fn from_json(json: &str) -> crate::Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// The `type` tag of this message.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InitResp { .. } => "initResp",
            Self::OptIn => "optIn",
            Self::OptOut => "optOut",
            Self::SelfTest => "selfTest",
            Self::EvalResp { .. } => "evalResp",
        }
    }
}
