//! Messages sent from the engine to the host.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::engine::EngineState;
use crate::identifiers::{EvalId, InstanceId};

// ============================================================================
// ErrorDetails
// ============================================================================

/// Payload of an `autoconsentError` message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetails {
    /// Human-readable description.
    pub msg: String,
    /// CMPs involved.
    pub cmps: Vec<String>,
}

// ============================================================================
// OutboundMessage
// ============================================================================

/// A message from the engine to the host.
///
/// # Format
///
/// ```json
/// { "type": "optOutResult", "cmp": "Onetrust", "result": true,
///   "scheduleSelfTest": false, "url": "https://example.com/" }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum OutboundMessage {
    /// Engine created; asks the host for configuration and rules.
    Init {
        /// Page URL.
        url: String,
    },

    /// A CMP was detected on the page.
    CmpDetected {
        /// Page URL.
        url: String,
        /// CMP name.
        cmp: String,
    },

    /// A CMP popup is showing.
    PopupFound {
        /// Page URL.
        url: String,
        /// CMP name.
        cmp: String,
    },

    /// Outcome of an opt-out.
    OptOutResult {
        /// CMP name.
        cmp: String,
        /// Whether the opt-out steps succeeded.
        result: bool,
        /// Whether the host should schedule a self-test.
        schedule_self_test: bool,
        /// Page URL.
        url: String,
    },

    /// Outcome of an opt-in.
    OptInResult {
        /// CMP name.
        cmp: String,
        /// Whether the opt-in steps succeeded.
        result: bool,
        /// Whether the host should schedule a self-test.
        schedule_self_test: bool,
        /// Page URL.
        url: String,
    },

    /// Outcome of a self-test.
    SelfTestResult {
        /// CMP name.
        cmp: String,
        /// Whether the test steps succeeded.
        result: bool,
        /// Page URL.
        url: String,
    },

    /// The popup was handled to completion.
    AutoconsentDone {
        /// CMP name.
        cmp: String,
        /// Whether the CMP only hides the popup.
        is_cosmetic: bool,
        /// Page URL.
        url: String,
    },

    /// A diagnostic.
    AutoconsentError {
        /// What happened.
        details: ErrorDetails,
    },

    /// State snapshot, sent after every state change.
    Report {
        /// Engine instance.
        instance_id: InstanceId,
        /// Page URL.
        url: String,
        /// Whether the page is the top frame.
        main_frame: bool,
        /// Snapshot.
        state: EngineState,
    },

    /// Request to run a snippet in the page's script context.
    Eval {
        /// Correlation id echoed in `evalResp`.
        id: EvalId,
        /// Snippet source.
        code: String,
        /// Snippet name.
        snippet_id: String,
    },
}

impl OutboundMessage {
    /// The `type` tag of this message.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Init { .. } => "init",
            Self::CmpDetected { .. } => "cmpDetected",
            Self::PopupFound { .. } => "popupFound",
            Self::OptOutResult { .. } => "optOutResult",
            Self::OptInResult { .. } => "optInResult",
            Self::SelfTestResult { .. } => "selfTestResult",
            Self::AutoconsentDone { .. } => "autoconsentDone",
            Self::AutoconsentError { .. } => "autoconsentError",
            Self::Report { .. } => "report",
            Self::Eval { .. } => "eval",
        }
    }

    /// CMP name carried by the message, if any.
    #[must_use]
    pub fn cmp(&self) -> Option<&str> {
        match self {
            Self::CmpDetected { cmp, .. }
            | Self::PopupFound { cmp, .. }
            | Self::OptOutResult { cmp, .. }
            | Self::OptInResult { cmp, .. }
            | Self::SelfTestResult { cmp, .. }
            | Self::AutoconsentDone { cmp, .. } => Some(cmp),
            _ => None,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
