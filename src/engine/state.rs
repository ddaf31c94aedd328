//! Engine state reported to the host.

use serde::{Deserialize, Serialize};

// ============================================================================
// Lifecycle
// ============================================================================

/// Progress of one engine run.
///
/// ```text
/// loading → waitingForInitResponse → initialized → started → cmpDetected
///   → openPopupDetected → runningOptOut | runningOptIn
///   → optOutSucceeded | optOutFailed | optInSucceeded | optInFailed → done
/// ```
///
/// `nothingDetected` and `cosmeticFiltersDetected` end a run without a CMP.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Lifecycle {
    /// Engine created.
    #[default]
    Loading,
    /// `init` sent, waiting for `initResp`.
    WaitingForInitResponse,
    /// Config and rules applied.
    Initialized,
    /// Detection running.
    Started,
    /// At least one CMP detected.
    CmpDetected,
    /// A popup is showing.
    OpenPopupDetected,
    /// Opt-out in progress.
    RunningOptOut,
    /// Opt-in in progress.
    RunningOptIn,
    /// Intermediate opt-out step succeeded.
    OptOutSucceeded,
    /// Opt-out failed.
    OptOutFailed,
    /// Intermediate opt-in step succeeded.
    OptInSucceeded,
    /// Opt-in failed.
    OptInFailed,
    /// Popup handled.
    Done,
    /// No CMP found.
    NothingDetected,
    /// Only filter-list rules matched.
    CosmeticFiltersDetected,
}

impl Lifecycle {
    /// Whether an opt action is running.
    #[inline]
    #[must_use]
    pub fn is_running_opt_action(self) -> bool {
        matches!(self, Self::RunningOptOut | Self::RunningOptIn)
    }
}

// ============================================================================
// EngineState
// ============================================================================

/// Snapshot carried by `report` messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineState {
    /// Current lifecycle stage.
    pub lifecycle: Lifecycle,
    /// Prehide style sheet installed.
    pub prehide_on: bool,
    /// Filter-list style sheet installed.
    pub cosmetic_filters_on: bool,
    /// Filter-list match already reported.
    pub filter_list_reported: bool,
    /// Detection rounds run so far.
    pub find_cmp_attempts: u32,
    /// Names of detected CMPs.
    pub detected_cmps: Vec<String>,
    /// Names of CMPs with a confirmed popup.
    pub detected_popups: Vec<String>,
    /// Matched heuristic patterns.
    pub heuristic_patterns: Vec<String>,
    /// Text around heuristic matches.
    pub heuristic_snippets: Vec<String>,
    /// Result of the last self-test.
    pub self_test: Option<bool>,
}

impl EngineState {
    /// Creates the initial state.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lifecycle_wire_names() {
        let names: Vec<String> = [
            Lifecycle::WaitingForInitResponse,
            Lifecycle::OpenPopupDetected,
            Lifecycle::NothingDetected,
            Lifecycle::CosmeticFiltersDetected,
        ]
        .iter()
        .map(|l| serde_json::to_value(l).expect("serialize").as_str().unwrap_or_default().to_string())
        .collect();
        assert_eq!(
            names,
            ["waitingForInitResponse", "openPopupDetected", "nothingDetected", "cosmeticFiltersDetected"]
        );
    }

    #[test]
    fn test_snapshot_format() {
        let value = serde_json::to_value(EngineState::new()).expect("serialize");
        assert_eq!(
            value,
            json!({
                "lifecycle": "loading",
                "prehideOn": false,
                "cosmeticFiltersOn": false,
                "filterListReported": false,
                "findCmpAttempts": 0,
                "detectedCmps": [],
                "detectedPopups": [],
                "heuristicPatterns": [],
                "heuristicSnippets": [],
                "selfTest": null
            })
        );
    }

    #[test]
    fn test_running_opt_action() {
        assert!(Lifecycle::RunningOptIn.is_running_opt_action());
        assert!(!Lifecycle::OpenPopupDetected.is_running_opt_action());
    }
}
