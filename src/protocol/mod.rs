//! Host message types.
//!
//! The engine talks to its host (extension background, test harness) with
//! JSON objects tagged by `type`.
//!
//! # Protocol Overview
//!
//! | Message | Direction | Purpose |
//! |---------|-----------|---------|
//! | `init` | Engine → Host | Request configuration |
//! | `initResp` | Host → Engine | Configuration and rules |
//! | `cmpDetected`, `popupFound` | Engine → Host | Detection progress |
//! | `optOutResult`, `optInResult`, `selfTestResult` | Engine → Host | Action outcomes |
//! | `autoconsentDone`, `autoconsentError` | Engine → Host | Completion, diagnostics |
//! | `report` | Engine → Host | State snapshot |
//! | `eval` / `evalResp` | Both | Page-context evaluation |
//! | `optIn`, `optOut`, `selfTest` | Host → Engine | Explicit signals |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `outbound` | [`OutboundMessage`], [`ErrorDetails`] |
//! | `inbound` | [`InboundMessage`] |
//! | `channel` | [`Messenger`] sending half |

// ============================================================================
// Submodules
// ============================================================================

/// Engine to host messages.
pub mod outbound;

/// Host to engine messages.
pub mod inbound;

/// Outbound channel wrapper.
pub mod channel;

// ============================================================================
// Re-exports
// ============================================================================

pub use channel::Messenger;
pub use inbound::InboundMessage;
pub use outbound::{ErrorDetails, OutboundMessage};
