//! The orchestrator and its supporting pieces.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `config` | [`Config`], [`LogsConfig`], [`EngineOptions`] |
//! | `state` | [`EngineState`], [`Lifecycle`] |
//! | `detection` | Popup detection race |
//! | `heuristics` | Consent wording scan |
//! | `builder` | [`EngineBuilder`] |
//! | `core` | [`AutoConsent`] |

// ============================================================================
// Submodules
// ============================================================================

mod builder;
mod config;
mod core;
pub mod detection;
pub mod heuristics;
mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::EngineBuilder;
pub use config::{AutoAction, Config, EngineOptions, LogsConfig};
pub use core::{AutoConsent, FILTER_LIST_CMP};
pub use state::{EngineState, Lifecycle};
