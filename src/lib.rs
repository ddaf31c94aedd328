//! Consent Engine - cookie-consent popup detection and handling.
//!
//! The engine recognizes which Consent Management Platform (CMP) a page
//! embeds, checks whether its popup is showing, and drives it to an
//! opt-out or opt-in without user interaction.
//!
//! # Architecture
//!
//! The engine never touches a browser directly:
//!
//! - **Page**: reached through the [`DomEnvironment`] trait. [`MemoryDom`]
//!   is an in-memory document for tests and headless use.
//! - **Host**: receives [`OutboundMessage`]s over a [`Messenger`] channel
//!   and feeds [`InboundMessage`]s to [`AutoConsent::receive_message`].
//! - **Page scripts**: snippets run in the page's own context through the
//!   [`EvalBridge`], either as `eval` round trips or via a
//!   [`MainWorldExecutor`](bridge::MainWorldExecutor).
//!
//! CMP knowledge comes in three forms behind one [`CmpStrategy`] trait:
//! procedural vendor strategies, declarative JSON [`Rule`]s and
//! consent-o-matic configs.
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use consent_engine::{AutoConsent, Config, MemoryDom, Messenger, Result, RuleSet};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let (messenger, mut rx) = Messenger::channel();
//!     let rules = RuleSet::from_json(include_str!("rules.json"))?;
//!     let engine = AutoConsent::builder(Arc::new(MemoryDom::new()), messenger)
//!         .config(Config::new(), rules)
//!         .build()?;
//!
//!     while let Some(message) = rx.recv().await {
//!         println!("{}", message.kind());
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`engine`] | [`AutoConsent`], configuration, state |
//! | [`cmps`] | [`CmpStrategy`] and its implementations |
//! | [`rules`] | Declarative rules and their interpreter |
//! | [`consentomatic`] | Consent-o-matic configs and actions |
//! | [`dom`] | Page access and DOM primitives |
//! | [`bridge`] | Page-context evaluation |
//! | [`protocol`] | Host message types |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |

// ============================================================================
// Modules
// ============================================================================

/// Page-context snippet evaluation.
pub mod bridge;

/// CMP strategies and the registry.
pub mod cmps;

/// Consent-o-matic configs, selector resolution and actions.
pub mod consentomatic;

/// Page access: the [`DomEnvironment`] trait, DOM primitives and the
/// in-memory document.
pub mod dom;

/// Orchestrator, configuration and state.
pub mod engine;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Host message types.
pub mod protocol;

/// Declarative rules and the step interpreter.
pub mod rules;

// ============================================================================
// Re-exports
// ============================================================================

// Engine types
pub use engine::{AutoAction, AutoConsent, Config, EngineBuilder, EngineOptions, EngineState, Lifecycle, LogsConfig};

// Strategy types
pub use cmps::{CmpContext, CmpStrategy, ConsentOMaticCmp, DeclarativeCmp};

// Rule types
pub use rules::{ActionStep, Interpreter, Rule, RuleSet, RunContext};

// Page types
pub use bridge::EvalBridge;
pub use dom::{DomActions, DomEnvironment, ElementSelector, ElementSpec, MemoryDom, VisibilityCheck};

// Protocol types
pub use protocol::{InboundMessage, Messenger, OutboundMessage};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{EvalId, InstanceId, NodeId};
