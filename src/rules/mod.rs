//! Declarative rule language.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `rule` | [`Rule`], [`RunContext`], [`RuleSet`] |
//! | `step` | [`ActionStep`] |
//! | `interpreter` | [`Interpreter`] |

// ============================================================================
// Submodules
// ============================================================================

mod interpreter;
mod rule;
mod step;

// ============================================================================
// Re-exports
// ============================================================================

pub use interpreter::Interpreter;
pub use rule::{Rule, RuleSet, RunContext};
pub use step::ActionStep;
