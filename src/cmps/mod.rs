//! CMP strategies and the registry that assembles them.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `base` | [`CmpStrategy`] trait, [`CmpContext`] |
//! | `declarative` | [`DeclarativeCmp`] over a JSON [`Rule`](crate::rules::Rule) |
//! | `consentomatic` | [`ConsentOMaticCmp`] over a consent-o-matic config |
//! | [`vendors`] | Procedural per-vendor strategies |
//! | [`registry`] | Builds and filters the candidate list |

// ============================================================================
// Submodules
// ============================================================================

mod base;
mod consentomatic;
mod declarative;
pub mod registry;
pub mod vendors;

// ============================================================================
// Re-exports
// ============================================================================

pub use base::{CmpContext, CmpStrategy};
pub use consentomatic::ConsentOMaticCmp;
pub use declarative::DeclarativeCmp;
pub use registry::build_registry;
