//! Cross-context evaluation of page-script snippets.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `eval` | [`EvalBridge`] correlation and main-world execution |
//! | `snippets` | Snippet table keyed by id |

mod eval;
pub mod snippets;

pub use eval::{DEFAULT_EVAL_TIMEOUT, EvalBridge, MainWorldExecutor, is_truthy};
