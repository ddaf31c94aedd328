//! Page access: the injected document capability and the primitives built
//! on top of it.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `environment` | [`DomEnvironment`] trait |
//! | `selector` | [`ElementSelector`] strings and chains |
//! | `actions` | [`DomActions`] click / visibility / wait / hide |
//! | `style` | Hiding style sheets |
//! | `wait` | Bounded polling |
//! | `memory` | [`MemoryDom`] in-memory document |
//! | `markup` | HTML and XPath snapshots backing `MemoryDom` queries |

// ============================================================================
// Submodules
// ============================================================================

mod actions;
mod environment;
mod markup;
mod memory;
mod selector;
pub mod style;
pub mod wait;

// ============================================================================
// Re-exports
// ============================================================================

pub use actions::{DEFAULT_WAIT_TIMEOUT, DomActions, VisibilityCheck, WAIT_POLL_INTERVAL};
pub use environment::{DomEnvironment, MouseEvent, MouseEventKind, ReadyState, Rect};
pub use memory::{ClickHandler, ElementSpec, MemoryDom};
pub use selector::{ElementSelector, SelectorKind};
pub use style::HideMethod;
