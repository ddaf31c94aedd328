//! Consent-o-matic rule support.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `config` | Rule format: detectors, methods, actions |
//! | `tools` | Filterable element search |
//! | `actions` | [`Executor`] for action trees |

mod actions;
mod config;
pub mod tools;

pub use actions::Executor;
pub use config::{
    Action, ConsentConfig, ConsentOMaticConfig, Detector, ElementOptions, FindSpec, Matcher, MethodConfig,
    StyleFilter, TextFilter,
};
pub use tools::{FindResult, find, find_all, matches};
