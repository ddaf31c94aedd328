//! Filterable element search.
//!
//! Searches run below an explicit `scope` (the document when `None`).
//! Filters apply in a fixed order: text, style, display, iframe, child.

use tracing::warn;

use crate::dom::DomEnvironment;
use crate::identifiers::NodeId;

use super::config::{ElementOptions, FindSpec, Matcher};

/// One search hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FindResult {
    /// Matched parent, if the search had one.
    pub parent: Option<NodeId>,
    /// Matched target.
    pub target: Option<NodeId>,
}

fn find_elements(env: &dyn DomEnvironment, options: &ElementOptions, scope: Option<NodeId>) -> Vec<NodeId> {
    let mut candidates = match env.query_selector_all(scope, &options.selector) {
        Ok(nodes) => nodes,
        Err(e) => {
            warn!(selector = %options.selector, error = %e, "Selector could not be resolved");
            return Vec::new();
        }
    };

    if let Some(filter) = &options.text_filter {
        candidates.retain(|node| filter.matches(&env.text_content(*node)));
    }

    if let Some(filters) = &options.style_filters {
        candidates.retain(|node| {
            filters.iter().all(|f| {
                let actual = env.computed_style(*node, &f.option);
                let equal = actual.as_deref() == Some(f.value.as_str());
                if f.negated { !equal } else { equal }
            })
        });
    }

    if let Some(displayed) = options.display_filter {
        candidates.retain(|node| (env.offset_height(*node) != 0.0) == displayed);
    }

    if let Some(in_frame) = options.iframe_filter {
        let is_subframe = !env.is_top_frame();
        candidates.retain(|_| is_subframe == in_frame);
    }

    if let Some(child) = &options.child_filter {
        candidates.retain(|node| find(env, child, Some(*node)).target.is_some());
    }

    candidates
}

fn find_element(env: &dyn DomEnvironment, options: &ElementOptions, scope: Option<NodeId>) -> Option<NodeId> {
    let candidates = find_elements(env, options, scope);
    if candidates.len() > 1 {
        warn!(selector = %options.selector, count = candidates.len(), "Multiple possible targets");
    }
    candidates.first().copied()
}

/// Resolves `spec` to its first hit.
///
/// Returns an empty [`FindResult`] when nothing matches.
#[must_use]
pub fn find(env: &dyn DomEnvironment, spec: &FindSpec, scope: Option<NodeId>) -> FindResult {
    match &spec.parent {
        Some(parent_options) => match find_element(env, parent_options, scope) {
            Some(parent) => FindResult {
                parent: Some(parent),
                target: find_element(env, &spec.target, Some(parent)),
            },
            None => FindResult::default(),
        },
        None => FindResult {
            parent: None,
            target: find_element(env, &spec.target, scope),
        },
    }
}

/// Resolves `spec` to every hit, in document order.
///
/// With a parent search, targets are collected below each matching parent.
/// Returns a single empty [`FindResult`] when nothing matches.
#[must_use]
pub fn find_all(env: &dyn DomEnvironment, spec: &FindSpec, scope: Option<NodeId>) -> Vec<FindResult> {
    let mut results = Vec::new();
    match &spec.parent {
        Some(parent_options) => {
            for parent in find_elements(env, parent_options, scope) {
                results.extend(
                    find_elements(env, &spec.target, Some(parent))
                        .into_iter()
                        .map(|target| FindResult {
                            parent: Some(parent),
                            target: Some(target),
                        }),
                );
            }
        }
        None => {
            results.extend(
                find_elements(env, &spec.target, scope)
                    .into_iter()
                    .map(|target| FindResult {
                        parent: None,
                        target: Some(target),
                    }),
            );
        }
    }
    if results.is_empty() {
        results.push(FindResult::default());
    }
    results
}

/// Evaluates a matcher.
#[must_use]
pub fn matches(env: &dyn DomEnvironment, matcher: &Matcher, scope: Option<NodeId>) -> bool {
    match matcher {
        Matcher::Css { find: spec } => find(env, spec, scope).target.is_some(),
        Matcher::Checkbox { find: spec } => find(env, spec, scope)
            .target
            .is_some_and(|node| env.is_checked(node)),
    }
}
