//! Hiding style sheets.
//!
//! The engine owns three `<style>` elements:
//!
//! | Id | Content |
//! |----|---------|
//! | [`CSS_RULES_STYLE_ID`] | `hide` steps |
//! | [`PREHIDE_STYLE_ID`] | prehide selectors (opacity method) |
//! | [`COSMETICS_STYLE_ID`] | filter-list selectors |

use serde::{Deserialize, Serialize};

// ============================================================================
// Constants
// ============================================================================

/// Style element receiving `hide` step rules.
pub const CSS_RULES_STYLE_ID: &str = "autoconsent-css-rules";

/// Style element receiving prehide rules.
pub const PREHIDE_STYLE_ID: &str = "autoconsent-prehide";

/// Style element receiving filter-list rules.
pub const COSMETICS_STYLE_ID: &str = "autoconsent-cosmetics";

/// Class added by consent-o-matic `hide` actions.
pub const HIDDEN_CLASS: &str = "Autoconsent-Hidden";

// ============================================================================
// HideMethod
// ============================================================================

/// How hidden elements are hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HideMethod {
    /// `display: none`.
    #[default]
    Display,
    /// `opacity: 0`; keeps layout so page scripts keep working.
    Opacity,
}

impl HideMethod {
    /// The property declaration that hides the element.
    #[must_use]
    pub fn declaration(&self) -> &'static str {
        match self {
            Self::Display => "display: none",
            Self::Opacity => "opacity: 0",
        }
    }
}

// ============================================================================
// Rule text
// ============================================================================

/// Declaration block applied to hidden elements.
#[must_use]
pub fn hiding_style(method: HideMethod) -> String {
    format!(
        "{} !important; z-index: -1 !important; pointer-events: none !important;",
        method.declaration()
    )
}

/// Full CSS rule hiding `selector`, with a trailing space separator.
#[must_use]
pub fn hiding_rule(selector: &str, method: HideMethod) -> String {
    format!("{selector} {{ {} }} ", hiding_style(method))
}

/// Strips declaration blocks from a filter-list style sheet, leaving a
/// comma-separated selector list.
#[must_use]
pub fn filter_list_selectors(styles: &str) -> String {
    let mut out = String::with_capacity(styles.len());
    let mut depth = 0usize;
    for ch in styles.chars() {
        match ch {
            '{' => {
                if depth == 0 {
                    let trimmed = out.trim_end().len();
                    out.truncate(trimmed);
                    out.push(',');
                }
                depth += 1;
            }
            '}' => depth = depth.saturating_sub(1),
            c if depth == 0 => {
                if !(out.ends_with(',') && c.is_whitespace()) {
                    out.push(c);
                }
            }
            _ => {}
        }
    }
    out.trim_end_matches(',').trim().to_string()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hiding_rule_display() {
        assert_eq!(
            hiding_rule("#banner", HideMethod::Display),
            "#banner { display: none !important; z-index: -1 !important; pointer-events: none !important; } "
        );
    }

    #[test]
    fn test_hiding_rule_opacity() {
        assert!(hiding_rule(".cmp", HideMethod::Opacity).contains("opacity: 0 !important"));
    }

    #[test]
    fn test_hide_method_serde() {
        let method: HideMethod = serde_json::from_str("\"opacity\"").expect("parse");
        assert_eq!(method, HideMethod::Opacity);
    }

    #[test]
    fn test_filter_list_selectors() {
        let styles = "#a, .b { display: none !important; }\n.c { opacity: 0 }";
        assert_eq!(filter_list_selectors(styles), "#a, .b,.c");
        assert_eq!(filter_list_selectors(""), "");
    }
}
