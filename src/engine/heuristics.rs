//! Consent wording scan over the page text.

use std::sync::LazyLock;

use regex::{Regex, RegexBuilder};

/// Patterns as reported to the host.
const PATTERNS: &[&str] = &[
    "accept cookies",
    "accept all",
    "reject all",
    "only necessary cookies",
    r"by clicking.*(accept|agree|allow)",
    "by continuing",
    "we (use|serve)( optional)? cookies",
    "we are using cookies",
    "use of cookies",
    "(this|our) (web)?site.*cookies",
    "cookies (and|or) .* technologies",
    "such as cookies",
    "read more about.*cookies",
    "consent to.*cookies",
    "we and our partners.*cookies",
    "we.*store.*information.*such as.*cookies",
    "store and/or access information.*on a device",
    "personalised ads and content, ad and content measurement",
];

/// Longest snippet kept per match, in characters.
pub const MAX_SNIPPET_LEN: usize = 200;

static COMPILED: LazyLock<Vec<(String, Regex)>> = LazyLock::new(|| {
    PATTERNS
        .iter()
        .filter_map(|p| {
            let regex = RegexBuilder::new(p).case_insensitive(true).build().ok()?;
            Some((format!("/{p}/gi"), regex))
        })
        .collect()
});

/// Patterns that matched and the text they matched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeuristicMatches {
    /// Matched patterns, in `/source/gi` form.
    pub patterns: Vec<String>,
    /// Every match, truncated to [`MAX_SNIPPET_LEN`] characters.
    pub snippets: Vec<String>,
}

impl HeuristicMatches {
    /// Whether nothing matched.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }
}

/// Scans `text` with the fixed pattern list.
#[must_use]
pub fn check_heuristic_patterns(text: &str) -> HeuristicMatches {
    let mut found = HeuristicMatches::default();
    for (source, regex) in COMPILED.iter() {
        let mut matched = false;
        for m in regex.find_iter(text) {
            matched = true;
            found.snippets.push(m.as_str().chars().take(MAX_SNIPPET_LEN).collect());
        }
        if matched {
            found.patterns.push(source.clone());
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_patterns_compile() {
        assert_eq!(COMPILED.len(), PATTERNS.len());
    }

    #[test]
    fn test_matches_case_insensitively() {
        let found = check_heuristic_patterns("We use cookies. Click ACCEPT ALL or Reject all.");
        assert_eq!(found.patterns, ["/accept all/gi", "/reject all/gi", "/we (use|serve)( optional)? cookies/gi"]);
        assert_eq!(found.snippets, ["ACCEPT ALL", "Reject all", "We use cookies"]);
    }

    #[test]
    fn test_every_match_recorded() {
        let found = check_heuristic_patterns("accept all\naccept all");
        assert_eq!(found.patterns.len(), 1);
        assert_eq!(found.snippets.len(), 2);
    }

    #[test]
    fn test_snippet_truncated() {
        let text = format!("this site {} cookies", "x".repeat(400));
        let found = check_heuristic_patterns(&text);
        assert!(found.snippets.iter().all(|s| s.chars().count() <= MAX_SNIPPET_LEN));
        assert!(!found.is_empty());
    }

    #[test]
    fn test_no_match() {
        assert!(check_heuristic_patterns("Welcome to the shop").is_empty());
    }
}
