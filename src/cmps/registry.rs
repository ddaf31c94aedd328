//! Candidate list assembly.
//!
//! Order is fixed: procedural vendors, then consent-o-matic configs
//! (`com_<name>`), then declarative rules. Detection walks the list in this
//! order, so earlier entries win ties.

use std::sync::Arc;

use tracing::debug;

use crate::engine::Config;
use crate::rules::RuleSet;

use super::{CmpStrategy, ConsentOMaticCmp, DeclarativeCmp, vendors};

/// Builds every strategy for `rules`, before config filtering.
#[must_use]
pub fn parse_rules(rules: &RuleSet) -> Vec<Arc<dyn CmpStrategy>> {
    let mut cmps = vendors::builtin();
    cmps.extend(
        rules
            .consentomatic
            .iter()
            .map(|(name, config)| Arc::new(ConsentOMaticCmp::new(name, config.clone())) as Arc<dyn CmpStrategy>),
    );
    cmps.extend(
        rules
            .autoconsent
            .iter()
            .map(|rule| Arc::new(DeclarativeCmp::new(rule.clone())) as Arc<dyn CmpStrategy>),
    );
    cmps
}

/// Drops disabled CMPs, and cosmetic ones unless cosmetic rules are on.
#[must_use]
pub fn filter_cmps(cmps: Vec<Arc<dyn CmpStrategy>>, config: &Config) -> Vec<Arc<dyn CmpStrategy>> {
    cmps.into_iter()
        .filter(|cmp| {
            let keep = !config.is_disabled(cmp.name()) && (config.enable_cosmetic_rules || !cmp.is_cosmetic());
            if !keep && config.logs.lifecycle {
                debug!(cmp = cmp.name(), "Skipping CMP");
            }
            keep
        })
        .collect()
}

/// Parses `rules` and applies the config filter.
#[must_use]
pub fn build_registry(rules: &RuleSet, config: &Config) -> Vec<Arc<dyn CmpStrategy>> {
    filter_cmps(parse_rules(rules), config)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::Rule;

    fn rules() -> RuleSet {
        let mut cosmetic = Rule::new("cosmetic-banner");
        cosmetic.cosmetic = true;
        RuleSet::from_json(
            r##"{
                "consentomatic": {"didomi.io": {"detectors": [], "methods": []}},
                "autoconsent": [{"name": "example", "detectCmp": [{"exists": "#cmp"}]}]
            }"##,
        )
        .map(|mut set| {
            set.autoconsent.push(cosmetic);
            set
        })
        .expect("rule set")
    }

    fn names(cmps: &[Arc<dyn CmpStrategy>]) -> Vec<String> {
        cmps.iter().map(|c| c.name().to_string()).collect()
    }

    #[test]
    fn test_order() {
        let names = names(&parse_rules(&rules()));
        assert_eq!(names.len(), vendors::builtin().len() + 3);
        assert_eq!(names[0], "TrustArc-top");
        assert_eq!(names[13], "Admiral");
        assert_eq!(names[14], "com_didomi.io");
        assert_eq!(names[15], "example");
        assert_eq!(names[16], "cosmetic-banner");
    }

    #[test]
    fn test_disabled_cmps_dropped() {
        let config = Config::new().with_disabled_cmp("Onetrust").with_disabled_cmp("example");
        let names = names(&build_registry(&rules(), &config));
        assert!(!names.iter().any(|n| n == "Onetrust" || n == "example"));
        assert!(names.iter().any(|n| n == "Klaro"));
    }

    #[test]
    fn test_cosmetic_filter() {
        let with = names(&build_registry(&rules(), &Config::new()));
        assert!(with.iter().any(|n| n == "cosmetic-banner"));

        let without = names(&build_registry(&rules(), &Config::new().with_cosmetic_rules(false)));
        assert!(!without.iter().any(|n| n == "cosmetic-banner"));
        assert_eq!(without.len(), with.len() - 1);
    }
}
