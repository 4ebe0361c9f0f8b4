//! Keyword tagging for imported transactions
//!
//! Rules are loaded once per import into a [`TagRuleMatcher`] snapshot. Every
//! rule whose keyword appears in a label contributes its tag, so one label can
//! pick up several tags. Priority only fixes the evaluation order.

use std::collections::BTreeSet;

use tracing::debug;

use crate::db::Database;
use crate::error::Result;
use crate::models::TaggingRule;

struct CompiledRule {
    rule: TaggingRule,
    /// Lowercased keyword
    needle: String,
}

/// Snapshot of the tagging rules for one run
pub struct TagRuleMatcher {
    rules: Vec<CompiledRule>,
}

impl TagRuleMatcher {
    /// Build a matcher from an explicit rule set.
    ///
    /// Rules are ordered by priority (highest first), then by id. Rules with a
    /// blank keyword would match everything and are dropped.
    pub fn new(mut rules: Vec<TaggingRule>) -> Self {
        rules.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.id.cmp(&b.id)));

        let rules = rules
            .into_iter()
            .filter_map(|rule| {
                let needle = rule.keyword.trim().to_lowercase();
                if needle.is_empty() {
                    None
                } else {
                    Some(CompiledRule { rule, needle })
                }
            })
            .collect();

        Self { rules }
    }

    /// Load the current rules from the database
    pub fn from_db(db: &Database) -> Result<Self> {
        let rules: Vec<TaggingRule> = db
            .list_tagging_rules()?
            .into_iter()
            .map(|r| r.rule)
            .collect();
        debug!("Loaded {} tagging rules", rules.len());
        Ok(Self::new(rules))
    }

    /// Tag IDs of every rule matching `label`
    pub fn match_label(&self, label: &str) -> BTreeSet<i64> {
        self.matching_rules(label)
            .into_iter()
            .map(|rule| rule.tag_id)
            .collect()
    }

    /// Matching rules in evaluation order
    pub fn matching_rules(&self, label: &str) -> Vec<&TaggingRule> {
        let label = label.trim().to_lowercase();
        if label.is_empty() {
            return Vec::new();
        }

        self.rules
            .iter()
            .filter(|compiled| label.contains(&compiled.needle))
            .map(|compiled| &compiled.rule)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
