//! Rule-level classification of two independently parsed documents.
//!
//! Rules are matched by name. Nothing is merged here; the caller decides what to do with the
//! result.

use crate::table::model::Rule;
use crate::table::model::TableDocument;
use serde::Deserialize;
use serde::Serialize;
use std::collections::HashMap;
use tracing::info;

/// A rule present on both sides whose content differs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModifiedRule {
    pub pulled: Rule,
    pub current: Rule,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDiff {
    /// Pulled rules with no counterpart in the current document
    pub added: Vec<Rule>,
    /// Current rules with no counterpart in the pulled document
    pub deleted: Vec<Rule>,
    pub modified: Vec<ModifiedRule>,
    pub columns_changed: bool,
}

impl TableDiff {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.deleted.is_empty() && self.modified.is_empty() && !self.columns_changed
    }
}

/// Name-keyed lookup. With duplicate names the later rule wins.
fn by_name(rules: &[Rule]) -> HashMap<&str, &Rule> {
    rules.iter().map(|rule| (rule.rule_name.as_str(), rule)).collect()
}

/// Classifies every rule of `pulled` against `current`.
///
/// Added and modified rules follow the pulled document's order, deleted rules follow the current
/// document's order.
pub fn diff(current: &TableDocument, pulled: &TableDocument) -> TableDiff {
    let current_rules = by_name(&current.rule_table.rules);
    let pulled_rules = by_name(&pulled.rule_table.rules);

    let mut result = TableDiff::default();
    for rule in &pulled.rule_table.rules {
        match current_rules.get(rule.rule_name.as_str()) {
            None => result.added.push(rule.clone()),
            Some(existing) if !rule.same_content(existing) => result.modified.push(ModifiedRule {
                pulled: rule.clone(),
                current: (*existing).clone(),
            }),
            Some(_) => {}
        }
    }
    for rule in &current.rule_table.rules {
        if !pulled_rules.contains_key(rule.rule_name.as_str()) {
            result.deleted.push(rule.clone());
        }
    }
    result.columns_changed = current.rule_table.columns != pulled.rule_table.columns;

    info!(
        added = result.added.len(),
        deleted = result.deleted.len(),
        modified = result.modified.len(),
        columns_changed = result.columns_changed,
        "Compared decision tables"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::model::CellEntry;
    use crate::table::model::ColumnId;
    use crate::table::model::RuleId;

    fn rule(row: usize, name: &str, value: &str) -> Rule {
        let mut rule = Rule::new(RuleId(row), name);
        rule.conditions.insert(
            ColumnId(2),
            CellEntry {
                label: "Age".to_owned(),
                pattern_template: "$c.getAge() > ($param)".to_owned(),
                value: value.to_owned(),
            },
        );
        rule
    }

    fn document(rules: Vec<Rule>) -> TableDocument {
        let mut document = TableDocument::new("com.example.rules", "Offers");
        document.rule_table.rules = rules;
        document
    }

    #[test]
    fn identical_documents_have_no_differences() {
        let doc = document(vec![rule(11, "R1", "30"), rule(12, "R2", "40")]);
        let result = diff(&doc, &doc);
        assert!(result.is_empty());
    }

    #[test]
    fn classifies_by_name() {
        let current = document(vec![rule(11, "R1", "30"), rule(12, "R2", "40")]);
        let pulled = document(vec![rule(11, "R2", "41"), rule(12, "R3", "50")]);

        let result = diff(&current, &pulled);
        let names = |rules: &[Rule]| rules.iter().map(|rule| rule.rule_name.to_owned()).collect::<Vec<_>>();
        assert_eq!(names(&result.added), vec!["R3"]);
        assert_eq!(names(&result.deleted), vec!["R1"]);
        assert_eq!(result.modified.len(), 1);
        assert_eq!(result.modified[0].pulled.conditions[&ColumnId(2)].value, "41");
        assert_eq!(result.modified[0].current.conditions[&ColumnId(2)].value, "40");
        assert!(!result.columns_changed);
    }

    #[test]
    fn moved_rules_are_unchanged() {
        let current = document(vec![rule(11, "R1", "30"), rule(12, "R2", "40")]);
        let pulled = document(vec![rule(11, "R2", "40"), rule(14, "R1", "30")]);
        assert!(diff(&current, &pulled).is_empty());
    }

    #[test]
    fn column_changes_are_flagged() {
        let current = document(vec![]);
        let mut pulled = document(vec![]);
        pulled.rule_table.columns[0].label = "Name".to_owned();
        let result = diff(&current, &pulled);
        assert!(result.columns_changed);
        assert!(!result.is_empty());
    }

    #[test]
    fn duplicate_names_collapse_to_the_last() {
        let current = document(vec![rule(11, "R1", "30"), rule(12, "R1", "31")]);
        let pulled = document(vec![rule(11, "R1", "31")]);
        let result = diff(&current, &pulled);
        assert!(result.modified.is_empty());
        assert!(result.deleted.is_empty());
    }
}
