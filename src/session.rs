//! # Editing Session
//!
//! A session owns exactly one [`TableDocument`] and tracks whether it has unsaved edits.
//! Pulling a remote version never touches the owned document: [`Session::begin_pull`] only
//! classifies the differences, and [`Session::resolve`] applies the caller's explicit choice.
use crate::diff::diff;
use crate::diff::TableDiff;
use crate::request::ValidationError;
use crate::table::model::Column;
use crate::table::model::ColumnId;
use crate::table::model::ColumnKind;
use crate::table::model::Rule;
use crate::table::model::RuleId;
use crate::table::model::TableDocument;
use tracing::debug;
use tracing::info;

/// Definition of a column to append.
#[derive(Clone, Debug, PartialEq)]
pub struct NewColumn {
    pub kind: ColumnKind,
    pub label: String,
    pub object_binding: String,
    pub pattern_template: String,
}

/// Partial update of a column's header cells. `None` leaves the field as is.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColumnPatch {
    pub label: Option<String>,
    pub object_binding: Option<String>,
    pub pattern_template: Option<String>,
}

/// A pulled document waiting for the caller's decision.
#[derive(Clone, Debug, PartialEq)]
pub struct PendingPull {
    pub pulled: TableDocument,
    /// Remote content hash the pulled document was read at
    pub sha: Option<String>,
    pub diff: TableDiff,
    pub has_differences: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// Replace the local document with the pulled one
    AcceptPulled,
    /// Discard the pulled document
    KeepLocal,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum PullOutcome {
    Replaced,
    Kept,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Session {
    document: TableDocument,
    dirty: bool,
    base_sha: Option<String>,
    // Next free rule id and column index. Never lowered, so removed ids are not handed out again.
    next_rule_id: usize,
    next_column_index: usize,
}

/// First rule id and column index above everything `document` already uses.
fn first_free_ids(document: &TableDocument) -> (usize, usize) {
    let table = &document.rule_table;
    let rule = table.rules.iter().map(|rule| rule.id.position()).max().unwrap_or(0) + 1;
    let column = table
        .columns
        .iter()
        .map(|column| column.index.max(column.id.position()))
        .max()
        .unwrap_or(0)
        + 1;
    (rule, column)
}

impl Session {
    pub fn new(document: TableDocument) -> Self {
        let (next_rule_id, next_column_index) = first_free_ids(&document);
        Session {
            document,
            dirty: false,
            base_sha: None,
            next_rule_id,
            next_column_index,
        }
    }

    /// A session on a document read from the remote at content hash `sha`.
    pub fn from_remote(document: TableDocument, sha: &str) -> Self {
        Session {
            base_sha: Some(sha.to_owned()),
            ..Session::new(document)
        }
    }

    /// Remote content hash the next commit is expected to replace.
    pub fn base_sha(&self) -> Option<&str> {
        self.base_sha.as_deref()
    }

    pub fn set_base_sha(&mut self, sha: &str) {
        self.base_sha = Some(sha.to_owned());
    }

    pub fn document(&self) -> &TableDocument {
        &self.document
    }

    pub fn into_document(self) -> TableDocument {
        self.document
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    fn rule_mut(&mut self, id: RuleId) -> Result<&mut Rule, ValidationError> {
        self.document
            .rule_table
            .rules
            .iter_mut()
            .find(|rule| rule.id == id)
            .ok_or(ValidationError::RuleNotFound(id))
    }

    fn column(&self, id: ColumnId) -> Result<&Column, ValidationError> {
        self.document.rule_table.column(id).ok_or(ValidationError::ColumnNotFound(id))
    }

    /// Edits one cell: the NAME column renames the rule, CONDITION/ACTION columns set the entry
    /// value. Other kinds hold no per-rule value and are left alone.
    pub fn set_cell(&mut self, rule: RuleId, column: ColumnId, value: &str) -> Result<(), ValidationError> {
        let column = self.column(column)?.clone();
        let target = self.rule_mut(rule)?;
        match &column.kind {
            ColumnKind::Name => target.rule_name = value.trim().to_owned(),
            kind => match target.entries_mut(kind) {
                Some(entries) => {
                    entries
                        .entry(column.id)
                        .or_insert_with(|| column.entry(""))
                        .value = value.trim().to_owned();
                }
                None => return Ok(()),
            },
        }
        self.dirty = true;
        debug!(rule = %rule, column = %column.id, "Updated cell");
        Ok(())
    }

    /// Appends a rule with an empty entry for every value column.
    pub fn add_rule(&mut self, rule_name: &str) -> RuleId {
        let id = RuleId(self.next_rule_id);
        self.next_rule_id += 1;
        let table = &mut self.document.rule_table;
        let mut rule = Rule::new(id, rule_name.trim());
        for column in table.value_columns() {
            let entry = column.entry("");
            if let Some(entries) = rule.entries_mut(&column.kind) {
                entries.insert(column.id, entry);
            }
        }
        table.rules.push(rule);
        self.dirty = true;
        info!(rule = %id, name = rule_name, "Added rule");
        id
    }

    pub fn remove_rule(&mut self, id: RuleId) -> Result<Rule, ValidationError> {
        let rules = &mut self.document.rule_table.rules;
        let position = rules.iter().position(|rule| rule.id == id).ok_or(ValidationError::RuleNotFound(id))?;
        let removed = rules.remove(position);
        self.dirty = true;
        info!(rule = %id, "Removed rule");
        Ok(removed)
    }

    /// Appends a CONDITION or ACTION column after the last one and gives every rule an empty
    /// entry for it.
    pub fn add_column(&mut self, column: NewColumn) -> Result<ColumnId, ValidationError> {
        if !matches!(column.kind, ColumnKind::Condition | ColumnKind::Action) {
            return Err(ValidationError::UnsupportedColumnKind(column.kind.to_string()));
        }
        let index = self.next_column_index;
        self.next_column_index += 1;
        let table = &mut self.document.rule_table;
        let column = Column {
            id: ColumnId(index),
            index,
            kind: column.kind,
            object_binding: column.object_binding,
            pattern_template: column.pattern_template,
            label: column.label,
        };
        for rule in table.rules.iter_mut() {
            let entry = column.entry("");
            if let Some(entries) = rule.entries_mut(&column.kind) {
                entries.insert(column.id, entry);
            }
        }
        let id = column.id;
        info!(column = %id, kind = %column.kind, "Added column");
        table.columns.push(column);
        self.dirty = true;
        Ok(id)
    }

    /// Removes a column and its entries. Other columns keep their ids.
    pub fn remove_column(&mut self, id: ColumnId) -> Result<Column, ValidationError> {
        let table = &mut self.document.rule_table;
        let position = table.columns.iter().position(|column| column.id == id).ok_or(ValidationError::ColumnNotFound(id))?;
        let removed = table.columns.remove(position);
        for rule in table.rules.iter_mut() {
            rule.conditions.remove(&id);
            rule.actions.remove(&id);
        }
        self.dirty = true;
        info!(column = %id, "Removed column");
        Ok(removed)
    }

    /// Changes a column's header cells. Existing rule entries keep their old label and template
    /// until [`Session::propagate_column`] is called.
    pub fn update_column(&mut self, id: ColumnId, patch: ColumnPatch) -> Result<(), ValidationError> {
        let column = self
            .document
            .rule_table
            .columns
            .iter_mut()
            .find(|column| column.id == id)
            .ok_or(ValidationError::ColumnNotFound(id))?;
        if let Some(label) = patch.label {
            column.label = label;
        }
        if let Some(object_binding) = patch.object_binding {
            column.object_binding = object_binding;
        }
        if let Some(pattern_template) = patch.pattern_template {
            column.pattern_template = pattern_template;
        }
        self.dirty = true;
        debug!(column = %id, "Updated column");
        Ok(())
    }

    /// Copies a column's current label and template into every rule's entry for it.
    pub fn propagate_column(&mut self, id: ColumnId) -> Result<usize, ValidationError> {
        let column = self.column(id)?.clone();
        let mut updated = 0;
        for rule in self.document.rule_table.rules.iter_mut() {
            if let Some(entry) = rule.entries_mut(&column.kind).and_then(|entries| entries.get_mut(&id)) {
                entry.label = column.label.to_owned();
                entry.pattern_template = column.pattern_template.to_owned();
                updated += 1;
            }
        }
        if updated > 0 {
            self.dirty = true;
        }
        debug!(column = %id, rules = updated, "Propagated column header");
        Ok(updated)
    }

    /// Classifies a pulled document against the owned one without applying it.
    pub fn begin_pull(&self, pulled: TableDocument, sha: Option<String>) -> PendingPull {
        let diff = diff(&self.document, &pulled);
        let has_differences = !diff.is_empty();
        PendingPull {
            pulled,
            sha,
            diff,
            has_differences,
        }
    }

    /// Applies the caller's decision. Either way the pulled hash becomes the base for the next
    /// commit, so keeping local edits means overwriting the version that was just reviewed.
    pub fn resolve(&mut self, pending: PendingPull, resolution: Resolution) -> PullOutcome {
        if let Some(sha) = pending.sha.as_deref() {
            self.set_base_sha(sha);
        }
        match resolution {
            Resolution::AcceptPulled => {
                let (rule, column) = first_free_ids(&pending.pulled);
                self.next_rule_id = self.next_rule_id.max(rule);
                self.next_column_index = self.next_column_index.max(column);
                self.document = pending.pulled;
                self.dirty = false;
                info!(table = %self.document.rule_table.name, "Accepted pulled document");
                PullOutcome::Replaced
            }
            Resolution::KeepLocal => {
                info!(table = %self.document.rule_table.name, "Kept local document");
                PullOutcome::Kept
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        let mut session = Session::new(TableDocument::new("com.example.rules", "Offers"));
        session
            .add_column(NewColumn {
                kind: ColumnKind::Condition,
                label: "Age".to_owned(),
                object_binding: "$c:Customer".to_owned(),
                pattern_template: "$c.getAge() > ($param)".to_owned(),
            })
            .unwrap();
        session.add_rule("R1");
        session.mark_saved();
        session
    }

    #[test]
    fn new_rules_and_columns_fill_entries() {
        let mut session = session();
        let rule = session.add_rule("R2");
        assert_eq!(rule, RuleId(2));
        let column = session
            .add_column(NewColumn {
                kind: ColumnKind::Action,
                label: "Discount".to_owned(),
                object_binding: String::new(),
                pattern_template: "offer.setDiscount($param);".to_owned(),
            })
            .unwrap();
        assert_eq!(column, ColumnId(3));

        for rule in &session.document().rule_table.rules {
            assert_eq!(rule.conditions.len(), 1);
            assert_eq!(rule.actions[&ColumnId(3)].value, "");
        }
        assert!(session.is_dirty());
    }

    #[test]
    fn removed_ids_are_not_reused() {
        let mut session = session();
        let second = session.add_rule("R2");
        session.remove_rule(second).unwrap();
        assert_eq!(session.add_rule("R3"), RuleId(3));

        let new_column = || NewColumn {
            kind: ColumnKind::Action,
            label: "Discount".to_owned(),
            object_binding: String::new(),
            pattern_template: String::new(),
        };
        let action = session.add_column(new_column()).unwrap();
        assert_eq!(action, ColumnId(3));
        session.remove_column(action).unwrap();
        let replacement = session.add_column(new_column()).unwrap();
        assert_eq!(replacement, ColumnId(4));
        assert_eq!(session.document().rule_table.column(replacement).map(|column| column.index), Some(4));
    }

    #[test]
    fn set_cell_by_column_kind() {
        let mut session = session();
        session.set_cell(RuleId(1), ColumnId(2), " 30 ").unwrap();
        session.set_cell(RuleId(1), ColumnId(1), "Adults").unwrap();

        let rule = session.document().rule_table.rule(RuleId(1)).unwrap();
        assert_eq!(rule.rule_name, "Adults");
        assert_eq!(rule.conditions[&ColumnId(2)].value, "30");
        assert_eq!(session.set_cell(RuleId(9), ColumnId(2), "x"), Err(ValidationError::RuleNotFound(RuleId(9))));
    }

    #[test]
    fn removing_a_column_keeps_other_ids() {
        let mut session = session();
        let action = session
            .add_column(NewColumn {
                kind: ColumnKind::Action,
                label: "Discount".to_owned(),
                object_binding: String::new(),
                pattern_template: String::new(),
            })
            .unwrap();
        session.remove_column(ColumnId(2)).unwrap();

        let table = &session.document().rule_table;
        let ids: Vec<_> = table.columns.iter().map(|column| column.id).collect();
        assert_eq!(ids, vec![ColumnId(1), action]);
        assert!(table.rules[0].conditions.is_empty());
        assert!(table.rules[0].actions.contains_key(&action));
    }

    #[test]
    fn only_value_columns_can_be_added() {
        let mut session = session();
        let result = session.add_column(NewColumn {
            kind: ColumnKind::Name,
            label: "Name".to_owned(),
            object_binding: String::new(),
            pattern_template: String::new(),
        });
        assert_eq!(result, Err(ValidationError::UnsupportedColumnKind("NAME".to_owned())));
    }

    #[test]
    fn column_updates_need_propagation() {
        let mut session = session();
        session
            .update_column(ColumnId(2), ColumnPatch { label: Some("Customer age".to_owned()), ..Default::default() })
            .unwrap();
        let entry = |session: &Session| session.document().rule_table.rules[0].conditions[&ColumnId(2)].label.to_owned();
        assert_eq!(entry(&session), "Age");

        assert_eq!(session.propagate_column(ColumnId(2)), Ok(1));
        assert_eq!(entry(&session), "Customer age");
    }

    #[test]
    fn pull_is_applied_only_on_request() {
        let mut session = session();
        session.set_cell(RuleId(1), ColumnId(2), "30").unwrap();

        let mut pulled = session.document().clone();
        pulled.rule_table.rules[0].conditions.get_mut(&ColumnId(2)).unwrap().value = "35".to_owned();

        let pending = session.begin_pull(pulled.clone(), Some("abc".to_owned()));
        assert!(pending.has_differences);
        assert_eq!(pending.diff.modified.len(), 1);
        assert_eq!(session.resolve(pending, Resolution::KeepLocal), PullOutcome::Kept);
        assert!(session.is_dirty());
        assert_ne!(session.document(), &pulled);
        assert_eq!(session.base_sha(), Some("abc"));

        let pending = session.begin_pull(pulled.clone(), None);
        assert_eq!(session.resolve(pending, Resolution::AcceptPulled), PullOutcome::Replaced);
        assert!(!session.is_dirty());
        assert_eq!(session.document(), &pulled);
    }
}
