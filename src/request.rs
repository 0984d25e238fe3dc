//! Programmatic construction of a [`TableDocument`] from a JSON generate request.
//!
//! The request mirrors the document's JSON shape but every field is optional at the serde level,
//! so that missing required fields are reported as a [`ValidationError`] naming the field rather
//! than as an opaque deserialization failure.

use crate::table::model::CellEntry;
use crate::table::model::Column;
use crate::table::model::ColumnId;
use crate::table::model::ColumnKind;
use crate::table::model::Metadata;
use crate::table::model::Rule;
use crate::table::model::RuleId;
use crate::table::model::RuleTable;
use crate::table::model::TableDocument;
use crate::table::model::DEFAULT_WORKSHEET_NAME;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::collections::HashSet;
use thiserror::Error;

/// A caller-supplied shape is malformed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("'{field}' is required")]
    MissingField { field: String },

    #[error("'{field}' has invalid column type '{kind}', expected NAME, CONDITION or ACTION")]
    InvalidColumnType { field: String, kind: String },

    #[error("'{field}' has malformed id '{id}'")]
    InvalidId { field: String, id: String },

    #[error("Duplicate column index {index}")]
    DuplicateColumnIndex { index: usize },

    #[error("Duplicate column id '{id}'")]
    DuplicateColumnId { id: ColumnId },

    #[error("Rule '{rule}' references unknown column '{column}'")]
    UnknownColumn { rule: String, column: String },

    #[error("Rule '{rule}' stores column '{column}' under the wrong kind")]
    MisplacedEntry { rule: String, column: String },

    #[error("Rule '{0}' not found")]
    RuleNotFound(RuleId),

    #[error("Column '{0}' not found")]
    ColumnNotFound(ColumnId),

    #[error("Column kind '{0}' cannot be added; only CONDITION and ACTION are supported")]
    UnsupportedColumnKind(String),

    #[error("Invalid repository file location '{url}': {reason}")]
    InvalidLocation { url: String, reason: String },

    #[error("Only Excel files ({accepted}) are allowed, got '{name}'")]
    UnsupportedFile { name: String, accepted: String },

    #[error("Uploaded file '{name}' is empty")]
    EmptyUpload { name: String },

    #[error("File size {size} exceeds the limit of {limit} bytes")]
    FileTooLarge { size: usize, limit: usize },
}

fn missing(field: &str) -> ValidationError {
    ValidationError::MissingField { field: field.to_owned() }
}

fn required_text(value: Option<String>, field: &str) -> Result<String, ValidationError> {
    value.filter(|text| !text.trim().is_empty()).ok_or_else(|| missing(field))
}

fn default_worksheet_name() -> String {
    DEFAULT_WORKSHEET_NAME.to_owned()
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub metadata: Option<MetadataRequest>,
    pub rule_table: Option<RuleTableRequest>,
    #[serde(default = "default_worksheet_name")]
    pub worksheet_name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetadataRequest {
    pub rule_set: Option<String>,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub variables: Vec<String>,
    #[serde(default)]
    pub notes: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleTableRequest {
    pub name: Option<String>,
    pub columns: Option<Vec<ColumnRequest>>,
    pub rules: Option<Vec<RuleRequest>>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnRequest {
    pub id: Option<String>,
    pub index: Option<usize>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub object_binding: String,
    #[serde(default)]
    pub pattern_template: String,
    pub label: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleRequest {
    pub id: Option<String>,
    pub rule_name: Option<String>,
    #[serde(default)]
    pub conditions: BTreeMap<String, EntryRequest>,
    #[serde(default)]
    pub actions: BTreeMap<String, EntryRequest>,
}

/// Only `value` is taken from the request; label and template are copied from the column.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryRequest {
    #[serde(default)]
    pub value: Value,
}

impl EntryRequest {
    fn render(&self) -> String {
        match &self.value {
            Value::Null => String::new(),
            Value::String(text) => text.trim().to_owned(),
            other => other.to_string(),
        }
    }
}

impl GenerateRequest {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Validates the request and builds the document.
    ///
    /// Every rule ends up with exactly one entry per CONDITION/ACTION column; entries the request
    /// leaves out are filled with empty values.
    pub fn into_document(self) -> Result<TableDocument, ValidationError> {
        let metadata = self.metadata.ok_or_else(|| missing("metadata"))?;
        let table = self.rule_table.ok_or_else(|| missing("ruleTable"))?;

        let metadata = Metadata {
            rule_set: Some(required_text(metadata.rule_set, "metadata.ruleSet")?),
            imports: Some(metadata.imports),
            variables: Some(metadata.variables),
            notes: Some(metadata.notes),
        };
        let name = required_text(table.name, "ruleTable.name")?;
        let columns = build_columns(table.columns.ok_or_else(|| missing("ruleTable.columns"))?)?;
        let rules = table
            .rules
            .ok_or_else(|| missing("ruleTable.rules"))?
            .into_iter()
            .enumerate()
            .map(|(position, rule)| build_rule(position, rule, &columns))
            .collect::<Result<Vec<_>, _>>()?;

        let mut rule_table = RuleTable::new(&name);
        rule_table.columns = columns;
        rule_table.rules = rules;
        Ok(TableDocument {
            metadata,
            rule_table,
            worksheet_name: self.worksheet_name,
            total_rows: 0,
            total_columns: 0,
        })
    }
}

fn build_columns(requests: Vec<ColumnRequest>) -> Result<Vec<Column>, ValidationError> {
    let mut seen = HashSet::new();
    let mut seen_ids = HashSet::new();
    let mut columns = Vec::with_capacity(requests.len());
    for (position, request) in requests.into_iter().enumerate() {
        let field = |name: &str| format!("ruleTable.columns[{}].{}", position, name);
        let id_text = required_text(request.id, &field("id"))?;
        let id = id_text
            .parse::<ColumnId>()
            .map_err(|_| ValidationError::InvalidId { field: field("id"), id: id_text.to_owned() })?;
        let index = request.index.filter(|index| *index > 0).ok_or_else(|| missing(&field("index")))?;
        let kind_text = required_text(request.kind, &field("type"))?;
        let kind = ColumnKind::parse(&kind_text);
        if !kind.is_recognized() {
            return Err(ValidationError::InvalidColumnType { field: field("type"), kind: kind_text });
        }
        if !seen.insert(index) {
            return Err(ValidationError::DuplicateColumnIndex { index });
        }
        if !seen_ids.insert(id) {
            return Err(ValidationError::DuplicateColumnId { id });
        }
        columns.push(Column {
            id,
            index,
            kind,
            object_binding: request.object_binding,
            pattern_template: request.pattern_template,
            label: required_text(request.label, &field("label"))?,
        });
    }
    columns.sort_by_key(|column| column.index);
    Ok(columns)
}

fn build_rule(position: usize, request: RuleRequest, columns: &[Column]) -> Result<Rule, ValidationError> {
    let field = |name: &str| format!("ruleTable.rules[{}].{}", position, name);
    let id_text = required_text(request.id, &field("id"))?;
    let id = id_text
        .parse::<RuleId>()
        .map_err(|_| ValidationError::InvalidId { field: field("id"), id: id_text.to_owned() })?;
    let rule_name = required_text(request.rule_name, &field("ruleName"))?;
    let mut rule = Rule::new(id, rule_name.trim());

    let supplied = [(ColumnKind::Condition, &request.conditions), (ColumnKind::Action, &request.actions)];
    for (slot, entries) in supplied {
        for key in entries.keys() {
            let column = key
                .parse::<ColumnId>()
                .ok()
                .and_then(|id| columns.iter().find(|column| column.id == id))
                .ok_or_else(|| ValidationError::UnknownColumn { rule: rule_name.to_owned(), column: key.to_owned() })?;
            if column.kind != slot {
                return Err(ValidationError::MisplacedEntry { rule: rule_name.to_owned(), column: key.to_owned() });
            }
        }
    }

    for column in columns.iter().filter(|column| column.index != 1) {
        let supplied = match column.kind {
            ColumnKind::Condition => &request.conditions,
            ColumnKind::Action => &request.actions,
            _ => continue,
        };
        let value = supplied
            .get(&column.id.to_string())
            .map(EntryRequest::render)
            .unwrap_or_default();
        let entry: CellEntry = column.entry(&value);
        if let Some(entries) = rule.entries_mut(&column.kind) {
            entries.insert(column.id, entry);
        }
    }
    Ok(rule)
}
