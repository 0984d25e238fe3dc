//! Normalized decision-table model shared by the extractors, the serializer and the diff engine.

use regex::Regex;
use serde::de::Error as DeError;
use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use std::collections::BTreeMap;
use std::fmt::Display;
use std::str::FromStr;
use std::sync::OnceLock;

/// Conventional anchor row; the serializer always writes the table declaration here.
pub const DEFAULT_ANCHOR_ROW: usize = 6;

/// Label written for the rule-name column when no NAME column is declared.
pub const DEFAULT_NAME_LABEL: &str = "Rule Name";

/// Worksheet name used when a document carries none.
pub const DEFAULT_WORKSHEET_NAME: &str = "Rules";

fn id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(col|rule)_([1-9][0-9]*)$").expect("Hardcode regex pattern"))
}

/// Parses `"{prefix}_{n}"` into `n`.
fn parse_id(text: &str, prefix: &str) -> Option<usize> {
    let captures = id_pattern().captures(text)?;
    if captures.get(1)?.as_str() != prefix {
        return None;
    }
    captures.get(2)?.as_str().parse().ok()
}

macro_rules! positional_id {
    ($name:ident, $prefix:literal, $what:literal) => {
        #[doc = concat!("Synthetic ", $what, " identifier derived from a physical sheet position, rendered as `", $prefix, "_{n}`.")]
        #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub usize);

        impl $name {
            pub fn position(&self) -> usize {
                self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}_{}", $prefix, self.0)
            }
        }

        impl FromStr for $name {
            type Err = String;

            fn from_str(text: &str) -> Result<Self, Self::Err> {
                parse_id(text, $prefix)
                    .map($name)
                    .ok_or_else(|| format!("invalid {} id '{}'", $what, text))
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let text = String::deserialize(deserializer)?;
                text.parse().map_err(D::Error::custom)
            }
        }
    };
}

positional_id!(ColumnId, "col", "column");
positional_id!(RuleId, "rule", "rule");

/// Header metadata from rows 1-4. `None` means the marker was absent, which is distinct from a
/// present-but-empty value.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule_set: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imports: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variables: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Declared kind of a column. Unrecognized kinds are kept verbatim.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    Name,
    Condition,
    Action,
    Other(String),
}

impl ColumnKind {
    pub fn parse(text: &str) -> Self {
        match text {
            "NAME" => ColumnKind::Name,
            "CONDITION" => ColumnKind::Condition,
            "ACTION" => ColumnKind::Action,
            other => ColumnKind::Other(other.to_owned()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ColumnKind::Name => "NAME",
            ColumnKind::Condition => "CONDITION",
            ColumnKind::Action => "ACTION",
            ColumnKind::Other(text) => text,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, ColumnKind::Other(_))
    }
}

impl Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for ColumnKind {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ColumnKind {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(ColumnKind::parse(&String::deserialize(deserializer)?))
    }
}

/// One declared sheet column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub id: ColumnId,
    /// 1-based physical sheet column
    pub index: usize,
    #[serde(rename = "type")]
    pub kind: ColumnKind,
    pub object_binding: String,
    pub pattern_template: String,
    pub label: String,
}

impl Column {
    /// Snapshot of this column's label and template carrying a cell value.
    pub fn entry(&self, value: &str) -> CellEntry {
        CellEntry {
            label: self.label.to_owned(),
            pattern_template: self.pattern_template.to_owned(),
            value: value.to_owned(),
        }
    }
}

/// A rule's value for one condition or action column, with the column's label and template
/// copied at extraction time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CellEntry {
    pub label: String,
    pub pattern_template: String,
    pub value: String,
}

/// One rule row.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub id: RuleId,
    /// Sheet row the rule was read from; not used when writing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub row_index: Option<usize>,
    pub rule_name: String,
    #[serde(default)]
    pub conditions: BTreeMap<ColumnId, CellEntry>,
    #[serde(default)]
    pub actions: BTreeMap<ColumnId, CellEntry>,
}

impl Rule {
    pub fn new(id: RuleId, rule_name: &str) -> Self {
        Rule {
            id,
            row_index: None,
            rule_name: rule_name.to_owned(),
            conditions: BTreeMap::new(),
            actions: BTreeMap::new(),
        }
    }

    /// Compares what a rule says, ignoring where it sits in the sheet.
    pub fn same_content(&self, other: &Rule) -> bool {
        self.rule_name == other.rule_name
            && self.conditions == other.conditions
            && self.actions == other.actions
    }

    /// The slot a column of the given kind files its values into.
    pub fn entries_mut(&mut self, kind: &ColumnKind) -> Option<&mut BTreeMap<ColumnId, CellEntry>> {
        match kind {
            ColumnKind::Condition => Some(&mut self.conditions),
            ColumnKind::Action => Some(&mut self.actions),
            _ => None,
        }
    }

    pub fn entries(&self, kind: &ColumnKind) -> Option<&BTreeMap<ColumnId, CellEntry>> {
        match kind {
            ColumnKind::Condition => Some(&self.conditions),
            ColumnKind::Action => Some(&self.actions),
            _ => None,
        }
    }

    /// Value stored for a column, if the column's kind has a slot and the rule has an entry.
    pub fn value(&self, column: &Column) -> Option<&str> {
        self.entries(&column.kind)?
            .get(&column.id)
            .map(|entry| entry.value.as_str())
    }
}

/// Sheet rows of the header block, all derived from the anchor row.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeaderRows {
    pub column_types: usize,
    pub object_binding: usize,
    pub pattern_templates: usize,
    pub column_labels: usize,
    pub first_rule_row: usize,
}

impl HeaderRows {
    pub fn from_anchor(anchor: usize) -> Self {
        HeaderRows {
            column_types: anchor + 1,
            object_binding: anchor + 2,
            pattern_templates: anchor + 3,
            column_labels: anchor + 4,
            first_rule_row: anchor + 5,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleTable {
    pub name: String,
    pub columns: Vec<Column>,
    pub rules: Vec<Rule>,
    /// Anchor row recorded at parse time
    pub start_row: usize,
    pub header_rows: HeaderRows,
}

impl RuleTable {
    /// An empty table with only the conventional NAME column, anchored at row 6.
    pub fn new(name: &str) -> Self {
        RuleTable {
            name: name.to_owned(),
            columns: vec![Column {
                id: ColumnId(1),
                index: 1,
                kind: ColumnKind::Name,
                object_binding: String::new(),
                pattern_template: String::new(),
                label: DEFAULT_NAME_LABEL.to_owned(),
            }],
            rules: Vec::new(),
            start_row: DEFAULT_ANCHOR_ROW,
            header_rows: HeaderRows::from_anchor(DEFAULT_ANCHOR_ROW),
        }
    }

    pub fn column(&self, id: ColumnId) -> Option<&Column> {
        self.columns.iter().find(|column| column.id == id)
    }

    pub fn rule(&self, id: RuleId) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.id == id)
    }

    /// Columns whose values are stored per rule (everything except physical column 1).
    pub fn value_columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter().filter(|column| column.index != 1)
    }
}

/// The unit passed across the codec boundary and compared by the diff engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableDocument {
    pub metadata: Metadata,
    pub rule_table: RuleTable,
    pub worksheet_name: String,
    /// Informational extent of the sheet the document was read from
    #[serde(default)]
    pub total_rows: usize,
    #[serde(default)]
    pub total_columns: usize,
}

impl TableDocument {
    /// A new, empty table.
    pub fn new(rule_set: &str, table_name: &str) -> Self {
        TableDocument {
            metadata: Metadata {
                rule_set: Some(rule_set.to_owned()),
                ..Default::default()
            },
            rule_table: RuleTable::new(table_name),
            worksheet_name: DEFAULT_WORKSHEET_NAME.to_owned(),
            total_rows: 0,
            total_columns: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_render_and_parse() {
        assert_eq!(ColumnId(3).to_string(), "col_3");
        assert_eq!(RuleId(11).to_string(), "rule_11");
        assert_eq!("col_12".parse::<ColumnId>(), Ok(ColumnId(12)));
        assert!("rule_12".parse::<ColumnId>().is_err());
        assert!("col_0".parse::<ColumnId>().is_err());
        assert!("col_x".parse::<ColumnId>().is_err());
    }

    #[test]
    fn unknown_kinds_are_kept_verbatim() {
        assert_eq!(ColumnKind::parse("CONDITION"), ColumnKind::Condition);
        assert_eq!(ColumnKind::parse("PRIORITY"), ColumnKind::Other("PRIORITY".to_owned()));
        assert_eq!(ColumnKind::parse("PRIORITY").as_str(), "PRIORITY");
        assert!(!ColumnKind::parse("condition").is_recognized());
    }

    #[test]
    fn header_rows_follow_anchor() {
        let rows = HeaderRows::from_anchor(6);
        assert_eq!(
            (rows.column_types, rows.object_binding, rows.pattern_templates, rows.column_labels, rows.first_rule_row),
            (7, 8, 9, 10, 11)
        );
    }

    #[test]
    fn same_content_ignores_position() {
        let mut first = Rule::new(RuleId(11), "R1");
        first.conditions.insert(ColumnId(2), CellEntry { value: "30".to_owned(), ..Default::default() });
        let mut second = first.clone();
        second.id = RuleId(14);
        second.row_index = Some(14);
        assert!(first.same_content(&second));

        second.conditions.get_mut(&ColumnId(2)).unwrap().value = "31".to_owned();
        assert!(!first.same_content(&second));
    }

    #[test]
    fn json_shape_uses_string_ids() {
        let mut rule = Rule::new(RuleId(11), "R1");
        rule.actions.insert(ColumnId(3), CellEntry { value: "10".to_owned(), ..Default::default() });
        let json = serde_json::to_value(&rule).unwrap();
        assert_eq!(json["id"], "rule_11");
        assert_eq!(json["ruleName"], "R1");
        assert_eq!(json["actions"]["col_3"]["value"], "10");

        let back: Rule = serde_json::from_value(json).unwrap();
        assert_eq!(back, rule);
    }
}
