//! Data models for study sessions.
//!
//! This module contains the core data structures shared by the record
//! store, the aggregator and the report generator: record categories,
//! field values, records and the tabular view of a dataset.

use crate::analysis::CategoryReport;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of the field the store stamps on every record.
pub const TIMESTAMP_FIELD: &str = "timestamp";

/// Kind of record collected during a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Participant consent
    Consent,
    /// Demographic questionnaire
    Demographic,
    /// Per-task performance observation
    Task,
    /// Exit questionnaire
    Exit,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl Category {
    /// All categories, in report order.
    pub const ALL: [Category; 4] = [
        Category::Consent,
        Category::Demographic,
        Category::Task,
        Category::Exit,
    ];

    /// Stable lowercase name.
    pub fn name(&self) -> &'static str {
        match self {
            Category::Consent => "consent",
            Category::Demographic => "demographic",
            Category::Task => "task",
            Category::Exit => "exit",
        }
    }

    /// File name of the dataset backing this category.
    pub fn file_name(&self) -> String {
        format!("{}_data.csv", self.name())
    }

    /// Human-readable heading used in reports.
    pub fn title(&self) -> &'static str {
        match self {
            Category::Consent => "Consent Data",
            Category::Demographic => "Demographic Data",
            Category::Task => "Task Performance Data",
            Category::Exit => "Exit Questionnaire Data",
        }
    }

    /// Phrase used when a dataset has no rows yet.
    pub fn empty_label(&self) -> &'static str {
        match self {
            Category::Consent => "consent",
            Category::Demographic => "demographic",
            Category::Task => "task",
            Category::Exit => "exit questionnaire",
        }
    }

    /// Fields the presentation layer submits for this category.
    ///
    /// Informational only; the store does not enforce it.
    #[cfg(test)]
    pub fn expected_fields(&self) -> &'static [&'static str] {
        match self {
            Category::Consent => &["timestamp", "name", "consent_given"],
            Category::Demographic => &["timestamp", "name", "age", "occupation", "familiarity"],
            Category::Task => &["timestamp", "task_name", "success", "duration_seconds", "notes"],
            Category::Exit => &["timestamp", "satisfaction", "difficulty", "q1", "q2", "q3"],
        }
    }

    /// Position of this category in [`Category::ALL`].
    pub fn index(&self) -> usize {
        match self {
            Category::Consent => 0,
            Category::Demographic => 1,
            Category::Task => 2,
            Category::Exit => 3,
        }
    }
}

/// A scalar field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => write!(f, "{}", s),
            FieldValue::Integer(n) => write!(f, "{}", n),
            FieldValue::Float(x) => write!(f, "{}", x),
            FieldValue::Boolean(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Integer(n)
    }
}

impl From<u32> for FieldValue {
    fn from(n: u32) -> Self {
        FieldValue::Integer(i64::from(n))
    }
}

impl From<u8> for FieldValue {
    fn from(n: u8) -> Self {
        FieldValue::Integer(i64::from(n))
    }
}

impl From<f64> for FieldValue {
    fn from(x: f64) -> Self {
        FieldValue::Float(x)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        FieldValue::Boolean(b)
    }
}

/// A single submission: an ordered mapping from field name to value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    fields: Vec<(String, FieldValue)>,
}

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Record::insert`].
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets a field. An existing field keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<FieldValue>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }

    /// Stamps the timestamp field as the first field, replacing any
    /// caller-supplied value.
    pub fn stamp(&mut self, timestamp: String) {
        self.fields.retain(|(n, _)| n != TIMESTAMP_FIELD);
        self.fields
            .insert(0, (TIMESTAMP_FIELD.to_string(), FieldValue::Text(timestamp)));
    }

    /// Returns the value of a field.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Field names in insertion order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }
}

/// One row of a [`Table`]; one optional cell per column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    cells: Vec<Option<String>>,
}

impl Row {
    /// Cell at a column position. Empty cells read as `None`.
    pub fn cell(&self, index: usize) -> Option<&str> {
        self.cells.get(index).and_then(|c| c.as_deref())
    }

    /// All cells in column order.
    pub fn cells(&self) -> &[Option<String>] {
        &self.cells
    }
}

/// Tabular view of a dataset: the header plus rows in append order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Row>,
    /// Indices of rows whose stored field count differed from the header.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    drifted_rows: Vec<usize>,
}

impl Table {
    /// A table with no columns and no rows.
    pub fn empty() -> Self {
        Self::default()
    }

    /// A table with the given header and no rows.
    pub fn with_columns(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            drifted_rows: Vec::new(),
        }
    }

    /// Appends a raw row of text fields, aligning it to the header.
    ///
    /// Short rows are padded with missing cells and long rows truncated;
    /// either case marks the row as drifted. Empty text is a missing cell.
    pub fn push_raw<I, S>(&mut self, fields: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut cells: Vec<Option<String>> = fields
            .into_iter()
            .map(|f| {
                let f = f.as_ref();
                if f.is_empty() {
                    None
                } else {
                    Some(f.to_string())
                }
            })
            .collect();

        if cells.len() != self.columns.len() {
            self.drifted_rows.push(self.rows.len());
            cells.resize(self.columns.len(), None);
        }

        self.rows.push(Row { cells });
    }

    /// Column names in order.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows in append order.
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Rows whose stored field count differed from the header.
    pub fn drifted_rows(&self) -> &[usize] {
        &self.drifted_rows
    }

    /// Position of a column by name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cells of one column, in row order. `None` if the column is absent.
    pub fn column(&self, name: &str) -> Option<impl Iterator<Item = Option<&str>> + '_> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |r| r.cell(idx)))
    }

    /// Cell at (row, column name).
    #[cfg(test)]
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row).and_then(|r| r.cell(idx))
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Metadata about a generated study report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportMetadata {
    /// Local time the report was generated.
    pub generated_at: NaiveDateTime,
    /// Directory the datasets were read from.
    pub data_dir: String,
    /// Rows across all categories.
    pub total_records: usize,
}

/// The aggregated study report: one section per category, in report order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudyReport {
    pub metadata: ReportMetadata,
    pub sections: Vec<CategoryReport>,
}

impl StudyReport {
    /// Section for one category.
    #[cfg(test)]
    pub fn section(&self, category: Category) -> Option<&CategoryReport> {
        self.sections.iter().find(|s| s.category == category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_category_names_and_files() {
        assert_eq!(Category::Consent.name(), "consent");
        assert_eq!(Category::Demographic.file_name(), "demographic_data.csv");
        assert_eq!(Category::Exit.to_string(), "exit");
        for (i, category) in Category::ALL.iter().enumerate() {
            assert_eq!(category.index(), i);
            assert_eq!(category.expected_fields()[0], TIMESTAMP_FIELD);
        }
    }

    #[test]
    fn test_field_value_display() {
        assert_eq!(FieldValue::from("Yes").to_string(), "Yes");
        assert_eq!(FieldValue::from(42u32).to_string(), "42");
        assert_eq!(FieldValue::from(12.5).to_string(), "12.5");
        assert_eq!(FieldValue::from(true).to_string(), "true");
    }

    #[test]
    fn test_record_insert_replaces_in_place() {
        let mut record = Record::new().with("a", 1i64).with("b", "x");
        record.insert("a", 2i64);

        let names: Vec<_> = record.field_names().collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(record.get("a"), Some(&FieldValue::Integer(2)));
    }

    #[test]
    fn test_record_stamp_goes_first_and_overrides() {
        let mut record = Record::new()
            .with("name", "Ada")
            .with(TIMESTAMP_FIELD, "caller-supplied");
        record.stamp("2024-05-01 10:00:00".to_string());

        let names: Vec<_> = record.field_names().collect();
        assert_eq!(names, vec!["timestamp", "name"]);
        assert_eq!(
            record.get(TIMESTAMP_FIELD),
            Some(&FieldValue::from("2024-05-01 10:00:00"))
        );
    }

    #[test]
    fn test_table_push_raw_aligns_to_header() {
        let mut table = Table::with_columns(vec!["a".into(), "b".into(), "c".into()]);
        table.push_raw(["1", "", "3"]);
        table.push_raw(["4", "5"]);
        table.push_raw(["6", "7", "8", "9"]);

        assert_eq!(table.len(), 3);
        assert_eq!(table.get(0, "b"), None);
        assert_eq!(table.get(0, "c"), Some("3"));
        assert_eq!(table.get(1, "c"), None);
        assert_eq!(table.rows()[2].cells().len(), 3);
        assert_eq!(table.drifted_rows(), &[1, 2]);
    }

    #[test]
    fn test_table_column_lookup() {
        let mut table = Table::with_columns(vec!["success".into()]);
        table.push_raw(["Yes"]);
        table.push_raw(["No"]);

        let values: Vec<_> = table.column("success").unwrap().collect();
        assert_eq!(values, vec![Some("Yes"), Some("No")]);
        assert!(table.column("missing").is_none());
        assert!(Table::empty().is_empty());
    }
}
