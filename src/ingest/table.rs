//! Canonical contact table — the shape every ingestion path produces.

use std::collections::{BTreeMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::IngestError;

/// Reserved logical key holding a record's resolved address.
pub const EMAIL_KEY: &str = "email";

/// A primitive cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Whether the value carries no content (blank text).
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Text(s) if s.trim().is_empty())
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// One decoded spreadsheet cell. `None` is an empty cell.
pub type Cell = Option<FieldValue>;

/// A decoded sheet: rows of cells, possibly ragged.
pub type Grid = Vec<Vec<Cell>>;

/// One logical contact entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactRecord {
    fields: BTreeMap<String, FieldValue>,
}

impl ContactRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a field. Blank values are dropped so records only hold content.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        let value = value.into();
        let key = key.into();
        if value.is_blank() {
            self.fields.remove(&key);
        } else {
            self.fields.insert(key, value);
        }
    }

    /// Builder-style [`set`](Self::set).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.fields.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    /// The resolved address, if normalization found one.
    pub fn email(&self) -> Option<&str> {
        self.get(EMAIL_KEY).and_then(FieldValue::as_text)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }
}

/// Normalized header + rows representation of contact data.
///
/// Headers are ordered, unique and non-empty. Every row is non-empty and its
/// keys are a subset of the headers plus [`EMAIL_KEY`]. The table cannot be
/// mutated once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CanonicalTable {
    headers: Vec<String>,
    rows: Vec<ContactRecord>,
}

impl CanonicalTable {
    /// Build a table, checking the header and row invariants.
    pub fn new(headers: Vec<String>, rows: Vec<ContactRecord>) -> Result<Self, IngestError> {
        let mut seen = HashSet::with_capacity(headers.len());
        for header in &headers {
            if header.trim().is_empty() {
                return Err(IngestError::InvalidTable("empty header name".into()));
            }
            if !seen.insert(header.as_str()) {
                return Err(IngestError::InvalidTable(format!(
                    "duplicate header name: {header}"
                )));
            }
        }

        for (i, row) in rows.iter().enumerate() {
            if row.is_empty() {
                return Err(IngestError::InvalidTable(format!("row {i} has no fields")));
            }
            if let Some(key) = row
                .keys()
                .find(|k| *k != EMAIL_KEY && !seen.contains(k))
            {
                return Err(IngestError::InvalidTable(format!(
                    "row {i} has unknown column: {key}"
                )));
            }
        }

        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[ContactRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_are_not_stored() {
        let record = ContactRecord::new().with("Name", "  ").with("City", "Oslo");
        assert_eq!(record.len(), 1);
        assert!(record.get("Name").is_none());
    }

    #[test]
    fn number_display_drops_integral_fraction() {
        assert_eq!(FieldValue::Number(42.0).to_string(), "42");
        assert_eq!(FieldValue::Number(1.5).to_string(), "1.5");
        assert_eq!(FieldValue::Bool(true).to_string(), "true");
    }

    #[test]
    fn table_rejects_duplicate_headers() {
        let err = CanonicalTable::new(vec!["A".into(), "A".into()], vec![]).unwrap_err();
        assert!(matches!(err, IngestError::InvalidTable(_)));
    }

    #[test]
    fn table_rejects_empty_header() {
        assert!(CanonicalTable::new(vec![" ".into()], vec![]).is_err());
    }

    #[test]
    fn table_rejects_unknown_row_key() {
        let row = ContactRecord::new().with("Other", "x");
        assert!(CanonicalTable::new(vec!["Name".into()], vec![row]).is_err());
    }

    #[test]
    fn table_allows_implicit_email_key() {
        let row = ContactRecord::new()
            .with("Name", "Alice")
            .with(EMAIL_KEY, "alice@x.com");
        let table = CanonicalTable::new(vec!["Name".into()], vec![row]).unwrap();
        assert_eq!(table.rows()[0].email(), Some("alice@x.com"));
    }

    #[test]
    fn record_serializes_as_flat_map() {
        let row = ContactRecord::new().with("Name", "Bob").with("Age", 30.0);
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json, serde_json::json!({ "Age": 30.0, "Name": "Bob" }));
    }
}
