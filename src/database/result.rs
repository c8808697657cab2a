//! Query result types and schema structures.

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// Result of one statement.
///
/// Statements that return rows fill `rows`; everything else reports
/// `affected_rows`.
#[derive(Debug, Clone, Serialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    pub row_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub affected_rows: Option<usize>,
    pub execution_time_ms: u64,
}

impl QueryResult {
    pub fn rows(columns: Vec<String>, rows: Vec<Row>, execution_time_ms: u64) -> Self {
        let row_count = rows.len();
        Self {
            columns,
            rows,
            row_count,
            affected_rows: None,
            execution_time_ms,
        }
    }

    pub fn affected(affected_rows: usize, execution_time_ms: u64) -> Self {
        Self {
            columns: vec![],
            rows: vec![],
            row_count: 0,
            affected_rows: Some(affected_rows),
            execution_time_ms,
        }
    }

    /// First cell of the first row.
    pub fn scalar(&self) -> Option<&CellValue> {
        self.rows.first().and_then(|row| row.values().next())
    }
}

/// One result row. Column order is preserved when serialized.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row(Vec<(String, CellValue)>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<CellValue>) {
        self.0.push((column.into(), value.into()));
    }

    /// Look up a column, ignoring case.
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.0
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(column))
            .map(|(_, value)| value)
    }

    /// Text value of a column with surrounding blanks removed.
    ///
    /// Firebird pads CHAR system columns, so catalog reads go through here.
    pub fn text(&self, column: &str) -> Option<String> {
        self.get(column)
            .and_then(CellValue::as_str)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
    }

    pub fn int(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(CellValue::as_i64)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &CellValue> {
        self.0.iter().map(|(_, value)| value)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<CellValue>> FromIterator<(K, V)> for Row {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, value) in &self.0 {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Cell value that can hold different SQL types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
}

impl CellValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            Self::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Display form used in rendered documents.
    pub fn to_text(&self) -> String {
        match self {
            Self::Null => "NULL".into(),
            Self::Bool(b) => b.to_string(),
            Self::Int(n) => n.to_string(),
            Self::Float(f) => f.to_string(),
            Self::String(s) => s.trim_end().to_string(),
            Self::Bytes(b) => format!("<{} bytes>", b.len()),
        }
    }
}

impl From<()> for CellValue {
    fn from(_: ()) -> Self {
        Self::Null
    }
}

impl From<bool> for CellValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for CellValue {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<i32> for CellValue {
    fn from(v: i32) -> Self {
        Self::Int(v as i64)
    }
}

impl From<f64> for CellValue {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for CellValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for CellValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// User table summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableInfo {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Table schema with columns and constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnSchema>,
    pub primary_keys: Vec<String>,
    pub foreign_keys: Vec<ForeignKey>,
    pub indexes: Vec<IndexInfo>,
}

/// Column schema information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

/// Foreign key column reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub constraint_name: String,
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

/// Index information.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexInfo {
    pub name: String,
    pub columns: Vec<String>,
    pub is_unique: bool,
}
