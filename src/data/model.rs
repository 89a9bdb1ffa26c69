use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

// ---------------------------------------------------------------------------
// CellValue – a single cell of a loaded column
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value, guessed from the raw text at load time.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Text(s) => write!(f, "{s}"),
            CellValue::Integer(i) => write!(f, "{i}"),
            CellValue::Float(v) => write!(f, "{v}"),
            CellValue::Bool(b) => write!(f, "{b}"),
            CellValue::Null => write!(f, "<null>"),
        }
    }
}

impl CellValue {
    /// Best-effort numeric coercion. Anything that cannot be read as a
    /// finite number comes back as `None` (a missing value).
    pub fn coerce_f64(&self) -> Option<f64> {
        let v = match self {
            CellValue::Float(v) => *v,
            CellValue::Integer(i) => *i as f64,
            CellValue::Bool(b) => f64::from(u8::from(*b)),
            CellValue::Text(s) => s.trim().parse::<f64>().ok()?,
            CellValue::Null => return None,
        };
        v.is_finite().then_some(v)
    }

    /// Typed numeric value, without parsing text. Used to decide whether a
    /// column takes part in the descriptive statistics.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Float(v) if !v.is_nan() => Some(*v),
            CellValue::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }
}

// ---------------------------------------------------------------------------
// ColumnName – canonical lookup key
// ---------------------------------------------------------------------------

/// A column name in canonical form: surrounding whitespace trimmed and
/// lower-cased. Two names are equal iff their canonical forms match.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct ColumnName(String);

impl ColumnName {
    pub fn new(raw: &str) -> Self {
        ColumnName(normalize_name(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ColumnName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ColumnName {
    fn from(raw: &str) -> Self {
        ColumnName::new(raw)
    }
}

/// Canonical form of a raw column name. Idempotent.
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_lowercase()
}

// ---------------------------------------------------------------------------
// Table – ordered named columns of equal length
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub cells: Vec<CellValue>,
}

impl Column {
    pub fn new(name: impl Into<String>, cells: Vec<CellValue>) -> Self {
        Column {
            name: name.into(),
            cells,
        }
    }
}

/// The loaded dataset. Transformations build new tables rather than
/// editing one in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    columns: Vec<Column>,
    n_rows: usize,
}

impl Table {
    /// Build a table, checking every column has the same row count.
    pub fn new(columns: Vec<Column>) -> Result<Self> {
        let n_rows = columns.first().map_or(0, |c| c.cells.len());
        if let Some(bad) = columns.iter().find(|c| c.cells.len() != n_rows) {
            return Err(PipelineError::MalformedInput(format!(
                "column '{}' has {} rows, expected {n_rows}",
                bad.name,
                bad.cells.len()
            )));
        }
        Ok(Table { columns, n_rows })
    }

    /// A table with no columns but a known row count (an empty projection).
    pub fn empty(n_rows: usize) -> Self {
        Table {
            columns: Vec::new(),
            n_rows,
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn into_columns(self) -> Vec<Column> {
        self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    /// New table with `column` appended, or replacing a column of the same
    /// name in place.
    pub fn with_column(&self, column: Column) -> Result<Table> {
        let mut columns = self.columns.clone();
        match columns.iter_mut().find(|c| c.name == column.name) {
            Some(existing) => *existing = column,
            None => columns.push(column),
        }
        Table::new(columns)
    }
}

// ---------------------------------------------------------------------------
// NumericMatrix – the cleaned detector input
// ---------------------------------------------------------------------------

/// Rows × selected-columns of finite floats. No row holds a missing value.
#[derive(Debug, Clone, PartialEq)]
pub struct NumericMatrix {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl NumericMatrix {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != columns.len())
        {
            return Err(PipelineError::MalformedInput(format!(
                "matrix row {i} has {} values, expected {}",
                row.len(),
                columns.len()
            )));
        }
        Ok(NumericMatrix { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn row(&self, i: usize) -> &[f64] {
        &self.rows[i]
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_values(&self, j: usize) -> impl Iterator<Item = f64> + '_ {
        self.rows.iter().map(move |r| r[j])
    }
}

// ---------------------------------------------------------------------------
// AnomalyLabel
// ---------------------------------------------------------------------------

/// Per-row detector verdict. Serialised with the detector's native
/// encoding: `1` for Normal, `-1` for Anomaly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum AnomalyLabel {
    Normal,
    Anomaly,
}

impl AnomalyLabel {
    /// Fixed ordering used wherever both labels are listed.
    pub const ALL: [AnomalyLabel; 2] = [AnomalyLabel::Normal, AnomalyLabel::Anomaly];

    pub fn code(self) -> i8 {
        match self {
            AnomalyLabel::Normal => 1,
            AnomalyLabel::Anomaly => -1,
        }
    }

    pub fn is_anomaly(self) -> bool {
        self == AnomalyLabel::Anomaly
    }

    pub fn name(self) -> &'static str {
        match self {
            AnomalyLabel::Normal => "Normal",
            AnomalyLabel::Anomaly => "Anomaly",
        }
    }
}

impl From<AnomalyLabel> for i8 {
    fn from(label: AnomalyLabel) -> i8 {
        label.code()
    }
}

impl TryFrom<i8> for AnomalyLabel {
    type Error = String;

    fn try_from(code: i8) -> std::result::Result<Self, Self::Error> {
        match code {
            1 => Ok(AnomalyLabel::Normal),
            -1 => Ok(AnomalyLabel::Anomaly),
            other => Err(format!("invalid anomaly label code {other}, expected 1 or -1")),
        }
    }
}

impl fmt::Display for AnomalyLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_name_serializes_in_canonical_form() {
        let name = ColumnName::new("  Amount ");
        assert_eq!(serde_json::to_string(&name).unwrap(), "\"amount\"");
    }

    #[test]
    fn coerce_text_and_typed_cells() {
        assert_eq!(CellValue::Text(" 2.5 ".into()).coerce_f64(), Some(2.5));
        assert_eq!(CellValue::Text("abc".into()).coerce_f64(), None);
        assert_eq!(CellValue::Integer(3).coerce_f64(), Some(3.0));
        assert_eq!(CellValue::Bool(true).coerce_f64(), Some(1.0));
        assert_eq!(CellValue::Null.coerce_f64(), None);
        assert_eq!(CellValue::Float(f64::NAN).coerce_f64(), None);
        assert_eq!(CellValue::Text("inf".into()).coerce_f64(), None);
    }

    #[test]
    fn column_names_compare_canonically() {
        assert_eq!(ColumnName::new("  Amount "), ColumnName::new("amount"));
        assert_ne!(ColumnName::new("amount"), ColumnName::new("amount2"));
        assert_eq!(ColumnName::new(" QTY\t").as_str(), "qty");
    }

    #[test]
    fn table_rejects_ragged_columns() {
        let err = Table::new(vec![
            Column::new("a", vec![CellValue::Integer(1), CellValue::Integer(2)]),
            Column::new("b", vec![CellValue::Integer(1)]),
        ])
        .unwrap_err();
        assert!(matches!(err, PipelineError::MalformedInput(_)));
    }

    #[test]
    fn with_column_replaces_same_name() {
        let table = Table::new(vec![Column::new("a", vec![CellValue::Integer(1)])]).unwrap();
        let replaced = table
            .with_column(Column::new("a", vec![CellValue::Integer(9)]))
            .unwrap();
        assert_eq!(replaced.n_cols(), 1);
        assert_eq!(replaced.column("a").unwrap().cells[0], CellValue::Integer(9));
        // original untouched
        assert_eq!(table.column("a").unwrap().cells[0], CellValue::Integer(1));
    }

    #[test]
    fn label_codes_round_trip_through_json() {
        let json = serde_json::to_string(&vec![AnomalyLabel::Normal, AnomalyLabel::Anomaly]).unwrap();
        assert_eq!(json, "[1,-1]");
        let back: Vec<AnomalyLabel> = serde_json::from_str("[-1,1,1]").unwrap();
        assert_eq!(back[0], AnomalyLabel::Anomaly);
        assert!(serde_json::from_str::<Vec<AnomalyLabel>>("[0]").is_err());
    }
}
