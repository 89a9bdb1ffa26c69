use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::data::model::{AnomalyLabel, CellValue, Column, Table};
use crate::detect::quantile_sorted;
use crate::error::{PipelineError, Result};

/// Name of the label column appended to the augmented table.
pub const LABEL_COLUMN: &str = "anomaly";

// ---------------------------------------------------------------------------
// Descriptive statistics
// ---------------------------------------------------------------------------

/// count / mean / std / min / quartiles / max of one numeric column.
/// Statistics that are undefined for the sample size are `None`.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ColumnSummary {
    pub count: usize,
    pub mean: Option<f64>,
    /// Sample standard deviation (n - 1).
    pub std: Option<f64>,
    pub min: Option<f64>,
    #[serde(rename = "25%")]
    pub q25: Option<f64>,
    #[serde(rename = "50%")]
    pub q50: Option<f64>,
    #[serde(rename = "75%")]
    pub q75: Option<f64>,
    pub max: Option<f64>,
}

impl ColumnSummary {
    pub fn from_values(values: &[f64]) -> Self {
        let count = values.len();
        let mut sorted = values.to_vec();
        sorted.sort_unstable_by(f64::total_cmp);

        let mean = (count > 0).then(|| values.iter().sum::<f64>() / count as f64);
        let std = mean.filter(|_| count > 1).map(|m| {
            let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
            (ss / (count - 1) as f64).sqrt()
        });

        ColumnSummary {
            count,
            mean,
            std,
            min: sorted.first().copied(),
            q25: quantile_sorted(&sorted, 0.25),
            q50: quantile_sorted(&sorted, 0.5),
            q75: quantile_sorted(&sorted, 0.75),
            max: sorted.last().copied(),
        }
    }
}

/// Column name → summary, kept in table order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SummaryMap(Vec<(String, ColumnSummary)>);

impl SummaryMap {
    pub fn get(&self, column: &str) -> Option<&ColumnSummary> {
        self.0.iter().find(|(n, _)| n == column).map(|(_, s)| s)
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|(n, _)| n.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for SummaryMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, summary) in &self.0 {
            map.serialize_entry(name, summary)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct StatsSummary {
    pub columns: Vec<String>,
    pub rows: usize,
    pub summary: SummaryMap,
}

/// Numeric values of a column, or `None` when any non-null cell is not a
/// typed number (text or bool columns are left out of the summary).
fn numeric_values(column: &Column) -> Option<Vec<f64>> {
    let mut values = Vec::with_capacity(column.cells.len());
    for cell in &column.cells {
        match cell {
            CellValue::Null => {}
            CellValue::Integer(_) | CellValue::Float(_) => values.extend(cell.as_number()),
            CellValue::Text(_) | CellValue::Bool(_) => return None,
        }
    }
    Some(values)
}

pub fn describe(table: &Table) -> StatsSummary {
    let summary = table
        .columns()
        .iter()
        .filter_map(|c| numeric_values(c).map(|v| (c.name.clone(), ColumnSummary::from_values(&v))))
        .collect();
    StatsSummary {
        columns: table.column_names().into_iter().map(String::from).collect(),
        rows: table.n_rows(),
        summary: SummaryMap(summary),
    }
}

// ---------------------------------------------------------------------------
// Result aggregation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    /// The original table plus the [`LABEL_COLUMN`]; rows dropped during
    /// coercion carry a null label.
    pub augmented: Table,
    pub stats: StatsSummary,
    pub anomaly_count: usize,
    pub labelled_rows: usize,
    /// `100 * anomaly_count / labelled_rows`.
    pub anomaly_percentage: f64,
}

/// Attach labels to the table through the coercion row map and summarise.
pub fn aggregate(table: &Table, labels: &[AnomalyLabel], row_index: &[usize]) -> Result<Aggregate> {
    if labels.len() != row_index.len() {
        return Err(PipelineError::LabelMismatch {
            expected: row_index.len(),
            got: labels.len(),
        });
    }

    let mut cells = vec![CellValue::Null; table.n_rows()];
    for (&row, &label) in row_index.iter().zip(labels) {
        let slot = cells.get_mut(row).ok_or_else(|| {
            PipelineError::MalformedInput(format!(
                "row index {row} out of range for {} rows",
                table.n_rows()
            ))
        })?;
        *slot = CellValue::Integer(i64::from(label.code()));
    }
    let augmented = table.with_column(Column::new(LABEL_COLUMN, cells))?;

    let anomaly_count = labels.iter().filter(|l| l.is_anomaly()).count();
    let labelled_rows = labels.len();
    let anomaly_percentage = if labelled_rows == 0 {
        0.0
    } else {
        anomaly_count as f64 / labelled_rows as f64 * 100.0
    };

    let stats = describe(&augmented);
    log::info!(
        "{anomaly_count} of {labelled_rows} labelled rows are anomalies ({anomaly_percentage:.2}%)"
    );
    Ok(Aggregate {
        augmented,
        stats,
        anomaly_count,
        labelled_rows,
        anomaly_percentage,
    })
}
