//! The operations exposed to a hosting layer.
//!
//! Each call loads its own table from the raw bytes, builds a fresh detector
//! and drops everything when it returns. Nothing is shared across calls.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::config::{ContaminationRate, DetectionConfig, LoadOptions, PlotConfig};
use crate::data::filter::{coerce_numeric, numeric_row_indices, CoercedMatrix};
use crate::data::loader::load_csv;
use crate::data::model::{AnomalyLabel, NumericMatrix, Table};
use crate::data::normalize::normalize_columns;
use crate::data::select::{require_column, select_columns};
use crate::detect::{fit_predict, IsolationForest, OutlierDetector};
use crate::error::{PipelineError, Result};
use crate::plot::{render_png, Histogram};
use crate::stats::{aggregate, StatsSummary};

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionReport {
    pub stats: StatsSummary,
    /// One label per row that survived coercion, in table order.
    pub anomalies: Vec<AnomalyLabel>,
    pub anomaly_percentage: f64,
    pub rows_dropped: usize,
    pub debug: DebugEcho,
}

/// What the detector actually saw.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DebugEcho {
    /// The cleaned matrix as `{column: value}` records.
    pub selected_data: Vec<Map<String, Value>>,
    /// Table row of each labelled row.
    pub row_index: Vec<usize>,
    pub anomaly_predictions: Vec<AnomalyLabel>,
    pub anomaly_percentage: f64,
    pub threshold: f64,
}

/// Inputs of a distribution render besides the raw table.
#[derive(Debug, Clone, Copy)]
pub struct RenderRequest<'a> {
    pub x_axis: &'a str,
    pub labels: &'a [AnomalyLabel],
    /// Columns the labels were detected over. When given, labels align with
    /// the rows those columns coerce cleanly on; otherwise with every row.
    pub columns: Option<&'a [String]>,
}

// ---------------------------------------------------------------------------
// Operations
// ---------------------------------------------------------------------------

fn load_normalized(raw: &[u8], options: &LoadOptions) -> Result<Table> {
    normalize_columns(load_csv(raw, options)?)
}

/// Normalized column names of the table, in file order.
pub fn list_columns(raw: &[u8], options: &LoadOptions) -> Result<Vec<String>> {
    let table = load_normalized(raw, options)?;
    Ok(table.column_names().into_iter().map(String::from).collect())
}

/// Detect anomalies over `columns` with the default isolation forest.
pub fn detect_anomalies<S: AsRef<str>>(
    raw: &[u8],
    columns: &[S],
    config: &DetectionConfig,
    options: &LoadOptions,
) -> Result<DetectionReport> {
    let contamination = config.contamination_rate()?;
    let detector = IsolationForest::from_config(config);
    detect_with(&detector, raw, columns, contamination, options)
}

/// Detect anomalies with any [`OutlierDetector`].
pub fn detect_with<D: OutlierDetector, S: AsRef<str>>(
    detector: &D,
    raw: &[u8],
    columns: &[S],
    contamination: ContaminationRate,
    options: &LoadOptions,
) -> Result<DetectionReport> {
    let table = load_normalized(raw, options)?;
    let selected = select_columns(&table, columns)?;
    let CoercedMatrix {
        matrix,
        row_index,
        dropped,
    } = coerce_numeric(&selected)?;
    log::debug!(
        "Detecting over {} rows x {} columns {:?}",
        matrix.n_rows(),
        matrix.n_cols(),
        matrix.columns()
    );

    let detection = fit_predict(detector, &matrix, contamination)?;
    let summary = aggregate(&table, &detection.labels, &row_index)?;

    Ok(DetectionReport {
        stats: summary.stats,
        anomalies: detection.labels.clone(),
        anomaly_percentage: summary.anomaly_percentage,
        rows_dropped: dropped,
        debug: DebugEcho {
            selected_data: matrix_records(&matrix),
            row_index,
            anomaly_predictions: detection.labels,
            anomaly_percentage: summary.anomaly_percentage,
            threshold: detection.threshold,
        },
    })
}

/// Render an overlaid Normal/Anomaly histogram of `x_axis` as PNG bytes.
pub fn render_distribution(
    raw: &[u8],
    request: &RenderRequest<'_>,
    plot: &PlotConfig,
    options: &LoadOptions,
) -> Result<Vec<u8>> {
    let table = load_normalized(raw, options)?;
    let x_axis = require_column(&table, request.x_axis)?;

    let row_index: Vec<usize> = match request.columns {
        Some(columns) => numeric_row_indices(&select_columns(&table, columns)?),
        None => (0..table.n_rows()).collect(),
    };
    if request.labels.len() != row_index.len() {
        return Err(PipelineError::LabelMismatch {
            expected: row_index.len(),
            got: request.labels.len(),
        });
    }

    let cells = table
        .column(x_axis.as_str())
        .map(|c| c.cells.as_slice())
        .unwrap_or_default();
    let mut series: Vec<(AnomalyLabel, Vec<f64>)> =
        AnomalyLabel::ALL.into_iter().map(|l| (l, Vec::new())).collect();
    for (&row, &label) in row_index.iter().zip(request.labels) {
        let Some(value) = cells.get(row).and_then(|c| c.coerce_f64()) else {
            continue;
        };
        if let Some((_, values)) = series.iter_mut().find(|(l, _)| *l == label) {
            values.push(value);
        }
    }

    let histogram = Histogram::build(&series, plot.bins)?;
    log::info!(
        "Rendering '{x_axis}': {} normal, {} anomalous values",
        series[0].1.len(),
        series[1].1.len()
    );
    render_png(&histogram, plot)
}

fn matrix_records(matrix: &NumericMatrix) -> Vec<Map<String, Value>> {
    matrix
        .rows()
        .iter()
        .map(|row| {
            matrix
                .columns()
                .iter()
                .zip(row)
                .map(|(name, &v)| (name.clone(), Value::from(v)))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const CSV: &str = " Amount ,QTY,note\n1,2,a\n2,3,b\nx,4,c\n3,5,d\n";

    #[test]
    fn list_columns_are_normalized() {
        let cols = list_columns(CSV.as_bytes(), &LoadOptions::default()).unwrap();
        assert_eq!(cols, vec!["amount", "qty", "note"]);
    }

    #[test]
    fn detect_reports_dropped_rows_and_row_map() {
        let config = DetectionConfig::default().with_seed(1).with_contamination(0.25);
        let report =
            detect_anomalies(CSV.as_bytes(), &["amount", "qty"], &config, &LoadOptions::default())
                .unwrap();
        assert_eq!(report.anomalies.len(), 3);
        assert_eq!(report.rows_dropped, 1);
        assert_eq!(report.debug.row_index, vec![0, 1, 3]);
        assert_eq!(report.debug.selected_data.len(), 3);
        assert_eq!(report.debug.selected_data[2]["qty"], Value::from(5.0));
        assert_eq!(report.debug.anomaly_predictions, report.anomalies);
        assert_eq!(report.debug.anomaly_percentage, report.anomaly_percentage);
        assert_eq!(report.stats.rows, 4);
        assert_eq!(report.stats.columns.last().map(String::as_str), Some("anomaly"));
    }

    #[test]
    fn invalid_contamination_fails_before_loading() {
        let config = DetectionConfig::default().with_contamination(0.9);
        let err = detect_anomalies(b"", &["a"], &config, &LoadOptions::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidContamination);
    }

    #[test]
    fn render_checks_x_axis_first() {
        let request = RenderRequest {
            x_axis: "missing",
            labels: &[],
            columns: None,
        };
        let err = render_distribution(
            CSV.as_bytes(),
            &request,
            &PlotConfig::default(),
            &LoadOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownColumn);
    }

    #[test]
    fn render_rejects_misaligned_labels() {
        let request = RenderRequest {
            x_axis: "qty",
            labels: &[AnomalyLabel::Normal; 2],
            columns: None,
        };
        let err = render_distribution(
            CSV.as_bytes(),
            &request,
            &PlotConfig::default(),
            &LoadOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::LabelMismatch { expected: 4, got: 2 }));
    }
}
