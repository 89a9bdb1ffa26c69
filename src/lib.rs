//! Unsupervised anomaly detection over tabular CSV data.
//!
//! The crate loads a delimited table, projects a chosen set of columns,
//! coerces them to numbers, fits an isolation forest and labels every
//! surviving row. A second, independent call renders the distribution of one
//! column split by those labels. See [`pipeline`] for the entry points.

pub mod color;
pub mod config;
pub mod data;
pub mod detect;
pub mod error;
pub mod pipeline;
pub mod plot;
pub mod stats;

pub use config::{ContaminationRate, DetectionConfig, LoadOptions, PlotConfig};
pub use data::model::{AnomalyLabel, CellValue, Column, ColumnName, NumericMatrix, Table};
pub use detect::{IsolationForest, OutlierDetector};
pub use error::{ErrorKind, ErrorReport, PipelineError, Result};
pub use pipeline::{
    detect_anomalies, detect_with, list_columns, render_distribution, DetectionReport,
    RenderRequest,
};
