use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Pipeline errors
// ---------------------------------------------------------------------------

/// Every failure a detection or rendering request can end with.
/// All variants are terminal for the request that produced them.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error("Ambiguous column '{column}': produced by {sources:?}")]
    AmbiguousColumn { column: String, sources: Vec<String> },

    #[error("Invalid columns: {}", .columns.join(", "))]
    UnknownColumn { columns: Vec<String> },

    #[error("The selected columns contain no valid numeric data.")]
    NoValidData,

    #[error("Detection failed: {0}")]
    Detection(String),

    #[error("Invalid contamination: {0}")]
    InvalidContamination(String),

    #[error("Label count mismatch: expected {expected}, got {got}")]
    LabelMismatch { expected: usize, got: usize },

    #[error("Rendering failed: {0}")]
    Render(String),
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;

/// Stable, caller-facing error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    #[serde(rename = "MalformedInputError")]
    MalformedInput,
    #[serde(rename = "AmbiguousColumnError")]
    AmbiguousColumn,
    #[serde(rename = "UnknownColumnError")]
    UnknownColumn,
    #[serde(rename = "NoValidDataError")]
    NoValidData,
    #[serde(rename = "DetectionError")]
    Detection,
    #[serde(rename = "InvalidContaminationError")]
    InvalidContamination,
    #[serde(rename = "LabelMismatchError")]
    LabelMismatch,
    #[serde(rename = "RenderError")]
    Render,
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::MalformedInput(_) => ErrorKind::MalformedInput,
            PipelineError::AmbiguousColumn { .. } => ErrorKind::AmbiguousColumn,
            PipelineError::UnknownColumn { .. } => ErrorKind::UnknownColumn,
            PipelineError::NoValidData => ErrorKind::NoValidData,
            PipelineError::Detection(_) => ErrorKind::Detection,
            PipelineError::InvalidContamination(_) => ErrorKind::InvalidContamination,
            PipelineError::LabelMismatch { .. } => ErrorKind::LabelMismatch,
            PipelineError::Render(_) => ErrorKind::Render,
        }
    }
}

/// Structured `{kind, message}` form handed to the hosting layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&PipelineError> for ErrorReport {
    fn from(err: &PipelineError) -> Self {
        ErrorReport {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<PipelineError> for ErrorReport {
    fn from(err: PipelineError) -> Self {
        ErrorReport::from(&err)
    }
}
