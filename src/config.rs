use serde::{Deserialize, Serialize};

use crate::error::{PipelineError, Result};

// ---------------------------------------------------------------------------
// Contamination rate
// ---------------------------------------------------------------------------

/// Expected fraction of outliers, always within (0, 0.5].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct ContaminationRate(f64);

impl ContaminationRate {
    pub const DEFAULT: f64 = 0.05;

    pub fn new(rate: f64) -> Result<Self> {
        if rate.is_finite() && rate > 0.0 && rate <= 0.5 {
            Ok(ContaminationRate(rate))
        } else {
            Err(PipelineError::InvalidContamination(format!(
                "{rate} is outside (0, 0.5]"
            )))
        }
    }

    /// Parse a caller-supplied rate. Absent or blank input means the default.
    pub fn parse(raw: Option<&str>) -> Result<Self> {
        match raw.map(str::trim).filter(|s| !s.is_empty()) {
            None => ContaminationRate::new(Self::DEFAULT),
            Some(s) => {
                let rate = s.parse::<f64>().map_err(|_| {
                    PipelineError::InvalidContamination(format!("'{s}' is not a number"))
                })?;
                ContaminationRate::new(rate)
            }
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl Default for ContaminationRate {
    fn default() -> Self {
        ContaminationRate(Self::DEFAULT)
    }
}

// ---------------------------------------------------------------------------
// Detection config
// ---------------------------------------------------------------------------

/// Per-request detector settings. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub contamination: f64,
    /// Number of isolation trees.
    pub n_estimators: usize,
    /// Rows drawn per tree, capped at the matrix row count.
    pub max_samples: usize,
    /// `None` seeds from OS entropy, so repeated runs may differ.
    pub seed: Option<u64>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            contamination: ContaminationRate::DEFAULT,
            n_estimators: 100,
            max_samples: 256,
            seed: None,
        }
    }
}

impl DetectionConfig {
    pub fn contamination_rate(&self) -> Result<ContaminationRate> {
        ContaminationRate::new(self.contamination)
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_contamination(mut self, contamination: f64) -> Self {
        self.contamination = contamination;
        self
    }
}

// ---------------------------------------------------------------------------
// Loader options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    pub delimiter: u8,
    /// Trim surrounding whitespace from every cell before typing it.
    pub trim: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            trim: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Plot options
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    pub width: u32,
    pub height: u32,
    pub bins: usize,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            bins: 30,
        }
    }
}
