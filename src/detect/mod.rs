//! Outlier detection over a [`NumericMatrix`].
//!
//! Detectors are plain values built per request; nothing is cached between
//! calls. The pipeline only sees the [`OutlierDetector`] seam, so the
//! partitioning algorithm can be swapped or seeded without touching it.

pub mod isolation;
pub mod rng;

use crate::config::ContaminationRate;
use crate::data::model::{AnomalyLabel, NumericMatrix};
use crate::error::Result;

pub use isolation::{IsolationForest, IsolationModel};

/// A fit-then-score outlier detector.
pub trait OutlierDetector {
    type Model;

    /// Fit a model to every row of `matrix`.
    fn fit(&self, matrix: &NumericMatrix) -> Result<Self::Model>;

    /// Anomaly score per row; higher means more anomalous.
    fn score(&self, model: &Self::Model, matrix: &NumericMatrix) -> Result<Vec<f64>>;
}

/// Labels and scores for the rows of one matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub labels: Vec<AnomalyLabel>,
    pub scores: Vec<f64>,
    /// Rows scoring strictly above this are anomalies.
    pub threshold: f64,
}

impl Detection {
    pub fn anomaly_count(&self) -> usize {
        self.labels.iter().filter(|l| l.is_anomaly()).count()
    }
}

/// Fit on `matrix`, score the same rows, then label by contamination.
pub fn fit_predict<D: OutlierDetector>(
    detector: &D,
    matrix: &NumericMatrix,
    contamination: ContaminationRate,
) -> Result<Detection> {
    let model = detector.fit(matrix)?;
    let scores = detector.score(&model, matrix)?;
    let (labels, threshold) = label_by_contamination(&scores, contamination);
    let detection = Detection {
        labels,
        scores,
        threshold,
    };
    log::debug!(
        "Scored {} rows, threshold {threshold:.6}, {} anomalies",
        detection.scores.len(),
        detection.anomaly_count()
    );
    Ok(detection)
}

/// Flag the rows scoring above the `(1 - contamination)` quantile.
pub fn label_by_contamination(
    scores: &[f64],
    contamination: ContaminationRate,
) -> (Vec<AnomalyLabel>, f64) {
    let mut sorted = scores.to_vec();
    sorted.sort_unstable_by(f64::total_cmp);
    let threshold = quantile_sorted(&sorted, 1.0 - contamination.value()).unwrap_or(f64::INFINITY);
    let labels = scores
        .iter()
        .map(|&s| {
            if s > threshold {
                AnomalyLabel::Anomaly
            } else {
                AnomalyLabel::Normal
            }
        })
        .collect();
    (labels, threshold)
}

/// `p`-th quantile of pre-sorted data with linear interpolation (R-7).
pub fn quantile_sorted(sorted: &[f64], p: f64) -> Option<f64> {
    let n = sorted.len();
    if n == 0 || !(0.0..=1.0).contains(&p) {
        return None;
    }
    if n == 1 {
        return Some(sorted[0]);
    }
    let h = (n - 1) as f64 * p;
    let j = h.floor() as usize;
    let g = h - h.floor();
    if j + 1 >= n {
        Some(sorted[n - 1])
    } else {
        Some((1.0 - g) * sorted[j] + g * sorted[j + 1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_top_fraction_of_distinct_scores() {
        let scores: Vec<f64> = (0..100).map(|i| i as f64 / 100.0).collect();
        let rate = ContaminationRate::new(0.05).unwrap();
        let (labels, threshold) = label_by_contamination(&scores, rate);
        let flagged: Vec<usize> = labels
            .iter()
            .enumerate()
            .filter(|(_, l)| l.is_anomaly())
            .map(|(i, _)| i)
            .collect();
        assert_eq!(flagged, vec![95, 96, 97, 98, 99]);
        assert!(threshold > 0.94 && threshold < 0.95);
    }

    #[test]
    fn equal_scores_flag_nothing() {
        let rate = ContaminationRate::new(0.2).unwrap();
        let (labels, _) = label_by_contamination(&[0.5; 10], rate);
        assert!(labels.iter().all(|l| !l.is_anomaly()));
    }

    #[test]
    fn fit_predict_counts_flagged_rows() {
        let mut rows: Vec<Vec<f64>> = (0..40).map(|i| vec![(i % 4) as f64, (i % 3) as f64]).collect();
        rows.push(vec![80.0, -60.0]);
        let cols = vec!["a".to_string(), "b".to_string()];
        let matrix = NumericMatrix::new(cols, rows).unwrap();
        let forest = IsolationForest::default().with_seed(4);
        let rate = ContaminationRate::new(0.02).unwrap();
        let detection = fit_predict(&forest, &matrix, rate).unwrap();
        assert_eq!(detection.anomaly_count(), 1);
        assert_eq!(detection.labels[40], AnomalyLabel::Anomaly);
    }

    #[test]
    fn quantile_interpolates() {
        let sorted = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(quantile_sorted(&sorted, 0.0), Some(1.0));
        assert_eq!(quantile_sorted(&sorted, 1.0), Some(4.0));
        assert_eq!(quantile_sorted(&sorted, 0.5), Some(2.5));
        assert_eq!(quantile_sorted(&[], 0.5), None);
    }
}
