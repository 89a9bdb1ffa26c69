use rand::seq::index;
use rand::Rng;

use super::rng::{detector_rng, DetectorRng};
use super::OutlierDetector;
use crate::config::DetectionConfig;
use crate::data::model::NumericMatrix;
use crate::error::{PipelineError, Result};

const EULER_GAMMA: f64 = 0.577_215_664_901_532_9;

// ---------------------------------------------------------------------------
// Isolation forest
// ---------------------------------------------------------------------------

/// Isolation forest settings. Build one per request.
#[derive(Debug, Clone, PartialEq)]
pub struct IsolationForest {
    pub n_estimators: usize,
    pub max_samples: usize,
    pub seed: Option<u64>,
}

impl Default for IsolationForest {
    fn default() -> Self {
        IsolationForest::from_config(&DetectionConfig::default())
    }
}

impl IsolationForest {
    pub fn from_config(config: &DetectionConfig) -> Self {
        IsolationForest {
            n_estimators: config.n_estimators,
            max_samples: config.max_samples,
            seed: config.seed,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

/// A fitted forest.
#[derive(Debug, Clone)]
pub struct IsolationModel {
    trees: Vec<IsolationTree>,
    /// Rows each tree was grown on (ψ).
    sample_size: usize,
    n_features: usize,
}

impl IsolationModel {
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    /// Mean path length of `point` over every tree.
    pub fn mean_path_length(&self, point: &[f64]) -> f64 {
        let total: f64 = self.trees.iter().map(|t| t.path_length(point)).sum();
        total / self.trees.len() as f64
    }

    /// `2^(-E[h(x)] / c(ψ))`, in (0, 1]; close to 1 means easily isolated.
    pub fn anomaly_score(&self, point: &[f64]) -> f64 {
        let norm = average_path_length(self.sample_size);
        if norm <= 0.0 {
            return 0.5;
        }
        2f64.powf(-self.mean_path_length(point) / norm)
    }
}

impl OutlierDetector for IsolationForest {
    type Model = IsolationModel;

    fn fit(&self, matrix: &NumericMatrix) -> Result<IsolationModel> {
        let n = matrix.n_rows();
        if self.n_estimators == 0 {
            return Err(PipelineError::Detection(
                "n_estimators must be at least 1".to_string(),
            ));
        }
        if n == 0 {
            return Err(PipelineError::Detection("no rows to fit".to_string()));
        }
        // One row is never degenerate: it scores 0.5 and stays Normal.
        if n > 1 && (0..matrix.n_cols()).all(|j| is_constant(matrix.column_values(j))) {
            return Err(PipelineError::Detection(
                "every selected column is constant; nothing can be isolated".to_string(),
            ));
        }

        let sample_size = if n == 1 { 1 } else { self.max_samples.clamp(2, n) };
        let height_limit = (sample_size as f64).log2().ceil() as usize;
        let mut rng = detector_rng(self.seed);

        let trees = (0..self.n_estimators)
            .map(|_| {
                let rows = index::sample(&mut rng, n, sample_size).into_vec();
                IsolationTree::grow(matrix, rows, height_limit, &mut rng)
            })
            .collect();
        log::debug!(
            "Fitted {} trees on {n} rows (ψ = {sample_size}, height limit {height_limit})",
            self.n_estimators
        );
        Ok(IsolationModel {
            trees,
            sample_size,
            n_features: matrix.n_cols(),
        })
    }

    fn score(&self, model: &IsolationModel, matrix: &NumericMatrix) -> Result<Vec<f64>> {
        if matrix.n_cols() != model.n_features {
            return Err(PipelineError::Detection(format!(
                "model fitted on {} features, matrix has {}",
                model.n_features,
                matrix.n_cols()
            )));
        }
        Ok(matrix.rows().iter().map(|r| model.anomaly_score(r)).collect())
    }
}

// ---------------------------------------------------------------------------
// Tree
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        size: usize,
    },
}

/// Nodes are stored in a flat arena; index 0 is the root.
#[derive(Debug, Clone)]
struct IsolationTree {
    nodes: Vec<Node>,
}

impl IsolationTree {
    fn grow(
        matrix: &NumericMatrix,
        rows: Vec<usize>,
        height_limit: usize,
        rng: &mut DetectorRng,
    ) -> Self {
        let mut tree = IsolationTree { nodes: Vec::new() };
        tree.build(matrix, rows, 0, height_limit, rng);
        tree
    }

    fn build(
        &mut self,
        matrix: &NumericMatrix,
        rows: Vec<usize>,
        depth: usize,
        height_limit: usize,
        rng: &mut DetectorRng,
    ) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::Leaf { size: rows.len() });
        if rows.len() <= 1 || depth >= height_limit {
            return id;
        }

        // Only features that still vary within this node can split it.
        let candidates: Vec<(usize, f64, f64)> = (0..matrix.n_cols())
            .filter_map(|j| {
                let (lo, hi) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| {
                    let v = matrix.row(r)[j];
                    (lo.min(v), hi.max(v))
                });
                (hi > lo).then_some((j, lo, hi))
            })
            .collect();
        if candidates.is_empty() {
            return id;
        }

        let (feature, lo, hi) = candidates[rng.gen_range(0..candidates.len())];
        // lo <= threshold < hi keeps both sides non-empty.
        let mut threshold = lo + rng.gen::<f64>() * (hi - lo);
        if threshold >= hi {
            threshold = lo;
        }
        let (left_rows, right_rows): (Vec<usize>, Vec<usize>) =
            rows.into_iter().partition(|&r| matrix.row(r)[feature] <= threshold);

        let left = self.build(matrix, left_rows, depth + 1, height_limit, rng);
        let right = self.build(matrix, right_rows, depth + 1, height_limit, rng);
        self.nodes[id] = Node::Split {
            feature,
            threshold,
            left,
            right,
        };
        id
    }

    fn path_length(&self, point: &[f64]) -> f64 {
        let mut id = 0;
        let mut depth = 0usize;
        loop {
            match self.nodes[id] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    id = if point[feature] <= threshold { left } else { right };
                    depth += 1;
                }
                Node::Leaf { size } => return depth as f64 + average_path_length(size),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Expected path length of an unsuccessful BST search over `n` points, c(n).
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_GAMMA) - 2.0 * (n - 1.0) / n
        }
    }
}

fn is_constant(mut values: impl Iterator<Item = f64>) -> bool {
    match values.next() {
        Some(first) => values.all(|v| v == first),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: Vec<Vec<f64>>) -> NumericMatrix {
        let cols = (0..rows[0].len()).map(|j| format!("c{j}")).collect();
        NumericMatrix::new(cols, rows).unwrap()
    }

    fn cluster_with_outlier() -> NumericMatrix {
        let mut rows: Vec<Vec<f64>> = (0..50)
            .map(|i| vec![10.0 + (i % 7) as f64 * 0.1, 5.0 + (i % 5) as f64 * 0.1])
            .collect();
        rows.push(vec![100.0, -40.0]);
        matrix(rows)
    }

    #[test]
    fn c_of_n_matches_known_values() {
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        // c(256) ≈ 10.24
        assert!((average_path_length(256) - 10.244).abs() < 0.01);
    }

    #[test]
    fn outlier_scores_highest() {
        let m = cluster_with_outlier();
        let forest = IsolationForest::default().with_seed(3);
        let model = forest.fit(&m).unwrap();
        let scores = forest.score(&model, &m).unwrap();
        let best = scores
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(best, 50);
        assert!(scores.iter().all(|&s| s > 0.0 && s <= 1.0));
    }

    #[test]
    fn seeded_fits_are_reproducible() {
        let m = cluster_with_outlier();
        let forest = IsolationForest::default().with_seed(11);
        let a = forest.score(&forest.fit(&m).unwrap(), &m).unwrap();
        let b = forest.score(&forest.fit(&m).unwrap(), &m).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn sample_size_is_capped_by_rows() {
        let m = cluster_with_outlier();
        let model = IsolationForest::default().with_seed(1).fit(&m).unwrap();
        assert_eq!(model.sample_size(), 51);
        assert_eq!(model.n_trees(), 100);
    }

    #[test]
    fn constant_data_is_a_detection_error() {
        let m = matrix(vec![vec![1.0]; 10]);
        let err = IsolationForest::default().fit(&m).unwrap_err();
        assert!(matches!(err, PipelineError::Detection(_)));
    }

    #[test]
    fn single_row_fits_with_one_sample() {
        let m = matrix(vec![vec![1.0, 2.0]]);
        let forest = IsolationForest::default().with_seed(2);
        let model = forest.fit(&m).unwrap();
        assert_eq!(model.sample_size(), 1);
        assert_eq!(forest.score(&model, &m).unwrap(), vec![0.5]);
    }

    #[test]
    fn unseeded_fit_still_ranks_the_outlier() {
        let m = cluster_with_outlier();
        let forest = IsolationForest::default();
        assert_eq!(forest.seed, None);
        let scores = forest.score(&forest.fit(&m).unwrap(), &m).unwrap();
        let top = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(scores[50], top);
    }

    #[test]
    fn feature_count_mismatch_is_rejected() {
        let m = cluster_with_outlier();
        let forest = IsolationForest::default().with_seed(5);
        let model = forest.fit(&m).unwrap();
        let other = matrix(vec![vec![1.0], vec![2.0]]);
        assert!(matches!(
            forest.score(&model, &other),
            Err(PipelineError::Detection(_))
        ));
    }
}
