//! Random forest binary classifier.
//!
//! Trees are CART classifiers grown on Gini impurity over a bootstrap
//! sample, trying a random subset of features at each split, and stored as
//! flat node arrays. The forest probability is the mean of the trees' leaf
//! probabilities. All randomness comes from one seeded [`Lcg64`], so the
//! same data and seed always give the same forest.

use decay_map_analytics_models::ForestParams;

use crate::rng::Lcg64;
use crate::{AnalyticsError, Classifier};

/// A node in a trained tree.
#[derive(Debug, Clone)]
struct TreeNode {
    /// Feature index to split on (`None` for leaves).
    feature: Option<usize>,
    /// Split threshold (features `<=` threshold go left).
    threshold: f64,
    left: usize,
    right: usize,
    /// Share of positive samples that reached this node.
    positive_rate: f64,
}

/// A trained CART tree.
#[derive(Debug, Clone)]
pub struct DecisionTree {
    nodes: Vec<TreeNode>,
}

/// Best split found for a node.
struct Split {
    feature: usize,
    threshold: f64,
    impurity: f64,
}

impl DecisionTree {
    /// Grows a tree on the rows of `x` listed in `sample`.
    fn grow(
        x: &[Vec<f64>],
        y: &[bool],
        sample: Vec<usize>,
        params: &ForestParams,
        max_features: usize,
        rng: &mut Lcg64,
    ) -> Self {
        let mut nodes = vec![];
        // (node index, rows, depth)
        let mut pending = vec![(0_usize, sample, 0_usize)];
        nodes.push(leaf(0.0));

        while let Some((index, rows, depth)) = pending.pop() {
            let positives = rows.iter().filter(|&&r| y[r]).count();
            nodes[index].positive_rate = ratio(positives, rows.len());

            let pure = positives == 0 || positives == rows.len();
            if pure || depth >= params.max_depth || rows.len() < params.min_samples_split {
                continue;
            }

            let n_features = x.first().map_or(0, Vec::len);
            let candidates = rng.sample_indices(n_features, max_features);
            let Some(split) = best_split(x, y, &rows, &candidates) else {
                continue;
            };
            if split.impurity >= gini(positives, rows.len()) {
                continue;
            }

            let (left_rows, right_rows): (Vec<usize>, Vec<usize>) = rows
                .into_iter()
                .partition(|&r| x[r][split.feature] <= split.threshold);

            let left = nodes.len();
            nodes.push(leaf(0.0));
            let right = nodes.len();
            nodes.push(leaf(0.0));

            let node = &mut nodes[index];
            node.feature = Some(split.feature);
            node.threshold = split.threshold;
            node.left = left;
            node.right = right;

            pending.push((right, right_rows, depth + 1));
            pending.push((left, left_rows, depth + 1));
        }

        Self { nodes }
    }

    /// Positive-class probability of the leaf a sample lands in.
    #[must_use]
    pub fn predict_proba(&self, features: &[f64]) -> f64 {
        let mut idx = 0;
        loop {
            let node = &self.nodes[idx];
            let Some(feature) = node.feature else {
                return node.positive_rate;
            };
            let value = features.get(feature).copied().unwrap_or(0.0);
            idx = if value <= node.threshold {
                node.left
            } else {
                node.right
            };
        }
    }

    /// Number of nodes in the tree.
    #[must_use]
    pub fn n_nodes(&self) -> usize {
        self.nodes.len()
    }
}

const fn leaf(positive_rate: f64) -> TreeNode {
    TreeNode {
        feature: None,
        threshold: 0.0,
        left: 0,
        right: 0,
        positive_rate,
    }
}

#[allow(clippy::cast_precision_loss)]
fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

/// Gini impurity of a node with `positives` out of `n`.
fn gini(positives: usize, n: usize) -> f64 {
    let p = ratio(positives, n);
    2.0 * p * (1.0 - p)
}

/// Lowest weighted Gini split over the candidate features, thresholds at
/// midpoints between distinct sorted values. Ties keep the first found.
#[allow(clippy::cast_precision_loss)]
fn best_split(x: &[Vec<f64>], y: &[bool], rows: &[usize], candidates: &[usize]) -> Option<Split> {
    let n = rows.len();
    let total_pos = rows.iter().filter(|&&r| y[r]).count();
    let mut best: Option<Split> = None;

    for &feature in candidates {
        let mut sorted: Vec<usize> = rows.to_vec();
        sorted.sort_by(|&a, &b| x[a][feature].total_cmp(&x[b][feature]));

        let mut left_pos = 0;
        for i in 0..n - 1 {
            if y[sorted[i]] {
                left_pos += 1;
            }
            let here = x[sorted[i]][feature];
            let next = x[sorted[i + 1]][feature];
            if here == next {
                continue;
            }

            let left_n = i + 1;
            let right_n = n - left_n;
            let impurity = (left_n as f64).mul_add(
                gini(left_pos, left_n),
                right_n as f64 * gini(total_pos - left_pos, right_n),
            ) / n as f64;

            if best.as_ref().is_none_or(|b| impurity < b.impurity) {
                best = Some(Split {
                    feature,
                    threshold: (here + next) / 2.0,
                    impurity,
                });
            }
        }
    }

    best
}

/// A trained random forest.
#[derive(Debug, Clone)]
pub struct RandomForest {
    trees: Vec<DecisionTree>,
    n_features: usize,
}

impl RandomForest {
    /// Trains a forest.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::EmptyInput`] without samples or features,
    /// or [`AnalyticsError::InvalidConfig`] if `x` and `y` differ in length.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_precision_loss,
        clippy::cast_sign_loss
    )]
    pub fn fit(
        x: &[Vec<f64>],
        y: &[bool],
        params: &ForestParams,
        seed: u64,
    ) -> Result<Self, AnalyticsError> {
        if x.len() != y.len() {
            return Err(AnalyticsError::InvalidConfig {
                message: format!("{} feature rows but {} labels", x.len(), y.len()),
            });
        }
        let n_features = x.first().map_or(0, Vec::len);
        if x.is_empty() || n_features == 0 {
            return Err(AnalyticsError::EmptyInput {
                what: "random forest training samples".to_owned(),
            });
        }

        let max_features = params
            .max_features
            .unwrap_or_else(|| (n_features as f64).sqrt().round() as usize)
            .clamp(1, n_features);

        let mut rng = Lcg64::new(seed);
        let trees = (0..params.n_trees)
            .map(|_| {
                let sample = rng.bootstrap(x.len());
                DecisionTree::grow(x, y, sample, params, max_features, &mut rng)
            })
            .collect::<Vec<_>>();

        log::debug!(
            "Trained random forest: {} trees, {} nodes total, {max_features} of {n_features} features per split",
            trees.len(),
            trees.iter().map(DecisionTree::n_nodes).sum::<usize>()
        );

        Ok(Self { trees, n_features })
    }

    /// Number of trees in the forest.
    #[must_use]
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Expected number of features per sample.
    #[must_use]
    pub const fn n_features(&self) -> usize {
        self.n_features
    }
}

impl Classifier for RandomForest {
    #[allow(clippy::cast_precision_loss)]
    fn predict_proba(&self, features: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees
            .iter()
            .map(|t| t.predict_proba(features))
            .sum::<f64>()
            / self.trees.len() as f64
    }
}
