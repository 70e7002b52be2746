//! Class-balanced logistic regression.
//!
//! Features are standardized with the training means and deviations, and
//! each class is weighted by `n / (2 * n_class)` so a rare positive class
//! still pulls on the decision boundary. Fitted by full-batch gradient
//! descent from zero weights, which makes the result deterministic.

use decay_map_analytics_models::LogisticParams;

use crate::{AnalyticsError, Classifier};

/// A trained logistic regression model.
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    means: Vec<f64>,
    scales: Vec<f64>,
    weights: Vec<f64>,
    bias: f64,
}

impl LogisticRegression {
    /// Fits the model.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::EmptyInput`] without samples, or
    /// [`AnalyticsError::InvalidConfig`] if `x` and `y` differ in length.
    #[allow(clippy::cast_precision_loss)]
    pub fn fit(x: &[Vec<f64>], y: &[bool], params: &LogisticParams) -> Result<Self, AnalyticsError> {
        if x.len() != y.len() {
            return Err(AnalyticsError::InvalidConfig {
                message: format!("{} feature rows but {} labels", x.len(), y.len()),
            });
        }
        if x.is_empty() {
            return Err(AnalyticsError::EmptyInput {
                what: "logistic regression training samples".to_owned(),
            });
        }

        let n = x.len() as f64;
        let n_features = x[0].len();
        let (means, scales) = standardization(x, n_features);
        let z: Vec<Vec<f64>> = x.iter().map(|row| standardize(row, &means, &scales)).collect();

        let n_pos = y.iter().filter(|v| **v).count();
        let n_neg = y.len() - n_pos;
        let class_weight = |label: bool| {
            let count = if label { n_pos } else { n_neg };
            if count == 0 {
                0.0
            } else {
                n / (2.0 * count as f64)
            }
        };

        let mut weights = vec![0.0; n_features];
        let mut bias = 0.0;
        for _ in 0..params.iterations {
            let mut grad_w = vec![0.0; n_features];
            let mut grad_b = 0.0;
            for (row, &label) in z.iter().zip(y) {
                let p = sigmoid(dot(&weights, row) + bias);
                let err = class_weight(label) * (p - f64::from(u8::from(label)));
                for (g, v) in grad_w.iter_mut().zip(row) {
                    *g += err * v;
                }
                grad_b += err;
            }
            for (w, g) in weights.iter_mut().zip(&grad_w) {
                *w -= params.learning_rate * (g / n + params.l2 * *w);
            }
            bias -= params.learning_rate * grad_b / n;
        }

        log::debug!("Trained logistic regression: weights {weights:?}, bias {bias:.4}");

        Ok(Self {
            means,
            scales,
            weights,
            bias,
        })
    }

    /// Fitted weights on the standardized features.
    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

impl Classifier for LogisticRegression {
    fn predict_proba(&self, features: &[f64]) -> f64 {
        let z = standardize(features, &self.means, &self.scales);
        sigmoid(dot(&self.weights, &z) + self.bias)
    }
}

#[allow(clippy::cast_precision_loss)]
fn standardization(x: &[Vec<f64>], n_features: usize) -> (Vec<f64>, Vec<f64>) {
    let n = x.len() as f64;
    let mut means = vec![0.0; n_features];
    for row in x {
        for (m, v) in means.iter_mut().zip(row) {
            *m += v / n;
        }
    }
    let mut scales = vec![0.0; n_features];
    for row in x {
        for ((s, v), m) in scales.iter_mut().zip(row).zip(&means) {
            *s += (v - m).powi(2) / n;
        }
    }
    // Constant features keep scale 1 so they standardize to zero.
    for s in &mut scales {
        *s = if *s > 0.0 { s.sqrt() } else { 1.0 };
    }
    (means, scales)
}

fn standardize(row: &[f64], means: &[f64], scales: &[f64]) -> Vec<f64> {
    row.iter()
        .zip(means)
        .zip(scales)
        .map(|((v, m), s)| (v - m) / s)
        .collect()
}

fn sigmoid(t: f64) -> f64 {
    1.0 / (1.0 + (-t).exp())
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}
