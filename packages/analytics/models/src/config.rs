//! Analysis parameter objects.
//!
//! One section per analysis, deserialized from TOML. Every tunable policy
//! (distance candidates, classification weights and tie-break, hotspot
//! threshold and minimum years) lives here rather than in the analysis
//! code, and [`AnalysisConfig::validate`] checks the constraints between
//! them before anything runs.

use std::collections::BTreeMap;
use std::path::PathBuf;

use decay_map_decay_models::DecayType;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Complete configuration for an analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct AnalysisConfig {
    /// Where the input files live.
    #[serde(default)]
    pub datasets: DatasetsConfig,
    /// Proximity join parameters.
    pub proximity: ProximityParams,
    /// Decay classifier parameters.
    pub classification: ClassificationParams,
    /// Causality test parameters.
    pub causality: CausalityParams,
    /// Hotspot predictor parameters.
    pub hotspot: HotspotParams,
}

impl AnalysisConfig {
    /// Checks every section.
    ///
    /// # Errors
    ///
    /// Returns a description of the first constraint that is violated.
    pub fn validate(&self) -> Result<(), String> {
        self.proximity.validate()?;
        self.classification.validate()?;
        self.causality.validate()?;
        self.hotspot.validate()
    }
}

/// Input file locations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct DatasetsConfig {
    /// Directory holding the CSV exports.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// Dataset kind (`crime`, `unfit`, `vacant`, `code_violations`) to the
    /// path of a schema TOML replacing the built-in one.
    #[serde(default)]
    pub schemas: BTreeMap<String, PathBuf>,
}

impl Default for DatasetsConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            schemas: BTreeMap::new(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

/// Proximity join parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct ProximityParams {
    /// Threshold for the per-crime "near decay" flag, in meters. Must be
    /// one of `candidate_distances_m`.
    pub distance_m: u32,
    /// Radii reported as cumulative shares, ascending.
    pub candidate_distances_m: Vec<u32>,
    /// Indicator types the join runs against.
    pub decay_types: Vec<DecayType>,
}

impl ProximityParams {
    /// Checks the candidate set and the chosen distance.
    ///
    /// # Errors
    ///
    /// Returns a description of the violated constraint.
    pub fn validate(&self) -> Result<(), String> {
        if self.candidate_distances_m.is_empty() {
            return Err("proximity.candidate_distances_m must not be empty".to_owned());
        }
        if self.candidate_distances_m.contains(&0) {
            return Err("proximity.candidate_distances_m must be positive".to_owned());
        }
        if self.candidate_distances_m.windows(2).any(|w| w[0] >= w[1]) {
            return Err("proximity.candidate_distances_m must be strictly ascending".to_owned());
        }
        if !self.candidate_distances_m.contains(&self.distance_m) {
            return Err(format!(
                "proximity.distance_m = {} is not one of {:?}",
                self.distance_m, self.candidate_distances_m
            ));
        }
        if self.decay_types.is_empty() {
            return Err("proximity.decay_types must not be empty".to_owned());
        }
        Ok(())
    }
}

/// How a value is compared against a median.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MedianComparison {
    /// High means strictly greater than the median.
    StrictlyAbove,
    /// High means greater than or equal to the median.
    AtOrAbove,
}

impl MedianComparison {
    /// Whether `value` counts as high against `median`.
    #[must_use]
    pub fn is_high(self, value: f64, median: f64) -> bool {
        match self {
            Self::StrictlyAbove => value > median,
            Self::AtOrAbove => value >= median,
        }
    }
}

/// Which zips get label B when they are not A.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SecondaryRule {
    /// Only high decay with low crime (economic abandonment).
    HighDecayOnly,
    /// High on exactly one of the two axes.
    EitherAxis,
}

/// Weights of the three indicator types in the decay index.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct DecayWeights {
    /// Unfit property weight.
    pub unfit: f64,
    /// Vacant property weight.
    pub vacant: f64,
    /// Code violation weight.
    pub violation: f64,
}

impl DecayWeights {
    /// Sum of the weights.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.unfit + self.vacant + self.violation
    }
}

/// Weights of the components of the 0-100 risk score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct RiskWeights {
    /// Crime count weight.
    pub crime: f64,
    /// Decay index weight.
    pub decay: f64,
    /// Share of unresolved unfit cases weight.
    pub unresolved: f64,
}

impl RiskWeights {
    /// Sum of the weights.
    #[must_use]
    pub fn sum(&self) -> f64 {
        self.crime + self.decay + self.unresolved
    }
}

/// Decay classifier parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct ClassificationParams {
    /// Decay index weights.
    pub decay_weights: DecayWeights,
    /// Median comparison used for both axes.
    pub median_comparison: MedianComparison,
    /// Label B policy.
    pub secondary_rule: SecondaryRule,
    /// Risk score weights.
    pub risk_weights: RiskWeights,
    /// Crime-count quantile at or below which a zip is "low crime" for the
    /// economic abandonment view.
    pub abandonment_crime_quantile: f64,
}

impl ClassificationParams {
    /// Checks weights and the quantile.
    ///
    /// # Errors
    ///
    /// Returns a description of the violated constraint.
    pub fn validate(&self) -> Result<(), String> {
        let w = &self.decay_weights;
        check_weights("classification.decay_weights", &[w.unfit, w.vacant, w.violation])?;
        // Every indicator type must count toward the index.
        if [w.unfit, w.vacant, w.violation].contains(&0.0) {
            return Err("classification.decay_weights must all be positive".to_owned());
        }
        let r = &self.risk_weights;
        check_weights("classification.risk_weights", &[r.crime, r.decay, r.unresolved])?;
        if !(0.0..=1.0).contains(&self.abandonment_crime_quantile) {
            return Err(format!(
                "classification.abandonment_crime_quantile must be in [0, 1], got {}",
                self.abandonment_crime_quantile
            ));
        }
        Ok(())
    }
}

fn check_weights(name: &str, weights: &[f64]) -> Result<(), String> {
    if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
        return Err(format!("{name} must be finite and non-negative"));
    }
    if weights.iter().sum::<f64>() <= 0.0 {
        return Err(format!("{name} must have a positive sum"));
    }
    Ok(())
}

/// Causality test parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct CausalityParams {
    /// Largest lag order tested; every lag from 1 up to this is tested.
    pub max_lag: usize,
    /// Minimum series length in months regardless of lag.
    pub min_months: usize,
    /// Significance level for the interpretation.
    pub significance: f64,
    /// Indicator types counted in the decay series.
    pub decay_types: Vec<DecayType>,
    /// Restrict both series to one zip code.
    #[serde(default)]
    pub zip: Option<String>,
}

impl CausalityParams {
    /// Checks lag and significance.
    ///
    /// # Errors
    ///
    /// Returns a description of the violated constraint.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_lag == 0 {
            return Err("causality.max_lag must be at least 1".to_owned());
        }
        if self.significance.is_nan() || self.significance <= 0.0 || self.significance >= 1.0 {
            return Err(format!(
                "causality.significance must be in (0, 1), got {}",
                self.significance
            ));
        }
        if self.decay_types.is_empty() {
            return Err("causality.decay_types must not be empty".to_owned());
        }
        Ok(())
    }

    /// Shortest series the test accepts for `max_lag`.
    ///
    /// The unrestricted regression has `2 * max_lag + 1` coefficients and
    /// needs at least one residual degree of freedom on top of the
    /// `max_lag` observations lost to lagging.
    #[must_use]
    pub fn required_length(&self) -> usize {
        (3 * self.max_lag + 2).max(self.min_months)
    }
}

/// Hotspot classifier family.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ClassifierKind {
    /// Bagged CART trees with random feature subsets.
    RandomForest,
    /// Class-balanced logistic regression.
    LogisticRegression,
}

/// Random forest settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct ForestParams {
    /// Number of trees.
    pub n_trees: usize,
    /// Maximum tree depth.
    pub max_depth: usize,
    /// Minimum samples in a node before it may split.
    pub min_samples_split: usize,
    /// Features tried per split; `None` uses the square root of the
    /// feature count.
    #[serde(default)]
    pub max_features: Option<usize>,
}

/// Logistic regression settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct LogisticParams {
    /// Gradient descent step size.
    pub learning_rate: f64,
    /// Full-batch iterations.
    pub iterations: usize,
    /// L2 penalty on the weights.
    pub l2: f64,
}

/// Hotspot predictor parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", deny_unknown_fields)]
pub struct HotspotParams {
    /// Grid cell edge in meters.
    pub cell_size_m: f64,
    /// Years in the window, ascending. The last one is held out.
    pub years: Vec<i32>,
    /// A cell is a top cell in a year when it ranks within the top K by
    /// crime count that year.
    pub top_k: usize,
    /// Additionally require at least this many crimes in the year.
    #[serde(default)]
    pub count_threshold: Option<u64>,
    /// Years a cell must be a top cell to be a chronic hotspot.
    pub min_years: usize,
    /// Months `1..=history_end_month` are the history window.
    pub history_end_month: u32,
    /// Number of ranked cells reported.
    pub top_n: usize,
    /// Seed for the classifier's randomness.
    pub seed: u64,
    /// Classifier family.
    pub classifier: ClassifierKind,
    /// Random forest settings.
    pub forest: ForestParams,
    /// Logistic regression settings.
    pub logistic: LogisticParams,
}

impl HotspotParams {
    /// Checks grid, window and classifier settings.
    ///
    /// # Errors
    ///
    /// Returns a description of the violated constraint.
    pub fn validate(&self) -> Result<(), String> {
        if !self.cell_size_m.is_finite() || self.cell_size_m <= 0.0 {
            return Err(format!(
                "hotspot.cell_size_m must be positive, got {}",
                self.cell_size_m
            ));
        }
        if self.years.is_empty() {
            return Err("hotspot.years must not be empty".to_owned());
        }
        if self.years.windows(2).any(|w| w[0] >= w[1]) {
            return Err("hotspot.years must be strictly ascending".to_owned());
        }
        if self.min_years == 0 || self.min_years > self.years.len() {
            return Err(format!(
                "hotspot.min_years must be between 1 and {}, got {}",
                self.years.len(),
                self.min_years
            ));
        }
        if self.top_k == 0 {
            return Err("hotspot.top_k must be at least 1".to_owned());
        }
        if self.top_n == 0 {
            return Err("hotspot.top_n must be at least 1".to_owned());
        }
        if !(1..=11).contains(&self.history_end_month) {
            return Err(format!(
                "hotspot.history_end_month must be between 1 and 11, got {}",
                self.history_end_month
            ));
        }
        if self.forest.n_trees == 0 || self.forest.max_depth == 0 {
            return Err("hotspot.forest needs at least one tree of depth 1".to_owned());
        }
        if self.forest.min_samples_split < 2 {
            return Err("hotspot.forest.min_samples_split must be at least 2".to_owned());
        }
        if self.forest.max_features == Some(0) {
            return Err("hotspot.forest.max_features must be at least 1".to_owned());
        }
        let l = &self.logistic;
        if l.learning_rate.is_nan() || l.learning_rate <= 0.0 || l.iterations == 0 || l.l2 < 0.0 {
            return Err(
                "hotspot.logistic needs a positive learning rate, iterations and l2 >= 0"
                    .to_owned(),
            );
        }
        Ok(())
    }

    /// Years used for training: all but the held-out last year, or the
    /// single year when the window has only one.
    #[must_use]
    pub fn training_years(&self) -> &[i32] {
        match self.years.len() {
            0 | 1 => &self.years,
            n => &self.years[..n - 1],
        }
    }

    /// The held-out year that is scored.
    #[must_use]
    pub fn holdout_year(&self) -> Option<i32> {
        self.years.last().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hotspot() -> HotspotParams {
        HotspotParams {
            cell_size_m: 250.0,
            years: vec![2023, 2024, 2025],
            top_k: 10,
            count_threshold: None,
            min_years: 2,
            history_end_month: 9,
            top_n: 10,
            seed: 42,
            classifier: ClassifierKind::RandomForest,
            forest: ForestParams {
                n_trees: 10,
                max_depth: 4,
                min_samples_split: 2,
                max_features: None,
            },
            logistic: LogisticParams {
                learning_rate: 0.1,
                iterations: 100,
                l2: 0.0,
            },
        }
    }

    #[test]
    fn proximity_distance_must_be_a_candidate() {
        let params = ProximityParams {
            distance_m: 150,
            candidate_distances_m: vec![100, 200, 300, 500],
            decay_types: vec![DecayType::Unfit],
        };
        assert!(params.validate().is_err());

        let params = ProximityParams {
            distance_m: 200,
            ..params
        };
        assert!(params.validate().is_ok());
    }

    #[test]
    fn proximity_candidates_must_ascend() {
        let params = ProximityParams {
            distance_m: 100,
            candidate_distances_m: vec![200, 100],
            decay_types: vec![DecayType::Unfit],
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn weights_must_be_non_negative_with_positive_sum() {
        assert!(check_weights("w", &[0.4, 0.3, 0.3]).is_ok());
        assert!(check_weights("w", &[1.0, 0.0, 0.0]).is_ok());
        assert!(check_weights("w", &[0.0, 0.0, 0.0]).is_err());
        assert!(check_weights("w", &[-0.1, 0.5, 0.6]).is_err());
        assert!(check_weights("w", &[f64::NAN, 0.5, 0.6]).is_err());
    }

    #[test]
    fn decay_weights_must_all_be_positive() {
        let mut params = ClassificationParams {
            decay_weights: DecayWeights {
                unfit: 1.0,
                vacant: 1.0,
                violation: 1.0,
            },
            median_comparison: MedianComparison::StrictlyAbove,
            secondary_rule: SecondaryRule::HighDecayOnly,
            risk_weights: RiskWeights {
                crime: 1.0,
                decay: 0.0,
                unresolved: 0.0,
            },
            abandonment_crime_quantile: 0.25,
        };
        assert!(params.validate().is_ok(), "zero risk weights stay allowed");

        params.decay_weights.vacant = 0.0;
        let err = params.validate().unwrap_err();
        assert!(err.contains("decay_weights"), "unexpected message: {err}");
    }

    #[test]
    fn min_years_bounded_by_window() {
        let mut params = hotspot();
        assert!(params.validate().is_ok());
        params.min_years = 4;
        assert!(params.validate().is_err());
        params.min_years = 0;
        assert!(params.validate().is_err());
    }

    #[test]
    fn holdout_split() {
        let params = hotspot();
        assert_eq!(params.training_years(), &[2023, 2024]);
        assert_eq!(params.holdout_year(), Some(2025));

        let single = HotspotParams {
            years: vec![2024],
            min_years: 1,
            ..hotspot()
        };
        assert_eq!(single.training_years(), &[2024]);
        assert_eq!(single.holdout_year(), Some(2024));
    }

    #[test]
    fn required_length_covers_lags() {
        let params = CausalityParams {
            max_lag: 12,
            min_months: 0,
            significance: 0.05,
            decay_types: vec![DecayType::CodeViolation],
            zip: None,
        };
        assert_eq!(params.required_length(), 38);
        assert_eq!(
            CausalityParams {
                min_months: 108,
                ..params
            }
            .required_length(),
            108
        );
    }

    #[test]
    fn median_comparison_tie_break() {
        assert!(!MedianComparison::StrictlyAbove.is_high(5.0, 5.0));
        assert!(MedianComparison::AtOrAbove.is_high(5.0, 5.0));
    }
}
