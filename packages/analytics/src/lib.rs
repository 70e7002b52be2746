#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Analyses over the loaded decay indicators and crime incidents.
//!
//! Every analysis is a plain function taking the record slices and an
//! explicit parameter object from [`decay_map_analytics_models`], and
//! returning an immutable result structure. Nothing is cached between
//! calls; re-running with different parameters recomputes from scratch.
//!
//! * [`proximity::proximity_join`]: nearest decay indicator per crime
//! * [`classify::classify_zips`]: per-zip decay index and A/B/C labels
//! * [`causality::run_causality`]: bidirectional Granger test on monthly series
//! * [`hotspot::predict_hotspots`]: grid hotspot labelling and risk model
//! * [`summary::summarize`]: descriptive statistics

pub mod causality;
pub mod classify;
pub mod forest;
pub mod hotspot;
pub mod logistic;
pub mod proximity;
pub mod rng;
pub mod stats;
pub mod summary;
pub mod zips;

use std::path::Path;

use decay_map_analytics_models::AnalysisConfig;
use thiserror::Error;

/// Default analysis configuration, embedded at compile time.
pub const DEFAULT_CONFIG_TOML: &str = include_str!("../config/default.toml");

/// Errors that can occur during an analysis.
#[derive(Debug, Error)]
pub enum AnalyticsError {
    /// A series or sample is too short for the requested computation.
    #[error("not enough data: need at least {required}, got {actual}")]
    InsufficientData {
        /// Minimum length required.
        required: usize,
        /// Length provided.
        actual: usize,
    },

    /// The model cannot be trained on the given labels.
    #[error("degenerate model: {reason}")]
    DegenerateModel {
        /// Why training was refused.
        reason: String,
    },

    /// Parameters failed validation.
    #[error("invalid configuration: {message}")]
    InvalidConfig {
        /// Description of the violated constraint.
        message: String,
    },

    /// A required input set is empty.
    #[error("no input: {what}")]
    EmptyInput {
        /// What was missing.
        what: String,
    },
}

impl AnalyticsError {
    pub(crate) fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }
}

/// A trained binary classifier.
pub trait Classifier {
    /// Probability that `features` belongs to the positive class.
    fn predict_proba(&self, features: &[f64]) -> f64;
}

/// Parses and validates an analysis configuration.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidConfig`] if the TOML is malformed or a
/// parameter is out of range.
pub fn parse_config(toml_str: &str) -> Result<AnalysisConfig, AnalyticsError> {
    let config: AnalysisConfig = toml::de::from_str(toml_str)
        .map_err(|e| AnalyticsError::invalid_config(e.to_string()))?;
    config.validate().map_err(AnalyticsError::invalid_config)?;
    Ok(config)
}

/// The embedded default configuration.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidConfig`] if the embedded file is broken,
/// which the tests below rule out.
pub fn default_config() -> Result<AnalysisConfig, AnalyticsError> {
    parse_config(DEFAULT_CONFIG_TOML)
}

/// Reads a configuration file from disk.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidConfig`] if the file cannot be read,
/// parsed, or validated.
pub fn load_config(path: &Path) -> Result<AnalysisConfig, AnalyticsError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        AnalyticsError::invalid_config(format!("cannot read {}: {e}", path.display()))
    })?;
    log::info!("Loaded analysis configuration from {}", path.display());
    parse_config(&text)
}
