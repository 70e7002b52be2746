#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Parameter objects and result types for the decay analyses.
//!
//! Every analysis takes an explicit parameter object from [`config`] and
//! returns one of the immutable result structures defined here. Results
//! serialize to camelCase JSON for the presentation layer.

pub mod config;

use std::collections::BTreeMap;

use decay_map_decay_models::ViolationTier;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

pub use config::*;

/// A labelled count (crime type, neighborhood, month, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelCount {
    /// What is being counted.
    pub label: String,
    /// Number of records.
    pub count: u64,
}

impl LabelCount {
    /// Creates a labelled count.
    #[must_use]
    pub fn new(label: impl Into<String>, count: u64) -> Self {
        Self {
            label: label.into(),
            count,
        }
    }
}

// -- Proximity ------------------------------------------------------------

/// Which indicator types are within the radius of a crime.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum DecayZone {
    /// Near both an unfit and a vacant property.
    NearBoth,
    /// Near an unfit property only.
    NearUnfitOnly,
    /// Near a vacant property only.
    NearVacantOnly,
    /// Near neither.
    Neither,
}

impl DecayZone {
    /// Zone from the two per-type flags.
    #[must_use]
    pub const fn from_flags(near_unfit: bool, near_vacant: bool) -> Self {
        match (near_unfit, near_vacant) {
            (true, true) => Self::NearBoth,
            (true, false) => Self::NearUnfitOnly,
            (false, true) => Self::NearVacantOnly,
            (false, false) => Self::Neither,
        }
    }

    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::NearBoth,
            Self::NearUnfitOnly,
            Self::NearVacantOnly,
            Self::Neither,
        ]
    }
}

/// Proximity of one crime to the decay indicators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrimeProximity {
    /// Position of the crime in the input slice.
    pub crime_index: usize,
    /// Distance to the nearest indicator of the joined types, or `None`
    /// when there are no indicators.
    pub nearest_distance_m: Option<f64>,
    /// Whether the nearest indicator is within the threshold.
    pub near: bool,
    /// Within the threshold of an unfit property.
    pub near_unfit: bool,
    /// Within the threshold of a vacant property.
    pub near_vacant: bool,
    /// Combined unfit/vacant zone.
    pub zone: DecayZone,
    /// Code violations within the threshold.
    pub violations_nearby: u32,
    /// Sum of the tiers of those violations.
    pub violation_severity: u32,
    /// Whether any of them is structural.
    pub structural_nearby: bool,
}

/// Share of crimes within one radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RadiusShare {
    /// Radius in meters.
    pub distance_m: u32,
    /// Crimes whose nearest indicator is within the radius.
    pub crimes_within: u64,
    /// `crimes_within` as a percentage of all crimes.
    pub pct: f64,
}

/// Near/not-near counts for one crime type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrimeTypeProximity {
    /// Crime type.
    pub crime_type: String,
    /// Crimes of this type near an indicator.
    pub near: u64,
    /// Crimes of this type not near an indicator.
    pub not_near: u64,
}

/// Result of the proximity join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProximityResult {
    /// Threshold used for the per-crime flags.
    pub distance_m: u32,
    /// Number of crimes joined.
    pub crime_count: u64,
    /// Number of indicators joined against.
    pub indicator_count: u64,
    /// One entry per crime, in input order.
    pub crimes: Vec<CrimeProximity>,
    /// Crimes flagged near.
    pub near_count: u64,
    /// `near_count` as a percentage of all crimes.
    pub near_pct: f64,
    /// Cumulative shares for every candidate radius, ascending.
    pub radius_shares: Vec<RadiusShare>,
    /// Crimes near an unfit property.
    pub near_unfit_count: u64,
    /// Crimes near a vacant property.
    pub near_vacant_count: u64,
    /// Crimes per decay zone.
    pub zone_counts: BTreeMap<DecayZone, u64>,
    /// Most common crime types split by the near flag.
    pub by_crime_type: Vec<CrimeTypeProximity>,
}

// -- Classification --------------------------------------------------------

/// Zip classification label.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
pub enum ZipLabel {
    /// High decay and high crime.
    A,
    /// One-sided: high decay only, or either axis (per configuration).
    B,
    /// Everything else, including zips with no records at all.
    C,
}

impl ZipLabel {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::A, Self::B, Self::C]
    }

    /// Human-readable description.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::A => "Crime-blight feedback",
            Self::B => "One-sided decay or crime",
            Self::C => "Low risk / monitoring",
        }
    }
}

/// Per-zip counts, scores and label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZipAggregate {
    /// Five-digit zip or the normalized source spelling.
    pub zip_code: String,
    /// Unfit properties in the zip.
    pub unfit_count: u64,
    /// Vacant properties in the zip.
    pub vacant_count: u64,
    /// Code violations in the zip.
    pub violation_count: u64,
    /// Crimes attributed to the zip.
    pub crime_count: u64,
    /// Unfit cases still open.
    pub open_unfit_count: u64,
    /// `open_unfit_count / unfit_count`, zero without unfit cases.
    pub pct_unresolved: f64,
    /// Weighted normalized decay score in `[0, 1]`.
    pub decay_index: f64,
    /// Composite 0-100 risk score.
    pub risk_score: f64,
    /// Assigned label.
    pub classification: ZipLabel,
}

/// Vacant properties in low-crime zips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbandonmentZones {
    /// Crime count at the configured quantile.
    pub crime_threshold: f64,
    /// Zips at or below the threshold.
    pub low_crime_zips: Vec<String>,
    /// Vacant properties located in those zips.
    pub vacant_count: u64,
}

/// Result of the decay classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationResult {
    /// One entry per zip, highest risk first.
    pub zips: Vec<ZipAggregate>,
    /// Median decay index across zips.
    pub decay_median: f64,
    /// Median crime count across zips.
    pub crime_median: f64,
    /// Number of zips per label.
    pub label_counts: BTreeMap<ZipLabel, u64>,
    /// Economic abandonment view.
    pub abandonment: AbandonmentZones,
    /// Crimes with no zip and no centroid to assign one from.
    pub unattributed_crimes: u64,
}

// -- Causality -------------------------------------------------------------

/// Direction of a lagged causality test.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CausalDirection {
    /// Past decay counts predicting crime counts.
    DecayToCrime,
    /// Past crime counts predicting decay counts.
    CrimeToDecay,
}

/// One F test at one lag order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LagTest {
    /// Which series is the cause.
    pub direction: CausalDirection,
    /// Lag order.
    pub lag: usize,
    /// F statistic.
    pub f_statistic: f64,
    /// p-value of the F statistic.
    pub p_value: f64,
    /// Numerator degrees of freedom.
    pub df_num: usize,
    /// Denominator degrees of freedom.
    pub df_den: usize,
    /// `p_value` below the configured significance level.
    pub significant: bool,
}

/// Overall reading of the two directions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum CausalityInterpretation {
    /// Both directions significant at some lag.
    FeedbackLoop,
    /// Only decay predicts crime.
    DecayLeadsCrime,
    /// Only crime predicts decay.
    CrimeLeadsDecay,
    /// Neither direction significant.
    NoSignificantRelationship,
}

impl CausalityInterpretation {
    /// Interpretation from whether each direction had a significant lag.
    #[must_use]
    pub const fn from_directions(decay_to_crime: bool, crime_to_decay: bool) -> Self {
        match (decay_to_crime, crime_to_decay) {
            (true, true) => Self::FeedbackLoop,
            (true, false) => Self::DecayLeadsCrime,
            (false, true) => Self::CrimeLeadsDecay,
            (false, false) => Self::NoSignificantRelationship,
        }
    }

    /// One-line explanation for display.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::FeedbackLoop => "Decay and crime predict each other (feedback loop)",
            Self::DecayLeadsCrime => "Decay precedes and predicts crime",
            Self::CrimeLeadsDecay => "Crime precedes and predicts decay",
            Self::NoSignificantRelationship => "No significant lagged relationship",
        }
    }
}

/// Monthly counts of both series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyCounts {
    /// `YYYY-MM`.
    pub month: String,
    /// Decay indicators dated in the month.
    pub decay: u64,
    /// Crimes dated in the month.
    pub crime: u64,
}

/// Result of the bidirectional causality test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CausalityResult {
    /// The zero-filled monthly series that were tested.
    pub series: Vec<MonthlyCounts>,
    /// Every (direction, lag) test, decay-to-crime first, lags ascending.
    pub tests: Vec<LagTest>,
    /// Significance level used.
    pub significance: f64,
    /// Overall reading.
    pub interpretation: CausalityInterpretation,
}

impl CausalityResult {
    /// Tests for one direction.
    pub fn direction(&self, direction: CausalDirection) -> impl Iterator<Item = &LagTest> {
        self.tests.iter().filter(move |t| t.direction == direction)
    }

    /// Smallest p-value in one direction.
    #[must_use]
    pub fn min_p_value(&self, direction: CausalDirection) -> Option<f64> {
        self.direction(direction).map(|t| t.p_value).reduce(f64::min)
    }
}

// -- Hotspots --------------------------------------------------------------

/// One grid cell with its history and predicted risk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridCell {
    /// `r{row}_c{col}`.
    pub cell_id: String,
    /// Row counted from the south edge.
    pub row: u32,
    /// Column counted from the west edge.
    pub col: u32,
    /// South latitude of the cell.
    pub south: f64,
    /// West longitude of the cell.
    pub west: f64,
    /// North latitude of the cell.
    pub north: f64,
    /// East longitude of the cell.
    pub east: f64,
    /// Centre latitude.
    pub center_lat: f64,
    /// Centre longitude.
    pub center_lng: f64,
    /// Crimes per window year.
    pub yearly_counts: BTreeMap<i32, u64>,
    /// Top cell in at least the configured number of years.
    pub is_chronic_hotspot: bool,
    /// Predicted probability of being a chronic hotspot, scored on the
    /// held-out year.
    pub predicted_risk: f64,
    /// Unfit properties in the cell.
    pub unfit_count: u64,
    /// Vacant properties in the cell.
    pub vacant_count: u64,
    /// Code violations in the cell.
    pub violation_count: u64,
}

/// Held-out classification quality.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelMetrics {
    /// Cells scored.
    pub samples: u64,
    /// Correctly classified share at a 0.5 cut.
    pub accuracy: f64,
    /// Precision of the positive class, zero without positive predictions.
    pub precision: f64,
    /// Recall of the positive class, zero without positive labels.
    pub recall: f64,
}

/// Result of the hotspot predictor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HotspotResult {
    /// Cell edge in meters.
    pub cell_size_m: f64,
    /// Grid rows.
    pub rows: u32,
    /// Grid columns.
    pub cols: u32,
    /// Classifier family used.
    pub classifier: ClassifierKind,
    /// Years the classifier was trained on.
    pub training_years: Vec<i32>,
    /// Year that was scored.
    pub holdout_year: i32,
    /// Every cell with at least one crime or indicator, in cell order.
    pub cells: Vec<GridCell>,
    /// Highest-risk cells, risk descending then cell id.
    pub top_cells: Vec<GridCell>,
    /// Number of chronic hotspot cells.
    pub chronic_count: u64,
    /// Held-out quality.
    pub metrics: ModelMetrics,
    /// Mean crimes per active cell in the future window of the held-out
    /// year.
    pub avg_future_crimes: f64,
}

// -- Descriptive statistics -----------------------------------------------

/// Headline numbers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Kpis {
    /// Crimes loaded.
    pub total_crimes: u64,
    /// Distinct crime types.
    pub crime_types: u64,
    /// Serious crimes.
    pub serious_crimes: u64,
    /// Quality-of-life crimes.
    pub quality_of_life_crimes: u64,
    /// Unfit properties.
    pub unfit_total: u64,
    /// Open unfit cases.
    pub open_unfit: u64,
    /// Vacant properties.
    pub vacant_total: u64,
    /// Active (unregistered) vacancies.
    pub active_vacancies: u64,
    /// Code violations kept.
    pub violation_total: u64,
    /// Structural code violations.
    pub structural_violations: u64,
}

/// Projected count for a future year.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct YearForecast {
    /// Calendar year.
    pub year: i32,
    /// Projected count, floored at zero.
    pub projected: f64,
}

/// Violation count for one tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TierCount {
    /// Tier.
    pub tier: ViolationTier,
    /// Violations in the tier.
    pub count: u64,
}

/// Descriptive statistics over all four datasets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryStats {
    /// Headline numbers.
    pub kpis: Kpis,
    /// Crimes per calendar month, `1` to `12`.
    pub crime_by_month: Vec<LabelCount>,
    /// Crimes per hour of day, `0` to `23`, for crimes with a start time.
    pub crime_by_hour: Vec<LabelCount>,
    /// Crimes per time-of-day bucket.
    pub crime_by_time_of_day: Vec<LabelCount>,
    /// Crimes per season.
    pub crime_by_season: Vec<LabelCount>,
    /// Most common crime types.
    pub top_crime_types: Vec<LabelCount>,
    /// Serious vs quality-of-life.
    pub severity_split: Vec<LabelCount>,
    /// Unfit cases per violation year.
    pub unfit_by_year: Vec<LabelCount>,
    /// Linear projection of unfit cases for the following years.
    pub unfit_forecast: Vec<YearForecast>,
    /// Open unfit cases per zip, descending.
    pub open_unfit_by_zip: Vec<LabelCount>,
    /// Vacancies per neighborhood, descending.
    pub vacancies_by_neighborhood: Vec<LabelCount>,
    /// Violations per tier, most severe first.
    pub violations_by_tier: Vec<TierCount>,
    /// Violations per year.
    pub violations_by_year: Vec<LabelCount>,
}
