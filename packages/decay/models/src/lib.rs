#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Core record types for the urban decay analysis.
//!
//! Every loader produces either [`DecayIndicator`] or [`CrimeIncident`]
//! records, both of which wrap a validated [`PointRecord`]. Records are
//! immutable once loaded; every analysis derives its own tables from them.

use chrono::{Datelike as _, NaiveDate};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// Kind of decay indicator a property record represents.
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
pub enum DecayType {
    /// Property declared unfit for habitation
    Unfit,
    /// Registered vacant property
    Vacant,
    /// Physical-decay code violation
    CodeViolation,
}

impl DecayType {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Unfit, Self::Vacant, Self::CodeViolation]
    }
}

/// Normalized case status shared by all decay datasets.
///
/// Source files spell statuses differently (and vacancy records only carry
/// a registration validity flag), so anything that is not clearly open or
/// closed is kept as [`ViolationStatus::Unknown`] rather than guessed.
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
pub enum ViolationStatus {
    /// Case is open / unresolved
    Open,
    /// Case is closed / resolved
    Closed,
    /// Status spelling not recognized
    Unknown,
}

impl ViolationStatus {
    /// Whether the case is still unresolved.
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

/// Crime severity split used throughout the dashboard.
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
pub enum CrimeSeverity {
    /// Part I style offenses (assault, robbery, burglary, ...)
    Serious,
    /// Quality-of-life offenses
    QualityOfLife,
}

/// Severity tier of a physical-decay code violation.
///
/// The numeric value doubles as the severity weight when violations near a
/// crime are summed.
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
pub enum ViolationTier {
    /// Tier 1: overgrowth, trash, exterior blight
    EnvironmentalNeglect = 1,
    /// Tier 2: plumbing, electrical, heating, life-safety systems
    SystemsFailure = 2,
    /// Tier 3: structural members, stairs, unfit for habitation
    Structural = 3,
}

impl ViolationTier {
    /// Returns the numeric weight of this tier.
    #[must_use]
    pub const fn value(self) -> u8 {
        self as u8
    }

    /// Human-readable label used in reports.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Structural => "Structural / Critical",
            Self::SystemsFailure => "Systems Failure",
            Self::EnvironmentalNeglect => "Environmental Neglect",
        }
    }

    /// Returns all variants of this enum, most severe first.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[
            Self::Structural,
            Self::SystemsFailure,
            Self::EnvironmentalNeglect,
        ]
    }
}

/// Coarse time-of-day bucket derived from the incident hour.
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
pub enum TimeOfDay {
    /// 00:00 - 05:59
    Night,
    /// 06:00 - 11:59
    Morning,
    /// 12:00 - 17:59
    Afternoon,
    /// 18:00 - 23:59
    Evening,
}

impl TimeOfDay {
    /// Buckets an hour of the day (0-23). Hours past 23 wrap.
    #[must_use]
    pub const fn from_hour(hour: u32) -> Self {
        match hour % 24 {
            0..=5 => Self::Night,
            6..=11 => Self::Morning,
            12..=17 => Self::Afternoon,
            _ => Self::Evening,
        }
    }
}

/// Meteorological season derived from the month.
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
pub enum Season {
    /// December - February
    Winter,
    /// March - May
    Spring,
    /// June - August
    Summer,
    /// September - November
    Fall,
}

impl Season {
    /// Maps a calendar month (1-12) to its season.
    #[must_use]
    pub const fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Self::Spring,
            6..=8 => Self::Summer,
            9..=11 => Self::Fall,
            _ => Self::Winter,
        }
    }
}

/// Error returned when a coordinate pair falls outside WGS84 bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidCoordinateError {
    /// Rejected latitude.
    pub latitude: f64,
    /// Rejected longitude.
    pub longitude: f64,
}

impl std::fmt::Display for InvalidCoordinateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid coordinate ({}, {}): latitude must be in [-90, 90] and longitude in [-180, 180]",
            self.latitude, self.longitude
        )
    }
}

impl std::error::Error for InvalidCoordinateError {}

/// A geolocated, optionally dated record shared by every dataset.
///
/// Construct through [`PointRecord::new`], which enforces the WGS84 range
/// invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointRecord {
    latitude: f64,
    longitude: f64,
    /// Date of the event. Vacancy registrations carry no date.
    pub timestamp: Option<NaiveDate>,
    /// Source-specific category (crime type, complaint type, ...).
    pub category: String,
    /// Normalized five-digit zip code, when known.
    pub zip_code: Option<String>,
}

impl PointRecord {
    /// Creates a point record after validating the coordinate range.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCoordinateError`] if the latitude is outside
    /// `[-90, 90]` or the longitude is outside `[-180, 180]` (including
    /// NaN values).
    pub fn new(
        latitude: f64,
        longitude: f64,
        timestamp: Option<NaiveDate>,
        category: impl Into<String>,
        zip_code: Option<String>,
    ) -> Result<Self, InvalidCoordinateError> {
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(InvalidCoordinateError {
                latitude,
                longitude,
            });
        }

        Ok(Self {
            latitude,
            longitude,
            timestamp,
            category: category.into(),
            zip_code,
        })
    }

    /// Latitude in degrees (WGS84).
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees (WGS84).
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Calendar year of the timestamp.
    #[must_use]
    pub fn year(&self) -> Option<i32> {
        self.timestamp.map(|d| d.year())
    }

    /// Calendar month (1-12) of the timestamp.
    #[must_use]
    pub fn month(&self) -> Option<u32> {
        self.timestamp.map(|d| d.month())
    }
}

/// A property-level decay record (unfit, vacant, or code violation).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DecayIndicator {
    /// Location, date and zip.
    pub point: PointRecord,
    /// Which dataset the record came from.
    pub decay_type: DecayType,
    /// Normalized case status.
    pub status: ViolationStatus,
    /// Severity tier (code violations only).
    pub tier: Option<ViolationTier>,
    /// Neighborhood name, when the source provides one.
    pub neighborhood: Option<String>,
    /// Street address, when the source provides one.
    pub address: Option<String>,
}

/// A geolocated crime incident with derived time fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrimeIncident {
    /// Location, date and zip. `category` holds the crime type.
    pub point: PointRecord,
    /// Serious vs quality-of-life.
    pub severity: CrimeSeverity,
    /// Hour of day (0-23) the incident started, when known.
    pub hour: Option<u32>,
}

impl CrimeIncident {
    /// Raw crime type string from the source.
    #[must_use]
    pub fn crime_type(&self) -> &str {
        &self.point.category
    }

    /// Time-of-day bucket, when the hour is known.
    #[must_use]
    pub fn time_of_day(&self) -> Option<TimeOfDay> {
        self.hour.map(TimeOfDay::from_hour)
    }

    /// Season of the incident date, when dated.
    #[must_use]
    pub fn season(&self) -> Option<Season> {
        self.point.month().map(Season::from_month)
    }

    /// Whether this incident counts as a serious crime.
    #[must_use]
    pub const fn is_serious(&self) -> bool {
        matches!(self.severity, CrimeSeverity::Serious)
    }
}
