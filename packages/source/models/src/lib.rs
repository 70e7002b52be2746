#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Dataset schema definitions and load reports.
//!
//! Each municipal CSV file is described by a [`DatasetDefinition`] that maps
//! the logical fields a loader needs onto the physical column headers of
//! that file. Loaders validate the mapping up front and fail fast instead
//! of silently producing empty values.

use std::collections::BTreeMap;

use decay_map_decay_models::DecayType;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// The four datasets the analysis consumes.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DatasetKind {
    /// Police crime incidents
    Crime,
    /// Unfit-property violations
    Unfit,
    /// Vacant-property registrations
    Vacant,
    /// Code-enforcement violations
    CodeViolations,
}

impl DatasetKind {
    /// Returns all variants of this enum.
    #[must_use]
    pub const fn all() -> &'static [Self] {
        &[Self::Crime, Self::Unfit, Self::Vacant, Self::CodeViolations]
    }

    /// Logical fields a definition of this kind must map.
    #[must_use]
    pub const fn required_fields(self) -> &'static [&'static str] {
        match self {
            Self::Crime => &[
                "latitude",
                "longitude",
                "crime_type",
                "quality_of_life",
                "date",
            ],
            Self::Unfit => &["latitude", "longitude", "status", "violation_date", "zip"],
            Self::Vacant => &["latitude", "longitude", "neighborhood", "zip", "validity"],
            Self::CodeViolations => &[
                "latitude",
                "longitude",
                "complaint_type",
                "violation_date",
                "neighborhood",
            ],
        }
    }

    /// Logical fields a definition of this kind may map.
    #[must_use]
    pub const fn optional_fields(self) -> &'static [&'static str] {
        match self {
            Self::Crime => &["time_start", "zip"],
            Self::Unfit | Self::Vacant => &["address"],
            Self::CodeViolations => &["zip", "violation", "status", "address"],
        }
    }

    /// The decay indicator type produced by this dataset, if any.
    #[must_use]
    pub const fn decay_type(self) -> Option<DecayType> {
        match self {
            Self::Crime => None,
            Self::Unfit => Some(DecayType::Unfit),
            Self::Vacant => Some(DecayType::Vacant),
            Self::CodeViolations => Some(DecayType::CodeViolation),
        }
    }
}

/// A dataset schema: which file to read and how its columns map onto the
/// logical fields of its [`DatasetKind`].
///
/// Loaded from TOML. Every required logical field must be present in
/// `fields`; unknown logical fields are rejected by [`Self::validate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetDefinition {
    /// Unique identifier (e.g., `"syracuse_crime"`).
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Which dataset this definition describes.
    pub kind: DatasetKind,
    /// File name relative to the data directory.
    pub file_name: String,
    /// Field delimiter (default: comma).
    #[serde(default)]
    pub delimiter: Option<String>,
    /// Logical field name -> physical CSV header.
    pub fields: BTreeMap<String, String>,
}

impl DatasetDefinition {
    /// Physical column for a logical field.
    #[must_use]
    pub fn column(&self, field: &str) -> Option<&str> {
        self.fields.get(field).map(String::as_str)
    }

    /// Delimiter byte, defaulting to `,`.
    #[must_use]
    pub fn delimiter_byte(&self) -> u8 {
        self.delimiter
            .as_deref()
            .and_then(|d| d.as_bytes().first().copied())
            .unwrap_or(b',')
    }

    /// Checks that the field mapping covers every required logical field
    /// and mentions no unknown ones.
    ///
    /// # Errors
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        for field in self.kind.required_fields() {
            match self.fields.get(*field) {
                Some(column) if !column.trim().is_empty() => {}
                _ => {
                    return Err(format!(
                        "dataset '{}' does not map required field '{field}'",
                        self.id
                    ));
                }
            }
        }

        for field in self.fields.keys() {
            let known = self.kind.required_fields().contains(&field.as_str())
                || self.kind.optional_fields().contains(&field.as_str());
            if !known {
                return Err(format!(
                    "dataset '{}' maps unknown field '{field}' for kind {}",
                    self.id, self.kind
                ));
            }
        }

        Ok(())
    }
}

/// Why a row was dropped at load time.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DropReason {
    /// Latitude or longitude cell empty
    MissingCoordinates,
    /// Coordinate not a number, outside WGS84 bounds, or (0, 0)
    InvalidCoordinates,
    /// Date cell present but unparseable (or missing where required)
    UnparseableDate,
    /// Excluded by a dataset filter (e.g., administrative violations)
    Filtered,
    /// Row had fewer cells than the header
    MalformedRow,
}

/// Row accounting for a single dataset load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadReport {
    /// Definition id the report belongs to.
    pub dataset: String,
    /// Data rows read (excluding the header).
    pub rows_read: u64,
    /// Rows turned into records.
    pub rows_kept: u64,
    /// Dropped rows by reason.
    pub dropped: BTreeMap<DropReason, u64>,
    /// Status spellings that did not map to open/closed, with counts.
    pub unknown_statuses: BTreeMap<String, u64>,
    /// Why the dataset could not be loaded at all. Set only on the empty
    /// report that stands in for a failed load.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LoadReport {
    /// Creates an empty report for a dataset.
    #[must_use]
    pub fn new(dataset: impl Into<String>) -> Self {
        Self {
            dataset: dataset.into(),
            ..Self::default()
        }
    }

    /// Report for a dataset that failed to load, with no rows read.
    #[must_use]
    pub fn failed(dataset: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::new(dataset)
        }
    }

    /// Whether the dataset failed to load.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// Records a dropped row.
    pub fn drop_row(&mut self, reason: DropReason) {
        *self.dropped.entry(reason).or_insert(0) += 1;
    }

    /// Total rows dropped for any reason.
    #[must_use]
    pub fn rows_dropped(&self) -> u64 {
        self.dropped.values().sum()
    }

    /// Rows dropped for a specific reason.
    #[must_use]
    pub fn dropped_for(&self, reason: DropReason) -> u64 {
        self.dropped.get(&reason).copied().unwrap_or(0)
    }
}
