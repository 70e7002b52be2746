#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Dataset loaders for the crime and property decay CSV files.
//!
//! Each dataset implements the [`DatasetLoader`] trait: it validates the
//! file's header against its [`DatasetDefinition`], parses every row into a
//! typed record, and drops rows with missing or invalid coordinates (or
//! unparseable dates) while counting them in a [`LoadReport`].

pub mod code_violations;
pub mod crime;
pub mod parsing;
pub mod progress;
pub mod registry;
pub mod status;
pub mod table;
pub mod tiering;
pub mod unfit;
pub mod vacant;

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use decay_map_source_models::{DatasetDefinition, DatasetKind, DropReason, LoadReport};

use crate::progress::ProgressCallback;

/// Errors that can occur while loading a dataset.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// A column the definition maps is absent from the file header.
    #[error("dataset '{dataset}' is missing required column '{column}' (field '{field}')")]
    MissingColumn {
        /// Definition id.
        dataset: String,
        /// Logical field name.
        field: String,
        /// Physical header that was expected.
        column: String,
    },

    /// The dataset definition itself is invalid.
    #[error("invalid dataset definition: {message}")]
    Schema {
        /// Description of what went wrong.
        message: String,
    },

    /// A definition of the wrong kind was handed to a loader.
    #[error("dataset '{dataset}' is a {actual} definition, expected {expected}")]
    WrongKind {
        /// Definition id.
        dataset: String,
        /// Kind the loader handles.
        expected: DatasetKind,
        /// Kind the definition declares.
        actual: DatasetKind,
    },

    /// CSV reader error that is not row-recoverable.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// I/O error (file open/read).
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Records loaded from one dataset plus the row accounting for the load.
#[derive(Debug, Clone)]
pub struct Dataset<T> {
    /// Parsed records, in file order.
    pub records: Vec<T>,
    /// What was read, kept, and dropped.
    pub report: LoadReport,
}

impl<T> Dataset<T> {
    /// An empty dataset standing in for one that failed to load. The
    /// report carries the failure reason.
    #[must_use]
    pub fn failed(dataset: &str, error: impl Into<String>) -> Self {
        Self {
            records: Vec::new(),
            report: LoadReport::failed(dataset, error),
        }
    }

    /// Number of records kept.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records were kept.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Trait that every dataset loader implements.
///
/// A loader owns its [`DatasetDefinition`] and knows how to turn validated
/// rows into records of [`DatasetLoader::Record`].
pub trait DatasetLoader {
    /// Record type produced by this loader.
    type Record;

    /// The dataset kind this loader accepts.
    const KIND: DatasetKind;

    /// The schema used by this loader.
    fn definition(&self) -> &DatasetDefinition;

    /// Parses records from any reader producing CSV text.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::MissingColumn`] if a mapped column is absent,
    /// or [`SourceError::Csv`]/[`SourceError::Io`] for unrecoverable reader
    /// failures. Row-level problems never fail the load.
    fn load<R: Read>(
        &self,
        input: R,
        progress: &Arc<dyn ProgressCallback>,
    ) -> Result<Dataset<Self::Record>, SourceError>;

    /// Opens `<data_dir>/<file_name>` and loads it.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Io`] if the file cannot be opened, plus
    /// everything [`DatasetLoader::load`] can return.
    fn load_from_dir(
        &self,
        data_dir: &Path,
        progress: &Arc<dyn ProgressCallback>,
    ) -> Result<Dataset<Self::Record>, SourceError> {
        let definition = self.definition();
        let path = data_dir.join(&definition.file_name);
        log::info!("[{}] Loading {}", definition.id, path.display());

        let file = std::fs::File::open(&path)?;
        let dataset = self.load(std::io::BufReader::new(file), progress)?;
        log_report(&dataset.report);
        Ok(dataset)
    }
}

/// Checks that a definition is valid and of the expected kind.
///
/// # Errors
///
/// Returns [`SourceError::WrongKind`] or [`SourceError::Schema`].
pub fn check_definition(
    definition: &DatasetDefinition,
    expected: DatasetKind,
) -> Result<(), SourceError> {
    if definition.kind != expected {
        return Err(SourceError::WrongKind {
            dataset: definition.id.clone(),
            expected,
            actual: definition.kind,
        });
    }
    definition
        .validate()
        .map_err(|message| SourceError::Schema { message })
}

/// Logs the outcome of a load, with one warning line per drop reason.
pub fn log_report(report: &LoadReport) {
    log::info!(
        "[{}] {} rows read, {} kept, {} dropped",
        report.dataset,
        report.rows_read,
        report.rows_kept,
        report.rows_dropped()
    );
    for (reason, count) in &report.dropped {
        if *reason == DropReason::Filtered {
            log::info!("[{}] {count} rows filtered out", report.dataset);
        } else {
            log::warn!("[{}] dropped {count} rows: {reason}", report.dataset);
        }
    }
    for (spelling, count) in &report.unknown_statuses {
        log::warn!(
            "[{}] {count} rows with unrecognized status '{spelling}' kept as UNKNOWN",
            report.dataset
        );
    }
}

/// Builds the shared [`decay_map_decay_models::PointRecord`] part of a row.
///
/// `date_field` names the logical date column; when `Some`, a missing or
/// unparseable date drops the row. The zip is read from the logical `zip`
/// field when mapped.
pub(crate) fn point_from_row(
    row: &table::Row<'_>,
    date_field: Option<&str>,
    category: &str,
) -> Result<decay_map_decay_models::PointRecord, DropReason> {
    let (latitude, longitude) =
        match parsing::parse_coordinates(row.get("latitude"), row.get("longitude")) {
            parsing::CoordinateParse::Valid(lat, lng) => (lat, lng),
            parsing::CoordinateParse::Missing => return Err(DropReason::MissingCoordinates),
            parsing::CoordinateParse::Invalid => return Err(DropReason::InvalidCoordinates),
        };

    let timestamp = match date_field {
        Some(field) => Some(
            row.get(field)
                .and_then(parsing::parse_date)
                .ok_or(DropReason::UnparseableDate)?,
        ),
        None => None,
    };

    let zip_code = row.get("zip").and_then(parsing::normalize_zip);

    decay_map_decay_models::PointRecord::new(latitude, longitude, timestamp, category, zip_code)
        .map_err(|_| DropReason::InvalidCoordinates)
}
