//! Crime incident loader.
//!
//! Reads the police incident export: coordinates, crime type, the
//! quality-of-life flag that splits serious from minor offenses, the end
//! date of the incident, and an optional `HHMM` start time for the hour.

use std::io::Read;
use std::sync::Arc;

use decay_map_decay_models::{CrimeIncident, CrimeSeverity};
use decay_map_source_models::{DatasetDefinition, DatasetKind, DropReason};

use crate::parsing::{parse_flag, parse_hhmm_hour};
use crate::progress::ProgressCallback;
use crate::table::{Row, read_table};
use crate::{Dataset, DatasetLoader, SourceError, check_definition, point_from_row};

/// Loader for the crime incident dataset.
#[derive(Debug, Clone)]
pub struct CrimeLoader {
    definition: DatasetDefinition,
}

impl CrimeLoader {
    /// Creates a loader after checking the definition.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::WrongKind`] or [`SourceError::Schema`].
    pub fn new(definition: DatasetDefinition) -> Result<Self, SourceError> {
        check_definition(&definition, Self::KIND)?;
        Ok(Self { definition })
    }
}

impl DatasetLoader for CrimeLoader {
    type Record = CrimeIncident;
    const KIND: DatasetKind = DatasetKind::Crime;

    fn definition(&self) -> &DatasetDefinition {
        &self.definition
    }

    fn load<R: Read>(
        &self,
        input: R,
        progress: &Arc<dyn ProgressCallback>,
    ) -> Result<Dataset<CrimeIncident>, SourceError> {
        let mut records = Vec::new();
        let report = read_table(&self.definition, input, progress, |row, report| {
            match crime_from_row(row) {
                Ok(incident) => {
                    records.push(incident);
                    report.rows_kept += 1;
                }
                Err(reason) => report.drop_row(reason),
            }
        })?;

        Ok(Dataset { records, report })
    }
}

fn crime_from_row(row: &Row<'_>) -> Result<CrimeIncident, DropReason> {
    let crime_type = row.get("crime_type").unwrap_or("UNKNOWN");
    let point = point_from_row(row, Some("date"), crime_type)?;

    let severity = if row.get("quality_of_life").is_some_and(parse_flag) {
        CrimeSeverity::QualityOfLife
    } else {
        CrimeSeverity::Serious
    };

    Ok(CrimeIncident {
        point,
        severity,
        hour: row.get("time_start").and_then(parse_hhmm_hour),
    })
}
