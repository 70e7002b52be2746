//! Unfit property loader.
//!
//! Properties the city has declared unfit for human occupancy. Each row is
//! one case with a status and the date the violation was issued.

use std::io::Read;
use std::sync::Arc;

use decay_map_decay_models::{DecayIndicator, DecayType};
use decay_map_source_models::{DatasetDefinition, DatasetKind, DropReason, LoadReport};

use crate::progress::ProgressCallback;
use crate::status::normalize_status_counted;
use crate::table::{Row, read_table};
use crate::{Dataset, DatasetLoader, SourceError, check_definition, point_from_row};

/// Loader for the unfit properties dataset.
#[derive(Debug, Clone)]
pub struct UnfitLoader {
    definition: DatasetDefinition,
}

impl UnfitLoader {
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

impl DatasetLoader for UnfitLoader {
    type Record = DecayIndicator;
    const KIND: DatasetKind = DatasetKind::Unfit;

    fn definition(&self) -> &DatasetDefinition {
        &self.definition
    }

    fn load<R: Read>(
        &self,
        input: R,
        progress: &Arc<dyn ProgressCallback>,
    ) -> Result<Dataset<DecayIndicator>, SourceError> {
        let mut records = Vec::new();
        let report = read_table(&self.definition, input, progress, |row, report| {
            match unfit_from_row(row, report) {
                Ok(indicator) => {
                    records.push(indicator);
                    report.rows_kept += 1;
                }
                Err(reason) => report.drop_row(reason),
            }
        })?;

        Ok(Dataset { records, report })
    }
}

fn unfit_from_row(row: &Row<'_>, report: &mut LoadReport) -> Result<DecayIndicator, DropReason> {
    let point = point_from_row(row, Some("violation_date"), DecayType::Unfit.as_ref())?;
    let status = normalize_status_counted(row.get("status"), report);

    Ok(DecayIndicator {
        point,
        decay_type: DecayType::Unfit,
        status,
        tier: None,
        neighborhood: None,
        address: row.get("address").map(str::to_owned),
    })
}
