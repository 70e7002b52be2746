//! Vacant property registry loader.
//!
//! The registry has no case date. Its `VPR_valid` flag says whether the
//! owner holds a valid vacancy registration; an unregistered vacancy is
//! treated as an open problem.

use std::io::Read;
use std::sync::Arc;

use decay_map_decay_models::{DecayIndicator, DecayType};
use decay_map_source_models::{DatasetDefinition, DatasetKind, DropReason};

use crate::progress::ProgressCallback;
use crate::status::vacancy_status;
use crate::table::{Row, read_table};
use crate::{Dataset, DatasetLoader, SourceError, check_definition, point_from_row};

/// Loader for the vacant property registry.
#[derive(Debug, Clone)]
pub struct VacantLoader {
    definition: DatasetDefinition,
}

impl VacantLoader {
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

impl DatasetLoader for VacantLoader {
    type Record = DecayIndicator;
    const KIND: DatasetKind = DatasetKind::Vacant;

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
            match vacant_from_row(row) {
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

fn vacant_from_row(row: &Row<'_>) -> Result<DecayIndicator, DropReason> {
    let point = point_from_row(row, None, DecayType::Vacant.as_ref())?;

    Ok(DecayIndicator {
        point,
        decay_type: DecayType::Vacant,
        status: vacancy_status(row.get("validity")),
        tier: None,
        neighborhood: row.get("neighborhood").map(str::to_owned),
        address: row.get("address").map(str::to_owned),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::null_progress;
    use crate::registry::definition_for;
    use decay_map_decay_models::ViolationStatus;

    fn loader() -> VacantLoader {
        VacantLoader::new(definition_for(DatasetKind::Vacant).unwrap()).unwrap()
    }

    #[test]
    fn validity_flag_maps_to_status() {
        let csv = "\
Latitude,Longitude,neighborhood,Zip,VPR_valid,PropertyAddress
43.03,-76.13,Southside,13205,Y,1 A St
43.04,-76.14,Near Westside,13204,N,2 B St
43.05,-76.15,Northside,13208,,
";
        let dataset = loader().load(csv.as_bytes(), &null_progress()).unwrap();
        assert_eq!(dataset.len(), 3);
        assert_eq!(dataset.records[0].status, ViolationStatus::Closed);
        assert_eq!(dataset.records[1].status, ViolationStatus::Open);
        assert_eq!(dataset.records[2].status, ViolationStatus::Open);
        assert_eq!(
            dataset.records[1].neighborhood.as_deref(),
            Some("Near Westside")
        );
    }

    #[test]
    fn vacancies_have_no_date() {
        let csv = "Latitude,Longitude,neighborhood,Zip,VPR_valid,PropertyAddress\n\
                   43.03,-76.13,Southside,13205,Y,1 A St\n";
        let dataset = loader().load(csv.as_bytes(), &null_progress()).unwrap();
        assert_eq!(dataset.records[0].point.timestamp, None);
        assert_eq!(dataset.records[0].decay_type, DecayType::Vacant);
    }

    #[test]
    fn zero_coordinates_are_invalid() {
        let csv = "Latitude,Longitude,neighborhood,Zip,VPR_valid,PropertyAddress\n\
                   0,0,Southside,13205,Y,\n";
        let dataset = loader().load(csv.as_bytes(), &null_progress()).unwrap();
        assert!(dataset.is_empty());
        assert_eq!(
            dataset.report.dropped_for(DropReason::InvalidCoordinates),
            1
        );
    }

    #[test]
    fn absent_address_column_is_tolerated() {
        let csv = "Latitude,Longitude,neighborhood,Zip,VPR_valid\n\
                   43.03,-76.13,Southside,13205,N\n";
        let dataset = loader().load(csv.as_bytes(), &null_progress()).unwrap();
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.records[0].address, None);
        assert_eq!(dataset.records[0].status, ViolationStatus::Open);
    }

    #[test]
    fn points_on_the_prime_meridian_are_kept() {
        let csv = "Latitude,Longitude,neighborhood,Zip,VPR_valid\n\
                   51.48,0,Greenwich,13205,N\n";
        let dataset = loader().load(csv.as_bytes(), &null_progress()).unwrap();
        assert_eq!(dataset.len(), 1);
        assert!(dataset.records[0].point.longitude().abs() < f64::EPSILON);
    }
}
