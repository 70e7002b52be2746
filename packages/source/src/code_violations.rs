//! Code violation loader.
//!
//! Keeps only complaint types that describe physical decay and assigns each
//! kept violation a severity tier. Rows outside the decay complaint set and
//! administrative violations are counted as [`DropReason::Filtered`].

use std::io::Read;
use std::sync::Arc;

use decay_map_decay_models::{DecayIndicator, DecayType, ViolationStatus};
use decay_map_source_models::{DatasetDefinition, DatasetKind, DropReason, LoadReport};

use crate::progress::ProgressCallback;
use crate::status::normalize_status_counted;
use crate::table::{Row, read_table};
use crate::tiering::{assign_tier, is_decay_complaint};
use crate::{Dataset, DatasetLoader, SourceError, check_definition, point_from_row};

/// Loader for the code violations dataset.
#[derive(Debug, Clone)]
pub struct CodeViolationLoader {
    definition: DatasetDefinition,
}

impl CodeViolationLoader {
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

impl DatasetLoader for CodeViolationLoader {
    type Record = DecayIndicator;
    const KIND: DatasetKind = DatasetKind::CodeViolations;

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
            match violation_from_row(row, report) {
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

fn violation_from_row(
    row: &Row<'_>,
    report: &mut LoadReport,
) -> Result<DecayIndicator, DropReason> {
    let complaint_type = row.get("complaint_type").unwrap_or_default();
    if !is_decay_complaint(complaint_type) {
        return Err(DropReason::Filtered);
    }
    let tier = assign_tier(row.get("violation")).ok_or(DropReason::Filtered)?;

    let point = point_from_row(row, Some("violation_date"), complaint_type)?;

    // Older exports have no status column; those cases are all open.
    let status = if row.has_field("status") {
        normalize_status_counted(row.get("status"), report)
    } else {
        ViolationStatus::Open
    };

    Ok(DecayIndicator {
        point,
        decay_type: DecayType::CodeViolation,
        status,
        tier: Some(tier),
        neighborhood: row.get("neighborhood").map(str::to_owned),
        address: row.get("address").map(str::to_owned),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::null_progress;
    use crate::registry::definition_for;
    use decay_map_decay_models::ViolationTier;

    fn loader() -> CodeViolationLoader {
        CodeViolationLoader::new(definition_for(DatasetKind::CodeViolations).unwrap()).unwrap()
    }

    const HEADER: &str = "Latitude,Longitude,complaint_type_name,violation_date,Neighborhood,complaint_zip,violation,status_type_name,complaint_address";

    #[test]
    fn filters_and_tiers_violations() {
        let csv = format!(
            "{HEADER}\n\
             43.03,-76.13,Property Maintenance-Int,2022-02-01,Southside,13205,SPMC 107.1.3 Unfit for human occupancy,Open,1 A St\n\
             43.04,-76.14,Property Maintenance-Ext,2022-03-01,Southside,13205,504.1 Plumbing,Closed,2 A St\n\
             43.05,-76.15,\"Overgrowth: Private, Occ\",2022-04-01,Eastwood,13206,27-72 (e) Overgrowth,Open,3 A St\n\
             43.05,-76.15,Noise Complaint,2022-04-01,Eastwood,13206,loud,Open,4 A St\n\
             43.05,-76.15,Vacant House,2022-04-01,Eastwood,13206,27-133 Registration,Open,5 A St\n"
        );
        let dataset = loader().load(csv.as_bytes(), &null_progress()).unwrap();

        let tiers: Vec<_> = dataset.records.iter().map(|r| r.tier).collect();
        assert_eq!(
            tiers,
            vec![
                Some(ViolationTier::Structural),
                Some(ViolationTier::SystemsFailure),
                Some(ViolationTier::EnvironmentalNeglect),
            ]
        );
        assert_eq!(dataset.records[0].status, ViolationStatus::Open);
        assert_eq!(dataset.records[1].status, ViolationStatus::Closed);
        assert_eq!(dataset.report.dropped_for(DropReason::Filtered), 2);
    }

    #[test]
    fn carries_neighborhood_and_zip() {
        let csv = format!(
            "{HEADER}\n\
             43.05,-76.15,Vacant Lot,2022-04-01,Eastwood,13206.0,27-72 (e) Trash,Open,3 A St\n"
        );
        let dataset = loader().load(csv.as_bytes(), &null_progress()).unwrap();
        assert_eq!(dataset.len(), 1);
        let record = &dataset.records[0];
        assert_eq!(record.decay_type, DecayType::CodeViolation);
        assert_eq!(record.tier, Some(ViolationTier::EnvironmentalNeglect));
        assert_eq!(record.neighborhood.as_deref(), Some("Eastwood"));
        assert_eq!(record.point.zip_code.as_deref(), Some("13206"));
        assert_eq!(record.point.category, "Vacant Lot");
    }

    #[test]
    fn missing_status_column_reads_as_open() {
        let mut definition = definition_for(DatasetKind::CodeViolations).unwrap();
        definition.fields.remove("status");
        let loader = CodeViolationLoader::new(definition).unwrap();
        let csv = "Latitude,Longitude,complaint_type_name,violation_date,Neighborhood,complaint_zip,violation,complaint_address\n\
                   43.05,-76.15,Fire Safety,2022-04-01,Eastwood,13206,smoke detector,3 A St\n";
        let dataset = loader.load(csv.as_bytes(), &null_progress()).unwrap();
        assert_eq!(dataset.records[0].status, ViolationStatus::Open);
        assert!(dataset.report.unknown_statuses.is_empty());
    }

    #[test]
    fn built_in_schema_tolerates_absent_optional_columns() {
        let csv = "Latitude,Longitude,complaint_type_name,violation_date,Neighborhood\n\
                   43.05,-76.15,Fire Safety,2022-04-01,Eastwood\n";
        let dataset = loader().load(csv.as_bytes(), &null_progress()).unwrap();
        assert_eq!(dataset.len(), 1);
        let record = &dataset.records[0];
        assert_eq!(record.status, ViolationStatus::Open);
        assert_eq!(record.tier, Some(ViolationTier::EnvironmentalNeglect));
        assert_eq!(record.point.zip_code, None);
        assert_eq!(record.address, None);
        assert!(dataset.report.unknown_statuses.is_empty());
    }
}
