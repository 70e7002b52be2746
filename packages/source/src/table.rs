//! Schema-validated CSV table reader.
//!
//! Resolves every logical field of a [`DatasetDefinition`] to a column
//! position once, from the header row, and then hands each data row to a
//! visitor as a [`Row`] that is addressed by logical field name. A required
//! column missing from the header fails the whole load with
//! [`SourceError::MissingColumn`]; an optional one is left unmapped and
//! reads as `None`. Nothing is matched loosely.

use std::collections::BTreeMap;
use std::io::Read;
use std::sync::Arc;

use decay_map_source_models::{DatasetDefinition, DropReason, LoadReport};

use crate::SourceError;
use crate::progress::ProgressCallback;

/// Rows between progress updates.
const PROGRESS_STRIDE: u64 = 10_000;

/// Logical field -> column position, resolved from the header row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnIndex {
    positions: BTreeMap<String, usize>,
}

impl ColumnIndex {
    /// Resolves the definition's field mapping against a header row.
    /// Headers are compared after trimming. Optional fields whose column is
    /// absent are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::MissingColumn`] for the first column of a
    /// required field that does not appear in `headers`.
    pub fn resolve(
        definition: &DatasetDefinition,
        headers: &csv::StringRecord,
    ) -> Result<Self, SourceError> {
        let header_positions: BTreeMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().trim_start_matches('\u{feff}'), i))
            .collect();

        let required = definition.kind.required_fields();
        let mut positions = BTreeMap::new();
        for (field, column) in &definition.fields {
            let Some(&pos) = header_positions.get(column.trim()) else {
                if !required.contains(&field.as_str()) {
                    log::debug!(
                        "[{}] optional column '{column}' (field '{field}') not present",
                        definition.id
                    );
                    continue;
                }
                return Err(SourceError::MissingColumn {
                    dataset: definition.id.clone(),
                    field: field.clone(),
                    column: column.clone(),
                });
            };
            positions.insert(field.clone(), pos);
        }

        Ok(Self { positions })
    }

    /// Column position for a logical field.
    #[must_use]
    pub fn position(&self, field: &str) -> Option<usize> {
        self.positions.get(field).copied()
    }
}

/// One data row, addressed by logical field name.
pub struct Row<'a> {
    record: &'a csv::StringRecord,
    index: &'a ColumnIndex,
}

impl<'a> Row<'a> {
    /// Trimmed cell value for a logical field. Empty cells, unmapped
    /// optional fields, and short rows all read as `None`.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&'a str> {
        let pos = self.index.position(field)?;
        let value = self.record.get(pos)?.trim();
        (!value.is_empty()).then_some(value)
    }

    /// Whether this logical field is mapped and present in the header.
    #[must_use]
    pub fn has_field(&self, field: &str) -> bool {
        self.index.position(field).is_some()
    }
}

/// Reads every data row of a CSV source, resolving the header first.
///
/// `visit` is called once per well-formed row with the row and the load
/// report; it decides whether to keep the row (incrementing `rows_kept`)
/// or drop it (via [`LoadReport::drop_row`]). Rows the CSV reader cannot
/// decode are dropped as [`DropReason::MalformedRow`].
///
/// # Errors
///
/// Returns [`SourceError::MissingColumn`] if the header lacks a required
/// column, or [`SourceError::Csv`] on I/O failures while reading.
pub fn read_table<R: Read>(
    definition: &DatasetDefinition,
    input: R,
    progress: &Arc<dyn ProgressCallback>,
    mut visit: impl FnMut(&Row<'_>, &mut LoadReport),
) -> Result<LoadReport, SourceError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(definition.delimiter_byte())
        .flexible(true)
        .from_reader(input);

    let headers = reader.headers()?.clone();
    let index = ColumnIndex::resolve(definition, &headers)?;

    let mut report = LoadReport::new(&definition.id);
    progress.set_message(format!("Loading {}", definition.name));

    for result in reader.records() {
        report.rows_read += 1;
        match result {
            Ok(record) => {
                let row = Row {
                    record: &record,
                    index: &index,
                };
                visit(&row, &mut report);
            }
            Err(e) if e.is_io_error() => return Err(SourceError::Csv(e)),
            Err(e) => {
                log::debug!("[{}] skipping malformed row: {e}", definition.id);
                report.drop_row(DropReason::MalformedRow);
            }
        }

        if report.rows_read % PROGRESS_STRIDE == 0 {
            progress.inc(PROGRESS_STRIDE);
        }
    }

    progress.inc(report.rows_read % PROGRESS_STRIDE);
    progress.finish(format!(
        "{}: {} of {} rows kept",
        definition.name, report.rows_kept, report.rows_read
    ));

    Ok(report)
}
