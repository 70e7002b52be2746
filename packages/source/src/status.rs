//! Case status normalization.
//!
//! Unfit and code-violation exports carry a free-text status column while
//! the vacancy registry only has a registration validity flag. Both are
//! mapped onto [`ViolationStatus`]; spellings that are not clearly open or
//! closed become [`ViolationStatus::Unknown`] and are counted in the
//! [`LoadReport`] instead of being guessed.

use decay_map_decay_models::ViolationStatus;
use decay_map_source_models::LoadReport;

/// Maps a status cell to the normalized vocabulary.
#[must_use]
pub fn normalize_status(raw: Option<&str>) -> ViolationStatus {
    match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
        Some("open") => ViolationStatus::Open,
        Some("closed") => ViolationStatus::Closed,
        _ => ViolationStatus::Unknown,
    }
}

/// Like [`normalize_status`], recording unrecognized spellings in the
/// report. A missing cell is recorded as `<blank>`.
pub fn normalize_status_counted(raw: Option<&str>, report: &mut LoadReport) -> ViolationStatus {
    let status = normalize_status(raw);
    if status == ViolationStatus::Unknown {
        let spelling = raw.map_or_else(|| "<blank>".to_owned(), |s| s.trim().to_owned());
        *report.unknown_statuses.entry(spelling).or_insert(0) += 1;
    }
    status
}

/// Maps a vacancy registration validity flag to a status.
///
/// A valid registration (`Y`) means the vacancy is registered and
/// resolved; anything else, including a blank cell, is an active vacancy.
#[must_use]
pub fn vacancy_status(validity: Option<&str>) -> ViolationStatus {
    match validity.map(str::trim) {
        Some(flag) if flag.eq_ignore_ascii_case("y") => ViolationStatus::Closed,
        _ => ViolationStatus::Open,
    }
}
