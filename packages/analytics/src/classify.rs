//! Per-zip decay classification.
//!
//! Indicator and crime counts are aggregated per zip code. The decay index
//! of a zip is the weighted mean of its unfit, vacant and violation counts,
//! each divided by the largest count of that type across zips, so it lies
//! in `[0, 1]`. Labels compare the index and the crime count against their
//! medians across zips:
//!
//! * `A` when both are high
//! * `B` according to the configured [`SecondaryRule`]
//! * `C` otherwise, and always for a zip with no indicators and no crimes

use std::collections::{BTreeMap, BTreeSet};

use decay_map_analytics_models::{
    AbandonmentZones, ClassificationParams, ClassificationResult, SecondaryRule, ZipAggregate,
    ZipLabel,
};
use decay_map_decay_models::{CrimeIncident, DecayIndicator, DecayType};

use crate::stats::{median, min_max_normalize, quantile};
use crate::zips::attribute_crimes;
use crate::AnalyticsError;

/// Raw per-zip counts, the input of [`classify_counts`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ZipCounts {
    /// Five-digit zip code.
    pub zip_code: String,
    /// Unfit properties.
    pub unfit: u64,
    /// Vacant properties.
    pub vacant: u64,
    /// Code violations.
    pub violation: u64,
    /// Crime incidents.
    pub crime: u64,
    /// Unfit properties still open.
    pub open_unfit: u64,
}

impl ZipCounts {
    /// Counts for a zip with nothing recorded.
    #[must_use]
    pub fn new(zip_code: impl Into<String>) -> Self {
        Self {
            zip_code: zip_code.into(),
            ..Self::default()
        }
    }

    const fn is_empty(&self) -> bool {
        self.unfit == 0 && self.vacant == 0 && self.violation == 0 && self.crime == 0
    }
}

/// Aggregates indicators and crimes per zip, then classifies.
///
/// The zip set is every zip carried by an indicator plus every zip a crime
/// is attributed to (its own, or the nearest indicator zip centroid).
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidConfig`] if the parameters fail
/// validation.
pub fn classify_zips(
    crimes: &[CrimeIncident],
    indicators: &[DecayIndicator],
    params: &ClassificationParams,
) -> Result<ClassificationResult, AnalyticsError> {
    params.validate().map_err(AnalyticsError::invalid_config)?;

    let mut counts: BTreeMap<String, ZipCounts> = BTreeMap::new();
    let mut vacant_by_zip: BTreeMap<String, u64> = BTreeMap::new();
    for indicator in indicators {
        let Some(zip) = indicator.point.zip_code.as_deref() else {
            continue;
        };
        let entry = counts
            .entry(zip.to_owned())
            .or_insert_with(|| ZipCounts::new(zip));
        match indicator.decay_type {
            DecayType::Unfit => {
                entry.unfit += 1;
                if indicator.status.is_open() {
                    entry.open_unfit += 1;
                }
            }
            DecayType::Vacant => {
                entry.vacant += 1;
                if indicator.status.is_open() {
                    *vacant_by_zip.entry(zip.to_owned()).or_default() += 1;
                }
            }
            DecayType::CodeViolation => entry.violation += 1,
        }
    }

    let crime_zips = attribute_crimes(crimes, indicators);
    for zip in crime_zips.zips.iter().flatten() {
        counts
            .entry(zip.clone())
            .or_insert_with(|| ZipCounts::new(zip.as_str()))
            .crime += 1;
    }

    let counts: Vec<ZipCounts> = counts.into_values().collect();
    let zips = classify_counts(&counts, params)?;

    let decay_values: Vec<f64> = zips.iter().map(|z| z.decay_index).collect();
    let crime_values: Vec<f64> = zips.iter().map(|z| crime_as_f64(z.crime_count)).collect();

    let mut label_counts: BTreeMap<ZipLabel, u64> =
        ZipLabel::all().iter().map(|l| (*l, 0)).collect();
    for zip in &zips {
        *label_counts.entry(zip.classification).or_default() += 1;
    }

    let abandonment = abandonment_zones(&zips, &vacant_by_zip, params.abandonment_crime_quantile);

    log::info!(
        "Classified {} zips: {}",
        zips.len(),
        label_counts
            .iter()
            .map(|(label, count)| format!("{label}={count}"))
            .collect::<Vec<_>>()
            .join(", ")
    );

    Ok(ClassificationResult {
        decay_median: median(&decay_values),
        crime_median: median(&crime_values),
        zips,
        label_counts,
        abandonment,
        unattributed_crimes: crime_zips.unattributed,
    })
}

/// Decay index, risk score and label for each zip, sorted by risk score
/// (highest first) and then zip code. Duplicate zip codes are merged.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidConfig`] if the parameters fail
/// validation.
#[allow(clippy::cast_precision_loss)]
pub fn classify_counts(
    counts: &[ZipCounts],
    params: &ClassificationParams,
) -> Result<Vec<ZipAggregate>, AnalyticsError> {
    params.validate().map_err(AnalyticsError::invalid_config)?;

    let mut merged: BTreeMap<&str, ZipCounts> = BTreeMap::new();
    for c in counts {
        let entry = merged
            .entry(c.zip_code.as_str())
            .or_insert_with(|| ZipCounts::new(c.zip_code.as_str()));
        entry.unfit += c.unfit;
        entry.vacant += c.vacant;
        entry.violation += c.violation;
        entry.crime += c.crime;
        entry.open_unfit += c.open_unfit;
    }
    let counts: Vec<ZipCounts> = merged.into_values().collect();

    let max_unfit = counts.iter().map(|c| c.unfit).max().unwrap_or(0);
    let max_vacant = counts.iter().map(|c| c.vacant).max().unwrap_or(0);
    let max_violation = counts.iter().map(|c| c.violation).max().unwrap_or(0);

    let w = &params.decay_weights;
    let decay_index: Vec<f64> = counts
        .iter()
        .map(|c| {
            let weighted = w.violation.mul_add(
                scaled(c.violation, max_violation),
                w.unfit
                    .mul_add(scaled(c.unfit, max_unfit), w.vacant * scaled(c.vacant, max_vacant)),
            );
            weighted / w.sum()
        })
        .collect();

    let crime: Vec<f64> = counts.iter().map(|c| crime_as_f64(c.crime)).collect();
    let pct_unresolved: Vec<f64> = counts
        .iter()
        .map(|c| {
            if c.unfit == 0 {
                0.0
            } else {
                c.open_unfit as f64 * 100.0 / c.unfit as f64
            }
        })
        .collect();

    let decay_median = median(&decay_index);
    let crime_median = median(&crime);

    let norm_crime = min_max_normalize(&crime);
    let norm_decay = min_max_normalize(&decay_index);
    let norm_unresolved = min_max_normalize(&pct_unresolved);
    let r = &params.risk_weights;

    let mut zips: Vec<ZipAggregate> = counts
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let classification = if c.is_empty() {
                ZipLabel::C
            } else {
                label(
                    params.median_comparison.is_high(decay_index[i], decay_median),
                    params.median_comparison.is_high(crime[i], crime_median),
                    params.secondary_rule,
                )
            };
            let risk = r.unresolved.mul_add(
                norm_unresolved[i],
                r.crime.mul_add(norm_crime[i], r.decay * norm_decay[i]),
            ) / r.sum();

            ZipAggregate {
                zip_code: c.zip_code.clone(),
                unfit_count: c.unfit,
                vacant_count: c.vacant,
                violation_count: c.violation,
                crime_count: c.crime,
                open_unfit_count: c.open_unfit,
                pct_unresolved: pct_unresolved[i],
                decay_index: decay_index[i],
                risk_score: risk * 100.0,
                classification,
            }
        })
        .collect();

    zips.sort_by(|a, b| {
        b.risk_score
            .total_cmp(&a.risk_score)
            .then_with(|| a.zip_code.cmp(&b.zip_code))
    });

    Ok(zips)
}

/// Label from the two high/low flags.
#[must_use]
pub const fn label(high_decay: bool, high_crime: bool, rule: SecondaryRule) -> ZipLabel {
    match (high_decay, high_crime) {
        (true, true) => ZipLabel::A,
        (true, false) => ZipLabel::B,
        (false, true) if matches!(rule, SecondaryRule::EitherAxis) => ZipLabel::B,
        _ => ZipLabel::C,
    }
}

/// Zips whose crime count is at or below the configured quantile, with the
/// number of active vacancies they hold.
fn abandonment_zones(
    zips: &[ZipAggregate],
    active_vacancies: &BTreeMap<String, u64>,
    crime_quantile: f64,
) -> AbandonmentZones {
    let crime: Vec<f64> = zips.iter().map(|z| crime_as_f64(z.crime_count)).collect();
    let crime_threshold = quantile(&crime, crime_quantile);

    let low_crime_zips: BTreeSet<&str> = zips
        .iter()
        .filter(|z| crime_as_f64(z.crime_count) <= crime_threshold)
        .map(|z| z.zip_code.as_str())
        .collect();
    let vacant_count = low_crime_zips
        .iter()
        .filter_map(|zip| active_vacancies.get(*zip))
        .sum();

    AbandonmentZones {
        crime_threshold,
        low_crime_zips: low_crime_zips.into_iter().map(str::to_owned).collect(),
        vacant_count,
    }
}

#[allow(clippy::cast_precision_loss)]
fn scaled(count: u64, max: u64) -> f64 {
    if max == 0 {
        0.0
    } else {
        count as f64 / max as f64
    }
}

#[allow(clippy::cast_precision_loss)]
fn crime_as_f64(count: u64) -> f64 {
    count as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zips::fixtures::{crime, indicator};
    use decay_map_analytics_models::{DecayWeights, MedianComparison, RiskWeights};
    use decay_map_decay_models::ViolationStatus;

    fn params() -> ClassificationParams {
        ClassificationParams {
            decay_weights: DecayWeights {
                unfit: 1.0,
                vacant: 1.0,
                violation: 1.0,
            },
            median_comparison: MedianComparison::StrictlyAbove,
            secondary_rule: SecondaryRule::HighDecayOnly,
            risk_weights: RiskWeights {
                crime: 0.40,
                decay: 0.35,
                unresolved: 0.25,
            },
            abandonment_crime_quantile: 0.25,
        }
    }

    fn counts(zip: &str, unfit: u64, vacant: u64, violation: u64, crime: u64) -> ZipCounts {
        ZipCounts {
            unfit,
            vacant,
            violation,
            crime,
            ..ZipCounts::new(zip)
        }
    }

    fn find<'a>(zips: &'a [ZipAggregate], zip: &str) -> &'a ZipAggregate {
        zips.iter().find(|z| z.zip_code == zip).unwrap()
    }

    #[test]
    fn empty_zip_is_c_with_zero_index() {
        let zips = classify_counts(&[counts("13299", 0, 0, 0, 0)], &params()).unwrap();
        assert_eq!(zips.len(), 1);
        assert_eq!(zips[0].classification, ZipLabel::C);
        assert!(zips[0].decay_index.abs() < f64::EPSILON);
    }

    #[test]
    fn empty_zip_stays_c_when_ties_count_as_high() {
        let params = ClassificationParams {
            median_comparison: MedianComparison::AtOrAbove,
            ..params()
        };
        let zips = classify_counts(
            &[counts("13201", 0, 0, 0, 0), counts("13202", 0, 0, 0, 0)],
            &params,
        )
        .unwrap();
        assert!(zips.iter().all(|z| z.classification == ZipLabel::C));
    }

    #[test]
    fn labels_against_medians() {
        let input = vec![
            counts("13201", 10, 10, 10, 50), // high decay, high crime
            counts("13202", 8, 9, 7, 1),     // high decay, low crime
            counts("13203", 1, 0, 1, 40),    // low decay, high crime
            counts("13204", 0, 1, 0, 2),     // low decay, low crime
        ];
        let zips = classify_counts(&input, &params()).unwrap();
        assert_eq!(find(&zips, "13201").classification, ZipLabel::A);
        assert_eq!(find(&zips, "13202").classification, ZipLabel::B);
        assert_eq!(find(&zips, "13203").classification, ZipLabel::C);
        assert_eq!(find(&zips, "13204").classification, ZipLabel::C);

        let either = ClassificationParams {
            secondary_rule: SecondaryRule::EitherAxis,
            ..params()
        };
        let zips = classify_counts(&input, &either).unwrap();
        assert_eq!(find(&zips, "13203").classification, ZipLabel::B);
        assert_eq!(find(&zips, "13204").classification, ZipLabel::C);
    }

    #[test]
    fn decay_index_is_zero_only_without_indicators() {
        let input = vec![
            counts("13201", 0, 0, 0, 5),
            counts("13202", 1, 0, 0, 0),
            counts("13203", 0, 0, 3, 0),
            counts("13204", 4, 2, 3, 9),
        ];
        let zips = classify_counts(&input, &params()).unwrap();
        for zip in &zips {
            assert!(zip.decay_index >= 0.0 && zip.decay_index <= 1.0);
            let has_indicators = zip.unfit_count + zip.vacant_count + zip.violation_count > 0;
            assert_eq!(
                zip.decay_index > 0.0,
                has_indicators,
                "zip {} index {}",
                zip.zip_code,
                zip.decay_index
            );
        }
        assert!((find(&zips, "13204").decay_index - (1.0 + 1.0 + 1.0) / 3.0).abs() < 1e-12);
    }

    #[test]
    fn risk_score_ranks_and_bounds() {
        let input = vec![
            ZipCounts {
                open_unfit: 10,
                ..counts("13201", 10, 5, 5, 100)
            },
            counts("13202", 1, 0, 0, 1),
        ];
        let zips = classify_counts(&input, &params()).unwrap();
        assert_eq!(zips[0].zip_code, "13201");
        assert!((zips[0].risk_score - 100.0).abs() < 1e-9);
        assert!(zips[1].risk_score.abs() < 1e-9);
        assert!((zips[0].pct_unresolved - 100.0).abs() < 1e-9);
    }

    #[test]
    fn duplicate_zips_are_merged() {
        let zips = classify_counts(
            &[counts("13201", 1, 0, 0, 1), counts("13201", 1, 0, 0, 1)],
            &params(),
        )
        .unwrap();
        assert_eq!(zips.len(), 1);
        assert_eq!(zips[0].unfit_count, 2);
        assert_eq!(zips[0].crime_count, 2);
    }

    #[test]
    fn every_zip_from_any_source_is_labelled_once() {
        let indicators = vec![
            indicator(43.00, -76.10, DecayType::Unfit, Some("13205")),
            indicator(43.01, -76.11, DecayType::Vacant, Some("13205")),
            indicator(43.10, -76.20, DecayType::CodeViolation, Some("13204")),
            indicator(43.20, -76.30, DecayType::Unfit, None),
        ];
        let crimes = vec![
            crime(43.00, -76.10, "LARCENY", None),
            crime(43.30, -76.40, "ROBBERY", Some("13290")),
        ];

        let result = classify_zips(&crimes, &indicators, &params()).unwrap();
        let zips: Vec<&str> = {
            let mut z: Vec<&str> = result.zips.iter().map(|z| z.zip_code.as_str()).collect();
            z.sort_unstable();
            z
        };
        assert_eq!(zips, vec!["13204", "13205", "13290"]);
        assert_eq!(result.label_counts.values().sum::<u64>(), 3);
        assert_eq!(find(&result.zips, "13205").crime_count, 1);
        assert_eq!(find(&result.zips, "13290").crime_count, 1);
        assert_eq!(result.unattributed_crimes, 0);
    }

    #[test]
    fn abandonment_counts_active_vacancies_in_low_crime_zips() {
        let mut closed = indicator(43.05, -76.15, DecayType::Vacant, Some("13202"));
        closed.status = ViolationStatus::Closed;
        let indicators = vec![
            indicator(43.00, -76.10, DecayType::Vacant, Some("13201")),
            indicator(43.00, -76.10, DecayType::Vacant, Some("13201")),
            indicator(43.05, -76.15, DecayType::Vacant, Some("13202")),
            closed,
            indicator(43.10, -76.20, DecayType::Unfit, Some("13203")),
        ];
        let crimes: Vec<CrimeIncident> = (0..5)
            .map(|_| crime(43.10, -76.20, "ASSAULT", Some("13203")))
            .chain(std::iter::once(crime(43.05, -76.15, "ASSAULT", Some("13202"))))
            .collect();

        let result = classify_zips(&crimes, &indicators, &params()).unwrap();
        // Crime counts 0, 1, 5: the 25th percentile is 0.5.
        assert!((result.abandonment.crime_threshold - 0.5).abs() < 1e-12);
        assert_eq!(result.abandonment.low_crime_zips, vec!["13201".to_owned()]);
        assert_eq!(result.abandonment.vacant_count, 2);
    }
}
