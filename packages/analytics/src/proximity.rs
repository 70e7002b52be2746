//! Proximity join between crime incidents and decay indicators.
//!
//! For every crime the nearest indicator of the configured types is found
//! through an R-tree, and the crime is flagged as near decay when that
//! distance is within the threshold. Unfit and vacant properties are also
//! indexed on their own to place each crime in a [`DecayZone`], and code
//! violations within the radius give a count and a severity score.

use std::collections::BTreeMap;

use decay_map_analytics_models::{
    CrimeProximity, CrimeTypeProximity, DecayZone, ProximityParams, ProximityResult, RadiusShare,
};
use decay_map_decay_models::{CrimeIncident, DecayIndicator, DecayType, ViolationTier};
use decay_map_spatial::ProximityIndex;

use crate::AnalyticsError;

/// Number of crime types broken down in [`ProximityResult::by_crime_type`].
pub const TOP_CRIME_TYPES: usize = 10;

/// Indicators of one set, indexed for nearest/radius queries.
struct IndexedSet<'a> {
    records: Vec<&'a DecayIndicator>,
    index: ProximityIndex,
}

impl<'a> IndexedSet<'a> {
    fn build(indicators: &'a [DecayIndicator], keep: impl Fn(&DecayIndicator) -> bool) -> Self {
        let records: Vec<&DecayIndicator> = indicators.iter().filter(|i| keep(i)).collect();
        let index = ProximityIndex::new(
            records
                .iter()
                .map(|i| (i.point.latitude(), i.point.longitude())),
        );
        Self { records, index }
    }

    fn nearest_m(&self, crime: &CrimeIncident) -> Option<f64> {
        self.index
            .nearest(crime.point.latitude(), crime.point.longitude())
            .map(|n| n.distance_m)
    }

    fn is_near(&self, crime: &CrimeIncident, radius_m: f64) -> bool {
        self.nearest_m(crime).is_some_and(|d| d <= radius_m)
    }
}

/// Runs the proximity join.
///
/// An empty indicator set is not an error: every crime is then flagged as
/// not near, with no nearest distance.
///
/// # Errors
///
/// Returns [`AnalyticsError::InvalidConfig`] if the parameters fail
/// validation.
#[allow(clippy::cast_precision_loss)]
pub fn proximity_join(
    crimes: &[CrimeIncident],
    indicators: &[DecayIndicator],
    params: &ProximityParams,
) -> Result<ProximityResult, AnalyticsError> {
    params.validate().map_err(AnalyticsError::invalid_config)?;

    let radius = f64::from(params.distance_m);
    let joined = IndexedSet::build(indicators, |i| params.decay_types.contains(&i.decay_type));
    let unfit = IndexedSet::build(indicators, |i| i.decay_type == DecayType::Unfit);
    let vacant = IndexedSet::build(indicators, |i| i.decay_type == DecayType::Vacant);
    let violations = IndexedSet::build(indicators, |i| i.decay_type == DecayType::CodeViolation);

    log::info!(
        "Proximity join: {} crimes against {} indicators ({}) within {}m",
        crimes.len(),
        joined.records.len(),
        params
            .decay_types
            .iter()
            .map(|t| t.as_ref())
            .collect::<Vec<&str>>()
            .join(", "),
        params.distance_m
    );
    if joined.records.is_empty() {
        log::warn!("No decay indicators of the selected types; every crime is not near");
    }

    let rows: Vec<CrimeProximity> = crimes
        .iter()
        .enumerate()
        .map(|(crime_index, crime)| {
            let nearest_distance_m = joined.nearest_m(crime);
            let near_unfit = unfit.is_near(crime, radius);
            let near_vacant = vacant.is_near(crime, radius);

            let nearby = violations.index.within(
                crime.point.latitude(),
                crime.point.longitude(),
                radius,
            );
            let tiers: Vec<ViolationTier> = nearby
                .iter()
                .filter_map(|n| violations.records[n.index].tier)
                .collect();
            let violation_severity = tiers.iter().map(|t| u32::from(t.value())).sum();
            let structural_nearby = tiers.contains(&ViolationTier::Structural);

            CrimeProximity {
                crime_index,
                nearest_distance_m,
                near: nearest_distance_m.is_some_and(|d| d <= radius),
                near_unfit,
                near_vacant,
                zone: DecayZone::from_flags(near_unfit, near_vacant),
                violations_nearby: u32::try_from(nearby.len()).unwrap_or(u32::MAX),
                violation_severity,
                structural_nearby,
            }
        })
        .collect();

    let crime_count = rows.len() as u64;
    let near_count = rows.iter().filter(|r| r.near).count() as u64;
    let radius_shares = params
        .candidate_distances_m
        .iter()
        .map(|&distance_m| {
            let limit = f64::from(distance_m);
            let crimes_within = rows
                .iter()
                .filter(|r| r.nearest_distance_m.is_some_and(|d| d <= limit))
                .count() as u64;
            RadiusShare {
                distance_m,
                crimes_within,
                pct: percent(crimes_within, crime_count),
            }
        })
        .collect();

    let mut zone_counts: BTreeMap<DecayZone, u64> =
        DecayZone::all().iter().map(|z| (*z, 0)).collect();
    for row in &rows {
        *zone_counts.entry(row.zone).or_default() += 1;
    }

    let result = ProximityResult {
        distance_m: params.distance_m,
        crime_count,
        indicator_count: joined.records.len() as u64,
        near_count,
        near_pct: percent(near_count, crime_count),
        radius_shares,
        near_unfit_count: rows.iter().filter(|r| r.near_unfit).count() as u64,
        near_vacant_count: rows.iter().filter(|r| r.near_vacant).count() as u64,
        zone_counts,
        by_crime_type: by_crime_type(crimes, &rows),
        crimes: rows,
    };

    log::info!(
        "{} of {} crimes ({:.1}%) within {}m of decay",
        result.near_count,
        result.crime_count,
        result.near_pct,
        result.distance_m
    );

    Ok(result)
}

/// Near/not-near split for the most frequent crime types, most frequent
/// first and ties by name.
fn by_crime_type(crimes: &[CrimeIncident], rows: &[CrimeProximity]) -> Vec<CrimeTypeProximity> {
    let mut split: BTreeMap<&str, (u64, u64)> = BTreeMap::new();
    for row in rows {
        let entry = split
            .entry(crimes[row.crime_index].crime_type())
            .or_default();
        if row.near {
            entry.0 += 1;
        } else {
            entry.1 += 1;
        }
    }

    let mut types: Vec<CrimeTypeProximity> = split
        .into_iter()
        .map(|(crime_type, (near, not_near))| CrimeTypeProximity {
            crime_type: crime_type.to_owned(),
            near,
            not_near,
        })
        .collect();
    types.sort_by(|a, b| {
        (b.near + b.not_near)
            .cmp(&(a.near + a.not_near))
            .then_with(|| a.crime_type.cmp(&b.crime_type))
    });
    types.truncate(TOP_CRIME_TYPES);
    types
}

#[allow(clippy::cast_precision_loss)]
fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}
