//! Descriptive statistics over the loaded records.

use std::collections::{BTreeMap, BTreeSet};

use chrono::Month;
use decay_map_analytics_models::{Kpis, LabelCount, SummaryStats, TierCount, YearForecast};
use decay_map_decay_models::{
    CrimeIncident, CrimeSeverity, DecayIndicator, DecayType, Season, TimeOfDay, ViolationTier,
};

use crate::stats::linear_fit;

/// Crime types listed in [`SummaryStats::top_crime_types`].
pub const TOP_CRIME_TYPES: usize = 10;

/// Years projected past the last observed unfit year.
pub const FORECAST_YEARS: i32 = 3;

const TIMES_OF_DAY: [TimeOfDay; 4] = [
    TimeOfDay::Night,
    TimeOfDay::Morning,
    TimeOfDay::Afternoon,
    TimeOfDay::Evening,
];

const SEASONS: [Season; 4] = [Season::Winter, Season::Spring, Season::Summer, Season::Fall];

/// Computes every summary table.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn summarize(crimes: &[CrimeIncident], indicators: &[DecayIndicator]) -> SummaryStats {
    let of_type = |t: DecayType| indicators.iter().filter(move |i| i.decay_type == t);

    let kpis = Kpis {
        total_crimes: crimes.len() as u64,
        crime_types: crimes
            .iter()
            .map(CrimeIncident::crime_type)
            .collect::<BTreeSet<_>>()
            .len() as u64,
        serious_crimes: crimes.iter().filter(|c| c.is_serious()).count() as u64,
        quality_of_life_crimes: crimes.iter().filter(|c| !c.is_serious()).count() as u64,
        unfit_total: of_type(DecayType::Unfit).count() as u64,
        open_unfit: of_type(DecayType::Unfit)
            .filter(|i| i.status.is_open())
            .count() as u64,
        vacant_total: of_type(DecayType::Vacant).count() as u64,
        active_vacancies: of_type(DecayType::Vacant)
            .filter(|i| i.status.is_open())
            .count() as u64,
        violation_total: of_type(DecayType::CodeViolation).count() as u64,
        structural_violations: of_type(DecayType::CodeViolation)
            .filter(|i| i.tier == Some(ViolationTier::Structural))
            .count() as u64,
    };

    log::info!(
        "Summary: {} crimes ({} types), {} unfit ({} open), {} vacant ({} active), {} violations",
        kpis.total_crimes,
        kpis.crime_types,
        kpis.unfit_total,
        kpis.open_unfit,
        kpis.vacant_total,
        kpis.active_vacancies,
        kpis.violation_total
    );

    let mut by_month = [0_u64; 12];
    let mut by_hour = [0_u64; 24];
    for crime in crimes {
        if let Some(month) = crime.point.month() {
            by_month[(month as usize - 1) % 12] += 1;
        }
        if let Some(hour) = crime.hour {
            by_hour[hour as usize % 24] += 1;
        }
    }

    let unfit_by_year = by_year(of_type(DecayType::Unfit));

    SummaryStats {
        kpis,
        crime_by_month: (1_u8..=12)
            .zip(by_month)
            .map(|(m, count)| {
                let name = Month::try_from(m).map_or("?", |month| month.name());
                LabelCount::new(name, count)
            })
            .collect(),
        crime_by_hour: (0..24)
            .zip(by_hour)
            .map(|(h, count)| LabelCount::new(format!("{h:02}"), count))
            .collect(),
        crime_by_time_of_day: TIMES_OF_DAY
            .iter()
            .map(|t| {
                let count = crimes.iter().filter(|c| c.time_of_day() == Some(*t)).count();
                LabelCount::new(t.as_ref(), count as u64)
            })
            .collect(),
        crime_by_season: SEASONS
            .iter()
            .map(|s| {
                let count = crimes.iter().filter(|c| c.season() == Some(*s)).count();
                LabelCount::new(s.as_ref(), count as u64)
            })
            .collect(),
        top_crime_types: ranked(crimes.iter().map(CrimeIncident::crime_type), TOP_CRIME_TYPES),
        severity_split: [CrimeSeverity::Serious, CrimeSeverity::QualityOfLife]
            .iter()
            .map(|s| {
                let count = crimes.iter().filter(|c| c.severity == *s).count();
                LabelCount::new(s.as_ref(), count as u64)
            })
            .collect(),
        unfit_forecast: forecast(&unfit_by_year),
        unfit_by_year: unfit_by_year
            .iter()
            .map(|(year, count)| LabelCount::new(year.to_string(), *count))
            .collect(),
        open_unfit_by_zip: ranked(
            of_type(DecayType::Unfit)
                .filter(|i| i.status.is_open())
                .filter_map(|i| i.point.zip_code.as_deref()),
            usize::MAX,
        ),
        vacancies_by_neighborhood: ranked(
            of_type(DecayType::Vacant)
                .filter(|i| i.status.is_open())
                .filter_map(|i| i.neighborhood.as_deref()),
            usize::MAX,
        ),
        violations_by_tier: ViolationTier::all()
            .iter()
            .map(|tier| TierCount {
                tier: *tier,
                count: of_type(DecayType::CodeViolation)
                    .filter(|i| i.tier == Some(*tier))
                    .count() as u64,
            })
            .collect(),
        violations_by_year: by_year(of_type(DecayType::CodeViolation))
            .into_iter()
            .map(|(year, count)| LabelCount::new(year.to_string(), count))
            .collect(),
    }
}

/// Counts per label, most frequent first, ties by label, at most `limit`.
fn ranked<'a>(labels: impl Iterator<Item = &'a str>, limit: usize) -> Vec<LabelCount> {
    let mut counts: BTreeMap<&str, u64> = BTreeMap::new();
    for label in labels {
        *counts.entry(label).or_default() += 1;
    }
    let mut ranked: Vec<LabelCount> = counts
        .into_iter()
        .map(|(label, count)| LabelCount::new(label, count))
        .collect();
    ranked.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    ranked.truncate(limit);
    ranked
}

fn by_year<'a>(indicators: impl Iterator<Item = &'a DecayIndicator>) -> BTreeMap<i32, u64> {
    let mut years = BTreeMap::new();
    for indicator in indicators {
        if let Some(year) = indicator.point.year() {
            *years.entry(year).or_default() += 1;
        }
    }
    years
}

/// Least-squares line through the yearly counts, projected
/// [`FORECAST_YEARS`] past the last year and floored at zero. Empty with
/// fewer than two years.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn forecast(by_year: &BTreeMap<i32, u64>) -> Vec<YearForecast> {
    let points: Vec<(f64, f64)> = by_year
        .iter()
        .map(|(year, count)| (f64::from(*year), *count as f64))
        .collect();
    let (Some((intercept, slope)), Some(&last)) = (linear_fit(&points), by_year.keys().next_back())
    else {
        return Vec::new();
    };

    (1..=FORECAST_YEARS)
        .map(|ahead| {
            let year = last + ahead;
            YearForecast {
                year,
                projected: slope.mul_add(f64::from(year), intercept).max(0.0),
            }
        })
        .collect()
}
