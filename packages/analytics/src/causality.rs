//! Bidirectional Granger causality between monthly decay and crime counts.
//!
//! For each lag order `p` in `1..=max_lag` and each direction, two least
//! squares regressions of the effect series are compared on the same
//! `T - p` observations:
//!
//! * restricted: constant plus `p` lags of the effect itself
//! * unrestricted: the same plus `p` lags of the cause
//!
//! `F = ((RSS_r - RSS_u) / p) / (RSS_u / (T - 3p - 1))`, and the p-value is
//! the upper tail of `F(p, T - 3p - 1)`.

use std::collections::BTreeMap;

use chrono::Datelike;
use decay_map_analytics_models::{
    CausalDirection, CausalityInterpretation, CausalityParams, CausalityResult, LagTest,
    MonthlyCounts,
};
use decay_map_decay_models::{CrimeIncident, DecayIndicator};

use crate::stats::{f_survival, least_squares_rss};
use crate::zips::attribute_crimes;
use crate::AnalyticsError;

/// Relative RSS change treated as no change at all.
const RSS_TOL: f64 = 1e-10;

/// Builds the zero-filled monthly series, from the first through the last
/// month present in either source.
#[must_use]
pub fn monthly_series(
    crimes: &[CrimeIncident],
    indicators: &[DecayIndicator],
    params: &CausalityParams,
) -> Vec<MonthlyCounts> {
    let zip = params.zip.as_deref();
    let mut months: BTreeMap<(i32, u32), (u64, u64)> = BTreeMap::new();

    for indicator in indicators {
        if !params.decay_types.contains(&indicator.decay_type) {
            continue;
        }
        if zip.is_some() && indicator.point.zip_code.as_deref() != zip {
            continue;
        }
        if let Some(date) = indicator.point.timestamp {
            months.entry((date.year(), date.month())).or_default().0 += 1;
        }
    }

    let crime_zips = zip.map(|_| attribute_crimes(crimes, indicators));
    for (i, crime) in crimes.iter().enumerate() {
        if crime_zips.as_ref().is_some_and(|z| z.zip(i) != zip) {
            continue;
        }
        if let Some(date) = crime.point.timestamp {
            months.entry((date.year(), date.month())).or_default().1 += 1;
        }
    }

    let (Some(&first), Some(&last)) = (months.keys().next(), months.keys().next_back()) else {
        return Vec::new();
    };

    let mut series = Vec::new();
    let (mut year, mut month) = first;
    while (year, month) <= last {
        let (decay, crime) = months.get(&(year, month)).copied().unwrap_or_default();
        series.push(MonthlyCounts {
            month: format!("{year:04}-{month:02}"),
            decay,
            crime,
        });
        if month == 12 {
            year += 1;
            month = 1;
        } else {
            month += 1;
        }
    }
    series
}

/// Runs the test in both directions on two series of equal length.
///
/// Tests are returned decay-to-crime first, lags ascending.
///
/// # Errors
///
/// Returns [`AnalyticsError::InsufficientData`] if the series are shorter
/// than [`CausalityParams::required_length`], or
/// [`AnalyticsError::InvalidConfig`] for invalid parameters or series of
/// different lengths.
pub fn causality_test(
    decay: &[f64],
    crime: &[f64],
    params: &CausalityParams,
) -> Result<Vec<LagTest>, AnalyticsError> {
    params.validate().map_err(AnalyticsError::invalid_config)?;
    if decay.len() != crime.len() {
        return Err(AnalyticsError::invalid_config(format!(
            "series lengths differ: {} decay months vs {} crime months",
            decay.len(),
            crime.len()
        )));
    }
    let required = params.required_length();
    if decay.len() < required {
        return Err(AnalyticsError::InsufficientData {
            required,
            actual: decay.len(),
        });
    }

    let mut tests = Vec::with_capacity(2 * params.max_lag);
    for (direction, cause, effect) in [
        (CausalDirection::DecayToCrime, decay, crime),
        (CausalDirection::CrimeToDecay, crime, decay),
    ] {
        for lag in 1..=params.max_lag {
            let test = lag_test(cause, effect, lag, direction, params.significance);
            log::debug!(
                "{direction} lag {lag}: F({}, {}) = {:.4}, p = {:.4}",
                test.df_num,
                test.df_den,
                test.f_statistic,
                test.p_value
            );
            tests.push(test);
        }
    }
    Ok(tests)
}

/// Builds the monthly series from the records and tests both directions.
///
/// # Errors
///
/// Same as [`causality_test`]; too few months of data surfaces as
/// [`AnalyticsError::InsufficientData`].
#[allow(clippy::cast_precision_loss)]
pub fn run_causality(
    crimes: &[CrimeIncident],
    indicators: &[DecayIndicator],
    params: &CausalityParams,
) -> Result<CausalityResult, AnalyticsError> {
    let series = monthly_series(crimes, indicators, params);
    log::info!(
        "Causality: {} months of {} vs crime{}",
        series.len(),
        params
            .decay_types
            .iter()
            .map(|t| t.as_ref())
            .collect::<Vec<&str>>()
            .join("+"),
        params
            .zip
            .as_deref()
            .map_or_else(String::new, |z| format!(" in zip {z}"))
    );

    let decay: Vec<f64> = series.iter().map(|m| m.decay as f64).collect();
    let crime: Vec<f64> = series.iter().map(|m| m.crime as f64).collect();
    let tests = causality_test(&decay, &crime, params)?;

    let any_significant = |direction| {
        tests
            .iter()
            .any(|t| t.direction == direction && t.significant)
    };
    let interpretation = CausalityInterpretation::from_directions(
        any_significant(CausalDirection::DecayToCrime),
        any_significant(CausalDirection::CrimeToDecay),
    );
    log::info!("Causality: {}", interpretation.description());

    Ok(CausalityResult {
        series,
        tests,
        significance: params.significance,
        interpretation,
    })
}

/// One F test of `cause` lags on `effect` at lag order `lag`.
#[allow(clippy::cast_precision_loss)]
fn lag_test(
    cause: &[f64],
    effect: &[f64],
    lag: usize,
    direction: CausalDirection,
    significance: f64,
) -> LagTest {
    let n = effect.len() - lag;
    let y = &effect[lag..];

    let lagged = |series: &[f64], k: usize| series[lag - k..series.len() - k].to_vec();
    let mut columns = vec![vec![1.0; n]];
    columns.extend((1..=lag).map(|k| lagged(effect, k)));
    let (rss_restricted, _) = least_squares_rss(&columns, y);
    columns.extend((1..=lag).map(|k| lagged(cause, k)));
    let (rss_unrestricted, _) = least_squares_rss(&columns, y);

    let df_num = lag;
    let df_den = n - 2 * lag - 1;
    let improvement = rss_restricted - rss_unrestricted;

    let (f_statistic, p_value) = if improvement <= RSS_TOL * rss_restricted {
        (0.0, 1.0)
    } else if rss_unrestricted <= RSS_TOL * rss_restricted {
        (f64::INFINITY, 0.0)
    } else {
        let f = (improvement / df_num as f64) / (rss_unrestricted / df_den as f64);
        (f, f_survival(f, df_num as f64, df_den as f64))
    };

    LagTest {
        direction,
        lag,
        f_statistic,
        p_value,
        df_num,
        df_den,
        significant: p_value < significance,
    }
}
