//! Grid hotspot labelling and risk prediction.
//!
//! The bounding box of the crimes dated inside the configured window years
//! is cut into square cells. Per year, a cell is hot when it ranks in the
//! top `top_k` cells by crime count (ties broken by cell id) and, when a
//! `count_threshold` is set, also reaches that count. A cell hot in at
//! least `min_years` of the window years is a chronic hotspot.
//!
//! A classifier is then trained on (cell, year) samples from every window
//! year but the last, with the chronic label as target, and scores every
//! active cell on the held-out last year. Each year is split at
//! `history_end_month`: the features only see the months up to it, and the
//! months after it form the "future" window reported alongside the risk.

use std::collections::BTreeMap;

use chrono::Datelike;
use decay_map_analytics_models::{
    ClassifierKind, GridCell, HotspotParams, HotspotResult, ModelMetrics,
};
use decay_map_decay_models::{CrimeIncident, DecayIndicator, DecayType};
use decay_map_spatial::{CellId, Grid};

use crate::forest::RandomForest;
use crate::logistic::LogisticRegression;
use crate::{AnalyticsError, Classifier};

/// Probability at which a cell is predicted to be a hotspot.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Number of features per (cell, year) sample.
pub const N_FEATURES: usize = 7;

#[derive(Debug, Clone, Copy, Default)]
struct YearCounts {
    total: u64,
    history: u64,
    history_serious: u64,
    future: u64,
}

#[derive(Debug, Clone, Default)]
struct CellStats {
    years: BTreeMap<i32, YearCounts>,
    unfit: u64,
    vacant: u64,
    violation: u64,
}

impl CellStats {
    fn year(&self, year: i32) -> YearCounts {
        self.years.get(&year).copied().unwrap_or_default()
    }
}

/// Labels chronic hotspots, trains the configured classifier and scores
/// the held-out year.
///
/// # Errors
///
/// * [`AnalyticsError::InvalidConfig`] if the parameters fail validation
/// * [`AnalyticsError::EmptyInput`] if no crime falls inside the window years
/// * [`AnalyticsError::DegenerateModel`] if no chronic hotspot exists, so
///   there is no positive example to learn from
#[allow(clippy::cast_precision_loss, clippy::too_many_lines)]
pub fn predict_hotspots(
    crimes: &[CrimeIncident],
    indicators: &[DecayIndicator],
    params: &HotspotParams,
) -> Result<HotspotResult, AnalyticsError> {
    params.validate().map_err(AnalyticsError::invalid_config)?;

    let in_window: Vec<&CrimeIncident> = crimes
        .iter()
        .filter(|c| c.point.year().is_some_and(|y| params.years.contains(&y)))
        .collect();
    if in_window.is_empty() {
        return Err(AnalyticsError::EmptyInput {
            what: format!("crimes dated in {:?}", params.years),
        });
    }

    let grid = Grid::from_points(
        in_window
            .iter()
            .map(|c| (c.point.latitude(), c.point.longitude())),
        params.cell_size_m,
    )
    .ok_or_else(|| AnalyticsError::invalid_config("cannot build the hotspot grid"))?;

    log::info!(
        "Hotspots: {} crimes in {:?} on a {}x{} grid of {}m cells",
        in_window.len(),
        params.years,
        grid.rows(),
        grid.cols(),
        params.cell_size_m
    );

    let cells = cell_stats(&grid, &in_window, indicators, params.history_end_month);
    let chronic = chronic_cells(&cells, params);
    let chronic_count = chronic.values().filter(|c| **c).count() as u64;
    log::info!(
        "{chronic_count} of {} active cells are chronic hotspots",
        cells.len()
    );

    let mut x = Vec::new();
    let mut y = Vec::new();
    for &year in params.training_years() {
        for (id, stats) in &cells {
            x.push(features(&grid, *id, stats, year));
            y.push(chronic[id]);
        }
    }
    if !y.iter().any(|label| *label) {
        return Err(AnalyticsError::DegenerateModel {
            reason: format!(
                "no cell was in the top {} for at least {} of {:?}",
                params.top_k, params.min_years, params.years
            ),
        });
    }

    let model: Box<dyn Classifier> = match params.classifier {
        ClassifierKind::RandomForest => {
            Box::new(RandomForest::fit(&x, &y, &params.forest, params.seed)?)
        }
        ClassifierKind::LogisticRegression => {
            Box::new(LogisticRegression::fit(&x, &y, &params.logistic)?)
        }
    };

    let holdout_year = params
        .holdout_year()
        .ok_or_else(|| AnalyticsError::invalid_config("hotspot.years must not be empty"))?;

    let grid_cells: Vec<GridCell> = cells
        .iter()
        .map(|(id, stats)| {
            let predicted_risk = model.predict_proba(&features(&grid, *id, stats, holdout_year));
            grid_cell(&grid, *id, stats, &params.years, chronic[id], predicted_risk)
        })
        .collect();

    let metrics = metrics(&grid_cells);
    log::info!(
        "{} on {holdout_year}: accuracy {:.3}, precision {:.3}, recall {:.3}",
        params.classifier,
        metrics.accuracy,
        metrics.precision,
        metrics.recall
    );

    let avg_future_crimes = if cells.is_empty() {
        0.0
    } else {
        cells
            .values()
            .map(|s| s.year(holdout_year).future as f64)
            .sum::<f64>()
            / cells.len() as f64
    };

    let mut top_cells = grid_cells.clone();
    top_cells.sort_by(|a, b| {
        b.predicted_risk
            .total_cmp(&a.predicted_risk)
            .then_with(|| (a.row, a.col).cmp(&(b.row, b.col)))
    });
    top_cells.truncate(params.top_n);

    Ok(HotspotResult {
        cell_size_m: grid.cell_size_m(),
        rows: grid.rows(),
        cols: grid.cols(),
        classifier: params.classifier,
        training_years: params.training_years().to_vec(),
        holdout_year,
        cells: grid_cells,
        top_cells,
        chronic_count,
        metrics,
        avg_future_crimes,
    })
}

/// Per-cell counts for every cell holding a window crime or an indicator.
fn cell_stats(
    grid: &Grid,
    crimes: &[&CrimeIncident],
    indicators: &[DecayIndicator],
    history_end_month: u32,
) -> BTreeMap<CellId, CellStats> {
    let mut cells: BTreeMap<CellId, CellStats> = BTreeMap::new();

    for crime in crimes {
        let (Some(id), Some(date)) = (
            grid.cell_of(crime.point.latitude(), crime.point.longitude()),
            crime.point.timestamp,
        ) else {
            continue;
        };
        let counts = cells
            .entry(id)
            .or_default()
            .years
            .entry(date.year())
            .or_default();
        counts.total += 1;
        if date.month() <= history_end_month {
            counts.history += 1;
            if crime.is_serious() {
                counts.history_serious += 1;
            }
        } else {
            counts.future += 1;
        }
    }

    for indicator in indicators {
        let Some(id) = grid.cell_of(indicator.point.latitude(), indicator.point.longitude())
        else {
            continue;
        };
        let stats = cells.entry(id).or_default();
        match indicator.decay_type {
            DecayType::Unfit => stats.unfit += 1,
            DecayType::Vacant => stats.vacant += 1,
            DecayType::CodeViolation => stats.violation += 1,
        }
    }

    cells
}

/// Chronic flag per cell.
fn chronic_cells(
    cells: &BTreeMap<CellId, CellStats>,
    params: &HotspotParams,
) -> BTreeMap<CellId, bool> {
    let mut hot_years: BTreeMap<CellId, usize> = cells.keys().map(|id| (*id, 0)).collect();

    for &year in &params.years {
        let mut ranked: Vec<(CellId, u64)> = cells
            .iter()
            .map(|(id, stats)| (*id, stats.year(year).total))
            .filter(|(_, total)| *total > 0)
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        for (id, total) in ranked.into_iter().take(params.top_k) {
            if params.count_threshold.is_none_or(|min| total >= min) {
                *hot_years.entry(id).or_default() += 1;
            }
        }
    }

    hot_years
        .into_iter()
        .map(|(id, years)| (id, years >= params.min_years))
        .collect()
}

/// `[history count, serious share, unfit, vacant, violations, centre lat,
/// centre lng]` for one cell in one year.
#[allow(clippy::cast_precision_loss)]
fn features(grid: &Grid, id: CellId, stats: &CellStats, year: i32) -> Vec<f64> {
    let counts = stats.year(year);
    let serious_share = if counts.history == 0 {
        0.0
    } else {
        counts.history_serious as f64 / counts.history as f64
    };
    let (lat, lng) = grid.cell_center(id);
    vec![
        counts.history as f64,
        serious_share,
        stats.unfit as f64,
        stats.vacant as f64,
        stats.violation as f64,
        lat,
        lng,
    ]
}

fn grid_cell(
    grid: &Grid,
    id: CellId,
    stats: &CellStats,
    years: &[i32],
    is_chronic_hotspot: bool,
    predicted_risk: f64,
) -> GridCell {
    let bounds = grid.cell_bounds(id);
    let (center_lat, center_lng) = grid.cell_center(id);
    GridCell {
        cell_id: id.to_string(),
        row: id.row,
        col: id.col,
        south: bounds.min().y,
        west: bounds.min().x,
        north: bounds.max().y,
        east: bounds.max().x,
        center_lat,
        center_lng,
        yearly_counts: years.iter().map(|y| (*y, stats.year(*y).total)).collect(),
        is_chronic_hotspot,
        predicted_risk,
        unfit_count: stats.unfit,
        vacant_count: stats.vacant,
        violation_count: stats.violation,
    }
}

/// Held-out accuracy, precision and recall at [`DECISION_THRESHOLD`].
#[allow(clippy::cast_precision_loss)]
fn metrics(cells: &[GridCell]) -> ModelMetrics {
    let (mut tp, mut fp, mut tn, mut fn_) = (0_u64, 0_u64, 0_u64, 0_u64);
    for cell in cells {
        match (cell.predicted_risk >= DECISION_THRESHOLD, cell.is_chronic_hotspot) {
            (true, true) => tp += 1,
            (true, false) => fp += 1,
            (false, false) => tn += 1,
            (false, true) => fn_ += 1,
        }
    }
    let ratio = |num: u64, den: u64| if den == 0 { 0.0 } else { num as f64 / den as f64 };
    ModelMetrics {
        samples: cells.len() as u64,
        accuracy: ratio(tp + tn, tp + fp + tn + fn_),
        precision: ratio(tp, tp + fp),
        recall: ratio(tp, tp + fn_),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::zips::fixtures::{date, dated_crime, indicator};
    use decay_map_analytics_models::{ForestParams, LogisticParams};
    use std::collections::BTreeSet;

    const HOT: [(usize, usize); 3] = [(0, 0), (2, 3), (5, 5)];

    fn params() -> HotspotParams {
        HotspotParams {
            cell_size_m: 250.0,
            years: vec![2023, 2024, 2025],
            top_k: 3,
            count_threshold: None,
            min_years: 2,
            history_end_month: 9,
            top_n: 3,
            seed: 42,
            classifier: ClassifierKind::RandomForest,
            forest: ForestParams {
                n_trees: 25,
                max_depth: 6,
                min_samples_split: 2,
                max_features: None,
            },
            logistic: LogisticParams {
                learning_rate: 0.5,
                iterations: 300,
                l2: 0.0,
            },
        }
    }

    fn site(i: usize, j: usize) -> (f64, f64) {
        #[allow(clippy::cast_precision_loss)]
        let (i, j) = (i as f64, j as f64);
        (0.005f64.mul_add(i, 43.0), 0.005f64.mul_add(j, -76.1))
    }

    /// A 6x6 lattice of sites ~500 m apart. Three sites get 20 crimes a
    /// year, the rest one to three.
    fn city() -> Vec<CrimeIncident> {
        let mut crimes = Vec::new();
        for year in [2023, 2024, 2025] {
            for i in 0..6 {
                for j in 0..6 {
                    let (lat, lng) = site(i, j);
                    let n = if HOT.contains(&(i, j)) {
                        20
                    } else {
                        1 + (i * 7 + j * 3 + usize::try_from(year).unwrap()) % 3
                    };
                    for k in 0..n {
                        let month = u32::try_from(k % 12).unwrap() + 1;
                        crimes.push(dated_crime(lat, lng, "BURGLARY", None, date(year, month, 10)));
                    }
                }
            }
        }
        crimes
    }

    fn hot_cells(grid_cells: &[GridCell]) -> BTreeSet<String> {
        grid_cells.iter().map(|c| c.cell_id.clone()).collect()
    }

    fn expected_hot(result: &HotspotResult) -> BTreeSet<String> {
        result
            .cells
            .iter()
            .filter(|c| c.is_chronic_hotspot)
            .map(|c| c.cell_id.clone())
            .collect()
    }

    #[test]
    fn forest_ranks_chronic_cells_first() {
        let result = predict_hotspots(&city(), &[], &params()).unwrap();
        assert_eq!(result.chronic_count, 3);
        assert_eq!(result.cells.len(), 36);
        assert_eq!(result.training_years, vec![2023, 2024]);
        assert_eq!(result.holdout_year, 2025);
        assert_eq!(hot_cells(&result.top_cells), expected_hot(&result));
        assert!(result.top_cells.iter().all(|c| c.predicted_risk > 0.5));
        assert!((result.metrics.recall - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn logistic_regression_ranks_chronic_cells_first() {
        let params = HotspotParams {
            classifier: ClassifierKind::LogisticRegression,
            ..params()
        };
        let result = predict_hotspots(&city(), &[], &params).unwrap();
        assert_eq!(result.classifier, ClassifierKind::LogisticRegression);
        assert_eq!(hot_cells(&result.top_cells), expected_hot(&result));
    }

    #[test]
    fn same_seed_same_ranking() {
        let crimes = city();
        let a = predict_hotspots(&crimes, &[], &params()).unwrap();
        let b = predict_hotspots(&crimes, &[], &params()).unwrap();
        assert_eq!(a.top_cells, b.top_cells);
        assert_eq!(a.cells, b.cells);
    }

    #[test]
    fn history_and_future_split_at_configured_month() {
        let result = predict_hotspots(&city(), &[], &params()).unwrap();
        let hot = result
            .cells
            .iter()
            .find(|c| c.is_chronic_hotspot)
            .unwrap();
        assert_eq!(hot.yearly_counts[&2025], 20);
        // 20 crimes over months 1..=12 then 1..=8: months 10-12 hold 3.
        assert!(result.avg_future_crimes > 0.0);
    }

    #[test]
    fn indicators_are_counted_in_their_cell() {
        let (lat, lng) = site(0, 0);
        let indicators = vec![
            indicator(lat, lng, DecayType::Unfit, None),
            indicator(lat, lng, DecayType::CodeViolation, None),
            indicator(80.0, 10.0, DecayType::Vacant, None),
        ];
        let result = predict_hotspots(&city(), &indicators, &params()).unwrap();
        let corner = result.cells.iter().find(|c| c.row == 0 && c.col == 0).unwrap();
        assert_eq!(corner.unfit_count, 1);
        assert_eq!(corner.violation_count, 1);
        assert_eq!(result.cells.iter().map(|c| c.vacant_count).sum::<u64>(), 0);
    }

    #[test]
    fn no_chronic_cell_is_degenerate() {
        // One busy cell per year, never the same one twice.
        let crimes: Vec<CrimeIncident> = [(2023, site(0, 0)), (2024, site(3, 3)), (2025, site(5, 5))]
            .into_iter()
            .flat_map(|(year, (lat, lng))| {
                (0..5).map(move |_| dated_crime(lat, lng, "ROBBERY", None, date(year, 3, 1)))
            })
            .collect();
        let params = HotspotParams {
            top_k: 1,
            ..params()
        };
        assert!(matches!(
            predict_hotspots(&crimes, &[], &params),
            Err(AnalyticsError::DegenerateModel { .. })
        ));
    }

    #[test]
    fn count_threshold_limits_hot_cells() {
        let params = HotspotParams {
            count_threshold: Some(50),
            ..params()
        };
        assert!(matches!(
            predict_hotspots(&city(), &[], &params),
            Err(AnalyticsError::DegenerateModel { .. })
        ));
    }

    #[test]
    fn no_crimes_in_window_is_empty_input() {
        let crimes = vec![dated_crime(43.0, -76.1, "ROBBERY", None, date(2019, 5, 5))];
        assert!(matches!(
            predict_hotspots(&crimes, &[], &params()),
            Err(AnalyticsError::EmptyInput { .. })
        ));
    }
}
