//! Plain-text headlines printed after each analysis.

use decay_map_analytics::AnalyticsError;
use decay_map_analytics_models::{
    CausalDirection, CausalityResult, ClassificationResult, HotspotResult, ProximityResult,
    SummaryStats, ZipLabel,
};
use decay_map_source_models::LoadReport;

use crate::pipeline::Analysis;

pub fn load_reports(reports: &[LoadReport]) {
    println!("{:<20} {:>10} {:>10} {:>10}", "DATASET", "READ", "KEPT", "DROPPED");
    println!("{}", "-".repeat(53));
    for report in reports {
        if let Some(error) = &report.error {
            println!("{:<20} failed: {error}", report.dataset);
            continue;
        }
        println!(
            "{:<20} {:>10} {:>10} {:>10}",
            report.dataset,
            report.rows_read,
            report.rows_kept,
            report.rows_dropped()
        );
    }
    println!();
}

pub fn failure(analysis: Analysis, error: &AnalyticsError) {
    let reason = match error {
        AnalyticsError::InsufficientData { .. } => "not enough data",
        AnalyticsError::DegenerateModel { .. } => "no prediction produced",
        AnalyticsError::EmptyInput { .. } => "no input",
        AnalyticsError::InvalidConfig { .. } => "invalid parameters",
    };
    println!("== {} ==", analysis.label());
    println!("  {reason}: {error}");
    println!();
}

pub fn summary(summary: &SummaryStats) {
    let k = &summary.kpis;
    println!("== {} ==", Analysis::Summary.label());
    println!(
        "  crimes: {} ({} types, {} serious, {} quality-of-life)",
        k.total_crimes, k.crime_types, k.serious_crimes, k.quality_of_life_crimes
    );
    println!("  unfit: {} ({} open)", k.unfit_total, k.open_unfit);
    println!("  vacant: {} ({} active)", k.vacant_total, k.active_vacancies);
    println!(
        "  code violations: {} ({} structural)",
        k.violation_total, k.structural_violations
    );
    for forecast in &summary.unfit_forecast {
        println!(
            "  projected unfit in {}: {:.0}",
            forecast.year, forecast.projected
        );
    }
    println!();
}

pub fn proximity(result: &ProximityResult) {
    println!("== {} ==", Analysis::Proximity.label());
    println!(
        "  {} of {} crimes ({:.1}%) within {} m of a decay indicator",
        result.near_count, result.crime_count, result.near_pct, result.distance_m
    );
    for share in &result.radius_shares {
        println!("  {:>5} m: {:>5.1}%", share.distance_m, share.pct);
    }
    println!();
}

pub fn classification(result: &ClassificationResult) {
    println!("== {} ==", Analysis::Classify.label());
    println!(
        "  medians: decay index {:.3}, crimes {:.1}",
        result.decay_median, result.crime_median
    );
    for label in ZipLabel::all() {
        println!(
            "  {label} ({}): {}",
            label.description(),
            result.label_counts.get(label).copied().unwrap_or(0)
        );
    }
    for zip in result.zips.iter().take(5) {
        println!(
            "  {} risk {:.1} [{}]",
            zip.zip_code, zip.risk_score, zip.classification
        );
    }
    println!();
}

pub fn causality(result: &CausalityResult) {
    println!("== {} ==", Analysis::Causality.label());
    for direction in [CausalDirection::DecayToCrime, CausalDirection::CrimeToDecay] {
        if let Some(p) = result.min_p_value(direction) {
            println!("  {direction}: min p = {p:.4}");
        }
    }
    println!("  {}", result.interpretation.description());
    println!();
}

pub fn hotspots(result: &HotspotResult) {
    println!("== {} ==", Analysis::Hotspots.label());
    println!(
        "  {} chronic cells of {} ({}x{} grid, {} m), {}",
        result.chronic_count,
        result.cells.len(),
        result.rows,
        result.cols,
        result.cell_size_m,
        result.classifier
    );
    println!(
        "  holdout {}: accuracy {:.2}, precision {:.2}, recall {:.2}",
        result.holdout_year,
        result.metrics.accuracy,
        result.metrics.precision,
        result.metrics.recall
    );
    for cell in &result.top_cells {
        println!(
            "  {:<10} risk {:.3} ({:.5}, {:.5})",
            cell.cell_id, cell.predicted_risk, cell.center_lat, cell.center_lng
        );
    }
    println!();
}
