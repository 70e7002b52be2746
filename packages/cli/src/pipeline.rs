//! Dataset loading and analysis orchestration.
//!
//! Every dataset and every analysis is isolated: a dataset that fails to
//! load is replaced by an empty one whose report records the failure, and
//! an analysis that fails is logged
//! with its name and reason while the remaining analyses still run and
//! still get exported.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use decay_map_analytics::AnalyticsError;
use decay_map_analytics_models::{
    AnalysisConfig, CausalityResult, ClassificationResult, DatasetsConfig, HotspotResult,
    ProximityResult, SummaryStats,
};
use decay_map_cli_utils::{IndicatifProgress, MultiProgress};
use decay_map_decay_models::{CrimeIncident, DecayIndicator};
use decay_map_generate::{AnalysisOutputs, GenerateError, Manifest};
use decay_map_source::code_violations::CodeViolationLoader;
use decay_map_source::crime::CrimeLoader;
use decay_map_source::progress::ProgressCallback;
use decay_map_source::registry::{definition_for, parse_definition_toml};
use decay_map_source::unfit::UnfitLoader;
use decay_map_source::vacant::VacantLoader;
use decay_map_source::{Dataset, DatasetLoader, SourceError};
use decay_map_source_models::{DatasetDefinition, DatasetKind, LoadReport};

use crate::report;

/// One analysis the CLI can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Analysis {
    Summary,
    Proximity,
    Classify,
    Causality,
    Hotspots,
}

impl Analysis {
    pub const ALL: &[Self] = &[
        Self::Summary,
        Self::Proximity,
        Self::Classify,
        Self::Causality,
        Self::Hotspots,
    ];

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Summary => "Descriptive statistics",
            Self::Proximity => "Crime proximity to decay",
            Self::Classify => "Zip classification",
            Self::Causality => "Decay/crime causality",
            Self::Hotspots => "Hotspot prediction",
        }
    }
}

/// Loaded records, with indicators of every decay type in one list.
pub struct Inputs {
    pub crimes: Vec<CrimeIncident>,
    pub indicators: Vec<DecayIndicator>,
    pub reports: Vec<LoadReport>,
}

/// Resolves the definition used for `kind`: the schema file configured for
/// it, or the built-in one.
///
/// # Errors
///
/// Returns [`SourceError`] if the configured schema cannot be read or parsed.
pub fn resolve_definition(
    kind: DatasetKind,
    config: &DatasetsConfig,
) -> Result<DatasetDefinition, SourceError> {
    match config.schemas.get(kind.as_ref()) {
        Some(path) => {
            log::info!("[{kind}] Using schema {}", path.display());
            let toml_str = std::fs::read_to_string(path)?;
            parse_definition_toml(&toml_str)
        }
        None => definition_for(kind).ok_or_else(|| SourceError::Schema {
            message: format!("no built-in definition for '{kind}'"),
        }),
    }
}

/// Loads all four datasets. Failures are logged and yield empty datasets
/// whose reports carry the reason.
pub fn load_inputs(config: &DatasetsConfig, multi: &MultiProgress) -> Inputs {
    for key in config.schemas.keys() {
        if key.parse::<DatasetKind>().is_err() {
            log::warn!("Ignoring schema for unknown dataset kind '{key}'");
        }
    }

    let steps = IndicatifProgress::steps_bar(multi, "Datasets", DatasetKind::all().len() as u64);

    let crimes = load_dataset(DatasetKind::Crime, CrimeLoader::new, config, multi);
    steps.inc(1);
    let unfit = load_dataset(DatasetKind::Unfit, UnfitLoader::new, config, multi);
    steps.inc(1);
    let vacant = load_dataset(DatasetKind::Vacant, VacantLoader::new, config, multi);
    steps.inc(1);
    let violations = load_dataset(
        DatasetKind::CodeViolations,
        CodeViolationLoader::new,
        config,
        multi,
    );
    steps.inc(1);
    steps.finish("Datasets loaded".to_string());

    let reports = vec![
        crimes.report.clone(),
        unfit.report.clone(),
        vacant.report.clone(),
        violations.report.clone(),
    ];

    let mut indicators = unfit.records;
    indicators.extend(vacant.records);
    indicators.extend(violations.records);

    Inputs {
        crimes: crimes.records,
        indicators,
        reports,
    }
}

fn load_dataset<L: DatasetLoader>(
    kind: DatasetKind,
    new_loader: impl FnOnce(DatasetDefinition) -> Result<L, SourceError>,
    config: &DatasetsConfig,
    multi: &MultiProgress,
) -> Dataset<L::Record> {
    let progress = IndicatifProgress::records_bar(multi, &format!("Loading {kind}"));
    let result = resolve_definition(kind, config)
        .and_then(new_loader)
        .and_then(|loader| loader.load_from_dir(&config.data_dir, &progress));

    match result {
        Ok(dataset) => {
            progress.finish(format!("{kind}: {} records", dataset.len()));
            dataset
        }
        Err(e) => {
            progress.finish(format!("{kind}: failed"));
            log::error!("[{kind}] Dataset could not be loaded, continuing without it: {e}");
            Dataset::failed(kind.as_ref(), e.to_string())
        }
    }
}

#[derive(Default)]
struct Results {
    summary: Option<SummaryStats>,
    proximity: Option<ProximityResult>,
    classification: Option<ClassificationResult>,
    causality: Option<CausalityResult>,
    hotspots: Option<HotspotResult>,
}

/// Runs the selected analyses, prints their headlines, and exports
/// everything that succeeded to `output_dir`.
///
/// Returns the export manifest and the number of failed analyses.
///
/// # Errors
///
/// Returns [`GenerateError`] if the outputs cannot be written. Analysis
/// failures are not errors here.
pub fn run_analyses(
    inputs: &Inputs,
    config: &AnalysisConfig,
    selected: &[Analysis],
    output_dir: &Path,
    multi: &MultiProgress,
) -> Result<(Manifest, usize), GenerateError> {
    let start = Instant::now();
    let steps = IndicatifProgress::steps_bar(multi, "Analyses", selected.len() as u64);
    let mut results = Results::default();
    let mut failed = 0_usize;

    for analysis in selected {
        steps.set_message(analysis.label().to_string());
        log::info!("Running {}...", analysis.label());
        if let Err(e) = run_one(*analysis, inputs, config, &mut results) {
            failed += 1;
            log::error!("{} failed: {e}", analysis.label());
            report::failure(*analysis, &e);
        }
        steps.inc(1);
    }
    steps.finish(format!(
        "{} of {} analyses succeeded",
        selected.len() - failed,
        selected.len()
    ));

    let crimes: &[CrimeIncident] = if results.proximity.is_some() {
        &inputs.crimes
    } else {
        &[]
    };
    let outputs = AnalysisOutputs {
        crimes,
        datasets: &inputs.reports,
        summary: results.summary.as_ref(),
        proximity: results.proximity.as_ref(),
        classification: results.classification.as_ref(),
        causality: results.causality.as_ref(),
        hotspots: results.hotspots.as_ref(),
    };
    let progress: Arc<dyn ProgressCallback> = IndicatifProgress::records_bar(multi, "Exporting");
    let manifest = decay_map_generate::write_outputs(output_dir, &outputs, &progress)?;

    log::info!(
        "Finished {} analyses in {:.1}s",
        selected.len(),
        start.elapsed().as_secs_f64()
    );

    Ok((manifest, failed))
}

fn run_one(
    analysis: Analysis,
    inputs: &Inputs,
    config: &AnalysisConfig,
    results: &mut Results,
) -> Result<(), AnalyticsError> {
    let crimes = &inputs.crimes;
    let indicators = &inputs.indicators;

    match analysis {
        Analysis::Summary => {
            let summary = decay_map_analytics::summary::summarize(crimes, indicators);
            report::summary(&summary);
            results.summary = Some(summary);
        }
        Analysis::Proximity => {
            let proximity =
                decay_map_analytics::proximity::proximity_join(crimes, indicators, &config.proximity)?;
            report::proximity(&proximity);
            results.proximity = Some(proximity);
        }
        Analysis::Classify => {
            let classification = decay_map_analytics::classify::classify_zips(
                crimes,
                indicators,
                &config.classification,
            )?;
            report::classification(&classification);
            results.classification = Some(classification);
        }
        Analysis::Causality => {
            let causality =
                decay_map_analytics::causality::run_causality(crimes, indicators, &config.causality)?;
            report::causality(&causality);
            results.causality = Some(causality);
        }
        Analysis::Hotspots => {
            let hotspots =
                decay_map_analytics::hotspot::predict_hotspots(crimes, indicators, &config.hotspot)?;
            report::hotspots(&hotspots);
            results.hotspots = Some(hotspots);
        }
    }

    Ok(())
}
