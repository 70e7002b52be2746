#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Export of analysis results for the dashboard.
//!
//! Each analysis result is written as pretty-printed camelCase JSON, and the
//! two map layers (crimes and hotspot cells) as newline-delimited `GeoJSON`
//! features (`.geojsonseq`). A `manifest.json` lists what the last run
//! produced and when, along with the load report of every dataset. JSON files are written to a temporary name and then
//! renamed, so a reader never sees half a file.

use std::collections::BTreeMap;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use decay_map_analytics_models::{
    CausalityResult, ClassificationResult, CrimeProximity, HotspotResult, ProximityResult,
    SummaryStats,
};
use decay_map_decay_models::CrimeIncident;
use decay_map_source::progress::ProgressCallback;
use decay_map_source_models::LoadReport;
use serde::{Deserialize, Serialize};

/// Current manifest schema version.
const MANIFEST_VERSION: u32 = 1;

/// Output name of the descriptive statistics.
pub const OUTPUT_SUMMARY: &str = "summary";

/// Output name of the proximity join.
pub const OUTPUT_PROXIMITY: &str = "proximity";

/// Output name of the zip classification.
pub const OUTPUT_CLASSIFICATION: &str = "classification";

/// Output name of the causality test.
pub const OUTPUT_CAUSALITY: &str = "causality";

/// Output name of the hotspot prediction.
pub const OUTPUT_HOTSPOTS: &str = "hotspots";

/// Output name of the hotspot cell map layer.
pub const OUTPUT_HOTSPOT_FEATURES: &str = "hotspot_features";

/// Output name of the crime map layer.
pub const OUTPUT_CRIME_FEATURES: &str = "crime_features";

/// Errors that can occur while writing outputs.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Record of one export run, stored as `manifest.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    /// Manifest schema version.
    pub version: u32,
    /// RFC 3339 timestamp of the run.
    pub generated_at: String,
    /// Output name -> file name.
    pub outputs: BTreeMap<String, String>,
    /// Load report per dataset, including failed loads.
    #[serde(default)]
    pub datasets: Vec<LoadReport>,
}

/// Results to export. Analyses that did not run (or failed) are `None`.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnalysisOutputs<'a> {
    /// Crime incidents, for the crime map layer.
    pub crimes: &'a [CrimeIncident],
    /// Dataset load reports.
    pub datasets: &'a [LoadReport],
    /// Descriptive statistics.
    pub summary: Option<&'a SummaryStats>,
    /// Proximity join.
    pub proximity: Option<&'a ProximityResult>,
    /// Zip classification.
    pub classification: Option<&'a ClassificationResult>,
    /// Causality test.
    pub causality: Option<&'a CausalityResult>,
    /// Hotspot prediction.
    pub hotspots: Option<&'a HotspotResult>,
}

/// Default output directory, relative to the working directory.
#[must_use]
pub fn default_output_dir() -> PathBuf {
    PathBuf::from("data/generated")
}

/// File name an output is written to.
#[must_use]
pub fn output_file_name(name: &str) -> String {
    match name {
        OUTPUT_HOTSPOT_FEATURES => "hotspots.geojsonseq".to_owned(),
        OUTPUT_CRIME_FEATURES => "crimes.geojsonseq".to_owned(),
        other => format!("{other}.json"),
    }
}

/// Writes every available output into `dir`, then the manifest.
///
/// # Errors
///
/// Returns [`GenerateError`] if a file cannot be written.
pub fn write_outputs(
    dir: &Path,
    outputs: &AnalysisOutputs<'_>,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<Manifest, GenerateError> {
    std::fs::create_dir_all(dir)?;
    let mut written = BTreeMap::new();

    if let Some(summary) = outputs.summary {
        write_named_json(dir, OUTPUT_SUMMARY, summary, &mut written)?;
    }
    if let Some(proximity) = outputs.proximity {
        write_named_json(dir, OUTPUT_PROXIMITY, proximity, &mut written)?;
    }
    if let Some(classification) = outputs.classification {
        write_named_json(dir, OUTPUT_CLASSIFICATION, classification, &mut written)?;
    }
    if let Some(causality) = outputs.causality {
        write_named_json(dir, OUTPUT_CAUSALITY, causality, &mut written)?;
    }
    if let Some(hotspots) = outputs.hotspots {
        write_named_json(dir, OUTPUT_HOTSPOTS, hotspots, &mut written)?;

        let file_name = output_file_name(OUTPUT_HOTSPOT_FEATURES);
        let file = std::fs::File::create(dir.join(&file_name))?;
        let count = write_hotspot_features(file, hotspots)?;
        log::info!("Exported {count} hotspot cells to {file_name}");
        written.insert(OUTPUT_HOTSPOT_FEATURES.to_owned(), file_name);
    }

    if !outputs.crimes.is_empty() {
        let file_name = output_file_name(OUTPUT_CRIME_FEATURES);
        let file = std::fs::File::create(dir.join(&file_name))?;
        progress.set_message("Exporting crime features...".to_string());
        progress.set_total(outputs.crimes.len() as u64);
        let count = write_crime_features(file, outputs.crimes, outputs.proximity, progress)?;
        progress.finish(format!("Exported {count} crime features"));
        log::info!("Exported {count} crime features to {file_name}");
        written.insert(OUTPUT_CRIME_FEATURES.to_owned(), file_name);
    }

    let manifest = Manifest {
        version: MANIFEST_VERSION,
        generated_at: chrono::Utc::now().to_rfc3339(),
        outputs: written,
        datasets: outputs.datasets.to_vec(),
    };
    for report in manifest.datasets.iter().filter(|r| r.is_failed()) {
        log::warn!("Manifest records failed dataset '{}'", report.dataset);
    }
    write_json_atomic(&dir.join("manifest.json"), &manifest)?;
    log::info!(
        "Wrote {} outputs to {}",
        manifest.outputs.len(),
        dir.display()
    );

    Ok(manifest)
}

fn write_named_json<T: Serialize>(
    dir: &Path,
    name: &str,
    value: &T,
    written: &mut BTreeMap<String, String>,
) -> Result<(), GenerateError> {
    let file_name = output_file_name(name);
    write_json_atomic(&dir.join(&file_name), value)?;
    written.insert(name.to_owned(), file_name);
    Ok(())
}

/// Writes `value` as pretty JSON through a temporary file and a rename.
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), GenerateError> {
    let tmp_path = path.with_extension("json.tmp");
    let file = std::fs::File::create(&tmp_path)?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)?;
    writer.flush()?;
    drop(writer);
    std::fs::rename(&tmp_path, path)?;
    log::debug!("Wrote {}", path.display());
    Ok(())
}

/// Writes one point feature per crime. When a proximity result is given,
/// each feature also carries its near-decay flag, nearest distance and
/// decay zone.
///
/// # Errors
///
/// Returns [`GenerateError`] if writing fails.
pub fn write_crime_features<W: Write>(
    writer: W,
    crimes: &[CrimeIncident],
    proximity: Option<&ProximityResult>,
    progress: &Arc<dyn ProgressCallback>,
) -> Result<u64, GenerateError> {
    let mut writer = BufWriter::new(writer);
    let rows: BTreeMap<usize, &CrimeProximity> = proximity
        .map(|p| p.crimes.iter().map(|c| (c.crime_index, c)).collect())
        .unwrap_or_default();

    let mut count = 0_u64;
    for (index, crime) in crimes.iter().enumerate() {
        let row = rows.get(&index);
        let feature = serde_json::json!({
            "type": "Feature",
            "geometry": {
                "type": "Point",
                "coordinates": [crime.point.longitude(), crime.point.latitude()]
            },
            "properties": {
                "id": index,
                "crimeType": crime.crime_type(),
                "severity": crime.severity,
                "date": crime.point.timestamp.map(|d| d.to_string()),
                "hour": crime.hour,
                "zip": crime.point.zip_code,
                "nearDecay": row.map(|r| r.near),
                "nearestDecayM": row.and_then(|r| r.nearest_distance_m),
                "zone": row.map(|r| r.zone),
            }
        });

        serde_json::to_writer(&mut writer, &feature)?;
        writer.write_all(b"\n")?;
        count += 1;
        if count % 10_000 == 0 {
            progress.inc(10_000);
        }
    }
    progress.inc(count % 10_000);

    writer.flush()?;
    Ok(count)
}

/// Writes one polygon feature per active grid cell.
///
/// # Errors
///
/// Returns [`GenerateError`] if writing fails.
pub fn write_hotspot_features<W: Write>(
    writer: W,
    result: &HotspotResult,
) -> Result<u64, GenerateError> {
    let mut writer = BufWriter::new(writer);
    let ranks: BTreeMap<&str, usize> = result
        .top_cells
        .iter()
        .enumerate()
        .map(|(i, c)| (c.cell_id.as_str(), i + 1))
        .collect();

    let mut count = 0_u64;
    for cell in &result.cells {
        let ring = [
            [cell.west, cell.south],
            [cell.east, cell.south],
            [cell.east, cell.north],
            [cell.west, cell.north],
            [cell.west, cell.south],
        ];
        let feature = serde_json::json!({
            "type": "Feature",
            "geometry": {
                "type": "Polygon",
                "coordinates": [ring]
            },
            "properties": {
                "cellId": cell.cell_id,
                "risk": cell.predicted_risk,
                "chronic": cell.is_chronic_hotspot,
                "rank": ranks.get(cell.cell_id.as_str()),
                "yearlyCounts": cell.yearly_counts,
                "unfit": cell.unfit_count,
                "vacant": cell.vacant_count,
                "violations": cell.violation_count,
            }
        });

        serde_json::to_writer(&mut writer, &feature)?;
        writer.write_all(b"\n")?;
        count += 1;
    }

    writer.flush()?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use decay_map_analytics_models::{
        ClassifierKind, CrimeProximity, DecayZone, GridCell, ModelMetrics,
    };
    use decay_map_decay_models::{CrimeSeverity, PointRecord};
    use decay_map_source::progress::null_progress;

    fn crimes() -> Vec<CrimeIncident> {
        vec![
            CrimeIncident {
                point: PointRecord::new(
                    43.05,
                    -76.15,
                    NaiveDate::from_ymd_opt(2024, 3, 1),
                    "ROBBERY",
                    Some("13205".to_owned()),
                )
                .unwrap(),
                severity: CrimeSeverity::Serious,
                hour: Some(22),
            },
            CrimeIncident {
                point: PointRecord::new(43.06, -76.14, None, "NOISE", None).unwrap(),
                severity: CrimeSeverity::QualityOfLife,
                hour: None,
            },
        ]
    }

    fn lines(buf: &[u8]) -> Vec<serde_json::Value> {
        std::str::from_utf8(buf)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn crime_features_are_one_per_line() {
        let mut buf = Vec::new();
        let count = write_crime_features(&mut buf, &crimes(), None, &null_progress()).unwrap();
        assert_eq!(count, 2);

        let features = lines(&buf);
        assert_eq!(features.len(), 2);
        assert_eq!(features[0]["geometry"]["coordinates"][0], -76.15);
        assert_eq!(features[0]["properties"]["crimeType"], "ROBBERY");
        assert_eq!(features[0]["properties"]["severity"], "SERIOUS");
        assert_eq!(features[0]["properties"]["date"], "2024-03-01");
        assert!(features[1]["properties"]["date"].is_null());
        assert!(features[1]["properties"]["nearDecay"].is_null());
    }

    #[test]
    fn crime_features_carry_proximity() {
        let proximity = ProximityResult {
            distance_m: 100,
            crime_count: 2,
            indicator_count: 1,
            crimes: vec![CrimeProximity {
                crime_index: 1,
                nearest_distance_m: Some(42.0),
                near: true,
                near_unfit: true,
                near_vacant: false,
                zone: DecayZone::NearUnfitOnly,
                violations_nearby: 0,
                violation_severity: 0,
                structural_nearby: false,
            }],
            near_count: 1,
            near_pct: 50.0,
            radius_shares: Vec::new(),
            near_unfit_count: 1,
            near_vacant_count: 0,
            zone_counts: BTreeMap::new(),
            by_crime_type: Vec::new(),
        };

        let mut buf = Vec::new();
        write_crime_features(&mut buf, &crimes(), Some(&proximity), &null_progress()).unwrap();
        let features = lines(&buf);
        assert!(features[0]["properties"]["nearDecay"].is_null());
        assert_eq!(features[1]["properties"]["nearDecay"], true);
        assert_eq!(features[1]["properties"]["nearestDecayM"], 42.0);
        assert_eq!(features[1]["properties"]["zone"], "NEAR_UNFIT_ONLY");
    }

    #[test]
    fn hotspot_cells_are_closed_polygons() {
        let cell = GridCell {
            cell_id: "r0_c1".to_owned(),
            row: 0,
            col: 1,
            south: 43.0,
            west: -76.1,
            north: 43.002,
            east: -76.097,
            center_lat: 43.001,
            center_lng: -76.0985,
            yearly_counts: [(2024, 7)].into(),
            is_chronic_hotspot: true,
            predicted_risk: 0.9,
            unfit_count: 1,
            vacant_count: 0,
            violation_count: 2,
        };
        let result = HotspotResult {
            cell_size_m: 250.0,
            rows: 1,
            cols: 2,
            classifier: ClassifierKind::RandomForest,
            training_years: vec![2024],
            holdout_year: 2024,
            cells: vec![cell.clone()],
            top_cells: vec![cell],
            chronic_count: 1,
            metrics: ModelMetrics {
                samples: 1,
                accuracy: 1.0,
                precision: 1.0,
                recall: 1.0,
            },
            avg_future_crimes: 0.0,
        };

        let mut buf = Vec::new();
        assert_eq!(write_hotspot_features(&mut buf, &result).unwrap(), 1);
        let features = lines(&buf);
        let ring = features[0]["geometry"]["coordinates"][0].as_array().unwrap();
        assert_eq!(ring.len(), 5);
        assert_eq!(ring[0], ring[4]);
        assert_eq!(features[0]["properties"]["rank"], 1);
        assert_eq!(features[0]["properties"]["yearlyCounts"]["2024"], 7);
    }

    #[test]
    fn output_file_names() {
        assert_eq!(output_file_name(OUTPUT_SUMMARY), "summary.json");
        assert_eq!(output_file_name(OUTPUT_HOTSPOTS), "hotspots.json");
        assert_eq!(output_file_name(OUTPUT_HOTSPOT_FEATURES), "hotspots.geojsonseq");
        assert_eq!(output_file_name(OUTPUT_CRIME_FEATURES), "crimes.geojsonseq");
    }

    #[test]
    fn writes_only_available_outputs() {
        let dir = std::env::temp_dir().join(format!("decay_map_generate_{}", std::process::id()));
        let crimes = crimes();
        let outputs = AnalysisOutputs {
            crimes: &crimes,
            ..AnalysisOutputs::default()
        };
        let manifest = write_outputs(&dir, &outputs, &null_progress()).unwrap();
        assert_eq!(
            manifest.outputs.keys().collect::<Vec<_>>(),
            vec![OUTPUT_CRIME_FEATURES]
        );
        assert!(dir.join("crimes.geojsonseq").exists());
        assert!(dir.join("manifest.json").exists());
        assert!(!dir.join("summary.json").exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn manifest_records_failed_datasets() {
        let dir = std::env::temp_dir().join(format!(
            "decay_map_generate_failed_{}",
            std::process::id()
        ));
        let mut loaded = LoadReport::new("unfit");
        loaded.rows_read = 3;
        loaded.rows_kept = 3;
        let reports = vec![
            LoadReport::failed("crime", "missing required column 'LAT'"),
            loaded,
        ];
        let outputs = AnalysisOutputs {
            datasets: &reports,
            ..AnalysisOutputs::default()
        };
        write_outputs(&dir, &outputs, &null_progress()).unwrap();

        let json = std::fs::read_to_string(dir.join("manifest.json")).unwrap();
        let written: Manifest = serde_json::from_str(&json).unwrap();
        assert_eq!(written.datasets, reports);
        assert_eq!(
            written.datasets[0].error.as_deref(),
            Some("missing required column 'LAT'")
        );
        assert!(written.datasets[1].error.is_none());

        let raw: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(raw["datasets"][1].get("error").is_none());
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
