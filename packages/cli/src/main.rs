#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Command-line front end for the decay map analyses.
//!
//! Loads the crime and property decay datasets, runs the selected analyses
//! and writes their results for the dashboard. Without a subcommand the
//! analysis is picked interactively.

mod pipeline;
mod report;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use decay_map_analytics::AnalyticsError;
use decay_map_analytics_models::{AnalysisConfig, ClassifierKind};
use decay_map_cli_utils::MultiProgress;
use decay_map_source_models::DatasetKind;
use dialoguer::{Confirm, Input, Select};

use crate::pipeline::Analysis;

#[derive(Parser)]
#[command(name = "decay_map", about = "Urban decay and crime analysis")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Analysis configuration TOML (defaults to the built-in configuration)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the dataset CSV files
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Proximity radius in meters (must be one of the candidate distances)
    #[arg(long, global = true)]
    radius: Option<u32>,

    /// Maximum lag in months for the causality test
    #[arg(long, global = true)]
    max_lag: Option<usize>,

    /// Number of top hotspot cells to report
    #[arg(long, global = true)]
    top_n: Option<usize>,

    /// Seed for the hotspot classifier
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Directory the results are written to
    #[arg(long, global = true)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Descriptive statistics over every dataset
    Summary,
    /// Share of crimes near decay indicators
    Proximity,
    /// Classify zip codes by decay and crime
    Classify,
    /// Test whether decay and crime series predict each other
    Causality {
        /// Restrict both series to one zip code
        #[arg(long)]
        zip: Option<String>,
    },
    /// Predict chronic crime hotspot cells
    Hotspots {
        /// Classifier family (`random_forest` or `logistic_regression`)
        #[arg(long)]
        classifier: Option<String>,
    },
    /// Run every analysis
    All,
    /// List the dataset schemas in use
    Datasets,
}

/// Command-line values that replace configuration values.
#[derive(Default)]
struct Overrides {
    data_dir: Option<PathBuf>,
    radius: Option<u32>,
    max_lag: Option<usize>,
    top_n: Option<usize>,
    seed: Option<u64>,
    zip: Option<String>,
    classifier: Option<String>,
}

impl Overrides {
    fn apply(self, config: &mut AnalysisConfig) -> Result<(), AnalyticsError> {
        if let Some(data_dir) = self.data_dir {
            config.datasets.data_dir = data_dir;
        }
        if let Some(radius) = self.radius {
            config.proximity.distance_m = radius;
        }
        if let Some(max_lag) = self.max_lag {
            config.causality.max_lag = max_lag;
        }
        if let Some(top_n) = self.top_n {
            config.hotspot.top_n = top_n;
        }
        if let Some(seed) = self.seed {
            config.hotspot.seed = seed;
        }
        if self.zip.is_some() {
            config.causality.zip = self.zip;
        }
        if let Some(classifier) = self.classifier {
            config.hotspot.classifier =
                classifier
                    .parse::<ClassifierKind>()
                    .map_err(|_| AnalyticsError::InvalidConfig {
                        message: format!("unknown classifier '{classifier}'"),
                    })?;
        }

        config
            .validate()
            .map_err(|message| AnalyticsError::InvalidConfig { message })
    }
}

fn resolve_config(
    path: Option<&PathBuf>,
    overrides: Overrides,
) -> Result<AnalysisConfig, AnalyticsError> {
    let mut config = match path {
        Some(path) => decay_map_analytics::load_config(path)?,
        None => decay_map_analytics::default_config()?,
    };
    overrides.apply(&mut config)?;
    Ok(config)
}

enum Action {
    Run(Vec<Analysis>),
    Datasets,
}

/// Interactive analysis picker, used when no subcommand is given.
fn prompt_action(
    overrides: &mut Overrides,
    config: &AnalysisConfig,
) -> Result<Action, dialoguer::Error> {
    let mut labels = vec!["Run all analyses"];
    labels.extend(Analysis::ALL.iter().map(|a| a.label()));
    labels.push("List dataset schemas");

    let idx = Select::new()
        .with_prompt("What would you like to do?")
        .items(&labels)
        .default(0)
        .interact()?;

    let action = match idx {
        0 => Action::Run(Analysis::ALL.to_vec()),
        i if i <= Analysis::ALL.len() => Action::Run(vec![Analysis::ALL[i - 1]]),
        _ => return Ok(Action::Datasets),
    };

    let customize = Confirm::new()
        .with_prompt("Adjust parameters?")
        .default(false)
        .interact()?;
    if customize {
        let radius: u32 = Input::new()
            .with_prompt(format!(
                "Proximity radius in meters {:?}",
                config.proximity.candidate_distances_m
            ))
            .default(overrides.radius.unwrap_or(config.proximity.distance_m))
            .interact_text()?;
        let max_lag: usize = Input::new()
            .with_prompt("Causality max lag (months)")
            .default(overrides.max_lag.unwrap_or(config.causality.max_lag))
            .interact_text()?;
        let top_n: usize = Input::new()
            .with_prompt("Top hotspot cells to report")
            .default(overrides.top_n.unwrap_or(config.hotspot.top_n))
            .interact_text()?;
        overrides.radius = Some(radius);
        overrides.max_lag = Some(max_lag);
        overrides.top_n = Some(top_n);
    }

    Ok(action)
}

fn list_datasets(config: &AnalysisConfig) {
    println!("{:<18} {:<28} {:<28} NAME", "KIND", "ID", "FILE");
    println!("{}", "-".repeat(90));
    for kind in DatasetKind::all() {
        match pipeline::resolve_definition(*kind, &config.datasets) {
            Ok(definition) => println!(
                "{:<18} {:<28} {:<28} {}",
                kind.as_ref(),
                definition.id,
                definition.file_name,
                definition.name
            ),
            Err(e) => println!("{:<18} error: {e}", kind.as_ref()),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let multi: MultiProgress = decay_map_cli_utils::init_logger();
    let cli = Cli::parse();

    let mut overrides = Overrides {
        data_dir: cli.data_dir,
        radius: cli.radius,
        max_lag: cli.max_lag,
        top_n: cli.top_n,
        seed: cli.seed,
        ..Overrides::default()
    };

    let action = match cli.command {
        Some(Commands::Summary) => Action::Run(vec![Analysis::Summary]),
        Some(Commands::Proximity) => Action::Run(vec![Analysis::Proximity]),
        Some(Commands::Classify) => Action::Run(vec![Analysis::Classify]),
        Some(Commands::Causality { zip }) => {
            overrides.zip = zip;
            Action::Run(vec![Analysis::Causality])
        }
        Some(Commands::Hotspots { classifier }) => {
            overrides.classifier = classifier;
            Action::Run(vec![Analysis::Hotspots])
        }
        Some(Commands::All) => Action::Run(Analysis::ALL.to_vec()),
        Some(Commands::Datasets) => Action::Datasets,
        None => {
            println!("Decay Map");
            println!();
            let base = resolve_config(cli.config.as_ref(), Overrides::default())?;
            prompt_action(&mut overrides, &base)?
        }
    };

    let config = resolve_config(cli.config.as_ref(), overrides)?;

    let selected = match action {
        Action::Datasets => {
            list_datasets(&config);
            return Ok(());
        }
        Action::Run(selected) => selected,
    };

    let inputs = pipeline::load_inputs(&config.datasets, &multi);
    report::load_reports(&inputs.reports);

    let output_dir = cli
        .output
        .unwrap_or_else(decay_map_generate::default_output_dir);
    let (manifest, failed) =
        pipeline::run_analyses(&inputs, &config, &selected, &output_dir, &multi)?;

    println!(
        "Wrote {} outputs to {}",
        manifest.outputs.len(),
        output_dir.display()
    );
    if failed > 0 {
        log::warn!("{failed} of {} analyses failed", selected.len());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn global_flags_follow_the_subcommand() {
        let cli = Cli::parse_from(["decay_map", "proximity", "--radius", "200"]);
        assert!(matches!(cli.command, Some(Commands::Proximity)));
        assert_eq!(cli.radius, Some(200));
    }

    #[test]
    fn overrides_replace_config_values() {
        let overrides = Overrides {
            radius: Some(300),
            max_lag: Some(6),
            top_n: Some(3),
            seed: Some(7),
            zip: Some("13205".to_owned()),
            classifier: Some("logistic_regression".to_owned()),
            ..Overrides::default()
        };
        let config = resolve_config(None, overrides).unwrap();
        assert_eq!(config.proximity.distance_m, 300);
        assert_eq!(config.causality.max_lag, 6);
        assert_eq!(config.hotspot.top_n, 3);
        assert_eq!(config.hotspot.seed, 7);
        assert_eq!(config.causality.zip.as_deref(), Some("13205"));
        assert_eq!(config.hotspot.classifier, ClassifierKind::LogisticRegression);
    }

    #[test]
    fn radius_outside_candidates_is_rejected() {
        let overrides = Overrides {
            radius: Some(150),
            ..Overrides::default()
        };
        let err = resolve_config(None, overrides).unwrap_err();
        assert!(matches!(err, AnalyticsError::InvalidConfig { .. }));
    }

    #[test]
    fn unknown_classifier_is_rejected() {
        let overrides = Overrides {
            classifier: Some("svm".to_owned()),
            ..Overrides::default()
        };
        assert!(matches!(
            resolve_config(None, overrides),
            Err(AnalyticsError::InvalidConfig { .. })
        ));
    }
}
