#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the decay map binaries.
//!
//! [`init_logger`] routes `log` output through `indicatif-log-bridge` so log
//! lines are printed above the progress bars instead of through them, and
//! [`IndicatifProgress`] renders the loaders' and exporters'
//! [`ProgressCallback`] updates.

use std::sync::Arc;
use std::time::Duration;

use decay_map_source::progress::ProgressCallback;
use indicatif::{ProgressBar, ProgressStyle};

pub use indicatif::MultiProgress;

/// What a bar counts, which decides how it is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BarKind {
    /// CSV rows or exported features; total unknown until `set_total()`.
    Records,
    /// Datasets or analyses; total known up front.
    Steps,
}

impl BarKind {
    const fn spinner_template(self) -> &'static str {
        match self {
            Self::Records => "{spinner:.cyan} {msg}",
            Self::Steps => "{spinner:.green} {msg}",
        }
    }

    const fn bar_template(self) -> &'static str {
        match self {
            Self::Records => "  {msg} {wide_bar:.cyan/dim} {pos}/{len} {percent}% [{eta}]",
            Self::Steps => "{msg} {wide_bar:.green/dim} {pos}/{len} [{elapsed_precise}]",
        }
    }

    fn bar_style(self) -> ProgressStyle {
        ProgressStyle::with_template(self.bar_template())
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-")
    }

    fn spinner_style(self) -> ProgressStyle {
        ProgressStyle::with_template(self.spinner_template())
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }
}

/// An `indicatif` [`ProgressBar`] that implements [`ProgressCallback`].
pub struct IndicatifProgress {
    bar: ProgressBar,
    kind: BarKind,
}

impl IndicatifProgress {
    fn add(multi: &MultiProgress, kind: BarKind, message: &str, total: Option<u64>) -> Self {
        let bar = match total {
            Some(total) => {
                let bar = multi.add(ProgressBar::new(total));
                bar.set_style(kind.bar_style());
                bar
            }
            None => {
                let bar = multi.add(ProgressBar::new_spinner());
                bar.set_style(kind.spinner_style());
                bar.enable_steady_tick(Duration::from_millis(100));
                bar
            }
        };
        bar.set_message(message.to_string());
        Self { bar, kind }
    }

    /// Bar for row-level work (CSV rows, exported features). Spins until
    /// the loader reports a total.
    #[must_use]
    pub fn records_bar(multi: &MultiProgress, message: &str) -> Arc<dyn ProgressCallback> {
        Arc::new(Self::add(multi, BarKind::Records, message, None))
    }

    /// Bar for step-level work (datasets 2/4, analyses 3/5).
    #[must_use]
    pub fn steps_bar(
        multi: &MultiProgress,
        message: &str,
        total: u64,
    ) -> Arc<dyn ProgressCallback> {
        Arc::new(Self::add(multi, BarKind::Steps, message, Some(total)))
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        self.bar.disable_steady_tick();
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_style(self.kind.bar_style());
    }

    fn inc(&self, delta: u64) {
        self.bar.inc(delta);
    }

    fn set_message(&self, msg: String) {
        self.bar.set_message(msg);
    }

    fn finish(&self, msg: String) {
        self.bar.finish_with_message(msg);
    }
}

/// Initializes `pretty_env_logger` (filtered by `RUST_LOG`) behind
/// `indicatif-log-bridge`.
///
/// Returns the [`MultiProgress`] that all progress bars must be added to.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    // Fails when a logger is already installed, which only happens in tests.
    if indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .is_ok()
    {
        log::set_max_level(level);
    }

    multi
}

#[cfg(test)]
mod tests {
    use super::*;
    use indicatif::ProgressDrawTarget;

    fn hidden() -> MultiProgress {
        MultiProgress::with_draw_target(ProgressDrawTarget::hidden())
    }

    #[test]
    fn records_bar_switches_to_known_total() {
        let progress = IndicatifProgress::add(&hidden(), BarKind::Records, "Loading", None);
        assert_eq!(progress.bar.length(), None);

        progress.set_total(40);
        progress.inc(15);
        assert_eq!(progress.bar.length(), Some(40));
        assert_eq!(progress.bar.position(), 15);
    }

    #[test]
    fn steps_bar_finishes_with_message() {
        let progress = IndicatifProgress::add(&hidden(), BarKind::Steps, "Analyses", Some(5));
        progress.inc(5);
        progress.finish("done".to_string());
        assert!(progress.bar.is_finished());
        assert_eq!(progress.bar.message(), "done");
    }
}
