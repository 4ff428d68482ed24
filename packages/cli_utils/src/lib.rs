#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Terminal plumbing for the `ward_flow` binary.
//!
//! Each pipeline stage gets its own `indicatif` bar through [`stage_bar`]:
//! trip cleaning and ward assignment count records, partition aggregation
//! counts partitions. [`init_logger`] routes `log` output through the same
//! [`MultiProgress`] so stage summaries print above the bars.

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use ward_flow_clean::progress::ProgressCallback;

pub use indicatif::MultiProgress;

/// What a stage's bar counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    /// Trip records; the total may only be known once the stage starts.
    Records,
    /// OD partitions; counted one at a time.
    Partitions,
}

impl StageKind {
    /// Classifies a pipeline stage by its name.
    #[must_use]
    pub fn for_stage(name: &str) -> Self {
        if name.starts_with("Aggregating") {
            Self::Partitions
        } else {
            Self::Records
        }
    }
}

/// An `indicatif` bar driven through [`ProgressCallback`].
pub struct IndicatifProgress {
    bar: ProgressBar,
    /// Applied by `set_total()`; record bars spin until then.
    counted_style: ProgressStyle,
}

impl IndicatifProgress {
    /// Bar for trip cleaning or ward assignment. Spins with the elapsed
    /// time until the stage reports its record count, then shows
    /// throughput and ETA.
    #[must_use]
    pub fn records(multi: &MultiProgress, message: &str) -> Self {
        let bar = multi.add(ProgressBar::new_spinner());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        bar.set_message(message.to_string());

        let counted_style = ProgressStyle::with_template(
            "  {msg} {wide_bar:.cyan/dim} {human_pos}/{human_len} trips ({per_sec}) [{eta}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");

        Self { bar, counted_style }
    }

    /// Bar for partition aggregation, labelled with the partition in
    /// progress.
    #[must_use]
    pub fn partitions(multi: &MultiProgress, message: &str) -> Self {
        let bar = multi.add(ProgressBar::new(0));
        let counted_style = ProgressStyle::with_template(
            "{msg:<32} {wide_bar:.green/dim} {pos}/{len} partitions [{elapsed_precise}]",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-");
        bar.set_style(counted_style.clone());
        bar.set_message(message.to_string());

        Self { bar, counted_style }
    }
}

impl ProgressCallback for IndicatifProgress {
    fn set_total(&self, total: u64) {
        self.bar.set_length(total);
        self.bar.set_position(0);
        self.bar.set_style(self.counted_style.clone());
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

/// Adds the bar suited to the stage called `name` to `multi`.
#[must_use]
pub fn stage_bar(multi: &MultiProgress, name: &str) -> Arc<dyn ProgressCallback> {
    match StageKind::for_stage(name) {
        StageKind::Records => Arc::new(IndicatifProgress::records(multi, name)),
        StageKind::Partitions => Arc::new(IndicatifProgress::partitions(multi, name)),
    }
}

/// Installs `pretty_env_logger` behind `indicatif-log-bridge` and returns
/// the [`MultiProgress`] every stage bar must join.
///
/// Stage summaries are logged at `info`, so that is the level when
/// `RUST_LOG` is unset.
#[must_use]
pub fn init_logger() -> MultiProgress {
    let multi = MultiProgress::new();

    let logger = pretty_env_logger::formatted_builder()
        .filter_level(log::LevelFilter::Info)
        .parse_env("RUST_LOG")
        .build();
    let level = logger.filter();

    indicatif_log_bridge::LogWrapper::new(multi.clone(), logger)
        .try_init()
        .ok(); // already set, e.g. by another test

    log::set_max_level(level);

    multi
}
