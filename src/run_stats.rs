//! Track stats for the whole covratio run
//!

use std::fs::File;

use camino::Utf8Path;
use log::info;
use serde::{Deserialize, Serialize};
use unwrap::unwrap;

use crate::sample_ratios::{SampleKind, SampleRatioStats};
use crate::statistics::Statistics;
use crate::window_status::WindowMaskStats;

pub const RUN_STATS_FILENAME: &str = "run.stats.json";

#[derive(Clone, Copy, Debug, Deserialize, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunMode {
    WholeGenome,
    TargetedPanel,
}

#[derive(Deserialize, Serialize)]
pub struct ChromDiploidStats {
    pub chrom_label: String,

    /// Statistics over the positive ratios used for the chromosome's rolling median
    pub statistics: Statistics,
}

#[derive(Deserialize, Serialize)]
pub struct SampleRunStats {
    pub sample: SampleKind,
    pub window_mask_stats: WindowMaskStats,
    pub ratio_stats: SampleRatioStats,

    /// Window count after consolidation
    pub consolidated_window_count: usize,

    /// Only available for the reference sample
    pub diploid_stats: Option<Vec<ChromDiploidStats>>,

    pub sample_time_secs: f64,
}

#[derive(Deserialize, Serialize)]
pub struct RatioRunStats {
    pub run_mode: RunMode,

    /// None if no consolidation was applied
    pub consolidation_factor: Option<usize>,

    pub samples: Vec<SampleRunStats>,
    pub collated_record_count: usize,
}

/// Write run_stats structure out in json format
pub fn write_ratio_run_stats(output_dir: &Utf8Path, run_stats: &RatioRunStats) {
    let filename = output_dir.join(RUN_STATS_FILENAME);

    info!("Writing run statistics to file: '{filename}'");

    let f = unwrap!(
        File::create(&filename),
        "Unable to create run statistics json file: '{}'",
        filename
    );

    serde_json::to_writer_pretty(&f, &run_stats).unwrap();
}
