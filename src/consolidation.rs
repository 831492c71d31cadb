//! Merging of sparse, low coverage windows into larger windows
//!

use itertools::Itertools;
use log::info;
use statrs::statistics::Statistics;

use crate::read_ratio::{ChromReadRatios, RatioState, ReadRatio};

/// Windows are consolidated until the expected depth of a merged window reaches this value
pub const MIN_CONSOLIDATION_DEPTH: f64 = 8.0;

pub const MAX_CONSOLIDATION_FACTOR: usize = 1000;

pub trait ResultsConsolidator: Send + Sync {
    /// Number of windows merged into each consolidated window, None for no consolidation
    fn consolidation_factor(&self) -> Option<usize>;

    /// Consolidate each chromosome ratio series
    ///
    /// The result must only depend on window positions, so that two series with the same window
    /// positions remain position aligned after consolidation.
    ///
    fn consolidate(&self, chroms: Vec<ChromReadRatios>) -> Vec<ChromReadRatios>;
}

pub struct NoOpConsolidator;

impl ResultsConsolidator for NoOpConsolidator {
    fn consolidation_factor(&self) -> Option<usize> {
        None
    }

    fn consolidate(&self, chroms: Vec<ChromReadRatios>) -> Vec<ChromReadRatios> {
        chroms
    }
}

/// Return the number of windows to merge for the given median read depth
///
/// Returns None when no consolidation is required, including for a non-finite or non-positive
/// median depth.
///
pub fn get_consolidation_factor(median_read_depth: f64) -> Option<usize> {
    if !(median_read_depth.is_finite() && median_read_depth > 0.0) {
        return None;
    }
    let factor = (MIN_CONSOLIDATION_DEPTH / median_read_depth).round();
    let factor = factor.min(MAX_CONSOLIDATION_FACTOR as f64) as usize;
    if factor <= 1 { None } else { Some(factor) }
}

/// Get the consolidator appropriate for a sample with the given median read depth
///
/// A consolidation factor of 1 or less resolves to the no-op consolidator.
///
pub fn get_sparse_consolidator(
    median_read_depth: f64,
    window_size: u32,
) -> Box<dyn ResultsConsolidator> {
    match get_consolidation_factor(median_read_depth) {
        Some(factor) => {
            info!(
                "Median read depth {median_read_depth:.3} is below {MIN_CONSOLIDATION_DEPTH}, consolidating every {factor} windows"
            );
            Box::new(SparseWindowConsolidator::new(factor, window_size))
        }
        None => Box::new(NoOpConsolidator),
    }
}

/// Merges windows into fixed genomic buckets of `factor` windows
///
pub struct SparseWindowConsolidator {
    factor: usize,
    window_size: u32,
}

impl SparseWindowConsolidator {
    pub fn new(factor: usize, window_size: u32) -> Self {
        assert!(factor > 1);
        assert!(window_size > 0);
        Self {
            factor,
            window_size,
        }
    }

    fn bucket_size(&self) -> u64 {
        self.factor as u64 * self.window_size as u64
    }
}

/// Merge a non-empty group of windows into one window at the first window's position
///
/// Depth, GC and ratio are averaged over the included windows, or over all windows for depth and
/// GC if no window is included.
///
fn merge_ratios(group: &[ReadRatio]) -> ReadRatio {
    let first = &group[0];
    let included = group.iter().filter(|x| x.is_included()).collect::<Vec<_>>();
    let (depth, gc_fraction, ratio) = if included.is_empty() {
        (
            group.iter().map(|x| x.depth).mean(),
            group.iter().map(|x| x.gc_fraction).mean(),
            RatioState::Excluded,
        )
    } else {
        (
            included.iter().map(|x| x.depth).mean(),
            included.iter().map(|x| x.gc_fraction).mean(),
            RatioState::Included(included.iter().filter_map(|x| x.ratio.value()).mean()),
        )
    };
    ReadRatio {
        chrom_index: first.chrom_index,
        position: first.position,
        depth,
        gc_fraction,
        ratio,
        diploid_ratio: None,
    }
}

impl ResultsConsolidator for SparseWindowConsolidator {
    fn consolidation_factor(&self) -> Option<usize> {
        Some(self.factor)
    }

    fn consolidate(&self, chroms: Vec<ChromReadRatios>) -> Vec<ChromReadRatios> {
        let bucket_size = self.bucket_size();
        chroms
            .into_iter()
            .map(|chrom_ratios| {
                chrom_ratios
                    .into_iter()
                    .chunk_by(|x| x.position / bucket_size)
                    .into_iter()
                    .map(|(_, group)| merge_ratios(&group.collect::<Vec<_>>()))
                    .collect()
            })
            .collect()
    }
}
