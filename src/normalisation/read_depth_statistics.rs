use log::info;
use simple_error::SimpleResult;

use super::{PhaseGuard, RatioNormaliser};
use crate::chrom_list::ChromList;
use crate::depth_reading::gc_fraction_to_bucket;
use crate::read_ratio::ReadRatio;
use crate::statistics::Statistics;

const LABEL: &str = "read depth statistics";

/// Scales ratios by the mean/median ratio of raw read depth
///
/// Depth is accumulated from autosomal windows with a positive ratio, whose GC bucket is in the
/// allowed range.
///
pub struct ReadDepthStatisticsNormaliser {
    is_autosome: Vec<bool>,
    min_allowed_gc_bucket: usize,
    max_allowed_gc_bucket: usize,
    depths: Vec<f64>,
    statistics: Statistics,
    guard: PhaseGuard,
}

impl ReadDepthStatisticsNormaliser {
    pub fn new(
        chrom_list: &ChromList,
        min_allowed_gc_bucket: usize,
        max_allowed_gc_bucket: usize,
    ) -> Self {
        Self {
            is_autosome: (0..chrom_list.len())
                .map(|chrom_index| chrom_list.is_autosome(chrom_index))
                .collect(),
            min_allowed_gc_bucket,
            max_allowed_gc_bucket,
            depths: Vec::new(),
            statistics: Statistics::default(),
            guard: PhaseGuard::default(),
        }
    }

    /// Frozen mean/median factor, None if it could not be computed
    pub fn factor(&self) -> Option<f64> {
        let factor = self.statistics.mean / self.statistics.median;
        if self.statistics.is_empty() || !factor.is_finite() || factor <= 0.0 {
            None
        } else {
            Some(factor)
        }
    }
}

impl RatioNormaliser for ReadDepthStatisticsNormaliser {
    fn label(&self) -> &str {
        LABEL
    }

    fn record_value(&mut self, ratio: &ReadRatio) -> SimpleResult<()> {
        self.guard.check_recording(LABEL)?;
        if !(self.is_autosome[ratio.chrom_index] && ratio.ratio.is_positive()) {
            return Ok(());
        }
        let gc_bucket = gc_fraction_to_bucket(ratio.gc_fraction)?;
        if gc_bucket > self.min_allowed_gc_bucket && gc_bucket <= self.max_allowed_gc_bucket {
            self.depths.push(ratio.depth);
        }
        Ok(())
    }

    fn freeze(&mut self) -> SimpleResult<()> {
        self.guard.freeze(LABEL)?;
        self.statistics = Statistics::from_values(std::mem::take(&mut self.depths));
        match self.factor() {
            Some(factor) => info!(
                "Read depth mean: {:.3} median: {:.3} factor: {:.4}",
                self.statistics.mean, self.statistics.median, factor
            ),
            None => info!("No read depth statistics available, ratios will not be rescaled"),
        }
        Ok(())
    }

    fn apply_normalisation(&mut self, ratio: &mut ReadRatio) -> SimpleResult<()> {
        self.guard.check_frozen(LABEL)?;
        if let Some(factor) = self.factor() {
            ratio.correct(Some(factor));
        }
        Ok(())
    }

    fn frozen_factor(&self) -> Option<f64> {
        self.factor()
    }
}
