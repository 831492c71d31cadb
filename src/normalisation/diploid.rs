//! Diploid rolling median normalisation
//!
//! Each chromosome's ratios are flattened toward the chromosome's expected ratio using the median
//! of a sliding window of nearby ratios. The window is measured in ratio index distance rather
//! than genomic distance, and is updated incrementally as the normalisation cursor advances.
//!

use log::debug;
use rayon::prelude::*;
use simple_error::{SimpleResult, bail};

use super::{PhaseGuard, RatioNormaliser, normalise_ratios};
use crate::chrom_list::{ChromInfo, ChromKind, ChromList};
use crate::log_utils::debug_msg;
use crate::read_ratio::{ChromReadRatios, RatioState, ReadRatio};
use crate::rolling_median::RollingMedian;
use crate::statistics::Statistics;

#[derive(Clone, Debug)]
pub struct DiploidNormaliserSettings {
    /// Half-width of the rolling median window, in ratio index distance
    pub max_window_distance: usize,

    /// Minimum number of valid ratios in the rolling window required to normalise a ratio
    pub min_window_coverage: usize,
}

/// Rolling median normaliser for a single chromosome
///
pub struct ChromDiploidNormaliser {
    label: String,
    expected_ratio: f64,
    is_bypass: bool,
    settings: DiploidNormaliserSettings,

    /// (position, ratio) of every recorded ratio in recording order
    buffer: Vec<(u64, RatioState)>,

    statistics: Statistics,
    rolling_median: RollingMedian,

    /// Index of the next buffer entry expected by apply_normalisation
    cursor: usize,

    /// All buffer entries below this index have been removed from the rolling median
    window_start: usize,

    /// All buffer entries below this index have been added to the rolling median
    window_end: usize,

    guard: PhaseGuard,
}

/// Value contributed to the rolling median, only positive ratios are used
fn window_value(ratio: &RatioState) -> Option<f64> {
    ratio.value().filter(|&x| x > 0.0)
}

impl ChromDiploidNormaliser {
    pub fn new(chrom_info: &ChromInfo, settings: &DiploidNormaliserSettings) -> Self {
        Self {
            label: format!("diploid ({})", chrom_info.label),
            expected_ratio: chrom_info.expected_diploid_ratio,
            is_bypass: chrom_info.kind == ChromKind::Haploid,
            settings: settings.clone(),
            buffer: Vec::new(),
            statistics: Statistics::default(),
            rolling_median: RollingMedian::new(),
            cursor: 0,
            window_start: 0,
            window_end: 0,
            guard: PhaseGuard::default(),
        }
    }

    /// Remove entries that are now more than max_window_distance behind the cursor
    fn remove_expired_ratios(&mut self) {
        while self.window_start < self.cursor
            && (self.cursor - self.window_start) > self.settings.max_window_distance
        {
            if let Some(x) = window_value(&self.buffer[self.window_start].1) {
                let removed = self.rolling_median.remove(x);
                assert!(removed);
            }
            self.window_start += 1;
        }
    }

    /// Add entries that are now within max_window_distance ahead of the cursor
    fn add_new_ratios(&mut self) {
        while self.window_end < self.buffer.len()
            && (self.window_end - self.cursor) <= self.settings.max_window_distance
        {
            if let Some(x) = window_value(&self.buffer[self.window_end].1) {
                self.rolling_median.add(x);
            }
            self.window_end += 1;
        }
    }

    fn get_diploid_ratio(&self, ratio: RatioState) -> RatioState {
        if self.rolling_median.is_empty()
            || self.rolling_median.len() < self.settings.min_window_coverage
        {
            return ratio;
        }
        let Some(median) = self.rolling_median.median() else {
            return ratio;
        };
        if median == 0.0 || self.expected_ratio == 0.0 {
            return ratio.map_nonzero(|_| 0.0);
        }
        let expected_ratio = self.expected_ratio;
        ratio.map_nonzero(|x| expected_ratio * x / median)
    }
}

impl RatioNormaliser for ChromDiploidNormaliser {
    fn label(&self) -> &str {
        &self.label
    }

    fn record_value(&mut self, ratio: &ReadRatio) -> SimpleResult<()> {
        self.guard.check_recording(&self.label)?;
        self.buffer.push((ratio.position, ratio.ratio));
        Ok(())
    }

    fn freeze(&mut self) -> SimpleResult<()> {
        self.guard.freeze(&self.label)?;
        let values = self
            .buffer
            .iter()
            .filter_map(|(_, x)| window_value(x))
            .collect::<Vec<_>>();
        self.statistics = Statistics::from_values(values);
        debug!(
            "{}: {} positive ratios, median {:.4}",
            self.label, self.statistics.count, self.statistics.median
        );
        Ok(())
    }

    fn apply_normalisation(&mut self, ratio: &mut ReadRatio) -> SimpleResult<()> {
        self.guard.check_frozen(&self.label)?;

        let Some(&(expected_position, expected_ratio)) = self.buffer.get(self.cursor) else {
            bail!(
                "{} normaliser: more ratios normalised than recorded, at position {}",
                self.label,
                ratio.position
            );
        };
        if expected_position != ratio.position || expected_ratio != ratio.ratio {
            bail!(
                "{} normaliser: ratio at position {} is not the next recorded ratio, expected position {}",
                self.label,
                ratio.position,
                expected_position
            );
        }

        if self.is_bypass {
            ratio.diploid_ratio = Some(ratio.ratio);
        } else {
            self.remove_expired_ratios();
            self.add_new_ratios();
            let diploid_ratio = self.get_diploid_ratio(ratio.ratio);
            let debug = false;
            debug_msg!(
                debug,
                "{} pos: {} window: {}..{} size: {} median: {:?} ratio: {:?} diploid_ratio: {:?}",
                self.label,
                ratio.position,
                self.window_start,
                self.window_end,
                self.rolling_median.len(),
                self.rolling_median.median(),
                ratio.ratio,
                diploid_ratio
            );
            ratio.diploid_ratio = Some(diploid_ratio);
        }

        self.cursor += 1;
        Ok(())
    }
}

/// Apply diploid normalisation to every chromosome of a sample
///
/// Chromosomes are processed in parallel, each with its own exclusively owned normaliser. The
/// calling thread pool determines the degree of parallelism.
///
/// Returns the positive ratio statistics of each chromosome, indexed by chromosome index.
///
pub fn normalise_diploid_ratios(
    chrom_list: &ChromList,
    settings: &DiploidNormaliserSettings,
    chroms: &mut [ChromReadRatios],
) -> SimpleResult<Vec<Statistics>> {
    assert_eq!(chrom_list.len(), chroms.len());
    chroms
        .par_iter_mut()
        .enumerate()
        .map(|(chrom_index, chrom_ratios)| {
            let mut normaliser =
                ChromDiploidNormaliser::new(&chrom_list.data[chrom_index], settings);
            normalise_ratios(&mut normaliser, std::slice::from_mut(chrom_ratios))?;
            Ok(normaliser.statistics)
        })
        .collect()
}
