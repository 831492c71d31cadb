use log::info;
use simple_error::SimpleResult;

use super::{PhaseGuard, RatioNormaliser};
use crate::chrom_list::ChromList;
use crate::read_ratio::ReadRatio;
use crate::statistics::Statistics;

const LABEL: &str = "unity";

/// Scales all ratios so that the mean of positive autosomal ratios becomes 1
///
pub struct UnityNormaliser {
    is_autosome: Vec<bool>,
    values: Vec<f64>,
    statistics: Statistics,
    guard: PhaseGuard,
}

impl UnityNormaliser {
    pub fn new(chrom_list: &ChromList) -> Self {
        Self {
            is_autosome: (0..chrom_list.len())
                .map(|chrom_index| chrom_list.is_autosome(chrom_index))
                .collect(),
            values: Vec::new(),
            statistics: Statistics::default(),
            guard: PhaseGuard::default(),
        }
    }

    /// Mean of recorded ratios, None before freeze or when no ratios were recorded
    pub fn mean(&self) -> Option<f64> {
        if self.statistics.is_empty() {
            None
        } else {
            Some(self.statistics.mean)
        }
    }
}

impl RatioNormaliser for UnityNormaliser {
    fn label(&self) -> &str {
        LABEL
    }

    fn record_value(&mut self, ratio: &ReadRatio) -> SimpleResult<()> {
        self.guard.check_recording(LABEL)?;
        if self.is_autosome[ratio.chrom_index]
            && let Some(x) = ratio.ratio.value()
            && x > 0.0
        {
            self.values.push(x);
        }
        Ok(())
    }

    fn freeze(&mut self) -> SimpleResult<()> {
        self.guard.freeze(LABEL)?;
        self.statistics = Statistics::from_values(std::mem::take(&mut self.values));
        if self.statistics.is_empty() {
            info!(
                "No positive autosomal ratios found for unity normalisation, ratios will not be rescaled"
            );
        }
        Ok(())
    }

    fn apply_normalisation(&mut self, ratio: &mut ReadRatio) -> SimpleResult<()> {
        self.guard.check_frozen(LABEL)?;
        if let Some(mean) = self.mean() {
            ratio.correct(Some(mean));
        }
        Ok(())
    }

    fn frozen_factor(&self) -> Option<f64> {
        self.mean()
    }
}
