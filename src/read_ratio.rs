//! The per-window ratio record rewritten by each normalisation stage
//!

use crate::depth_reading::DepthReading;

/// Current state of a window's ratio
///
/// Once a ratio is `Excluded` no stage can return it to `Included`. An included ratio of exactly
/// zero is a valid zero copy number observation and is never divided again, but it is still
/// excluded by an invalid correction factor.
///
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RatioState {
    Included(f64),
    Excluded,
}

/// True if `factor` can be used as a ratio divisor
pub fn is_valid_factor(factor: f64) -> bool {
    factor.is_finite() && factor > 0.0
}

impl RatioState {
    pub fn value(&self) -> Option<f64> {
        match self {
            RatioState::Included(x) => Some(*x),
            RatioState::Excluded => None,
        }
    }

    pub fn is_included(&self) -> bool {
        matches!(self, RatioState::Included(_))
    }

    /// True for included ratios greater than zero
    pub fn is_positive(&self) -> bool {
        matches!(self, RatioState::Included(x) if *x > 0.0)
    }

    /// Transform an included non-zero ratio with `f`
    ///
    /// Zero and excluded ratios are returned unchanged. A non-finite or negative result
    /// excludes the ratio.
    ///
    pub fn map_nonzero(self, f: impl FnOnce(f64) -> f64) -> Self {
        match self {
            RatioState::Included(x) if x == 0.0 => self,
            RatioState::Included(x) => {
                let y = f(x);
                if y.is_finite() && y >= 0.0 {
                    RatioState::Included(y)
                } else {
                    RatioState::Excluded
                }
            }
            RatioState::Excluded => self,
        }
    }

    /// Divide ratio by a correction factor
    ///
    /// A missing or invalid factor excludes the ratio, including a ratio of zero.
    ///
    pub fn divided_by(self, factor: Option<f64>) -> Self {
        match factor {
            Some(factor) if is_valid_factor(factor) => self.map_nonzero(|x| x / factor),
            _ => RatioState::Excluded,
        }
    }

    /// Value written to tabular output, with -1 standing in for an excluded ratio
    pub fn output_value(&self) -> f64 {
        self.value().unwrap_or(-1.0)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ReadRatio {
    pub chrom_index: usize,
    pub position: u64,
    pub depth: f64,
    pub gc_fraction: f64,
    pub ratio: RatioState,

    /// Diploid normalised ratio, None until diploid normalisation has run
    pub diploid_ratio: Option<RatioState>,
}

impl ReadRatio {
    pub fn from_reading(reading: &DepthReading) -> Self {
        Self {
            chrom_index: reading.chrom_index,
            position: reading.position,
            depth: reading.depth,
            gc_fraction: reading.gc_fraction,
            ratio: RatioState::Included(reading.depth),
            diploid_ratio: None,
        }
    }

    pub fn is_included(&self) -> bool {
        self.ratio.is_included()
    }

    /// Apply one division stage to the ratio
    pub fn correct(&mut self, factor: Option<f64>) {
        self.ratio = self.ratio.divided_by(factor);
    }
}

pub type ChromReadRatios = Vec<ReadRatio>;
