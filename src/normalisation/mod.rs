//! Two-phase ratio normalisers
//!
//! Every normaliser follows the same sequence over a sample's ratios:
//! 1. `record_value` is called once per ratio to accumulate a private statistic
//! 2. `freeze` finalizes the statistic
//! 3. `apply_normalisation` is called once per ratio, in recording order, to rewrite the ratio
//!
//! Calling any phase out of order is an error.
//!

mod diploid;
mod read_depth_statistics;
mod unity;

use simple_error::{SimpleResult, bail};

use crate::read_ratio::{ChromReadRatios, ReadRatio};

pub use self::diploid::{DiploidNormaliserSettings, normalise_diploid_ratios};
pub use self::read_depth_statistics::ReadDepthStatisticsNormaliser;
pub use self::unity::UnityNormaliser;

pub trait RatioNormaliser: Send {
    /// Short name used in error and log messages
    fn label(&self) -> &str;

    fn record_value(&mut self, ratio: &ReadRatio) -> SimpleResult<()>;

    fn freeze(&mut self) -> SimpleResult<()>;

    fn apply_normalisation(&mut self, ratio: &mut ReadRatio) -> SimpleResult<()>;

    /// The frozen factor each ratio is divided by, if the normaliser uses a single factor
    fn frozen_factor(&self) -> Option<f64> {
        None
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display)]
pub enum NormaliserPhase {
    #[default]
    Recording,
    Frozen,
}

/// Tracks normaliser phase and reports out-of-order phase calls
///
#[derive(Default)]
pub struct PhaseGuard {
    phase: NormaliserPhase,
}

impl PhaseGuard {
    pub fn check_recording(&self, label: &str) -> SimpleResult<()> {
        if self.phase != NormaliserPhase::Recording {
            bail!(
                "{} normaliser: value recorded after normaliser was frozen",
                label
            );
        }
        Ok(())
    }

    pub fn freeze(&mut self, label: &str) -> SimpleResult<()> {
        if self.phase == NormaliserPhase::Frozen {
            bail!("{} normaliser: freeze called more than once", label);
        }
        self.phase = NormaliserPhase::Frozen;
        Ok(())
    }

    pub fn check_frozen(&self, label: &str) -> SimpleResult<()> {
        if self.phase != NormaliserPhase::Frozen {
            bail!(
                "{} normaliser: normalisation applied before normaliser was frozen",
                label
            );
        }
        Ok(())
    }
}

/// Identity normaliser, which still enforces phase order
///
#[derive(Default)]
pub struct NoOpNormaliser {
    guard: PhaseGuard,
}

impl RatioNormaliser for NoOpNormaliser {
    fn label(&self) -> &str {
        "no-op"
    }

    fn record_value(&mut self, _ratio: &ReadRatio) -> SimpleResult<()> {
        self.guard.check_recording(self.label())
    }

    fn freeze(&mut self) -> SimpleResult<()> {
        self.guard.freeze("no-op")
    }

    fn apply_normalisation(&mut self, _ratio: &mut ReadRatio) -> SimpleResult<()> {
        self.guard.check_frozen(self.label())
    }
}

/// Run all three normaliser phases over the given chromosome ratio series
///
pub fn normalise_ratios<N: RatioNormaliser + ?Sized>(
    normaliser: &mut N,
    chroms: &mut [ChromReadRatios],
) -> SimpleResult<()> {
    for ratio in chroms.iter().flatten() {
        normaliser.record_value(ratio)?;
    }
    normaliser.freeze()?;
    for ratio in chroms.iter_mut().flatten() {
        normaliser.apply_normalisation(ratio)?;
    }
    Ok(())
}
