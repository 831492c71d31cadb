use simple_error::{SimpleResult, bail};

/// Number of GC buckets, one per integer GC percentage in [0,100]
pub const GC_BUCKET_COUNT: usize = 101;

/// Raw read depth for one fixed-size genomic window
///
/// Produced once per window by the depth input reader and never mutated
///
#[derive(Clone, Debug, PartialEq)]
pub struct DepthReading {
    pub chrom_index: usize,

    /// 0-indexed window start position
    pub position: u64,

    pub depth: f64,

    /// GC fraction of the window reference sequence in [0,1]
    pub gc_fraction: f64,
}

impl DepthReading {
    pub fn gc_bucket(&self) -> SimpleResult<usize> {
        gc_fraction_to_bucket(self.gc_fraction)
    }
}

pub type ChromDepthReadings = Vec<DepthReading>;

/// Depth readings for one sample, indexed by chromosome index of the run's ChromList
///
pub struct SampleDepthReadings {
    pub chroms: Vec<ChromDepthReadings>,
}

impl SampleDepthReadings {
    pub fn new(chrom_count: usize) -> Self {
        Self {
            chroms: vec![Vec::new(); chrom_count],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.chroms.iter().all(|x| x.is_empty())
    }

    pub fn window_count(&self) -> usize {
        self.chroms.iter().map(|x| x.len()).sum()
    }
}

/// Convert GC fraction into an integer GC percentage bucket
///
/// A bucket index outside of [0,100] means the GC fraction itself is corrupt, so this is returned
/// as an error rather than clamped.
///
pub fn gc_fraction_to_bucket(gc_fraction: f64) -> SimpleResult<usize> {
    let bucket = (gc_fraction * 100.0).round();
    if !(bucket >= 0.0 && bucket < GC_BUCKET_COUNT as f64) {
        bail!(
            "GC fraction '{}' maps to out of range GC bucket '{}'",
            gc_fraction,
            bucket
        );
    }
    Ok(bucket as usize)
}
