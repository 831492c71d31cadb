use camino::Utf8Path;
use log::info;
use simple_error::SimpleResult;
use unwrap::unwrap;

use crate::depth_reading::{GC_BUCKET_COUNT, gc_fraction_to_bucket};
use crate::statistics::Statistics;

/// Accumulates raw read depth for each GC bucket of one sample
///
pub struct GcBucketDepths {
    buckets: Vec<Vec<f64>>,
}

impl GcBucketDepths {
    pub fn new() -> Self {
        Self {
            buckets: vec![Vec::new(); GC_BUCKET_COUNT],
        }
    }

    /// Route `depth` into the bucket for `gc_fraction`
    pub fn add_reading(&mut self, depth: f64, gc_fraction: f64) -> SimpleResult<()> {
        let bucket = gc_fraction_to_bucket(gc_fraction)?;
        self.buckets[bucket].push(depth);
        Ok(())
    }

    pub fn reading_count(&self) -> usize {
        self.buckets.iter().map(|x| x.len()).sum()
    }

    /// Median depth of the bucket, or 0 if the bucket has no readings
    pub fn median(&self, bucket: usize) -> f64 {
        Statistics::from_values(self.buckets[bucket].clone()).median
    }

    /// Build the smoothed GC baseline curve
    ///
    /// Each bucket's baseline is the mean of the bucket medians at bucket-1, bucket and bucket+1.
    /// Buckets at or below `min_allowed_gc_bucket` or above `max_allowed_gc_bucket` are invalid,
    /// as is the last bucket, which has no upper neighbor.
    ///
    pub fn build_baseline(
        &self,
        min_allowed_gc_bucket: usize,
        max_allowed_gc_bucket: usize,
    ) -> GcBaseline {
        let bucket_medians = (0..GC_BUCKET_COUNT)
            .map(|bucket| self.median(bucket))
            .collect::<Vec<_>>();

        if self.reading_count() == 0 {
            info!("No depth readings available for GC bias estimation");
        }

        let last_bucket = GC_BUCKET_COUNT - 1;
        let values = (0..GC_BUCKET_COUNT)
            .map(|bucket| {
                if bucket <= min_allowed_gc_bucket
                    || bucket > max_allowed_gc_bucket
                    || bucket == last_bucket
                {
                    return None;
                }
                let window = &bucket_medians[bucket.saturating_sub(1)..=bucket + 1];
                Some(window.iter().sum::<f64>() / window.len() as f64)
            })
            .collect();

        GcBaseline {
            bucket_medians,
            values,
        }
    }
}

/// Smoothed per-bucket depth baseline, read-only once built
///
pub struct GcBaseline {
    bucket_medians: Vec<f64>,
    values: Vec<Option<f64>>,
}

impl GcBaseline {
    /// Baseline depth for `bucket`, or None if the bucket is invalid for normalisation
    pub fn lookup(&self, bucket: usize) -> Option<f64> {
        self.values.get(bucket).copied().flatten()
    }

    pub fn bucket_median(&self, bucket: usize) -> f64 {
        self.bucket_medians[bucket]
    }
}

/// Write a tsv file of GC bucket medians and smoothed baseline values for one sample
///
/// Invalid baseline buckets are written as -1
///
pub fn write_gc_baseline_file(output_dir: &Utf8Path, sample_label: &str, baseline: &GcBaseline) {
    use std::fs::File;
    use std::io::{BufWriter, Write};

    let filename = output_dir.join(format!("{sample_label}.gc.median.tsv"));

    info!("Writing {sample_label} gc baseline table to file: '{filename}'");

    let f = unwrap!(
        File::create(&filename),
        "Unable to create gc baseline table file: '{}'",
        filename
    );
    let mut f = BufWriter::new(f);

    writeln!(f, "gcBucket\tmedian\tsmoothedMedian").unwrap();
    for bucket in 0..GC_BUCKET_COUNT {
        writeln!(
            f,
            "{}\t{:.3}\t{:.3}",
            bucket,
            baseline.bucket_median(bucket),
            baseline.lookup(bucket).unwrap_or(-1.0)
        )
        .unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_median() {
        let mut gc_depths = GcBucketDepths::new();
        gc_depths.add_reading(10.0, 0.40).unwrap();
        gc_depths.add_reading(30.0, 0.401).unwrap();
        gc_depths.add_reading(20.0, 0.399).unwrap();
        gc_depths.add_reading(7.0, 0.50).unwrap();

        approx::assert_ulps_eq!(gc_depths.median(40), 20.0);
        approx::assert_ulps_eq!(gc_depths.median(50), 7.0);
        approx::assert_ulps_eq!(gc_depths.median(41), 0.0);
        assert_eq!(gc_depths.reading_count(), 4);
    }

    #[test]
    fn test_add_reading_out_of_range() {
        let mut gc_depths = GcBucketDepths::new();
        assert!(gc_depths.add_reading(10.0, 1.2).is_err());
        assert!(gc_depths.add_reading(10.0, f64::NAN).is_err());
        assert_eq!(gc_depths.reading_count(), 0);
    }

    #[test]
    fn test_smoothed_baseline() {
        let mut gc_depths = GcBucketDepths::new();
        gc_depths.add_reading(9.0, 0.39).unwrap();
        gc_depths.add_reading(12.0, 0.40).unwrap();
        gc_depths.add_reading(15.0, 0.41).unwrap();

        let baseline = gc_depths.build_baseline(20, 60);
        approx::assert_ulps_eq!(baseline.lookup(40).unwrap(), 12.0);
        approx::assert_ulps_eq!(baseline.lookup(39).unwrap(), 7.0);
        approx::assert_ulps_eq!(baseline.lookup(41).unwrap(), 9.0);
        approx::assert_ulps_eq!(baseline.lookup(42).unwrap(), 5.0);
        approx::assert_ulps_eq!(baseline.lookup(43).unwrap(), 0.0);
        approx::assert_ulps_eq!(baseline.bucket_median(40), 12.0);
    }

    #[test]
    fn test_baseline_bounds() {
        let mut gc_depths = GcBucketDepths::new();
        for bucket in 0..GC_BUCKET_COUNT {
            gc_depths
                .add_reading(10.0, bucket as f64 / 100.0)
                .unwrap();
        }
        let (min_gc, max_gc) = (20, 60);
        let baseline = gc_depths.build_baseline(min_gc, max_gc);
        for bucket in 0..GC_BUCKET_COUNT {
            let value = baseline.lookup(bucket);
            if bucket > min_gc && bucket <= max_gc {
                approx::assert_ulps_eq!(value.unwrap(), 10.0);
            } else {
                assert_eq!(value, None);
            }
        }

        // The last bucket is never valid
        let baseline = gc_depths.build_baseline(0, 100);
        assert_eq!(baseline.lookup(100), None);
        assert!(baseline.lookup(99).is_some());
        assert_eq!(baseline.lookup(101), None);
    }
}
