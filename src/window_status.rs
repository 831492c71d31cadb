//! Per-window exclusion mask applied before any ratio statistic is accumulated
//!

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::chrom_list::ChromList;
use crate::depth_reading::{DepthReading, SampleDepthReadings};
use crate::genome_regions::GenomeRegions;

/// Reference-derived properties of one window
#[derive(Clone, Debug, PartialEq)]
pub struct GcProfile {
    pub gc_fraction: f64,
    pub mappability: f64,
}

/// GC profile records keyed on chromosome label and window start position
///
#[derive(Default)]
pub struct GenomeGcProfile {
    pub chroms: HashMap<String, HashMap<u64, GcProfile>>,
}

impl GenomeGcProfile {
    pub fn add(&mut self, chrom: &str, position: u64, profile: GcProfile) {
        self.chroms
            .entry(chrom.to_string())
            .or_default()
            .insert(position, profile);
    }

    pub fn get(&self, chrom: &str, position: u64) -> Option<&GcProfile> {
        self.chroms.get(chrom)?.get(&position)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WindowStatus {
    /// Window intersects an explicitly excluded region
    pub excluded: bool,

    /// Window mappability is below threshold, or the window has no GC profile record
    pub unmappable: bool,

    /// Window intersects a region with non-diploid expected copy number
    pub non_diploid: bool,
}

impl WindowStatus {
    pub fn is_masked(&self) -> bool {
        self.excluded || self.unmappable || self.non_diploid
    }
}

/// Counts of masked windows by reason
///
/// A window masked for several reasons is counted under each one
///
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct WindowMaskStats {
    pub input_window_count: usize,
    pub excluded_window_count: usize,
    pub unmappable_window_count: usize,
    pub non_diploid_window_count: usize,
    pub masked_window_count: usize,
}

impl WindowMaskStats {
    fn add(&mut self, status: &WindowStatus) {
        self.input_window_count += 1;
        self.excluded_window_count += status.excluded as usize;
        self.unmappable_window_count += status.unmappable as usize;
        self.non_diploid_window_count += status.non_diploid as usize;
        self.masked_window_count += status.is_masked() as usize;
    }
}

/// Derives WindowStatus for each window from region and profile data shared by all samples
///
pub struct WindowMask<'a> {
    pub gc_profile: &'a GenomeGcProfile,
    pub excluded_regions: &'a GenomeRegions,
    pub non_diploid_regions: &'a GenomeRegions,
    pub min_mappability: f64,
    pub window_size: u32,
}

impl WindowMask<'_> {
    /// Return the window status, and the window GC fraction if a profile record exists
    ///
    pub fn window_status(&self, chrom: &str, position: u64) -> (WindowStatus, Option<f64>) {
        let start = position as i64;
        let end = start + self.window_size as i64;
        let profile = self.gc_profile.get(chrom, position);
        let status = WindowStatus {
            excluded: self.excluded_regions.intersect(chrom, start, end),
            unmappable: match profile {
                Some(x) => x.mappability < self.min_mappability,
                None => true,
            },
            non_diploid: self.non_diploid_regions.intersect(chrom, start, end),
        };
        (status, profile.map(|x| x.gc_fraction))
    }
}

/// Raw depth observation for one window prior to GC profile annotation
///
#[derive(Clone, Debug)]
pub struct RawDepth {
    pub position: u64,
    pub depth: f64,
}

/// Annotate raw depths with GC fraction and drop all masked windows
///
/// `raw_depths` is indexed by the chromosome index of `chrom_list`. Masked windows are not
/// emitted.
///
pub fn get_unmasked_depth_readings(
    chrom_list: &ChromList,
    raw_depths: &[Vec<RawDepth>],
    window_mask: &WindowMask,
) -> (SampleDepthReadings, WindowMaskStats) {
    let mut readings = SampleDepthReadings::new(chrom_list.len());
    let mut stats = WindowMaskStats::default();
    for (chrom_index, chrom_raw_depths) in raw_depths.iter().enumerate() {
        let chrom_label = chrom_list.data[chrom_index].label.as_str();
        for raw_depth in chrom_raw_depths.iter() {
            let (status, gc_fraction) = window_mask.window_status(chrom_label, raw_depth.position);
            stats.add(&status);
            if status.is_masked() {
                continue;
            }
            if let Some(gc_fraction) = gc_fraction {
                readings.chroms[chrom_index].push(DepthReading {
                    chrom_index,
                    position: raw_depth.position,
                    depth: raw_depth.depth,
                    gc_fraction,
                });
            }
        }
    }
    (readings, stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chrom_list::test_utils::chrom_list_from_labels;

    #[test]
    fn test_window_status() {
        let mut gc_profile = GenomeGcProfile::default();
        gc_profile.add(
            "chr1",
            0,
            GcProfile {
                gc_fraction: 0.4,
                mappability: 1.0,
            },
        );
        gc_profile.add(
            "chr1",
            1000,
            GcProfile {
                gc_fraction: 0.4,
                mappability: 0.5,
            },
        );
        gc_profile.add(
            "chr1",
            2000,
            GcProfile {
                gc_fraction: 0.4,
                mappability: 1.0,
            },
        );
        let mut excluded_regions = GenomeRegions::default();
        excluded_regions.add_region("chr1", 2500, 2600);
        let mut non_diploid_regions = GenomeRegions::default();
        non_diploid_regions.add_region("chr1", 4000, 5000);

        let mask = WindowMask {
            gc_profile: &gc_profile,
            excluded_regions: &excluded_regions,
            non_diploid_regions: &non_diploid_regions,
            min_mappability: 0.85,
            window_size: 1000,
        };

        let (status, gc) = mask.window_status("chr1", 0);
        assert!(!status.is_masked());
        assert_eq!(gc, Some(0.4));

        let (status, _) = mask.window_status("chr1", 1000);
        assert!(status.unmappable);
        assert!(status.is_masked());

        let (status, _) = mask.window_status("chr1", 2000);
        assert!(status.excluded);
        assert!(!status.unmappable);

        // No profile record
        let (status, gc) = mask.window_status("chr1", 3000);
        assert!(status.unmappable);
        assert_eq!(gc, None);

        let (status, _) = mask.window_status("chr1", 4000);
        assert!(status.non_diploid);
    }

    #[test]
    fn test_get_unmasked_depth_readings() {
        let chrom_list = chrom_list_from_labels(&["chr1"]);
        let mut gc_profile = GenomeGcProfile::default();
        for position in [0, 1000, 2000] {
            gc_profile.add(
                "chr1",
                position,
                GcProfile {
                    gc_fraction: 0.45,
                    mappability: 1.0,
                },
            );
        }
        let mut excluded_regions = GenomeRegions::default();
        excluded_regions.add_region("chr1", 1000, 1001);
        let non_diploid_regions = GenomeRegions::default();
        let mask = WindowMask {
            gc_profile: &gc_profile,
            excluded_regions: &excluded_regions,
            non_diploid_regions: &non_diploid_regions,
            min_mappability: 0.85,
            window_size: 1000,
        };

        let raw_depths = vec![vec![
            RawDepth {
                position: 0,
                depth: 10.0,
            },
            RawDepth {
                position: 1000,
                depth: 11.0,
            },
            RawDepth {
                position: 2000,
                depth: 12.0,
            },
            RawDepth {
                position: 3000,
                depth: 13.0,
            },
        ]];

        let (readings, stats) = get_unmasked_depth_readings(&chrom_list, &raw_depths, &mask);
        assert_eq!(readings.window_count(), 2);
        assert_eq!(readings.chroms[0][1].position, 2000);
        approx::assert_ulps_eq!(readings.chroms[0][1].gc_fraction, 0.45);
        assert_eq!(stats.input_window_count, 4);
        assert_eq!(stats.excluded_window_count, 1);
        assert_eq!(stats.unmappable_window_count, 1);
        assert_eq!(stats.masked_window_count, 2);
    }
}
