use std::collections::HashMap;

use bio::data_structures::interval_tree::IntervalTree;
use camino::Utf8Path;
use log::info;

use crate::text_reader::{for_each_data_line, parse_field};

/// A set of chromosome regions which can be efficiently queried
///
#[derive(Clone, Default)]
pub struct ChromRegions {
    regions: IntervalTree<i64, ()>,
}

impl ChromRegions {
    /// Return true if the start-end range intersects with any regions stored in this object
    ///
    pub fn intersect(&self, start: i64, end: i64) -> bool {
        self.regions.find(start..end).next().is_some()
    }

    /// Add region, regions are not collapsed
    ///
    pub fn add_region(&mut self, start: i64, end: i64) {
        self.regions.insert(start..end, ());
    }
}

/// Regions keyed on chromosome label
///
#[derive(Clone, Default)]
pub struct GenomeRegions {
    pub chroms: HashMap<String, ChromRegions>,
}

impl GenomeRegions {
    /// Create new object from a plain or gzipped bed file
    ///
    /// # Arguments
    ///
    /// * `label` - Used in log and error messages to describe what type of regions file this is
    ///
    pub fn from_bed(filename: &Utf8Path, label: &str) -> Self {
        info!("Reading {label} regions from file '{filename}'");

        let mut regions = GenomeRegions::default();
        for_each_data_line(filename, label, "track", |line_number, words| {
            let chrom = words[0];
            let start = parse_field::<i64>(words, 1, "start", filename, line_number);
            let end = parse_field::<i64>(words, 2, "end", filename, line_number);
            regions.add_region(chrom, start, end);
        });
        regions
    }

    /// # Arguments
    /// * `chrom` - the contig string
    /// * `start` - the start coordinate (included)
    /// * `end` - the end coordinates (excluded)
    pub fn add_region(&mut self, chrom: &str, start: i64, end: i64) {
        self.chroms
            .entry(chrom.to_owned())
            .or_default()
            .add_region(start, end);
    }

    /// Return true if the region intersects any region in this set. False if the contig does not exist.
    ///
    pub fn intersect(&self, chrom: &str, start: i64, end: i64) -> bool {
        self.chroms
            .get(chrom)
            .is_some_and(|chrom_regions| chrom_regions.intersect(start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersect() {
        let mut regions = ChromRegions::default();

        regions.add_region(100, 101);
        assert!(regions.intersect(100, 101));
        assert!(!regions.intersect(99, 100));
        assert!(!regions.intersect(101, 102));
        assert!(regions.intersect(0, 1000));
    }

    #[test]
    fn test_genome_intersect() {
        let mut genome_regions = GenomeRegions::default();
        genome_regions.add_region("chr1", 10, 20);
        genome_regions.add_region("chr1", 19, 30);

        assert!(!genome_regions.intersect("chr1", 9, 10));
        assert!(genome_regions.intersect("chr1", 10, 11));
        assert!(genome_regions.intersect("chr1", 29, 30));
        assert!(!genome_regions.intersect("chr1", 30, 31));

        // A non-existent chromosome never intersects
        assert!(!genome_regions.intersect("chr2", 0, 100));
    }
}
