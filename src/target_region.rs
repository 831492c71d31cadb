//! Target region enrichment adapters for whole-genome and targeted panel runs
//!

use std::collections::HashMap;

use camino::Utf8Path;
use log::info;

use crate::chrom_list::ChromList;
use crate::consolidation::{NoOpConsolidator, ResultsConsolidator, get_sparse_consolidator};
use crate::depth_reading::DepthReading;
use crate::normalisation::{
    NoOpNormaliser, RatioNormaliser, ReadDepthStatisticsNormaliser, UnityNormaliser,
};
use crate::text_reader::{for_each_data_line, parse_field};

/// Size of the genomic slots used to index panel enrichment values
pub const TARGET_REGION_SLOT_SIZE: u64 = 1000;

/// Run mode specific enrichment correction and normaliser selection
///
pub trait TargetRegionEnrichment: Send + Sync {
    fn on_target(&self, chrom: &str, position: u64) -> bool;

    /// Enrichment quotient for the window, None if the window has no enrichment data and should be
    /// excluded
    fn enrichment_quotient(&self, chrom: &str, reading: &DepthReading) -> Option<f64>;

    fn median_by_mean_normaliser(&self, chrom_list: &ChromList) -> Box<dyn RatioNormaliser>;

    fn final_normaliser(&self, chrom_list: &ChromList) -> Box<dyn RatioNormaliser>;

    fn results_consolidator(&self, median_read_depth: f64) -> Box<dyn ResultsConsolidator>;
}

/// Whole genome run, where every window is on target with no enrichment bias
///
pub struct WholeGenomeEnrichment {
    pub window_size: u32,
    pub enable_consolidation: bool,
}

impl TargetRegionEnrichment for WholeGenomeEnrichment {
    fn on_target(&self, _chrom: &str, _position: u64) -> bool {
        true
    }

    fn enrichment_quotient(&self, _chrom: &str, _reading: &DepthReading) -> Option<f64> {
        Some(1.0)
    }

    fn median_by_mean_normaliser(&self, _chrom_list: &ChromList) -> Box<dyn RatioNormaliser> {
        Box::new(NoOpNormaliser::default())
    }

    fn final_normaliser(&self, _chrom_list: &ChromList) -> Box<dyn RatioNormaliser> {
        Box::new(NoOpNormaliser::default())
    }

    fn results_consolidator(&self, median_read_depth: f64) -> Box<dyn ResultsConsolidator> {
        if self.enable_consolidation {
            get_sparse_consolidator(median_read_depth, self.window_size)
        } else {
            Box::new(NoOpConsolidator)
        }
    }
}

/// Relative enrichment values keyed on chromosome label and slot index
pub type TargetEnrichmentTable = HashMap<String, HashMap<u64, f64>>;

/// Targeted panel run, using per-slot relative enrichment values
///
pub struct TargetedPanelEnrichment {
    enrichment: TargetEnrichmentTable,
    min_allowed_gc_bucket: usize,
    max_allowed_gc_bucket: usize,
}

impl TargetedPanelEnrichment {
    pub fn new(
        enrichment: TargetEnrichmentTable,
        min_allowed_gc_bucket: usize,
        max_allowed_gc_bucket: usize,
    ) -> Self {
        Self {
            enrichment,
            min_allowed_gc_bucket,
            max_allowed_gc_bucket,
        }
    }

    fn get_enrichment(&self, chrom: &str, position: u64) -> Option<f64> {
        let slot = position / TARGET_REGION_SLOT_SIZE;
        self.enrichment.get(chrom)?.get(&slot).copied()
    }
}

impl TargetRegionEnrichment for TargetedPanelEnrichment {
    fn on_target(&self, chrom: &str, position: u64) -> bool {
        self.get_enrichment(chrom, position).is_some()
    }

    fn enrichment_quotient(&self, chrom: &str, reading: &DepthReading) -> Option<f64> {
        self.get_enrichment(chrom, reading.position)
    }

    fn median_by_mean_normaliser(&self, chrom_list: &ChromList) -> Box<dyn RatioNormaliser> {
        Box::new(ReadDepthStatisticsNormaliser::new(
            chrom_list,
            self.min_allowed_gc_bucket,
            self.max_allowed_gc_bucket,
        ))
    }

    fn final_normaliser(&self, chrom_list: &ChromList) -> Box<dyn RatioNormaliser> {
        Box::new(UnityNormaliser::new(chrom_list))
    }

    fn results_consolidator(&self, _median_read_depth: f64) -> Box<dyn ResultsConsolidator> {
        Box::new(NoOpConsolidator)
    }
}

/// Read a target enrichment file
///
/// Each row is (chromosome, position, relative enrichment), where position may be any position in
/// the 1kb slot the enrichment applies to.
///
pub fn read_target_enrichment_file(filename: &Utf8Path) -> TargetEnrichmentTable {
    let label = "target region enrichment";
    info!("Reading {label} from file: '{filename}'");

    let mut table = TargetEnrichmentTable::new();
    let mut slot_count = 0;
    for_each_data_line(filename, label, "chromosome", |line_number, words| {
        let chrom = words[0];
        let position = parse_field::<u64>(words, 1, "position", filename, line_number);
        let enrichment = parse_field::<f64>(words, 2, "enrichment", filename, line_number);
        table
            .entry(chrom.to_string())
            .or_default()
            .insert(position / TARGET_REGION_SLOT_SIZE, enrichment);
        slot_count += 1;
    });
    info!("Read {slot_count} target region slots");
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chrom_list::test_utils::chrom_list_from_labels;

    fn get_reading(position: u64) -> DepthReading {
        DepthReading {
            chrom_index: 0,
            position,
            depth: 10.0,
            gc_fraction: 0.4,
        }
    }

    #[test]
    fn test_whole_genome() {
        let adapter = WholeGenomeEnrichment {
            window_size: 1000,
            enable_consolidation: true,
        };
        assert!(adapter.on_target("chr1", 12345));
        assert_eq!(
            adapter.enrichment_quotient("chr1", &get_reading(0)),
            Some(1.0)
        );
        assert_eq!(adapter.results_consolidator(30.0).consolidation_factor(), None);
        assert_eq!(
            adapter.results_consolidator(1.0).consolidation_factor(),
            Some(8)
        );

        let adapter = WholeGenomeEnrichment {
            window_size: 1000,
            enable_consolidation: false,
        };
        assert_eq!(adapter.results_consolidator(1.0).consolidation_factor(), None);
    }

    #[test]
    fn test_targeted_panel() {
        let mut table = TargetEnrichmentTable::new();
        table.entry("chr1".to_string()).or_default().insert(2, 0.8);
        let adapter = TargetedPanelEnrichment::new(table, 20, 60);

        assert!(adapter.on_target("chr1", 2000));
        assert!(adapter.on_target("chr1", 2999));
        assert!(!adapter.on_target("chr1", 3000));
        assert!(!adapter.on_target("chr2", 2000));

        assert_eq!(
            adapter.enrichment_quotient("chr1", &get_reading(2000)),
            Some(0.8)
        );
        assert_eq!(adapter.enrichment_quotient("chr1", &get_reading(0)), None);
        assert_eq!(adapter.results_consolidator(0.5).consolidation_factor(), None);

        let chrom_list = chrom_list_from_labels(&["chr1"]);
        assert_eq!(
            adapter.median_by_mean_normaliser(&chrom_list).label(),
            "read depth statistics"
        );
        assert_eq!(adapter.final_normaliser(&chrom_list).label(), "unity");
    }
}
