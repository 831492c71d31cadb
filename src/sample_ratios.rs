//! Ratio calculation for one sample
//!

use log::info;
use serde::{Deserialize, Serialize};
use simple_error::{SimpleResult, map_err_with};
use thousands::Separable;

use crate::chrom_list::ChromList;
use crate::depth_reading::SampleDepthReadings;
use crate::gc_bias::{GcBaseline, GcBucketDepths};
use crate::normalisation::normalise_ratios;
use crate::read_ratio::{ChromReadRatios, ReadRatio};
use crate::statistics::Statistics;
use crate::target_region::TargetRegionEnrichment;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize, Serialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SampleKind {
    Reference,
    Tumor,
}

#[derive(Clone, Debug)]
pub struct SampleRatioSettings {
    /// GC buckets at or below this value are excluded from GC normalisation
    pub min_allowed_gc_bucket: usize,

    /// GC buckets above this value are excluded from GC normalisation
    pub max_allowed_gc_bucket: usize,
}

#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SampleRatioStats {
    pub window_count: usize,
    pub off_target_window_count: usize,
    pub gc_excluded_window_count: usize,
    pub enrichment_excluded_window_count: usize,

    /// Raw depth statistics over autosomal windows with positive depth
    pub read_depth: Statistics,

    pub median_by_mean_factor: Option<f64>,
    pub final_normalisation_factor: Option<f64>,
}

/// Normalised ratio series for one sample
///
pub struct SampleRatios {
    pub kind: SampleKind,

    /// Ratio series indexed by chromosome index
    pub chroms: Vec<ChromReadRatios>,

    pub gc_baseline: GcBaseline,
    pub stats: SampleRatioStats,
}

/// Estimate the GC baseline from the raw depth of all autosomal windows
///
fn get_gc_baseline(
    kind: SampleKind,
    chrom_list: &ChromList,
    readings: &SampleDepthReadings,
    settings: &SampleRatioSettings,
) -> SimpleResult<GcBaseline> {
    let mut gc_depths = GcBucketDepths::new();
    for (chrom_index, chrom_readings) in readings.chroms.iter().enumerate() {
        if !chrom_list.is_autosome(chrom_index) {
            continue;
        }
        for reading in chrom_readings.iter() {
            map_err_with!(
                gc_depths.add_reading(reading.depth, reading.gc_fraction),
                "{} sample GC bias estimation failed at {}:{}",
                kind,
                chrom_list.data[chrom_index].label,
                reading.position
            )?;
        }
    }
    Ok(gc_depths.build_baseline(
        settings.min_allowed_gc_bucket,
        settings.max_allowed_gc_bucket,
    ))
}

/// Compute the normalised ratio series for one sample
///
/// Each unmasked window's ratio starts at the raw depth, and is then corrected in order by:
/// 1. GC baseline depth
/// 2. Enrichment quotient
/// 3. The median-by-mean normaliser of the run mode
/// 4. The final normaliser of the run mode
///
/// Diploid normalisation is not applied here, since it follows consolidation.
///
pub fn get_sample_ratios(
    kind: SampleKind,
    chrom_list: &ChromList,
    readings: &SampleDepthReadings,
    enrichment: &dyn TargetRegionEnrichment,
    settings: &SampleRatioSettings,
) -> SimpleResult<SampleRatios> {
    info!(
        "Computing {kind} sample ratios from {} windows",
        readings.window_count().separate_with_commas()
    );
    assert_eq!(readings.chroms.len(), chrom_list.len());
    if readings.is_empty() {
        info!("No unmasked windows found in {kind} sample");
    }

    let gc_baseline = get_gc_baseline(kind, chrom_list, readings, settings)?;

    let mut stats = SampleRatioStats::default();
    let mut autosome_depths = Vec::new();
    let mut chroms = Vec::with_capacity(chrom_list.len());
    for (chrom_index, chrom_readings) in readings.chroms.iter().enumerate() {
        let chrom_label = chrom_list.data[chrom_index].label.as_str();
        let is_autosome = chrom_list.is_autosome(chrom_index);
        let mut chrom_ratios = Vec::with_capacity(chrom_readings.len());
        for reading in chrom_readings.iter() {
            let gc_bucket = map_err_with!(
                reading.gc_bucket(),
                "{} sample GC correction failed at {}:{}",
                kind,
                chrom_label,
                reading.position
            )?;

            let mut ratio = ReadRatio::from_reading(reading);
            ratio.correct(gc_baseline.lookup(gc_bucket));
            if !ratio.is_included() {
                stats.gc_excluded_window_count += 1;
            }

            let was_included = ratio.is_included();
            ratio.correct(enrichment.enrichment_quotient(chrom_label, reading));
            if was_included && !ratio.is_included() {
                stats.enrichment_excluded_window_count += 1;
            }

            if !enrichment.on_target(chrom_label, reading.position) {
                stats.off_target_window_count += 1;
            }
            if is_autosome && ratio.is_included() && reading.depth > 0.0 {
                autosome_depths.push(reading.depth);
            }
            chrom_ratios.push(ratio);
        }
        stats.window_count += chrom_ratios.len();
        chroms.push(chrom_ratios);
    }
    stats.read_depth = Statistics::from_values(autosome_depths);

    let mut median_by_mean_normaliser = enrichment.median_by_mean_normaliser(chrom_list);
    map_err_with!(
        normalise_ratios(median_by_mean_normaliser.as_mut(), &mut chroms),
        "{} sample normalisation failed",
        kind
    )?;
    stats.median_by_mean_factor = median_by_mean_normaliser.frozen_factor();

    let mut final_normaliser = enrichment.final_normaliser(chrom_list);
    map_err_with!(
        normalise_ratios(final_normaliser.as_mut(), &mut chroms),
        "{} sample normalisation failed",
        kind
    )?;
    stats.final_normalisation_factor = final_normaliser.frozen_factor();

    if stats.read_depth.is_empty() {
        info!("No autosomal windows with positive depth found in {kind} sample");
    }
    info!(
        "Finished {kind} sample ratios. Windows excluded by GC: {} by enrichment: {}",
        stats.gc_excluded_window_count.separate_with_commas(),
        stats.enrichment_excluded_window_count.separate_with_commas()
    );

    Ok(SampleRatios {
        kind,
        chroms,
        gc_baseline,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chrom_list::test_utils::chrom_list_from_labels;
    use crate::depth_reading::DepthReading;
    use crate::read_ratio::RatioState;
    use crate::target_region::{
        TargetEnrichmentTable, TargetedPanelEnrichment, WholeGenomeEnrichment,
    };

    fn get_settings() -> SampleRatioSettings {
        SampleRatioSettings {
            min_allowed_gc_bucket: 20,
            max_allowed_gc_bucket: 60,
        }
    }

    fn get_whole_genome() -> WholeGenomeEnrichment {
        WholeGenomeEnrichment {
            window_size: 1000,
            enable_consolidation: true,
        }
    }

    fn get_readings(
        chrom_count: usize,
        windows: &[(usize, u64, f64, f64)],
    ) -> SampleDepthReadings {
        let mut readings = SampleDepthReadings::new(chrom_count);
        for &(chrom_index, position, depth, gc_fraction) in windows {
            readings.chroms[chrom_index].push(DepthReading {
                chrom_index,
                position,
                depth,
                gc_fraction,
            });
        }
        readings
    }

    /// Five chromosome 1 windows in GC bucket 40, with chromosome 2 supplying the neighboring
    /// GC buckets at the same depth
    fn get_scenario_readings(chrom1_depths: &[f64]) -> SampleDepthReadings {
        let mut windows = chrom1_depths
            .iter()
            .enumerate()
            .map(|(i, &depth)| (0, i as u64 * 1000, depth, 0.40))
            .collect::<Vec<_>>();
        windows.push((1, 0, 10.0, 0.39));
        windows.push((1, 1000, 10.0, 0.41));
        get_readings(2, &windows)
    }

    #[test]
    fn test_gc_corrected_unit_ratios() {
        let chrom_list = chrom_list_from_labels(&["1", "2"]);
        let readings = get_scenario_readings(&[10.0; 5]);
        let result = get_sample_ratios(
            SampleKind::Reference,
            &chrom_list,
            &readings,
            &get_whole_genome(),
            &get_settings(),
        )
        .unwrap();

        approx::assert_ulps_eq!(result.gc_baseline.lookup(40).unwrap(), 10.0);
        assert_eq!(result.chroms[0].len(), 5);
        for ratio in result.chroms[0].iter() {
            assert_eq!(ratio.ratio, RatioState::Included(1.0));
            assert_eq!(ratio.diploid_ratio, None);
        }
        assert_eq!(result.stats.window_count, 7);
        assert_eq!(result.stats.gc_excluded_window_count, 0);
        approx::assert_ulps_eq!(result.stats.read_depth.median, 10.0);
    }

    #[test]
    fn test_zero_depth_preserved() {
        let chrom_list = chrom_list_from_labels(&["1", "2"]);
        let readings = get_scenario_readings(&[10.0, 10.0, 0.0, 10.0, 10.0]);
        let result = get_sample_ratios(
            SampleKind::Tumor,
            &chrom_list,
            &readings,
            &get_whole_genome(),
            &get_settings(),
        )
        .unwrap();

        let ratios = result.chroms[0]
            .iter()
            .map(|x| x.ratio)
            .collect::<Vec<_>>();
        assert_eq!(
            ratios,
            vec![
                RatioState::Included(1.0),
                RatioState::Included(1.0),
                RatioState::Included(0.0),
                RatioState::Included(1.0),
                RatioState::Included(1.0),
            ]
        );
    }

    #[test]
    fn test_invalid_gc_bucket_excluded() {
        let chrom_list = chrom_list_from_labels(&["1"]);
        let readings = get_readings(1, &[(0, 0, 10.0, 0.40), (0, 1000, 10.0, 0.70)]);
        let result = get_sample_ratios(
            SampleKind::Tumor,
            &chrom_list,
            &readings,
            &get_whole_genome(),
            &get_settings(),
        )
        .unwrap();
        assert!(result.chroms[0][0].is_included());
        assert_eq!(result.chroms[0][1].ratio, RatioState::Excluded);
        assert_eq!(result.stats.gc_excluded_window_count, 1);
    }

    #[test]
    fn test_corrupt_gc_fraction() {
        let chrom_list = chrom_list_from_labels(&["1"]);
        let readings = get_readings(1, &[(0, 0, 10.0, 1.5)]);
        let result = get_sample_ratios(
            SampleKind::Tumor,
            &chrom_list,
            &readings,
            &get_whole_genome(),
            &get_settings(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_targeted_panel_ratios() {
        let chrom_list = chrom_list_from_labels(&["1"]);
        let readings = get_readings(
            1,
            &[
                (0, 0, 10.0, 0.40),
                (0, 1000, 20.0, 0.40),
                (0, 2000, 30.0, 0.40),
            ],
        );
        let mut table = TargetEnrichmentTable::new();
        let slots = table.entry("1".to_string()).or_default();
        slots.insert(0, 0.5);
        slots.insert(1, 1.0);
        let adapter = TargetedPanelEnrichment::new(table, 20, 60);

        let result = get_sample_ratios(
            SampleKind::Tumor,
            &chrom_list,
            &readings,
            &adapter,
            &get_settings(),
        )
        .unwrap();

        assert_eq!(result.stats.off_target_window_count, 1);
        assert_eq!(result.stats.enrichment_excluded_window_count, 1);
        assert_eq!(result.chroms[0][2].ratio, RatioState::Excluded);

        // Unity normalisation sets the included autosomal mean to 1
        let values = result.chroms[0]
            .iter()
            .filter_map(|x| x.ratio.value())
            .collect::<Vec<_>>();
        assert_eq!(values.len(), 2);
        approx::assert_abs_diff_eq!(values[0] + values[1], 2.0, epsilon = 1e-12);
        approx::assert_abs_diff_eq!(values[0], values[1], epsilon = 1e-12);
        assert!(result.stats.final_normalisation_factor.is_some());
        assert!(result.stats.median_by_mean_factor.is_some());
    }

    #[test]
    fn test_zero_depth_invalid_gc_bucket_excluded() {
        let chrom_list = chrom_list_from_labels(&["1"]);
        let readings = get_readings(1, &[(0, 0, 10.0, 0.40), (0, 1000, 0.0, 0.80)]);
        let result = get_sample_ratios(
            SampleKind::Tumor,
            &chrom_list,
            &readings,
            &get_whole_genome(),
            &get_settings(),
        )
        .unwrap();
        assert!(result.chroms[0][0].is_included());
        assert_eq!(result.chroms[0][1].ratio, RatioState::Excluded);
        assert_eq!(result.stats.gc_excluded_window_count, 1);
        assert_eq!(result.stats.enrichment_excluded_window_count, 0);
    }

    #[test]
    fn test_zero_depth_off_target_excluded() {
        let chrom_list = chrom_list_from_labels(&["1"]);
        let readings = get_readings(
            1,
            &[
                (0, 0, 10.0, 0.40),
                (0, 200, 10.0, 0.40),
                (0, 400, 10.0, 0.40),
                (0, 1000, 0.0, 0.40),
                (0, 5000, 0.0, 0.40),
            ],
        );
        let mut table = TargetEnrichmentTable::new();
        table.entry("1".to_string()).or_default().insert(0, 1.0);
        let adapter = TargetedPanelEnrichment::new(table, 20, 60);

        let result = get_sample_ratios(
            SampleKind::Tumor,
            &chrom_list,
            &readings,
            &adapter,
            &get_settings(),
        )
        .unwrap();

        assert_eq!(result.stats.off_target_window_count, 2);
        assert_eq!(result.stats.gc_excluded_window_count, 0);
        assert_eq!(result.stats.enrichment_excluded_window_count, 2);
        for ratio in result.chroms[0][..3].iter() {
            assert!(ratio.is_included());
        }
        assert_eq!(result.chroms[0][3].ratio, RatioState::Excluded);
        assert_eq!(result.chroms[0][4].ratio, RatioState::Excluded);
    }
}
