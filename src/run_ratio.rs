//! Top-level ratio run: input loading, per-sample normalisation, consolidation, collation and
//! output
//!

use std::time::Instant;

use log::info;
use simple_error::{SimpleResult, map_err_with};

use crate::chrom_list::{ChromClassifier, ChromList};
use crate::cli;
use crate::collate::{CollatedRatio, collate_ratios};
use crate::consolidation::ResultsConsolidator;
use crate::depth_input::{SampleRawDepths, get_chrom_list, read_depth_file, read_gc_profile_file};
use crate::gc_bias::write_gc_baseline_file;
use crate::genome_regions::GenomeRegions;
use crate::normalisation::{DiploidNormaliserSettings, normalise_diploid_ratios};
use crate::ratio_output::write_ratio_file;
use crate::run_stats::{
    ChromDiploidStats, RatioRunStats, RunMode, SampleRunStats, write_ratio_run_stats,
};
use crate::sample_ratios::{SampleKind, SampleRatioSettings, SampleRatios, get_sample_ratios};
use crate::statistics::Statistics;
use crate::target_region::{
    TargetRegionEnrichment, TargetedPanelEnrichment, WholeGenomeEnrichment,
    read_target_enrichment_file,
};
use crate::window_status::{RawDepth, WindowMask, WindowMaskStats, get_unmasked_depth_readings};

/// Normalised ratios and stats for one sample
pub struct SampleResult {
    pub ratios: SampleRatios,
    pub window_mask_stats: WindowMaskStats,
    pub sample_time_secs: f64,
}

pub struct RatioResults {
    pub tumor: Option<SampleResult>,
    pub reference: Option<SampleResult>,
    pub consolidation_factor: Option<usize>,

    /// Per-chromosome diploid normalisation statistics, present when a reference sample is given
    pub diploid_stats: Option<Vec<Statistics>>,

    pub collated: Vec<CollatedRatio>,
}

/// Mask and normalise one sample, if the sample is present
///
fn get_sample_result(
    kind: SampleKind,
    raw_depths: Option<Vec<Vec<RawDepth>>>,
    chrom_list: &ChromList,
    window_mask: &WindowMask,
    enrichment: &dyn TargetRegionEnrichment,
    settings: &SampleRatioSettings,
) -> SimpleResult<Option<SampleResult>> {
    let raw_depths = match raw_depths {
        Some(x) => x,
        None => return Ok(None),
    };

    let start = Instant::now();
    let (readings, window_mask_stats) =
        get_unmasked_depth_readings(chrom_list, &raw_depths, window_mask);
    info!(
        "Masked {} of {} {kind} sample windows",
        window_mask_stats.masked_window_count, window_mask_stats.input_window_count
    );
    let ratios = get_sample_ratios(kind, chrom_list, &readings, enrichment, settings)?;
    Ok(Some(SampleResult {
        ratios,
        window_mask_stats,
        sample_time_secs: start.elapsed().as_secs_f64(),
    }))
}

fn consolidate_sample(consolidator: &dyn ResultsConsolidator, sample: Option<&mut SampleResult>) {
    if let Some(sample) = sample {
        let chroms = std::mem::take(&mut sample.ratios.chroms);
        sample.ratios.chroms = consolidator.consolidate(chroms);
    }
}

/// Compute the collated ratio results from the raw depths of each sample
///
/// Tumor and reference samples are normalised in parallel on the current thread pool. One
/// consolidator is selected from the reference sample median depth (or the tumor's if there is no
/// reference) and applied to both samples, before diploid normalisation of the reference.
///
pub fn get_ratio_results(
    chrom_list: &ChromList,
    tumor_raw_depths: Option<Vec<Vec<RawDepth>>>,
    reference_raw_depths: Option<Vec<Vec<RawDepth>>>,
    window_mask: &WindowMask,
    enrichment: &dyn TargetRegionEnrichment,
    sample_settings: &SampleRatioSettings,
    diploid_settings: &DiploidNormaliserSettings,
) -> SimpleResult<RatioResults> {
    let (tumor, reference) = rayon::join(
        || {
            get_sample_result(
                SampleKind::Tumor,
                tumor_raw_depths,
                chrom_list,
                window_mask,
                enrichment,
                sample_settings,
            )
        },
        || {
            get_sample_result(
                SampleKind::Reference,
                reference_raw_depths,
                chrom_list,
                window_mask,
                enrichment,
                sample_settings,
            )
        },
    );
    let mut tumor = tumor?;
    let mut reference = reference?;

    let median_read_depth = match reference.as_ref().or(tumor.as_ref()) {
        Some(x) => x.ratios.stats.read_depth.median,
        None => 0.0,
    };
    let consolidator = enrichment.results_consolidator(median_read_depth);
    consolidate_sample(consolidator.as_ref(), tumor.as_mut());
    consolidate_sample(consolidator.as_ref(), reference.as_mut());

    let diploid_stats = match reference.as_mut() {
        Some(reference) => Some(map_err_with!(
            normalise_diploid_ratios(chrom_list, diploid_settings, &mut reference.ratios.chroms),
            "Reference sample diploid normalisation failed"
        )?),
        None => None,
    };

    let empty = Vec::new();
    let collated = collate_ratios(
        chrom_list,
        tumor.as_ref().map_or(&empty, |x| &x.ratios.chroms),
        reference.as_ref().map_or(&empty, |x| &x.ratios.chroms),
    )?;

    Ok(RatioResults {
        tumor,
        reference,
        consolidation_factor: consolidator.consolidation_factor(),
        diploid_stats,
        collated,
    })
}

fn get_sample_run_stats(
    chrom_list: &ChromList,
    sample: &SampleResult,
    diploid_stats: Option<&Vec<Statistics>>,
) -> SampleRunStats {
    let diploid_stats = diploid_stats.map(|stats| {
        stats
            .iter()
            .enumerate()
            .map(|(chrom_index, statistics)| ChromDiploidStats {
                chrom_label: chrom_list.data[chrom_index].label.clone(),
                statistics: statistics.clone(),
            })
            .collect()
    });
    SampleRunStats {
        sample: sample.ratios.kind,
        window_mask_stats: sample.window_mask_stats.clone(),
        ratio_stats: sample.ratios.stats.clone(),
        consolidated_window_count: sample.ratios.chroms.iter().map(|x| x.len()).sum(),
        diploid_stats,
        sample_time_secs: sample.sample_time_secs,
    }
}

fn read_optional_depth_file(
    filename: Option<&camino::Utf8PathBuf>,
    kind: SampleKind,
) -> SimpleResult<Option<SampleRawDepths>> {
    filename
        .map(|x| read_depth_file(x, &kind.to_string()))
        .transpose()
}

fn read_optional_bed_file(filename: Option<&camino::Utf8PathBuf>, label: &str) -> GenomeRegions {
    match filename {
        Some(x) => GenomeRegions::from_bed(x, label),
        None => GenomeRegions::default(),
    }
}

fn get_enrichment(settings: &cli::RatioSettings) -> Box<dyn TargetRegionEnrichment> {
    match &settings.target_regions_filename {
        Some(filename) => Box::new(TargetedPanelEnrichment::new(
            read_target_enrichment_file(filename),
            settings.min_gc_bucket,
            settings.max_gc_bucket,
        )),
        None => Box::new(WholeGenomeEnrichment {
            window_size: settings.window_size,
            enable_consolidation: !settings.no_consolidation,
        }),
    }
}

pub fn run_ratio(
    shared_settings: &cli::SharedSettings,
    settings: &cli::RatioSettings,
) -> SimpleResult<()> {
    cli::write_ratio_settings(&settings.output_dir, settings);

    let tumor_raw_depths =
        read_optional_depth_file(settings.tumor_depth_filename.as_ref(), SampleKind::Tumor)?;
    let reference_raw_depths = read_optional_depth_file(
        settings.reference_depth_filename.as_ref(),
        SampleKind::Reference,
    )?;

    let classifier = ChromClassifier::new(
        &settings.autosome_regex,
        &settings.haploid_chrom_regex,
        settings.expected_ratios.clone(),
    )?;
    let chrom_list = {
        let samples = tumor_raw_depths
            .iter()
            .chain(reference_raw_depths.iter())
            .collect::<Vec<_>>();
        get_chrom_list(&classifier, &samples)
    };
    cli::validate_chrom_list(settings, &chrom_list);

    let tumor_raw_depths = tumor_raw_depths
        .map(|x| x.index_by_chrom(&chrom_list))
        .transpose()?;
    let reference_raw_depths = reference_raw_depths
        .map(|x| x.index_by_chrom(&chrom_list))
        .transpose()?;

    let gc_profile = read_gc_profile_file(&settings.gc_profile_filename);
    let excluded_regions =
        read_optional_bed_file(settings.excluded_regions_filename.as_ref(), "excluded");
    let non_diploid_regions =
        read_optional_bed_file(settings.non_diploid_regions_filename.as_ref(), "non-diploid");
    let window_mask = WindowMask {
        gc_profile: &gc_profile,
        excluded_regions: &excluded_regions,
        non_diploid_regions: &non_diploid_regions,
        min_mappability: settings.min_mappability,
        window_size: settings.window_size,
    };

    let run_mode = if settings.is_targeted_panel() {
        RunMode::TargetedPanel
    } else {
        RunMode::WholeGenome
    };
    info!("Starting {run_mode} ratio normalisation");
    let enrichment = get_enrichment(settings);

    let sample_settings = SampleRatioSettings {
        min_allowed_gc_bucket: settings.min_gc_bucket,
        max_allowed_gc_bucket: settings.max_gc_bucket,
    };
    let diploid_settings = DiploidNormaliserSettings {
        max_window_distance: settings.diploid_max_window_distance,
        min_window_coverage: settings.diploid_min_window_coverage,
    };

    let worker_pool = rayon::ThreadPoolBuilder::new()
        .num_threads(shared_settings.thread_count)
        .build()
        .unwrap();

    let results = worker_pool.install(|| {
        get_ratio_results(
            &chrom_list,
            tumor_raw_depths,
            reference_raw_depths,
            &window_mask,
            enrichment.as_ref(),
            &sample_settings,
            &diploid_settings,
        )
    })?;

    for sample in results.tumor.iter().chain(results.reference.iter()) {
        write_gc_baseline_file(
            &settings.output_dir,
            &sample.ratios.kind.to_string(),
            &sample.ratios.gc_baseline,
        );
    }
    write_ratio_file(&settings.output_dir, &chrom_list, &results.collated);

    let mut samples = Vec::new();
    if let Some(tumor) = &results.tumor {
        samples.push(get_sample_run_stats(&chrom_list, tumor, None));
    }
    if let Some(reference) = &results.reference {
        samples.push(get_sample_run_stats(
            &chrom_list,
            reference,
            results.diploid_stats.as_ref(),
        ));
    }
    let run_stats = RatioRunStats {
        run_mode,
        consolidation_factor: results.consolidation_factor,
        samples,
        collated_record_count: results.collated.len(),
    };
    write_ratio_run_stats(&settings.output_dir, &run_stats);

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chrom_list::test_utils::chrom_list_from_labels;
    use crate::read_ratio::RatioState;
    use crate::window_status::{GcProfile, GenomeGcProfile};

    const WINDOW_COUNT: u64 = 3;

    fn get_gc_profile() -> GenomeGcProfile {
        let mut gc_profile = GenomeGcProfile::default();
        for i in 0..WINDOW_COUNT {
            gc_profile.add(
                "1",
                i * 1000,
                GcProfile {
                    gc_fraction: 0.40,
                    mappability: 1.0,
                },
            );
        }
        gc_profile
    }

    fn get_raw_depths(depth: f64) -> Vec<Vec<RawDepth>> {
        vec![
            (0..WINDOW_COUNT)
                .map(|i| RawDepth {
                    position: i * 1000,
                    depth,
                })
                .collect(),
        ]
    }

    fn get_test_results(
        tumor_raw_depths: Option<Vec<Vec<RawDepth>>>,
        reference_raw_depths: Option<Vec<Vec<RawDepth>>>,
    ) -> SimpleResult<RatioResults> {
        let chrom_list = chrom_list_from_labels(&["1"]);
        let gc_profile = get_gc_profile();
        let excluded_regions = GenomeRegions::default();
        let non_diploid_regions = GenomeRegions::default();
        let window_mask = WindowMask {
            gc_profile: &gc_profile,
            excluded_regions: &excluded_regions,
            non_diploid_regions: &non_diploid_regions,
            min_mappability: 0.85,
            window_size: 1000,
        };
        let enrichment = WholeGenomeEnrichment {
            window_size: 1000,
            enable_consolidation: true,
        };
        let sample_settings = SampleRatioSettings {
            min_allowed_gc_bucket: 20,
            max_allowed_gc_bucket: 60,
        };
        let diploid_settings = DiploidNormaliserSettings {
            max_window_distance: 500,
            min_window_coverage: 1,
        };
        get_ratio_results(
            &chrom_list,
            tumor_raw_depths,
            reference_raw_depths,
            &window_mask,
            &enrichment,
            &sample_settings,
            &diploid_settings,
        )
    }

    #[test]
    fn test_tumor_reference_run() {
        let results =
            get_test_results(Some(get_raw_depths(20.0)), Some(get_raw_depths(10.0))).unwrap();
        assert_eq!(results.consolidation_factor, None);
        assert_eq!(results.collated.len(), 3);
        for record in results.collated.iter() {
            let reference = record.reference.as_ref().unwrap();
            let tumor = record.tumor.as_ref().unwrap();
            assert!(reference.ratio.is_positive());
            assert!(reference.diploid_ratio.is_positive());
            assert!(tumor.ratio.is_positive());
        }
        let diploid_stats = results.diploid_stats.unwrap();
        assert_eq!(diploid_stats.len(), 1);
        assert_eq!(diploid_stats[0].count, 3);
    }

    #[test]
    fn test_reference_only_run() {
        let results = get_test_results(None, Some(get_raw_depths(10.0))).unwrap();
        assert!(results.tumor.is_none());
        assert_eq!(results.collated.len(), 3);
        for record in results.collated.iter() {
            assert!(record.tumor.is_none());
            assert_eq!(
                record.reference.as_ref().unwrap().diploid_ratio,
                RatioState::Included(1.0)
            );
        }
    }

    #[test]
    fn test_low_depth_consolidation() {
        let results =
            get_test_results(Some(get_raw_depths(1.0)), Some(get_raw_depths(1.0))).unwrap();
        assert_eq!(results.consolidation_factor, Some(8));
        assert_eq!(results.collated.len(), 1);
        assert_eq!(results.collated[0].position, 0);
    }

    #[test]
    fn test_no_samples() {
        assert!(get_test_results(None, None).is_err());
    }
}
