//! Merge of tumor and reference ratio series into joint per-position records
//!

use itertools::Itertools;
use log::info;
use simple_error::{SimpleResult, bail};
use thousands::Separable;

use crate::chrom_list::ChromList;
use crate::read_ratio::{ChromReadRatios, RatioState, ReadRatio};

#[derive(Clone, Debug, PartialEq)]
pub struct ReferenceRatioFields {
    pub depth: f64,
    pub ratio: RatioState,
    pub gc_fraction: f64,
    pub diploid_ratio: RatioState,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TumorRatioFields {
    pub depth: f64,
    pub ratio: RatioState,
    pub gc_fraction: f64,
}

/// Joint output record for one window position
///
/// A side is None when its sample has no series for the chromosome.
///
#[derive(Clone, Debug, PartialEq)]
pub struct CollatedRatio {
    pub chrom_index: usize,
    pub position: u64,
    pub reference: Option<ReferenceRatioFields>,
    pub tumor: Option<TumorRatioFields>,
}

fn get_reference_fields(
    chrom_label: &str,
    ratio: &ReadRatio,
) -> SimpleResult<ReferenceRatioFields> {
    let diploid_ratio = match ratio.diploid_ratio {
        Some(x) => x,
        None => {
            bail!(
                "Reference ratio at {}:{} has not been diploid normalised",
                chrom_label,
                ratio.position
            );
        }
    };
    Ok(ReferenceRatioFields {
        depth: ratio.depth,
        ratio: ratio.ratio,
        gc_fraction: ratio.gc_fraction,
        diploid_ratio,
    })
}

fn get_tumor_fields(ratio: &ReadRatio) -> TumorRatioFields {
    TumorRatioFields {
        depth: ratio.depth,
        ratio: ratio.ratio,
        gc_fraction: ratio.gc_fraction,
    }
}

fn is_series_empty(series: &[ChromReadRatios]) -> bool {
    series.iter().all(|x| x.is_empty())
}

/// Collate one chromosome, where either side may be empty
///
fn collate_chrom(
    chrom_index: usize,
    chrom_label: &str,
    tumor: &[ReadRatio],
    reference: &[ReadRatio],
) -> SimpleResult<Vec<CollatedRatio>> {
    let mut collated = Vec::new();
    if reference.is_empty() {
        for ratio in tumor.iter() {
            collated.push(CollatedRatio {
                chrom_index,
                position: ratio.position,
                reference: None,
                tumor: Some(get_tumor_fields(ratio)),
            });
        }
    } else if tumor.is_empty() {
        for ratio in reference.iter() {
            collated.push(CollatedRatio {
                chrom_index,
                position: ratio.position,
                reference: Some(get_reference_fields(chrom_label, ratio)?),
                tumor: None,
            });
        }
    } else {
        if tumor.len() != reference.len() {
            bail!(
                "Tumor and reference ratio series have different lengths on chromosome {}: {} vs {}",
                chrom_label,
                tumor.len(),
                reference.len()
            );
        }
        for (tumor_ratio, reference_ratio) in tumor.iter().zip_eq(reference.iter()) {
            if tumor_ratio.position != reference_ratio.position {
                bail!(
                    "Tumor and reference ratio series are not position aligned on chromosome {}: {} vs {}",
                    chrom_label,
                    tumor_ratio.position,
                    reference_ratio.position
                );
            }
            collated.push(CollatedRatio {
                chrom_index,
                position: reference_ratio.position,
                reference: Some(get_reference_fields(chrom_label, reference_ratio)?),
                tumor: Some(get_tumor_fields(tumor_ratio)),
            });
        }
    }
    Ok(collated)
}

/// Merge tumor and reference series into joint records ordered by chromosome then position
///
/// Both series are indexed by chromosome index. Windows are merged by index alignment, so any
/// chromosome present in both series must have the same window count on both sides. Either
/// sample may be entirely empty to support single-sample runs, but not both.
///
pub fn collate_ratios(
    chrom_list: &ChromList,
    tumor: &[ChromReadRatios],
    reference: &[ChromReadRatios],
) -> SimpleResult<Vec<CollatedRatio>> {
    let is_tumor_empty = is_series_empty(tumor);
    let is_reference_empty = is_series_empty(reference);
    if is_tumor_empty && is_reference_empty {
        bail!("Tumor and reference ratio series are both empty");
    }

    let chrom_count = chrom_list.len();
    if tumor.len() > chrom_count || reference.len() > chrom_count {
        bail!(
            "Ratio series chromosome count exceeds the chromosome list size of {}",
            chrom_count
        );
    }

    let empty = Vec::new();
    let mut collated = Vec::new();
    for chrom_index in 0..chrom_count {
        let chrom_label = chrom_list.data[chrom_index].label.as_str();
        let tumor_chrom = tumor.get(chrom_index).unwrap_or(&empty);
        let reference_chrom = reference.get(chrom_index).unwrap_or(&empty);
        if !(is_tumor_empty || is_reference_empty)
            && (tumor_chrom.is_empty() != reference_chrom.is_empty())
        {
            bail!(
                "Chromosome {} is present in the {} ratio series only",
                chrom_label,
                if tumor_chrom.is_empty() {
                    "reference"
                } else {
                    "tumor"
                }
            );
        }
        collated.extend(collate_chrom(
            chrom_index,
            chrom_label,
            tumor_chrom,
            reference_chrom,
        )?);
    }

    info!(
        "Collated {} ratio records",
        collated.len().separate_with_commas()
    );
    Ok(collated)
}
