//! Readers for the per-sample window depth table and the shared GC profile
//!

use std::collections::HashMap;

use camino::Utf8Path;
use log::info;
use simple_error::{SimpleResult, bail};
use thousands::Separable;

use crate::chrom_list::{ChromClassifier, ChromList};
use crate::text_reader::{for_each_data_line, parse_field};
use crate::window_status::{GcProfile, GenomeGcProfile, RawDepth};

/// Raw window depths for one sample, grouped by chromosome in first-seen file order
///
#[derive(Default)]
pub struct SampleRawDepths {
    pub chroms: Vec<(String, Vec<RawDepth>)>,
}

impl SampleRawDepths {
    fn add(&mut self, chrom_index: &mut HashMap<String, usize>, chrom: &str, raw_depth: RawDepth) {
        let index = match chrom_index.get(chrom) {
            Some(&x) => x,
            None => {
                let x = self.chroms.len();
                chrom_index.insert(chrom.to_string(), x);
                self.chroms.push((chrom.to_string(), Vec::new()));
                x
            }
        };
        self.chroms[index].1.push(raw_depth);
    }

    pub fn window_count(&self) -> usize {
        self.chroms.iter().map(|(_, x)| x.len()).sum()
    }

    /// Sort each chromosome by position and reject duplicate windows
    fn sort_windows(&mut self) -> SimpleResult<()> {
        for (chrom, raw_depths) in self.chroms.iter_mut() {
            raw_depths.sort_by_key(|x| x.position);
            for pair in raw_depths.windows(2) {
                if pair[0].position == pair[1].position {
                    bail!(
                        "Duplicate depth window at {}:{}",
                        chrom,
                        pair[0].position
                    );
                }
            }
        }
        Ok(())
    }

    /// Re-index raw depths by the chromosome index of `chrom_list`
    ///
    pub fn index_by_chrom(self, chrom_list: &ChromList) -> SimpleResult<Vec<Vec<RawDepth>>> {
        let mut indexed = vec![Vec::new(); chrom_list.len()];
        for (chrom, raw_depths) in self.chroms {
            let chrom_index = match chrom_list.label_to_index.get(&chrom) {
                Some(&x) => x,
                None => {
                    bail!("Depth chromosome '{}' is missing from the chromosome list", chrom);
                }
            };
            indexed[chrom_index] = raw_depths;
        }
        Ok(indexed)
    }
}

/// Read a window depth table
///
/// Each row is (chromosome, position, depth), where position is the window start. Windows are
/// sorted by position within each chromosome.
///
pub fn read_depth_file(filename: &Utf8Path, sample_label: &str) -> SimpleResult<SampleRawDepths> {
    let label = format!("{sample_label} depth");
    info!("Reading {label} from file: '{filename}'");

    let mut raw_depths = SampleRawDepths::default();
    let mut chrom_index = HashMap::new();
    let mut invalid_depth_line = None;
    for_each_data_line(filename, &label, "chromosome", |line_number, words| {
        if invalid_depth_line.is_some() {
            return;
        }
        let position = parse_field::<u64>(words, 1, "position", filename, line_number);
        let depth = parse_field::<f64>(words, 2, "depth", filename, line_number);
        if !(depth.is_finite() && depth >= 0.0) {
            invalid_depth_line = Some((line_number, depth));
            return;
        }
        raw_depths.add(&mut chrom_index, words[0], RawDepth { position, depth });
    });
    if let Some((line_number, depth)) = invalid_depth_line {
        bail!(
            "Invalid depth value '{}' on line {} of file: '{}'",
            depth,
            line_number,
            filename
        );
    }
    raw_depths.sort_windows()?;

    info!(
        "Read {} {label} windows",
        raw_depths.window_count().separate_with_commas()
    );
    Ok(raw_depths)
}

/// Read the GC profile table
///
/// Each row is (chromosome, position, gc_fraction, mappability).
///
pub fn read_gc_profile_file(filename: &Utf8Path) -> GenomeGcProfile {
    let label = "GC profile";
    info!("Reading {label} from file: '{filename}'");

    let mut gc_profile = GenomeGcProfile::default();
    let mut window_count = 0usize;
    for_each_data_line(filename, label, "chromosome", |line_number, words| {
        let position = parse_field::<u64>(words, 1, "position", filename, line_number);
        let gc_fraction = parse_field::<f64>(words, 2, "gc_fraction", filename, line_number);
        let mappability = parse_field::<f64>(words, 3, "mappability", filename, line_number);
        gc_profile.add(
            words[0],
            position,
            GcProfile {
                gc_fraction,
                mappability,
            },
        );
        window_count += 1;
    });

    info!(
        "Read {} {label} windows",
        window_count.separate_with_commas()
    );
    gc_profile
}

/// Build the chromosome list from the union of all sample chromosomes, in first-seen order
///
pub fn get_chrom_list(classifier: &ChromClassifier, samples: &[&SampleRawDepths]) -> ChromList {
    let mut chrom_list = ChromList::default();
    for sample in samples.iter() {
        for (chrom, _) in sample.chroms.iter() {
            chrom_list.add_chrom(chrom, classifier);
        }
    }
    chrom_list
}
