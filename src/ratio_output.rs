use std::io::{BufWriter, Write};

use camino::Utf8Path;
use flate2::{Compression, write::GzEncoder};
use log::info;
use unwrap::unwrap;

use crate::chrom_list::ChromList;
use crate::collate::CollatedRatio;

pub const RATIO_FILENAME: &str = "ratio.tsv.gz";

const RATIO_HEADER: [&str; 9] = [
    "chromosome",
    "position",
    "referenceReadDepth",
    "tumorReadDepth",
    "referenceGCRatio",
    "tumorGCRatio",
    "referenceGCDiploidRatio",
    "referenceGCContent",
    "tumorGCContent",
];

const ABSENT_VALUE: f64 = -1.0;

/// Write one joint record, with -1 for every field of an absent side or excluded ratio
fn write_collated_ratio<W: Write>(
    f: &mut W,
    chrom_list: &ChromList,
    record: &CollatedRatio,
) -> std::io::Result<()> {
    let (ref_depth, ref_ratio, ref_diploid_ratio, ref_gc) = match &record.reference {
        Some(x) => (
            x.depth,
            x.ratio.output_value(),
            x.diploid_ratio.output_value(),
            x.gc_fraction,
        ),
        None => (ABSENT_VALUE, ABSENT_VALUE, ABSENT_VALUE, ABSENT_VALUE),
    };
    let (tumor_depth, tumor_ratio, tumor_gc) = match &record.tumor {
        Some(x) => (x.depth, x.ratio.output_value(), x.gc_fraction),
        None => (ABSENT_VALUE, ABSENT_VALUE, ABSENT_VALUE),
    };
    writeln!(
        f,
        "{}\t{}\t{:.4}\t{:.4}\t{:.4}\t{:.4}\t{:.4}\t{:.4}\t{:.4}",
        chrom_list.data[record.chrom_index].label,
        record.position,
        ref_depth,
        tumor_depth,
        ref_ratio,
        tumor_ratio,
        ref_diploid_ratio,
        ref_gc,
        tumor_gc,
    )
}

fn write_ratio_records<W: Write>(
    f: &mut W,
    chrom_list: &ChromList,
    records: &[CollatedRatio],
) -> std::io::Result<()> {
    writeln!(f, "{}", RATIO_HEADER.join("\t"))?;
    for record in records.iter() {
        write_collated_ratio(f, chrom_list, record)?;
    }
    Ok(())
}

/// Write the joint ratio table to the gzipped tsv file in the output directory
///
pub fn write_ratio_file(output_dir: &Utf8Path, chrom_list: &ChromList, records: &[CollatedRatio]) {
    let filename = output_dir.join(RATIO_FILENAME);

    info!("Writing ratio table to file: '{filename}'");

    let f = unwrap!(
        std::fs::File::create(&filename),
        "Unable to create ratio table file: '{}'",
        filename
    );
    let mut f = BufWriter::new(GzEncoder::new(f, Compression::default()));

    unwrap!(
        write_ratio_records(&mut f, chrom_list, records),
        "Failed to write ratio table file: '{}'",
        filename
    );
    let encoder = unwrap!(
        f.into_inner().map_err(|e| e.into_error()),
        "Failed to flush ratio table file: '{}'",
        filename
    );
    unwrap!(
        encoder.finish(),
        "Failed to finish ratio table file: '{}'",
        filename
    );
}
