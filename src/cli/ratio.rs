use std::collections::HashMap;

use camino::{Utf8Path, Utf8PathBuf};
use clap::Args;
use const_format::concatcp;
use log::error;
use serde::{Deserialize, Serialize};
use simple_error::{SimpleResult, bail};
use unwrap::unwrap;

use super::utils::{check_optional_filename, check_required_filename};
use crate::chrom_list::ChromList;
use crate::depth_reading::GC_BUCKET_COUNT;

pub const SETTINGS_FILENAME: &str = "ratio.settings.json";

#[derive(Args, Deserialize, Serialize)]
pub struct RatioSettings {
    /// Directory for all output (must not already exist)
    #[arg(long, value_name = "DIR", default_value = concatcp!(env!("CARGO_PKG_NAME"), "_output"))]
    pub output_dir: Utf8PathBuf,

    /// Window depth table for the tumor sample
    ///
    /// Tab-delimited rows of (chromosome, position, depth), plain text or gzip compressed.
    ///
    #[arg(long = "tumor-depth", value_name = "FILE")]
    pub tumor_depth_filename: Option<Utf8PathBuf>,

    /// Window depth table for the reference sample, in the same format as the tumor depth table
    #[arg(long = "reference-depth", value_name = "FILE")]
    pub reference_depth_filename: Option<Utf8PathBuf>,

    /// GC profile of the genome windows
    ///
    /// Tab-delimited rows of (chromosome, position, gc_fraction, mappability). Depth windows with
    /// no GC profile record are treated as unmappable.
    ///
    #[arg(long = "gc-profile", value_name = "FILE")]
    pub gc_profile_filename: Utf8PathBuf,

    /// Regions of the genome to exclude from ratio analysis, in BED format
    #[arg(long = "excluded-regions", value_name = "FILE")]
    pub excluded_regions_filename: Option<Utf8PathBuf>,

    /// Regions of the genome not expected to be diploid in the reference sample, in BED format
    #[arg(long = "non-diploid-regions", value_name = "FILE")]
    pub non_diploid_regions_filename: Option<Utf8PathBuf>,

    /// Relative enrichment of each 1kb target slot for a targeted panel run
    ///
    /// Tab-delimited rows of (chromosome, position, relative_enrichment). Providing this file
    /// switches normalisation from whole-genome to targeted panel mode.
    ///
    #[arg(long = "target-regions", value_name = "FILE")]
    pub target_regions_filename: Option<Utf8PathBuf>,

    /// Regex used to select the autosomes, which are used for all genome-wide statistics
    #[arg(long, value_name = "REGEX", default_value = r"^(chr)?\d{1,2}$")]
    pub autosome_regex: String,

    /// Regex used to select haploid chromosomes, which are not diploid normalised
    #[arg(long, value_name = "REGEX", default_value = r"^(chr)?Y$")]
    pub haploid_chrom_regex: String,

    /// Expected diploid normalisation ratio for one chromosome, as LABEL=VALUE
    ///
    /// This option may be repeated. Chromosomes without an entry have an expected ratio of 1.
    ///
    #[arg(long = "expected-ratio", value_name = "LABEL=VALUE")]
    pub expected_ratio_list: Vec<String>,

    /// Expected ratio values parsed from expected_ratio_list
    #[arg(skip)]
    pub expected_ratios: HashMap<String, f64>,

    /// Windows with GC profile mappability below this value are masked
    #[arg(long, default_value_t = 0.85)]
    pub min_mappability: f64,

    /// GC buckets at or below this value are excluded from GC normalisation
    #[arg(long, default_value_t = 20)]
    pub min_gc_bucket: usize,

    /// GC buckets above this value are excluded from GC normalisation
    #[arg(long, default_value_t = 60)]
    pub max_gc_bucket: usize,

    /// Maximum distance in windows from the current window for a neighbor to be included in the
    /// diploid normalisation median
    #[arg(long, default_value_t = 500)]
    pub diploid_max_window_distance: usize,

    /// Minimum number of neighboring windows required to diploid normalise a window
    #[arg(long, default_value_t = 125)]
    pub diploid_min_window_coverage: usize,

    /// Size of the input depth windows
    #[arg(hide = true, long, default_value_t = 1000)]
    pub window_size: u32,

    /// Disable consolidation of low depth whole genome windows
    #[arg(long)]
    pub no_consolidation: bool,
}

impl RatioSettings {
    pub fn is_targeted_panel(&self) -> bool {
        self.target_regions_filename.is_some()
    }
}

/// Parse one LABEL=VALUE expected ratio entry
fn parse_expected_ratio(entry: &str) -> SimpleResult<(String, f64)> {
    let (label, value) = match entry.split_once('=') {
        Some(x) => x,
        None => {
            bail!("--expected-ratio value '{}' is not in LABEL=VALUE format", entry);
        }
    };
    if label.is_empty() {
        bail!("--expected-ratio value '{}' has an empty chromosome label", entry);
    }
    let value = match value.parse::<f64>() {
        Ok(x) if x.is_finite() && x >= 0.0 => x,
        _ => {
            bail!(
                "--expected-ratio value '{}' does not have a non-negative ratio",
                entry
            );
        }
    };
    Ok((label.to_string(), value))
}

/// Validate settings and update to parameters that can't be processed automatically by clap.
///
/// Assumes that the logger is not setup
///
pub fn validate_and_fix_ratio_settings(mut settings: RatioSettings) -> SimpleResult<RatioSettings> {
    if settings.tumor_depth_filename.is_none() && settings.reference_depth_filename.is_none() {
        bail!("Must specify at least one of --tumor-depth or --reference-depth");
    }
    check_optional_filename(settings.tumor_depth_filename.as_deref(), "tumor depth")?;
    check_optional_filename(
        settings.reference_depth_filename.as_deref(),
        "reference depth",
    )?;
    check_required_filename(&settings.gc_profile_filename, "GC profile")?;
    check_optional_filename(
        settings.excluded_regions_filename.as_deref(),
        "excluded regions",
    )?;
    check_optional_filename(
        settings.non_diploid_regions_filename.as_deref(),
        "non-diploid regions",
    )?;
    check_optional_filename(
        settings.target_regions_filename.as_deref(),
        "target regions",
    )?;

    if let Err(err) = regex::Regex::new(&settings.autosome_regex) {
        bail!("--autosome-regex is not a valid regex: {}", err);
    }
    if let Err(err) = regex::Regex::new(&settings.haploid_chrom_regex) {
        bail!("--haploid-chrom-regex is not a valid regex: {}", err);
    }

    if !(0.0..=1.0).contains(&settings.min_mappability) {
        bail!("--min-mappability argument must be in [0,1]");
    }
    if settings.min_gc_bucket >= settings.max_gc_bucket {
        bail!("--min-gc-bucket argument must be less than --max-gc-bucket");
    }
    if settings.max_gc_bucket >= GC_BUCKET_COUNT {
        bail!(
            "--max-gc-bucket argument must not exceed {}",
            GC_BUCKET_COUNT - 1
        );
    }
    if settings.window_size == 0 {
        bail!("--window-size argument must be greater than 0");
    }
    if settings.diploid_min_window_coverage == 0 {
        bail!("--diploid-min-window-coverage argument must be greater than 0");
    }

    settings.expected_ratios = HashMap::new();
    for entry in settings.expected_ratio_list.iter() {
        let (label, value) = parse_expected_ratio(entry)?;
        if settings.expected_ratios.insert(label, value).is_some() {
            bail!("--expected-ratio value '{}' repeats a chromosome", entry);
        }
    }

    Ok(settings)
}

/// Input data validation that requires the chromosome list from the depth inputs
///
/// Assumes that the logger is setup
///
pub fn validate_chrom_list(settings: &RatioSettings, chrom_list: &ChromList) {
    if chrom_list.is_empty() {
        error!("No depth windows found in any input depth file");
        std::process::exit(exitcode::DATAERR);
    }

    let is_any_autosome = (0..chrom_list.len()).any(|x| chrom_list.is_autosome(x));
    if !is_any_autosome {
        error!(
            "Autosome regex '{}' does not match any chromosome names in the input depth files, use '--autosome-regex \".\"' to match all available chromosomes.",
            settings.autosome_regex
        );
        std::process::exit(exitcode::DATAERR);
    }
}

/// Write ratio settings out in json format
pub fn write_ratio_settings(output_dir: &Utf8Path, settings: &RatioSettings) {
    use log::info;

    let filename = output_dir.join(SETTINGS_FILENAME);

    info!("Writing ratio settings to file: '{filename}'");

    let f = unwrap!(
        std::fs::File::create(&filename),
        "Unable to create ratio settings json file: '{filename}'"
    );

    serde_json::to_writer_pretty(&f, &settings).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::text_reader::test_utils::write_temp_file;

    fn get_test_settings(gc_profile_filename: &Utf8Path) -> RatioSettings {
        RatioSettings {
            output_dir: Utf8PathBuf::from("covratio_output"),
            tumor_depth_filename: Some(gc_profile_filename.to_path_buf()),
            reference_depth_filename: None,
            gc_profile_filename: gc_profile_filename.to_path_buf(),
            excluded_regions_filename: None,
            non_diploid_regions_filename: None,
            target_regions_filename: None,
            autosome_regex: r"^(chr)?\d{1,2}$".to_string(),
            haploid_chrom_regex: r"^(chr)?Y$".to_string(),
            expected_ratio_list: vec!["chrX=0.5".to_string()],
            expected_ratios: HashMap::new(),
            min_mappability: 0.85,
            min_gc_bucket: 20,
            max_gc_bucket: 60,
            diploid_max_window_distance: 500,
            diploid_min_window_coverage: 125,
            window_size: 1000,
            no_consolidation: false,
        }
    }

    #[test]
    fn test_parse_expected_ratio() {
        assert_eq!(
            parse_expected_ratio("chrX=0.5").unwrap(),
            ("chrX".to_string(), 0.5)
        );
        assert!(parse_expected_ratio("chrX").is_err());
        assert!(parse_expected_ratio("=0.5").is_err());
        assert!(parse_expected_ratio("chrX=-1").is_err());
        assert!(parse_expected_ratio("chrX=abc").is_err());
    }

    #[test]
    fn test_validate_ratio_settings() {
        let filename = write_temp_file("settings_input.tsv", b"1\t0\t10\n");

        let settings = validate_and_fix_ratio_settings(get_test_settings(&filename)).unwrap();
        assert_eq!(settings.expected_ratios.get("chrX"), Some(&0.5));
        assert!(!settings.is_targeted_panel());

        let mut settings = get_test_settings(&filename);
        settings.tumor_depth_filename = None;
        assert!(validate_and_fix_ratio_settings(settings).is_err());

        let mut settings = get_test_settings(&filename);
        settings.min_gc_bucket = 60;
        assert!(validate_and_fix_ratio_settings(settings).is_err());

        let mut settings = get_test_settings(&filename);
        settings.max_gc_bucket = 101;
        assert!(validate_and_fix_ratio_settings(settings).is_err());

        let mut settings = get_test_settings(&filename);
        settings.expected_ratio_list.push("chrX=1".to_string());
        assert!(validate_and_fix_ratio_settings(settings).is_err());

        let mut settings = get_test_settings(&filename);
        settings.autosome_regex = "(".to_string();
        assert!(validate_and_fix_ratio_settings(settings).is_err());

        std::fs::remove_file(&filename).unwrap();
    }
}
