mod chrom_list;
mod cli;
mod collate;
mod consolidation;
mod depth_input;
mod depth_reading;
mod gc_bias;
mod genome_regions;
mod globals;
mod log_utils;
mod logger;
mod normalisation;
mod os_utils;
mod ratio_output;
mod read_ratio;
mod rolling_median;
mod run_ratio;
mod run_stats;
mod sample_ratios;
mod statistics;
mod target_region;
mod text_reader;
mod window_status;

use std::{error, process};

use hhmmss::Hhmmss;
use log::info;

use crate::globals::{PROGRAM_NAME, PROGRAM_VERSION};
use crate::logger::setup_output_dir_and_logger;
use crate::run_ratio::run_ratio;

fn run(settings: &cli::Settings) -> Result<(), Box<dyn error::Error>> {
    info!("Starting {PROGRAM_NAME} {PROGRAM_VERSION}");
    info!(
        "cmdline: {}",
        std::env::args().collect::<Vec<_>>().join(" ")
    );
    info!("Running on {} threads", settings.shared.thread_count);

    let start = std::time::Instant::now();

    run_ratio(&settings.shared, &settings.ratio)?;

    info!(
        "{PROGRAM_NAME} completed. Total Runtime: {}",
        start.elapsed().hhmmssxxx()
    );
    Ok(())
}

fn main() {
    let settings = cli::validate_and_fix_settings(cli::parse_settings());

    // Setup logger, including creation of the output directory for the log file:
    setup_output_dir_and_logger(
        settings.get_output_dir(),
        settings.shared.clobber,
        settings.shared.debug,
    );

    if let Err(err) = run(&settings) {
        log::error!("{err}");
        process::exit(2);
    }
}
