//! Command-line entry point: loads a `MetricsConfig`, opens the configured
//! raw sequences, runs the driver, and writes the text report to stdout.

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use picture::ChromaFormat;
use qmiv_config::MetricsConfig;
use report::TextReporter;
use seqio::{RawFileSequenceIo, SequenceLayout};
use std::path::PathBuf;

/// Measures PSNR/WS-PSNR/IV-PSNR/SSIM/MS-SSIM/IV-SSIM/IV-MS-SSIM between a
/// test and a reference raw video sequence.
#[derive(Parser, Debug)]
#[command(author, version, about = "Objective quality measurement for immersive raw video", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, value_name = "PATH")]
    config: PathBuf,

    /// Overrides `NumberOfThreads` from the config file.
    #[arg(long)]
    threads: Option<usize>,

    /// Overrides `VerboseLevel` from the config file (0..3).
    #[arg(long)]
    verbose: Option<u8>,
}

fn level_filter(verbose: u8) -> LevelFilter {
    match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = MetricsConfig::load(&cli.config).context("loading configuration")?;
    if let Some(threads) = cli.threads {
        config.number_of_threads = threads;
    }
    if let Some(verbose) = cli.verbose {
        config.verbose_level = verbose;
    }

    env_logger::Builder::new().filter_level(level_filter(config.verbose_level)).init();

    let margin = app::required_margin(&config);
    let layout = SequenceLayout::new(
        config.picture_width,
        config.picture_height,
        config.bit_depth,
        config.chroma_format,
        config.pixel_layout,
    );
    let mask_layout = config
        .input_file_mask
        .as_ref()
        .map(|_| SequenceLayout::new(config.picture_width, config.picture_height, config.bit_depth, ChromaFormat::Mono400, config.pixel_layout));

    let sequence_io = RawFileSequenceIo::open(
        &config.input_file_test,
        &config.input_file_reference,
        config.input_file_mask.as_ref().map(|s| PathBuf::from(s.as_str())).as_deref(),
        layout,
        mask_layout,
        config.start_frame_test,
        config.start_frame_reference,
        margin,
        config.number_of_frames,
    )
    .context("opening input sequences")?;

    let mut driver = app::Driver::new(config, sequence_io);
    let stdout = std::io::stdout();
    let mut reporter = TextReporter::new(stdout.lock());
    driver.run(&mut reporter).context("running metric driver")?;

    Ok(())
}
