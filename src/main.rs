//! F1 Race Sectors
//!
//! Gathers timing overlay screenshots from a recorded race, reads driver
//! codes and sector times from them with Tesseract, and charts the results.

mod analysis;
mod capture;
mod config;
mod logging;
mod ocr;
mod paths;
mod processing;
mod progress;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::PathBuf;

use crate::capture::ImageSequence;
use crate::config::Config;

/// Collect and visualize F1 race sector data from a recorded timing overlay.
///
/// All stages run when none is selected.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// Path to config.json [default: next to the executable, then ./config.json]
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Gather screenshots from decoded frames
    #[arg(short, long)]
    gather: bool,

    /// Process screenshots into sector data
    #[arg(short, long)]
    process: bool,

    /// Visualize processed sector data
    #[arg(short, long)]
    visualize: bool,

    /// Directory of decoded frames, e.g. from `ffmpeg -i race.mp4 frames/%06d.png`
    #[arg(long, value_name = "DIR")]
    frames: Option<PathBuf>,

    /// Frame rate of the recording the frames were decoded from
    #[arg(long, default_value_t = 30.0)]
    fps: f64,

    #[arg(long, value_name = "DIR", default_value = "screenshots")]
    screenshots: PathBuf,

    #[arg(long, value_name = "DIR", default_value = "output")]
    output: PathBuf,

    /// Drivers to compare lap by lap, e.g. `--compare HAM VER`
    #[arg(short, long, value_name = "CODE", num_args = 1..)]
    compare: Vec<String>,
}

impl Args {
    /// (gather, process, visualize)
    fn stages(&self) -> (bool, bool, bool) {
        if !self.gather && !self.process && !self.visualize {
            (true, true, true)
        } else {
            (self.gather, self.process, self.visualize)
        }
    }
}

fn gather(args: &Args, config: &Config) -> Result<()> {
    let frames = args
        .frames
        .as_deref()
        .context("--frames is required to gather screenshots")?;
    let mut source = ImageSequence::open(frames, args.fps)?;

    let bar = progress::stage_bar("Gathering", 0)?;
    let summary = capture::gather_screenshots(&mut source, config, &args.screenshots, |done, expected| {
        if let Some(total) = expected {
            bar.set_length(total.max(done));
        }
        bar.set_position(done);
    })?;
    bar.finish_and_clear();

    info!(
        "Saved {} screenshot pairs to {} ({} red flag frames skipped)",
        summary.saved,
        args.screenshots.display(),
        summary.red_flags
    );
    Ok(())
}

fn process(args: &Args, config: &Config, rng: &mut StdRng) -> Result<()> {
    let pairs = processing::list_screenshot_pairs(&args.screenshots)?;
    if pairs.is_empty() {
        return Err(anyhow!(
            "No screenshots in {}. Gather them before processing.",
            args.screenshots.display()
        ));
    }
    info!("Found {} screenshot pairs", pairs.len());

    let engine = ocr::ensure_tesseract(config.tesseract_path.as_deref());

    let bar = progress::stage_bar("Processing", pairs.len() as u64)?;
    let history = processing::process_screenshots(&engine, &pairs, config, rng, |done, _| {
        bar.set_position(done as u64)
    })?;
    bar.finish_and_clear();

    let path = paths::sector_data_path(&args.output);
    history.save(&path)?;
    info!("Sector data for {} drivers saved: {}", history.len(), path.display());
    Ok(())
}

fn run(args: &Args) -> Result<()> {
    let config_path = Config::locate(args.config.as_deref());
    let config = Config::load(&config_path)?;
    paths::ensure_directories(&args.screenshots, &args.output)
        .context("Failed to create working directories")?;

    let mut rng = StdRng::from_entropy();
    let (do_gather, do_process, do_visualize) = args.stages();

    if do_gather {
        info!("Gathering screenshots...");
        gather(args, &config)?;
    }
    if do_process {
        info!("Processing screenshots...");
        process(args, &config, &mut rng)?;
    }
    if do_visualize {
        info!("Visualizing gathered data...");
        for path in analysis::visualize(&config, &args.output, &args.compare, &mut rng)? {
            info!("Wrote {}", path.display());
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    logging::init();
    let args = Args::parse();
    run(&args)
}
