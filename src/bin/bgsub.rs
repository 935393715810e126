use anyhow::{Context, Result};
use clap::Parser;
use image::ImageFormat;
use log::{info, warn, LevelFilter};
use pbcvt::background::{BackgroundSubtractorMog2, Mog2Params};
use pbcvt::constants::FOREGROUND;
use pbcvt::convert::{load_frame, mask_to_image};
use std::fs;
use std::path::PathBuf;

/// Runs the background subtractor over a directory of frames and writes one
/// foreground mask per frame.
#[derive(Parser, Debug)]
#[command(name = "bgsub", version)]
struct Args {
    /// Directory holding the frames, processed in file name order
    input_dir: PathBuf,

    /// Directory the `mask_<frame>.png` files are written to
    output_dir: PathBuf,

    /// JSON file with background subtractor parameters
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Fixed learning rate, picked from the frame count when omitted
    #[arg(short, long)]
    learning_rate: Option<f64>,
}

fn main() -> Result<()> {
    env_logger::Builder::default()
        .filter_level(LevelFilter::Warn)
        .parse_env(env_logger::Env::default().filter_or("PBCVT_LOG", "info"))
        .init();

    let args = Args::parse();

    let params = match &args.config {
        Some(path) => Mog2Params::from_json(path)
            .with_context(|| format!("loading parameters from {}", path.display()))?,
        None => Mog2Params::default(),
    };
    let mut subtractor = BackgroundSubtractorMog2::new(params)?;

    let mut frames: Vec<PathBuf> = fs::read_dir(&args.input_dir)
        .with_context(|| format!("reading {}", args.input_dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && ImageFormat::from_path(path).is_ok())
        .collect();
    frames.sort();

    fs::create_dir_all(&args.output_dir)
        .with_context(|| format!("creating {}", args.output_dir.display()))?;

    let mut processed = 0;
    for path in &frames {
        let frame = match load_frame(path) {
            Ok(frame) => frame,
            Err(err) => {
                warn!("skipping {}: {}", path.display(), err);
                continue;
            }
        };
        let mask = subtractor.apply(&frame, args.learning_rate)?;

        let foreground = mask.as_slice().iter().filter(|&&v| v == FOREGROUND).count();
        info!("{}: {} of {} pixels in the foreground", path.display(), foreground, mask.len());

        let stem = path.file_stem().and_then(|s| s.to_str()).unwrap_or("frame");
        let out_path = args.output_dir.join(format!("mask_{}.png", stem));
        mask_to_image(&mask)?
            .save(&out_path)
            .with_context(|| format!("writing {}", out_path.display()))?;
        processed += 1;
    }

    info!("processed {} of {} frame(s)", processed, frames.len());
    Ok(())
}
