//! Command-line segmentation of a single image.
//!
//! ```sh
//! histoseg input.png mask.png --algorithm otsu2d --blur-sigma 1.5
//! histoseg input.png mask.png --algorithm triclass --params '{"max_iterations": 20}' --report run.json
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use histoseg::{detect, AlgorithmKind, AlgorithmRegistry, SegmentError};
use log::{error, info, LevelFilter};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Algorithm {
    Otsu2d,
    Triclass,
}

impl From<Algorithm> for AlgorithmKind {
    fn from(a: Algorithm) -> Self {
        match a {
            Algorithm::Otsu2d => AlgorithmKind::Otsu2d,
            Algorithm::Triclass => AlgorithmKind::IterativeTriclass,
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "histoseg",
    version,
    about = "Binary segmentation with 2D Otsu or iterative triclass thresholding"
)]
struct Args {
    /// Input image (any format the `image` crate decodes; converted to grayscale).
    input: PathBuf,

    /// Output mask image (0/255).
    output: PathBuf,

    #[arg(short, long, value_enum, default_value_t = Algorithm::Otsu2d)]
    algorithm: Algorithm,

    /// Registry JSON with default parameter sets per algorithm.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Inline JSON object overriding individual parameters.
    #[arg(long)]
    params: Option<String>,

    /// Gaussian sigma of the neighborhood feature grid (2D Otsu only).
    #[arg(long, default_value_t = 1.5)]
    blur_sigma: f32,

    /// Write a JSON report (thresholds, statistics, history) here.
    #[arg(long)]
    report: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err}");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<(), SegmentError> {
    let registry = match &args.config {
        Some(path) => AlgorithmRegistry::from_json_file(path)?,
        None => AlgorithmRegistry::new(),
    };
    let overrides = args
        .params
        .as_deref()
        .map(serde_json::from_str::<Value>)
        .transpose()
        .map_err(|source| SegmentError::Config {
            context: "--params".to_string(),
            source,
        })?;

    let kind = AlgorithmKind::from(args.algorithm);
    let segmenter = registry.segmenter(kind, overrides.as_ref())?;

    let img = detect::load_gray(&args.input)?;
    info!(
        "{}: {}x{} using {}",
        args.input.display(),
        img.width(),
        img.height(),
        kind
    );
    let outcome = detect::segment_image(&img, &segmenter, args.blur_sigma)?;

    let mask = outcome.mask();
    info!(
        "foreground {}/{} pixels",
        mask.count_nonzero(),
        mask.data.len()
    );
    detect::to_image(mask)?.save(&args.output)?;

    if let Some(path) = &args.report {
        let report = json!({
            "input": args.input.display().to_string(),
            "output": args.output.display().to_string(),
            "width": img.width(),
            "height": img.height(),
            "foreground_pixels": mask.count_nonzero(),
            "outcome": outcome.summary()?,
        });
        write_json(path, &report)?;
    }
    Ok(())
}

fn write_json(path: &Path, value: &Value) -> Result<(), SegmentError> {
    let text = serde_json::to_string_pretty(value).map_err(|source| SegmentError::Config {
        context: "report".to_string(),
        source,
    })?;
    fs::write(path, text).map_err(|source| SegmentError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    #[cfg(feature = "tracing")]
    {
        let _ = tracing_log::LogTracer::init();
        let directive = level.to_string().to_lowercase();
        histoseg::core::init_tracing(false, &directive);
    }
    #[cfg(not(feature = "tracing"))]
    {
        let _ = histoseg::core::init_with_level(level);
    }
}
