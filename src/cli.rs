//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{ColorChoice, Parser};

use crate::options::Format;

/// Embed linked rasters into an SVG, cropped to their clip paths
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Input SVG file (stdin when omitted)
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub input: Option<PathBuf>,

    /// Write the rewritten SVG here instead of stdout
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    pub output: Option<PathBuf>,

    /// Control colored output (auto, always, never)
    #[arg(long, default_value = "auto")]
    pub color: ColorChoice,

    /// Output image encoding
    #[arg(short = 't', long, value_enum, default_value = "png")]
    pub format: Format,

    /// JPEG compression quality, 0 to 1 (jpeg and mix output only)
    #[arg(short, long)]
    pub quality: Option<f32>,

    /// Downsample dense images, optionally giving target and max
    /// resolution in pixels per document unit
    #[arg(short, long, num_args = 0..=2, value_name = "RES")]
    pub resample: Option<Vec<f64>>,

    /// Re-encode embedded images larger than this size (e.g. 500KB)
    #[arg(short, long, value_name = "SIZE")]
    pub embedded_min: Option<String>,

    /// Enable verbose output for debugging
    #[arg(short, long)]
    pub verbose: bool,
}
