//! Runtime options resolved and validated from the command line.

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::ValueEnum;

use crate::cli::Cli;

/// Target resolution when `--resample` is given bare: 300 dpi for
/// millimeter-unit documents.
pub const DEFAULT_TARGET_RES: f64 = 11.811;
/// Resampling threshold when `--resample` is given bare: 400 dpi for
/// millimeter-unit documents.
pub const DEFAULT_MAX_RES: f64 = 15.748;
/// JPEG quality used when `--quality` is not set.
pub const DEFAULT_QUALITY: f32 = 0.8;

/// Output encoding for embedded rasters.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Lossless PNG
    Png,
    /// JPEG at the configured quality
    Jpeg,
    /// Per image, whichever of PNG and JPEG comes out smaller
    Mix,
}

/// Everything the pipeline needs, independent of how it was invoked.
#[derive(Debug, Clone)]
pub struct Options {
    pub input: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub format: Format,
    pub quality: f32,
    /// `(target, max)` resolution in pixels per document unit; `None`
    /// disables resampling.
    pub resample: Option<(f64, f64)>,
    /// Embedded images whose decoded payload exceeds this many bytes
    /// are re-processed; `None` leaves them all alone.
    pub embedded_min: Option<u64>,
    pub verbose: bool,
}

impl Options {
    /// Validate and resolve parsed arguments.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        if cli.quality.is_some() && cli.format == Format::Png {
            bail!("quality only applies to jpeg or mix output");
        }
        let quality = cli.quality.unwrap_or(DEFAULT_QUALITY);
        if !(0.0..=1.0).contains(&quality) {
            bail!("quality must be between 0 and 1");
        }

        let resample = match cli.resample.as_deref() {
            None => None,
            Some([]) => Some((DEFAULT_TARGET_RES, DEFAULT_MAX_RES)),
            Some([target]) => Some((*target, 4.0 / 3.0 * target)),
            Some([target, max]) => Some((*target, *max)),
            _ => unreachable!("argument parsing caps --resample at two values"),
        };

        let embedded_min = cli.embedded_min.as_deref().map(parse_size).transpose()?;

        Ok(Self {
            input: cli.input.clone(),
            output: cli.output.clone(),
            format: cli.format,
            quality,
            resample,
            embedded_min,
            verbose: cli.verbose,
        })
    }
}

/// Parse a size like `500KB` into bytes.
///
/// Units are powers of 1024, case-insensitive, and required; digits and
/// unit letters may appear in any order.
pub fn parse_size(s: &str) -> Result<u64> {
    let digits: String = s.chars().filter(char::is_ascii_digit).collect();
    let unit = s
        .chars()
        .filter(|c| !c.is_ascii_digit())
        .collect::<String>()
        .trim()
        .to_uppercase();
    let Ok(value) = digits.parse::<u64>() else {
        bail!("invalid file size `{s}`");
    };
    let multiplier: u64 = match unit.as_str() {
        "B" => 1,
        "KB" => 1 << 10,
        "MB" => 1 << 20,
        "GB" => 1 << 30,
        _ => bail!("invalid file size unit `{unit}`"),
    };
    Ok(value * multiplier)
}
