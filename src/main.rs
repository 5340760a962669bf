//! Inlay - crop, downsample and re-embed clipped raster images in SVG
//! documents.

mod cli;
mod error;
mod geom;
mod image;
mod logger;
mod options;
mod pipeline;
mod svg;

use anyhow::Result;
use clap::{ColorChoice, Parser};
use cli::Cli;
use options::Options;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }

    let options = Options::from_cli(&cli)?;
    logger::set_verbose(options.verbose);

    pipeline::run(&options)
}
