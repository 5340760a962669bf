//! The three-phase run: gather geometry per image, do the pixel work in
//! parallel, then patch the document in one serial pass.
//!
//! A failure on one image logs the error and leaves that element
//! untouched; only document-level problems (unreadable input, malformed
//! XML, unwritable output) abort the run.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;

use crate::error::ImageError;
use crate::geom::{ClipFraction, Placement, Transform};
use crate::image::{crop_to_clip, encode_data_uri, limit_resolution, load_image};
use crate::log;
use crate::options::Options;
use crate::svg::{
    AttrPatches, Document, crop_fraction, document_space_transform, find_clip_path,
    read_placement, transformed_dims,
};

/// Everything the pixel phase needs for one image, detached from the
/// document so the work can run in parallel.
struct ImageJob {
    element_idx: usize,
    cf: ClipFraction,
    pixels: image::RgbImage,
    href_attr: &'static str,
    placement: Placement,
    /// Present only when resampling is on.
    to_document: Option<Transform>,
}

/// Result of the pixel phase, ready to be written into the element.
struct ImagePatch {
    href_attr: &'static str,
    data_uri: String,
    placement: Placement,
}

/// Run the whole tool over one document.
pub fn run(options: &Options) -> Result<()> {
    let source = match &options.input {
        Some(path) => fs::read(path)
            .with_context(|| format!("can't read input file `{}`", path.display()))?,
        None => {
            let mut buf = Vec::new();
            io::stdin().read_to_end(&mut buf).context("can't read stdin")?;
            buf
        }
    };
    // Relative image links resolve against the document's directory.
    let base_dir = options
        .input
        .as_deref()
        .and_then(Path::parent)
        .map_or_else(PathBuf::new, Path::to_path_buf);

    let doc = Document::parse(source)?;

    // Phase 1: serial walk over the document, collecting pixel jobs.
    let mut jobs = Vec::new();
    for &idx in doc.images() {
        let id = doc.element(idx).attr("id").unwrap_or_default();
        log!("image"; "working on image `{id}`");
        match prepare_job(&doc, idx, options, &base_dir) {
            Ok(Some(job)) => jobs.push(job),
            Ok(None) => {}
            Err(e) => log!("error"; "skipping image `{id}`: {e}"),
        }
    }

    // Phase 2: crop, resample and re-encode in parallel.
    let results: Vec<_> = jobs
        .into_par_iter()
        .map(|job| {
            let idx = job.element_idx;
            (idx, process_job(job, options))
        })
        .collect();

    // Phase 3: apply patches in document order.
    let mut patches = AttrPatches::default();
    for (idx, result) in results {
        match result {
            Ok(patch) => {
                patches.insert(idx, patched_attrs(doc.element(idx).attrs.clone(), &patch));
            }
            Err(e) => {
                let id = doc.element(idx).attr("id").unwrap_or_default();
                log!("error"; "skipping image `{id}`: {e}");
            }
        }
    }

    let out = doc.to_patched_bytes(&patches)?;
    match &options.output {
        Some(path) => {
            fs::write(path, &out)
                .with_context(|| format!("can't write output file `{}`", path.display()))?;
            log!("write"; "saved to {}", path.display());
        }
        None => io::stdout().write_all(&out).context("can't write stdout")?,
    }
    Ok(())
}

/// Resolve one image's clip, pixels and placement. `Ok(None)` means the
/// element is deliberately left as-is.
fn prepare_job(
    doc: &Document,
    idx: usize,
    options: &Options,
    base_dir: &Path,
) -> Result<Option<ImageJob>, ImageError> {
    let el = doc.element(idx);
    let cf = match find_clip_path(doc, idx) {
        Some(clip_idx) => crop_fraction(doc, idx, clip_idx)?,
        None => ClipFraction::NONE,
    };
    let Some(loaded) = load_image(el, base_dir, options.embedded_min)? else {
        return Ok(None);
    };
    let placement = read_placement(el)?;
    let to_document = match options.resample {
        Some(_) => Some(document_space_transform(doc, idx)?),
        None => None,
    };
    Ok(Some(ImageJob {
        element_idx: idx,
        cf,
        pixels: loaded.pixels,
        href_attr: loaded.href_attr,
        placement,
        to_document,
    }))
}

/// The pixel phase for one image: crop, adjust placement by what was
/// actually cropped, optionally downsample, re-encode.
fn process_job(job: ImageJob, options: &Options) -> Result<ImagePatch, ImageError> {
    let (mut pixels, actual) = crop_to_clip(&job.pixels, &job.cf)?;
    let placement = job.placement.adjusted(&actual);
    if let (Some((target, max)), Some(t)) = (options.resample, job.to_document) {
        let dims = transformed_dims(&t, placement.width, placement.height);
        pixels = limit_resolution(pixels, dims, target, max);
    }
    let data_uri = encode_data_uri(&pixels, options.format, options.quality)?;
    Ok(ImagePatch {
        href_attr: job.href_attr,
        data_uri,
        placement,
    })
}

/// New attribute list for a rewritten image element: the data URI goes
/// back to whichever href attribute it came from, and the placement
/// attributes are replaced (or appended, for an absent `x`/`y`).
fn patched_attrs(mut attrs: Vec<(String, String)>, patch: &ImagePatch) -> Vec<(String, String)> {
    set_attr(&mut attrs, patch.href_attr, patch.data_uri.clone());
    set_attr(&mut attrs, "x", patch.placement.x.to_string());
    set_attr(&mut attrs, "y", patch.placement.y.to_string());
    set_attr(&mut attrs, "width", patch.placement.width.to_string());
    set_attr(&mut attrs, "height", patch.placement.height.to_string());
    attrs
}

fn set_attr(attrs: &mut Vec<(String, String)>, name: &str, value: String) {
    match attrs.iter_mut().find(|(k, _)| k == name) {
        Some((_, v)) => *v = value,
        None => attrs.push((name.to_string(), value)),
    }
}
