//! Raster loading for image elements.
//!
//! References come from `xlink:href` first, then `href`. Embedded data
//! URIs are only picked up when a size threshold was given and the
//! decoded payload exceeds it; anything that goes wrong with embedded
//! data leaves the element as-is rather than failing the image. File
//! links that cannot be read are real errors.

use std::fs;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::RgbImage;
use percent_encoding::percent_decode_str;

use crate::error::ImageError;
use crate::log;
use crate::svg::Element;

/// Decoded pixels plus the attribute the reference was read from, so the
/// re-encoded data URI can be written back to the same place.
pub struct LoadedImage {
    pub pixels: RgbImage,
    pub href_attr: &'static str,
}

/// Load the raster an image element points at.
///
/// `Ok(None)` means the element should be left untouched (embedded data
/// that is skipped, below the size limit, or unreadable).
pub fn load_image(
    el: &Element,
    base_dir: &Path,
    embedded_min: Option<u64>,
) -> Result<Option<LoadedImage>, ImageError> {
    let (href_attr, href) = match el.attr("xlink:href").filter(|v| !v.is_empty()) {
        Some(v) => ("xlink:href", v),
        None => match el.attr("href").filter(|v| !v.is_empty()) {
            Some(v) => ("href", v),
            None => return Err(ImageError::MissingHref),
        },
    };

    if href.starts_with("data:image") {
        let Some(min_size) = embedded_min else {
            log!("image"; "skipping embedded image");
            return Ok(None);
        };
        return Ok(match decode_embedded(href, min_size) {
            Ok(Some(pixels)) => Some(LoadedImage { pixels, href_attr }),
            Ok(None) => None,
            Err(e) => {
                log!("warn"; "{e}");
                log!("warn"; "embedded image will be left as-is");
                None
            }
        });
    }

    let path = local_path(href, base_dir);
    log!("image"; "loading image from file {}", path.display());
    let bytes = fs::read(&path).map_err(|e| ImageError::Io(path.clone(), e))?;
    let pixels = image::load_from_memory(&bytes)?.to_rgb8();
    Ok(Some(LoadedImage { pixels, href_attr }))
}

/// Decode a PNG or JPEG data URI, applying the size gate to the decoded
/// payload. `Ok(None)` means the payload is within the limit.
fn decode_embedded(uri: &str, min_size: u64) -> Result<Option<RgbImage>, ImageError> {
    let rest = uri
        .strip_prefix("data:image/png;")
        .or_else(|| uri.strip_prefix("data:image/jpeg;"))
        .ok_or_else(|| ImageError::UnsupportedDataUri(data_uri_head(uri)))?;
    let payload = rest
        .strip_prefix("base64,")
        .ok_or_else(|| ImageError::UnsupportedDataUri(data_uri_head(uri)))?;

    // Tolerate line-wrapped base64 as produced by some editors.
    let compact: Vec<u8> = payload
        .bytes()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();
    let bytes = BASE64.decode(&compact)?;
    let img = image::load_from_memory(&bytes)?;

    if bytes.len() as u64 <= min_size {
        log!("image"; "embedded image is below the size limit and will be left as-is");
        return Ok(None);
    }
    log!("image"; "embedded image is above the size limit and will be processed");
    Ok(Some(img.to_rgb8()))
}

/// Turn an href into a filesystem path: strip a `file://` scheme,
/// percent-decode, and resolve relative links against the document's
/// directory.
fn local_path(href: &str, base_dir: &Path) -> PathBuf {
    let mut path = href;
    if let Some(stripped) = path.strip_prefix("file://") {
        path = stripped;
        // Windows paths carry a drive letter after the scheme's slashes.
        if cfg!(windows) {
            path = path.trim_start_matches('/');
        }
    }
    let decoded = percent_decode_str(path).decode_utf8_lossy();
    let candidate = PathBuf::from(decoded.as_ref());
    if candidate.is_absolute() {
        candidate
    } else {
        base_dir.join(candidate)
    }
}

fn data_uri_head(uri: &str) -> String {
    uri.chars().take(25).collect()
}
