//! Pixel work: cropping to the clip, resolution limiting, and
//! re-encoding as a base64 data URI.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::imageops::FilterType;
use image::{ExtendedColorType, ImageEncoder, RgbImage};

use crate::error::ImageError;
use crate::geom::ClipFraction;
use crate::log;
use crate::options::Format;

// ============================================================================
// Cropping
// ============================================================================

/// Crop pixels off each edge per the clip fraction.
///
/// Edge counts are floored to whole pixels and never negative. Returns
/// the cropped image together with the fraction actually removed, which
/// is what placement adjustment has to work from.
pub fn crop_to_clip(
    pixels: &RgbImage,
    cf: &ClipFraction,
) -> Result<(RgbImage, ClipFraction), ImageError> {
    let (w, h) = pixels.dimensions();
    let top = (cf.top * f64::from(h)).floor().max(0.0) as u32;
    let bottom = (cf.bottom * f64::from(h)).floor().max(0.0) as u32;
    let left = (cf.left * f64::from(w)).floor().max(0.0) as u32;
    let right = (cf.right * f64::from(w)).floor().max(0.0) as u32;

    if left + right >= w || top + bottom >= h {
        return Err(ImageError::EmptyCrop {
            width: w,
            height: h,
        });
    }

    let cropped =
        image::imageops::crop_imm(pixels, left, top, w - left - right, h - top - bottom).to_image();
    let actual = ClipFraction {
        top: f64::from(top) / f64::from(h),
        bottom: f64::from(bottom) / f64::from(h),
        left: f64::from(left) / f64::from(w),
        right: f64::from(right) / f64::from(w),
    };
    Ok((cropped, actual))
}

// ============================================================================
// Resolution limiting
// ============================================================================

/// Downsample when the pixel density on the page exceeds `max_res`,
/// bringing each axis down to `target_res`.
///
/// Density is pixels per document unit over the element's placed size;
/// the axes are scaled independently, so anisotropic placements stay
/// anisotropic.
pub fn limit_resolution(
    pixels: RgbImage,
    doc_dims: (f64, f64),
    target_res: f64,
    max_res: f64,
) -> RgbImage {
    let (w, h) = pixels.dimensions();
    let res_w = f64::from(w) / doc_dims.0;
    let res_h = f64::from(h) / doc_dims.1;
    if res_w <= max_res && res_h <= max_res {
        return pixels;
    }

    let scale_w = (target_res / res_w).min(1.0);
    let scale_h = (target_res / res_h).min(1.0);
    log!("image"; "downsampling by factor of {scale_w:.3} x {scale_h:.3}");
    let new_w = ((f64::from(w) * scale_w).round() as u32).max(1);
    let new_h = ((f64::from(h) * scale_h).round() as u32).max(1);
    image::imageops::resize(&pixels, new_w, new_h, FilterType::CatmullRom)
}

// ============================================================================
// Encoding
// ============================================================================

/// Encode pixels in the output format and wrap them in a data URI.
pub fn encode_data_uri(
    pixels: &RgbImage,
    format: Format,
    quality: f32,
) -> Result<String, ImageError> {
    let (bytes, mime) = encode(pixels, format, quality)?;
    Ok(format!("data:image/{mime};base64,{}", BASE64.encode(bytes)))
}

fn encode(
    pixels: &RgbImage,
    format: Format,
    quality: f32,
) -> Result<(Vec<u8>, &'static str), ImageError> {
    match format {
        Format::Png => Ok((encode_png(pixels)?, "png")),
        Format::Jpeg => Ok((encode_jpeg(pixels, quality)?, "jpeg")),
        Format::Mix => {
            let png = encode_png(pixels)?;
            let jpeg = encode_jpeg(pixels, quality)?;
            // Ties go to PNG, the lossless side.
            if jpeg.len() < png.len() {
                log!("image"; "embedding image as jpeg");
                Ok((jpeg, "jpeg"))
            } else {
                log!("image"; "embedding image as png");
                Ok((png, "png"))
            }
        }
    }
}

fn encode_png(pixels: &RgbImage) -> Result<Vec<u8>, ImageError> {
    let mut bytes = Vec::new();
    PngEncoder::new(&mut bytes).write_image(
        pixels.as_raw(),
        pixels.width(),
        pixels.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(bytes)
}

fn encode_jpeg(pixels: &RgbImage, quality: f32) -> Result<Vec<u8>, ImageError> {
    let q = (quality * 100.0).clamp(1.0, 100.0) as u8;
    let mut bytes = Vec::new();
    JpegEncoder::new_with_quality(&mut bytes, q).write_image(
        pixels.as_raw(),
        pixels.width(),
        pixels.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use image::Rgb;

    use super::*;

    fn gradient(w: u32, h: u32) -> RgbImage {
        RgbImage::from_fn(w, h, |x, y| Rgb([(x * 2) as u8, (y * 4) as u8, 128]))
    }

    #[test]
    fn test_crop_matches_exact_fractions() {
        let img = gradient(100, 50);
        let cf = ClipFraction {
            top: 0.1,
            bottom: 0.1,
            left: 0.1,
            right: 0.1,
        };
        let (cropped, actual) = crop_to_clip(&img, &cf).unwrap();
        assert_eq!(cropped.dimensions(), (80, 40));
        assert_eq!(actual, cf);
        // top-left of the crop is (10, 5) in the source
        assert_eq!(cropped.get_pixel(0, 0), img.get_pixel(10, 5));
    }

    #[test]
    fn test_crop_floors_to_whole_pixels() {
        let img = gradient(10, 10);
        let cf = ClipFraction {
            top: 0.0,
            bottom: 0.0,
            left: 0.25,
            right: 0.0,
        };
        let (cropped, actual) = crop_to_clip(&img, &cf).unwrap();
        assert_eq!(cropped.dimensions(), (8, 10));
        assert_eq!(actual.left, 0.2);
    }

    #[test]
    fn test_negative_fraction_never_pads() {
        let img = gradient(10, 10);
        let cf = ClipFraction {
            top: -0.5,
            bottom: 0.0,
            left: 0.0,
            right: 0.0,
        };
        let (cropped, actual) = crop_to_clip(&img, &cf).unwrap();
        assert_eq!(cropped.dimensions(), (10, 10));
        assert_eq!(actual.top, 0.0);
    }

    #[test]
    fn test_crop_leaving_nothing_is_an_error() {
        let img = gradient(10, 10);
        let cf = ClipFraction {
            top: 0.0,
            bottom: 0.0,
            left: 0.6,
            right: 0.6,
        };
        assert!(matches!(
            crop_to_clip(&img, &cf),
            Err(ImageError::EmptyCrop { width: 10, .. })
        ));
    }

    #[test]
    fn test_no_clip_is_identity() {
        let img = gradient(12, 8);
        let (cropped, actual) = crop_to_clip(&img, &ClipFraction::NONE).unwrap();
        assert_eq!(cropped, img);
        assert_eq!(actual, ClipFraction::NONE);
    }

    #[test]
    fn test_limit_resolution_leaves_low_density_alone() {
        let img = gradient(100, 50);
        let out = limit_resolution(img.clone(), (100.0, 50.0), 11.811, 15.748);
        assert_eq!(out, img);
    }

    #[test]
    fn test_limit_resolution_hits_target() {
        let img = gradient(100, 50);
        // density 1.0 on both axes, max 0.5, target 0.25
        let out = limit_resolution(img, (100.0, 50.0), 0.25, 0.5);
        assert_eq!(out.dimensions(), (25, 13));
    }

    #[test]
    fn test_limit_resolution_scales_axes_independently() {
        let img = gradient(200, 10);
        // width axis is 20 px/unit, height axis 0.1 px/unit
        let out = limit_resolution(img, (10.0, 100.0), 4.0, 10.0);
        assert_eq!(out.dimensions(), (40, 10));
    }

    #[test]
    fn test_data_uri_carries_png_signature() {
        let uri = encode_data_uri(&gradient(8, 8), Format::Png, 0.8).unwrap();
        let payload = uri.strip_prefix("data:image/png;base64,").unwrap();
        let bytes = BASE64.decode(payload).unwrap();
        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
    }

    #[test]
    fn test_jpeg_quality_orders_sizes() {
        let img = gradient(64, 64);
        let low = encode(&img, Format::Jpeg, 0.1).unwrap().0;
        let high = encode(&img, Format::Jpeg, 1.0).unwrap().0;
        assert!(low.len() <= high.len());
    }

    #[test]
    fn test_mix_picks_the_smaller_encoding() {
        let img = gradient(32, 32);
        let png = encode(&img, Format::Png, 0.8).unwrap().0;
        let jpeg = encode(&img, Format::Jpeg, 0.8).unwrap().0;
        let (mixed, mime) = encode(&img, Format::Mix, 0.8).unwrap();
        if jpeg.len() < png.len() {
            assert_eq!(mime, "jpeg");
            assert_eq!(mixed, jpeg);
        } else {
            assert_eq!(mime, "png");
            assert_eq!(mixed, png);
        }
    }
}
