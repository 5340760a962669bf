//! Clip resolution and document-space geometry for image elements.
//!
//! The crop fraction compares the image's raw attribute rect against the
//! clip rect corners; neither side is taken to document space, matching
//! how editors attach a clip in the image's own coordinate frame. Clip
//! children contribute only their own `transform`, a deliberately
//! narrower scope than the ancestor-chain resolution used for sizing.

use crate::error::ImageError;
use crate::geom::{ClipFraction, Placement, Point, RectBounds, Transform, parse_attr, parse_transform};
use crate::svg::{Document, Element};
use crate::{debug, log};

// ============================================================================
// Clip-path lookup
// ============================================================================

/// Extract the clipPath id from a `clip-path` attribute value.
///
/// Takes the substring between `#` and `)` when both are present, so
/// `url(#frame)` yields `frame`; anything else is used as-is.
pub fn clip_path_id(raw: &str) -> &str {
    match (raw.find('#'), raw.find(')')) {
        (Some(a), Some(b)) if b > a => &raw[a + 1..b],
        _ => raw,
    }
}

/// Resolve the `<clipPath>` an image element references, if any.
pub fn find_clip_path(doc: &Document, image_idx: usize) -> Option<usize> {
    let raw = doc.element(image_idx).attr("clip-path")?;
    if raw.is_empty() {
        return None;
    }
    let id = clip_path_id(raw);
    log!("clip"; "image has clip-path `{id}`");
    doc.clip_path_by_id(id)
}

// ============================================================================
// Clip points and crop fraction
// ============================================================================

/// Corner points of every `<rect>` child of a clipPath, each mapped
/// through that child's own `transform` attribute.
///
/// Any child that is not a `<rect>` makes the whole clip unusable.
pub fn clip_points(doc: &Document, clip_idx: usize) -> Result<Vec<Point>, ImageError> {
    let clip = doc.element(clip_idx);
    let mut points = Vec::with_capacity(clip.children.len() * 4);
    for &child_idx in &clip.children {
        let child = doc.element(child_idx);
        if child.name != "rect" {
            return Err(ImageError::UnsupportedClipShape(child.name.clone()));
        }
        let bounds = RectBounds::from_attrs(
            "rect",
            child.attr("x"),
            child.attr("y"),
            child.attr("width"),
            child.attr("height"),
        )?;
        let mut corners = bounds.corner_points();
        if let Some(t) = child.attr("transform") {
            parse_transform(t)?.apply_points(&mut corners);
        }
        points.extend_from_slice(&corners);
    }
    Ok(points)
}

/// Fraction of the image placement rect to crop away on each edge so the
/// remainder stays inside the clip.
pub fn crop_fraction(
    doc: &Document,
    image_idx: usize,
    clip_idx: usize,
) -> Result<ClipFraction, ImageError> {
    let img = doc.element(image_idx);
    let bounds = RectBounds::from_attrs(
        &img.name,
        img.attr("x"),
        img.attr("y"),
        img.attr("width"),
        img.attr("height"),
    )?;
    debug!("clip"; "image bounds ({}, {}) to ({}, {})", bounds.x0, bounds.y0, bounds.x1, bounds.y1);
    let points = clip_points(doc, clip_idx)?;
    let cf = ClipFraction::from_clip_points(&points, &bounds);
    debug!("clip"; "crop fractions: top {:.4}, bottom {:.4}, left {:.4}, right {:.4}",
        cf.top, cf.bottom, cf.left, cf.right);
    Ok(cf)
}

// ============================================================================
// Document-space resolution
// ============================================================================

/// Transform from an element's local coordinates to document space.
///
/// Walks the parent links iteratively; the element's own transform applies
/// to the point first, then each successively outer ancestor's.
pub fn document_space_transform(doc: &Document, idx: usize) -> Result<Transform, ImageError> {
    let mut composed = Transform::IDENTITY;
    let mut cursor = Some(idx);
    while let Some(i) = cursor {
        let el = doc.element(i);
        if let Some(attr) = el.attr("transform")
            && !attr.is_empty()
        {
            composed = parse_transform(attr)?.mul(composed);
        }
        cursor = el.parent;
    }
    Ok(composed)
}

/// On-page size of a `width x height` box under a document-space
/// transform, measured along its transformed axes.
pub fn transformed_dims(t: &Transform, width: f64, height: f64) -> (f64, f64) {
    let origin = t.apply(Point::new(0.0, 0.0));
    let x_axis = t.apply(Point::new(width, 0.0));
    let y_axis = t.apply(Point::new(0.0, height));
    let w = (x_axis.x - origin.x).hypot(x_axis.y - origin.y);
    let h = (y_axis.x - origin.x).hypot(y_axis.y - origin.y);
    (w, h)
}

// ============================================================================
// Placement attributes
// ============================================================================

/// Read an image element's placement for adjustment. `width`/`height`
/// are mandatory; a missing or malformed `x`/`y` falls back to 0 with a
/// warning, the way absent coordinates are meant to be read.
pub fn read_placement(el: &Element) -> Result<Placement, ImageError> {
    let width =
        parse_attr(el.attr("width")).ok_or_else(|| ImageError::missing_attr(&el.name, "width"))?;
    let height =
        parse_attr(el.attr("height")).ok_or_else(|| ImageError::missing_attr(&el.name, "height"))?;
    let x = parse_attr(el.attr("x")).unwrap_or_else(|| {
        log!("warn"; "no x coordinate set, defaulting to 0");
        0.0
    });
    let y = parse_attr(el.attr("y")).unwrap_or_else(|| {
        log!("warn"; "no y coordinate set, defaulting to 0");
        0.0
    });
    Ok(Placement {
        x,
        y,
        width,
        height,
    })
}

// ============================================================================
// Tests
// ============================================================================
