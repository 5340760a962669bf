//! Rect bounds, clip fractions and placement math.
//!
//! `RectBounds` keeps whatever orientation the source attributes imply
//! (a negative `width` puts `x1` left of `x0`); edge comparisons re-derive
//! sides with `min`/`max` instead of assuming order.

use crate::error::ImageError;
use crate::geom::Point;

// ============================================================================
// RectBounds
// ============================================================================

/// Edges of a rect-like element in its local space: `{x0, x1, y0, y1}`
/// with no orientation guarantee.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectBounds {
    pub x0: f64,
    pub x1: f64,
    pub y0: f64,
    pub y1: f64,
}

impl RectBounds {
    /// Bounds of an `x, y, width, height` placement.
    #[inline]
    pub const fn from_placement(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x0: x,
            x1: x + width,
            y0: y,
            y1: y + height,
        }
    }

    /// Bounds from raw attribute values. Missing or unparseable `x`/`y`
    /// default to 0; `width`/`height` are mandatory.
    pub fn from_attrs(
        tag: &str,
        x: Option<&str>,
        y: Option<&str>,
        width: Option<&str>,
        height: Option<&str>,
    ) -> Result<Self, ImageError> {
        let x = parse_attr(x).unwrap_or(0.0);
        let y = parse_attr(y).unwrap_or(0.0);
        let width = parse_attr(width).ok_or_else(|| ImageError::missing_attr(tag, "width"))?;
        let height = parse_attr(height).ok_or_else(|| ImageError::missing_attr(tag, "height"))?;
        Ok(Self::from_placement(x, y, width, height))
    }

    #[inline]
    pub fn width(&self) -> f64 {
        (self.x1 - self.x0).abs()
    }

    #[inline]
    pub fn height(&self) -> f64 {
        (self.y1 - self.y0).abs()
    }

    /// The four corners in top-left, bottom-left, top-right, bottom-right
    /// order (SVG y grows downward).
    pub fn corner_points(&self) -> [Point; 4] {
        [
            Point::new(self.x0, self.y0),
            Point::new(self.x0, self.y1),
            Point::new(self.x1, self.y0),
            Point::new(self.x1, self.y1),
        ]
    }
}

/// Parse a numeric attribute value, tolerating surrounding whitespace.
#[inline]
pub fn parse_attr(value: Option<&str>) -> Option<f64> {
    value.and_then(|s| s.trim().parse::<f64>().ok())
}

// ============================================================================
// ClipFraction
// ============================================================================

/// Fraction of a placement rect to remove from each edge.
///
/// Components can be negative when a clip corner lies outside the rect;
/// they are clamped to non-negative only when converted to whole pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipFraction {
    pub top: f64,
    pub bottom: f64,
    pub left: f64,
    pub right: f64,
}

impl ClipFraction {
    /// No cropping on any edge.
    pub const NONE: Self = Self {
        top: 0.0,
        bottom: 0.0,
        left: 0.0,
        right: 0.0,
    };

    /// Fold clip-point fractions into the per-edge crop.
    ///
    /// Starts from a full crop on every edge and keeps the minimum across
    /// all points, so the crop on each edge is bounded by the clip corner
    /// closest to being inside the rect. An empty point list crops nothing.
    pub fn from_clip_points(points: &[Point], bounds: &RectBounds) -> Self {
        if points.is_empty() {
            return Self::NONE;
        }
        let mut cf = [1.0f64; 4];
        for p in points {
            let pf = scale_to_rect_fraction(distance_from_rect(*p, bounds), bounds);
            for (c, f) in cf.iter_mut().zip(pf) {
                *c = c.min(f);
            }
        }
        Self {
            top: cf[0],
            bottom: cf[1],
            left: cf[2],
            right: cf[3],
        }
    }
}

/// Distance of a point from each edge of a rect, `{top, bottom, left,
/// right}` order, negative when the point is on the exterior side.
pub fn distance_from_rect(p: Point, r: &RectBounds) -> [f64; 4] {
    let top = r.y0.min(r.y1);
    let bottom = r.y0.max(r.y1);
    let left = r.x0.min(r.x1);
    let right = r.x0.max(r.x1);
    [p.y - top, bottom - p.y, p.x - left, right - p.x]
}

/// Scale edge distances to fractions of the rect's height (top/bottom)
/// and width (left/right).
pub fn scale_to_rect_fraction(d: [f64; 4], r: &RectBounds) -> [f64; 4] {
    let h = r.height();
    let w = r.width();
    [d[0] / h, d[1] / h, d[2] / w, d[3] / w]
}

// ============================================================================
// Placement
// ============================================================================

/// An image element's `x, y, width, height` placement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Placement {
    /// Recompute the placement after the raster was cropped by `crop`.
    ///
    /// `crop` must be the fractions actually removed, i.e. derived from
    /// the rounded pixel counts, not the raw geometric fractions.
    #[must_use]
    pub fn adjusted(&self, crop: &ClipFraction) -> Self {
        Self {
            x: self.x + crop.left * self.width,
            y: self.y + crop.top * self.height,
            width: self.width * (1.0 - crop.left - crop.right),
            height: self.height * (1.0 - crop.top - crop.bottom),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
