//! 2D affine transforms and the SVG `transform` attribute parser.
//!
//! The attribute grammar here is deliberately the lenient dialect the rest
//! of the pipeline depends on: tokens split on whitespace, unrecognized
//! function names are skipped, and every token transforms the running
//! point in declaration order. The declaration order matters: composing
//! the parsed list puts later tokens on the left of the matrix product,
//! so `translate(10,0) rotate(90)` translates first, then rotates.

use crate::error::ImageError;

// ============================================================================
// Point
// ============================================================================

/// A point in 2D document or local coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[inline]
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

// ============================================================================
// Transform
// ============================================================================

/// 2D affine transform with SVG coefficient naming.
///
/// Maps a point as `x' = a·x + c·y + e`, `y' = b·x + d·y + f`, i.e. the
/// augmented matrix
///
/// ```text
/// | a c e |
/// | b d f |
/// | 0 0 1 |
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    #[inline]
    pub const fn translation(tx: f64, ty: f64) -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: tx,
            f: ty,
        }
    }

    #[inline]
    pub const fn scaling(sx: f64, sy: f64) -> Self {
        Self {
            a: sx,
            b: 0.0,
            c: 0.0,
            d: sy,
            e: 0.0,
            f: 0.0,
        }
    }

    /// Rotation about the origin, `deg` in degrees.
    #[inline]
    pub fn rotation(deg: f64) -> Self {
        let rad = deg.to_radians();
        let (sin, cos) = rad.sin_cos();
        Self {
            a: cos,
            b: sin,
            c: -sin,
            d: cos,
            e: 0.0,
            f: 0.0,
        }
    }

    /// Rotation about `(cx, cy)` as the `rotate(a,cx,cy)` token defines it:
    /// the point is translated by `(+cx, +cy)` first, rotated, then
    /// translated by `(-cx, -cy)`.
    #[inline]
    pub fn rotation_about(deg: f64, cx: f64, cy: f64) -> Self {
        Self::translation(-cx, -cy)
            .mul(Self::rotation(deg))
            .mul(Self::translation(cx, cy))
    }

    /// Shear along x, `deg` in degrees.
    #[inline]
    pub fn skew_x(deg: f64) -> Self {
        Self {
            a: 1.0,
            b: 0.0,
            c: deg.to_radians().tan(),
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }

    /// Shear along y, `deg` in degrees.
    #[inline]
    pub fn skew_y(deg: f64) -> Self {
        Self {
            a: 1.0,
            b: deg.to_radians().tan(),
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }

    /// Matrix product `self × rhs`: `rhs` is applied to the point first.
    #[must_use]
    pub fn mul(self, rhs: Self) -> Self {
        Self {
            a: self.a * rhs.a + self.c * rhs.b,
            b: self.b * rhs.a + self.d * rhs.b,
            c: self.a * rhs.c + self.c * rhs.d,
            d: self.b * rhs.c + self.d * rhs.d,
            e: self.a * rhs.e + self.c * rhs.f + self.e,
            f: self.b * rhs.e + self.d * rhs.f + self.f,
        }
    }

    /// Apply the transform to a point.
    #[inline]
    pub fn apply(&self, p: Point) -> Point {
        Point {
            x: self.a * p.x + self.c * p.y + self.e,
            y: self.b * p.x + self.d * p.y + self.f,
        }
    }

    /// Apply the transform to a set of points in place.
    pub fn apply_points(&self, points: &mut [Point]) {
        for p in points {
            *p = self.apply(*p);
        }
    }
}

// ============================================================================
// Transform Ops
// ============================================================================

/// One parsed token of a `transform` attribute
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TransformOp {
    Matrix(Transform),
    Translate { tx: f64, ty: f64 },
    Scale { sx: f64, sy: f64 },
    Rotate { deg: f64 },
    RotateAbout { deg: f64, cx: f64, cy: f64 },
    SkewX { deg: f64 },
    SkewY { deg: f64 },
}

impl TransformOp {
    /// The transform this single op performs.
    pub fn matrix(&self) -> Transform {
        match *self {
            Self::Matrix(m) => m,
            Self::Translate { tx, ty } => Transform::translation(tx, ty),
            Self::Scale { sx, sy } => Transform::scaling(sx, sy),
            Self::Rotate { deg } => Transform::rotation(deg),
            Self::RotateAbout { deg, cx, cy } => Transform::rotation_about(deg, cx, cy),
            Self::SkewX { deg } => Transform::skew_x(deg),
            Self::SkewY { deg } => Transform::skew_y(deg),
        }
    }
}

/// Compose a parsed op list into a single transform.
///
/// Ops transform the running point in declaration order, so each op's
/// matrix is multiplied onto the left of the accumulator.
pub fn compose(ops: &[TransformOp]) -> Transform {
    ops.iter()
        .fold(Transform::IDENTITY, |acc, op| op.matrix().mul(acc))
}

// ============================================================================
// Attribute Parsing
// ============================================================================

/// Parse a `transform` attribute into a single composed transform.
///
/// Empty or absent (`""`) input yields the identity.
pub fn parse_transform(attr: &str) -> Result<Transform, ImageError> {
    Ok(compose(&parse_transform_list(attr)?))
}

/// Parse a `transform` attribute into its op list.
///
/// Tokens are split on whitespace, so arguments must not carry internal
/// spaces; a token left without its closing paren is an error. Tokens
/// whose function name is unrecognized are skipped.
pub fn parse_transform_list(attr: &str) -> Result<Vec<TransformOp>, ImageError> {
    let mut ops = Vec::new();
    for token in attr.split_ascii_whitespace() {
        match parse_token(token)? {
            Some(op) => ops.push(op),
            None => {
                crate::debug!("transform"; "skipping token `{token}`");
            }
        }
    }
    Ok(ops)
}

/// Parse one whitespace-delimited token. `Ok(None)` means the token is
/// skipped without error (unknown function name, or a `rotate` arity the
/// grammar has no meaning for).
fn parse_token(token: &str) -> Result<Option<TransformOp>, ImageError> {
    let Some(open) = token.find('(') else {
        return Ok(None);
    };
    let name = &token[..open];
    if !matches!(
        name,
        "matrix" | "translate" | "scale" | "rotate" | "skewX" | "skewY"
    ) {
        return Ok(None);
    }

    let close = token
        .rfind(')')
        .filter(|&i| i > open)
        .ok_or_else(|| bad_token(token))?;
    let inner = &token[open + 1..close];

    let op = match name {
        "matrix" => {
            let args: Vec<&str> = inner.split(',').collect();
            if args.len() < 6 {
                return Err(bad_token(token));
            }
            Some(TransformOp::Matrix(Transform {
                a: parse_num(args[0], token)?,
                b: parse_num(args[1], token)?,
                c: parse_num(args[2], token)?,
                d: parse_num(args[3], token)?,
                e: parse_num(args[4], token)?,
                f: parse_num(args[5], token)?,
            }))
        }
        "translate" => {
            let args: Vec<&str> = inner.split(',').collect();
            let tx = parse_num(args[0], token)?;
            let ty = match args.get(1) {
                Some(s) => parse_num(s, token)?,
                None => 0.0,
            };
            Some(TransformOp::Translate { tx, ty })
        }
        "scale" => {
            let args: Vec<&str> = inner.split(',').collect();
            let sx = parse_num(args[0], token)?;
            let sy = match args.get(1) {
                Some(s) => parse_num(s, token)?,
                None => sx,
            };
            Some(TransformOp::Scale { sx, sy })
        }
        "rotate" => {
            let args: Vec<&str> = inner.split(',').collect();
            let deg = parse_num(args[0], token)?;
            match args.len() {
                1 => Some(TransformOp::Rotate { deg }),
                3 => Some(TransformOp::RotateAbout {
                    deg,
                    cx: parse_num(args[1], token)?,
                    cy: parse_num(args[2], token)?,
                }),
                // rotate with any other arity has no defined meaning here
                _ => None,
            }
        }
        // skew takes exactly one argument: the whole parenthesized
        // content must parse as a single number
        "skewX" => Some(TransformOp::SkewX {
            deg: parse_num(inner, token)?,
        }),
        "skewY" => Some(TransformOp::SkewY {
            deg: parse_num(inner, token)?,
        }),
        _ => unreachable!("name was checked against the known set"),
    };
    Ok(op)
}

#[inline]
fn parse_num(s: &str, token: &str) -> Result<f64, ImageError> {
    s.parse::<f64>().map_err(|_| bad_token(token))
}

#[inline]
fn bad_token(token: &str) -> ImageError {
    ImageError::Transform(format!("bad token `{token}`"))
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(p: Point, x: f64, y: f64) {
        assert!(
            (p.x - x).abs() < 1e-9 && (p.y - y).abs() < 1e-9,
            "got ({}, {}), want ({x}, {y})",
            p.x,
            p.y
        );
    }

    #[test]
    fn test_empty_transform_is_identity() {
        let t = parse_transform("").unwrap();
        approx(t.apply(Point::new(3.5, -2.0)), 3.5, -2.0);
        let t = parse_transform("   ").unwrap();
        approx(t.apply(Point::new(1.0, 1.0)), 1.0, 1.0);
    }

    #[test]
    fn test_translate_then_rotate_applies_in_declaration_order() {
        let t = parse_transform("translate(10,0) rotate(90)").unwrap();
        approx(t.apply(Point::new(1.0, 0.0)), 0.0, 11.0);

        // reversed declaration gives a different point
        let t = parse_transform("rotate(90) translate(10,0)").unwrap();
        approx(t.apply(Point::new(1.0, 0.0)), 10.0, 1.0);
    }

    #[test]
    fn test_matrix_token_matches_translate() {
        let m = parse_transform("matrix(1,0,0,1,5,7)").unwrap();
        let t = parse_transform("translate(5,7)").unwrap();
        for p in [Point::new(0.0, 0.0), Point::new(-3.0, 12.5)] {
            let pm = m.apply(p);
            let pt = t.apply(p);
            approx(pm, pt.x, pt.y);
        }
    }

    #[test]
    fn test_rotate_about_point_translates_center_first() {
        // +center is applied to the point before the rotation, -center after
        let t = parse_transform("rotate(90,10,0)").unwrap();
        approx(t.apply(Point::new(0.0, 0.0)), -10.0, 10.0);
        // (-cx,-cy) is the fixed point of this composition
        approx(t.apply(Point::new(-10.0, 0.0)), -10.0, 0.0);
    }

    #[test]
    fn test_translate_roundtrip() {
        let out = parse_transform("translate(4,-9) translate(-4,9)")
            .unwrap()
            .apply(Point::new(7.0, 7.0));
        approx(out, 7.0, 7.0);
    }

    #[test]
    fn test_scale_defaults_sy_to_sx() {
        let t = parse_transform("scale(3)").unwrap();
        approx(t.apply(Point::new(1.0, 2.0)), 3.0, 6.0);
    }

    #[test]
    fn test_translate_defaults_ty_to_zero() {
        let t = parse_transform("translate(5)").unwrap();
        approx(t.apply(Point::new(0.0, 0.0)), 5.0, 0.0);
    }

    #[test]
    fn test_skew_uses_tangent() {
        let t = parse_transform("skewX(45)").unwrap();
        approx(t.apply(Point::new(0.0, 1.0)), 1.0, 1.0);
        let t = parse_transform("skewY(45)").unwrap();
        approx(t.apply(Point::new(1.0, 0.0)), 1.0, 1.0);
    }

    #[test]
    fn test_unknown_function_skipped() {
        let t = parse_transform("frobnicate(3) translate(5,0)").unwrap();
        approx(t.apply(Point::new(0.0, 0.0)), 5.0, 0.0);
    }

    #[test]
    fn test_rotate_unsupported_arity_skipped() {
        let t = parse_transform("rotate(45,10)").unwrap();
        approx(t.apply(Point::new(1.0, 0.0)), 1.0, 0.0);
    }

    #[test]
    fn test_matrix_too_few_args_is_error() {
        assert!(parse_transform("matrix(1,2,3)").is_err());
    }

    #[test]
    fn test_space_inside_args_is_error() {
        // whitespace tokenization splits "translate(10, 20)" into a token
        // with no closing paren
        assert!(parse_transform("translate(10, 20)").is_err());
    }

    #[test]
    fn test_unparseable_number_is_error() {
        assert!(parse_transform("translate(abc)").is_err());
        assert!(parse_transform("skewX(5,6)").is_err());
    }

    #[test]
    fn test_compose_matches_sequential_application() {
        let ops = parse_transform_list("translate(3,4) rotate(30) scale(2,0.5)").unwrap();
        let composed = compose(&ops);
        let mut p = Point::new(6.0, -2.5);
        for op in &ops {
            p = op.matrix().apply(p);
        }
        let q = composed.apply(Point::new(6.0, -2.5));
        approx(q, p.x, p.y);
    }
}
