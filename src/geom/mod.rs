//! Geometry core: affine transforms, rect bounds and crop fractions.

mod rect;
mod transform;

pub use rect::{
    ClipFraction, Placement, RectBounds, distance_from_rect, parse_attr, scale_to_rect_fraction,
};
pub use transform::{Point, Transform, TransformOp, compose, parse_transform, parse_transform_list};
