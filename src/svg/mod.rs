//! SVG document parsing, clip resolution, and attribute patching.

mod clip;
mod document;

pub use clip::{
    clip_path_id, clip_points, crop_fraction, document_space_transform, find_clip_path,
    read_placement, transformed_dims,
};
pub use document::{AttrPatches, Document, Element};
