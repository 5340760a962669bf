//! Raster loading, cropping, downsampling and re-encoding.

mod codec;
mod source;

pub use codec::{crop_to_clip, encode_data_uri, limit_resolution};
pub use source::{LoadedImage, load_image};
