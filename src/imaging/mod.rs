//! Image data, codec capability and rendition geometry: pure Rust.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Decode / encode** | `image` (+ `gif` for colour tables) via [`RustCodec`] |
//! | **EXIF orientation** | `kamadak-exif` |
//! | **Crop window** | [`crop_box`] (pure arithmetic) |
//! | **Bounding-box fit** | [`fit_within`] (pure arithmetic) |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for crop and resize geometry (unit testable)
//! - **Parameters**: Encode options accumulated by processors
//! - **Metadata**: EXIF / ICC / palette / transparency accessors
//! - **Codec**: [`Codec`] trait + [`RustCodec`]

mod calculations;
pub mod codec;
pub mod metadata;
mod params;
pub mod rust_codec;

pub use calculations::{CropBox, crop_box, fit_within, focus_pixel};
pub use codec::{Codec, CodecError, ImageBuffer};
pub use metadata::{ImageMetadata, MetadataError, Palette};
pub use params::{EncodeOptions, Quality};
pub use rust_codec::{RustCodec, supported_input_extensions};
