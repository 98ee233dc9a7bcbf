//! Codec capability and the in-memory image type threaded through pipelines.
//!
//! The [`Codec`] trait is the only place pixels enter or leave the crate:
//! `decode` turns source bytes into an [`ImageBuffer`], `encode` turns the
//! final buffer back into bytes. Everything in between works on decoded data.
//!
//! The production implementation is
//! [`RustCodec`](super::rust_codec::RustCodec), pure Rust, built on the
//! `image` crate.

use super::metadata::{ImageMetadata, Palette};
use super::params::EncodeOptions;
use image::{DynamicImage, ImageFormat};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unrecognized image format")]
    UnknownFormat,
    #[error("Decode failed: {0}")]
    Decode(String),
    #[error("Encode failed: {0}")]
    Encode(String),
    #[error("Unsupported: {0}")]
    Unsupported(String),
}

/// Decoded pixels plus the source format tag and metadata.
///
/// Ownership moves from stage to stage; a processor that replaces the pixels
/// consumes the old buffer and hands the new one onward.
#[derive(Debug, Clone)]
pub struct ImageBuffer {
    pixels: DynamicImage,
    format: ImageFormat,
    palette: Option<Palette>,
    metadata: ImageMetadata,
}

impl ImageBuffer {
    pub fn new(pixels: DynamicImage, format: ImageFormat) -> Self {
        Self {
            pixels,
            format,
            palette: None,
            metadata: ImageMetadata::default(),
        }
    }

    pub fn with_metadata(mut self, metadata: ImageMetadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn with_palette(mut self, palette: Option<Palette>) -> Self {
        self.palette = palette;
        self
    }

    pub fn pixels(&self) -> &DynamicImage {
        &self.pixels
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width(), self.height())
    }

    pub fn metadata(&self) -> &ImageMetadata {
        &self.metadata
    }

    pub fn metadata_mut(&mut self) -> &mut ImageMetadata {
        &mut self.metadata
    }

    /// Colour table the pixels are indexed against, if any.
    pub fn palette(&self) -> Option<&Palette> {
        self.palette.as_ref()
    }

    pub fn set_palette(&mut self, palette: Option<Palette>) {
        self.palette = palette;
    }

    /// Swap in new pixel data, keeping format and metadata.
    ///
    /// The palette is dropped: resampled or rotated pixels are no longer
    /// indexed against the source colour table.
    pub fn replace_pixels(self, pixels: DynamicImage) -> Self {
        Self {
            pixels,
            palette: None,
            ..self
        }
    }

    /// Convert pixels in place without touching the palette.
    pub fn map_pixels(self, f: impl FnOnce(DynamicImage) -> DynamicImage) -> Self {
        Self {
            pixels: f(self.pixels),
            ..self
        }
    }
}

/// Decoder/encoder capability the render driver calls into.
///
/// `Sync` so one codec can serve renders running on several threads.
pub trait Codec: Sync {
    /// Decode source bytes, capturing format tag and metadata.
    fn decode(&self, bytes: &[u8]) -> Result<ImageBuffer, CodecError>;

    /// Encode `image` as `format` with the accumulated options.
    fn encode(
        &self,
        image: &ImageBuffer,
        format: ImageFormat,
        options: &EncodeOptions,
    ) -> Result<Vec<u8>, CodecError>;
}

impl<C: Codec + ?Sized> Codec for &C {
    fn decode(&self, bytes: &[u8]) -> Result<ImageBuffer, CodecError> {
        (**self).decode(bytes)
    }

    fn encode(
        &self,
        image: &ImageBuffer,
        format: ImageFormat,
        options: &EncodeOptions,
    ) -> Result<Vec<u8>, CodecError> {
        (**self).encode(image, format, options)
    }
}
