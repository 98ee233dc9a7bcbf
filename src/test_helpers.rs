//! Shared test utilities for the renditions test suite.
//!
//! Synthetic images are generated in code (no binary fixtures), and
//! [`RecordingStorage`] records every storage call so tests can assert that
//! nothing touched a target.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let storage = RecordingStorage::new();
//! storage.inner().save("cat.jpg", &jpeg_bytes(200, 100)).unwrap();
//! // ... render ...
//! assert!(storage.operations().is_empty());
//! ```

use std::io::{Cursor, Read};
use std::sync::Mutex;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};

use crate::storage::{MemoryStorage, Storage, StorageResult};

// =========================================================================
// Synthetic images
// =========================================================================

/// RGB image with a smooth colour gradient, so resamples are distinguishable.
pub fn gradient(width: u32, height: u32) -> DynamicImage {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    });
    DynamicImage::ImageRgb8(img)
}

/// Blue RGBA image with a single red pixel at the top-left corner.
///
/// Where the red pixel ends up tells which way an image was rotated.
pub fn marked(width: u32, height: u32) -> DynamicImage {
    let mut img = RgbaImage::from_pixel(width, height, Rgba([0, 0, 255, 255]));
    img.put_pixel(0, 0, Rgba([255, 0, 0, 255]));
    DynamicImage::ImageRgba8(img)
}

/// A baseline JPEG of [`gradient`].
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut buf = Vec::new();
    gradient(width, height)
        .write_to(&mut Cursor::new(&mut buf), ImageFormat::Jpeg)
        .unwrap();
    buf
}

/// Colours of [`palette_gif_bytes`]: black, red, green, white.
pub const GIF_PALETTE: [u8; 12] = [0, 0, 0, 255, 0, 0, 0, 255, 0, 255, 255, 255];

/// Index of the transparent colour in [`palette_gif_bytes`].
pub const GIF_TRANSPARENT: u8 = 3;

/// An 8x8 single-frame GIF with a 4-colour global palette and index 3 transparent.
pub fn palette_gif_bytes() -> Vec<u8> {
    let (width, height) = (8u16, 8u16);
    let indices: Vec<u8> = (0..width * height)
        .map(|i| {
            let (x, y) = (i % width, i / width);
            match (x < width / 2, y < height / 2) {
                (true, true) => 0,
                (false, true) => 1,
                (true, false) => 2,
                (false, false) => GIF_TRANSPARENT,
            }
        })
        .collect();

    let mut frame = gif::Frame::default();
    frame.width = width;
    frame.height = height;
    frame.buffer = indices.into();
    frame.transparent = Some(GIF_TRANSPARENT);

    let mut buf = Vec::new();
    {
        let mut encoder = gif::Encoder::new(&mut buf, width, height, &GIF_PALETTE).unwrap();
        encoder.write_frame(&frame).unwrap();
    }
    buf
}

/// A minimal little-endian TIFF block holding only an Orientation (274) tag.
pub fn exif_with_orientation(orientation: u16) -> Vec<u8> {
    let mut tiff = Vec::new();
    tiff.extend_from_slice(b"II");
    tiff.extend_from_slice(&42u16.to_le_bytes());
    tiff.extend_from_slice(&8u32.to_le_bytes()); // first IFD offset
    tiff.extend_from_slice(&1u16.to_le_bytes()); // entry count
    tiff.extend_from_slice(&0x0112u16.to_le_bytes()); // Orientation
    tiff.extend_from_slice(&3u16.to_le_bytes()); // SHORT
    tiff.extend_from_slice(&1u32.to_le_bytes()); // count
    tiff.extend_from_slice(&orientation.to_le_bytes());
    tiff.extend_from_slice(&[0, 0]); // value padding
    tiff.extend_from_slice(&0u32.to_le_bytes()); // no next IFD
    tiff
}

// =========================================================================
// Recording storage
// =========================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageOp {
    Exists(String),
    Open(String),
    Delete(String),
    Save(String),
}

/// [`MemoryStorage`] wrapper that records every trait call.
/// Uses Mutex (not RefCell) so it is Sync and satisfies the `Storage` bound.
#[derive(Default)]
pub struct RecordingStorage {
    inner: MemoryStorage,
    operations: Mutex<Vec<StorageOp>>,
}

impl RecordingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// The wrapped storage; calls through it are not recorded.
    pub fn inner(&self) -> &MemoryStorage {
        &self.inner
    }

    pub fn operations(&self) -> Vec<StorageOp> {
        self.operations.lock().unwrap().clone()
    }

    fn record(&self, op: StorageOp) {
        self.operations.lock().unwrap().push(op);
    }
}

impl Storage for RecordingStorage {
    fn exists(&self, name: &str) -> StorageResult<bool> {
        self.record(StorageOp::Exists(name.to_string()));
        self.inner.exists(name)
    }

    fn open(&self, name: &str) -> StorageResult<Box<dyn Read + Send>> {
        self.record(StorageOp::Open(name.to_string()));
        self.inner.open(name)
    }

    fn delete(&self, name: &str) -> StorageResult<()> {
        self.record(StorageOp::Delete(name.to_string()));
        self.inner.delete(name)
    }

    fn save(&self, name: &str, bytes: &[u8]) -> StorageResult<()> {
        self.record(StorageOp::Save(name.to_string()));
        self.inner.save(name, bytes)
    }
}

// =========================================================================
// Self-checks
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_storage_records_in_order() {
        let storage = RecordingStorage::new();
        storage.save("a", b"1").unwrap();
        storage.exists("a").unwrap();
        storage.delete("a").unwrap();
        assert_eq!(
            storage.operations(),
            vec![
                StorageOp::Save("a".into()),
                StorageOp::Exists("a".into()),
                StorageOp::Delete("a".into()),
            ]
        );
    }

    #[test]
    fn exif_fixture_is_parseable() {
        let exif = exif::Reader::new()
            .read_raw(exif_with_orientation(3))
            .unwrap();
        let field = exif
            .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
            .unwrap();
        assert_eq!(field.value.get_uint(0), Some(3));
    }
}
