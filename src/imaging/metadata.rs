//! Source metadata carried alongside decoded pixels.
//!
//! The codec extracts these once at decode time; processors read them through
//! the accessors here:
//!
//! | Accessor | Source |
//! |---|---|
//! | [`ImageMetadata::orientation`] | EXIF tag 274 (`Orientation`), parsed with `kamadak-exif` |
//! | [`ImageMetadata::icc_profile`] | ICC profile chunk / APP2 segment |
//! | [`ImageMetadata::transparency`] | GIF graphic control extension |
//! | [`ImageBuffer::palette`](super::ImageBuffer::palette) | GIF local or global colour table |

use thiserror::Error;

/// Prefix some containers leave in front of the TIFF-structured EXIF payload.
const EXIF_HEADER: &[u8] = b"Exif\0\0";

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("Malformed EXIF data: {0}")]
    Exif(#[from] exif::Error),
}

/// Non-pixel information extracted from the source file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageMetadata {
    /// Raw EXIF payload (TIFF structure), if the container had one.
    pub exif: Option<Vec<u8>>,
    /// Embedded ICC colour profile.
    pub icc_profile: Option<Vec<u8>>,
    /// GIF transparent colour index.
    pub transparency: Option<u8>,
}

impl ImageMetadata {
    /// Read the EXIF orientation tag (274).
    ///
    /// `Ok(None)` when the image carries no EXIF block or the block has no
    /// orientation field. A block that cannot be parsed is an error.
    pub fn orientation(&self) -> Result<Option<u32>, MetadataError> {
        let Some(raw) = self.exif.as_deref() else {
            return Ok(None);
        };
        if raw.is_empty() {
            return Ok(None);
        }
        let tiff = raw.strip_prefix(EXIF_HEADER).unwrap_or(raw);
        let exif = exif::Reader::new().read_raw(tiff.to_vec())?;
        Ok(exif
            .get_field(exif::Tag::Orientation, exif::In::PRIMARY)
            .and_then(|field| field.value.get_uint(0)))
    }

    pub fn icc_profile(&self) -> Option<&[u8]> {
        self.icc_profile.as_deref()
    }

    pub fn transparency(&self) -> Option<u8> {
        self.transparency
    }
}

/// An indexed colour table: packed RGB triplets, at most 256 entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette(Vec<u8>);

impl Palette {
    /// Build from packed `r, g, b, r, g, b, ...` bytes.
    ///
    /// Returns `None` for an empty table, a length that is not a multiple of
    /// three, or more than 256 colours.
    pub fn from_rgb(bytes: Vec<u8>) -> Option<Self> {
        let colors = bytes.len() / 3;
        if bytes.is_empty() || bytes.len() % 3 != 0 || colors > 256 {
            return None;
        }
        Some(Self(bytes))
    }

    pub fn as_rgb(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len() / 3
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Index of the closest palette entry (squared RGB distance, first wins on ties).
    pub fn nearest_index(&self, rgb: [u8; 3]) -> u8 {
        let mut best = 0usize;
        let mut best_distance = u32::MAX;
        for (index, entry) in self.0.chunks_exact(3).enumerate() {
            let distance: u32 = entry
                .iter()
                .zip(rgb)
                .map(|(&a, b)| {
                    let d = a.abs_diff(b) as u32;
                    d * d
                })
                .sum();
            if distance < best_distance {
                best = index;
                best_distance = distance;
                if distance == 0 {
                    break;
                }
            }
        }
        best as u8
    }
}
