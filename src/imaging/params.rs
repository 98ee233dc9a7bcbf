//! Encode-time parameters accumulated while a pipeline runs.
//!
//! Processors never encode anything themselves. They record *what* the final
//! encode should look like in [`EncodeOptions`] (the save context), and the
//! render driver hands the finished options to the [`Codec`](super::Codec).
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 90). Clamped on construction.
//! - [`EncodeOptions`]: Quality, progressive flag, ICC profile bytes and GIF transparency index.

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u8);

impl Quality {
    pub fn new(value: u8) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(90)
    }
}

/// Options applied when the final image is encoded.
///
/// Every field starts empty; an unset field means "encoder default".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Lossy quality. Only JPEG honours it.
    pub quality: Option<Quality>,
    /// Request a progressive JPEG.
    pub progressive: bool,
    /// ICC profile to embed, when the target encoder can carry one.
    pub icc_profile: Option<Vec<u8>>,
    /// Palette index written as the transparent colour of a GIF.
    pub transparency: Option<u8>,
}
