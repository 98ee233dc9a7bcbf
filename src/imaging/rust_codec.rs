//! Pure Rust codec: `image` for pixels, `gif` for colour tables.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, GIF, WebP, TIFF, BMP) | `image::ImageReader` with guessed format |
//! | ICC profile / raw EXIF | `image::ImageDecoder::{icc_profile, exif_metadata}` |
//! | GIF palette + transparency index | `gif::DecodeOptions` in indexed mode |
//! | Encode → JPEG (baseline) | `image::codecs::jpeg::JpegEncoder` (quality, ICC) |
//! | Encode → JPEG (progressive) | `jpeg_encoder::Encoder` (quality, ICC) |
//! | Encode → PNG / WebP | `image` encoders (ICC where supported) |
//! | Encode → GIF | `gif::Encoder`, pixels mapped onto the carried palette |
//! | Encode → anything else | `DynamicImage::write_to` |

use super::codec::{Codec, CodecError, ImageBuffer};
use super::metadata::{ImageMetadata, Palette};
use super::params::EncodeOptions;
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{
    ColorType, DynamicImage, ImageDecoder, ImageEncoder, ImageFormat, ImageReader, RgbaImage,
};
use std::borrow::Cow;
use std::io::Cursor;
use std::sync::LazyLock;

/// Quality used for JPEG when no processor asked for one.
const JPEG_DEFAULT_QUALITY: u8 = 75;

/// Speed passed to the GIF quantizer for images without a palette (1 = best, 30 = fastest).
const GIF_QUANTIZE_SPEED: i32 = 10;

const SOURCE_CANDIDATES: &[(&str, ImageFormat)] = &[
    ("jpg", ImageFormat::Jpeg),
    ("jpeg", ImageFormat::Jpeg),
    ("png", ImageFormat::Png),
    ("gif", ImageFormat::Gif),
    ("webp", ImageFormat::WebP),
    ("tif", ImageFormat::Tiff),
    ("tiff", ImageFormat::Tiff),
    ("bmp", ImageFormat::Bmp),
];

static SUPPORTED_EXTENSIONS: LazyLock<Vec<&'static str>> = LazyLock::new(|| {
    SOURCE_CANDIDATES
        .iter()
        .filter(|(_, fmt)| fmt.reading_enabled() && fmt.writing_enabled())
        .map(|(ext, _)| *ext)
        .collect()
});

/// File extensions this codec can both decode and re-encode.
pub fn supported_input_extensions() -> &'static [&'static str] {
    &SUPPORTED_EXTENSIONS
}

/// Pure Rust codec using the `image` crate ecosystem.
///
/// See the [module docs](self) for the crate-to-operation mapping.
#[derive(Debug, Default, Clone, Copy)]
pub struct RustCodec;

impl RustCodec {
    pub fn new() -> Self {
        Self
    }
}

fn decode_error(e: impl std::fmt::Display) -> CodecError {
    CodecError::Decode(e.to_string())
}

fn encode_error(e: impl std::fmt::Display) -> CodecError {
    CodecError::Encode(e.to_string())
}

/// Read the colour table and transparent index of the first GIF frame.
///
/// A frame-local table wins over the global one.
fn read_gif_palette(bytes: &[u8]) -> Result<(Option<Palette>, Option<u8>), CodecError> {
    let mut options = gif::DecodeOptions::new();
    options.set_color_output(gif::ColorOutput::Indexed);
    let mut decoder = options.read_info(Cursor::new(bytes)).map_err(decode_error)?;
    let global = decoder.global_palette().map(<[u8]>::to_vec);
    let (local, transparent) = match decoder.read_next_frame().map_err(decode_error)? {
        Some(frame) => (frame.palette.clone(), frame.transparent),
        None => (None, None),
    };
    Ok((local.or(global).and_then(Palette::from_rgb), transparent))
}

/// Hand the ICC profile to an encoder; encoders that cannot embed one are skipped.
fn attach_icc(encoder: &mut impl ImageEncoder, options: &EncodeOptions, format: ImageFormat) {
    if let Some(icc) = &options.icc_profile {
        if encoder.set_icc_profile(icc.clone()).is_err() {
            tracing::debug!(?format, "encoder cannot embed ICC profile, dropping it");
        }
    }
}

fn encode_jpeg(
    image: &ImageBuffer,
    options: &EncodeOptions,
    buf: &mut Vec<u8>,
) -> Result<(), CodecError> {
    let pixels = if matches!(image.pixels().color(), ColorType::L8 | ColorType::Rgb8) {
        Cow::Borrowed(image.pixels())
    } else {
        Cow::Owned(DynamicImage::ImageRgb8(image.pixels().to_rgb8()))
    };
    let quality = options
        .quality
        .map(|q| q.value())
        .unwrap_or(JPEG_DEFAULT_QUALITY);
    if options.progressive {
        return encode_progressive_jpeg(&pixels, quality, options, buf);
    }
    let mut encoder = JpegEncoder::new_with_quality(buf, quality);
    attach_icc(&mut encoder, options, ImageFormat::Jpeg);
    encoder
        .write_image(
            pixels.as_bytes(),
            pixels.width(),
            pixels.height(),
            pixels.color().into(),
        )
        .map_err(encode_error)
}

/// `image`'s JPEG encoder is baseline-only; progressive scans go through `jpeg-encoder`.
fn encode_progressive_jpeg(
    pixels: &DynamicImage,
    quality: u8,
    options: &EncodeOptions,
    buf: &mut Vec<u8>,
) -> Result<(), CodecError> {
    let color = match pixels.color() {
        ColorType::L8 => jpeg_encoder::ColorType::Luma,
        _ => jpeg_encoder::ColorType::Rgb,
    };
    let width = u16::try_from(pixels.width()).map_err(encode_error)?;
    let height = u16::try_from(pixels.height()).map_err(encode_error)?;
    let mut encoder = jpeg_encoder::Encoder::new(buf, quality);
    encoder.set_progressive(true);
    if let Some(icc) = &options.icc_profile {
        encoder.add_icc_profile(icc).map_err(encode_error)?;
    }
    encoder
        .encode(pixels.as_bytes(), width, height, color)
        .map_err(encode_error)
}

fn encode_png(
    image: &ImageBuffer,
    options: &EncodeOptions,
    buf: &mut Vec<u8>,
) -> Result<(), CodecError> {
    let pixels = match image.pixels().color() {
        ColorType::Rgb32F | ColorType::Rgba32F => {
            Cow::Owned(DynamicImage::ImageRgba16(image.pixels().to_rgba16()))
        }
        _ => Cow::Borrowed(image.pixels()),
    };
    let mut encoder = PngEncoder::new(buf);
    attach_icc(&mut encoder, options, ImageFormat::Png);
    encoder
        .write_image(
            pixels.as_bytes(),
            pixels.width(),
            pixels.height(),
            pixels.color().into(),
        )
        .map_err(encode_error)
}

fn encode_webp(
    image: &ImageBuffer,
    options: &EncodeOptions,
    buf: &mut Vec<u8>,
) -> Result<(), CodecError> {
    let pixels = if image.pixels().color().has_alpha() {
        DynamicImage::ImageRgba8(image.pixels().to_rgba8())
    } else {
        DynamicImage::ImageRgb8(image.pixels().to_rgb8())
    };
    let mut encoder = WebPEncoder::new_lossless(buf);
    attach_icc(&mut encoder, options, ImageFormat::WebP);
    encoder
        .write_image(
            pixels.as_bytes(),
            pixels.width(),
            pixels.height(),
            pixels.color().into(),
        )
        .map_err(encode_error)
}

/// Map RGBA pixels onto palette indices. Fully transparent pixels take the
/// transparency index when one is set.
fn index_pixels(rgba: &RgbaImage, palette: &Palette, transparency: Option<u8>) -> Vec<u8> {
    rgba.pixels()
        .map(|p| {
            let [r, g, b, a] = p.0;
            match transparency {
                Some(index) if a == 0 => index,
                _ => palette.nearest_index([r, g, b]),
            }
        })
        .collect()
}

fn encode_gif(
    image: &ImageBuffer,
    options: &EncodeOptions,
    buf: &mut Vec<u8>,
) -> Result<(), CodecError> {
    let too_large = || {
        CodecError::Unsupported(format!(
            "GIF dimensions {}x{} exceed 65535",
            image.width(),
            image.height()
        ))
    };
    let width = u16::try_from(image.width()).map_err(|_| too_large())?;
    let height = u16::try_from(image.height()).map_err(|_| too_large())?;
    let rgba = image.pixels().to_rgba8();

    let (frame, global) = match image.palette() {
        Some(palette) => {
            let mut frame = gif::Frame::default();
            frame.width = width;
            frame.height = height;
            frame.buffer = Cow::Owned(index_pixels(&rgba, palette, options.transparency));
            frame.transparent = options.transparency;
            (frame, palette.as_rgb())
        }
        None => {
            let mut raw = rgba.into_raw();
            let frame = gif::Frame::from_rgba_speed(width, height, &mut raw, GIF_QUANTIZE_SPEED);
            (frame, &[][..])
        }
    };

    let mut encoder = gif::Encoder::new(buf, width, height, global).map_err(encode_error)?;
    encoder.write_frame(&frame).map_err(encode_error)?;
    encoder.into_inner()?;
    Ok(())
}

impl Codec for RustCodec {
    fn decode(&self, bytes: &[u8]) -> Result<ImageBuffer, CodecError> {
        let reader = ImageReader::new(Cursor::new(bytes)).with_guessed_format()?;
        let format = reader.format().ok_or(CodecError::UnknownFormat)?;
        let mut decoder = reader.into_decoder().map_err(decode_error)?;
        let icc_profile = decoder.icc_profile().map_err(decode_error)?;
        let exif = decoder.exif_metadata().map_err(decode_error)?;
        let pixels = DynamicImage::from_decoder(decoder).map_err(decode_error)?;

        let (palette, transparency) = if format == ImageFormat::Gif {
            read_gif_palette(bytes)?
        } else {
            (None, None)
        };

        tracing::trace!(
            ?format,
            width = pixels.width(),
            height = pixels.height(),
            has_icc = icc_profile.is_some(),
            has_exif = exif.is_some(),
            "decoded source"
        );

        Ok(ImageBuffer::new(pixels, format)
            .with_palette(palette)
            .with_metadata(ImageMetadata {
                exif,
                icc_profile,
                transparency,
            }))
    }

    fn encode(
        &self,
        image: &ImageBuffer,
        format: ImageFormat,
        options: &EncodeOptions,
    ) -> Result<Vec<u8>, CodecError> {
        let mut buf = Vec::new();
        match format {
            ImageFormat::Jpeg => encode_jpeg(image, options, &mut buf)?,
            ImageFormat::Png => encode_png(image, options, &mut buf)?,
            ImageFormat::WebP => encode_webp(image, options, &mut buf)?,
            ImageFormat::Gif => encode_gif(image, options, &mut buf)?,
            other if other.writing_enabled() => image
                .pixels()
                .write_to(&mut Cursor::new(&mut buf), other)
                .map_err(encode_error)?,
            other => {
                return Err(CodecError::Unsupported(format!(
                    "no encoder for {other:?}"
                )));
            }
        }
        Ok(buf)
    }
}
