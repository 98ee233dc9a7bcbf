//! Built-in processors.
//!
//! Each factory takes the handler it wraps plus its positional arguments and
//! returns a new handler. Every built-in delegates exactly once:
//!
//! | Processor | Applies to | Effect | Delegation |
//! |---|---|---|---|
//! | `autorotate` | images with EXIF orientation 3, 6 or 8 | rotate upright | after rotating |
//! | `preprocess_jpeg` | JPEG sources | quality 90, progressive, RGB pixels | after mutation |
//! | `preprocess_gif` | GIF sources | carry transparency index, restore palette | first, then restore |
//! | `preserve_icc_profile` | any | carry ICC profile to the encoder | after capture |
//! | `thumbnail` | any, args `(max_w, max_h)` | shrink to fit, keep aspect | the resized copy |
//! | `crop` | any, args `(w, h)` | point-of-interest crop, then resize | the cropped copy |

use super::{Handler, PipelineError, PipelineResult, RenderContext};
use crate::imaging::{ImageBuffer, Quality, crop_box, fit_within};
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, ImageFormat};
use serde_json::Value;

/// Resampling filter for every resize (bicubic).
const RESAMPLE_FILTER: FilterType = FilterType::CatmullRom;

/// JPEG quality requested by `preprocess_jpeg`.
const JPEG_QUALITY: u8 = 90;

type Factory = fn(Handler, &[Value]) -> PipelineResult<Handler>;

/// Built-in processors in registration order.
pub(crate) const BUILTINS: &[(&str, Factory)] = &[
    ("autorotate", autorotate),
    ("preprocess_jpeg", preprocess_jpeg),
    ("preprocess_gif", preprocess_gif),
    ("preserve_icc_profile", preserve_icc_profile),
    ("thumbnail", thumbnail),
    ("crop", crop),
];

/// Quarter turns needed to display an image upright, counter-clockwise.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rotation {
    Ccw90,
    Ccw180,
    Ccw270,
}

impl Rotation {
    fn from_exif(orientation: u32) -> Option<Self> {
        match orientation {
            3 => Some(Self::Ccw180),
            6 => Some(Self::Ccw270),
            8 => Some(Self::Ccw90),
            _ => None,
        }
    }

    fn apply(self, pixels: DynamicImage) -> DynamicImage {
        // image's rotate* helpers turn clockwise
        match self {
            Self::Ccw90 => pixels.rotate270(),
            Self::Ccw180 => pixels.rotate180(),
            Self::Ccw270 => pixels.rotate90(),
        }
    }
}

/// Extract a `(width, height)` pair from `[[w, h]]` or `[w, h]`.
///
/// Both values must be positive integers that fit in `u32`.
pub(crate) fn size_arg(processor: &str, args: &[Value]) -> PipelineResult<(u32, u32)> {
    let invalid = |message: String| PipelineError::InvalidArguments {
        processor: processor.to_string(),
        message,
    };
    let pair = match args {
        [Value::Array(inner)] => inner.as_slice(),
        [_, _] => args,
        _ => {
            return Err(invalid(format!(
                "expected a (width, height) pair, got {}",
                Value::Array(args.to_vec())
            )));
        }
    };
    let dimension = |value: &Value| {
        value
            .as_u64()
            .and_then(|v| u32::try_from(v).ok())
            .filter(|&v| v > 0)
            .ok_or_else(|| invalid(format!("{value} is not a positive pixel size")))
    };
    match pair {
        [w, h] => Ok((dimension(w)?, dimension(h)?)),
        _ => Err(invalid(format!(
            "expected exactly two dimensions, got {}",
            pair.len()
        ))),
    }
}

/// Rotate according to EXIF orientation (tag 274).
///
/// Only the pure rotations are handled: 3 → 180°, 6 → 270°, 8 → 90°
/// (counter-clockwise). Mirrored orientations and images without EXIF pass
/// through untouched.
pub fn autorotate(next: Handler, _args: &[Value]) -> PipelineResult<Handler> {
    Ok(Box::new(move |image: ImageBuffer, context: RenderContext| {
        let orientation = image
            .metadata()
            .orientation()
            .map_err(|e| PipelineError::processing("autorotate", e))?;
        let Some(rotation) = orientation.and_then(Rotation::from_exif) else {
            return next(image, context);
        };
        tracing::debug!(?orientation, ?rotation, "autorotate");
        // A rotation only moves pixels, so palette indices stay valid.
        let mut image = image.map_pixels(|p| rotation.apply(p));
        image.metadata_mut().exif = None;
        next(image, context)
    }))
}

/// JPEG sources: encode at quality 90, progressive, from RGB pixels.
pub fn preprocess_jpeg(next: Handler, _args: &[Value]) -> PipelineResult<Handler> {
    Ok(Box::new(move |image: ImageBuffer, mut context: RenderContext| {
        if image.format() != ImageFormat::Jpeg {
            return next(image, context);
        }
        context.save.quality = Some(Quality::new(JPEG_QUALITY));
        context.save.progressive = true;
        let image = if image.pixels().color() == ColorType::Rgb8 {
            image
        } else {
            image.map_pixels(|p| DynamicImage::ImageRgb8(p.to_rgb8()))
        };
        next(image, context)
    }))
}

/// GIF sources: carry the transparency index and restore the palette.
///
/// The palette is captured before delegating and put back on whatever image
/// the rest of the chain returns, since crops and resizes drop it.
pub fn preprocess_gif(next: Handler, _args: &[Value]) -> PipelineResult<Handler> {
    Ok(Box::new(move |image: ImageBuffer, mut context: RenderContext| {
        if image.format() != ImageFormat::Gif {
            return next(image, context);
        }
        if let Some(index) = image.metadata().transparency() {
            context.save.transparency = Some(index);
        }
        let palette = image.palette().cloned();
        let (mut image, context) = next(image, context)?;
        if palette.is_some() {
            image.set_palette(palette);
        }
        Ok((image, context))
    }))
}

/// Carry the source ICC profile through to the encoder.
pub fn preserve_icc_profile(next: Handler, _args: &[Value]) -> PipelineResult<Handler> {
    Ok(Box::new(move |image: ImageBuffer, mut context: RenderContext| {
        context.save.icc_profile = image.metadata().icc_profile().map(<[u8]>::to_vec);
        next(image, context)
    }))
}

/// Shrink to fit inside `(max_width, max_height)`, preserving aspect ratio.
pub fn thumbnail(next: Handler, args: &[Value]) -> PipelineResult<Handler> {
    let bounds = size_arg("thumbnail", args)?;
    Ok(Box::new(move |image: ImageBuffer, context: RenderContext| {
        let size = fit_within(image.dimensions(), bounds);
        if size == image.dimensions() {
            return next(image, context);
        }
        tracing::debug!(from = ?image.dimensions(), to = ?size, "thumbnail");
        let pixels = image.pixels().resize_exact(size.0, size.1, RESAMPLE_FILTER);
        next(image.replace_pixels(pixels), context)
    }))
}

/// Crop to the target aspect ratio around the point of interest, then resize
/// to exactly `(width, height)`.
pub fn crop(next: Handler, args: &[Value]) -> PipelineResult<Handler> {
    let target = size_arg("crop", args)?;
    Ok(Box::new(move |image: ImageBuffer, context: RenderContext| {
        let window = crop_box(image.dimensions(), target, context.ppoi());
        tracing::debug!(
            source = ?image.dimensions(),
            ?target,
            ?window,
            ppoi = %context.ppoi(),
            "crop"
        );
        if window.width() == 0 || window.height() == 0 {
            return Err(PipelineError::processing(
                "crop",
                format!(
                    "{}x{} source has no {}x{} window",
                    image.width(),
                    image.height(),
                    target.0,
                    target.1
                ),
            ));
        }
        let pixels = image
            .pixels()
            .crop_imm(window.left, window.top, window.width(), window.height())
            .resize_exact(target.0, target.1, RESAMPLE_FILTER);
        next(image.replace_pixels(pixels), context)
    }))
}
