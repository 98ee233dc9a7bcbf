//! The render driver: one source, one target, one pipeline run.
//!
//! ```text
//! compose pipeline ─▶ target exists? ──yes (and not forced)──▶ Skipped
//!                           │ no
//!                           ▼
//!            read source ─▶ decode ─▶ handler ─▶ encode ─▶ delete target ─▶ save target
//! ```
//!
//! Everything up to and including encode happens in memory. The target is
//! only mutated once a complete encoded buffer exists, so a failure in
//! decode, a processor or the encoder leaves it exactly as it was.
//!
//! Delete-then-save is not atomic: if the process dies between the two
//! calls the target is left absent. Storage backends that can replace in one
//! step may do so inside `save`; the driver still issues the delete.
//!
//! Errors are returned, never logged here; events at `debug` trace the
//! short-circuit and the encode parameters.

use crate::imaging::{Codec, CodecError, RustCodec};
use crate::pipeline::{
    PipelineError, ProcessorRegistry, ProcessorSpec, RenderContext, compose, default_always,
};
use crate::storage::{Storage, StorageError, read_all};
use crate::types::Ppoi;
use image::ImageFormat;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
    #[error("Failed to decode '{name}': {source}")]
    Decode { name: String, source: CodecError },
    #[error("Failed to encode '{name}': {source}")]
    Encode { name: String, source: CodecError },
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// A named entry in some storage.
#[derive(Clone, Copy)]
pub struct Location<'a> {
    pub storage: &'a dyn Storage,
    pub name: &'a str,
}

impl<'a> Location<'a> {
    pub fn new(storage: &'a dyn Storage, name: &'a str) -> Self {
        Self { storage, name }
    }
}

impl std::fmt::Debug for Location<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Location").field(&self.name).finish()
    }
}

/// What a render call did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderOutcome {
    /// The target already existed and `force` was off; nothing was decoded.
    Skipped,
    Rendered {
        format: ImageFormat,
        width: u32,
        height: u32,
        bytes: usize,
    },
}

/// Renders targets with a codec, a processor registry and a fixed prefix.
///
/// The prefix (`always`) runs before every caller-supplied list; it defaults
/// to `autorotate, preprocess_jpeg, preprocess_gif, preserve_icc_profile`.
pub struct Renderer<'r, C = RustCodec> {
    codec: C,
    registry: &'r ProcessorRegistry,
    always: Vec<ProcessorSpec>,
}

impl<C: Codec> Renderer<'static, C> {
    /// A renderer over the process-wide registry.
    pub fn new(codec: C) -> Self {
        Self {
            codec,
            registry: ProcessorRegistry::global(),
            always: default_always(),
        }
    }
}

impl<'r, C: Codec> Renderer<'r, C> {
    pub fn with_registry<'s>(self, registry: &'s ProcessorRegistry) -> Renderer<'s, C> {
        Renderer {
            codec: self.codec,
            registry,
            always: self.always,
        }
    }

    /// Replace the fixed prefix. An empty list disables it.
    pub fn with_always(mut self, always: Vec<ProcessorSpec>) -> Self {
        self.always = always;
        self
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    pub fn registry(&self) -> &ProcessorRegistry {
        self.registry
    }

    pub fn always(&self) -> &[ProcessorSpec] {
        &self.always
    }

    /// Render `source` through `always` + `specs` into `target`.
    ///
    /// Without `force`, an existing target short-circuits to
    /// [`RenderOutcome::Skipped`] before the source is read. The output is
    /// encoded in the source's decoded format, whatever the names say.
    pub fn render(
        &self,
        source: Location<'_>,
        target: Location<'_>,
        specs: &[ProcessorSpec],
        ppoi: Ppoi,
        force: bool,
    ) -> Result<RenderOutcome, RenderError> {
        let handler = compose(self.registry, self.always.iter().chain(specs))?;

        if !force && target.storage.exists(target.name)? {
            tracing::debug!(rendition = target.name, "target exists, skipping");
            return Ok(RenderOutcome::Skipped);
        }

        let bytes = read_all(source.storage, source.name)?;
        let image = self
            .codec
            .decode(&bytes)
            .map_err(|source_err| RenderError::Decode {
                name: source.name.to_string(),
                source: source_err,
            })?;
        let format = image.format();

        let (image, context) = handler(image, RenderContext::new(ppoi))?;

        tracing::debug!(
            rendition = target.name,
            ?format,
            width = image.width(),
            height = image.height(),
            quality = context.save.quality.map(|q| q.value()),
            progressive = context.save.progressive,
            icc = context.save.icc_profile.is_some(),
            transparency = context.save.transparency,
            "encoding rendition"
        );
        let encoded = self
            .codec
            .encode(&image, format, &context.save)
            .map_err(|source_err| RenderError::Encode {
                name: target.name.to_string(),
                source: source_err,
            })?;

        target.storage.delete(target.name)?;
        target.storage.save(target.name, &encoded)?;

        Ok(RenderOutcome::Rendered {
            format,
            width: image.width(),
            height: image.height(),
            bytes: encoded.len(),
        })
    }
}

/// Render with [`RustCodec`] and the process-wide registry.
pub fn render(
    source: Location<'_>,
    target: Location<'_>,
    specs: &[ProcessorSpec],
    ppoi: Ppoi,
    force: bool,
) -> Result<RenderOutcome, RenderError> {
    Renderer::new(RustCodec::new()).render(source, target, specs, ppoi, force)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::codec::tests::{RecordedOp, RecordingCodec};
    use crate::imaging::{ImageBuffer, Quality};
    use crate::pipeline::{Handler, PipelineResult};
    use crate::storage::MemoryStorage;
    use crate::test_helpers::{RecordingStorage, jpeg_bytes, palette_gif_bytes};
    use serde_json::{Value, json};

    fn thumb(w: u32, h: u32) -> Vec<ProcessorSpec> {
        vec![ProcessorSpec::with_args("thumbnail", vec![json!([w, h])])]
    }

    fn jpeg_source() -> MemoryStorage {
        let storage = MemoryStorage::new();
        storage.save("cat.jpg", &jpeg_bytes(1000, 500)).unwrap();
        storage
    }

    fn failing_registry() -> ProcessorRegistry {
        let mut registry = ProcessorRegistry::with_builtins();
        registry
            .register("explode", |_next: Handler, _args: &[Value]| -> PipelineResult<Handler> {
                Ok(Box::new(
                    |_image: ImageBuffer,
                     _context: RenderContext|
                     -> PipelineResult<(ImageBuffer, RenderContext)> {
                        Err(PipelineError::processing("explode", "simulated failure"))
                    },
                ))
            })
            .unwrap();
        registry
    }

    #[test]
    fn renders_and_stores_target() {
        let storage = jpeg_source();
        let codec = RecordingCodec::new();
        let renderer = Renderer::new(&codec);
        let outcome = renderer
            .render(
                Location::new(&storage, "cat.jpg"),
                Location::new(&storage, "out/cat-thumb.jpg"),
                &thumb(300, 300),
                Ppoi::CENTER,
                false,
            )
            .unwrap();

        assert!(matches!(
            outcome,
            RenderOutcome::Rendered {
                format: ImageFormat::Jpeg,
                width: 300,
                height: 150,
                ..
            }
        ));
        let stored = storage.get("out/cat-thumb.jpg").unwrap();
        let decoded = RustCodec::new().decode(&stored).unwrap();
        assert_eq!(decoded.dimensions(), (300, 150));
    }

    #[test]
    fn jpeg_options_reach_the_encoder() {
        let storage = jpeg_source();
        let codec = RecordingCodec::new();
        Renderer::new(&codec)
            .render(
                Location::new(&storage, "cat.jpg"),
                Location::new(&storage, "out.jpg"),
                &[],
                Ppoi::CENTER,
                false,
            )
            .unwrap();

        let encode = codec
            .get_operations()
            .into_iter()
            .find_map(|op| match op {
                RecordedOp::Encode { options, .. } => Some(options),
                _ => None,
            })
            .unwrap();
        assert_eq!(encode.quality, Some(Quality::new(90)));
        assert!(encode.progressive);
    }

    #[test]
    fn second_render_is_a_no_op() {
        let storage = jpeg_source();
        let codec = RecordingCodec::new();
        let renderer = Renderer::new(&codec);
        let run = || {
            renderer
                .render(
                    Location::new(&storage, "cat.jpg"),
                    Location::new(&storage, "cat-thumb.jpg"),
                    &thumb(100, 100),
                    Ppoi::CENTER,
                    false,
                )
                .unwrap()
        };

        assert!(matches!(run(), RenderOutcome::Rendered { .. }));
        let first = storage.get("cat-thumb.jpg").unwrap();
        assert_eq!(run(), RenderOutcome::Skipped);
        assert_eq!(codec.decode_count(), 1);
        assert_eq!(storage.get("cat-thumb.jpg").unwrap(), first);
    }

    #[test]
    fn force_re_renders() {
        let storage = jpeg_source();
        storage.save("cat-thumb.jpg", b"stale").unwrap();
        let codec = RecordingCodec::new();
        let outcome = Renderer::new(&codec)
            .render(
                Location::new(&storage, "cat.jpg"),
                Location::new(&storage, "cat-thumb.jpg"),
                &thumb(100, 100),
                Ppoi::CENTER,
                true,
            )
            .unwrap();
        assert!(matches!(outcome, RenderOutcome::Rendered { .. }));
        assert_eq!(codec.decode_count(), 1);
        assert_ne!(storage.get("cat-thumb.jpg").unwrap(), b"stale");
    }

    #[test]
    fn processing_failure_leaves_target_untouched() {
        let source = jpeg_source();
        let target = RecordingStorage::new();
        target.inner().save("cat-thumb.jpg", b"previous").unwrap();
        let registry = failing_registry();
        let renderer = Renderer::new(RustCodec::new()).with_registry(&registry);

        let specs = vec![ProcessorSpec::new("explode")];
        let result = renderer.render(
            Location::new(&source, "cat.jpg"),
            Location::new(&target, "cat-thumb.jpg"),
            &specs,
            Ppoi::CENTER,
            true,
        );

        assert!(matches!(
            result,
            Err(RenderError::Pipeline(PipelineError::Processing { .. }))
        ));
        assert!(target.operations().is_empty());
        assert_eq!(target.inner().get("cat-thumb.jpg").unwrap(), b"previous");
    }

    #[test]
    fn unknown_processor_touches_no_storage() {
        let source = RecordingStorage::new();
        source.inner().save("cat.jpg", &jpeg_bytes(10, 10)).unwrap();
        let target = RecordingStorage::new();
        let codec = RecordingCodec::new();

        let specs = vec![ProcessorSpec::new("sharpen")];
        let result = Renderer::new(&codec).render(
            Location::new(&source, "cat.jpg"),
            Location::new(&target, "cat-sharp.jpg"),
            &specs,
            Ppoi::CENTER,
            false,
        );

        assert!(matches!(
            result,
            Err(RenderError::Pipeline(PipelineError::UnknownProcessor(name))) if name == "sharpen"
        ));
        assert!(source.operations().is_empty());
        assert!(target.operations().is_empty());
        assert_eq!(codec.decode_count(), 0);
    }

    #[test]
    fn undecodable_source_is_decode_error() {
        let storage = MemoryStorage::new();
        storage.save("notes.jpg", b"not an image").unwrap();
        let result = render(
            Location::new(&storage, "notes.jpg"),
            Location::new(&storage, "notes-thumb.jpg"),
            &thumb(10, 10),
            Ppoi::CENTER,
            false,
        );
        assert!(matches!(result, Err(RenderError::Decode { name, .. }) if name == "notes.jpg"));
        assert!(!storage.exists("notes-thumb.jpg").unwrap());
    }

    #[test]
    fn missing_source_is_storage_error() {
        let storage = MemoryStorage::new();
        let result = render(
            Location::new(&storage, "ghost.jpg"),
            Location::new(&storage, "ghost-thumb.jpg"),
            &[],
            Ppoi::CENTER,
            false,
        );
        assert!(matches!(
            result,
            Err(RenderError::Storage(StorageError::NotFound(_)))
        ));
    }

    #[test]
    fn gif_palette_survives_crop() {
        let storage = MemoryStorage::new();
        storage.save("dots.gif", &palette_gif_bytes()).unwrap();
        let codec = RustCodec::new();
        let source_palette = codec
            .decode(&palette_gif_bytes())
            .unwrap()
            .palette()
            .cloned();

        let specs = vec![ProcessorSpec::with_args("crop", vec![json!([4, 4])])];
        render(
            Location::new(&storage, "dots.gif"),
            Location::new(&storage, "dots-crop.gif"),
            &specs,
            Ppoi::CENTER,
            false,
        )
        .unwrap();

        let out = codec.decode(&storage.get("dots-crop.gif").unwrap()).unwrap();
        assert_eq!(out.format(), ImageFormat::Gif);
        assert_eq!(out.dimensions(), (4, 4));
        assert_eq!(out.palette().cloned(), source_palette);
        assert_eq!(out.metadata().transparency(), Some(3));
    }

    #[test]
    fn empty_always_skips_jpeg_fixups() {
        let storage = jpeg_source();
        let codec = RecordingCodec::new();
        Renderer::new(&codec)
            .with_always(Vec::new())
            .render(
                Location::new(&storage, "cat.jpg"),
                Location::new(&storage, "plain.jpg"),
                &[],
                Ppoi::CENTER,
                false,
            )
            .unwrap();
        let options = codec
            .get_operations()
            .into_iter()
            .find_map(|op| match op {
                RecordedOp::Encode { options, .. } => Some(options),
                _ => None,
            })
            .unwrap();
        assert_eq!(options.quality, None);
    }
}
