//! # Renditions
//!
//! Point-of-interest aware image renditions. A rendition is a derived image
//! (thumbnail, square crop, poster) produced from a source by an ordered list
//! of named processors and written back next to the source.
//!
//! # Architecture: Composable Processor Pipelines
//!
//! A processor is a factory: given the next stage and its own arguments, it
//! returns a handler that may transform the image and the render context
//! before and after delegating. Pipelines are assembled back to front and run
//! front to back:
//!
//! ```text
//! specs:   [autorotate, preprocess_jpeg, ..., thumbnail:300x300]
//!
//! compose  identity ◀─ thumbnail ◀─ ... ◀─ preprocess_jpeg ◀─ autorotate
//! execute  autorotate ─▶ preprocess_jpeg ─▶ ... ─▶ thumbnail ─▶ identity
//! ```
//!
//! The render driver wraps one pipeline run in storage I/O:
//!
//! ```text
//! compose ─▶ exists? ─▶ read ─▶ decode ─▶ pipeline ─▶ encode ─▶ delete ─▶ save
//! ```
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | Processor registry, pipeline composition and the built-in processors |
//! | [`render`] | The render driver and [`Renderer`] |
//! | [`field`] | Format sets per source kind, memoized target names, parallel render of all formats |
//! | [`naming`] | Deterministic `__processed__` target names |
//! | [`imaging`] | Decoded image buffers, the [`Codec`] seam, crop and fit geometry |
//! | [`storage`] | Named byte storage: filesystem and in-memory backends |
//! | [`batch`] | Walk a directory and render every configured format of every source |
//! | [`config`] | `renditions.toml` loading, merging onto stock defaults, validation |
//! | [`types`] | [`Ppoi`], the primary point of interest |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Targets Are Content-Addressed
//!
//! A target name embeds a hash of the format, its processor list and the
//! point of interest. Changing any of them yields a new name, so "target
//! exists" is a sound reason to skip work without comparing timestamps.
//!
//! ## Output Format Follows the Source
//!
//! The encoder writes the format the source decoded as. A JPEG source stays a
//! JPEG and a palette GIF stays a palette GIF with its transparency index.
//!
//! ## Process-Wide Registry
//!
//! Processor names resolve through a registry. [`ProcessorRegistry::global`]
//! holds the built-ins unless the program installs its own registry first;
//! tests and embedders pass an explicit registry to [`Renderer::with_registry`].

pub mod batch;
pub mod config;
pub mod field;
pub mod imaging;
pub mod naming;
pub mod output;
pub mod pipeline;
pub mod render;
pub mod storage;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use field::{FieldError, FormatResult, ImageField, Renditions};
pub use imaging::{Codec, ImageBuffer, RustCodec};
pub use pipeline::{
    Handler, PipelineError, PipelineResult, ProcessorRegistry, ProcessorSpec, RenderContext,
    compose,
};
pub use render::{Location, RenderError, RenderOutcome, Renderer, render};
pub use storage::{FileSystemStorage, MemoryStorage, Storage, StorageError};
pub use types::{Ppoi, PpoiError};
