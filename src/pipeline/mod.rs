//! Composable processor pipelines.
//!
//! A pipeline is a list of [`ProcessorSpec`]s resolved against a
//! [`ProcessorRegistry`] into a single [`Handler`]. Each processor's factory
//! receives the handler it should delegate to and returns a handler wrapping
//! it, so a processor can:
//!
//! - transform its input, delegate, and return the result untouched;
//! - delegate, then post-process what came back (`preprocess_gif` restores
//!   the palette this way);
//! - return without delegating at all.
//!
//! ```text
//! specs:     [a, b, c]
//! build:     identity → c(identity) → b(c(..)) → a(b(..))      (reverse)
//! execute:   a → b → c → identity → c returns → b returns → a  (declared order)
//! ```
//!
//! Composition resolves every name and validates every argument list before
//! any image is touched; an unknown name fails the whole build.

pub mod processors;
pub mod registry;
pub mod spec;

pub use registry::{ProcessorFactory, ProcessorRegistry, RegistryError};
pub use spec::{ProcessorSpec, SpecError};

use crate::imaging::{EncodeOptions, ImageBuffer};
use crate::types::Ppoi;
use std::fmt;
use thiserror::Error;

/// Processors applied before any caller-supplied ones.
pub const ALWAYS: [&str; 4] = [
    "autorotate",
    "preprocess_jpeg",
    "preprocess_gif",
    "preserve_icc_profile",
];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Unknown processor '{0}'")]
    UnknownProcessor(String),
    #[error("Invalid arguments for processor '{processor}': {message}")]
    InvalidArguments { processor: String, message: String },
    #[error("Processor '{processor}' failed: {message}")]
    Processing { processor: String, message: String },
}

impl PipelineError {
    /// A runtime failure inside `processor`.
    pub fn processing(processor: &str, error: impl fmt::Display) -> Self {
        Self::Processing {
            processor: processor.to_string(),
            message: error.to_string(),
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

/// One composed stage: takes ownership of the image and context and hands
/// back the (possibly replaced) pair.
pub type Handler = Box<
    dyn Fn(ImageBuffer, RenderContext) -> PipelineResult<(ImageBuffer, RenderContext)>
        + Send
        + Sync,
>;

/// Per-render state threaded through every stage.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderContext {
    ppoi: Ppoi,
    /// Encode options accumulated by processors.
    pub save: EncodeOptions,
}

impl RenderContext {
    pub fn new(ppoi: Ppoi) -> Self {
        Self {
            ppoi,
            save: EncodeOptions::default(),
        }
    }

    pub fn ppoi(&self) -> Ppoi {
        self.ppoi
    }
}

/// The innermost handler: returns its inputs unchanged.
pub fn identity() -> Handler {
    Box::new(|image: ImageBuffer, context: RenderContext| Ok((image, context)))
}

/// The default fixed prefix as specs.
pub fn default_always() -> Vec<ProcessorSpec> {
    ALWAYS.iter().map(|&name| ProcessorSpec::new(name)).collect()
}

/// Compose `specs` into one handler that runs them in declared order.
pub fn compose<'a, I>(registry: &ProcessorRegistry, specs: I) -> PipelineResult<Handler>
where
    I: IntoIterator<Item = &'a ProcessorSpec>,
    I::IntoIter: DoubleEndedIterator,
{
    let mut handler = identity();
    for spec in specs.into_iter().rev() {
        let factory = registry.resolve(spec.name())?;
        handler = factory(handler, spec.args())?;
    }
    Ok(handler)
}
