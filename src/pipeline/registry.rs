//! Name → factory registry for processors.
//!
//! # Lifecycle
//!
//! A registry is built by value ([`ProcessorRegistry::with_builtins`], then
//! [`register`](ProcessorRegistry::register) for custom processors) and either
//! passed to a [`Renderer`](crate::render::Renderer) directly or published
//! process-wide with [`install`](ProcessorRegistry::install).
//!
//! Publishing happens at most once. After that the registry is immutable, so
//! concurrent renders read it without locking. [`ProcessorRegistry::global`]
//! lazily installs the built-ins when nothing was installed explicitly; code
//! that wants custom processors globally must install before the first
//! render.

use super::processors;
use super::{Handler, PipelineError, PipelineResult};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, OnceLock};
use thiserror::Error;

/// Builds a processor's handler around the handler it delegates to.
pub type ProcessorFactory =
    Arc<dyn Fn(Handler, &[Value]) -> PipelineResult<Handler> + Send + Sync>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Processor '{0}' is already registered")]
    DuplicateProcessor(String),
    #[error("A global processor registry is already installed")]
    AlreadyInstalled,
}

static GLOBAL: OnceLock<ProcessorRegistry> = OnceLock::new();

/// Append-only mapping from processor name to factory.
#[derive(Clone, Default)]
pub struct ProcessorRegistry {
    factories: HashMap<String, ProcessorFactory>,
}

impl ProcessorRegistry {
    /// An empty registry. Most callers want [`with_builtins`](Self::with_builtins).
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every built-in processor.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for (name, factory) in processors::BUILTINS {
            registry
                .factories
                .insert((*name).to_string(), Arc::new(*factory));
        }
        registry
    }

    /// Add a named factory. Names are unique; re-registering fails.
    pub fn register<F>(&mut self, name: impl Into<String>, factory: F) -> Result<(), RegistryError>
    where
        F: Fn(Handler, &[Value]) -> PipelineResult<Handler> + Send + Sync + 'static,
    {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(RegistryError::DuplicateProcessor(name));
        }
        self.factories.insert(name, Arc::new(factory));
        Ok(())
    }

    /// Look up a factory by name.
    pub fn resolve(&self, name: &str) -> PipelineResult<&ProcessorFactory> {
        self.factories
            .get(name)
            .ok_or_else(|| PipelineError::UnknownProcessor(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Publish this registry process-wide. Fails if one is already installed,
    /// including the built-ins-only registry [`global`](Self::global) installs
    /// on first use.
    pub fn install(self) -> Result<&'static ProcessorRegistry, RegistryError> {
        GLOBAL
            .set(self)
            .map_err(|_| RegistryError::AlreadyInstalled)?;
        Ok(Self::global())
    }

    /// The process-wide registry.
    pub fn global() -> &'static ProcessorRegistry {
        GLOBAL.get_or_init(Self::with_builtins)
    }
}

impl fmt::Debug for ProcessorRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProcessorRegistry")
            .field("processors", &self.names())
            .finish()
    }
}
