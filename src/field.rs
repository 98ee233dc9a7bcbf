//! Image fields: a named set of rendition formats for one kind of source.
//!
//! An [`ImageField`] maps format names (`thumb`, `square`, ...) to processor
//! lists. For a concrete source it hands out:
//!
//! - target names, through the memoizing [`Renditions`] accessor;
//! - rendered targets, through [`ImageField::render_all`], which renders
//!   every format of one source in parallel.
//!
//! ```rust
//! use renditions::{ImageField, Ppoi, ProcessorSpec};
//!
//! let field = ImageField::new()
//!     .with_format("thumb", vec!["thumbnail:300x300".parse().unwrap()]);
//! let mut renditions = field.renditions("photos/cat.jpg", Ppoi::CENTER);
//! let name = renditions.get("thumb").unwrap().to_string();
//! assert!(name.starts_with("photos/__processed__/cat-thumb-"));
//! assert!(renditions.get("poster").is_err());
//! ```

use crate::imaging::Codec;
use crate::naming::rendition_name;
use crate::pipeline::ProcessorSpec;
use crate::render::{Location, RenderError, RenderOutcome, Renderer};
use crate::storage::Storage;
use crate::types::Ppoi;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FieldError {
    #[error("Unknown format '{0}'")]
    UnknownFormat(String),
}

/// Format name → processor list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageField {
    formats: BTreeMap<String, Vec<ProcessorSpec>>,
}

/// Result of rendering one format of a source.
#[derive(Debug)]
pub struct FormatResult {
    pub format: String,
    pub target: String,
    pub outcome: Result<RenderOutcome, RenderError>,
}

impl ImageField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_formats(formats: BTreeMap<String, Vec<ProcessorSpec>>) -> Self {
        Self { formats }
    }

    /// Add (or replace) a format.
    pub fn with_format(mut self, name: impl Into<String>, specs: Vec<ProcessorSpec>) -> Self {
        self.formats.insert(name.into(), specs);
        self
    }

    pub fn formats(&self) -> &BTreeMap<String, Vec<ProcessorSpec>> {
        &self.formats
    }

    pub fn specs(&self, format: &str) -> Result<&[ProcessorSpec], FieldError> {
        self.formats
            .get(format)
            .map(Vec::as_slice)
            .ok_or_else(|| FieldError::UnknownFormat(format.to_string()))
    }

    /// Target-name lookups for `source`, cached per format.
    pub fn renditions<'a>(&'a self, source: &'a str, ppoi: Ppoi) -> Renditions<'a> {
        Renditions {
            field: self,
            source,
            ppoi,
            names: HashMap::new(),
        }
    }

    /// Render every format of `source`, in parallel, into the same storage.
    ///
    /// One failing format does not stop the others; results come back in
    /// format-name order.
    pub fn render_all<C: Codec>(
        &self,
        renderer: &Renderer<'_, C>,
        storage: &dyn Storage,
        source: &str,
        ppoi: Ppoi,
        force: bool,
    ) -> Vec<FormatResult> {
        self.formats
            .par_iter()
            .map(|(format, specs)| {
                let target = rendition_name(source, format, specs, ppoi);
                let outcome = renderer.render(
                    Location::new(storage, source),
                    Location::new(storage, &target),
                    specs,
                    ppoi,
                    force,
                );
                FormatResult {
                    format: format.clone(),
                    target,
                    outcome,
                }
            })
            .collect()
    }
}

/// Memoizing format → target-name accessor for one source.
///
/// A name is computed on first request and returned from the cache after
/// that. The cache lives as long as the accessor; create a new one per lookup
/// session.
#[derive(Debug)]
pub struct Renditions<'a> {
    field: &'a ImageField,
    source: &'a str,
    ppoi: Ppoi,
    names: HashMap<String, String>,
}

impl Renditions<'_> {
    pub fn get(&mut self, format: &str) -> Result<&str, FieldError> {
        let (field, source, ppoi) = (self.field, self.source, self.ppoi);
        let name = match self.names.entry(format.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let specs = field.specs(format)?;
                entry.insert(rendition_name(source, format, specs, ppoi))
            }
        };
        Ok(name.as_str())
    }

    /// Number of formats resolved so far.
    pub fn cached(&self) -> usize {
        self.names.len()
    }
}
