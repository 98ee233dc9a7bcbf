//! Batch rendering of a directory tree.
//!
//! Walks a root directory, picks every file the codec can read and write,
//! and renders every configured format for each of them:
//!
//! ```text
//! photos/
//! ├── renditions.toml
//! ├── cat.jpg
//! ├── trip/dog.png
//! └── __processed__/              ← outputs; never walked as sources
//!     ├── cat-thumb-3f2a9c0d41b7.jpg
//!     └── ...
//! ```
//!
//! Sources are rendered in parallel with rayon, and each source's formats
//! are themselves rendered in parallel by [`ImageField::render_all`]. One
//! failing rendition never stops the batch; failures are counted and
//! reported through the event channel.

use crate::config::RenditionsConfig;
use crate::field::{FormatResult, ImageField};
use crate::imaging::{Codec, supported_input_extensions};
use crate::naming::PROCESSED_DIR;
use crate::render::{RenderOutcome, Renderer};
use crate::storage::FileSystemStorage;
use rayon::prelude::*;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("Directory walk failed: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("Path is not valid UTF-8: {0}")]
    NonUtf8Path(PathBuf),
}

/// Sent once per source after all of its formats are done.
#[derive(Debug)]
pub struct BatchEvent {
    pub source: String,
    pub results: Vec<FormatResult>,
}

/// Totals over a whole batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub sources: usize,
    pub rendered: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchSummary {
    fn record(&mut self, results: &[FormatResult]) {
        self.sources += 1;
        for result in results {
            match result.outcome {
                Ok(RenderOutcome::Rendered { .. }) => self.rendered += 1,
                Ok(RenderOutcome::Skipped) => self.skipped += 1,
                Err(_) => self.failed += 1,
            }
        }
    }

    fn merge(mut self, other: Self) -> Self {
        self.sources += other.sources;
        self.rendered += other.rendered;
        self.skipped += other.skipped;
        self.failed += other.failed;
        self
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rendered, {} skipped, {} failed ({} sources)",
            self.rendered, self.skipped, self.failed, self.sources
        )
    }
}

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            supported_input_extensions()
                .iter()
                .any(|ext| ext.eq_ignore_ascii_case(e))
        })
        .unwrap_or(false)
}

/// Storage names (relative, `/`-separated, sorted) of every renderable source under `root`.
pub fn find_sources(root: &Path) -> Result<Vec<String>, BatchError> {
    let walker = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.file_name() != PROCESSED_DIR);
    let mut sources = Vec::new();
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_supported(entry.path()) {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let parts = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect::<Option<Vec<_>>>()
            .ok_or_else(|| BatchError::NonUtf8Path(entry.path().to_path_buf()))?;
        sources.push(parts.join("/"));
    }
    sources.sort();
    Ok(sources)
}

/// Render every configured format of every source under `root`.
///
/// Outputs go into `__processed__` directories next to their sources. When
/// `events` is given, one [`BatchEvent`] is sent per finished source.
pub fn build<C: Codec>(
    root: &Path,
    config: &RenditionsConfig,
    renderer: &Renderer<'_, C>,
    events: Option<Sender<BatchEvent>>,
) -> Result<BatchSummary, BatchError> {
    let sources = find_sources(root)?;
    let field: ImageField = config.field();
    let storage = FileSystemStorage::new(root);
    tracing::debug!(
        root = %root.display(),
        sources = sources.len(),
        formats = field.formats().len(),
        "starting batch"
    );

    let summary = sources
        .par_iter()
        .map(|source| {
            let results = field.render_all(renderer, &storage, source, config.ppoi, config.force);
            let mut summary = BatchSummary::default();
            summary.record(&results);
            if let Some(tx) = &events {
                // A closed receiver only means nobody is listening.
                tx.send(BatchEvent {
                    source: source.clone(),
                    results,
                })
                .ok();
            }
            summary
        })
        .reduce(BatchSummary::default, BatchSummary::merge);
    Ok(summary)
}
