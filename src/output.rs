//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Render
//!
//! ```text
//! photos/__processed__/cat-thumb-3f2a9c0d41b7.jpg: 300x150 jpg, 18342 bytes
//! photos/__processed__/cat-thumb-3f2a9c0d41b7.jpg: exists, skipped
//! ```
//!
//! ## Build
//!
//! ```text
//! photos/cat.jpg
//!     square → photos/__processed__/cat-square-08d1c2e4aa90.jpg: 200x200 jpg, 9120 bytes
//!     thumb → photos/__processed__/cat-thumb-3f2a9c0d41b7.jpg: exists, skipped
//!     poster: error: Unknown processor 'sharpen'
//! ```
//!
//! # Architecture
//!
//! Each output has a `format_*` function (returns `String` or `Vec<String>`)
//! for testability and, where the CLI needs one, a `print_*` wrapper that
//! writes to stdout. Format functions are pure: no I/O, no side effects.

use crate::batch::BatchEvent;
use crate::render::RenderOutcome;

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Describe what happened to one target.
pub fn format_outcome(outcome: &RenderOutcome) -> String {
    match outcome {
        RenderOutcome::Skipped => "exists, skipped".to_string(),
        RenderOutcome::Rendered {
            format,
            width,
            height,
            bytes,
        } => {
            let name = format.extensions_str().first().copied().unwrap_or("image");
            format!("{width}x{height} {name}, {bytes} bytes")
        }
    }
}

/// One line for a single `render` invocation.
pub fn format_render_output(target: &str, outcome: &RenderOutcome) -> String {
    format!("{target}: {}", format_outcome(outcome))
}

/// Source header followed by one indented line per format.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    let mut lines = vec![event.source.clone()];
    for result in &event.results {
        let line = match &result.outcome {
            Ok(outcome) => format!(
                "{}{} → {}: {}",
                indent(1),
                result.format,
                result.target,
                format_outcome(outcome)
            ),
            Err(e) => format!("{}{}: error: {}", indent(1), result.format, e),
        };
        lines.push(line);
    }
    lines
}

/// Registered processor names, one per line.
pub fn format_processors(names: &[&str]) -> Vec<String> {
    let mut lines = vec!["Processors".to_string()];
    lines.extend(names.iter().map(|name| format!("{}{name}", indent(1))));
    lines
}

pub fn print_processors(names: &[&str]) {
    for line in format_processors(names) {
        println!("{}", line);
    }
}
