//! Where renditions are stored.
//!
//! A rendition lives next to its source, in a `__processed__` directory:
//!
//! ```text
//! photos/cat.jpg  --thumb-->  photos/__processed__/cat-thumb-3f2a9c0d41b7.jpg
//! ```
//!
//! The suffix is the first [`HASH_LEN`] hex characters of a SHA-256 over the
//! format name, the processor specs and the point of interest. Changing any
//! of them changes the name, so a stale rendition is never mistaken for the
//! current one. The extension is copied from the source name; the encoder
//! decides the actual format from the decoded source.

use crate::pipeline::ProcessorSpec;
use crate::types::Ppoi;
use sha2::{Digest, Sha256};

/// Directory, relative to the source, that holds its renditions.
pub const PROCESSED_DIR: &str = "__processed__";

/// Number of hex characters of the rendition hash kept in the name.
pub const HASH_LEN: usize = 12;

/// Extension of `name` including the leading dot, or `""` if it has none.
pub fn source_extension(name: &str) -> &str {
    let file = name.rsplit('/').next().unwrap_or(name);
    match file.rfind('.') {
        Some(0) | None => "",
        Some(dot) => &file[dot..],
    }
}

/// Hex digest identifying one format's output for one point of interest.
pub fn rendition_hash(format: &str, specs: &[ProcessorSpec], ppoi: Ppoi) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format.as_bytes());
    hasher.update(b"\0");
    // Serializing a Vec of specs cannot fail: every field is a string or JSON value.
    hasher.update(serde_json::to_vec(specs).unwrap_or_default());
    hasher.update(b"\0");
    hasher.update(ppoi.to_string().as_bytes());
    let mut hex = format!("{:x}", hasher.finalize());
    hex.truncate(HASH_LEN);
    hex
}

/// Storage name of the rendition of `source` for `format`.
pub fn rendition_name(source: &str, format: &str, specs: &[ProcessorSpec], ppoi: Ppoi) -> String {
    let (dir, file) = match source.rsplit_once('/') {
        Some((dir, file)) => (Some(dir), file),
        None => (None, source),
    };
    let ext = source_extension(file);
    let stem = &file[..file.len() - ext.len()];
    let hash = rendition_hash(format, specs, ppoi);
    let file = format!("{stem}-{format}-{hash}{ext}");
    match dir {
        Some(dir) => format!("{dir}/{PROCESSED_DIR}/{file}"),
        None => format!("{PROCESSED_DIR}/{file}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn thumb() -> Vec<ProcessorSpec> {
        vec![ProcessorSpec::with_args("thumbnail", vec![json!([300, 300])])]
    }

    #[test]
    fn extension_of_plain_and_nested_names() {
        assert_eq!(source_extension("cat.jpg"), ".jpg");
        assert_eq!(source_extension("a/b.c/cat.JPEG"), ".JPEG");
        assert_eq!(source_extension("a/b.c/README"), "");
        assert_eq!(source_extension(".hidden"), "");
    }

    #[test]
    fn name_layout() {
        let name = rendition_name("photos/cat.jpg", "thumb", &thumb(), Ppoi::CENTER);
        let hash = rendition_hash("thumb", &thumb(), Ppoi::CENTER);
        assert_eq!(hash.len(), HASH_LEN);
        assert_eq!(name, format!("photos/__processed__/cat-thumb-{hash}.jpg"));
    }

    #[test]
    fn name_without_directory() {
        let name = rendition_name("cat.png", "thumb", &thumb(), Ppoi::CENTER);
        assert!(name.starts_with("__processed__/cat-thumb-"));
        assert!(name.ends_with(".png"));
    }

    #[test]
    fn hash_changes_with_inputs() {
        let base = rendition_hash("thumb", &thumb(), Ppoi::CENTER);
        assert_eq!(base, rendition_hash("thumb", &thumb(), Ppoi::CENTER));
        assert_ne!(base, rendition_hash("square", &thumb(), Ppoi::CENTER));
        assert_ne!(base, rendition_hash("thumb", &[], Ppoi::CENTER));
        assert_ne!(
            base,
            rendition_hash("thumb", &thumb(), Ppoi::new(0.2, 0.5).unwrap())
        );
    }
}
