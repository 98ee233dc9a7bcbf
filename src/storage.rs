//! Named byte storage for sources and renditions.
//!
//! The render driver only ever calls the four [`Storage`] methods; where the
//! bytes live is up to the implementation:
//!
//! - [`FileSystemStorage`]: files under a root directory. Names are
//!   `/`-separated relative paths; parent directories are created on save.
//! - [`MemoryStorage`]: an in-process map, handy for tests and for callers
//!   that keep renditions in memory.
//!
//! `delete` of a name that does not exist succeeds. `save` overwrites.

use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Cursor, Read};
use std::path::{Component, Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("'{0}' not found in storage")]
    NotFound(String),
    #[error("Invalid storage name '{0}'")]
    InvalidName(String),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Byte storage addressed by name.
pub trait Storage: Send + Sync {
    fn exists(&self, name: &str) -> StorageResult<bool>;

    /// Open `name` for reading.
    fn open(&self, name: &str) -> StorageResult<Box<dyn Read + Send>>;

    /// Remove `name`. Removing a missing name is not an error.
    fn delete(&self, name: &str) -> StorageResult<()>;

    /// Write `bytes` under `name`, replacing any previous content.
    fn save(&self, name: &str, bytes: &[u8]) -> StorageResult<()>;
}

/// Reject empty, absolute and parent-escaping names.
fn validate_name(name: &str) -> StorageResult<&Path> {
    let path = Path::new(name);
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if name.is_empty() || escapes {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(path)
}

/// Files under a root directory.
#[derive(Debug, Clone)]
pub struct FileSystemStorage {
    root: PathBuf,
}

impl FileSystemStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Filesystem path backing `name`.
    pub fn path(&self, name: &str) -> StorageResult<PathBuf> {
        Ok(self.root.join(validate_name(name)?))
    }
}

impl Storage for FileSystemStorage {
    fn exists(&self, name: &str) -> StorageResult<bool> {
        Ok(self.path(name)?.is_file())
    }

    fn open(&self, name: &str) -> StorageResult<Box<dyn Read + Send>> {
        let path = self.path(name)?;
        match fs::File::open(&path) {
            Ok(file) => Ok(Box::new(io::BufReader::new(file))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StorageError::NotFound(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn delete(&self, name: &str) -> StorageResult<()> {
        match fs::remove_file(self.path(name)?) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }

    fn save(&self, name: &str, bytes: &[u8]) -> StorageResult<()> {
        let path = self.path(name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, bytes)?;
        Ok(())
    }
}

/// In-memory storage.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored bytes for `name`, if any.
    pub fn get(&self, name: &str) -> Option<Vec<u8>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
    }

    /// All stored names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect()
    }
}

impl Storage for MemoryStorage {
    fn exists(&self, name: &str) -> StorageResult<bool> {
        validate_name(name)?;
        Ok(self
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name))
    }

    fn open(&self, name: &str) -> StorageResult<Box<dyn Read + Send>> {
        validate_name(name)?;
        let bytes = self
            .get(name)
            .ok_or_else(|| StorageError::NotFound(name.to_string()))?;
        Ok(Box::new(Cursor::new(bytes)))
    }

    fn delete(&self, name: &str) -> StorageResult<()> {
        validate_name(name)?;
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name);
        Ok(())
    }

    fn save(&self, name: &str, bytes: &[u8]) -> StorageResult<()> {
        validate_name(name)?;
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string(), bytes.to_vec());
        Ok(())
    }
}

/// Read a whole entry into memory.
pub fn read_all(storage: &dyn Storage, name: &str) -> StorageResult<Vec<u8>> {
    let mut bytes = Vec::new();
    storage.open(name)?.read_to_end(&mut bytes)?;
    Ok(bytes)
}
