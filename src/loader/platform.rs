//! Platform asset access for the loader thread.
//!
//! Hosts often need per-thread setup before a thread may touch assets (a VM
//! attachment, a thread-local class loader). A [`PlatformBinding`] performs
//! that setup when the worker starts and returns the [`FileReader`] the worker
//! should use.

use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::core::Error;
use crate::sync::lock;

/// Reads raw asset bytes by name.
pub trait FileReader: Send + Sync {
    fn read(&self, name: &str) -> Result<Vec<u8>, Error>;
}

/// Reads assets relative to a root directory.
#[derive(Debug, Clone)]
pub struct DirectoryReader {
    root: PathBuf,
}

impl DirectoryReader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileReader for DirectoryReader {
    fn read(&self, name: &str) -> Result<Vec<u8>, Error> {
        let relative = Path::new(name);
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(Error::Asset(name.to_string()));
        }

        let path = self.root.join(relative);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(Error::Asset(name.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory asset store, used by headless hosts and tests.
#[derive(Debug, Default)]
pub struct MemoryReader {
    assets: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with_asset(self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(name, bytes);
        self
    }

    pub fn insert(&self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        lock(&self.assets).insert(name.into(), bytes.into());
    }
}

impl FileReader for MemoryReader {
    fn read(&self, name: &str) -> Result<Vec<u8>, Error> {
        lock(&self.assets)
            .get(name)
            .cloned()
            .ok_or_else(|| Error::Asset(name.to_string()))
    }
}

/// Host-side hooks around the loader thread's lifetime.
pub trait PlatformBinding: Send + Sync {
    /// Called on the worker thread before it processes anything.
    fn attach_worker(&self) -> Result<Arc<dyn FileReader>, Error>;

    /// Called on the worker thread just before it exits, only if
    /// `attach_worker` succeeded.
    fn detach_worker(&self) {}

    /// Called on the stopping thread after the worker has been joined.
    fn release(&self) {}
}

/// A binding that needs no per-thread setup and hands the worker a shared
/// reader.
#[derive(Clone)]
pub struct ReaderBinding {
    reader: Arc<dyn FileReader>,
}

impl ReaderBinding {
    pub fn new(reader: Arc<dyn FileReader>) -> Self {
        Self { reader }
    }
}

impl PlatformBinding for ReaderBinding {
    fn attach_worker(&self) -> Result<Arc<dyn FileReader>, Error> {
        Ok(self.reader.clone())
    }
}
