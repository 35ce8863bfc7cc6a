//! Asset resolution
//!
//! Maps logical asset paths supplied by the host to pattern file bytes.

use crate::error::{Error, Result};
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// Resolves a logical path to readable bytes
pub trait AssetSource: Send + Sync {
    /// # Errors
    ///
    /// `NotFound` when the path cannot be resolved or read.
    fn load(&self, logical_path: &str) -> Result<Vec<u8>>;
}

/// Assets stored under a root directory
#[derive(Debug, Clone)]
pub struct FsAssetSource {
    root: PathBuf,
}

impl FsAssetSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Join a logical path onto the root, refusing anything that could
    /// escape it
    fn resolve(&self, logical_path: &str) -> Result<PathBuf> {
        let relative = Path::new(logical_path);
        if logical_path.is_empty() {
            return Err(Error::NotFound("empty asset path".to_string()));
        }
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(Error::NotFound(format!(
                "asset path '{}' must be relative to the asset root",
                logical_path
            )));
        }
        Ok(self.root.join(relative))
    }
}

impl AssetSource for FsAssetSource {
    fn load(&self, logical_path: &str) -> Result<Vec<u8>> {
        let path = self.resolve(logical_path)?;
        let bytes = std::fs::read(&path)
            .map_err(|e| Error::NotFound(format!("{}: {}", path.display(), e)))?;
        debug!("Loaded asset {} ({} bytes)", path.display(), bytes.len());
        Ok(bytes)
    }
}
