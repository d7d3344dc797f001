//! Persistent anonymous identity
//!
//! A UUID v4 generated on first use and persisted to the XDG data
//! directory. The id carries no device or account information; deleting the
//! file resets the identity.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::config::TelemetryConfig;

const ID_FILE: &str = "anonymous-id";

/// Supplier of the stable anonymous id.
#[derive(Debug, Clone)]
pub struct AnonymousId {
    path: PathBuf,
}

impl AnonymousId {
    /// Id backed by the default data directory.
    pub fn new() -> Self {
        Self::at(TelemetryConfig::data_dir().join(ID_FILE))
    }

    /// Id backed by a specific file.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The anonymous id, loading the stored value or generating and
    /// persisting a fresh one. A failed write still yields a usable id for
    /// this process.
    pub fn get(&self) -> String {
        if let Some(stored) = self.load() {
            return stored;
        }

        let id = Uuid::new_v4().to_string();
        if let Err(e) = self.store(&id) {
            tracing::warn!(error = %e, path = %self.path.display(), "failed to persist anonymous id");
        }
        id
    }

    fn load(&self) -> Option<String> {
        let content = std::fs::read_to_string(&self.path).ok()?;
        let trimmed = content.trim();
        // Reject anything that is not a UUID; a corrupt file regenerates.
        Uuid::parse_str(trimmed).ok()?;
        Some(trimmed.to_string())
    }

    fn store(&self, id: &str) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, id)
    }
}

impl Default for AnonymousId {
    fn default() -> Self {
        Self::new()
    }
}
