//! Persistence of the raw settings blob.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use parking_lot::Mutex;
use tempfile::NamedTempFile;

use crate::settings::Settings;

/// Key-value blob written when the settings page is saved and read at the
/// start of every weather cycle.
pub trait SettingsStore: Send + Sync {
    /// Raw blob, or `None` if nothing was saved yet
    fn load_raw(&self) -> Result<Option<String>>;

    fn save_raw(&self, raw: &str) -> Result<()>;

    /// Current snapshot. Missing or unreadable blobs yield the defaults.
    fn snapshot(&self) -> Settings {
        let raw = match self.load_raw() {
            Ok(Some(raw)) => raw,
            Ok(None) => return Settings::default(),
            Err(e) => {
                tracing::warn!("Failed to read saved settings: {:#}", e);
                return Settings::default();
            }
        };

        Settings::from_json(&raw).unwrap_or_else(|e| {
            tracing::warn!("Ignoring malformed saved settings: {}", e);
            Settings::default()
        })
    }
}

/// Blob stored as a JSON file
#[derive(Debug, Clone)]
pub struct FileSettingsStore {
    path: PathBuf,
}

impl FileSettingsStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for FileSettingsStore {
    fn load_raw(&self) -> Result<Option<String>> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", self.path.display())),
        }
    }

    fn save_raw(&self, raw: &str) -> Result<()> {
        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        std::fs::create_dir_all(dir).context("Failed to create settings directory")?;

        // Readers must never observe a partially written blob; each save
        // stages into its own temp file
        let mut tmp = NamedTempFile::new_in(dir).context("Failed to create temp settings file")?;
        tmp.write_all(raw.as_bytes())
            .context("Failed to write settings file")?;
        tmp.persist(&self.path)
            .map_err(|e| e.error)
            .context("Failed to replace settings file")?;

        tracing::debug!("Saved settings to {}", self.path.display());
        Ok(())
    }
}

/// In-memory blob, for tests and ephemeral hosts
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    raw: Mutex<Option<String>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_raw(raw: &str) -> Self {
        Self {
            raw: Mutex::new(Some(raw.to_string())),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load_raw(&self) -> Result<Option<String>> {
        Ok(self.raw.lock().clone())
    }

    fn save_raw(&self, raw: &str) -> Result<()> {
        *self.raw.lock() = Some(raw.to_string());
        Ok(())
    }
}
