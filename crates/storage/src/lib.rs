//! User preferences on disk.
//!
//! Preferences live in `preferences.json` under the platform's local data
//! directory, wrapped in a small versioned envelope.

use directories::ProjectDirs;
use doc_model::Preferences;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const PREFS_SCHEMA_VERSION: u32 = 1;
const PREFERENCES_FILE: &str = "preferences.json";

/// Environment variable that relocates the preferences directory.
pub const CONFIG_DIR_ENV: &str = "EXHIBIT_CONFIG_DIR";

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("no local data directory for this platform")]
    NoDataDirectory,
    #[error("preferences schema version {0} is newer than this build supports")]
    UnsupportedVersion(u32),
    #[error("preferences I/O failed: {0}")]
    Io(#[from] io::Error),
    #[error("malformed preferences: {0}")]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    version: u32,
    #[serde(default)]
    preferences: T,
}

impl Storage {
    pub fn from_default_project() -> Result<Self, StorageError> {
        ProjectDirs::from("dev", "Exhibit", "Exhibit")
            .map(|dirs| Self::with_root(dirs.data_local_dir()))
            .ok_or(StorageError::NoDataDirectory)
    }

    /// `explicit` wins over [`CONFIG_DIR_ENV`], which wins over the platform
    /// data directory.
    pub fn resolve(explicit: Option<PathBuf>) -> Result<Self, StorageError> {
        if let Some(root) = explicit {
            return Ok(Self::with_root(root));
        }

        match std::env::var_os(CONFIG_DIR_ENV) {
            Some(root) if !root.is_empty() => Ok(Self::with_root(root)),
            _ => Self::from_default_project(),
        }
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn preferences_path(&self) -> PathBuf {
        self.root.join(PREFERENCES_FILE)
    }

    /// Missing file means defaults. Fields absent from an older file take
    /// their default values.
    pub fn load_preferences(&self) -> Result<Preferences, StorageError> {
        let path = self.preferences_path();
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                log::debug!("no preferences at {}, using defaults", path.display());
                return Ok(Preferences::default());
            }
            Err(err) => return Err(err.into()),
        };

        let Envelope { version, preferences } = serde_json::from_slice(&bytes)?;
        if version > PREFS_SCHEMA_VERSION {
            return Err(StorageError::UnsupportedVersion(version));
        }
        Ok(preferences)
    }

    /// Replaces the preferences file in one step; readers never see a
    /// half-written file.
    pub fn save_preferences(&self, preferences: &Preferences) -> Result<(), StorageError> {
        fs::create_dir_all(&self.root)?;

        let bytes = serde_json::to_vec_pretty(&Envelope {
            version: PREFS_SCHEMA_VERSION,
            preferences,
        })?;

        let mut staged = tempfile::NamedTempFile::new_in(&self.root)?;
        staged.write_all(&bytes)?;
        staged.as_file().sync_all()?;
        staged.persist(self.preferences_path()).map_err(|err| err.error)?;

        log::info!("saved preferences to {}", self.preferences_path().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch() -> (tempfile::TempDir, Storage) {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let storage = Storage::with_root(dir.path());
        (dir, storage)
    }

    #[test]
    fn saved_preferences_load_back() {
        let (_dir, storage) = scratch();
        let prefs = Preferences {
            base_dpi: 150.0,
            default_top_text: "Plaintiff".to_owned(),
            default_bottom_text: "Exhibit 4".to_owned(),
            font_path: Some(PathBuf::from("/fonts/Custom.ttf")),
        };

        storage.save_preferences(&prefs).expect("save should succeed");

        assert_eq!(storage.load_preferences().expect("load should succeed"), prefs);
    }

    #[test]
    fn absent_file_gives_defaults() {
        let (_dir, storage) = scratch();
        let loaded = storage.load_preferences().expect("load should succeed");
        assert_eq!(loaded, Preferences::default());
    }

    #[test]
    fn older_file_fills_missing_fields() {
        let (_dir, storage) = scratch();
        let older = r#"{ "version": 1, "preferences": { "base_dpi": 96.0 } }"#;
        fs::write(storage.preferences_path(), older).expect("write should succeed");

        let loaded = storage.load_preferences().expect("load should succeed");

        assert_eq!(loaded.base_dpi, 96.0);
        assert_eq!(loaded.default_top_text, "Exhibit");
    }

    #[test]
    fn save_creates_missing_root() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let storage = Storage::with_root(dir.path().join("nested").join("config"));

        storage.save_preferences(&Preferences::default()).expect("save should succeed");

        assert!(storage.preferences_path().is_file());
        let leftovers = fs::read_dir(storage.root()).expect("root is readable").count();
        assert_eq!(leftovers, 1, "only preferences.json remains");
    }

    #[test]
    fn rejects_newer_schema() {
        let (_dir, storage) = scratch();
        fs::write(storage.preferences_path(), r#"{ "version": 9, "preferences": {} }"#)
            .expect("write should succeed");

        let err = storage.load_preferences().expect_err("future schema");
        assert!(matches!(err, StorageError::UnsupportedVersion(9)));
    }

    #[test]
    fn corrupt_file_is_a_serde_error() {
        let (_dir, storage) = scratch();
        fs::write(storage.preferences_path(), b"{ not json").expect("write should succeed");

        assert!(matches!(storage.load_preferences(), Err(StorageError::Serde(_))));
    }

    #[test]
    fn explicit_root_wins() {
        let dir = tempfile::tempdir().expect("temp dir should be created");
        let storage = Storage::resolve(Some(dir.path().to_path_buf())).expect("resolve");
        assert_eq!(storage.root(), dir.path());
    }
}
