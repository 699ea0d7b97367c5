//! Data-directory root management.
//!
//! The [`Store`] struct owns the root path and guarantees that every
//! subdirectory exists before any other operation.  It holds no in-memory
//! state; all helpers read and write files on the calling thread.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use parlor_shared::UserId;

use crate::error::{Result, StoreError};

pub(crate) const CREDENTIALS_FILE: &str = "users_credentials.txt";
pub(crate) const USERS_DIR: &str = "users";
pub(crate) const ROOMS_DIR: &str = "rooms";
pub(crate) const OUTBOX_DIR: &str = "outbox";
pub(crate) const PROFILES_DIR: &str = "profiles";
pub(crate) const STORIES_DIR: &str = "stories";
pub(crate) const BLOCKS_DIR: &str = "blocks";

/// Handle to one Parlor data directory.
pub struct Store {
    root: PathBuf,
}

impl Store {
    /// Open (or create) the default application data directory.
    ///
    /// The directory is placed in the platform-appropriate location:
    /// - Linux:   `~/.local/share/parlor`
    /// - macOS:   `~/Library/Application Support/com.parlor.parlor`
    /// - Windows: `{FOLDERID_RoamingAppData}\parlor\parlor\data`
    pub fn new() -> Result<Self> {
        let project_dirs =
            ProjectDirs::from("com", "parlor", "parlor").ok_or(StoreError::NoDataDir)?;
        Self::open_at(project_dirs.data_dir())
    }

    /// Open (or create) a data directory at an explicit path.
    ///
    /// This is useful for tests and for embedding the store inside custom
    /// directory layouts.
    pub fn open_at(root: &Path) -> Result<Self> {
        for dir in [
            USERS_DIR,
            ROOMS_DIR,
            OUTBOX_DIR,
            PROFILES_DIR,
            STORIES_DIR,
            BLOCKS_DIR,
        ] {
            std::fs::create_dir_all(root.join(dir))?;
        }

        tracing::info!(path = %root.display(), "opened data directory");

        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    /// Root of the data directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub(crate) fn credentials_path(&self) -> PathBuf {
        self.root.join(CREDENTIALS_FILE)
    }

    pub(crate) fn rooms_dir(&self) -> PathBuf {
        self.root.join(ROOMS_DIR)
    }

    /// Build `<subdir>/<user><ext>`, rejecting identifiers that would
    /// escape the data directory.
    pub(crate) fn user_file(&self, subdir: &str, user: &UserId, ext: &str) -> Result<PathBuf> {
        let name = safe_component(user.as_str())?;
        Ok(self.root.join(subdir).join(format!("{name}{ext}")))
    }
}

/// Reject path separators and traversal sequences in a user-supplied file
/// name component.
pub(crate) fn safe_component(name: &str) -> Result<&str> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(StoreError::UnsafeName(name.to_string()));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_creates_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open_at(dir.path()).expect("should open");

        for sub in [USERS_DIR, ROOMS_DIR, OUTBOX_DIR, PROFILES_DIR, STORIES_DIR, BLOCKS_DIR] {
            assert!(store.root().join(sub).is_dir(), "{sub} missing");
        }
    }

    #[test]
    fn rejects_traversal_components() {
        assert!(safe_component("alice@x.com").is_ok());
        assert!(safe_component("").is_err());
        assert!(safe_component("../etc/passwd").is_err());
        assert!(safe_component("a/b").is_err());
        assert!(safe_component("a\\b").is_err());
    }
}
