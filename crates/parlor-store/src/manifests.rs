//! Per-user manifests.
//!
//! `users/<email>.txt` records what a client knows about: one directive per
//! line, either `CONTACT:<id>` or `ROOM:<roomId>|<roomName>`.  The format is
//! legacy-pinned; loading tolerates and skips anything else.

use std::fs;

use parlor_shared::{RoomId, UserId};

use crate::error::Result;
use crate::store::{Store, USERS_DIR};

/// One line of a user manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestEntry {
    Contact(UserId),
    Room { id: RoomId, name: String },
}

impl ManifestEntry {
    fn to_line(&self) -> String {
        match self {
            Self::Contact(id) => format!("CONTACT:{id}"),
            Self::Room { id, name } => format!("ROOM:{id}|{name}"),
        }
    }

    fn from_line(line: &str) -> Option<Self> {
        if let Some(rest) = line.strip_prefix("CONTACT:") {
            if rest.is_empty() {
                return None;
            }
            return Some(Self::Contact(UserId::new(rest)));
        }
        if let Some(rest) = line.strip_prefix("ROOM:") {
            // Older manifests wrote the id alone, without a display name.
            let (id, name) = match rest.split_once('|') {
                Some((id, name)) => (id, name),
                None => (rest, rest),
            };
            if id.is_empty() {
                return None;
            }
            return Some(Self::Room {
                id: RoomId::from_raw(id),
                name: name.to_string(),
            });
        }
        None
    }
}

impl Store {
    /// Load a user's manifest.  A missing file means the user has no
    /// recorded state yet; malformed directives are skipped with a warning.
    pub fn load_manifest(&self, user: &UserId) -> Result<Vec<ManifestEntry>> {
        let path = self.user_file(USERS_DIR, user, ".txt")?;
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for (line_no, line) in raw.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            match ManifestEntry::from_line(line) {
                Some(entry) => entries.push(entry),
                None => {
                    tracing::warn!(
                        user = %user,
                        line = line_no + 1,
                        "skipping malformed manifest directive"
                    );
                }
            }
        }
        Ok(entries)
    }

    /// Rewrite a user's manifest from scratch.
    pub fn save_manifest(&self, user: &UserId, entries: &[ManifestEntry]) -> Result<()> {
        let path = self.user_file(USERS_DIR, user, ".txt")?;
        let mut out = String::new();
        for entry in entries {
            out.push_str(&entry.to_line());
            out.push('\n');
        }
        fs::write(path, out)?;
        Ok(())
    }

    /// Whether a manifest file exists for `user`.
    pub fn manifest_exists(&self, user: &UserId) -> bool {
        self.user_file(USERS_DIR, user, ".txt")
            .map(|p| p.exists())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open_at(dir.path()).unwrap();
        let user = UserId::new("a@x.com");

        let entries = vec![
            ManifestEntry::Contact(UserId::new("b@y.com")),
            ManifestEntry::Room {
                id: RoomId::from_raw("a@x.com_b@y.com"),
                name: "a@x.com_b@y.com".to_string(),
            },
        ];
        store.save_manifest(&user, &entries).unwrap();

        assert!(store.manifest_exists(&user));
        assert_eq!(store.load_manifest(&user).unwrap(), entries);
    }

    #[test]
    fn missing_manifest_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open_at(dir.path()).unwrap();
        let entries = store.load_manifest(&UserId::new("nobody@x.com")).unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn room_directive_without_name_uses_the_id() {
        let entry = ManifestEntry::from_line("ROOM:a@x.com_b@y.com").unwrap();
        assert_eq!(
            entry,
            ManifestEntry::Room {
                id: RoomId::from_raw("a@x.com_b@y.com"),
                name: "a@x.com_b@y.com".to_string(),
            }
        );
    }

    #[test]
    fn unknown_directives_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open_at(dir.path()).unwrap();
        let user = UserId::new("a@x.com");

        std::fs::write(
            store.root().join("users").join("a@x.com.txt"),
            "CONTACT:b@y.com\nBOGUS:line\nCONTACT:\n",
        )
        .unwrap();

        let entries = store.load_manifest(&user).unwrap();
        assert_eq!(entries, vec![ManifestEntry::Contact(UserId::new("b@y.com"))]);
    }
}
