//! Per-user block lists.
//!
//! `blocks/<email>.txt` holds one blocked email per line.

use std::fs;

use parlor_shared::UserId;

use crate::error::Result;
use crate::store::{Store, BLOCKS_DIR};

impl Store {
    /// Users blocked by `user`; a missing file is an empty list.
    pub fn load_blocklist(&self, user: &UserId) -> Result<Vec<UserId>> {
        let path = self.user_file(BLOCKS_DIR, user, ".txt")?;
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        Ok(raw
            .lines()
            .filter(|line| !line.is_empty())
            .map(UserId::new)
            .collect())
    }

    pub fn save_blocklist(&self, user: &UserId, blocked: &[UserId]) -> Result<()> {
        let path = self.user_file(BLOCKS_DIR, user, ".txt")?;
        let mut out = String::new();
        for id in blocked {
            out.push_str(id.as_str());
            out.push('\n');
        }
        fs::write(path, out)?;
        Ok(())
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

        let blocked = vec![UserId::new("spam@z.com"), UserId::new("troll@w.com")];
        store.save_blocklist(&user, &blocked).unwrap();
        assert_eq!(store.load_blocklist(&user).unwrap(), blocked);
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open_at(dir.path()).unwrap();
        assert!(store.load_blocklist(&UserId::new("a@x.com")).unwrap().is_empty());
    }
}
