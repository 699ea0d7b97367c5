//! Ephemeral story posts.
//!
//! Each author's stories live in `stories/<email>.json`.  Expiry is a
//! policy decision made by the service layer; the store only persists.

use std::fs;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use parlor_shared::UserId;

use crate::error::Result;
use crate::store::{Store, STORIES_DIR};

/// A time-limited post shown to the author's contacts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Story {
    pub id: Uuid,
    pub author: UserId,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Store {
    /// Load an author's stories; a missing file is an empty list.
    pub fn load_stories(&self, author: &UserId) -> Result<Vec<Story>> {
        let path = self.user_file(STORIES_DIR, author, ".json")?;
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save_stories(&self, author: &UserId, stories: &[Story]) -> Result<()> {
        let path = self.user_file(STORIES_DIR, author, ".json")?;
        fs::write(path, serde_json::to_string(stories)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open_at(dir.path()).unwrap();
        let author = UserId::new("a@x.com");

        let stories = vec![Story {
            id: Uuid::new_v4(),
            author: author.clone(),
            content: "out hiking".to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 7, 9, 0, 0).unwrap(),
        }];
        store.save_stories(&author, &stories).unwrap();
        assert_eq!(store.load_stories(&author).unwrap(), stories);
    }

    #[test]
    fn missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open_at(dir.path()).unwrap();
        assert!(store.load_stories(&UserId::new("a@x.com")).unwrap().is_empty());
    }
}
