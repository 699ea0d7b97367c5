//! Ephemeral story posts.
//!
//! Stories live next to the chat data but never enter a room: they are
//! per-author, time-limited, and pruned lazily when read.

use chrono::{Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use parlor_shared::UserId;
use parlor_store::Story;

use crate::error::{Result, ServerError};
use crate::server::ChatServer;

impl ChatServer {
    /// Post a story for `author`.
    pub fn post_story(&mut self, author: &UserId, content: &str) -> Result<Story> {
        if self.accounts.get(author).is_none() {
            return Err(ServerError::UnknownUser(author.clone()));
        }

        let story = Story {
            id: Uuid::new_v4(),
            author: author.clone(),
            content: content.to_string(),
            created_at: Utc::now(),
        };

        let mut stories = self.store.load_stories(author)?;
        stories.push(story.clone());
        self.store.save_stories(author, &stories)?;

        debug!(author = %author, id = %story.id, "posted story");
        Ok(story)
    }

    /// The author's stories younger than the configured TTL.  Expired
    /// entries are pruned from disk as a side effect.
    pub fn active_stories(&mut self, author: &UserId) -> Result<Vec<Story>> {
        let cutoff = Utc::now() - Duration::hours(i64::from(self.config.story_ttl_hours));

        let stories = self.store.load_stories(author)?;
        let total = stories.len();
        let active: Vec<Story> = stories
            .into_iter()
            .filter(|s| s.created_at >= cutoff)
            .collect();

        let expired = total - active.len();
        if expired > 0 {
            self.store.save_stories(author, &active)?;
            debug!(author = %author, expired, "pruned expired stories");
        }
        Ok(active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use parlor_store::Store;

    fn server(dir: &std::path::Path) -> ChatServer {
        let config = ServerConfig {
            data_dir: Some(dir.to_path_buf()),
            ..ServerConfig::default()
        };
        let mut server = ChatServer::new(config).unwrap();
        server.register_user("a@x.com", "alice", "secret99").unwrap();
        server
    }

    #[test]
    fn post_and_read_back() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = server(dir.path());
        let author = UserId::new("a@x.com");

        let story = server.post_story(&author, "out hiking").unwrap();
        let active = server.active_stories(&author).unwrap();
        assert_eq!(active, vec![story]);
    }

    #[test]
    fn unknown_authors_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = server(dir.path());
        assert!(matches!(
            server.post_story(&UserId::new("ghost@x.com"), "boo"),
            Err(ServerError::UnknownUser(_))
        ));
    }

    #[test]
    fn expired_stories_are_pruned() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = server(dir.path());
        let author = UserId::new("a@x.com");

        server.post_story(&author, "fresh").unwrap();

        // Plant a story well past the 24h default TTL.
        let store = Store::open_at(dir.path()).unwrap();
        let mut stories = store.load_stories(&author).unwrap();
        stories.push(Story {
            id: Uuid::new_v4(),
            author: author.clone(),
            content: "stale".to_string(),
            created_at: Utc::now() - Duration::hours(48),
        });
        store.save_stories(&author, &stories).unwrap();

        let active = server.active_stories(&author).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].content, "fresh");

        assert_eq!(store.load_stories(&author).unwrap().len(), 1, "pruned on disk");
    }
}
