//! An open conversation bound to its message file.

use chrono::{DateTime, Utc};

use parlor_shared::{Message, RoomId, UserId};
use parlor_store::Store;

type Result<T> = std::result::Result<T, parlor_store::StoreError>;

/// A two-party conversation: the ordered in-memory history plus the room
/// file it mirrors.
///
/// Presentation order is append order.  Offline propagation can deliver
/// messages after newer local ones, so the list is not guaranteed to be
/// time-sorted; no re-sorting is performed.
pub struct Room {
    id: RoomId,
    name: String,
    messages: Vec<Message>,
    last_activity: DateTime<Utc>,
}

impl Room {
    pub fn new(id: RoomId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            messages: Vec::new(),
            last_activity: DateTime::UNIX_EPOCH,
        }
    }

    pub fn id(&self) -> &RoomId {
        &self.id
    }

    /// Display label.  May lag behind the id for rooms migrated from
    /// legacy manifests.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn participants(&self) -> Option<(UserId, UserId)> {
        self.id.participants()
    }

    /// Append a message to memory and to the room file.
    ///
    /// Returns `false` without writing if an identical message (by identity
    /// key) is already present.  A failed file append is logged and the
    /// in-memory append stands; memory may run ahead of disk until the next
    /// full save.
    pub fn add_message(&mut self, store: &Store, message: Message) -> bool {
        if self.contains(&message) {
            return false;
        }
        if let Err(e) = store.append_message(&self.id, &message) {
            tracing::warn!(
                room = %self.id,
                error = %e,
                "failed to append message; in-memory history is ahead of disk"
            );
        }
        self.push(message);
        true
    }

    /// Insert a message into memory only.
    ///
    /// Used for live cross-session delivery, where the sender's side has
    /// already written the line into the shared room file.
    pub fn accept(&mut self, message: Message) -> bool {
        if self.contains(&message) {
            return false;
        }
        self.push(message);
        true
    }

    /// Discard the in-memory history and re-read the room file in file
    /// order.
    pub fn load(&mut self, store: &Store) -> Result<()> {
        self.messages = store.load_messages(&self.id)?;
        self.last_activity = self
            .messages
            .iter()
            .map(|m| m.timestamp)
            .max()
            .unwrap_or(DateTime::UNIX_EPOCH);
        Ok(())
    }

    /// Overwrite the room file with the in-memory history (used after
    /// edit/delete flows).
    pub fn save(&self, store: &Store) -> Result<()> {
        store.rewrite_messages(&self.id, &self.messages)
    }

    /// Remove by position.  Out-of-range indices are a no-op.
    pub fn remove_message(&mut self, index: usize) -> bool {
        if index >= self.messages.len() {
            return false;
        }
        self.messages.remove(index);
        true
    }

    /// Mark every message not sent by `reader` as read.  Returns how many
    /// flags flipped; the caller persists via [`Room::save`] when non-zero.
    pub fn mark_read(&mut self, reader: &UserId) -> usize {
        let mut flipped = 0;
        for message in &mut self.messages {
            if !message.read && !message.sender.eq_ignore_case(reader) {
                message.read = true;
                flipped += 1;
            }
        }
        flipped
    }

    fn contains(&self, message: &Message) -> bool {
        let key = message.key();
        self.messages.iter().any(|m| m.key() == key)
    }

    fn push(&mut self, message: Message) {
        if message.timestamp > self.last_activity {
            self.last_activity = message.timestamp;
        }
        self.messages.push(message);
    }
}
