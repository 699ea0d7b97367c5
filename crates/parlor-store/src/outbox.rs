//! Per-recipient offline delivery queues.
//!
//! When a message is sent to a user with no live session, the sender's side
//! cannot update the recipient's in-memory state.  Instead a
//! [`PendingDelivery`] is queued under `outbox/<email>.json` and drained the
//! next time the recipient logs in.  The message text itself is not queued:
//! it already lives in the shared room file; the queue only carries the
//! contact and room registration the recipient's manifest is missing.

use std::fs;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use parlor_shared::{RoomId, UserId};

use crate::error::Result;
use crate::store::{Store, OUTBOX_DIR};

/// One queued delivery: "`from` wrote into `room_id`".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PendingDelivery {
    pub from: UserId,
    pub room_id: RoomId,
    pub queued_at: DateTime<Utc>,
}

impl Store {
    /// Queue a delivery for `recipient`.
    pub fn outbox_enqueue(&self, recipient: &UserId, entry: &PendingDelivery) -> Result<()> {
        let path = self.user_file(OUTBOX_DIR, recipient, ".json")?;
        let mut entries: Vec<PendingDelivery> = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        entries.push(entry.clone());
        fs::write(&path, serde_json::to_string(&entries)?)?;

        tracing::debug!(recipient = %recipient, from = %entry.from, room = %entry.room_id, "queued offline delivery");
        Ok(())
    }

    /// Take and clear every queued delivery for `recipient`.  A missing
    /// queue file is an empty queue.
    pub fn outbox_drain(&self, recipient: &UserId) -> Result<Vec<PendingDelivery>> {
        let path = self.user_file(OUTBOX_DIR, recipient, ".json")?;
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let entries: Vec<PendingDelivery> = serde_json::from_str(&raw)?;
        fs::remove_file(&path)?;

        if !entries.is_empty() {
            tracing::debug!(recipient = %recipient, count = entries.len(), "drained offline deliveries");
        }
        Ok(entries)
    }
}
