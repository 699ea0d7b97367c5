//! Room message files.
//!
//! Each room persists as `rooms/<roomId>.txt`, one message per line in
//! append order.  Normal operation only ever appends; full rewrites happen
//! after edits and during reconciliation.
//!
//! Historical data directories contain room files written under
//! non-canonical names (case mismatches, missing domain suffixes).  The
//! case-insensitive scan and [`Store::canonicalize_room_file`] exist to
//! migrate such files the first time they are touched; steady-state lookups
//! use the canonical path only.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use parlor_shared::{Message, MessageKey, RoomId};

use crate::error::Result;
use crate::store::{safe_component, Store};

/// Outcome of a reconciliation pass over one room file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Messages remaining after the pass.
    pub kept: usize,
    /// Duplicate lines collapsed (read flags merged by OR).
    pub duplicates: usize,
    /// Unparseable lines dropped.
    pub dropped: usize,
}

impl ReconcileReport {
    /// Whether the pass rewrote the file.
    pub fn changed(&self) -> bool {
        self.duplicates > 0 || self.dropped > 0
    }
}

impl Store {
    /// Path of a room's message file.
    pub fn room_path(&self, id: &RoomId) -> Result<PathBuf> {
        let name = safe_component(id.as_str())?;
        Ok(self.rooms_dir().join(format!("{name}.txt")))
    }

    /// Whether a message file exists under this exact id.
    pub fn room_file_exists(&self, id: &RoomId) -> bool {
        self.room_path(id).map(|p| p.exists()).unwrap_or(false)
    }

    /// Create an empty message file if none exists.
    pub fn create_room_file(&self, id: &RoomId) -> Result<()> {
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.room_path(id)?)?;
        Ok(())
    }

    /// Append one message line (creating the file if needed).
    pub fn append_message(&self, id: &RoomId, message: &Message) -> Result<()> {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.room_path(id)?)?;
        writeln!(file, "{}", message.to_line())?;
        Ok(())
    }

    /// Load a room's history in file order.  A missing file is an empty
    /// history; unparseable lines are skipped with a warning.
    pub fn load_messages(&self, id: &RoomId) -> Result<Vec<Message>> {
        let path = self.room_path(id)?;
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut messages = Vec::new();
        for (line_no, line) in raw.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            match Message::from_line(line) {
                Ok(message) => messages.push(message),
                Err(e) => {
                    tracing::warn!(
                        room = %id,
                        line = line_no + 1,
                        error = %e,
                        "skipping unparseable message line"
                    );
                }
            }
        }
        Ok(messages)
    }

    /// Replace a room file's contents with `messages` (full rewrite).
    pub fn rewrite_messages(&self, id: &RoomId, messages: &[Message]) -> Result<()> {
        let mut out = String::new();
        for message in messages {
            out.push_str(&message.to_line());
            out.push('\n');
        }
        fs::write(self.room_path(id)?, out)?;
        Ok(())
    }

    /// Every room id with a message file, sorted for deterministic scans.
    pub fn list_room_ids(&self) -> Result<Vec<RoomId>> {
        let mut ids = Vec::new();
        for entry in fs::read_dir(self.rooms_dir())? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(stem) = name.strip_suffix(".txt") {
                if !stem.is_empty() {
                    ids.push(RoomId::from_raw(stem));
                }
            }
        }
        ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        Ok(ids)
    }

    /// Find a room file whose name matches `id` ASCII-case-insensitively.
    /// Returns the spelling actually on disk.
    pub fn find_room_file_ci(&self, id: &RoomId) -> Result<Option<RoomId>> {
        for candidate in self.list_room_ids()? {
            if candidate.as_str().eq_ignore_ascii_case(id.as_str()) {
                return Ok(Some(candidate));
            }
        }
        Ok(None)
    }

    /// Migrate a legacy-named room file to its canonical name.
    ///
    /// If a file already exists under the canonical name, the legacy file is
    /// folded into it and the union is reconciled.
    pub fn canonicalize_room_file(&self, found: &RoomId, canonical: &RoomId) -> Result<()> {
        if found == canonical {
            return Ok(());
        }
        let from = self.room_path(found)?;
        let to = self.room_path(canonical)?;

        // On case-insensitive filesystems both spellings resolve to one
        // file; merging would read and delete the same inode.
        let same_file = match (from.canonicalize(), to.canonicalize()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        };

        if to.exists() && !same_file {
            let mut legacy = fs::read_to_string(&from)?;
            if !legacy.is_empty() && !legacy.ends_with('\n') {
                legacy.push('\n');
            }
            let mut file = fs::OpenOptions::new().append(true).open(&to)?;
            file.write_all(legacy.as_bytes())?;
            fs::remove_file(&from)?;
        } else {
            fs::rename(&from, &to)?;
        }

        // Migrated data is the main source of duplicate lines.
        self.reconcile_room(canonical)?;

        tracing::info!(from = %found, to = %canonical, "canonicalized room file name");
        Ok(())
    }

    /// Collapse duplicate message lines in a room file.
    ///
    /// Messages are keyed by [`MessageKey`]; the first occurrence wins its
    /// position and absorbs later read flags.  Unparseable lines are
    /// dropped.  The file is rewritten only when something changed.
    pub fn reconcile_room(&self, id: &RoomId) -> Result<ReconcileReport> {
        let path = self.room_path(id)?;
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Ok(ReconcileReport {
                    kept: 0,
                    duplicates: 0,
                    dropped: 0,
                })
            }
            Err(e) => return Err(e.into()),
        };

        let mut kept: Vec<Message> = Vec::new();
        let mut index: HashMap<MessageKey, usize> = HashMap::new();
        let mut duplicates = 0;
        let mut dropped = 0;

        for line in raw.lines() {
            if line.is_empty() {
                continue;
            }
            match Message::from_line(line) {
                Ok(message) => match index.get(&message.key()) {
                    Some(&i) => {
                        kept[i].read |= message.read;
                        duplicates += 1;
                    }
                    None => {
                        index.insert(message.key(), kept.len());
                        kept.push(message);
                    }
                },
                Err(_) => dropped += 1,
            }
        }

        let report = ReconcileReport {
            kept: kept.len(),
            duplicates,
            dropped,
        };
        if report.changed() {
            self.rewrite_messages(id, &kept)?;
            tracing::debug!(
                room = %id,
                kept = report.kept,
                duplicates = report.duplicates,
                dropped = report.dropped,
                "reconciled room file"
            );
        }
        Ok(report)
    }
}
