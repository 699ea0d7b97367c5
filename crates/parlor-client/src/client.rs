//! A logged-in user's session state.
//!
//! The [`Client`] owns its rooms exclusively; dropping the client frees the
//! in-memory histories, whose contents survive in the per-room files.  Every
//! contact/room mutation saves the manifest so a crash loses at most the
//! mutation in flight.

use std::collections::HashMap;
use std::sync::Arc;

use parlor_shared::{RoomId, UserId};
use parlor_store::{ManifestEntry, Store};

use crate::room::Room;

type Result<T> = std::result::Result<T, parlor_store::StoreError>;

pub struct Client {
    user_id: UserId,
    username: String,
    store: Arc<Store>,
    contacts: Vec<UserId>,
    rooms: HashMap<RoomId, Room>,
}

impl Client {
    pub fn new(user_id: UserId, username: impl Into<String>, store: Arc<Store>) -> Self {
        Self {
            user_id,
            username: username.into(),
            store,
            contacts: Vec::new(),
            rooms: HashMap::new(),
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Contacts in insertion order, duplicate-free.
    pub fn contacts(&self) -> &[UserId] {
        &self.contacts
    }

    pub fn room(&self, id: &RoomId) -> Option<&Room> {
        self.rooms.get(id)
    }

    pub fn room_mut(&mut self, id: &RoomId) -> Option<&mut Room> {
        self.rooms.get_mut(id)
    }

    pub fn rooms(&self) -> impl Iterator<Item = &Room> {
        self.rooms.values()
    }

    /// Resolve the conversation with `other`, if one exists.
    ///
    /// Lookup order: the in-memory map under the canonical id, then the
    /// canonical file on disk, then a case-insensitive directory scan.  A
    /// scan hit is legacy data and is renamed to its canonical name on the
    /// spot, so the scan runs at most once per room.
    pub fn room_with_user(&mut self, other: &UserId) -> Result<Option<&mut Room>> {
        let canonical = RoomId::for_pair(&self.user_id, other);

        if !self.rooms.contains_key(&canonical) {
            if self.store.room_file_exists(&canonical) {
                self.open_room(canonical.clone(), canonical.as_str().to_string())?;
            } else if let Some(found) = self.store.find_room_file_ci(&canonical)? {
                self.store.canonicalize_room_file(&found, &canonical)?;
                self.open_room(canonical.clone(), canonical.as_str().to_string())?;
            }
        }
        Ok(self.rooms.get_mut(&canonical))
    }

    /// Resolve or create the conversation with `other`.
    ///
    /// Idempotent: repeated calls return the same room and never create a
    /// second file.
    pub fn create_room(&mut self, other: &UserId) -> Result<&mut Room> {
        let canonical = RoomId::for_pair(&self.user_id, other);

        if self.room_with_user(other)?.is_none() {
            self.store.create_room_file(&canonical)?;
            self.rooms.insert(
                canonical.clone(),
                Room::new(canonical.clone(), canonical.as_str()),
            );
            self.save_manifest()?;
            tracing::debug!(user = %self.user_id, room = %canonical, "created room");
        }

        // Both branches above register the room under its canonical id.
        Ok(self
            .rooms
            .get_mut(&canonical)
            .expect("room registered under canonical id"))
    }

    /// Add a contact.  Returns `false` if already present (case-insensitive).
    pub fn add_contact(&mut self, contact: UserId) -> Result<bool> {
        if self.has_contact(&contact) {
            return Ok(false);
        }
        self.contacts.push(contact);
        self.save_manifest()?;
        Ok(true)
    }

    /// Remove a contact.  Returns `false` if it was not present.
    pub fn remove_contact(&mut self, contact: &UserId) -> Result<bool> {
        let before = self.contacts.len();
        self.contacts.retain(|c| !c.eq_ignore_case(contact));
        if self.contacts.len() == before {
            return Ok(false);
        }
        self.save_manifest()?;
        Ok(true)
    }

    pub fn has_contact(&self, contact: &UserId) -> bool {
        self.contacts.iter().any(|c| c.eq_ignore_case(contact))
    }

    /// Write the manifest: contacts in order, rooms sorted by id for stable
    /// output.
    pub fn save_manifest(&self) -> Result<()> {
        let mut entries: Vec<ManifestEntry> = self
            .contacts
            .iter()
            .cloned()
            .map(ManifestEntry::Contact)
            .collect();

        let mut room_ids: Vec<&RoomId> = self.rooms.keys().collect();
        room_ids.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        for id in room_ids {
            entries.push(ManifestEntry::Room {
                id: id.clone(),
                name: self.rooms[id].name().to_string(),
            });
        }

        self.store.save_manifest(&self.user_id, &entries)
    }

    /// Clear and rebuild contacts and rooms from the manifest.
    ///
    /// Each `ROOM:` directive resolves its file exact-first, then
    /// case-insensitively (canonicalizing the legacy name), and finally by
    /// creating an empty file so later lookups succeed — a manifest entry
    /// is authoritative even when the file went missing.
    pub fn load_manifest(&mut self) -> Result<()> {
        self.contacts.clear();
        self.rooms.clear();

        for entry in self.store.load_manifest(&self.user_id)? {
            match entry {
                ManifestEntry::Contact(id) => {
                    if !self.has_contact(&id) {
                        self.contacts.push(id);
                    }
                }
                ManifestEntry::Room { id, name } => {
                    self.register_room_entry(id, name)?;
                }
            }
        }
        Ok(())
    }

    /// Adopt a room discovered outside the manifest (orphan scan).  The
    /// counterpart becomes a contact and the manifest is saved.
    pub fn adopt_room(&mut self, id: RoomId) -> Result<()> {
        let counterpart = id.counterpart_of(&self.user_id);
        self.register_room_entry(id, String::new())?;
        if let Some(other) = counterpart {
            if !self.has_contact(&other) {
                self.contacts.push(other);
            }
        }
        self.save_manifest()
    }

    fn register_room_entry(&mut self, id: RoomId, name: String) -> Result<()> {
        // Recompute the canonical id anchored on this user's spelling;
        // legacy manifests carry stale case and missing domain suffixes.
        let canonical = match id.counterpart_of(&self.user_id) {
            Some(other) => RoomId::for_pair(&self.user_id, &other),
            None => id.clone(),
        };
        if self.rooms.contains_key(&canonical) {
            return Ok(());
        }

        if !self.store.room_file_exists(&canonical) {
            if let Some(found) = self.store.find_room_file_ci(&canonical)? {
                self.store.canonicalize_room_file(&found, &canonical)?;
            } else {
                tracing::warn!(
                    user = %self.user_id,
                    room = %canonical,
                    "manifest referenced a missing room file; created empty"
                );
                self.store.create_room_file(&canonical)?;
            }
        }

        self.store.reconcile_room(&canonical)?;

        let label = if name.is_empty() {
            canonical.as_str().to_string()
        } else {
            name
        };
        self.open_room(canonical, label)
    }

    fn open_room(&mut self, id: RoomId, name: String) -> Result<()> {
        let mut room = Room::new(id.clone(), name);
        room.load(&self.store)?;
        self.rooms.insert(id, room);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use parlor_shared::Message;

    fn setup(user: &str) -> (Client, Arc<Store>, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open_at(dir.path()).unwrap());
        let client = Client::new(UserId::new(user), "tester", store.clone());
        (client, store, dir)
    }

    fn msg(sender: &str, content: &str, minute: u32) -> Message {
        Message::new(
            UserId::new(sender),
            content,
            Utc.with_ymd_and_hms(2024, 3, 7, 14, minute, 0).unwrap(),
        )
    }

    #[test]
    fn create_room_is_idempotent() {
        let (mut client, store, _dir) = setup("a@x.com");
        let other = UserId::new("b@y.com");

        let first = client.create_room(&other).unwrap().id().clone();
        let second = client.create_room(&other).unwrap().id().clone();
        assert_eq!(first, second);

        let files = store.list_room_ids().unwrap();
        assert_eq!(files.len(), 1, "no duplicate room file");
    }

    #[test]
    fn create_room_is_commutative_with_lookup() {
        let (mut client, _store, _dir) = setup("b@y.com");
        client.create_room(&UserId::new("a@x.com")).unwrap();

        let found = client.room_with_user(&UserId::new("a@x.com")).unwrap();
        assert!(found.is_some());
    }

    #[test]
    fn contact_list_is_a_set_with_insertion_order() {
        let (mut client, _store, _dir) = setup("a@x.com");

        assert!(client.add_contact(UserId::new("b@y.com")).unwrap());
        assert!(client.add_contact(UserId::new("c@z.com")).unwrap());
        assert!(!client.add_contact(UserId::new("B@Y.COM")).unwrap());
        assert_eq!(client.contacts().len(), 2);
        assert_eq!(client.contacts()[0].as_str(), "b@y.com");

        assert!(client.remove_contact(&UserId::new("b@y.com")).unwrap());
        assert!(!client.remove_contact(&UserId::new("b@y.com")).unwrap());
        assert!(!client.has_contact(&UserId::new("b@y.com")));
    }

    #[test]
    fn manifest_round_trip() {
        let (mut client, store, _dir) = setup("a@x.com");
        client.add_contact(UserId::new("b@y.com")).unwrap();
        client.create_room(&UserId::new("b@y.com")).unwrap();

        let mut reloaded = Client::new(UserId::new("a@x.com"), "tester", store);
        reloaded.load_manifest().unwrap();

        assert!(reloaded.has_contact(&UserId::new("b@y.com")));
        assert!(reloaded
            .room(&RoomId::from_raw("a@x.com_b@y.com"))
            .is_some());
    }

    #[test]
    fn manifest_repairs_missing_room_files() {
        let (mut client, store, _dir) = setup("a@x.com");

        let entries = vec![ManifestEntry::Room {
            id: RoomId::from_raw("a@x.com_b@y.com"),
            name: "b".to_string(),
        }];
        store.save_manifest(client.user_id(), &entries).unwrap();

        client.load_manifest().unwrap();
        assert!(store.room_file_exists(&RoomId::from_raw("a@x.com_b@y.com")));
    }

    #[test]
    fn legacy_cased_room_files_are_found_and_canonicalized() {
        let (mut client, store, _dir) = setup("bob@y.com");

        let legacy = RoomId::from_raw("Alice@x.com_bob@y.com");
        store
            .append_message(&legacy, &msg("Alice@x.com", "hi", 0))
            .unwrap();

        let room = client
            .room_with_user(&UserId::new("alice@x.com"))
            .unwrap()
            .expect("legacy room should be found");
        assert_eq!(room.messages().len(), 1);
        assert_eq!(room.id().as_str(), "alice@x.com_bob@y.com");

        // Second lookup hits the map, no scan needed.
        assert!(client
            .room_with_user(&UserId::new("ALICE@x.com"))
            .unwrap()
            .is_some());
    }

    #[test]
    fn adopt_room_registers_contact_and_manifest() {
        let (mut client, store, _dir) = setup("a@x.com");

        let id = RoomId::from_raw("a@x.com_b@y.com");
        store.append_message(&id, &msg("a@x.com", "hi", 0)).unwrap();

        client.adopt_room(id.clone()).unwrap();
        assert!(client.has_contact(&UserId::new("b@y.com")));
        assert!(client.room(&id).is_some());

        let manifest = store.load_manifest(client.user_id()).unwrap();
        assert!(manifest.contains(&ManifestEntry::Contact(UserId::new("b@y.com"))));
    }
}
