//! The in-process chat service.
//!
//! [`ChatServer`] plays the role a remote server would in a networked
//! messenger: it owns the account directory, one [`Client`] session per
//! user, and the delivery path between them.  The embedding shell
//! constructs exactly one instance per process and calls [`ChatServer::shutdown`]
//! before exit.
//!
//! Everything runs on the calling thread.  Mutating operations take
//! `&mut self`, so a multi-threaded shell must wrap the server in its own
//! lock; one OS process per data directory is assumed throughout.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use parlor_client::Client;
use parlor_shared::{validate, Message, RoomId, UserId};
use parlor_store::{ManifestEntry, PendingDelivery, Store, UserProfile};

use crate::accounts::{AccountRegistry, UserSummary};
use crate::config::ServerConfig;
use crate::error::{Result, ServerError};

pub struct ChatServer {
    pub(crate) config: ServerConfig,
    pub(crate) store: Arc<Store>,
    pub(crate) accounts: AccountRegistry,
    /// Live sessions keyed by email.  A session outlives logout so that
    /// in-process delivery keeps working for users who logged out; it dies
    /// with the process.
    pub(crate) sessions: HashMap<String, Client>,
}

impl ChatServer {
    /// Construct the service: open the data directory and load the account
    /// directory.  No sessions exist yet.
    pub fn new(config: ServerConfig) -> Result<Self> {
        let store = match &config.data_dir {
            Some(dir) => Store::open_at(dir)?,
            None => Store::new()?,
        };
        let store = Arc::new(store);
        let accounts = AccountRegistry::load(store.clone())?;

        info!("chat server ready");
        Ok(Self {
            config,
            store,
            accounts,
            sessions: HashMap::new(),
        })
    }

    /// Flush every session's manifest and consume the service.
    pub fn shutdown(self) -> Result<()> {
        for client in self.sessions.values() {
            client.save_manifest()?;
        }
        info!(sessions = self.sessions.len(), "chat server shut down");
        Ok(())
    }

    pub fn data_dir(&self) -> &Path {
        self.store.root()
    }

    // ------------------------------------------------------------------
    // Validation (consumed by the login/signup screens)
    // ------------------------------------------------------------------

    pub fn is_valid_email(&self, raw: &str) -> bool {
        validate::is_valid_email(raw)
    }

    pub fn is_valid_password(&self, raw: &str) -> bool {
        validate::is_valid_password(raw)
    }

    // ------------------------------------------------------------------
    // Auth & sessions
    // ------------------------------------------------------------------

    /// Create an account and open its session.
    pub fn register_user(
        &mut self,
        email: &str,
        username: &str,
        password: &str,
    ) -> Result<&mut Client> {
        self.accounts.register(email, username, password)?;
        self.login_user(email, password)
    }

    /// Validate credentials and return the user's session, constructing and
    /// loading it on first login this process.
    pub fn login_user(&mut self, email: &str, password: &str) -> Result<&mut Client> {
        let user = UserId::new(email);
        if !self.accounts.verify(&user, password) {
            return Err(ServerError::InvalidCredentials);
        }
        let username = match self.accounts.get(&user) {
            Some(account) => account.username.clone(),
            None => return Err(ServerError::InvalidCredentials),
        };
        self.accounts.set_online(&user, true)?;

        if !self.sessions.contains_key(user.as_str()) {
            let mut client = Client::new(user.clone(), username, self.store.clone());
            self.load_client_data(&mut client)?;
            self.sessions.insert(user.as_str().to_string(), client);
            info!(user = %user, "session opened");
        } else {
            debug!(user = %user, "reusing warm session");
        }

        Ok(self
            .sessions
            .get_mut(user.as_str())
            .expect("session inserted above"))
    }

    /// Mark the user offline and persist their state.  The session object
    /// stays warm so in-process delivery continues to reach them.
    pub fn logout_user(&mut self, email: &str) -> Result<()> {
        let user = UserId::new(email);
        let client = self
            .sessions
            .get(user.as_str())
            .ok_or_else(|| ServerError::NotLoggedIn(user.clone()))?;
        client.save_manifest()?;
        self.accounts.set_online(&user, false)?;
        info!(user = %user, "logged out; session kept warm");
        Ok(())
    }

    pub fn reset_password(&mut self, email: &str, new_password: &str) -> Result<()> {
        self.accounts
            .reset_password(&UserId::new(email), new_password)
    }

    pub fn session(&self, user: &UserId) -> Option<&Client> {
        self.sessions.get(user.as_str())
    }

    pub fn session_mut(&mut self, user: &UserId) -> Option<&mut Client> {
        self.sessions.get_mut(user.as_str())
    }

    /// Bring a freshly constructed client up to date with its on-disk
    /// state: manifest (with repair), queued offline deliveries, and rooms
    /// that exist on disk but were never recorded in the manifest.
    fn load_client_data(&self, client: &mut Client) -> Result<()> {
        client.load_manifest()?;

        let deliveries = self.store.outbox_drain(client.user_id())?;
        let drained = !deliveries.is_empty();
        for delivery in deliveries {
            debug!(
                user = %client.user_id(),
                from = %delivery.from,
                room = %delivery.room_id,
                "applying queued delivery"
            );
            client.add_contact(delivery.from.clone())?;
            client.create_room(&delivery.from)?;
        }
        if drained {
            client.save_manifest()?;
        }

        self.adopt_orphan_rooms(client)
    }

    /// Scan the rooms directory for conversations that involve `client`'s
    /// user but are missing from their manifest (lost to a skipped or
    /// crashed save).  A room is adopted only if the user authored at least
    /// one of its messages.
    fn adopt_orphan_rooms(&self, client: &mut Client) -> Result<()> {
        let me = client.user_id().clone();
        for id in self.store.list_room_ids()? {
            if !id.involves(&me) {
                continue;
            }
            let canonical = match id.counterpart_of(&me) {
                Some(other) => RoomId::for_pair(&me, &other),
                None => id.clone(),
            };
            if client.room(&canonical).is_some() {
                continue;
            }

            let messages = self.store.load_messages(&id)?;
            let authored = messages.iter().any(|m| m.sender.eq_ignore_case(&me));
            if !authored {
                continue;
            }

            info!(user = %me, room = %id, "adopting orphan room");
            client.adopt_room(id)?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Send pipeline
    // ------------------------------------------------------------------

    /// Send `content` from `from` to `to`.
    ///
    /// The sender must have a session and the recipient an account that has
    /// not blocked the sender.  The message is appended once to the shared
    /// room file; delivery to the recipient is in-memory when they have a
    /// session and queued in their outbox otherwise.
    pub fn send_message(&mut self, from: &UserId, to: &UserId, content: &str) -> Result<Message> {
        if !self.sessions.contains_key(from.as_str()) {
            return Err(ServerError::NotLoggedIn(from.clone()));
        }
        if self.accounts.get(to).is_none() {
            return Err(ServerError::UnknownUser(to.clone()));
        }
        if self.is_blocked(to, from)? {
            return Err(ServerError::Blocked {
                sender: from.clone(),
                recipient: to.clone(),
            });
        }

        let store = self.store.clone();
        let message = Message::new(from.clone(), content, Utc::now());

        let sender = self
            .sessions
            .get_mut(from.as_str())
            .expect("session checked above");
        sender.add_contact(to.clone())?;
        let room = sender.create_room(to)?;
        room.add_message(&store, message.clone());
        let room_id = room.id().clone();

        match self.sessions.get_mut(to.as_str()) {
            Some(recipient) => {
                recipient.add_contact(from.clone())?;
                recipient.create_room(from)?.accept(message.clone());
                debug!(from = %from, to = %to, room = %room_id, "delivered to live session");
            }
            None => {
                self.store.outbox_enqueue(
                    to,
                    &PendingDelivery {
                        from: from.clone(),
                        room_id: room_id.clone(),
                        queued_at: Utc::now(),
                    },
                )?;
            }
        }

        info!(from = %from, to = %to, room = %room_id, "message sent");
        Ok(message)
    }

    /// Persist a session room's in-memory history (full rewrite).  The UI
    /// calls this after its edit/delete flows mutate the room.
    pub fn update_room_messages(&mut self, user: &UserId, room_id: &RoomId) -> Result<()> {
        let store = self.store.clone();
        let client = self
            .sessions
            .get_mut(user.as_str())
            .ok_or_else(|| ServerError::NotLoggedIn(user.clone()))?;
        match client.room_mut(room_id) {
            Some(room) => Ok(room.save(&store)?),
            None => {
                warn!(user = %user, room = %room_id, "no such room to persist");
                Ok(())
            }
        }
    }

    // ------------------------------------------------------------------
    // Contact / room state for users with or without a session
    // ------------------------------------------------------------------

    pub fn add_contact_for_user(&mut self, user: &UserId, contact: UserId) -> Result<()> {
        if let Some(client) = self.sessions.get_mut(user.as_str()) {
            client.add_contact(contact)?;
            return Ok(());
        }

        let mut entries = self.store.load_manifest(user)?;
        let present = entries
            .iter()
            .any(|e| matches!(e, ManifestEntry::Contact(c) if c.eq_ignore_case(&contact)));
        if !present {
            entries.push(ManifestEntry::Contact(contact));
            self.store.save_manifest(user, &entries)?;
        }
        Ok(())
    }

    pub fn add_room_to_user(&mut self, user: &UserId, room_id: RoomId) -> Result<()> {
        if let Some(client) = self.sessions.get_mut(user.as_str()) {
            client.adopt_room(room_id)?;
            return Ok(());
        }

        let mut entries = self.store.load_manifest(user)?;
        let present = entries.iter().any(
            |e| matches!(e, ManifestEntry::Room { id, .. } if id.as_str().eq_ignore_ascii_case(room_id.as_str())),
        );
        if !present {
            let name = room_id.as_str().to_string();
            entries.push(ManifestEntry::Room { id: room_id, name });
            self.store.save_manifest(user, &entries)?;
        }
        Ok(())
    }

    pub fn has_room_for_user(&self, user: &UserId, room_id: &RoomId) -> Result<bool> {
        if let Some(client) = self.sessions.get(user.as_str()) {
            let in_memory = client
                .rooms()
                .any(|r| r.id().as_str().eq_ignore_ascii_case(room_id.as_str()));
            if in_memory {
                return Ok(true);
            }
        }
        let entries = self.store.load_manifest(user)?;
        Ok(entries.iter().any(
            |e| matches!(e, ManifestEntry::Room { id, .. } if id.as_str().eq_ignore_ascii_case(room_id.as_str())),
        ))
    }

    // ------------------------------------------------------------------
    // Block lists
    // ------------------------------------------------------------------

    pub fn block_user(&mut self, user: &UserId, target: UserId) -> Result<()> {
        let mut list = self.store.load_blocklist(user)?;
        if !list.iter().any(|b| b.eq_ignore_case(&target)) {
            info!(user = %user, target = %target, "blocked user");
            list.push(target);
            self.store.save_blocklist(user, &list)?;
        }
        Ok(())
    }

    pub fn unblock_user(&mut self, user: &UserId, target: &UserId) -> Result<()> {
        let mut list = self.store.load_blocklist(user)?;
        let before = list.len();
        list.retain(|b| !b.eq_ignore_case(target));
        if list.len() != before {
            self.store.save_blocklist(user, &list)?;
        }
        Ok(())
    }

    /// Whether `user` has blocked `target`.
    pub fn is_blocked(&self, user: &UserId, target: &UserId) -> Result<bool> {
        Ok(self
            .store
            .load_blocklist(user)?
            .iter()
            .any(|b| b.eq_ignore_case(target)))
    }

    // ------------------------------------------------------------------
    // Profiles & presence
    // ------------------------------------------------------------------

    pub fn profile(&self, user: &UserId) -> Result<UserProfile> {
        self.accounts
            .get(user)
            .map(|a| a.profile.clone())
            .ok_or_else(|| ServerError::UnknownUser(user.clone()))
    }

    pub fn update_profile(&mut self, user: &UserId, profile: UserProfile) -> Result<()> {
        self.accounts.update_profile(user, profile)
    }

    pub fn set_online(&mut self, user: &UserId, online: bool) -> Result<()> {
        self.accounts.set_online(user, online)
    }

    pub fn is_online(&self, user: &UserId) -> bool {
        self.accounts.is_online(user)
    }

    pub fn last_status_change(&self, user: &UserId) -> Option<DateTime<Utc>> {
        self.accounts.get(user).map(|a| a.last_status_change)
    }

    /// Directory listing for the user list and its periodic refresh.
    pub fn all_users(&self) -> Vec<UserSummary> {
        self.accounts.all_users()
    }
}
