//! The account directory.
//!
//! Every registered user has one row in `users_credentials.txt` and an
//! optional profile file.  Passwords are compared and stored in plain text;
//! this mirrors the system being replaced and is an accepted weakness, not
//! an oversight to fix here.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use parlor_shared::{validate, UserId};
use parlor_store::{CredentialRecord, Store, UserProfile};

use crate::error::{Result, ServerError};

/// One registered account plus its runtime presence state.
#[derive(Debug, Clone)]
pub struct Account {
    pub email: UserId,
    pub username: String,
    password: String,
    pub profile: UserProfile,
    pub online: bool,
    pub last_status_change: DateTime<Utc>,
}

/// Directory row handed to the UI's user list.
#[derive(Debug, Clone, Serialize)]
pub struct UserSummary {
    pub email: UserId,
    pub username: String,
    pub online: bool,
}

/// In-memory view of the account files, loaded once at startup.
pub struct AccountRegistry {
    store: Arc<Store>,
    accounts: HashMap<String, Account>,
}

impl AccountRegistry {
    /// Load every account and its profile from disk.  Everyone starts
    /// offline.
    pub fn load(store: Arc<Store>) -> Result<Self> {
        let mut accounts = HashMap::new();
        for record in store.load_credentials()? {
            let profile = store.load_profile(&record.email)?;
            accounts.insert(
                record.email.as_str().to_string(),
                Account {
                    email: record.email,
                    username: record.username,
                    password: record.password,
                    profile,
                    online: false,
                    last_status_change: Utc::now(),
                },
            );
        }

        tracing::info!(count = accounts.len(), "loaded account directory");
        Ok(Self { store, accounts })
    }

    pub fn get(&self, email: &UserId) -> Option<&Account> {
        self.accounts.get(email.as_str())
    }

    /// Whether `password` matches the stored one.  Unknown accounts fail.
    pub fn verify(&self, email: &UserId, password: &str) -> bool {
        self.get(email).map(|a| a.password == password).unwrap_or(false)
    }

    /// Create an account.  Field shapes are validated here because the
    /// credentials file is comma-delimited.
    pub fn register(&mut self, email: &str, username: &str, password: &str) -> Result<()> {
        if !validate::is_valid_email(email) {
            return Err(ServerError::InvalidEmail(email.to_string()));
        }
        if username.is_empty() || username.contains(',') || username.contains('\n') {
            return Err(ServerError::InvalidUsername(username.to_string()));
        }
        if !validate::is_valid_password(password) {
            return Err(ServerError::WeakPassword);
        }

        let user = UserId::new(email);
        let taken = self
            .accounts
            .values()
            .any(|a| a.email.eq_ignore_case(&user));
        if taken {
            return Err(ServerError::EmailTaken(user));
        }

        let record = CredentialRecord {
            email: user.clone(),
            username: username.to_string(),
            password: password.to_string(),
        };
        self.store.append_credential(&record)?;

        self.accounts.insert(
            email.to_string(),
            Account {
                email: user.clone(),
                username: username.to_string(),
                password: password.to_string(),
                profile: UserProfile::default(),
                online: false,
                last_status_change: Utc::now(),
            },
        );

        tracing::info!(user = %user, "registered account");
        Ok(())
    }

    /// Overwrite an account's password (forgot-password flow) and rewrite
    /// the credentials file.
    pub fn reset_password(&mut self, email: &UserId, new_password: &str) -> Result<()> {
        if !validate::is_valid_password(new_password) {
            return Err(ServerError::WeakPassword);
        }
        let account = self
            .accounts
            .get_mut(email.as_str())
            .ok_or_else(|| ServerError::UnknownUser(email.clone()))?;
        account.password = new_password.to_string();

        let records: Vec<CredentialRecord> = self
            .accounts
            .values()
            .map(|a| CredentialRecord {
                email: a.email.clone(),
                username: a.username.clone(),
                password: a.password.clone(),
            })
            .collect();
        self.store.save_credentials(&records)?;

        tracing::info!(user = %email, "password reset");
        Ok(())
    }

    /// Flip the online flag, stamping the change time.  Setting the current
    /// value again is a no-op.
    pub fn set_online(&mut self, email: &UserId, online: bool) -> Result<()> {
        let account = self
            .accounts
            .get_mut(email.as_str())
            .ok_or_else(|| ServerError::UnknownUser(email.clone()))?;
        if account.online != online {
            account.online = online;
            account.last_status_change = Utc::now();
        }
        Ok(())
    }

    pub fn is_online(&self, email: &UserId) -> bool {
        self.get(email).map(|a| a.online).unwrap_or(false)
    }

    pub fn update_profile(&mut self, email: &UserId, profile: UserProfile) -> Result<()> {
        let account = self
            .accounts
            .get_mut(email.as_str())
            .ok_or_else(|| ServerError::UnknownUser(email.clone()))?;
        self.store.save_profile(email, &profile)?;
        account.profile = profile;
        Ok(())
    }

    /// Directory listing, sorted by email for a stable UI order.
    pub fn all_users(&self) -> Vec<UserSummary> {
        let mut users: Vec<UserSummary> = self
            .accounts
            .values()
            .map(|a| UserSummary {
                email: a.email.clone(),
                username: a.username.clone(),
                online: a.online,
            })
            .collect();
        users.sort_by(|a, b| a.email.as_str().cmp(b.email.as_str()));
        users
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> (AccountRegistry, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open_at(dir.path()).unwrap());
        (AccountRegistry::load(store).unwrap(), dir)
    }

    #[test]
    fn register_and_verify() {
        let (mut reg, _dir) = registry();
        reg.register("a@x.com", "alice", "secret99").unwrap();

        let user = UserId::new("a@x.com");
        assert!(reg.verify(&user, "secret99"));
        assert!(!reg.verify(&user, "wrong000"));
        assert!(!reg.verify(&UserId::new("nobody@x.com"), "secret99"));
    }

    #[test]
    fn register_rejects_bad_input() {
        let (mut reg, _dir) = registry();
        assert!(matches!(
            reg.register("not-an-email", "alice", "secret99"),
            Err(ServerError::InvalidEmail(_))
        ));
        assert!(matches!(
            reg.register("a@x.com", "al,ice", "secret99"),
            Err(ServerError::InvalidUsername(_))
        ));
        assert!(matches!(
            reg.register("a@x.com", "alice", "weak"),
            Err(ServerError::WeakPassword)
        ));
    }

    #[test]
    fn duplicate_registration_is_rejected_case_insensitively() {
        let (mut reg, _dir) = registry();
        reg.register("a@x.com", "alice", "secret99").unwrap();
        assert!(matches!(
            reg.register("A@X.COM", "alice2", "secret99"),
            Err(ServerError::EmailTaken(_))
        ));
    }

    #[test]
    fn accounts_survive_a_reload() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(Store::open_at(dir.path()).unwrap());

        let mut reg = AccountRegistry::load(store.clone()).unwrap();
        reg.register("a@x.com", "alice", "secret99").unwrap();
        reg.reset_password(&UserId::new("a@x.com"), "changed00").unwrap();

        let reloaded = AccountRegistry::load(store).unwrap();
        assert!(reloaded.verify(&UserId::new("a@x.com"), "changed00"));
        assert!(!reloaded.is_online(&UserId::new("a@x.com")));
    }

    #[test]
    fn online_flag_stamps_changes_only() {
        let (mut reg, _dir) = registry();
        reg.register("a@x.com", "alice", "secret99").unwrap();
        let user = UserId::new("a@x.com");

        reg.set_online(&user, true).unwrap();
        let stamp = reg.get(&user).unwrap().last_status_change;
        reg.set_online(&user, true).unwrap();
        assert_eq!(reg.get(&user).unwrap().last_status_change, stamp);
        assert!(reg.is_online(&user));
    }

    #[test]
    fn all_users_is_sorted() {
        let (mut reg, _dir) = registry();
        reg.register("b@y.com", "bob", "secret99").unwrap();
        reg.register("a@x.com", "alice", "secret99").unwrap();

        let users = reg.all_users();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].email.as_str(), "a@x.com");
        assert_eq!(users[1].email.as_str(), "b@y.com");
    }
}
