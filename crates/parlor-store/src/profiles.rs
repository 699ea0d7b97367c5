//! Per-user profile settings.
//!
//! Stored as `profiles/<email>.json`.  Unlike the legacy line formats this
//! file family is new, so it uses the structured JSON codec.

use std::fs;

use serde::{Deserialize, Serialize};

use parlor_shared::UserId;

use crate::error::Result;
use crate::store::{Store, PROFILES_DIR};

/// Profile settings shown on the settings screen.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProfile {
    /// Display name shown instead of the username, when set.
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub bio: String,
    /// Path of the avatar image chosen by the user, if any.
    #[serde(default)]
    pub avatar_path: Option<String>,
}

impl Store {
    /// Load a user's profile; a missing file yields the default profile.
    pub fn load_profile(&self, user: &UserId) -> Result<UserProfile> {
        let path = self.user_file(PROFILES_DIR, user, ".json")?;
        match fs::read_to_string(&path) {
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(UserProfile::default()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save_profile(&self, user: &UserId, profile: &UserProfile) -> Result<()> {
        let path = self.user_file(PROFILES_DIR, user, ".json")?;
        fs::write(path, serde_json::to_string_pretty(profile)?)?;
        Ok(())
    }
}
