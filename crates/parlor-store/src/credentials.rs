//! The account credentials file.
//!
//! `users_credentials.txt` holds one account per line as
//! `email,username,password`.  The format predates this implementation and
//! is kept byte-compatible; registration rejects fields containing commas.
//! Passwords are stored in plain text — a known weakness of the original
//! system that is deliberately preserved.

use std::fs;
use std::io::Write;

use serde::{Deserialize, Serialize};

use parlor_shared::UserId;

use crate::error::Result;
use crate::store::Store;

/// One line of `users_credentials.txt`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CredentialRecord {
    pub email: UserId,
    pub username: String,
    pub password: String,
}

impl Store {
    /// Load every account record.  A missing file is an empty directory;
    /// malformed lines are skipped with a warning.
    pub fn load_credentials(&self) -> Result<Vec<CredentialRecord>> {
        let path = self.credentials_path();
        let raw = match fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (line_no, line) in raw.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            match parse_credential_line(line) {
                Some(record) => records.push(record),
                None => {
                    tracing::warn!(line = line_no + 1, "skipping malformed credentials line");
                }
            }
        }
        Ok(records)
    }

    /// Append one account record.
    pub fn append_credential(&self, record: &CredentialRecord) -> Result<()> {
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.credentials_path())?;
        writeln!(
            file,
            "{},{},{}",
            record.email, record.username, record.password
        )?;
        Ok(())
    }

    /// Rewrite the credentials file from scratch (used after a password
    /// reset).
    pub fn save_credentials(&self, records: &[CredentialRecord]) -> Result<()> {
        let mut out = String::new();
        for record in records {
            out.push_str(&format!(
                "{},{},{}\n",
                record.email, record.username, record.password
            ));
        }
        fs::write(self.credentials_path(), out)?;
        Ok(())
    }
}

fn parse_credential_line(line: &str) -> Option<CredentialRecord> {
    let parts: Vec<&str> = line.split(',').collect();
    match parts.as_slice() {
        [email, username, password] if !email.is_empty() => Some(CredentialRecord {
            email: UserId::new(*email),
            username: username.to_string(),
            password: password.to_string(),
        }),
        _ => None,
    }
}
