use thiserror::Error;

use parlor_shared::UserId;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Store error: {0}")]
    Store(#[from] parlor_store::StoreError),

    #[error("Invalid email address: {0:?}")]
    InvalidEmail(String),

    #[error("Invalid username: {0:?}")]
    InvalidUsername(String),

    #[error("Password does not meet the policy (8+ chars, a letter and a digit)")]
    WeakPassword,

    #[error("An account already exists for {0}")]
    EmailTaken(UserId),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("No account exists for {0}")]
    UnknownUser(UserId),

    #[error("{0} has no active session")]
    NotLoggedIn(UserId),

    #[error("{recipient} has blocked {sender}")]
    Blocked { sender: UserId, recipient: UserId },
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ServerError>;
