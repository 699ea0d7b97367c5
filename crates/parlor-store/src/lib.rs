//! # parlor-store
//!
//! The flat-file data directory behind Parlor.  Every persisted artifact is
//! a small plain-text or JSON file under one root:
//!
//! ```text
//! users_credentials.txt      email,username,password
//! users/<email>.txt          CONTACT:/ROOM: manifest directives
//! rooms/<roomId>.txt         one message per line, append-ordered
//! outbox/<email>.json        pending offline deliveries
//! profiles/<email>.json      nickname / bio / avatar
//! stories/<email>.json       ephemeral posts
//! blocks/<email>.txt         one blocked email per line
//! ```
//!
//! The crate exposes a synchronous [`Store`] handle with typed helpers per
//! file family.  Exactly one process may use a data directory at a time;
//! nothing here takes locks.

pub mod blocks;
pub mod credentials;
pub mod manifests;
pub mod outbox;
pub mod profiles;
pub mod rooms;
pub mod stories;
pub mod store;

mod error;

pub use credentials::CredentialRecord;
pub use error::StoreError;
pub use manifests::ManifestEntry;
pub use outbox::PendingDelivery;
pub use profiles::UserProfile;
pub use rooms::ReconcileReport;
pub use stories::Story;
pub use store::Store;
