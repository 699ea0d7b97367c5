//! # parlor-shared
//!
//! Domain types shared by every Parlor crate: user and room identifiers,
//! the [`Message`] value and its on-disk line codec, and the validation
//! helpers consumed by the auth flows.
//!
//! This crate performs no I/O.  Everything that touches the data directory
//! lives in `parlor-store`.

pub mod error;
pub mod message;
pub mod types;
pub mod validate;

pub use error::MessageParseError;
pub use message::{Message, MessageKey};
pub use types::{RoomId, UserId, DEFAULT_DOMAIN};
