//! # parlor-client
//!
//! One logged-in user's view of the chat system: a [`Client`] owning a
//! contact list and a map of [`Room`]s, persisted through a per-user
//! manifest.  The server crate constructs one `Client` per session and
//! routes UI calls through it.

pub mod client;
pub mod room;

pub use client::Client;
pub use room::Room;
