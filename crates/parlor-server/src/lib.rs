//! # parlor-server
//!
//! The in-process "server" half of the Parlor desktop messenger.
//!
//! There is no network: the GUI shell constructs one [`ChatServer`] per
//! process and drives it directly.  The service owns:
//! - the **account directory** (credentials, profiles, presence)
//! - one **client session** per user, kept warm across logout
//! - the **send pipeline**, including offline delivery through per-user
//!   outbox queues
//! - the **repair passes** that reconcile legacy on-disk state on login
//!   (duplicate collapse, case-mismatched room files, orphaned rooms)
//!
//! Exactly one process may use a given data directory at a time.

pub mod accounts;
pub mod config;
pub mod server;
pub mod stories;

mod error;

pub use accounts::{Account, UserSummary};
pub use config::ServerConfig;
pub use error::ServerError;
pub use server::ChatServer;
