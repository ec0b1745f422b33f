//! Session management
//!
//! A session pairs a navigation cursor and a query history with a shared
//! storage and a transfer gateway. The server runs one session per
//! connection.

pub mod core;
pub mod handler;
pub mod registry;

pub use self::core::Session;
pub use handler::{ConnectionSettings, handle_session};
pub use registry::{SessionEntry, SessionRegistry};
