//! Server core functionality
//!
//! The TCP accept loop that turns each connection into a storage session.

pub mod core;

pub use self::core::Server;
