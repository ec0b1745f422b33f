//! Error handling
//!
//! Defines error types and handling for the storage manager.

pub mod handlers;
pub mod types;

pub use types::*;
