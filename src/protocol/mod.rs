//! Storage protocol implementation
//!
//! Handles command parsing, dispatch and response generation for the
//! line-oriented command server.

pub mod commands;
pub mod handlers;
pub mod responses;

pub use commands::{Command, CommandResult, CommandStatus, parse_command};
pub use handlers::{TransferSettings, handle_command, handle_transfer_command};
