pub mod config;
pub mod error;
pub mod navigate;
pub mod protocol;
pub mod query;
pub mod server;
pub mod session;
pub mod storage;
pub mod transfer;

pub use server::Server;
pub use session::Session;
pub use storage::{SharedStorage, Storage};
