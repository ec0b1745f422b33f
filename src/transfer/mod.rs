//! Transfer module
//!
//! Gateways that move file bytes between the storage backend and the local
//! side, plus plan execution with abort-on-first-failure and timeouts.

pub mod file_ops;
pub mod gateway;
pub mod memory;
pub mod operations;
pub mod results;

pub use file_ops::LocalGateway;
pub use gateway::{TransferDirection, TransferGateway, TransferRequest};
pub use memory::{MemoryGateway, RecordedTransfer};
pub use operations::{execute_plan, execute_with_timeout};
pub use results::{TransferPlan, TransferReport, TransferStep};
