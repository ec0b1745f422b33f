//! Virtual storage
//!
//! The in-memory directory tree, its constraint checks and path resolution.

pub mod clock;
pub mod constraints;
pub mod core;
pub mod node;
pub mod operations;
pub mod resolver;
pub mod tree;

pub use clock::{Clock, FixedClock, SystemClock};
pub use self::core::{SharedStorage, Storage};
pub use node::{ContentHandle, DirectoryOptions, NodeId, NodeKind, NodeSpec, NodeType, StorageNode};
pub use resolver::ROOT_PATH;
pub use tree::DirectoryTree;
