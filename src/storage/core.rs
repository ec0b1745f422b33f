//! Storage root
//!
//! A storage is the directory tree plus the global quota and extension
//! restrictions that apply to it.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::info;
use parking_lot::RwLock;

use crate::storage::clock::{Clock, SystemClock};
use crate::storage::node::{DirectoryOptions, parse_restriction};
use crate::storage::tree::DirectoryTree;

/// Storage shared between sessions. Mutations take the write lock for the
/// whole validate-then-commit step; queries take the read lock.
pub type SharedStorage = Arc<RwLock<Storage>>;

pub struct Storage {
    root_path: String,
    quota: u64,
    pub(crate) disallowed: BTreeSet<String>,
    pub(crate) tree: DirectoryTree,
    clock: Arc<dyn Clock>,
}

impl Storage {
    /// Create a storage rooted at the backend location `path`, holding at
    /// most `storage_size` bytes and rejecting the extensions listed in
    /// `restriction` everywhere.
    pub fn init(path: &str, storage_size: u64, restriction: &str) -> Self {
        Self::init_with_clock(path, storage_size, restriction, Arc::new(SystemClock))
    }

    pub fn init_with_clock(
        path: &str,
        storage_size: u64,
        restriction: &str,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let disallowed = parse_restriction(restriction);
        let tree = DirectoryTree::new(clock.now(), DirectoryOptions::default());

        info!(
            "Initialized storage at {} (quota {} bytes, restricted extensions: {:?})",
            path, storage_size, disallowed
        );

        Self {
            root_path: path.to_string(),
            quota: storage_size,
            disallowed,
            tree,
            clock,
        }
    }

    pub fn into_shared(self) -> SharedStorage {
        Arc::new(RwLock::new(self))
    }

    /// Backend location supplied at initialization.
    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    pub fn quota(&self) -> u64 {
        self.quota
    }

    /// Sum of every file size under the root.
    pub fn used_bytes(&self) -> u64 {
        self.tree.subtree_bytes(self.tree.root())
    }

    pub fn available_bytes(&self) -> u64 {
        self.quota.saturating_sub(self.used_bytes())
    }

    pub fn disallowed_extensions(&self) -> &BTreeSet<String> {
        &self.disallowed
    }

    pub fn tree(&self) -> &DirectoryTree {
        &self.tree
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }
}
