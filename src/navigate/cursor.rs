//! Navigation cursor
//!
//! Per-session current directory plus a history of previously visited
//! directories. The cursor stores paths, not node ids, so it is independent of
//! the tree's structural state; a path left dangling by a later rename or
//! delete simply fails to resolve on the next query.

use log::debug;

use crate::storage::node::StorageNode;
use crate::storage::resolver::{self, ROOT_PATH};
use crate::storage::Storage;

#[derive(Debug, Clone)]
pub struct NavigationCursor {
    current: String,
    history: Vec<String>,
}

impl Default for NavigationCursor {
    fn default() -> Self {
        Self {
            current: ROOT_PATH.to_string(),
            history: Vec::new(),
        }
    }
}

impl NavigationCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Absolute path of the current directory.
    pub fn current(&self) -> &str {
        &self.current
    }

    /// The logical root. Does not touch the history.
    pub fn root(&self) -> &'static str {
        ROOT_PATH
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Step into the direct child directory `name`.
    ///
    /// Returns `false` and leaves the cursor unchanged when there is no such
    /// child directory.
    pub fn forward(&mut self, storage: &Storage, name: &str) -> bool {
        if name.is_empty() || name.contains('/') || name == "." || name == ".." {
            return false;
        }

        let target = resolver::join(&self.current, name);
        let is_directory = resolver::resolve(storage.tree(), &target)
            .and_then(|id| storage.tree().get(id))
            .is_some_and(StorageNode::is_directory);

        if !is_directory {
            debug!("Cannot move forward into {}", target);
            return false;
        }

        let previous = std::mem::replace(&mut self.current, target);
        self.history.push(previous);
        true
    }

    /// Return to the previously visited directory, if any.
    pub fn backwards(&mut self) -> bool {
        match self.history.pop() {
            Some(previous) => {
                self.current = previous;
                true
            }
            None => false,
        }
    }

    /// Jump back to the root and forget the history.
    pub fn reset(&mut self) {
        self.current = ROOT_PATH.to_string();
        self.history.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::NodeSpec;

    fn storage() -> Storage {
        let mut storage = Storage::init("/srv", 100, "");
        storage.insert("/", "docs", NodeSpec::directory()).unwrap();
        storage.insert("/docs", "old", NodeSpec::directory()).unwrap();
        storage.insert("/", "a.txt", NodeSpec::empty_file()).unwrap();
        storage
    }

    #[test]
    fn test_forward_then_backwards_round_trip() {
        let storage = storage();
        let mut cursor = NavigationCursor::new();

        assert!(cursor.forward(&storage, "docs"));
        assert!(cursor.forward(&storage, "old"));
        assert_eq!(cursor.current(), "/docs/old");

        assert!(cursor.backwards());
        assert_eq!(cursor.current(), "/docs");
        assert!(cursor.backwards());
        assert_eq!(cursor.current(), "/");

        assert!(!cursor.backwards());
        assert_eq!(cursor.current(), "/");
    }

    #[test]
    fn test_forward_rejects_files_and_missing() {
        let storage = storage();
        let mut cursor = NavigationCursor::new();

        assert!(!cursor.forward(&storage, "a.txt"));
        assert!(!cursor.forward(&storage, "missing"));
        assert!(!cursor.forward(&storage, "docs/old"));
        assert!(!cursor.forward(&storage, ".."));
        assert_eq!(cursor.current(), "/");
        assert_eq!(cursor.history_len(), 0);
    }

    #[test]
    fn test_root_leaves_history_alone() {
        let storage = storage();
        let mut cursor = NavigationCursor::new();
        cursor.forward(&storage, "docs");

        assert_eq!(cursor.root(), "/");
        assert_eq!(cursor.history_len(), 1);

        cursor.reset();
        assert_eq!(cursor.current(), "/");
        assert_eq!(cursor.history_len(), 0);
    }
}
