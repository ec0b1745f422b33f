//! Constraint checks
//!
//! Side-effect free validators consulted before any structural mutation
//! commits. Each returns the first violation it finds.

use std::collections::BTreeSet;

use crate::error::StorageError;
use crate::storage::node::{DirectoryData, NodeId, StorageNode, extension_of};
use crate::storage::resolver::path_of;
use crate::storage::tree::DirectoryTree;

/// Reject names that cannot be addressed through a path.
pub fn check_name_syntax(name: &str) -> Result<(), StorageError> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') || name.contains('\0')
    {
        return Err(StorageError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Sibling names are unique, compared exactly.
pub fn check_name(tree: &DirectoryTree, dir: NodeId, name: &str) -> Result<(), StorageError> {
    match tree.child_named(dir, name) {
        Some(_) => Err(StorageError::DuplicateName(name.to_string())),
        None => Ok(()),
    }
}

/// The extension must be in neither the directory's nor the storage's
/// disallowed set.
pub fn check_extension(
    dir: &DirectoryData,
    storage_disallowed: &BTreeSet<String>,
    dir_path: &str,
    name: &str,
) -> Result<(), StorageError> {
    let Some(ext) = extension_of(name) else {
        return Ok(());
    };

    if dir.disallowed.contains(ext) || storage_disallowed.contains(ext) {
        return Err(StorageError::InvalidExtension {
            extension: ext.to_string(),
            directory: dir_path.to_string(),
        });
    }
    Ok(())
}

/// Current entry count must be strictly below the configured capacity.
pub fn check_capacity(dir: &DirectoryData, dir_path: &str) -> Result<(), StorageError> {
    match dir.capacity {
        Some(capacity) if dir.children().len() >= capacity => Err(StorageError::CapacityExceeded {
            path: dir_path.to_string(),
            capacity,
        }),
        _ => Ok(()),
    }
}

/// Running total plus `added` must fit in the storage quota.
pub fn check_quota(used: u64, quota: u64, added: u64) -> Result<(), StorageError> {
    match used.checked_add(added) {
        Some(total) if total <= quota => Ok(()),
        _ => Err(StorageError::QuotaExceeded {
            scope: "storage".to_string(),
            requested: added,
            available: quota.saturating_sub(used),
        }),
    }
}

/// Every directory from `dir` up to the root with a byte limit must still fit
/// after `added` bytes arrive.
///
/// Directories that are ancestors of `already_counted_in` hold those bytes
/// already and are skipped; moves pass the old parent here.
pub fn check_directory_quotas(
    tree: &DirectoryTree,
    dir: NodeId,
    added: u64,
    already_counted_in: Option<NodeId>,
) -> Result<(), StorageError> {
    for ancestor in tree.ancestors_inclusive(dir) {
        if already_counted_in.is_some_and(|origin| tree.is_ancestor_or_self(ancestor, origin)) {
            continue;
        }

        let Some(data) = tree.get(ancestor).and_then(StorageNode::as_directory) else {
            continue;
        };
        if let Some(limit) = data.max_bytes {
            if data.total_bytes().saturating_add(added) > limit {
                return Err(StorageError::QuotaExceeded {
                    scope: path_of(tree, ancestor),
                    requested: added,
                    available: limit.saturating_sub(data.total_bytes()),
                });
            }
        }
    }
    Ok(())
}

/// `destination` must be neither `subtree_root` nor one of its descendants.
pub fn check_cycle(
    tree: &DirectoryTree,
    subtree_root: NodeId,
    destination: NodeId,
) -> Result<(), StorageError> {
    if tree.is_ancestor_or_self(subtree_root, destination) {
        return Err(StorageError::CycleDetected {
            path: path_of(tree, subtree_root),
            destination: path_of(tree, destination),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::node::{DirectoryOptions, NodeSpec};
    use crate::storage::node::parse_restriction;
    use chrono::{TimeZone, Utc};

    fn tree_with_limits() -> (DirectoryTree, NodeId, NodeId) {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let mut tree = DirectoryTree::new(now, DirectoryOptions::default());
        let root = tree.root();
        let limited = DirectoryOptions::default()
            .with_capacity(1)
            .with_max_bytes(100)
            .with_disallowed(["exe"]);
        let dir = tree.attach(
            root,
            StorageNode::new("limited", now, NodeSpec::Directory(limited)),
        );
        let inner = tree.attach(dir, StorageNode::new("inner", now, NodeSpec::directory()));
        (tree, dir, inner)
    }

    #[test]
    fn test_name_syntax() {
        assert!(check_name_syntax("a.txt").is_ok());
        for bad in ["", ".", "..", "a/b"] {
            assert_eq!(
                check_name_syntax(bad),
                Err(StorageError::InvalidName(bad.to_string()))
            );
        }
    }

    #[test]
    fn test_duplicate_name_is_case_sensitive() {
        let (tree, dir, _) = tree_with_limits();
        assert!(check_name(&tree, dir, "inner").is_err());
        assert!(check_name(&tree, dir, "Inner").is_ok());
    }

    #[test]
    fn test_extension_union_of_directory_and_storage() {
        let (tree, dir, _) = tree_with_limits();
        let data = tree.get(dir).and_then(StorageNode::as_directory).unwrap();
        let global = parse_restriction("bat");

        assert!(check_extension(data, &global, "/limited", "run.exe").is_err());
        assert!(check_extension(data, &global, "/limited", "run.bat").is_err());
        assert!(check_extension(data, &global, "/limited", "run.EXE").is_ok());
        assert!(check_extension(data, &global, "/limited", "notes").is_ok());
    }

    #[test]
    fn test_capacity_is_strict() {
        let (tree, dir, _) = tree_with_limits();
        let data = tree.get(dir).and_then(StorageNode::as_directory).unwrap();
        assert_eq!(
            check_capacity(data, "/limited"),
            Err(StorageError::CapacityExceeded {
                path: "/limited".into(),
                capacity: 1
            })
        );
    }

    #[test]
    fn test_quota_boundaries() {
        assert!(check_quota(90, 100, 10).is_ok());
        assert!(check_quota(90, 100, 11).is_err());
        assert!(check_quota(u64::MAX, 100, 1).is_err());
    }

    #[test]
    fn test_directory_quota_checks_ancestors() {
        let (tree, dir, inner) = tree_with_limits();
        assert!(check_directory_quotas(&tree, inner, 100, None).is_ok());
        assert!(check_directory_quotas(&tree, inner, 101, None).is_err());
        // bytes that already live under /limited do not count twice
        assert!(check_directory_quotas(&tree, inner, 101, Some(dir)).is_ok());
    }

    #[test]
    fn test_cycle_detection() {
        let (tree, dir, inner) = tree_with_limits();
        assert!(check_cycle(&tree, dir, inner).is_err());
        assert!(check_cycle(&tree, dir, dir).is_err());
        assert!(check_cycle(&tree, inner, tree.root()).is_ok());
    }
}
