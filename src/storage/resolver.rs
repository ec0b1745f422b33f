//! Path resolution
//!
//! Translates logical `/`-separated paths into node ids and back. Nothing in
//! here mutates the tree.

use crate::error::StorageError;
use crate::storage::node::{NodeId, NodeType, StorageNode};
use crate::storage::tree::DirectoryTree;

pub const ROOT_PATH: &str = "/";

/// Resolve `input` against the absolute directory path `base`.
///
/// Absolute inputs ignore `base`. Empty and `.` segments are dropped and
/// `..` steps up, stopping at the root.
pub fn normalize(base: &str, input: &str) -> String {
    let mut segments: Vec<&str> = if input.starts_with('/') {
        Vec::new()
    } else {
        base.split('/').filter(|s| !s.is_empty()).collect()
    };

    for segment in input.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    if segments.is_empty() {
        ROOT_PATH.to_string()
    } else {
        format!("/{}", segments.join("/"))
    }
}

/// Split a normalized path into its parent directory and final name.
///
/// The root has no name and is returned as `("/", "")`.
pub fn split_parent(path: &str) -> (String, String) {
    match path.rfind('/') {
        Some(0) => (ROOT_PATH.to_string(), path[1..].to_string()),
        Some(pos) => (path[..pos].to_string(), path[pos + 1..].to_string()),
        None => (ROOT_PATH.to_string(), path.to_string()),
    }
}

pub fn join(dir: &str, name: &str) -> String {
    if dir.ends_with('/') {
        format!("{dir}{name}")
    } else {
        format!("{dir}/{name}")
    }
}

/// Look up a normalized absolute path.
pub fn resolve(tree: &DirectoryTree, path: &str) -> Option<NodeId> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .try_fold(tree.root(), |current, segment| {
            tree.child_named(current, segment)
        })
}

pub fn resolve_existing(tree: &DirectoryTree, path: &str) -> Result<NodeId, StorageError> {
    resolve(tree, path).ok_or_else(|| StorageError::NoSuchFile(path.to_string()))
}

/// Resolve a path that must name a node of the given type.
pub fn resolve_typed(
    tree: &DirectoryTree,
    path: &str,
    expected: NodeType,
) -> Result<NodeId, StorageError> {
    let id = resolve_existing(tree, path)?;
    match tree.get(id).map(StorageNode::node_type) {
        Some(actual) if actual == expected => Ok(id),
        _ => Err(StorageError::NoSuchFile(path.to_string())),
    }
}

pub fn resolve_directory(tree: &DirectoryTree, path: &str) -> Result<NodeId, StorageError> {
    resolve_typed(tree, path, NodeType::Directory)
}

pub fn resolve_file(tree: &DirectoryTree, path: &str) -> Result<NodeId, StorageError> {
    resolve_typed(tree, path, NodeType::File)
}

/// Rebuild the absolute path of a node by following parent references.
pub fn path_of(tree: &DirectoryTree, id: NodeId) -> String {
    let mut names: Vec<&str> = tree
        .ancestors_inclusive(id)
        .filter(|&ancestor| ancestor != tree.root())
        .filter_map(|ancestor| tree.get(ancestor).map(StorageNode::name))
        .collect();
    names.reverse();

    if names.is_empty() {
        ROOT_PATH.to_string()
    } else {
        format!("/{}", names.join("/"))
    }
}
