//! Storage operations
//!
//! Structural mutations of the directory tree: insert, remove, rename and
//! move, plus the reverse lookups. Every mutation resolves its paths, runs the
//! constraint checks and only then touches the tree, so a rejected call leaves
//! the storage exactly as it was.

use log::{debug, info};

use crate::error::StorageError;
use crate::storage::constraints::{
    check_capacity, check_cycle, check_directory_quotas, check_extension, check_name,
    check_name_syntax, check_quota,
};
use crate::storage::core::Storage;
use crate::storage::node::{
    DirectoryData, NodeId, NodeSpec, NodeType, StorageNode, normalize_extensions,
};
use crate::storage::resolver::{self, path_of};

impl Storage {
    fn directory_data(&self, id: NodeId, path: &str) -> Result<&DirectoryData, StorageError> {
        self.tree
            .get(id)
            .and_then(StorageNode::as_directory)
            .ok_or_else(|| StorageError::NoSuchFile(path.to_string()))
    }

    /// Create a node named `name` inside the directory at `parent_path`.
    ///
    /// Checks run in a fixed order and the first failure wins: extension,
    /// capacity, duplicate name, then quota for files.
    pub fn insert(
        &mut self,
        parent_path: &str,
        name: &str,
        spec: NodeSpec,
    ) -> Result<NodeId, StorageError> {
        let parent = resolver::resolve_directory(&self.tree, parent_path)?;
        check_name_syntax(name)?;

        let dir = self.directory_data(parent, parent_path)?;
        if spec.node_type() == NodeType::File {
            check_extension(dir, &self.disallowed, parent_path, name)?;
        }
        check_capacity(dir, parent_path)?;
        check_name(&self.tree, parent, name)?;

        if let NodeSpec::File { size, .. } = &spec {
            check_quota(self.used_bytes(), self.quota(), *size)?;
            check_directory_quotas(&self.tree, parent, *size, None)?;
        }

        let now = self.now();
        let node_type = spec.node_type();
        let id = self.tree.attach(parent, StorageNode::new(name, now, spec));
        self.tree.touch(parent, now);

        info!(
            "Created {} {} ({} of {} bytes used)",
            node_type.as_str(),
            resolver::join(parent_path, name),
            self.used_bytes(),
            self.quota()
        );
        Ok(id)
    }

    /// Delete a file, or an empty directory other than the root.
    pub fn remove(&mut self, path: &str) -> Result<(), StorageError> {
        let id = resolver::resolve_existing(&self.tree, path)?;
        if id == self.tree.root() {
            return Err(StorageError::RootProtected);
        }

        let node = self
            .tree
            .get(id)
            .ok_or_else(|| StorageError::NoSuchFile(path.to_string()))?;
        if let Some(dir) = node.as_directory() {
            if !dir.children().is_empty() {
                return Err(StorageError::DirectoryNotEmpty(path.to_string()));
            }
        }
        let parent = node.parent();

        self.tree.detach(id);
        self.tree.release(id);
        if let Some(parent) = parent {
            let now = self.now();
            self.tree.touch(parent, now);
        }

        info!("Removed {} ({} bytes used)", path, self.used_bytes());
        Ok(())
    }

    /// Rename a node in place; its position among siblings does not change.
    pub fn rename(&mut self, path: &str, new_name: &str) -> Result<(), StorageError> {
        let id = resolver::resolve_existing(&self.tree, path)?;
        if id == self.tree.root() {
            return Err(StorageError::RootProtected);
        }
        check_name_syntax(new_name)?;

        let node = self
            .tree
            .get(id)
            .ok_or_else(|| StorageError::NoSuchFile(path.to_string()))?;
        if node.name() == new_name {
            return Ok(());
        }
        let is_file = node.is_file();
        let Some(parent) = node.parent() else {
            return Err(StorageError::RootProtected);
        };

        let parent_path = path_of(&self.tree, parent);
        check_name(&self.tree, parent, new_name)?;
        if is_file {
            let dir = self.directory_data(parent, &parent_path)?;
            check_extension(dir, &self.disallowed, &parent_path, new_name)?;
        }

        let now = self.now();
        if let Some(node) = self.tree.get_mut(id) {
            node.name = new_name.to_string();
            node.modified = now;
        }
        self.tree.touch(parent, now);

        info!("Renamed {} to {}", path, resolver::join(&parent_path, new_name));
        Ok(())
    }

    /// Re-parent the node at `path` under the directory at `new_dir_path`.
    pub fn move_node(&mut self, path: &str, new_dir_path: &str) -> Result<(), StorageError> {
        let id = resolver::resolve_existing(&self.tree, path)?;
        let destination = resolver::resolve_directory(&self.tree, new_dir_path)?;
        if id == self.tree.root() {
            return Err(StorageError::RootProtected);
        }
        check_cycle(&self.tree, id, destination)?;

        let node = self
            .tree
            .get(id)
            .ok_or_else(|| StorageError::NoSuchFile(path.to_string()))?;
        let old_parent = node.parent();
        if old_parent == Some(destination) {
            debug!("Move of {} into its own parent is a no-op", path);
            return Ok(());
        }
        let name = node.name().to_string();
        let is_file = node.is_file();

        check_name(&self.tree, destination, &name)?;
        let dir = self.directory_data(destination, new_dir_path)?;
        if is_file {
            check_extension(dir, &self.disallowed, new_dir_path, &name)?;
        }
        check_capacity(dir, new_dir_path)?;

        let bytes = self.tree.subtree_bytes(id);
        check_quota(self.used_bytes() - bytes, self.quota(), bytes)?;
        check_directory_quotas(&self.tree, destination, bytes, old_parent)?;

        self.tree.detach(id);
        self.tree.reattach(id, destination);

        let now = self.now();
        if let Some(old_parent) = old_parent {
            self.tree.touch(old_parent, now);
        }
        self.tree.touch(destination, now);

        info!("Moved {} into {} ({} bytes)", path, new_dir_path, bytes);
        Ok(())
    }

    /// Replace the directory-local extension restrictions. Files already
    /// present are left alone.
    pub fn set_unsupported_extensions<I, S>(
        &mut self,
        dir_path: &str,
        extensions: I,
    ) -> Result<(), StorageError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let id = resolver::resolve_directory(&self.tree, dir_path)?;
        let disallowed = normalize_extensions(extensions);

        let dir = self
            .tree
            .get_mut(id)
            .and_then(StorageNode::as_directory_mut)
            .ok_or_else(|| StorageError::NoSuchFile(dir_path.to_string()))?;
        info!("Restricted extensions in {}: {:?}", dir_path, disallowed);
        dir.disallowed = disallowed;
        Ok(())
    }

    /// Path of the first directory, in pre-order, that directly holds a file
    /// named `file_name`.
    pub fn find_directory(&self, file_name: &str) -> Result<String, StorageError> {
        let root = self.tree.root();
        std::iter::once(root)
            .chain(self.tree.descendants(root))
            .find(|&id| {
                self.tree
                    .child_named(id, file_name)
                    .and_then(|child| self.tree.get(child))
                    .is_some_and(StorageNode::is_file)
            })
            .map(|id| path_of(&self.tree, id))
            .ok_or_else(|| StorageError::NoSuchFile(file_name.to_string()))
    }

    /// Path of the first node, in pre-order, with the given name and type.
    pub fn find_path(&self, name: &str, node_type: NodeType) -> Result<String, StorageError> {
        self.tree
            .descendants(self.tree.root())
            .into_iter()
            .find(|&id| {
                self.tree
                    .get(id)
                    .is_some_and(|node| node.name() == name && node.node_type() == node_type)
            })
            .map(|id| path_of(&self.tree, id))
            .ok_or_else(|| StorageError::NoSuchFile(name.to_string()))
    }
}
