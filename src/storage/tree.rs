//! Directory tree arena
//!
//! Owns every node of a storage. Structural edits here are raw: they link,
//! unlink and keep byte totals in step, but never validate. Validation lives
//! in the constraint checks run by the storage operations.

use chrono::{DateTime, Utc};

use crate::storage::node::{DirectoryOptions, NodeId, NodeSpec, StorageNode};

pub const ROOT_NAME: &str = "";

#[derive(Debug, Clone)]
pub struct DirectoryTree {
    slots: Vec<Option<StorageNode>>,
    free: Vec<usize>,
    root: NodeId,
}

impl DirectoryTree {
    pub fn new(created: DateTime<Utc>, root_options: DirectoryOptions) -> Self {
        let root = StorageNode::new(ROOT_NAME, created, NodeSpec::Directory(root_options));
        Self {
            slots: vec![Some(root)],
            free: Vec::new(),
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&StorageNode> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut StorageNode> {
        self.slots.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Number of live nodes, root included.
    pub fn len(&self) -> usize {
        self.slots.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Direct children in insertion order; empty for files.
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id)
            .and_then(StorageNode::as_directory)
            .map(|dir| dir.children())
            .unwrap_or(&[])
    }

    pub fn child_named(&self, dir: NodeId, name: &str) -> Option<NodeId> {
        self.children(dir)
            .iter()
            .copied()
            .find(|&child| self.get(child).is_some_and(|node| node.name == name))
    }

    /// `id` followed by its parent chain up to the root.
    pub fn ancestors_inclusive(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(Some(id), move |&current| {
            self.get(current).and_then(StorageNode::parent)
        })
    }

    pub fn is_ancestor_or_self(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors_inclusive(node).any(|id| id == ancestor)
    }

    /// Pre-order walk of the subtree below `id`, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();

        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }

        out
    }

    /// Bytes held by a node: file size or directory subtree total.
    pub fn subtree_bytes(&self, id: NodeId) -> u64 {
        self.get(id).map(StorageNode::size).unwrap_or(0)
    }

    /// Allocate `node` and link it as the last child of `parent`.
    pub(crate) fn attach(&mut self, parent: NodeId, mut node: StorageNode) -> NodeId {
        node.parent = Some(parent);
        let bytes = node.size();

        let id = match self.free.pop() {
            Some(slot) => {
                self.slots[slot] = Some(node);
                NodeId(slot)
            }
            None => {
                self.slots.push(Some(node));
                NodeId(self.slots.len() - 1)
            }
        };

        if let Some(dir) = self.get_mut(parent).and_then(StorageNode::as_directory_mut) {
            dir.children.push(id);
        }
        self.add_bytes(parent, bytes);
        id
    }

    /// Unlink `id` from its parent, keeping the node and its subtree alive.
    pub(crate) fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.get(id).and_then(StorageNode::parent) else {
            return;
        };
        let bytes = self.subtree_bytes(id);

        if let Some(dir) = self.get_mut(parent).and_then(StorageNode::as_directory_mut) {
            dir.children.retain(|&child| child != id);
        }
        self.sub_bytes(parent, bytes);

        if let Some(node) = self.get_mut(id) {
            node.parent = None;
        }
    }

    /// Link a detached node under `new_parent`.
    pub(crate) fn reattach(&mut self, id: NodeId, new_parent: NodeId) {
        let bytes = self.subtree_bytes(id);

        if let Some(node) = self.get_mut(id) {
            node.parent = Some(new_parent);
        }
        if let Some(dir) = self.get_mut(new_parent).and_then(StorageNode::as_directory_mut) {
            dir.children.push(id);
        }
        self.add_bytes(new_parent, bytes);
    }

    /// Free the slots of a detached node and its whole subtree.
    pub(crate) fn release(&mut self, id: NodeId) {
        let mut doomed = self.descendants(id);
        doomed.push(id);

        for node in doomed {
            if let Some(slot) = self.slots.get_mut(node.0) {
                if slot.take().is_some() {
                    self.free.push(node.0);
                }
            }
        }
    }

    pub(crate) fn touch(&mut self, id: NodeId, now: DateTime<Utc>) {
        if let Some(node) = self.get_mut(id) {
            node.modified = now;
        }
    }

    fn add_bytes(&mut self, from: NodeId, bytes: u64) {
        if bytes == 0 {
            return;
        }
        let chain: Vec<NodeId> = self.ancestors_inclusive(from).collect();
        for id in chain {
            if let Some(dir) = self.get_mut(id).and_then(StorageNode::as_directory_mut) {
                dir.total_bytes += bytes;
            }
        }
    }

    fn sub_bytes(&mut self, from: NodeId, bytes: u64) {
        if bytes == 0 {
            return;
        }
        let chain: Vec<NodeId> = self.ancestors_inclusive(from).collect();
        for id in chain {
            if let Some(dir) = self.get_mut(id).and_then(StorageNode::as_directory_mut) {
                dir.total_bytes = dir.total_bytes.saturating_sub(bytes);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn node(name: &str, spec: NodeSpec) -> StorageNode {
        StorageNode::new(name, now(), spec)
    }

    #[test]
    fn test_attach_updates_totals_along_chain() {
        let mut tree = DirectoryTree::new(now(), DirectoryOptions::default());
        let root = tree.root();
        let docs = tree.attach(root, node("docs", NodeSpec::directory()));
        tree.attach(docs, node("a.txt", NodeSpec::file(40)));

        assert_eq!(tree.subtree_bytes(docs), 40);
        assert_eq!(tree.subtree_bytes(root), 40);
        assert_eq!(tree.len(), 3);
    }

    #[test]
    fn test_detach_and_reattach_moves_bytes() {
        let mut tree = DirectoryTree::new(now(), DirectoryOptions::default());
        let root = tree.root();
        let a = tree.attach(root, node("a", NodeSpec::directory()));
        let b = tree.attach(root, node("b", NodeSpec::directory()));
        let file = tree.attach(a, node("f.bin", NodeSpec::file(10)));

        tree.detach(file);
        assert_eq!(tree.subtree_bytes(a), 0);
        assert_eq!(tree.subtree_bytes(root), 0);

        tree.reattach(file, b);
        assert_eq!(tree.subtree_bytes(b), 10);
        assert_eq!(tree.subtree_bytes(root), 10);
        assert_eq!(tree.get(file).and_then(StorageNode::parent), Some(b));
    }

    #[test]
    fn test_release_frees_subtree_slots_for_reuse() {
        let mut tree = DirectoryTree::new(now(), DirectoryOptions::default());
        let root = tree.root();
        let dir = tree.attach(root, node("dir", NodeSpec::directory()));
        tree.attach(dir, node("x", NodeSpec::empty_file()));

        tree.detach(dir);
        tree.release(dir);
        assert_eq!(tree.len(), 1);
        assert!(tree.children(root).is_empty());

        let reused = tree.attach(root, node("y", NodeSpec::empty_file()));
        assert!(reused.0 <= 2);
        assert_eq!(tree.len(), 2);
    }

    #[test]
    fn test_descendants_are_preorder_in_insertion_order() {
        let mut tree = DirectoryTree::new(now(), DirectoryOptions::default());
        let root = tree.root();
        let a = tree.attach(root, node("a", NodeSpec::directory()));
        let a1 = tree.attach(a, node("a1", NodeSpec::empty_file()));
        let b = tree.attach(root, node("b", NodeSpec::empty_file()));

        assert_eq!(tree.descendants(root), vec![a, a1, b]);
        assert!(tree.is_ancestor_or_self(root, a1));
        assert!(!tree.is_ancestor_or_self(a, b));
    }
}
