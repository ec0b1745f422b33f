//! Query result types
//!
//! Listings are snapshots copied out of the tree while the read lock is held,
//! so later sorting and filtering never look at live nodes.

use chrono::{DateTime, Utc};

use crate::storage::node::{NodeId, NodeType, StorageNode};
use crate::storage::resolver::path_of;
use crate::storage::tree::DirectoryTree;

/// Metadata of one node at the time of the query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub name: String,
    pub path: String,
    pub node_type: NodeType,
    pub size: u64,
    pub extension: Option<String>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

impl EntryInfo {
    pub fn from_node(tree: &DirectoryTree, id: NodeId) -> Option<Self> {
        let node = tree.get(id)?;
        Some(Self {
            name: node.name().to_string(),
            path: path_of(tree, id),
            node_type: node.node_type(),
            size: node.size(),
            extension: node.extension().map(str::to_string),
            created: node.created(),
            modified: node.modified(),
        })
    }

    pub fn is_file(&self) -> bool {
        self.node_type == NodeType::File
    }
}

/// Ordered result of a query.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Listing {
    pub entries: Vec<EntryInfo>,
}

impl Listing {
    pub(crate) fn collect<I>(tree: &DirectoryTree, ids: I) -> Self
    where
        I: IntoIterator<Item = NodeId>,
    {
        Self {
            entries: ids
                .into_iter()
                .filter_map(|id| EntryInfo::from_node(tree, id))
                .collect(),
        }
    }

    /// Keep only entries that are files.
    pub(crate) fn collect_files<I>(tree: &DirectoryTree, ids: I) -> Self
    where
        I: IntoIterator<Item = NodeId>,
    {
        Self::collect(
            tree,
            ids.into_iter()
                .filter(|&id| tree.get(id).is_some_and(StorageNode::is_file)),
        )
    }

    pub fn names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    pub fn paths(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.path.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
