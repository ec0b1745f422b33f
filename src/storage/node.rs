//! Storage nodes
//!
//! Files and directories held by the directory tree arena.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;

/// Index of a node inside the directory tree arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

/// Opaque reference to file content on the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentHandle(String);

impl ContentHandle {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    File,
    Directory,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::File => "file",
            NodeType::Directory => "dir",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileData {
    pub size: u64,
    pub content: Option<ContentHandle>,
}

#[derive(Debug, Clone, Default)]
pub struct DirectoryData {
    pub(crate) children: Vec<NodeId>,
    pub capacity: Option<usize>,
    pub max_bytes: Option<u64>,
    pub disallowed: BTreeSet<String>,
    /// Sum of all file sizes in this subtree.
    pub(crate) total_bytes: u64,
}

impl DirectoryData {
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes
    }
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    File(FileData),
    Directory(DirectoryData),
}

/// A file or directory entry.
///
/// `parent` is a lookup-only back reference; the tree owns every node
/// through the arena and the children lists.
#[derive(Debug, Clone)]
pub struct StorageNode {
    pub(crate) name: String,
    pub(crate) created: DateTime<Utc>,
    pub(crate) modified: DateTime<Utc>,
    pub(crate) parent: Option<NodeId>,
    pub(crate) kind: NodeKind,
}

impl StorageNode {
    pub(crate) fn new(name: &str, now: DateTime<Utc>, spec: NodeSpec) -> Self {
        let kind = match spec {
            NodeSpec::File { size, content } => NodeKind::File(FileData { size, content }),
            NodeSpec::Directory(options) => NodeKind::Directory(options.into_data()),
        };

        Self {
            name: name.to_string(),
            created: now,
            modified: now,
            parent: None,
            kind,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created(&self) -> DateTime<Utc> {
        self.created
    }

    pub fn modified(&self) -> DateTime<Utc> {
        self.modified
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    pub fn node_type(&self) -> NodeType {
        match self.kind {
            NodeKind::File(_) => NodeType::File,
            NodeKind::Directory(_) => NodeType::Directory,
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(self.kind, NodeKind::File(_))
    }

    pub fn is_directory(&self) -> bool {
        matches!(self.kind, NodeKind::Directory(_))
    }

    pub fn as_directory(&self) -> Option<&DirectoryData> {
        match &self.kind {
            NodeKind::Directory(dir) => Some(dir),
            NodeKind::File(_) => None,
        }
    }

    pub(crate) fn as_directory_mut(&mut self) -> Option<&mut DirectoryData> {
        match &mut self.kind {
            NodeKind::Directory(dir) => Some(dir),
            NodeKind::File(_) => None,
        }
    }

    pub fn as_file(&self) -> Option<&FileData> {
        match &self.kind {
            NodeKind::File(file) => Some(file),
            NodeKind::Directory(_) => None,
        }
    }

    /// Extension of a file node; directories have none.
    pub fn extension(&self) -> Option<&str> {
        if self.is_file() {
            extension_of(&self.name)
        } else {
            None
        }
    }

    /// File size, or the subtree total for a directory.
    pub fn size(&self) -> u64 {
        match &self.kind {
            NodeKind::File(file) => file.size,
            NodeKind::Directory(dir) => dir.total_bytes,
        }
    }
}

/// What to create on insert.
#[derive(Debug, Clone)]
pub enum NodeSpec {
    File {
        size: u64,
        content: Option<ContentHandle>,
    },
    Directory(DirectoryOptions),
}

impl NodeSpec {
    pub fn empty_file() -> Self {
        NodeSpec::File {
            size: 0,
            content: None,
        }
    }

    pub fn file(size: u64) -> Self {
        NodeSpec::File {
            size,
            content: None,
        }
    }

    pub fn directory() -> Self {
        NodeSpec::Directory(DirectoryOptions::default())
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            NodeSpec::File { .. } => NodeType::File,
            NodeSpec::Directory(_) => NodeType::Directory,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DirectoryOptions {
    pub capacity: Option<usize>,
    pub max_bytes: Option<u64>,
    pub disallowed_extensions: Vec<String>,
}

impl DirectoryOptions {
    /// Only the first value is used as the entry capacity; the rest are ignored.
    pub fn from_capacities(values: &[usize]) -> Self {
        Self {
            capacity: values.first().copied(),
            ..Self::default()
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: u64) -> Self {
        self.max_bytes = Some(max_bytes);
        self
    }

    pub fn with_disallowed<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.disallowed_extensions
            .extend(extensions.into_iter().map(Into::into));
        self
    }

    fn into_data(self) -> DirectoryData {
        DirectoryData {
            children: Vec::new(),
            capacity: self.capacity,
            max_bytes: self.max_bytes,
            disallowed: normalize_extensions(self.disallowed_extensions),
            total_bytes: 0,
        }
    }
}

/// Extension of a file name: the text after the last `.`, unless that dot
/// starts the name or ends it.
pub fn extension_of(name: &str) -> Option<&str> {
    match name.rfind('.') {
        Some(0) | None => None,
        Some(pos) if pos + 1 == name.len() => None,
        Some(pos) => Some(&name[pos + 1..]),
    }
}

/// Strip whitespace and a leading dot from a restriction entry.
pub fn normalize_extension(ext: &str) -> Option<String> {
    let ext = ext.trim();
    let ext = ext.strip_prefix('.').unwrap_or(ext);
    if ext.is_empty() {
        None
    } else {
        Some(ext.to_string())
    }
}

pub fn normalize_extensions<I, S>(extensions: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    extensions
        .into_iter()
        .filter_map(|ext| normalize_extension(ext.as_ref()))
        .collect()
}

/// Parse a restriction string such as `"exe, .bat;sh"` into an extension set.
pub fn parse_restriction(restriction: &str) -> BTreeSet<String> {
    normalize_extensions(restriction.split(|c: char| c == ',' || c == ';' || c.is_whitespace()))
}
