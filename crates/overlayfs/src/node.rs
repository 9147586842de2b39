use std::collections::BTreeMap;

use serde::Serialize;

use crate::path::fold;

pub const ROOT_ID: NodeID = NodeID(0);

/// Index of a node in its tree's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeID(usize);

impl std::fmt::Display for NodeID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04X}", self.0)
    }
}

impl NodeID {
    pub(crate) fn new(index: usize) -> Self {
        Self(index)
    }

    pub(crate) fn index(self) -> usize {
        self.0
    }

    #[must_use]
    pub fn is_root(self) -> bool {
        self == ROOT_ID
    }
}

/// Kind of a node, without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    File,
    Folder,
}

impl EntryType {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::File => "file",
            EntryType::Folder => "folder",
        }
    }
}

impl std::fmt::Display for EntryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A named child of a folder. The name keeps the case it was created with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEntry {
    pub name: String,
    pub id: NodeID,
}

/// Children of a folder, keyed case-insensitively
#[derive(Debug, Default)]
pub struct Children(BTreeMap<String, ChildEntry>);

impl Children {
    pub fn get(&self, name: &str) -> Option<NodeID> {
        self.0.get(&fold(name)).map(|entry| entry.id)
    }

    /// Inserts an entry, returning the one it displaced
    pub(crate) fn insert(&mut self, name: &str, id: NodeID) -> Option<ChildEntry> {
        self.0.insert(
            fold(name),
            ChildEntry {
                name: name.to_string(),
                id,
            },
        )
    }

    pub(crate) fn remove(&mut self, name: &str) -> Option<ChildEntry> {
        self.0.remove(&fold(name))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Entries in folder iteration order (case-insensitive name order)
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &ChildEntry> {
        self.0.values()
    }
}

/// Payload of a node
#[derive(Debug)]
pub enum NodeType {
    /// A virtual file redirected to `backing_path`
    File { backing_path: String },
    /// A virtual folder owning its children
    Folder { children: Children },
}

/// One entry of the virtual tree
#[derive(Debug)]
pub struct Node {
    pub(crate) name: String,
    pub(crate) parent: Option<NodeID>,
    pub(crate) node_type: NodeType,
}

impl Node {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The enclosing folder; `None` only for the root
    #[must_use]
    pub fn parent(&self) -> Option<NodeID> {
        self.parent
    }

    #[must_use]
    pub fn entry_type(&self) -> EntryType {
        match self.node_type {
            NodeType::File { .. } => EntryType::File,
            NodeType::Folder { .. } => EntryType::Folder,
        }
    }

    #[must_use]
    pub fn is_file(&self) -> bool {
        matches!(self.node_type, NodeType::File { .. })
    }

    #[must_use]
    pub fn is_folder(&self) -> bool {
        matches!(self.node_type, NodeType::Folder { .. })
    }

    #[must_use]
    pub fn backing_path(&self) -> Option<&str> {
        match &self.node_type {
            NodeType::File { backing_path } => Some(backing_path),
            NodeType::Folder { .. } => None,
        }
    }

    #[must_use]
    pub fn children(&self) -> Option<&Children> {
        match &self.node_type {
            NodeType::Folder { children } => Some(children),
            NodeType::File { .. } => None,
        }
    }

    pub(crate) fn children_mut(&mut self) -> Option<&mut Children> {
        match &mut self.node_type {
            NodeType::Folder { children } => Some(children),
            NodeType::File { .. } => None,
        }
    }
}
