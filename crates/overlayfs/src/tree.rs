//! The virtual tree: an arena of nodes addressed by `NodeID`.
//!
//! Folders own their children through the arena; the `parent` link on each
//! node is only a back-reference used for removal and for rebuilding a
//! node's virtual path. Removed slots are never reused, so a stale `NodeID`
//! resolves to `None` rather than to an unrelated node.

use serde::Serialize;

use crate::error::{Error, Result};
use crate::node::{Children, EntryType, Node, NodeID, NodeType, ROOT_ID};
use crate::path::split;

#[derive(Debug)]
pub struct Tree {
    nodes: Vec<Option<Node>>,
    live: usize,
}

/// Serializable copy of a subtree
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NodeSnapshot {
    pub name: String,
    #[serde(rename = "type")]
    pub entry_type: EntryType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backing_path: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeSnapshot>,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Create a tree holding only an empty root folder
    #[must_use]
    pub fn new() -> Self {
        let root = Node {
            name: String::new(),
            parent: None,
            node_type: NodeType::Folder {
                children: Children::default(),
            },
        };
        Self {
            nodes: vec![Some(root)],
            live: 1,
        }
    }

    #[must_use]
    pub fn root(&self) -> NodeID {
        ROOT_ID
    }

    /// Number of live nodes, root included
    #[must_use]
    pub fn len(&self) -> usize {
        self.live
    }

    /// True when only the root exists
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.live == 1
    }

    #[must_use]
    pub fn get(&self, id: NodeID) -> Option<&Node> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    fn get_mut(&mut self, id: NodeID) -> Option<&mut Node> {
        self.nodes.get_mut(id.index()).and_then(Option::as_mut)
    }

    /// Case-insensitive lookup of one child of a folder
    #[must_use]
    pub fn child(&self, folder: NodeID, name: &str) -> Option<NodeID> {
        self.get(folder)?.children()?.get(name)
    }

    /// Walks `virtual_path` down from `from`.
    ///
    /// A file met before the last segment is a miss: files have no children.
    /// An empty path resolves to `from` itself.
    #[must_use]
    pub fn resolve(&self, from: NodeID, virtual_path: &str) -> Option<NodeID> {
        let mut current = from;
        for segment in split(virtual_path) {
            let children = self.get(current)?.children()?;
            current = children.get(segment)?;
        }
        self.get(current).map(|_| current)
    }

    fn alloc(&mut self, node: Node) -> NodeID {
        let id = NodeID::new(self.nodes.len());
        self.nodes.push(Some(node));
        self.live += 1;
        id
    }

    fn insert(&mut self, parent: NodeID, name: &str, node_type: NodeType) -> Result<NodeID> {
        match self.get(parent) {
            Some(node) if node.is_folder() => {}
            Some(_) => return Err(Error::access_denied(self.virtual_path(parent))),
            None => return Err(Error::not_found(name)),
        }

        let id = self.alloc(Node {
            name: name.to_string(),
            parent: Some(parent),
            node_type,
        });

        let displaced = self
            .get_mut(parent)
            .and_then(Node::children_mut)
            .and_then(|children| children.insert(name, id));
        if let Some(old) = displaced {
            self.free_subtree(old.id);
        }
        Ok(id)
    }

    /// Adds a file under `parent`, replacing any same-named entry
    pub fn insert_file(&mut self, parent: NodeID, name: &str, backing_path: &str) -> Result<NodeID> {
        self.insert(
            parent,
            name,
            NodeType::File {
                backing_path: backing_path.to_string(),
            },
        )
    }

    /// Adds an empty folder under `parent`, replacing any same-named entry
    pub fn insert_folder(&mut self, parent: NodeID, name: &str) -> Result<NodeID> {
        self.insert(
            parent,
            name,
            NodeType::Folder {
                children: Children::default(),
            },
        )
    }

    /// Returns the folder named `name` under `parent`, creating it if absent.
    ///
    /// Fails with `AccessDenied` when the name is taken by a file.
    pub fn ensure_folder(&mut self, parent: NodeID, name: &str) -> Result<NodeID> {
        match self.child(parent, name) {
            Some(existing) => match self.get(existing) {
                Some(node) if node.is_folder() => Ok(existing),
                _ => Err(Error::access_denied(self.virtual_path(existing))),
            },
            None => self.insert_folder(parent, name),
        }
    }

    /// Unlinks a node from its parent and destroys its subtree.
    ///
    /// The root cannot be removed.
    pub fn remove(&mut self, id: NodeID) -> Option<EntryType> {
        let node = self.get(id)?;
        let parent = node.parent?;
        let name = node.name.clone();
        let entry_type = node.entry_type();

        let unlinked = self
            .get_mut(parent)
            .and_then(Node::children_mut)
            .and_then(|children| children.remove(&name));
        debug_assert_eq!(unlinked.map(|entry| entry.id), Some(id));

        self.free_subtree(id);
        Some(entry_type)
    }

    fn free_subtree(&mut self, id: NodeID) {
        let mut pending = vec![id];
        while let Some(next) = pending.pop() {
            let Some(node) = self.nodes.get_mut(next.index()).and_then(Option::take) else {
                continue;
            };
            self.live -= 1;
            if let NodeType::Folder { children } = node.node_type {
                pending.extend(children.iter().map(|entry| entry.id));
            }
        }
    }

    /// Rebuilds the path of `id` relative to the root by walking parents
    #[must_use]
    pub fn virtual_path(&self, id: NodeID) -> String {
        let mut names = Vec::new();
        let mut current = self.get(id);
        while let Some(node) = current {
            let Some(parent) = node.parent else { break };
            names.push(node.name.as_str());
            current = self.get(parent);
        }
        names.reverse();
        names.join("\\")
    }

    /// Copies the subtree under `id`
    #[must_use]
    pub fn snapshot(&self, id: NodeID) -> Option<NodeSnapshot> {
        let node = self.get(id)?;
        let children = node
            .children()
            .map(|children| {
                children
                    .iter()
                    .filter_map(|entry| self.snapshot(entry.id))
                    .collect()
            })
            .unwrap_or_default();
        Some(NodeSnapshot {
            name: node.name.clone(),
            entry_type: node.entry_type(),
            backing_path: node.backing_path().map(str::to_string),
            children,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> (Tree, NodeID, NodeID) {
        let mut tree = Tree::new();
        let root = tree.root();
        let dir = tree.insert_folder(root, "Dir").expect("folder");
        let file = tree.insert_file(dir, "a.txt", "C:\\real\\a.txt").expect("file");
        (tree, dir, file)
    }

    #[test]
    fn test_resolve_case_insensitive() {
        let (tree, dir, file) = sample();
        assert_eq!(tree.resolve(tree.root(), "dir"), Some(dir));
        assert_eq!(tree.resolve(tree.root(), "DIR\\A.TXT"), Some(file));
        assert_eq!(tree.resolve(tree.root(), ""), Some(tree.root()));
        assert_eq!(tree.resolve(tree.root(), "dir\\missing"), None);
    }

    #[test]
    fn test_resolve_through_file_is_miss() {
        let (tree, _, _) = sample();
        assert_eq!(tree.resolve(tree.root(), "dir\\a.txt\\deeper"), None);
    }

    #[test]
    fn test_insert_under_file_denied() {
        let (mut tree, _, file) = sample();
        assert!(matches!(
            tree.insert_file(file, "x", "C:\\x"),
            Err(Error::AccessDenied(p)) if p == "Dir\\a.txt"
        ));
    }

    #[test]
    fn test_replace_frees_old_subtree() {
        let (mut tree, _, _) = sample();
        assert_eq!(tree.len(), 3);
        let replacement = tree.insert_file(tree.root(), "DIR", "C:\\other").expect("file");
        assert_eq!(tree.len(), 2);
        assert_eq!(tree.resolve(tree.root(), "dir"), Some(replacement));
        assert_eq!(tree.resolve(tree.root(), "dir\\a.txt"), None);
    }

    #[test]
    fn test_remove_keeps_parent_consistent() {
        let (mut tree, dir, file) = sample();
        assert_eq!(tree.remove(file), Some(EntryType::File));
        assert!(tree.get(file).is_none());
        assert!(tree.get(dir).and_then(Node::children).is_some_and(Children::is_empty));
        assert_eq!(tree.remove(tree.root()), None);
        assert_eq!(tree.remove(file), None);
    }

    #[test]
    fn test_ensure_folder() {
        let (mut tree, dir, file) = sample();
        assert_eq!(tree.ensure_folder(tree.root(), "dir").ok(), Some(dir));
        assert!(matches!(tree.ensure_folder(dir, "A.TXT"), Err(Error::AccessDenied(_))));
        let sub = tree.ensure_folder(dir, "Sub").expect("created");
        assert_ne!(sub, file);
        assert_eq!(tree.virtual_path(sub), "Dir\\Sub");
    }

    #[test]
    fn test_snapshot_serializes() {
        let (tree, dir, _) = sample();
        let snapshot = tree.snapshot(dir).expect("snapshot");
        assert_eq!(snapshot.children.len(), 1);
        let json = serde_json::to_string(&snapshot).expect("json");
        assert_eq!(
            json,
            r#"{"name":"Dir","type":"folder","children":[{"name":"a.txt","type":"file","backing_path":"C:\\real\\a.txt"}]}"#
        );
    }
}
