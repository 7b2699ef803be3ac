use crate::path::FilePath;
use std::collections::BTreeMap;

/// A node of the mapping trie.
///
/// A node with a `local_path` maps a remote file; a node with only children
/// is a virtual directory listing those children.
#[derive(Debug, Default, Clone)]
pub struct PathMappingNode {
    pub children: BTreeMap<String, u32>,
    pub local_path: Option<FilePath>,
}

/// Explicit remote→local path overrides, stored as a trie over path segments.
/// Nodes live in one arena and refer to each other by u32 ID; ID 0 is the root.
#[derive(Debug, Clone)]
pub struct PathMapTrie {
    nodes: Vec<PathMappingNode>,
}

impl PathMapTrie {
    pub fn new() -> Self {
        Self {
            nodes: vec![PathMappingNode::default()],
        }
    }

    /// Maps `remote_path` (split on `/`, empty segments skipped) to `local_path`.
    /// Mapping the same remote path again replaces the local target.
    pub fn insert(&mut self, local_path: FilePath, remote_path: &str) {
        let mut id = 0u32;
        for segment in remote_path.split('/').filter(|s| !s.is_empty()) {
            id = match self.nodes[id as usize].children.get(segment) {
                Some(&child) => child,
                None => {
                    let child = self.nodes.len() as u32;
                    self.nodes.push(PathMappingNode::default());
                    self.nodes[id as usize]
                        .children
                        .insert(segment.to_string(), child);
                    child
                }
            };
        }
        self.nodes[id as usize].local_path = Some(local_path);
    }

    /// Walks the trie along the segments of `path`.
    pub fn lookup(&self, path: &str) -> Option<&PathMappingNode> {
        let mut node = &self.nodes[0];
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            let &child = node.children.get(segment)?;
            node = &self.nodes[child as usize];
        }
        Some(node)
    }

    /// Child segment names of a virtual directory node, in sorted order.
    pub fn child_names(&self, node: &PathMappingNode) -> Vec<String> {
        node.children.keys().cloned().collect()
    }

    /// Number of nodes, the root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// True when nothing has been mapped.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1 && self.nodes[0].local_path.is_none()
    }
}

impl Default for PathMapTrie {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_map_leaf_lookup() {
        let mut trie = PathMapTrie::new();
        trie.insert("/home/proj/main.qml".into(), "/data/app/main.qml");

        let node = trie.lookup("/data/app/main.qml").unwrap();
        assert_eq!(node.local_path, Some(FilePath::from("/home/proj/main.qml")));
        assert!(node.children.is_empty());
        assert!(trie.lookup("/data/other.qml").is_none());
    }

    #[test]
    fn test_path_map_shares_prefixes() {
        let mut trie = PathMapTrie::new();
        trie.insert("/l/a".into(), "/r/dir/a");
        trie.insert("/l/b".into(), "r//dir/b");

        // root, r, dir, a, b
        assert_eq!(trie.len(), 5);

        let dir = trie.lookup("/r/dir").unwrap();
        assert!(dir.local_path.is_none());
        assert_eq!(trie.child_names(dir), vec!["a", "b"]);
    }

    #[test]
    fn test_path_map_remap_replaces_target() {
        let mut trie = PathMapTrie::new();
        trie.insert("/old".into(), "/r/x");
        trie.insert("/new".into(), "/r/x");

        assert_eq!(trie.len(), 3);
        assert_eq!(trie.lookup("r/x").unwrap().local_path, Some(FilePath::from("/new")));
    }

    #[test]
    fn test_path_map_empty() {
        let trie = PathMapTrie::new();
        assert!(trie.is_empty());
        assert!(trie.lookup("/anything").is_none());
    }
}
