//! Immutable classification hierarchy.
//!
//! Nodes are stored in an arena (`Vec<TreeNode>`) and linked by index. Slot 0 is a
//! synthetic root with an empty code that is never part of the node map; every
//! stored node without a parent hangs off it.

use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::error::{TreeError, TreeResult};

const ROOT_INDEX: usize = 0;

/// A persisted classification node row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationNode {
    /// Unique code (e.g. `"01.11"`).
    pub code: String,
    /// Human-readable name.
    pub name: String,
    /// Parent code, `None` for top-level nodes.
    #[serde(default)]
    pub parent_code: Option<String>,
    /// Depth; top-level nodes are at level 0.
    #[serde(default)]
    pub level: u32,
}

impl ClassificationNode {
    pub fn new(code: &str, name: &str, parent_code: Option<&str>, level: u32) -> Self {
        Self {
            code: code.to_string(),
            name: name.to_string(),
            parent_code: parent_code.map(str::to_string),
            level,
        }
    }
}

/// A node as linked inside a [`ClassificationTree`].
#[derive(Debug, Clone)]
pub struct TreeNode {
    code: String,
    name: String,
    level: u32,
    parent: Option<usize>,
    children: Vec<usize>,
}

impl TreeNode {
    /// Node code (empty for the synthetic root).
    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Depth below the synthetic root; top-level nodes are 0.
    ///
    /// The synthetic root itself also reports 0; use [`TreeNode::is_root`] to tell them apart.
    pub fn level(&self) -> u32 {
        self.level
    }

    /// Returns `true` for the synthetic root.
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Returns `true` if the node has no children.
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of direct children.
    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}

/// Immutable hierarchy shared by every concurrent classification in a run.
#[derive(Debug, Clone)]
pub struct ClassificationTree {
    nodes: Vec<TreeNode>,
    index: HashMap<String, usize>,
}

impl ClassificationTree {
    /// Builds a tree from storage rows.
    ///
    /// Nodes are linked breadth-first from the top-level rows, so only nodes reachable
    /// through a chain of existing parents are kept. Rows with a dangling parent, rows
    /// on a cycle and duplicate codes are dropped with a warning. Levels are recomputed
    /// from the parent chain; a stored level that disagrees is logged and overridden.
    pub fn from_nodes(rows: Vec<ClassificationNode>) -> TreeResult<Self> {
        let total_rows = rows.len();
        let mut by_parent: HashMap<Option<String>, Vec<ClassificationNode>> = HashMap::new();
        let mut seen_codes: HashSet<String> = HashSet::with_capacity(rows.len());
        for row in rows {
            if row.code.is_empty() || !seen_codes.insert(row.code.clone()) {
                warn!(code = %row.code, "Skipping empty or duplicate classification code");
                continue;
            }
            let parent = row.parent_code.clone().filter(|p| !p.is_empty());
            by_parent.entry(parent).or_default().push(row);
        }

        let mut nodes = vec![TreeNode {
            code: String::new(),
            name: String::new(),
            level: 0,
            parent: None,
            children: Vec::new(),
        }];
        let mut index = HashMap::with_capacity(seen_codes.len());

        let mut queue: VecDeque<(Option<String>, usize, u32)> = VecDeque::new();
        queue.push_back((None, ROOT_INDEX, 0));

        while let Some((parent_code, parent_idx, depth)) = queue.pop_front() {
            let Some(children) = by_parent.remove(&parent_code) else {
                continue;
            };
            for row in children {
                if row.level != depth {
                    warn!(
                        code = %row.code,
                        stored_level = row.level,
                        computed_level = depth,
                        "Stored level disagrees with parent chain, using computed level"
                    );
                }
                let idx = nodes.len();
                nodes.push(TreeNode {
                    code: row.code.clone(),
                    name: row.name,
                    level: depth,
                    parent: Some(parent_idx),
                    children: Vec::new(),
                });
                nodes[parent_idx].children.push(idx);
                index.insert(row.code.clone(), idx);
                queue.push_back((Some(row.code), idx, depth + 1));
            }
        }

        let unreachable: usize = by_parent.values().map(Vec::len).sum();
        if unreachable > 0 {
            warn!(
                unreachable,
                total_rows, "Dropped classification nodes with unresolved parents"
            );
        }

        if index.is_empty() {
            return Err(TreeError::Empty);
        }

        Ok(Self { nodes, index })
    }

    /// Returns the synthetic root.
    pub fn root(&self) -> &TreeNode {
        &self.nodes[ROOT_INDEX]
    }

    /// Looks up a node by code.
    pub fn get(&self, code: &str) -> Option<&TreeNode> {
        self.index.get(code).map(|&idx| &self.nodes[idx])
    }

    /// Returns `true` if `code` is part of the tree.
    pub fn contains(&self, code: &str) -> bool {
        self.index.contains_key(code)
    }

    /// Direct children of `node`, in storage order.
    pub fn children<'a>(&'a self, node: &'a TreeNode) -> impl Iterator<Item = &'a TreeNode> + 'a {
        node.children.iter().map(move |&idx| &self.nodes[idx])
    }

    /// Parent of `node`, or `None` for top-level nodes and the root.
    pub fn parent(&self, node: &TreeNode) -> Option<&TreeNode> {
        match node.parent {
            Some(ROOT_INDEX) | None => None,
            Some(idx) => Some(&self.nodes[idx]),
        }
    }

    /// Codes from the top-level ancestor down to `code` (inclusive).
    pub fn path(&self, code: &str) -> Vec<&str> {
        let mut path = Vec::new();
        let mut current = self.get(code);
        while let Some(node) = current {
            path.push(node.code());
            current = self.parent(node);
        }
        path.reverse();
        path
    }

    /// Number of nodes, excluding the synthetic root.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Always `false` for a successfully built tree.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Number of top-level nodes.
    pub fn section_count(&self) -> usize {
        self.root().children.len()
    }

    /// Iterates over every node in the map (excluding the root), in arbitrary order.
    pub fn nodes(&self) -> impl Iterator<Item = &TreeNode> {
        self.nodes.iter().skip(1)
    }

    /// Flattens the tree back into rows (sorted by code).
    pub fn to_rows(&self) -> Vec<ClassificationNode> {
        let mut rows: Vec<ClassificationNode> = self
            .nodes()
            .map(|n| ClassificationNode {
                code: n.code.clone(),
                name: n.name.clone(),
                parent_code: self.parent(n).map(|p| p.code.clone()),
                level: n.level,
            })
            .collect();
        rows.sort_by(|a, b| a.code.cmp(&b.code));
        rows
    }
}
