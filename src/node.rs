//! Immutable s-expression trees with stable node identity.
//!
//! A `Node` is an `Arc`-shared handle to either a leaf token or an ordered
//! list of children. Cloning a `Node` is a refcount bump; constructing one
//! always allocates a fresh id, but two clones of the same `Node` share both
//! the allocation and the id. Substitution keys on id, never on structural
//! equality, so the same text or shape occurring twice in a tree can be
//! targeted independently. `Arc` (rather than `Rc`) because candidate trees
//! cross worker-pool thread boundaries during concurrent evaluation.
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use fxhash::FxHashMap;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

fn fresh_id() -> NodeId {
    NodeId(NEXT_ID.fetch_add(1, Ordering::SeqCst))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
enum Data {
    Leaf(String),
    Composite(Vec<Node>),
}

#[derive(Debug)]
struct NodeData {
    id: NodeId,
    data: Data,
}

/// A node in the tree. Cheap to clone (`Arc`); immutable after construction.
#[derive(Debug, Clone)]
pub struct Node(Arc<NodeData>);

impl PartialEq for Node {
    /// Structural equality: same leaf text, or same-length child lists that
    /// are pairwise structurally equal. Does NOT compare ids.
    fn eq(&self, other: &Self) -> bool {
        match (&self.0.data, &other.0.data) {
            (Data::Leaf(a), Data::Leaf(b)) => a == b,
            (Data::Composite(a), Data::Composite(b)) => a == b,
            _ => false,
        }
    }
}
impl Eq for Node {}

impl Node {
    pub fn leaf<S: Into<String>>(text: S) -> Node {
        Node(Arc::new(NodeData {
            id: fresh_id(),
            data: Data::Leaf(text.into()),
        }))
    }

    pub fn composite(children: Vec<Node>) -> Node {
        Node(Arc::new(NodeData {
            id: fresh_id(),
            data: Data::Composite(children),
        }))
    }

    pub fn id(&self) -> NodeId {
        self.0.id
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self.0.data, Data::Leaf(_))
    }

    pub fn text(&self) -> Option<&str> {
        match &self.0.data {
            Data::Leaf(s) => Some(s.as_str()),
            Data::Composite(_) => None,
        }
    }

    pub fn children(&self) -> &[Node] {
        match &self.0.data {
            Data::Leaf(_) => &[],
            Data::Composite(c) => c,
        }
    }

    pub fn len(&self) -> usize {
        self.children().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, i: usize) -> Option<&Node> {
        self.children().get(i)
    }

    /// The node's name: the leaf text of its first child, if it has one
    /// and is a composite (mirrors ddSMT's `has_name`/`get_name`).
    pub fn name(&self) -> Option<&str> {
        if self.is_leaf() || self.is_empty() {
            return None;
        }
        self.children()[0].text()
    }

    pub fn is_operator(&self, name: &str) -> bool {
        self.name() == Some(name)
    }

    /// Lazy pre-order DFS over composites and leaves, stopping before
    /// descending past `max_depth` (top-level commands are depth 1).
    pub fn dfs_forest(roots: &[Node], max_depth: Option<usize>) -> DfsIter {
        DfsIter {
            stack: roots.iter().rev().map(|n| (1usize, n.clone())).collect(),
            max_depth,
        }
    }

    pub fn dfs(&self, max_depth: Option<usize>) -> DfsIter {
        Self::dfs_forest(std::slice::from_ref(self), max_depth)
    }

    /// Lazy post-order DFS over composites only (matches ddSMT's
    /// `dfs_postorder`, which never yields leaves).
    pub fn dfs_postorder_forest(roots: &[Node]) -> DfsPostIter {
        let mut visit = Vec::with_capacity(roots.len());
        for r in roots.iter().rev() {
            visit.push((r.clone(), false));
        }
        DfsPostIter { stack: visit }
    }

    pub fn count_nodes(roots: &[Node]) -> usize {
        Self::dfs_forest(roots, None).count()
    }

    pub fn count_exprs(roots: &[Node]) -> usize {
        Self::dfs_forest(roots, None)
            .filter(|n| !n.is_leaf())
            .count()
    }
}

pub struct DfsIter {
    stack: Vec<(usize, Node)>,
    max_depth: Option<usize>,
}

impl Iterator for DfsIter {
    type Item = Node;
    fn next(&mut self) -> Option<Node> {
        let (depth, node) = self.stack.pop()?;
        if !node.is_leaf() {
            let within_depth = self.max_depth.map(|m| depth < m).unwrap_or(true);
            if within_depth {
                for child in node.children().iter().rev() {
                    self.stack.push((depth + 1, child.clone()));
                }
            }
        }
        Some(node)
    }
}

pub struct DfsPostIter {
    stack: Vec<(Node, bool)>,
}

impl Iterator for DfsPostIter {
    type Item = Node;
    fn next(&mut self) -> Option<Node> {
        loop {
            let (node, visited) = self.stack.pop()?;
            if node.is_leaf() {
                continue;
            }
            if visited {
                return Some(node);
            }
            self.stack.push((node.clone(), true));
            for child in node.children().iter().rev() {
                self.stack.push((child.clone(), false));
            }
        }
    }
}

/// A substitution map: node id -> replacement (`None` means delete).
pub type SubstMap = FxHashMap<NodeId, Option<Node>>;

/// Produce a new tree in which every subtree whose id is a key in `map` is
/// replaced (or deleted, for `None`). Visits each node at most once; returns
/// structurally-shared output for everything outside `map`'s reach. When
/// `map` is empty, returns clones of the input (still id-identical, since
/// `Node::clone` just bumps the refcount).
pub fn substitute(roots: &[Node], map: &SubstMap) -> Vec<Node> {
    if map.is_empty() {
        return roots.to_vec();
    }
    let mut out = Vec::with_capacity(roots.len());
    for r in roots {
        if let Some(replacement) = subst_one(r, map) {
            out.push(replacement);
        }
    }
    out
}

/// Returns `None` if `node` itself should be removed from its parent's
/// child list (i.e. `map[node.id()] == Some(None)`).
fn subst_one(node: &Node, map: &SubstMap) -> Option<Node> {
    if let Some(repl) = map.get(&node.id()) {
        return repl.clone();
    }
    if node.is_leaf() {
        return Some(node.clone());
    }
    let mut changed = false;
    let mut new_children = Vec::with_capacity(node.len());
    for child in node.children() {
        match subst_one(child, map) {
            Some(c) => {
                if c.id() != child.id() {
                    changed = true;
                }
                new_children.push(c);
            }
            None => changed = true,
        }
    }
    if changed {
        Some(Node::composite(new_children))
    } else {
        Some(node.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_simple(s: &str) -> Node {
        crate::smtlib_io::parse_one(s).unwrap()
    }

    #[test]
    fn leaf_and_composite_basics() {
        let a = Node::leaf("a");
        let b = Node::leaf("b");
        let c = Node::composite(vec![a.clone(), b.clone()]);
        assert!(!c.is_leaf());
        assert_eq!(c.len(), 2);
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn structural_equality_ignores_id() {
        let a1 = Node::leaf("x");
        let a2 = Node::leaf("x");
        assert_eq!(a1, a2);
        assert_ne!(a1.id(), a2.id());
    }

    #[test]
    fn substitute_empty_map_is_identity() {
        let t = parse_simple("(assert (and a b))");
        let map = SubstMap::default();
        let out = substitute(std::slice::from_ref(&t), &map);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id(), t.id());
    }

    #[test]
    fn substitute_deletes_child() {
        let t = parse_simple("(and a b c)");
        let b = t.get(2).unwrap().clone();
        let mut map = SubstMap::default();
        map.insert(b.id(), None);
        let out = substitute(std::slice::from_ref(&t), &map);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].len(), 3);
    }

    #[test]
    fn substitute_deletes_top_level_command() {
        let cmds = vec![parse_simple("(assert a)"), parse_simple("(assert b)")];
        let mut map = SubstMap::default();
        map.insert(cmds[0].id(), None);
        let out = substitute(&cmds, &map);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn dfs_is_preorder_and_respects_depth() {
        let t = parse_simple("(and (or a b) c)");
        let names: Vec<String> = t
            .dfs(Some(1))
            .filter_map(|n| n.text().map(|s| s.to_string()))
            .collect();
        assert!(names.is_empty()); // depth-1 only yields the top composite itself
        let all: Vec<Node> = t.dfs(None).collect();
        assert_eq!(all.len(), Node::count_nodes(std::slice::from_ref(&t)));
    }

    #[test]
    fn count_nodes_vs_count_exprs() {
        let t = parse_simple("(and (or a b) c)");
        let roots = vec![t];
        assert_eq!(Node::count_nodes(&roots), 7); // (and ...), and, (or ...), or, a, b, c
        assert_eq!(Node::count_exprs(&roots), 2);
    }
}
