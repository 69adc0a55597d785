//! Core mutators: shape-agnostic rewrites that apply to any sort.
use crate::mutator::Mutator;
use crate::node::Node;
use crate::smtlib::{self, SymbolEnv};

pub struct Constants;
impl Mutator for Constants {
    fn name(&self) -> &'static str {
        "Constants"
    }
    fn filter(&self, node: &Node, env: &SymbolEnv) -> bool {
        smtlib::get_type(node, env).is_some()
    }
    fn mutations(&self, node: &Node, env: &SymbolEnv) -> Vec<Option<Node>> {
        let Some(t) = smtlib::get_type(node, env) else {
            return vec![];
        };
        smtlib::get_constants(&t)
            .into_iter()
            .filter(|c| c != node)
            .map(Some)
            .collect()
    }
}

pub struct EraseNode;
impl Mutator for EraseNode {
    fn name(&self) -> &'static str {
        "EraseNode"
    }
    fn mutations(&self, _node: &Node, _env: &SymbolEnv) -> Vec<Option<Node>> {
        vec![None]
    }
}

pub struct MergeWithChildren;
impl Mutator for MergeWithChildren {
    fn name(&self) -> &'static str {
        "MergeWithChildren"
    }
    fn filter(&self, node: &Node, _env: &SymbolEnv) -> bool {
        smtlib::is_nary(node)
    }
    fn mutations(&self, node: &Node, _env: &SymbolEnv) -> Vec<Option<Node>> {
        let mut res = Vec::new();
        for (cid, child) in node.children().iter().enumerate() {
            if !child.is_leaf() && child.name() == node.name() {
                let mut merged = Vec::with_capacity(node.len() + child.len() - 2);
                merged.extend(node.children()[..cid].iter().cloned());
                merged.extend(child.children()[1..].iter().cloned());
                merged.extend(node.children()[cid + 1..].iter().cloned());
                res.push(Some(Node::composite(merged)));
            }
        }
        res
    }
}

pub struct ReplaceByVariable {
    pub increasing: bool,
}
impl Mutator for ReplaceByVariable {
    fn name(&self) -> &'static str {
        "ReplaceByVariable"
    }
    fn filter(&self, node: &Node, _env: &SymbolEnv) -> bool {
        !smtlib::is_constant(node)
    }
    fn mutations(&self, node: &Node, env: &SymbolEnv) -> Vec<Option<Node>> {
        let Some(ty) = smtlib::get_type(node, env) else {
            return vec![];
        };
        let mut vars = env.variables_with_type(&ty);
        vars.sort_unstable();
        if node.is_leaf() {
            let cur = node.text().unwrap_or("");
            vars.into_iter()
                .filter(|v| if self.increasing { *v > cur } else { *v < cur })
                .map(|v| Some(Node::leaf(v)))
                .collect()
        } else {
            let own_count = Node::count_nodes(std::slice::from_ref(node));
            vars.into_iter()
                .filter(|v| Node::count_nodes(&[Node::leaf(*v)]) < own_count)
                .map(|v| Some(Node::leaf(v)))
                .collect()
        }
    }
}

pub struct SortChildren;
impl Mutator for SortChildren {
    fn name(&self) -> &'static str {
        "SortChildren"
    }
    fn filter(&self, node: &Node, _env: &SymbolEnv) -> bool {
        !node.is_leaf()
    }
    fn mutations(&self, node: &Node, _env: &SymbolEnv) -> Vec<Option<Node>> {
        let mut children: Vec<Node> = node.children().to_vec();
        children.sort_by_key(|c| Node::count_nodes(std::slice::from_ref(c)));
        let sorted = Node::composite(children);
        if sorted == *node {
            vec![]
        } else {
            vec![Some(sorted)]
        }
    }
}

pub struct SubstituteChildren;
impl Mutator for SubstituteChildren {
    fn name(&self) -> &'static str {
        "SubstituteChildren"
    }
    fn filter(&self, node: &Node, _env: &SymbolEnv) -> bool {
        !node.is_leaf() && !node.is_operator("let")
    }
    fn mutations(&self, node: &Node, _env: &SymbolEnv) -> Vec<Option<Node>> {
        node.children()[1..].iter().cloned().map(Some).collect()
    }
}

/// Binary-search-style splits of the top-level command list, in BFS order
/// over halvings (mimics line-based reduction on the full script).
pub struct TopLevelBinaryReduction;
impl Mutator for TopLevelBinaryReduction {
    fn name(&self) -> &'static str {
        "TopLevelBinaryReduction"
    }
    fn has_local(&self) -> bool {
        false
    }
    fn has_global(&self) -> bool {
        true
    }
    fn global_mutations(&self, focus: &Node, root: &[Node], _env: &SymbolEnv) -> Vec<Vec<Node>> {
        if root.is_empty() || focus.id() != root[0].id() {
            return vec![];
        }
        let mut res = Vec::new();
        let n = root.len();
        let mut den = 2usize;
        while den < n {
            for num in 0..den {
                let start = num * n / den;
                let end = (num + 1) * n / den;
                let mut kept = Vec::with_capacity(n - (end - start));
                kept.extend(root[..start].iter().cloned());
                kept.extend(root[end..].iter().cloned());
                res.push(kept);
            }
            den *= 2;
        }
        res
    }
}

/// Not a mutator in the capability-toggle sense: strategies run this to a
/// fixpoint before every round, unconditionally. Kept here because it shares
/// the module's theme (command-level pruning) even though the strategy
/// invokes it directly rather than through `active_mutators`.
pub fn remove_unused_declarations(exprs: &[Node], env: &SymbolEnv) -> Vec<Node> {
    exprs
        .iter()
        .filter(|cmd| match cmd.name() {
            Some("declare-const") | Some("declare-fun") | Some("define-fun") => {
                let Some(sym) = cmd.get(1).and_then(|n| n.text()) else {
                    return true;
                };
                let refs = Node::dfs_forest(exprs, None)
                    .filter(|n| n.text() == Some(sym))
                    .count();
                refs > 1 || !env.is_constant_symbol(sym) && !env.is_defined_function(sym)
            }
            _ => true,
        })
        .cloned()
        .collect()
}

pub fn push_all(v: &mut Vec<Box<dyn Mutator>>, increasing: bool) {
    v.push(Box::new(Constants));
    v.push(Box::new(EraseNode));
    v.push(Box::new(MergeWithChildren));
    v.push(Box::new(ReplaceByVariable { increasing }));
    v.push(Box::new(SortChildren));
    v.push(Box::new(SubstituteChildren));
    v.push(Box::new(TopLevelBinaryReduction));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smtlib_io::{parse_one, print_node};

    #[test]
    fn erase_node_always_removes() {
        let n = parse_one("a").unwrap();
        let env = SymbolEnv::default();
        assert_eq!(EraseNode.mutations(&n, &env), vec![None]);
    }

    #[test]
    fn merge_with_children_flattens_and() {
        let n = parse_one("(and (and a b) c)").unwrap();
        let env = SymbolEnv::default();
        let m = MergeWithChildren;
        assert!(m.filter(&n, &env));
        let outs = m.mutations(&n, &env);
        assert_eq!(outs.len(), 1);
        let mut s = String::new();
        print_node(outs[0].as_ref().unwrap(), &mut s);
        assert_eq!(s, "(and a b c)");
    }

    #[test]
    fn substitute_children_yields_each_child() {
        let n = parse_one("(and a b)").unwrap();
        let env = SymbolEnv::default();
        let outs = SubstituteChildren.mutations(&n, &env);
        assert_eq!(outs.len(), 2);
    }

    #[test]
    fn sort_children_no_op_when_already_sorted() {
        let n = parse_one("(and a b)").unwrap();
        let env = SymbolEnv::default();
        assert!(SortChildren.mutations(&n, &env).is_empty());
    }

    #[test]
    fn top_level_binary_reduction_splits_script() {
        let exprs = crate::smtlib_io::parse("(a)\n(b)\n(c)\n(d)\n").unwrap();
        let env = SymbolEnv::default();
        let m = TopLevelBinaryReduction;
        let outs = m.global_mutations(&exprs[0], &exprs, &env);
        assert!(!outs.is_empty());
        assert!(outs.iter().all(|o| o.len() < exprs.len()));
    }
}
