//! Mutator groups (core / boolean / arithmetic / bit-vector / strings /
//! smtlib binding forms), plus the fixed-order registry the strategies draw
//! from.
pub mod arithmetic;
pub mod bitvector;
pub mod core;
pub mod smtlib_mutators;
pub mod strings;

use crate::mutator::Mutator;

/// All mutators, grouped core/boolean/arithmetic/bit-vector/strings/smtlib
/// and registered in that fixed order.
pub fn all_mutators() -> Vec<Box<dyn Mutator>> {
    all_mutators_with_mode(true)
}

/// Same registry, but with `ReplaceByVariable`'s direction set explicitly
/// (increasing: prefer lexicographically later variable names).
pub fn all_mutators_with_mode(increasing: bool) -> Vec<Box<dyn Mutator>> {
    let mut v: Vec<Box<dyn Mutator>> = Vec::new();
    core::push_all(&mut v, increasing);
    arithmetic::push_all(&mut v);
    bitvector::push_all(&mut v);
    boolean_push_all(&mut v);
    smtlib_mutators::push_all(&mut v);
    strings::push_all(&mut v);
    v
}

pub fn all_names() -> Vec<&'static str> {
    all_mutators().iter().map(|m| m.name()).collect()
}

// Boolean mutators live inline here (small group) rather than a separate
// file of one-liners.
use crate::node::Node;
use crate::smtlib::SymbolEnv;

pub struct DeMorgan;
impl Mutator for DeMorgan {
    fn name(&self) -> &'static str {
        "DeMorgan"
    }
    fn filter(&self, node: &Node, _env: &SymbolEnv) -> bool {
        node.is_operator("not")
            && node
                .get(1)
                .map(|c| c.is_operator("and") || c.is_operator("or"))
                .unwrap_or(false)
    }
    fn mutations(&self, node: &Node, _env: &SymbolEnv) -> Vec<Option<Node>> {
        let Some(inner) = node.get(1) else { return vec![] };
        let negated: Vec<Node> = inner.children()[1..]
            .iter()
            .map(|c| Node::composite(vec![Node::leaf("not"), c.clone()]))
            .collect();
        let new_op = if inner.is_operator("and") { "or" } else { "and" };
        let mut children = vec![Node::leaf(new_op)];
        children.extend(negated);
        vec![Some(Node::composite(children))]
    }
}

pub struct DoubleNegation;
impl Mutator for DoubleNegation {
    fn name(&self) -> &'static str {
        "DoubleNegation"
    }
    fn filter(&self, node: &Node, _env: &SymbolEnv) -> bool {
        node.is_operator("not") && node.get(1).map(|c| c.is_operator("not")).unwrap_or(false)
    }
    fn mutations(&self, node: &Node, _env: &SymbolEnv) -> Vec<Option<Node>> {
        vec![Some(node.get(1).unwrap().get(1).unwrap().clone())]
    }
}

pub struct EliminateFalseEquality;
impl Mutator for EliminateFalseEquality {
    fn name(&self) -> &'static str {
        "EliminateFalseEquality"
    }
    fn filter(&self, node: &Node, _env: &SymbolEnv) -> bool {
        node.is_operator("=") && node.children()[1..].iter().any(|c| c.text() == Some("false"))
    }
    fn mutations(&self, node: &Node, _env: &SymbolEnv) -> Vec<Option<Node>> {
        let negated: Vec<Node> = node.children()[1..]
            .iter()
            .filter(|c| c.text() != Some("false"))
            .map(|c| Node::composite(vec![Node::leaf("not"), c.clone()]))
            .collect();
        make_and(negated)
    }
}

pub struct EliminateImplications;
impl Mutator for EliminateImplications {
    fn name(&self) -> &'static str {
        "EliminateImplications"
    }
    fn filter(&self, node: &Node, _env: &SymbolEnv) -> bool {
        node.is_operator("=>")
    }
    fn mutations(&self, node: &Node, _env: &SymbolEnv) -> Vec<Option<Node>> {
        let n = node.len();
        let split: Vec<Node> = (1..n - 1)
            .map(|i| {
                Node::composite(vec![
                    Node::leaf("or"),
                    Node::composite(vec![Node::leaf("not"), node.children()[i].clone()]),
                    node.children()[i + 1].clone(),
                ])
            })
            .collect();
        make_and(split)
    }
}

fn is_quantifier(node: &Node) -> bool {
    matches!(node.name(), Some("exists") | Some("forall"))
}

pub struct NegatedQuantifier;
impl Mutator for NegatedQuantifier {
    fn name(&self) -> &'static str {
        "NegatedQuantifier"
    }
    fn filter(&self, node: &Node, _env: &SymbolEnv) -> bool {
        node.is_operator("not") && node.get(1).map(is_quantifier).unwrap_or(false)
    }
    fn mutations(&self, node: &Node, _env: &SymbolEnv) -> Vec<Option<Node>> {
        let inner = node.get(1).unwrap();
        let dual = if inner.is_operator("exists") { "forall" } else { "exists" };
        let negated_body = Node::composite(vec![Node::leaf("not"), inner.get(2).unwrap().clone()]);
        vec![Some(Node::composite(vec![
            Node::leaf(dual),
            inner.get(1).unwrap().clone(),
            negated_body,
        ]))]
    }
}

pub struct XORRemoveConstants;
impl Mutator for XORRemoveConstants {
    fn name(&self) -> &'static str {
        "XORRemoveConstants"
    }
    fn filter(&self, node: &Node, _env: &SymbolEnv) -> bool {
        node.is_operator("xor")
    }
    fn mutations(&self, node: &Node, _env: &SymbolEnv) -> Vec<Option<Node>> {
        let mut res = Vec::new();
        let has_false = node.children()[1..].iter().any(|c| c.text() == Some("false"));
        let has_true = node.children()[1..].iter().any(|c| c.text() == Some("true"));
        if has_false {
            let kept: Vec<Node> = std::iter::once(node.children()[0].clone())
                .chain(node.children()[1..].iter().filter(|c| c.text() != Some("false")).cloned())
                .collect();
            res.push(Some(Node::composite(kept)));
        }
        if has_true {
            let rest: Vec<Node> = node.children()[1..]
                .iter()
                .filter(|c| c.text() != Some("true"))
                .cloned()
                .collect();
            let mut kept = vec![node.children()[0].clone()];
            kept.extend(rest.clone());
            res.push(Some(Node::composite(kept)));
            if rest.len() == 1 {
                res.push(Some(Node::composite(vec![Node::leaf("not"), rest[0].clone()])));
            }
        }
        res
    }
}

pub struct XOREliminateBinary;
impl Mutator for XOREliminateBinary {
    fn name(&self) -> &'static str {
        "XOREliminateBinary"
    }
    fn filter(&self, node: &Node, _env: &SymbolEnv) -> bool {
        node.is_operator("xor") && node.len() == 3
    }
    fn mutations(&self, node: &Node, _env: &SymbolEnv) -> Vec<Option<Node>> {
        vec![Some(Node::composite(vec![
            Node::leaf("distinct"),
            node.get(1).unwrap().clone(),
            node.get(2).unwrap().clone(),
        ]))]
    }
}

fn make_and(children: Vec<Node>) -> Vec<Option<Node>> {
    match children.len() {
        0 => vec![],
        1 => vec![Some(children.into_iter().next().unwrap())],
        _ => {
            let mut v = vec![Node::leaf("and")];
            v.extend(children);
            vec![Some(Node::composite(v))]
        }
    }
}

fn boolean_push_all(v: &mut Vec<Box<dyn Mutator>>) {
    v.push(Box::new(DeMorgan));
    v.push(Box::new(DoubleNegation));
    v.push(Box::new(EliminateFalseEquality));
    v.push(Box::new(EliminateImplications));
    v.push(Box::new(NegatedQuantifier));
    v.push(Box::new(XORRemoveConstants));
    v.push(Box::new(XOREliminateBinary));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smtlib_io::parse_one;

    #[test]
    fn demorgan_and_to_or() {
        let env = SymbolEnv::default();
        let n = parse_one("(not (and a b))").unwrap();
        let m = DeMorgan;
        assert!(m.filter(&n, &env));
        let outs = m.mutations(&n, &env);
        assert_eq!(outs.len(), 1);
        let mut s = String::new();
        crate::smtlib_io::print_node(outs[0].as_ref().unwrap(), &mut s);
        assert_eq!(s, "(or (not a) (not b))");
    }

    #[test]
    fn double_negation() {
        let env = SymbolEnv::default();
        let n = parse_one("(not (not a))").unwrap();
        let m = DoubleNegation;
        assert!(m.filter(&n, &env));
        let outs = m.mutations(&n, &env);
        assert_eq!(outs[0].as_ref().unwrap().text(), Some("a"));
    }

    #[test]
    fn xor_binary_to_distinct() {
        let env = SymbolEnv::default();
        let n = parse_one("(xor a b)").unwrap();
        let m = XOREliminateBinary;
        assert!(m.filter(&n, &env));
        let outs = m.mutations(&n, &env);
        let mut s = String::new();
        crate::smtlib_io::print_node(outs[0].as_ref().unwrap(), &mut s);
        assert_eq!(s, "(distinct a b)");
    }
}
