//! `let`/quantifier/command-level mutators operating on SMT-LIB's own
//! binding forms rather than a specific theory (no original Python source
//! for this group was retained).
use crate::mutator::Mutator;
use crate::node::Node;
use crate::smtlib::SymbolEnv;

fn occurs(name: &str, node: &Node) -> bool {
    if node.text() == Some(name) {
        return true;
    }
    node.children().iter().any(|c| occurs(name, c))
}

fn rename_leaf(node: &Node, from: &str, to: &str) -> Node {
    if node.text() == Some(from) {
        return Node::leaf(to);
    }
    if node.is_leaf() {
        return node.clone();
    }
    Node::composite(node.children().iter().map(|c| rename_leaf(c, from, to)).collect())
}

fn substitute_leaf(node: &Node, from: &str, to: &Node) -> Node {
    if node.text() == Some(from) {
        return to.clone();
    }
    if node.is_leaf() {
        return node.clone();
    }
    Node::composite(node.children().iter().map(|c| substitute_leaf(c, from, to)).collect())
}

/// Drop a `let` binding that the body never refers to.
pub struct LetElimination;
impl Mutator for LetElimination {
    fn name(&self) -> &'static str {
        "LetElimination"
    }
    fn filter(&self, node: &Node, _env: &SymbolEnv) -> bool {
        node.is_operator("let") && node.len() == 3 && !node.get(1).unwrap().is_empty()
    }
    fn mutations(&self, node: &Node, _env: &SymbolEnv) -> Vec<Option<Node>> {
        let bindings = node.get(1).unwrap();
        let body = node.get(2).unwrap();
        let mut res = Vec::new();
        for (i, binding) in bindings.children().iter().enumerate() {
            let Some(sym) = binding.get(0).and_then(|n| n.text()) else { continue };
            if occurs(sym, body) {
                continue;
            }
            let remaining: Vec<Node> = bindings
                .children()
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, b)| b.clone())
                .collect();
            res.push(Some(if remaining.is_empty() {
                body.clone()
            } else {
                Node::composite(vec![Node::leaf("let"), Node::composite(remaining), body.clone()])
            }));
        }
        res
    }
}

/// Inline a `let` binding's definition into the body and drop the binding.
pub struct LetSubstitution;
impl Mutator for LetSubstitution {
    fn name(&self) -> &'static str {
        "LetSubstitution"
    }
    fn filter(&self, node: &Node, _env: &SymbolEnv) -> bool {
        node.is_operator("let") && node.len() == 3 && !node.get(1).unwrap().is_empty()
    }
    fn mutations(&self, node: &Node, _env: &SymbolEnv) -> Vec<Option<Node>> {
        let bindings = node.get(1).unwrap();
        let body = node.get(2).unwrap();
        let mut res = Vec::new();
        for (i, binding) in bindings.children().iter().enumerate() {
            let (Some(sym), Some(def)) = (binding.get(0).and_then(|n| n.text()), binding.get(1)) else {
                continue;
            };
            let inlined = substitute_leaf(body, sym, def);
            let remaining: Vec<Node> = bindings
                .children()
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, b)| b.clone())
                .collect();
            res.push(Some(if remaining.is_empty() {
                inlined
            } else {
                Node::composite(vec![Node::leaf("let"), Node::composite(remaining), inlined])
            }));
        }
        res
    }
}

/// Remove a `push`/`pop` command outright.
pub struct PushPopRemoval;
impl Mutator for PushPopRemoval {
    fn name(&self) -> &'static str {
        "PushPopRemoval"
    }
    fn filter(&self, node: &Node, _env: &SymbolEnv) -> bool {
        node.is_operator("push") || node.is_operator("pop")
    }
    fn mutations(&self, _node: &Node, _env: &SymbolEnv) -> Vec<Option<Node>> {
        vec![None]
    }
}

pub struct CheckSatAssuming;
impl Mutator for CheckSatAssuming {
    fn name(&self) -> &'static str {
        "CheckSatAssuming"
    }
    fn filter(&self, node: &Node, _env: &SymbolEnv) -> bool {
        node.is_operator("check-sat-assuming")
    }
    fn mutations(&self, _node: &Node, _env: &SymbolEnv) -> Vec<Option<Node>> {
        vec![Some(Node::composite(vec![Node::leaf("check-sat")]))]
    }
}

/// `(distinct a b c ...)` implies pairwise disequality; expanding it removes
/// the `distinct` operator as a simplification target.
pub struct EliminateDistinct;
impl Mutator for EliminateDistinct {
    fn name(&self) -> &'static str {
        "EliminateDistinct"
    }
    fn filter(&self, node: &Node, _env: &SymbolEnv) -> bool {
        node.is_operator("distinct") && node.len() > 3
    }
    fn mutations(&self, node: &Node, _env: &SymbolEnv) -> Vec<Option<Node>> {
        let args = &node.children()[1..];
        let mut pairs = vec![Node::leaf("and")];
        for i in 0..args.len() {
            for j in i + 1..args.len() {
                pairs.push(Node::composite(vec![
                    Node::leaf("not"),
                    Node::composite(vec![Node::leaf("="), args[i].clone(), args[j].clone()]),
                ]));
            }
        }
        vec![Some(Node::composite(pairs))]
    }
}

/// Replace a call to a `define-fun`'d function with its body, substituting
/// actual arguments for the formals.
pub struct InlineDefinedFuns;
impl Mutator for InlineDefinedFuns {
    fn name(&self) -> &'static str {
        "InlineDefinedFuns"
    }
    fn filter(&self, node: &Node, env: &SymbolEnv) -> bool {
        node.name().map(|n| env.is_defined_function(n)).unwrap_or(false)
    }
    fn mutations(&self, node: &Node, env: &SymbolEnv) -> Vec<Option<Node>> {
        let name = node.name().unwrap();
        let Some((formals, _ret, body)) = env.defined_function(name) else {
            return vec![];
        };
        if formals.len() != node.len() - 1 {
            return vec![];
        }
        let mut result = body.clone();
        for (idx, (pname, _psort)) in formals.iter().enumerate() {
            result = substitute_leaf(&result, pname, &node.children()[idx + 1]);
        }
        vec![Some(result)]
    }
}

/// Weaken a `set-logic` declaration to `ALL`, letting the checker accept a
/// candidate that no longer fits the original logic fragment.
pub struct SimplifyLogic;
impl Mutator for SimplifyLogic {
    fn name(&self) -> &'static str {
        "SimplifyLogic"
    }
    fn filter(&self, node: &Node, _env: &SymbolEnv) -> bool {
        node.is_operator("set-logic") && node.len() == 2 && node.get(1).and_then(|n| n.text()) != Some("ALL")
    }
    fn mutations(&self, _node: &Node, _env: &SymbolEnv) -> Vec<Option<Node>> {
        vec![Some(Node::composite(vec![Node::leaf("set-logic"), Node::leaf("ALL")]))]
    }
}

/// Drop `|...|` quoting when the contents are already a bare simple symbol.
pub struct SimplifyQuotedSymbols;
impl Mutator for SimplifyQuotedSymbols {
    fn name(&self) -> &'static str {
        "SimplifyQuotedSymbols"
    }
    fn filter(&self, node: &Node, _env: &SymbolEnv) -> bool {
        node.text()
            .map(|t| {
                t.len() > 2
                    && t.starts_with('|')
                    && t.ends_with('|')
                    && is_simple_symbol(&t[1..t.len() - 1])
            })
            .unwrap_or(false)
    }
    fn mutations(&self, node: &Node, _env: &SymbolEnv) -> Vec<Option<Node>> {
        let t = node.text().unwrap();
        vec![Some(Node::leaf(t[1..t.len() - 1].to_string()))]
    }
}

fn is_simple_symbol(s: &str) -> bool {
    !s.is_empty()
        && !s.chars().next().unwrap().is_ascii_digit()
        && s.chars().all(|c| c.is_ascii_alphanumeric() || "~!@$%^&*_-+=<>.?/".contains(c))
        && !s.contains(char::is_whitespace)
}

/// Shorten a declared symbol's name throughout the script (a smaller name
/// never changes semantics, but makes diffs easier to read once minimization
/// finishes).
pub struct SimplifySymbolNames;
impl Mutator for SimplifySymbolNames {
    fn name(&self) -> &'static str {
        "SimplifySymbolNames"
    }
    fn filter(&self, node: &Node, _env: &SymbolEnv) -> bool {
        matches!(node.name(), Some("declare-const") | Some("declare-fun") | Some("define-fun"))
            && node.get(1).and_then(|n| n.text()).map(|s| s.len() > 1).unwrap_or(false)
    }
    fn has_local(&self) -> bool {
        false
    }
    fn has_global(&self) -> bool {
        true
    }
    fn global_mutations(&self, focus: &Node, root: &[Node], _env: &SymbolEnv) -> Vec<Vec<Node>> {
        let Some(old) = focus.get(1).and_then(|n| n.text()) else {
            return vec![];
        };
        let new_name = &old[..old.len() - 1];
        if new_name.is_empty() || root.iter().any(|r| occurs(new_name, r) && new_name != old) {
            return vec![];
        }
        vec![root.iter().map(|r| rename_leaf(r, old, new_name)).collect()]
    }
}

/// Remove one unused quantified variable from `exists`/`forall`.
pub struct EliminateVariable;
impl Mutator for EliminateVariable {
    fn name(&self) -> &'static str {
        "EliminateVariable"
    }
    fn filter(&self, node: &Node, _env: &SymbolEnv) -> bool {
        matches!(node.name(), Some("exists") | Some("forall")) && node.len() == 3 && !node.get(1).unwrap().is_empty()
    }
    fn mutations(&self, node: &Node, _env: &SymbolEnv) -> Vec<Option<Node>> {
        let bound = node.get(1).unwrap();
        let body = node.get(2).unwrap();
        let quant = node.name().unwrap();
        let mut res = Vec::new();
        for (i, binding) in bound.children().iter().enumerate() {
            let Some(sym) = binding.get(0).and_then(|n| n.text()) else { continue };
            if occurs(sym, body) {
                continue;
            }
            let remaining: Vec<Node> = bound
                .children()
                .iter()
                .enumerate()
                .filter(|(j, _)| *j != i)
                .map(|(_, b)| b.clone())
                .collect();
            res.push(Some(if remaining.is_empty() {
                body.clone()
            } else {
                Node::composite(vec![Node::leaf(quant), Node::composite(remaining), body.clone()])
            }));
        }
        res
    }
}

pub fn push_all(v: &mut Vec<Box<dyn Mutator>>) {
    v.push(Box::new(LetElimination));
    v.push(Box::new(LetSubstitution));
    v.push(Box::new(PushPopRemoval));
    v.push(Box::new(CheckSatAssuming));
    v.push(Box::new(EliminateDistinct));
    v.push(Box::new(InlineDefinedFuns));
    v.push(Box::new(SimplifyLogic));
    v.push(Box::new(SimplifyQuotedSymbols));
    v.push(Box::new(SimplifySymbolNames));
    v.push(Box::new(EliminateVariable));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smtlib_io::{parse_one, print_node};

    #[test]
    fn let_elimination_drops_unused_binding() {
        let n = parse_one("(let ((x 1)) y)").unwrap();
        let env = SymbolEnv::default();
        let m = LetElimination;
        assert!(m.filter(&n, &env));
        let outs = m.mutations(&n, &env);
        assert_eq!(outs[0].as_ref().unwrap().text(), Some("y"));
    }

    #[test]
    fn let_substitution_inlines_binding() {
        let n = parse_one("(let ((x (+ 1 2))) (= x x))").unwrap();
        let env = SymbolEnv::default();
        let m = LetSubstitution;
        assert!(m.filter(&n, &env));
        let outs = m.mutations(&n, &env);
        let mut s = String::new();
        print_node(outs[0].as_ref().unwrap(), &mut s);
        assert_eq!(s, "(= (+ 1 2) (+ 1 2))");
    }

    #[test]
    fn eliminate_distinct_expands_pairs() {
        let n = parse_one("(distinct a b c)").unwrap();
        let env = SymbolEnv::default();
        let m = EliminateDistinct;
        assert!(m.filter(&n, &env));
        let outs = m.mutations(&n, &env);
        let mut s = String::new();
        print_node(outs[0].as_ref().unwrap(), &mut s);
        assert_eq!(s, "(and (not (= a b)) (not (= a c)) (not (= b c)))");
    }

    #[test]
    fn simplify_quoted_symbol_strips_pipes() {
        let n = parse_one("|foo|").unwrap();
        let env = SymbolEnv::default();
        let m = SimplifyQuotedSymbols;
        assert!(m.filter(&n, &env));
        assert_eq!(m.mutations(&n, &env)[0].as_ref().unwrap().text(), Some("foo"));
    }

    #[test]
    fn check_sat_assuming_drops_assumptions() {
        let n = parse_one("(check-sat-assuming (a b))").unwrap();
        let env = SymbolEnv::default();
        let m = CheckSatAssuming;
        assert!(m.filter(&n, &env));
        let mut s = String::new();
        print_node(m.mutations(&n, &env)[0].as_ref().unwrap(), &mut s);
        assert_eq!(s, "(check-sat)");
    }
}
