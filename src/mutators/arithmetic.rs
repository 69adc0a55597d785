//! Arithmetic mutators: relation and constant rewrites for `Int`/`Real`.
use crate::mutator::Mutator;
use crate::node::{substitute, Node, SubstMap};
use crate::smtlib::{self, SymbolEnv};

fn is_arithmetic_relation(node: &Node) -> bool {
    matches!(node.name(), Some("=") | Some("<") | Some(">") | Some(">=") | Some("<=") | Some("!=") | Some("<>"))
}

pub struct SimplifyConstant;
impl Mutator for SimplifyConstant {
    fn name(&self) -> &'static str {
        "ArithmeticSimplifyConstant"
    }
    fn filter(&self, node: &Node, _env: &SymbolEnv) -> bool {
        smtlib::is_arithmetic_constant(node)
            && node
                .text()
                .and_then(|t| t.parse::<f64>().ok())
                .map(|f| f != 0.0 && f != 1.0)
                .unwrap_or(false)
    }
    fn has_local(&self) -> bool {
        false
    }
    fn has_global(&self) -> bool {
        true
    }
    fn global_mutations(&self, focus: &Node, root: &[Node], _env: &SymbolEnv) -> Vec<Vec<Node>> {
        let Some(f) = focus.text().and_then(|t| t.parse::<f64>().ok()) else {
            return vec![];
        };
        let mut candidates = Vec::new();
        if f == f.trunc() {
            let i = f as i64;
            candidates.push(Node::leaf((i / 2).to_string()));
            candidates.push(Node::leaf((i / 10).to_string()));
        } else {
            let text = focus.text().unwrap();
            candidates.push(Node::leaf((f as i64).to_string()));
            candidates.push(Node::leaf(&text[..text.len() - 1]));
        }
        candidates
            .into_iter()
            .map(|rep| {
                let mut map = SubstMap::default();
                map.insert(focus.id(), Some(rep));
                substitute(root, &map)
            })
            .collect()
    }
}

pub struct NegateRelations;
impl Mutator for NegateRelations {
    fn name(&self) -> &'static str {
        "ArithmeticNegateRelations"
    }
    fn filter(&self, node: &Node, _env: &SymbolEnv) -> bool {
        node.is_operator("not") && node.get(1).map(is_arithmetic_relation).unwrap_or(false)
    }
    fn mutations(&self, node: &Node, _env: &SymbolEnv) -> Vec<Option<Node>> {
        let inner = node.get(1).unwrap();
        let negated = match inner.name() {
            Some("<") => ">=",
            Some("<=") => ">",
            Some("!=") | Some("<>") => "=",
            Some(">=") => "<",
            Some(">") => "<=",
            _ => return vec![],
        };
        let mut children = vec![Node::leaf(negated)];
        children.extend(inner.children()[1..].iter().cloned());
        vec![Some(Node::composite(children))]
    }
}

pub struct SplitNaryRelations;
impl Mutator for SplitNaryRelations {
    fn name(&self) -> &'static str {
        "ArithmeticSplitNaryRelations"
    }
    fn filter(&self, node: &Node, _env: &SymbolEnv) -> bool {
        is_arithmetic_relation(node) && node.len() > 3
    }
    fn mutations(&self, node: &Node, _env: &SymbolEnv) -> Vec<Option<Node>> {
        let name = node.name().unwrap();
        let mut parts = vec![Node::leaf("and")];
        for i in 1..node.len() - 1 {
            parts.push(Node::composite(vec![
                Node::leaf(name),
                node.children()[i].clone(),
                node.children()[i + 1].clone(),
            ]));
        }
        vec![Some(Node::composite(parts))]
    }
}

pub struct StrengthenRelations;
impl Mutator for StrengthenRelations {
    fn name(&self) -> &'static str {
        "ArithmeticStrengthenRelations"
    }
    fn filter(&self, node: &Node, _env: &SymbolEnv) -> bool {
        is_arithmetic_relation(node)
    }
    fn mutations(&self, node: &Node, _env: &SymbolEnv) -> Vec<Option<Node>> {
        let options: &[&str] = match node.name() {
            Some("<") => &["="],
            Some(">") => &["="],
            Some("<=") => &["<", "="],
            Some(">=") => &[">", "="],
            _ => return vec![],
        };
        options
            .iter()
            .map(|rel| {
                let mut children = vec![Node::leaf(*rel)];
                children.extend(node.children()[1..].iter().cloned());
                Some(Node::composite(children))
            })
            .collect()
    }
}

pub fn push_all(v: &mut Vec<Box<dyn Mutator>>) {
    v.push(Box::new(SimplifyConstant));
    v.push(Box::new(NegateRelations));
    v.push(Box::new(SplitNaryRelations));
    v.push(Box::new(StrengthenRelations));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smtlib_io::{parse_one, print_node};

    #[test]
    fn negate_relation_pushes_into_relation() {
        let n = parse_one("(not (< x y))").unwrap();
        let env = SymbolEnv::default();
        let m = NegateRelations;
        assert!(m.filter(&n, &env));
        let outs = m.mutations(&n, &env);
        let mut s = String::new();
        print_node(outs[0].as_ref().unwrap(), &mut s);
        assert_eq!(s, "(>= x y)");
    }

    #[test]
    fn split_nary_relation() {
        let n = parse_one("(< a b c)").unwrap();
        let env = SymbolEnv::default();
        let m = SplitNaryRelations;
        assert!(m.filter(&n, &env));
        let outs = m.mutations(&n, &env);
        let mut s = String::new();
        print_node(outs[0].as_ref().unwrap(), &mut s);
        assert_eq!(s, "(and (< a b) (< b c))");
    }

    #[test]
    fn strengthen_le_offers_lt_and_eq() {
        let n = parse_one("(<= x y)").unwrap();
        let env = SymbolEnv::default();
        let outs = StrengthenRelations.mutations(&n, &env);
        assert_eq!(outs.len(), 2);
    }

    #[test]
    fn simplify_constant_halves_and_tenths() {
        let exprs = crate::smtlib_io::parse("(assert (= x 100))\n").unwrap();
        let target = exprs[0].get(1).unwrap().get(2).unwrap().clone();
        let env = SymbolEnv::default();
        let m = SimplifyConstant;
        assert!(m.filter(&target, &env));
        let outs = m.global_mutations(&target, &exprs, &env);
        assert_eq!(outs.len(), 2);
    }
}
