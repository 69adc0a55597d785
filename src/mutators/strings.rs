//! String-theory mutators. Like `bitvector.rs`, grounded directly in the
//! string theory's rewrite rules (no original Python source for this group
//! was retained).
use crate::mutator::Mutator;
use crate::node::Node;
use crate::smtlib::{self, SymbolEnv};

/// Shrink a string literal towards the empty string: drop the first or last
/// character.
pub struct StringSimplifyConstant;
impl Mutator for StringSimplifyConstant {
    fn name(&self) -> &'static str {
        "StringSimplifyConstant"
    }
    fn filter(&self, node: &Node, _env: &SymbolEnv) -> bool {
        smtlib::is_string_constant(node)
            && node
                .text()
                .map(|t| t[1..t.len() - 1].chars().count() > 1)
                .unwrap_or(false)
    }
    fn mutations(&self, node: &Node, _env: &SymbolEnv) -> Vec<Option<Node>> {
        let t = node.text().unwrap();
        let inner = &t[1..t.len() - 1];
        if inner.is_empty() {
            return vec![];
        }
        let mut out = Vec::new();
        let mut chars = inner.chars();
        if chars.next().is_some() {
            out.push(Some(Node::leaf(format!("\"{}\"", &inner[inner.chars().next().unwrap().len_utf8()..]))));
        }
        let mut rchars = inner.chars();
        if rchars.next_back().is_some() {
            let last_len = inner.chars().next_back().unwrap().len_utf8();
            out.push(Some(Node::leaf(format!("\"{}\"", &inner[..inner.len() - last_len]))));
        }
        out.push(Some(Node::leaf("\"\"")));
        out
    }
}

pub fn push_all(v: &mut Vec<Box<dyn Mutator>>) {
    v.push(Box::new(StringSimplifyConstant));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smtlib_io::parse_one;

    #[test]
    fn shrinks_string_literal() {
        let n = parse_one("\"abc\"").unwrap();
        let env = SymbolEnv::default();
        let m = StringSimplifyConstant;
        assert!(m.filter(&n, &env));
        let outs = m.mutations(&n, &env);
        let texts: Vec<&str> = outs.iter().map(|o| o.as_ref().unwrap().text().unwrap()).collect();
        assert!(texts.contains(&"\"bc\""));
        assert!(texts.contains(&"\"ab\""));
        assert!(texts.contains(&"\"\""));
    }

    #[test]
    fn single_char_not_eligible() {
        let n = parse_one("\"a\"").unwrap();
        let env = SymbolEnv::default();
        assert!(!StringSimplifyConstant.filter(&n, &env));
    }
}
