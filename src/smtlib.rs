//! SMT-LIB semantic layer: symbol/type tables and the predicates mutators
//! use to decide what a node means. Uses a permissive constant classifier
//! and the union of operator tables across known SMT-LIB dialects.
use fxhash::FxHashMap;

use crate::node::Node;

/// A defined function's formal parameters (name, sort), return sort, and body.
type FunctionDef = (Vec<(String, Node)>, Node, Node);

/// Read-only symbol environment, rebuilt by the coordinator after every
/// accepted reduction. Never mutated by mutators.
#[derive(Debug, Default, Clone)]
pub struct SymbolEnv {
    /// symbol -> sort, for zero-arity `declare-const`/`declare-fun`/`define-fun`.
    constants: FxHashMap<String, Node>,
    /// symbol -> its definition.
    defined_functions: FxHashMap<String, FunctionDef>,
    /// symbol -> declared/defined sort, for every named symbol above.
    type_lookup: FxHashMap<String, Node>,
}

impl SymbolEnv {
    pub fn is_constant_symbol(&self, name: &str) -> bool {
        self.constants.contains_key(name)
    }

    pub fn get_type_of_symbol(&self, name: &str) -> Option<&Node> {
        self.type_lookup.get(name)
    }

    pub fn variables_with_type(&self, ty: &Node) -> Vec<&str> {
        self.type_lookup
            .iter()
            .filter(|(_, t)| *t == ty)
            .map(|(k, _)| k.as_str())
            .collect()
    }

    pub fn is_defined_function(&self, name: &str) -> bool {
        self.defined_functions.contains_key(name)
    }

    pub fn defined_function(&self, name: &str) -> Option<&FunctionDef> {
        self.defined_functions.get(name)
    }
}

/// Walk the top-level commands once and (re)build the symbol environment.
/// Malformed commands are silently skipped: delta debugging must tolerate
/// intermediate ill-formed candidates.
pub fn collect_information(exprs: &[Node]) -> SymbolEnv {
    let mut env = SymbolEnv::default();
    for cmd in exprs {
        let Some(name) = cmd.name() else { continue };
        match name {
            "declare-const" => {
                if cmd.len() != 3 || !cmd.get(1).map(|n| n.is_leaf()).unwrap_or(false) {
                    continue;
                }
                let sym = cmd.get(1).unwrap().text().unwrap().to_string();
                let sort = cmd.get(2).unwrap().clone();
                env.constants.insert(sym.clone(), sort.clone());
                env.type_lookup.insert(sym, sort);
            }
            "declare-fun" => {
                if cmd.len() != 4 {
                    continue;
                }
                let (Some(sym_node), Some(params), Some(sort)) =
                    (cmd.get(1), cmd.get(2), cmd.get(3))
                else {
                    continue;
                };
                if !sym_node.is_leaf() || params.is_leaf() {
                    continue;
                }
                let sym = sym_node.text().unwrap().to_string();
                if params.is_empty() {
                    env.constants.insert(sym.clone(), sort.clone());
                }
                env.type_lookup.insert(sym, sort.clone());
            }
            "define-fun" => {
                if cmd.len() != 5 {
                    continue;
                }
                let (Some(sym_node), Some(params), Some(sort), Some(body)) =
                    (cmd.get(1), cmd.get(2), cmd.get(3), cmd.get(4))
                else {
                    continue;
                };
                if !sym_node.is_leaf() || params.is_leaf() {
                    continue;
                }
                let sym = sym_node.text().unwrap().to_string();
                if params.is_empty() {
                    env.constants.insert(sym.clone(), sort.clone());
                }
                let formals: Vec<(String, Node)> = params
                    .children()
                    .iter()
                    .filter_map(|p| {
                        if p.is_leaf() || p.len() != 2 {
                            None
                        } else {
                            Some((p.get(0)?.text()?.to_string(), p.get(1)?.clone()))
                        }
                    })
                    .collect();
                env.defined_functions
                    .insert(sym.clone(), (formals, sort.clone(), body.clone()));
                env.type_lookup.insert(sym, sort.clone());
            }
            _ => {}
        }
    }
    env
}

// --- literal classifiers (the two patterns ddSMT regexes for are simple
// enough to check directly; no regex dependency needed) ---

/// `[0-9]+`
fn is_int_literal(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// `[0-9]+(\.[0-9]*)?`
fn is_real_literal(s: &str) -> bool {
    match s.split_once('.') {
        None => is_int_literal(s),
        Some((int_part, frac_part)) => {
            !int_part.is_empty()
                && int_part.bytes().all(|b| b.is_ascii_digit())
                && frac_part.bytes().all(|b| b.is_ascii_digit())
        }
    }
}

pub fn is_boolean_constant(node: &Node) -> bool {
    matches!(node.text(), Some("false") | Some("true"))
}

pub fn is_int_constant(node: &Node) -> bool {
    node.text().map(is_int_literal).unwrap_or(false)
}

pub fn is_real_constant(node: &Node) -> bool {
    node.text().map(is_real_literal).unwrap_or(false)
}

/// Union of the original's `is_arithmetic_constant` (real-or-int regex) with
/// the stricter int/real checks: the more permissive classifier wins (Open
/// Question 1).
pub fn is_arithmetic_constant(node: &Node) -> bool {
    is_int_constant(node) || is_real_constant(node)
}

pub fn is_string_constant(node: &Node) -> bool {
    match node.text() {
        Some(t) if t.len() >= 2 && t.starts_with('"') && t.ends_with('"') => {
            !t[1..t.len() - 1].contains('"')
        }
        _ => false,
    }
}

/// `#b...`/`#x...` leaves, or composite `(_ bvK N)`.
pub fn is_bv_constant(node: &Node) -> bool {
    if let Some(t) = node.text() {
        return t.starts_with("#b") || t.starts_with("#x");
    }
    if node.len() != 3 {
        return false;
    }
    node.is_operator("_") && node.get(1).and_then(|n| n.text()).map(|s| s.starts_with("bv")).unwrap_or(false)
}

pub fn is_constant(node: &Node) -> bool {
    is_boolean_constant(node)
        || is_arithmetic_constant(node)
        || is_string_constant(node)
        || is_bv_constant(node)
}

/// `(_ BitVec N)`.
pub fn is_bv_type(node: &Node) -> bool {
    !node.is_leaf() && node.len() == 3 && node.is_operator("_") && node.get(1).and_then(|n| n.text()) == Some("BitVec")
}

/// `(Set T)`.
pub fn is_set_type(node: &Node) -> bool {
    !node.is_leaf() && node.len() == 2 && node.is_operator("Set")
}

const NARY_OPS: &[&str] = &[
    "=>", "and", "or", "xor", "=", "distinct", "+", "-", "*", "div", "/", "<=", "<", ">=", ">",
    "bvand", "bvor", "bvadd", "bvmul", "concat",
];

pub fn is_nary(node: &Node) -> bool {
    match node.name() {
        Some(n) => NARY_OPS.contains(&n),
        None => false,
    }
}

/// `(_ name idx1..idxk)`.
pub fn is_indexed_operator(node: &Node, name: &str, index_count: usize) -> bool {
    if node.is_leaf() || node.len() < 2 {
        return false;
    }
    let head = &node.children()[0];
    if head.is_leaf() {
        return false;
    }
    if head.name() != Some("_") {
        return false;
    }
    if head.get(1).and_then(|n| n.text()) != Some(name) {
        return false;
    }
    head.len() == index_count + 2
}

const BOOL_RETURNING: &[&str] = &[
    "not", "=>", "and", "or", "xor", "=", "distinct", "bvult", "bvule", "bvugt", "bvuge", "bvslt",
    "bvsle", "bvsgt", "bvsge", "fp.leq", "fp.lt", "fp.geq", "fp.gt", "fp.eq", "fp.isNormal",
    "fp.isSubnormal", "fp.isZero", "fp.isInfinite", "fp.isNaN", "fp.isNegative", "fp.isPositive",
    "<=", "<", ">=", ">", "is_int", "member", "subset", "str.<", "str.in_re", "str.<=",
    "str.prefixof", "str.suffixof", "str.contains", "str.is_digit",
];
const INT_RETURNING: &[&str] = &[
    "div", "mod", "abs", "to_int", "str.len", "str.indexof", "str.to_code", "str.to_int", "card",
];
const REAL_RETURNING: &[&str] = &["/", "to_real", "fp.to_real"];

/// Best-effort sort inferencer. `None` if it can't be determined.
pub fn get_type(node: &Node, env: &SymbolEnv) -> Option<Node> {
    if let Some(t) = node.text().and_then(|s| env.get_type_of_symbol(s)) {
        return Some(t.clone());
    }
    if is_boolean_constant(node) {
        return Some(Node::leaf("Bool"));
    }
    if is_bv_constant(node) {
        let w = get_bv_width(node, env);
        if w >= 0 {
            return Some(bv_sort(w as u32));
        }
    }
    if is_int_constant(node) {
        return Some(Node::leaf("Int"));
    }
    if is_real_constant(node) {
        return Some(Node::leaf("Real"));
    }
    let w = get_bv_width(node, env);
    if w != -1 {
        return Some(bv_sort(w as u32));
    }
    if let Some(name) = node.name() {
        if name == "ite" {
            return node.get(1).and_then(|n| get_type(n, env));
        }
        if BOOL_RETURNING.contains(&name) {
            return Some(Node::leaf("Bool"));
        }
        if name == "_" && node.len() == 3 && node.get(1).and_then(|n| n.text()) == Some("divisible")
        {
            return Some(Node::leaf("Bool"));
        }
        if INT_RETURNING.contains(&name) {
            return Some(Node::leaf("Int"));
        }
        if REAL_RETURNING.contains(&name) {
            return Some(Node::leaf("Real"));
        }
        if matches!(name, "+" | "-" | "*") {
            let any_real = node.children()[1..]
                .iter()
                .any(|c| get_type(c, env).as_ref().and_then(|t| t.text()) == Some("Real"));
            return Some(Node::leaf(if any_real { "Real" } else { "Int" }));
        }
    }
    None
}

fn bv_sort(width: u32) -> Node {
    Node::composite(vec![
        Node::leaf("_"),
        Node::leaf("BitVec"),
        Node::leaf(width.to_string()),
    ])
}

const BV_UNARY_FIRST_OPERAND: &[&str] = &[
    "bvnot", "bvand", "bvor", "bvneg", "bvadd", "bvmul", "bvudiv", "bvurem", "bvshl", "bvshr",
    "bvnand", "bvnor", "bvxor", "bvsub", "bvsdiv", "bvsrem", "bvsmod", "bvashr",
];

/// Return the bit-width or -1 if unknown.
pub fn get_bv_width(node: &Node, env: &SymbolEnv) -> i64 {
    if is_bv_constant(node) {
        if let Some(t) = node.text() {
            if let Some(rest) = t.strip_prefix("#b") {
                return rest.len() as i64;
            }
            if let Some(rest) = t.strip_prefix("#x") {
                return (rest.len() * 4) as i64;
            }
        }
        if let Some(n) = node.get(2).and_then(|n| n.text()) {
            return n.parse().unwrap_or(-1);
        }
        return -1;
    }
    if let Some(t) = node.text().and_then(|s| env.get_type_of_symbol(s)) {
        if is_bv_type(t) {
            if let Some(n) = t.get(2).and_then(|n| n.text()) {
                return n.parse().unwrap_or(-1);
            }
        }
    }
    if is_indexed_operator(node, "extend", 1) {
        let idx: i64 = node.children()[0]
            .get(2)
            .and_then(|n| n.text())
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        return idx + node.get(1).map(|c| get_bv_width(c, env)).unwrap_or(-1);
    }
    if is_indexed_operator(node, "extract", 2) {
        let i: i64 = node.children()[0]
            .get(2)
            .and_then(|n| n.text())
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let j: i64 = node.children()[0]
            .get(3)
            .and_then(|n| n.text())
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        return i - j + 1;
    }
    if is_indexed_operator(node, "repeat", 1) {
        let k: i64 = node.children()[0]
            .get(2)
            .and_then(|n| n.text())
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        return k * node.get(1).map(|c| get_bv_width(c, env)).unwrap_or(-1);
    }
    if is_indexed_operator(node, "rotate_left", 1) || is_indexed_operator(node, "rotate_right", 1) {
        return node.get(1).map(|c| get_bv_width(c, env)).unwrap_or(-1);
    }
    if let Some(name) = node.name() {
        if BV_UNARY_FIRST_OPERAND.contains(&name) {
            if let Some(c) = node.get(1) {
                return get_bv_width(c, env);
            }
        }
        if name == "concat" && node.len() == 3 {
            return get_bv_width(&node.children()[1], env) + get_bv_width(&node.children()[2], env);
        }
        if name == "bvcomp" {
            return 1;
        }
    }
    -1
}

/// Enumerate canonical constants of a sort.
pub fn get_constants(sort: &Node) -> Vec<Node> {
    if let Some(t) = sort.text() {
        return match t {
            "Bool" => vec![Node::leaf("false"), Node::leaf("true")],
            "Int" => vec![Node::leaf("0"), Node::leaf("1")],
            "Real" => vec![Node::leaf("0.0"), Node::leaf("1.0")],
            _ => vec![],
        };
    }
    if is_bv_type(sort) {
        let width = sort.get(2).cloned().unwrap_or_else(|| Node::leaf("0"));
        return vec!["bv0", "bv1"]
            .into_iter()
            .map(|c| Node::composite(vec![Node::leaf("_"), Node::leaf(c), width.clone()]))
            .collect();
    }
    if is_set_type(sort) {
        let elem = sort.get(1).unwrap();
        let mut out = vec![Node::composite(vec![
            Node::leaf("as"),
            Node::leaf("emptyset"),
            sort.clone(),
        ])];
        for c in get_constants(elem) {
            out.push(Node::composite(vec![Node::leaf("singleton"), c]));
        }
        return out;
    }
    vec![]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smtlib_io::parse;

    #[test]
    fn collects_const_and_fun_decls() {
        let exprs = parse("(declare-const x Int)\n(declare-fun f (Int) Bool)\n(define-fun g ((a Int)) Int a)\n").unwrap();
        let env = collect_information(&exprs);
        assert!(env.is_constant_symbol("x"));
        assert!(!env.is_constant_symbol("f"));
        assert!(env.is_defined_function("g"));
        assert_eq!(env.get_type_of_symbol("x").unwrap().text(), Some("Int"));
    }

    #[test]
    fn malformed_commands_are_skipped() {
        let exprs = parse("(declare-const)\n(declare-const y Int)\n").unwrap();
        let env = collect_information(&exprs);
        assert!(env.is_constant_symbol("y"));
        assert!(!env.is_constant_symbol(""));
    }

    #[test]
    fn constant_classification() {
        assert!(is_int_constant(&crate::node::Node::leaf("13")));
        assert!(is_real_constant(&crate::node::Node::leaf("1.5")));
        assert!(is_boolean_constant(&crate::node::Node::leaf("true")));
        assert!(is_string_constant(&crate::node::Node::leaf("\"abc\"")));
        assert!(is_bv_constant(&crate::node::Node::leaf("#b101")));
        assert!(!is_int_constant(&crate::node::Node::leaf("1.5")));
    }

    #[test]
    fn bv_width_extract() {
        let n = parse("((_ extract 7 2) x)").unwrap().remove(0);
        let env = SymbolEnv::default();
        assert_eq!(get_bv_width(&n, &env), 6);
    }

    #[test]
    fn bv_width_concat() {
        let n = parse("(concat #b1111 #b00)").unwrap().remove(0);
        let env = SymbolEnv::default();
        assert_eq!(get_bv_width(&n, &env), 6);
    }

    #[test]
    fn get_type_arithmetic_promotes_to_real() {
        let n = parse("(+ 1 2.0)").unwrap().remove(0);
        let env = SymbolEnv::default();
        assert_eq!(get_type(&n, &env).unwrap().text(), Some("Real"));
    }

    #[test]
    fn get_constants_for_bv_sort() {
        let sort = parse("(_ BitVec 4)").unwrap().remove(0);
        let cs = get_constants(&sort);
        assert_eq!(cs.len(), 2);
    }
}
