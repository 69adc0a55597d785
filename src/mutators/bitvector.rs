//! Bit-vector mutators: rules built from the `FixedSizeBitVectors` SMT-LIB
//! theory's operators and constant-folding identities.
use crate::mutator::Mutator;
use crate::node::Node;
use crate::smtlib::{self, SymbolEnv};

fn bv_bits(node: &Node) -> Option<(Vec<bool>, u32)> {
    let t = node.text()?;
    if let Some(rest) = t.strip_prefix("#b") {
        return Some((rest.bytes().map(|b| b == b'1').collect(), rest.len() as u32));
    }
    if let Some(rest) = t.strip_prefix("#x") {
        let mut bits = Vec::with_capacity(rest.len() * 4);
        for c in rest.chars() {
            let v = c.to_digit(16)?;
            for i in (0..4).rev() {
                bits.push((v >> i) & 1 == 1);
            }
        }
        return Some((bits, rest.len() as u32 * 4));
    }
    None
}

fn bits_to_node(bits: &[bool]) -> Node {
    let s: String = bits.iter().map(|b| if *b { '1' } else { '0' }).collect();
    Node::leaf(format!("#b{s}"))
}

pub struct ConcatToZeroExtend;
impl Mutator for ConcatToZeroExtend {
    fn name(&self) -> &'static str {
        "BVConcatToZeroExtend"
    }
    fn filter(&self, node: &Node, _env: &SymbolEnv) -> bool {
        node.is_operator("concat")
            && node.len() == 3
            && bv_bits(&node.children()[1])
                .map(|(bits, _)| bits.iter().all(|b| !b))
                .unwrap_or(false)
    }
    fn mutations(&self, node: &Node, _env: &SymbolEnv) -> Vec<Option<Node>> {
        let (_, width) = bv_bits(&node.children()[1]).unwrap();
        let idx = Node::composite(vec![
            Node::leaf("_"),
            Node::leaf("zero_extend"),
            Node::leaf(width.to_string()),
        ]);
        vec![Some(Node::composite(vec![idx, node.children()[2].clone()]))]
    }
}

pub struct DoubleNegation;
impl Mutator for DoubleNegation {
    fn name(&self) -> &'static str {
        "BVDoubleNegation"
    }
    fn filter(&self, node: &Node, _env: &SymbolEnv) -> bool {
        node.is_operator("bvnot") && node.get(1).map(|c| c.is_operator("bvnot")).unwrap_or(false)
    }
    fn mutations(&self, node: &Node, _env: &SymbolEnv) -> Vec<Option<Node>> {
        vec![Some(node.get(1).unwrap().get(1).unwrap().clone())]
    }
}

/// `bvcomp` returns a 1-bit result; `(= (bvcomp a b) #b1)` says exactly `a = b`.
pub struct ElimBVComp;
impl Mutator for ElimBVComp {
    fn name(&self) -> &'static str {
        "BVElimBVComp"
    }
    fn filter(&self, node: &Node, _env: &SymbolEnv) -> bool {
        node.is_operator("=")
            && node.len() == 3
            && node.get(1).map(|c| c.is_operator("bvcomp")).unwrap_or(false)
            && node.get(2).and_then(|n| n.text()) == Some("#b1")
    }
    fn mutations(&self, node: &Node, _env: &SymbolEnv) -> Vec<Option<Node>> {
        let comp = node.get(1).unwrap();
        vec![Some(Node::composite(vec![
            Node::leaf("="),
            comp.get(1).unwrap().clone(),
            comp.get(2).unwrap().clone(),
        ]))]
    }
}

pub struct EvalExtend;
impl Mutator for EvalExtend {
    fn name(&self) -> &'static str {
        "BVEvalExtend"
    }
    fn filter(&self, node: &Node, _env: &SymbolEnv) -> bool {
        (smtlib::is_indexed_operator(node, "zero_extend", 1)
            || smtlib::is_indexed_operator(node, "sign_extend", 1))
            && node.get(1).map(smtlib::is_bv_constant).unwrap_or(false)
    }
    fn mutations(&self, node: &Node, _env: &SymbolEnv) -> Vec<Option<Node>> {
        let Some((mut bits, _)) = bv_bits(node.get(1).unwrap()) else {
            return vec![];
        };
        let k: usize = node.children()[0]
            .get(2)
            .and_then(|n| n.text())
            .and_then(|s| s.parse().ok())
            .unwrap_or(0);
        let is_sign_extend = node.children()[0].get(1).and_then(|n| n.text()) == Some("sign_extend");
        let fill = is_sign_extend && bits.first().copied().unwrap_or(false);
        let mut extended = vec![fill; k];
        extended.append(&mut bits);
        vec![Some(bits_to_node(&extended))]
    }
}

pub struct ExtractConstants;
impl Mutator for ExtractConstants {
    fn name(&self) -> &'static str {
        "BVExtractConstants"
    }
    fn filter(&self, node: &Node, _env: &SymbolEnv) -> bool {
        smtlib::is_indexed_operator(node, "extract", 2)
            && node.get(1).map(smtlib::is_bv_constant).unwrap_or(false)
    }
    fn mutations(&self, node: &Node, _env: &SymbolEnv) -> Vec<Option<Node>> {
        let Some((bits, width)) = bv_bits(node.get(1).unwrap()) else {
            return vec![];
        };
        let head = &node.children()[0];
        let i: usize = head.get(2).and_then(|n| n.text()).and_then(|s| s.parse().ok()).unwrap_or(0);
        let j: usize = head.get(3).and_then(|n| n.text()).and_then(|s| s.parse().ok()).unwrap_or(0);
        if i as u32 >= width || i < j {
            return vec![];
        }
        let from_msb0 = |idx: usize| bits[(width as usize - 1) - idx];
        let slice: Vec<bool> = (j..=i).rev().map(from_msb0).collect();
        vec![Some(bits_to_node(&slice))]
    }
}

/// `(ite c (_ bv1 N) (_ bv0 N))` compared for equality with `(_ bv1 N)`
/// simplifies to the condition itself.
pub struct OneZeroITE;
impl Mutator for OneZeroITE {
    fn name(&self) -> &'static str {
        "BVOneZeroITE"
    }
    fn filter(&self, node: &Node, _env: &SymbolEnv) -> bool {
        node.is_operator("=")
            && node.len() == 3
            && is_one_zero_ite(node.get(1))
            && node.get(2).map(is_all_ones).unwrap_or(false)
    }
    fn mutations(&self, node: &Node, _env: &SymbolEnv) -> Vec<Option<Node>> {
        let ite = node.get(1).unwrap();
        vec![Some(ite.get(1).unwrap().clone())]
    }
}

fn is_one_zero_ite(node: Option<&Node>) -> bool {
    let Some(n) = node else { return false };
    n.is_operator("ite")
        && n.len() == 4
        && is_all_ones(n.get(2).unwrap())
        && bv_bits(n.get(3).unwrap()).map(|(b, _)| b.iter().all(|x| !x)).unwrap_or(false)
}

fn is_all_ones(n: &Node) -> bool {
    bv_bits(n).map(|(b, _)| b.iter().all(|x| *x)).unwrap_or(false)
}

pub struct ReflexiveNand;
impl Mutator for ReflexiveNand {
    fn name(&self) -> &'static str {
        "BVReflexiveNand"
    }
    fn filter(&self, node: &Node, _env: &SymbolEnv) -> bool {
        node.is_operator("bvnand") && node.len() == 3 && node.get(1) == node.get(2)
    }
    fn mutations(&self, node: &Node, _env: &SymbolEnv) -> Vec<Option<Node>> {
        vec![Some(Node::composite(vec![
            Node::leaf("bvnot"),
            node.get(1).unwrap().clone(),
        ]))]
    }
}

pub struct SimplifyConstant;
impl Mutator for SimplifyConstant {
    fn name(&self) -> &'static str {
        "BVSimplifyConstant"
    }
    fn filter(&self, node: &Node, _env: &SymbolEnv) -> bool {
        bv_bits(node).map(|(b, _)| b.iter().any(|x| *x)).unwrap_or(false)
    }
    fn mutations(&self, node: &Node, _env: &SymbolEnv) -> Vec<Option<Node>> {
        let Some((bits, _)) = bv_bits(node) else {
            return vec![];
        };
        let mut cleared_msb = bits.clone();
        if let Some(pos) = cleared_msb.iter().position(|b| *b) {
            cleared_msb[pos] = false;
        }
        let mut cleared_lsb = bits.clone();
        if let Some(pos) = cleared_lsb.iter().rposition(|b| *b) {
            cleared_lsb[pos] = false;
        }
        let mut out = vec![Some(bits_to_node(&cleared_msb))];
        if cleared_lsb != cleared_msb {
            out.push(Some(bits_to_node(&cleared_lsb)));
        }
        out
    }
}

/// Collapse an equality between a 1-bit vector and `#b1`/`#b0` into a plain
/// Boolean (or its negation).
pub struct TransformToBool;
impl Mutator for TransformToBool {
    fn name(&self) -> &'static str {
        "BVTransformToBool"
    }
    fn filter(&self, node: &Node, env: &SymbolEnv) -> bool {
        node.is_operator("=")
            && node.len() == 3
            && (single_bit_bv(node.get(1), env) || single_bit_bv(node.get(2), env))
    }
    fn mutations(&self, node: &Node, _env: &SymbolEnv) -> Vec<Option<Node>> {
        let (lhs, rhs) = (node.get(1).unwrap(), node.get(2).unwrap());
        let (var, lit) = if lhs.text() == Some("#b1") || lhs.text() == Some("#b0") {
            (rhs, lhs)
        } else {
            (lhs, rhs)
        };
        if lit.text() == Some("#b1") {
            vec![Some(var.clone())]
        } else if lit.text() == Some("#b0") {
            vec![Some(Node::composite(vec![Node::leaf("not"), var.clone()]))]
        } else {
            vec![]
        }
    }
}

fn single_bit_bv(node: Option<&Node>, env: &SymbolEnv) -> bool {
    node.map(|n| smtlib::get_bv_width(n, env) == 1).unwrap_or(false)
}

/// Reduce a declared bit-vector sort's width by one.
pub struct ReduceBW;
impl Mutator for ReduceBW {
    fn name(&self) -> &'static str {
        "BVReduceBW"
    }
    fn filter(&self, node: &Node, _env: &SymbolEnv) -> bool {
        smtlib::is_bv_type(node)
            && node.get(2).and_then(|n| n.text()).and_then(|s| s.parse::<u32>().ok()).unwrap_or(0) > 1
    }
    fn mutations(&self, node: &Node, _env: &SymbolEnv) -> Vec<Option<Node>> {
        let width: u32 = node.get(2).unwrap().text().unwrap().parse().unwrap();
        vec![Some(Node::composite(vec![
            Node::leaf("_"),
            Node::leaf("BitVec"),
            Node::leaf((width - 1).to_string()),
        ]))]
    }
}

/// A coarser companion to `ReduceBW`: halve the width in one step instead of
/// decrementing by one, so wide declarations don't need `log(N)` rounds just
/// to reach a representative small width.
pub struct MergeReducedBW;
impl Mutator for MergeReducedBW {
    fn name(&self) -> &'static str {
        "BVMergeReducedBW"
    }
    fn filter(&self, node: &Node, _env: &SymbolEnv) -> bool {
        smtlib::is_bv_type(node)
            && node
                .get(2)
                .and_then(|n| n.text())
                .and_then(|s| s.parse::<u32>().ok())
                .map(|w| w > 1 && w % 2 == 0)
                .unwrap_or(false)
    }
    fn mutations(&self, node: &Node, _env: &SymbolEnv) -> Vec<Option<Node>> {
        let width: u32 = node.get(2).unwrap().text().unwrap().parse().unwrap();
        vec![Some(Node::composite(vec![
            Node::leaf("_"),
            Node::leaf("BitVec"),
            Node::leaf((width / 2).to_string()),
        ]))]
    }
}

pub fn push_all(v: &mut Vec<Box<dyn Mutator>>) {
    v.push(Box::new(ConcatToZeroExtend));
    v.push(Box::new(DoubleNegation));
    v.push(Box::new(ElimBVComp));
    v.push(Box::new(EvalExtend));
    v.push(Box::new(ExtractConstants));
    v.push(Box::new(OneZeroITE));
    v.push(Box::new(ReflexiveNand));
    v.push(Box::new(SimplifyConstant));
    v.push(Box::new(TransformToBool));
    v.push(Box::new(ReduceBW));
    v.push(Box::new(MergeReducedBW));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smtlib_io::{parse_one, print_node};

    #[test]
    fn double_negation() {
        let n = parse_one("(bvnot (bvnot x))").unwrap();
        let env = SymbolEnv::default();
        let m = DoubleNegation;
        assert!(m.filter(&n, &env));
        assert_eq!(m.mutations(&n, &env)[0].as_ref().unwrap().text(), Some("x"));
    }

    #[test]
    fn reflexive_nand_to_not() {
        let n = parse_one("(bvnand x x)").unwrap();
        let env = SymbolEnv::default();
        let m = ReflexiveNand;
        assert!(m.filter(&n, &env));
        let mut s = String::new();
        print_node(m.mutations(&n, &env)[0].as_ref().unwrap(), &mut s);
        assert_eq!(s, "(bvnot x)");
    }

    #[test]
    fn extract_constant_bits() {
        let n = parse_one("((_ extract 3 1) #b1011)").unwrap();
        let env = SymbolEnv::default();
        let m = ExtractConstants;
        assert!(m.filter(&n, &env));
        assert_eq!(m.mutations(&n, &env)[0].as_ref().unwrap().text(), Some("#b101"));
    }

    #[test]
    fn eval_zero_extend_constant() {
        let n = parse_one("((_ zero_extend 2) #b11)").unwrap();
        let env = SymbolEnv::default();
        let m = EvalExtend;
        assert!(m.filter(&n, &env));
        assert_eq!(m.mutations(&n, &env)[0].as_ref().unwrap().text(), Some("#b0011"));
    }

    #[test]
    fn reduce_bw_decrements_width() {
        let n = parse_one("(_ BitVec 8)").unwrap();
        let env = SymbolEnv::default();
        let m = ReduceBW;
        assert!(m.filter(&n, &env));
        let mut s = String::new();
        print_node(m.mutations(&n, &env)[0].as_ref().unwrap(), &mut s);
        assert_eq!(s, "(_ BitVec 7)");
    }

    #[test]
    fn transform_to_bool_on_equality_with_one() {
        let n = parse_one("(= x #b1)").unwrap();
        let env = SymbolEnv::default();
        let m = TransformToBool;
        assert!(m.filter(&n, &env));
        assert_eq!(m.mutations(&n, &env)[0].as_ref().unwrap().text(), Some("x"));
    }
}
