//! Mutation-stream reducer with a DFS `skip` resume point: mutators are
//! tried once per node in document order, advancing the resume point on
//! each acceptance and restarting from the top of the tree once a full
//! pass makes no progress.
use std::collections::HashMap;

use crate::checker::Checker;
use crate::mutator::Mutator;
use crate::mutators::core;
use crate::node::{substitute, Node, SubstMap};
use crate::pool::{self, Candidate};
use crate::smtlib;
use crate::tmpfiles;

/// Three ordered pools: strong structural mutators first, theory mutators
/// second, cosmetic mutators last. Each pool is *added to* the active set
/// rather than replacing it.
const POOL_1: &[&str] = &[
    "Constants",
    "EraseNode",
    "SubstituteChildren",
    "TopLevelBinaryReduction",
    "CheckSatAssuming",
    "LetElimination",
    "LetSubstitution",
    "PushPopRemoval",
];
const POOL_2: &[&str] = &[
    "ArithmeticSimplifyConstant",
    "ArithmeticNegateRelations",
    "ArithmeticSplitNaryRelations",
    "ArithmeticStrengthenRelations",
    "BVConcatToZeroExtend",
    "BVDoubleNegation",
    "BVElimBVComp",
    "BVEvalExtend",
    "BVExtractConstants",
    "BVOneZeroITE",
    "BVReflexiveNand",
    "BVSimplifyConstant",
    "BVTransformToBool",
    "BVReduceBW",
    "BVMergeReducedBW",
    "DeMorgan",
    "DoubleNegation",
    "EliminateFalseEquality",
    "EliminateImplications",
    "XORRemoveConstants",
    "XOREliminateBinary",
    "MergeWithChildren",
    "ReplaceByVariable",
    "SortChildren",
    "EliminateDistinct",
    "InlineDefinedFuns",
    "SimplifyLogic",
    "StringSimplifyConstant",
];
const POOL_3: &[&str] = &["SimplifyQuotedSymbols", "SimplifySymbolNames"];

fn pools() -> [&'static [&'static str]; 3] {
    [POOL_1, POOL_2, POOL_3]
}

/// Stream every local/global mutation for nodes past `skip` (1-based DFS
/// index), using the currently active mutator subset.
fn generate_mutations<'a>(
    exprs: &'a [Node],
    env: &'a smtlib::SymbolEnv,
    skip: i64,
    active: &'a [&'a dyn Mutator],
) -> impl Iterator<Item = Candidate<i64>> + 'a {
    Node::dfs_forest(exprs, None)
        .enumerate()
        .map(|(i, n)| (i as i64 + 1, n))
        .filter(move |(idx, _)| *idx > skip)
        .flat_map(move |(idx, node)| {
            let filter_node = node.clone();
            active
                .iter()
                .filter(move |m| m.filter(&filter_node, env))
                .flat_map(move |m| {
                    let local: Vec<Candidate<i64>> = if m.has_local() {
                        crate::mutator::try_mutations(*m, &node, env)
                            .into_iter()
                            .map(|repl| {
                                let mut map = SubstMap::default();
                                map.insert(node.id(), repl);
                                Candidate { id: idx, tree: substitute(exprs, &map) }
                            })
                            .collect()
                    } else {
                        Vec::new()
                    };
                    let global: Vec<Candidate<i64>> = if m.has_global() {
                        crate::mutator::try_global_mutations(*m, &node, exprs, env)
                            .into_iter()
                            .map(|tree| Candidate { id: idx, tree })
                            .collect()
                    } else {
                        Vec::new()
                    };
                    local.into_iter().chain(global)
                })
        })
}

pub fn reduce(
    mut exprs: Vec<Node>,
    all_mutators: &[Box<dyn Mutator>],
    checker: &Checker,
    outfile: &std::path::Path,
    max_threads: usize,
) -> (Vec<Node>, u64) {
    let by_name: HashMap<&str, &dyn Mutator> = all_mutators.iter().map(|m| (m.name(), m.as_ref())).collect();
    let pool_groups = pools();
    let mut cur_pool_idx = 1usize;
    let mut active: Vec<&dyn Mutator> = pool_groups[0].iter().filter_map(|n| by_name.get(n).copied()).collect();

    let mut nchecks = 0u64;

    loop {
        if crate::interrupt::requested() {
            break;
        }
        let mut skip = 0i64;
        let mut fresh_run = true;

        loop {
            if crate::interrupt::requested() {
                break;
            }
            if fresh_run {
                loop {
                    let env = smtlib::collect_information(&exprs);
                    let candidate = core::remove_unused_declarations(&exprs, &env);
                    if candidate.len() == exprs.len() {
                        break;
                    }
                    nchecks += 1;
                    if checker.check_exprs(&candidate).unwrap_or(false) {
                        exprs = candidate;
                        let _ = tmpfiles::persist_atomically(outfile, &exprs);
                    } else {
                        break;
                    }
                }
            }
            let env = smtlib::collect_information(&exprs);
            let total = Node::count_nodes(&exprs) as i64;
            log::debug!("naive: pool {cur_pool_idx}, position {skip}/{total}");
            let mut reduction = false;

            let candidates = generate_mutations(&exprs, &env, skip, &active);
            nchecks += 1;
            if let Some(accepted) = pool::first_acceptance(checker, max_threads, candidates) {
                exprs = accepted.tree;
                skip = accepted.id - 1;
                fresh_run = false;
                let _ = tmpfiles::persist_atomically(outfile, &exprs);
                reduction = true;
            }

            if !reduction {
                if fresh_run {
                    break;
                }
                skip = 0;
                fresh_run = true;
            }
        }

        if cur_pool_idx < pool_groups.len() {
            active.extend(pool_groups[cur_pool_idx].iter().filter_map(|n| by_name.get(n).copied()));
            cur_pool_idx += 1;
        } else {
            break;
        }
    }

    (exprs, nchecks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mutator::MutatorConfig;
    use std::io::Write;

    fn fake_solver(body: &str) -> tempfile::TempPath {
        let mut f = tempfile::Builder::new().suffix(".sh").tempfile().unwrap();
        writeln!(f, "#!/bin/sh\n{body}").unwrap();
        let path = f.into_temp_path();
        let mut perms = std::fs::metadata(&path).unwrap().permissions();
        use std::os::unix::fs::PermissionsExt;
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).unwrap();
        path
    }

    #[test]
    fn naive_reduces_simple_assertion() {
        let script = fake_solver("grep -q 'assert true' \"$1\" && exit 1 || exit 0");
        let cmd = vec![script.to_string_lossy().into_owned()];
        let input = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(input.path(), "(assert true)\n(assert false)\n").unwrap();
        let checker = Checker::do_golden_runs(input.path(), cmd, None, None, None, None, None, None, None).unwrap();

        let exprs = crate::smtlib_io::parse("(assert true)\n(assert false)\n").unwrap();
        let outfile = tempfile::NamedTempFile::new().unwrap();
        let active = crate::mutator::active_mutators(&MutatorConfig::all_enabled());
        let (reduced, _n) = reduce(exprs, &active, &checker, outfile.path(), 2);
        let out = crate::smtlib_io::write_to_string(&reduced);
        assert!(out.contains("assert true"));
        assert!(!out.contains("assert false"));
    }
}
