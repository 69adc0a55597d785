//! Partition-based delta-debugging minimizer: a granularity-halving
//! reducer over top-level commands and subtrees, repeating rounds until a
//! round removes nothing.
use crate::checker::Checker;
use crate::mutator::Mutator;
use crate::mutators::core;
use crate::node::{substitute, Node, SubstMap};
use crate::pool::{self, Candidate};
use crate::smtlib::{self, SymbolEnv};
use crate::tmpfiles;

/// Always run first in every round, to a local fixpoint: deletes top-level
/// commands one at a time (`max_depth() == 1`).
pub struct RemoveCommand;
impl Mutator for RemoveCommand {
    fn name(&self) -> &'static str {
        "RemoveCommand"
    }
    fn max_depth(&self) -> Option<usize> {
        Some(1)
    }
}

fn build_local_candidates(exprs: &[Node], subset: &[Node], mutator: &dyn Mutator, env: &SymbolEnv) -> Vec<Vec<Node>> {
    if subset.len() == 1 {
        let node = &subset[0];
        let muts = crate::mutator::try_mutations(mutator, node, env);
        if muts.is_empty() {
            let mut map = SubstMap::default();
            map.insert(node.id(), None);
            vec![substitute(exprs, &map)]
        } else {
            muts.into_iter()
                .map(|m| {
                    let mut map = SubstMap::default();
                    map.insert(node.id(), m);
                    substitute(exprs, &map)
                })
                .collect()
        }
    } else {
        let mut map = SubstMap::default();
        for node in subset {
            let repl = crate::mutator::try_mutations(mutator, node, env).into_iter().next().unwrap_or(None);
            map.insert(node.id(), repl);
        }
        vec![substitute(exprs, &map)]
    }
}

/// Run a single mutator to a fixpoint at every granularity. Returns the
/// (possibly updated) tree, number of candidates tried, and expressions
/// removed this pass.
fn apply_mutator(
    mutator: &dyn Mutator,
    mut exprs: Vec<Node>,
    checker: &Checker,
    outfile: &std::path::Path,
    max_threads: usize,
) -> (Vec<Node>, u64, u64) {
    let mut env = smtlib::collect_information(&exprs);
    let filtered: Vec<Node> = Node::dfs_forest(&exprs, mutator.max_depth())
        .filter(|n| mutator.filter(n, &env))
        .collect();

    let mut ntests = 0u64;
    let mut nreduced_total = 0u64;
    let mut gran = filtered.len();

    while gran > 0 {
        let mut subsets: Vec<Option<Vec<Node>>> =
            filtered.chunks(gran).map(|c| Some(c.to_vec())).collect();
        loop {
            if crate::interrupt::requested() {
                return (exprs, ntests, nreduced_total);
            }
            let mut candidates: Vec<Candidate<usize>> = Vec::new();
            for (idx, subset_opt) in subsets.iter().enumerate() {
                let Some(subset) = subset_opt else { continue };
                if mutator.has_global() {
                    for tree in crate::mutator::try_global_mutations(mutator, &subset[0], &exprs, &env) {
                        candidates.push(Candidate { id: idx, tree });
                    }
                }
                if mutator.has_local() {
                    for tree in build_local_candidates(&exprs, subset, mutator, &env) {
                        candidates.push(Candidate { id: idx, tree });
                    }
                }
            }
            if candidates.is_empty() {
                break;
            }
            ntests += candidates.len() as u64;
            match pool::first_acceptance(checker, max_threads, candidates.into_iter()) {
                Some(accepted) => {
                    let before = Node::count_exprs(&exprs) as i64;
                    let after = Node::count_exprs(&accepted.tree) as i64;
                    nreduced_total += (before - after).max(0) as u64;
                    exprs = accepted.tree;
                    env = smtlib::collect_information(&exprs);
                    let _ = tmpfiles::persist_atomically(outfile, &exprs);
                    subsets[accepted.id] = None;
                }
                None => break,
            }
        }
        gran /= 2;
    }
    (exprs, ntests, nreduced_total)
}

/// Run every active mutator, repeating rounds until one produces zero
/// reductions.
pub fn reduce(
    mut exprs: Vec<Node>,
    mutators: &[Box<dyn Mutator>],
    checker: &Checker,
    outfile: &std::path::Path,
    max_threads: usize,
) -> (Vec<Node>, u64) {
    let mut ntests_total = 0u64;
    loop {
        if crate::interrupt::requested() {
            break;
        }
        let mut nreduced_round = 0u64;

        loop {
            let (new_exprs, ntests, nreduced) =
                apply_mutator(&RemoveCommand, exprs, checker, outfile, max_threads);
            exprs = new_exprs;
            ntests_total += ntests;
            nreduced_round += nreduced;
            if nreduced == 0 || crate::interrupt::requested() {
                break;
            }
        }

        loop {
            if crate::interrupt::requested() {
                break;
            }
            let env = smtlib::collect_information(&exprs);
            let candidate = core::remove_unused_declarations(&exprs, &env);
            if candidate.len() == exprs.len() {
                break;
            }
            ntests_total += 1;
            if checker.check_exprs(&candidate).unwrap_or(false) {
                nreduced_round += (exprs.len() - candidate.len()) as u64;
                exprs = candidate;
                let _ = tmpfiles::persist_atomically(outfile, &exprs);
            } else {
                break;
            }
        }

        for m in mutators {
            if crate::interrupt::requested() {
                break;
            }
            let (new_exprs, ntests, nreduced) = apply_mutator(m.as_ref(), exprs, checker, outfile, max_threads);
            exprs = new_exprs;
            ntests_total += ntests;
            nreduced_round += nreduced;
        }

        if nreduced_round == 0 || crate::interrupt::requested() {
            break;
        }
    }
    (exprs, ntests_total)
}

#[cfg(test)]
mod tests {
    use super::*;
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
    fn remove_command_erases_unused_top_level_forms() {
        let script = fake_solver("grep -q 'assert true' \"$1\" && exit 1 || exit 0");
        let cmd = vec![script.to_string_lossy().into_owned()];
        let input = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(input.path(), "(assert true)\n(assert false)\n").unwrap();
        let checker = Checker::do_golden_runs(input.path(), cmd, None, None, None, None, None, None, None).unwrap();

        let exprs = crate::smtlib_io::parse("(assert true)\n(assert false)\n").unwrap();
        let outfile = tempfile::NamedTempFile::new().unwrap();
        let (reduced, _n, _r) = apply_mutator(&RemoveCommand, exprs, &checker, outfile.path(), 2);
        assert!(reduced.iter().any(|c| {
            let mut s = String::new();
            crate::smtlib_io::print_node(c, &mut s);
            s == "(assert true)"
        }));
    }

    #[test]
    fn full_reduce_shrinks_to_fixpoint() {
        let script = fake_solver("grep -q '13' \"$1\" && exit 1 || exit 0");
        let cmd = vec![script.to_string_lossy().into_owned()];
        let input = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(input.path(), "(assert (= x 13))\n").unwrap();
        let checker = Checker::do_golden_runs(input.path(), cmd, None, None, None, None, None, None, None).unwrap();

        let exprs = crate::smtlib_io::parse("(assert (= x 13))\n").unwrap();
        let outfile = tempfile::NamedTempFile::new().unwrap();
        let active = crate::mutator::active_mutators(&crate::mutator::MutatorConfig::all_enabled());
        let (reduced, _ntests) = reduce(exprs, &active, &checker, outfile.path(), 2);
        let out = crate::smtlib_io::write_to_string(&reduced);
        assert!(out.contains('3'));
    }
}
