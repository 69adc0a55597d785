//! Top-level coordinator: validate the input, capture the golden run, pick
//! a strategy, and drive it to a fixpoint.
use std::time::Instant;

use log::info;

use crate::checker::Checker;
use crate::cli::{Config, Strategy};
use crate::error::{DdsmtError, Result};
use crate::mutator::active_mutators_with_mode;
use crate::node::Node;
use crate::smtlib_io;
use crate::strategy::{ddmin, naive};
use crate::tmpfiles;

pub fn run(cfg: Config) -> Result<()> {
    if !cfg.infile.exists() {
        return Err(DdsmtError::InputNotFound(cfg.infile.clone()));
    }
    let source = std::fs::read_to_string(&cfg.infile)?;
    let exprs = smtlib_io::parse(&source)?;

    if cfg.parser_test {
        let printed = smtlib_io::write_to_string(&exprs);
        let reparsed = smtlib_io::parse(&printed)?;
        if reparsed != exprs {
            log::error!("parser round-trip check failed");
        } else {
            info!("parser round-trip check passed");
        }
        return Ok(());
    }

    info!("capturing golden run(s) on {}", cfg.infile.display());
    let checker = Checker::do_golden_runs(
        &cfg.infile,
        cfg.command.clone(),
        cfg.cross_check.clone(),
        cfg.match_out.clone(),
        cfg.match_err.clone(),
        cfg.match_out_cc.clone(),
        cfg.match_err_cc.clone(),
        cfg.timeout,
        cfg.timeout_cc,
    )?;

    let increasing = matches!(cfg.replace_by_variable_mode, crate::cli::ReplaceByVariableMode::Inc);
    let mutators = active_mutators_with_mode(&cfg.mutators, increasing);

    let start = Instant::now();
    let initial_nodes = Node::count_nodes(&exprs);
    let (reduced, ntests) = match cfg.strategy {
        Strategy::Ddmin => ddmin::reduce(exprs, &mutators, &checker, &cfg.outfile, cfg.max_threads),
        Strategy::Naive => naive::reduce(exprs, &mutators, &checker, &cfg.outfile, cfg.max_threads),
    };

    tmpfiles::persist_atomically(&cfg.outfile, &reduced)?;

    let final_nodes = Node::count_nodes(&reduced);
    info!(
        "reduced {initial_nodes} -> {final_nodes} nodes in {:.1}s across {ntests} checks ({} invocations)",
        start.elapsed().as_secs_f64(),
        checker.invocation_count()
    );

    if crate::interrupt::requested() {
        return Err(DdsmtError::Interrupted);
    }
    Ok(())
}
