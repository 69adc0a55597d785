//! Command-line surface. Most flags are declared directly with `clap`'s
//! derive macro; the per-mutator `--<name>`/`--no-<name>` toggles are
//! generated at runtime from the mutator registry, so the builder API is
//! used to splice them onto a derived base command.
use std::path::PathBuf;
use std::time::Duration;

use clap::{Arg, ArgAction, ArgMatches, CommandFactory, FromArgMatches, Parser, ValueEnum};

use crate::mutator::MutatorConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    Ddmin,
    Naive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReplaceByVariableMode {
    Inc,
    Dec,
}

#[derive(Parser, Debug)]
#[command(name = "ddsmt", about = "Delta debugger for SMT-LIB v2 benchmarks")]
pub struct Args {
    /// SMT-LIB input file to reduce.
    pub infile: PathBuf,
    /// Where the smallest found candidate is written.
    pub outfile: PathBuf,

    /// The command to run (with optional arguments); the input/candidate
    /// file is appended as the final argument, e.g. `ddsmt in.smt2 out.smt2
    /// z3 --smt2`.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, required = true, num_args = 1..)]
    pub command: Vec<String>,

    /// A second command every accepted candidate must also satisfy; split on
    /// whitespace, e.g. `-c "z3 --smt2"`.
    #[arg(short = 'c', long = "cross-check")]
    pub cross_check: Option<String>,

    #[arg(short = 't', long)]
    pub timeout: Option<f64>,
    #[arg(long = "timeout-cc")]
    pub timeout_cc: Option<f64>,

    /// Worker threads evaluating candidates concurrently. `n <= 0` means
    /// CPU-count + n; default 1.
    #[arg(long = "max-threads", allow_hyphen_values = true)]
    pub max_threads: Option<i64>,

    #[arg(short = 'v', action = ArgAction::Count)]
    pub verbose: u8,

    #[arg(long, value_enum, default_value = "ddmin")]
    pub strategy: Strategy,

    #[arg(long = "match-out")]
    pub match_out: Option<String>,
    #[arg(long = "match-err")]
    pub match_err: Option<String>,
    #[arg(long = "match-out-cc")]
    pub match_out_cc: Option<String>,
    #[arg(long = "match-err-cc")]
    pub match_err_cc: Option<String>,

    /// Re-parse and re-print the input once at startup and abort if it
    /// doesn't round-trip; useful for validating the tokenizer/printer.
    #[arg(long = "parser-test")]
    pub parser_test: bool,

    #[arg(long = "replace-by-variable-mode", value_enum, default_value = "inc")]
    pub replace_by_variable_mode: ReplaceByVariableMode,
}

/// Fully resolved configuration, ready for `orchestrate::run`.
pub struct Config {
    pub infile: PathBuf,
    pub outfile: PathBuf,
    pub command: Vec<String>,
    pub cross_check: Option<Vec<String>>,
    pub timeout: Option<Duration>,
    pub timeout_cc: Option<Duration>,
    pub max_threads: usize,
    pub verbose: u8,
    pub strategy: Strategy,
    pub match_out: Option<String>,
    pub match_err: Option<String>,
    pub match_out_cc: Option<String>,
    pub match_err_cc: Option<String>,
    pub parser_test: bool,
    pub replace_by_variable_mode: ReplaceByVariableMode,
    pub mutators: MutatorConfig,
}

/// Build the `clap::Command` with a `--<name>`/`--no-<name>` pair appended
/// for every registered mutator, each defaulting to enabled.
fn build_command() -> clap::Command {
    let mut cmd = Args::command();
    for name in crate::mutators::all_names() {
        let lower = name.to_ascii_lowercase();
        let positive_id = format!("enable-{lower}");
        let negative_id = format!("disable-{lower}");
        cmd = cmd
            .arg(
                Arg::new(positive_id.clone())
                    .long(lower.clone())
                    .action(ArgAction::SetTrue)
                    .help(format!("Enable the {name} mutator (default)")),
            )
            .arg(
                Arg::new(negative_id.clone())
                    .long(format!("no-{lower}"))
                    .action(ArgAction::SetTrue)
                    .overrides_with(positive_id)
                    .help(format!("Disable the {name} mutator")),
            );
    }
    cmd
}

fn mutator_config_from_matches(matches: &ArgMatches) -> MutatorConfig {
    let mut cfg = MutatorConfig::all_enabled();
    for name in crate::mutators::all_names() {
        let lower = name.to_ascii_lowercase();
        if matches.get_flag(&format!("disable-{lower}")) {
            cfg.enabled.remove(name);
        }
    }
    cfg
}

/// Resolve `--max-threads`: absent means 1, `n <= 0` means CPU-count + n
/// (clamped to at least 1 thread).
fn resolve_max_threads(n: Option<i64>) -> usize {
    match n {
        None => 1,
        Some(n) if n <= 0 => ((num_cpus::get() as i64) + n).max(1) as usize,
        Some(n) => n as usize,
    }
}

pub fn parse() -> Config {
    let matches = build_command().get_matches();
    let args = Args::from_arg_matches(&matches).expect("clap-derived args must parse from their own command");
    let mutators = mutator_config_from_matches(&matches);

    Config {
        infile: args.infile,
        outfile: args.outfile,
        command: args.command,
        cross_check: args.cross_check.map(|s| s.split_whitespace().map(str::to_string).collect()),
        timeout: args.timeout.map(Duration::from_secs_f64),
        timeout_cc: args.timeout_cc.map(Duration::from_secs_f64),
        max_threads: resolve_max_threads(args.max_threads),
        verbose: args.verbose,
        strategy: args.strategy,
        match_out: args.match_out,
        match_err: args.match_err,
        match_out_cc: args.match_out_cc,
        match_err_cc: args.match_err_cc,
        parser_test: args.parser_test,
        replace_by_variable_mode: args.replace_by_variable_mode,
        mutators,
    }
}
