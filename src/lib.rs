//! A delta debugger for SMT-LIB v2 benchmarks: shrinks a benchmark file to
//! a minimal one that still reproduces a given solver's behavior.
#![allow(clippy::many_single_char_names)]

pub mod checker;
pub mod cli;
pub mod error;
pub mod interrupt;
pub mod logsetup;
pub mod mutator;
pub mod mutators;
pub mod node;
pub mod orchestrate;
pub mod pool;
pub mod smtlib;
pub mod smtlib_io;
pub mod strategy;
pub mod tmpfiles;
