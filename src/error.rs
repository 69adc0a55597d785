//! Error types. Configuration/startup and I/O failures are surfaced as
//! `DdsmtError`; mutator and worker faults are absorbed where they occur
//! and never reach this type.
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DdsmtError {
    #[error("input file not found: {0}")]
    InputNotFound(PathBuf),

    #[error("command is empty")]
    EmptyCommand,

    #[error("command not executable: {0}")]
    CommandNotExecutable(String),

    #[error("golden run mismatch: configured match string {0:?} not found in the golden {1} stream")]
    GoldenMatchMissing(String, &'static str),

    #[error("failed to parse input: {0}")]
    Parse(#[from] crate::smtlib_io::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("interrupted by user")]
    Interrupted,
}

pub type Result<T> = std::result::Result<T, DdsmtError>;
