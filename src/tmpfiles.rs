//! Temp-file management for candidates, via `tempfile` rather than
//! hand-rolled `mktemp` logic.
use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::Result;
use crate::node::Node;
use crate::smtlib_io;

/// A candidate serialized to disk, kept alive only as long as the checker
/// needs it. Dropped (and deleted) as soon as the oracle has run.
pub struct CandidateFile {
    _handle: NamedTempFile,
    path: PathBuf,
}

impl CandidateFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

pub fn write_candidate(exprs: &[Node]) -> Result<CandidateFile> {
    let mut handle = NamedTempFile::new()?;
    handle.write_all(smtlib_io::write_to_string(exprs).as_bytes())?;
    handle.flush()?;
    let path = handle.path().to_path_buf();
    Ok(CandidateFile { _handle: handle, path })
}

/// Write-then-rename: the output file always contains either the previous
/// best tree or the new one, never a half-written one.
pub fn persist_atomically(path: &Path, exprs: &[Node]) -> Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(smtlib_io::write_to_string(exprs).as_bytes())?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
