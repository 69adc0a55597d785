//! Subprocess execution, golden-run capture, and the accept/reject oracle.
//! Timeout handling uses a background thread plus channel per stream,
//! applied here to a single child process's stdout/stderr drain instead of
//! a worker pool.
use std::io::Read;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{DdsmtError, Result};
use crate::node::Node;
use crate::tmpfiles;

#[derive(Debug, Clone, Default)]
pub struct RunInfo {
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub runtime: Duration,
    pub timed_out: bool,
}

/// Run `cmd` (first element program, rest args) with `filename` appended as
/// the final argument. `timeout: None` means unbounded.
pub fn execute(cmd: &[String], filename: &std::path::Path, timeout: Option<Duration>) -> Result<RunInfo> {
    let mut command = Command::new(&cmd[0]);
    command.args(&cmd[1..]);
    command.arg(filename);
    command.stdout(Stdio::piped());
    command.stderr(Stdio::piped());
    command.stdin(Stdio::null());

    let start = Instant::now();
    let mut child: Child = command.spawn().map_err(|_| DdsmtError::CommandNotExecutable(cmd[0].clone()))?;

    let mut stdout_pipe = child.stdout.take().expect("piped stdout");
    let mut stderr_pipe = child.stderr.take().expect("piped stderr");
    let (out_tx, out_rx) = mpsc::channel();
    let (err_tx, err_rx) = mpsc::channel();
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stdout_pipe.read_to_end(&mut buf);
        let _ = out_tx.send(buf);
    });
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = stderr_pipe.read_to_end(&mut buf);
        let _ = err_tx.send(buf);
    });

    let (done_tx, done_rx) = mpsc::channel::<()>();
    let timed_out = if let Some(limit) = timeout {
        let watch_done = done_rx;
        let deadline = Instant::now() + limit;
        loop {
            if watch_done.recv_timeout(Duration::from_millis(20)).is_ok() {
                break false;
            }
            if let Ok(Some(_)) = child.try_wait() {
                break false;
            }
            if Instant::now() >= deadline {
                let _ = child.kill();
                let _ = child.wait();
                break true;
            }
        }
    } else {
        let _ = child.wait();
        false
    };
    drop(done_tx);

    let runtime = start.elapsed();
    if timed_out {
        return Ok(RunInfo {
            exit_code: None,
            stdout: Vec::new(),
            stderr: Vec::new(),
            runtime: timeout.unwrap_or(runtime),
            timed_out: true,
        });
    }

    let exit_code = child.wait().ok().and_then(|s| s.code());
    let stdout = out_rx.recv_timeout(Duration::from_secs(5)).unwrap_or_default();
    let stderr = err_rx.recv_timeout(Duration::from_secs(5)).unwrap_or_default();
    Ok(RunInfo { exit_code, stdout, stderr, runtime, timed_out: false })
}

pub fn matches_golden(golden: &RunInfo, run: &RunInfo, match_out: Option<&str>, match_err: Option<&str>) -> bool {
    if run.timed_out {
        return false;
    }
    if run.exit_code != golden.exit_code {
        return false;
    }
    let out_ok = match match_out {
        Some(needle) => contains_bytes(&run.stdout, needle.as_bytes()),
        None => run.stdout == golden.stdout,
    };
    let err_ok = match match_err {
        Some(needle) => contains_bytes(&run.stderr, needle.as_bytes()),
        None => run.stderr == golden.stderr,
    };
    out_ok && err_ok
}

fn contains_bytes(haystack: &[u8], needle: &[u8]) -> bool {
    if needle.is_empty() {
        return true;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Captured once at startup; read-only afterward.
pub struct Checker {
    pub primary_cmd: Vec<String>,
    pub cross_check_cmd: Option<Vec<String>>,
    pub match_out: Option<String>,
    pub match_err: Option<String>,
    pub match_out_cc: Option<String>,
    pub match_err_cc: Option<String>,
    pub timeout: Option<Duration>,
    pub timeout_cc: Option<Duration>,
    pub golden: RunInfo,
    pub golden_cc: Option<RunInfo>,
    invocations: AtomicU64,
}

impl Checker {
    /// Run the command(s) on the original file without a timeout, validate
    /// the configured match strings actually occur, and derive a default
    /// timeout from the golden runtime when none was configured.
    pub fn do_golden_runs(
        infile: &std::path::Path,
        primary_cmd: Vec<String>,
        cross_check_cmd: Option<Vec<String>>,
        match_out: Option<String>,
        match_err: Option<String>,
        match_out_cc: Option<String>,
        match_err_cc: Option<String>,
        mut timeout: Option<Duration>,
        timeout_cc: Option<Duration>,
    ) -> Result<Checker> {
        if primary_cmd.is_empty() {
            return Err(DdsmtError::EmptyCommand);
        }
        let golden = execute(&primary_cmd, infile, None)?;
        if let Some(s) = &match_out {
            if !contains_bytes(&golden.stdout, s.as_bytes()) {
                return Err(DdsmtError::GoldenMatchMissing(s.clone(), "stdout"));
            }
        }
        if let Some(s) = &match_err {
            if !contains_bytes(&golden.stderr, s.as_bytes()) {
                return Err(DdsmtError::GoldenMatchMissing(s.clone(), "stderr"));
            }
        }
        let golden_cc = match &cross_check_cmd {
            Some(cmd) => {
                let run = execute(cmd, infile, None)?;
                if let Some(s) = &match_out_cc {
                    if !contains_bytes(&run.stdout, s.as_bytes()) {
                        return Err(DdsmtError::GoldenMatchMissing(s.clone(), "stdout"));
                    }
                }
                if let Some(s) = &match_err_cc {
                    if !contains_bytes(&run.stderr, s.as_bytes()) {
                        return Err(DdsmtError::GoldenMatchMissing(s.clone(), "stderr"));
                    }
                }
                Some(run)
            }
            None => None,
        };
        if timeout.is_none() {
            let secs = (golden.runtime.as_secs_f64() + 1.0) * 1.5;
            timeout = Some(Duration::from_secs_f64(secs));
        }
        Ok(Checker {
            primary_cmd,
            cross_check_cmd,
            match_out,
            match_err,
            match_out_cc,
            match_err_cc,
            timeout,
            timeout_cc,
            golden,
            golden_cc,
            invocations: AtomicU64::new(0),
        })
    }

    pub fn invocation_count(&self) -> u64 {
        self.invocations.load(Ordering::Relaxed)
    }

    /// Run the primary command (and cross-check, if configured) against
    /// `file`; both must match their respective goldens for acceptance.
    pub fn check(&self, file: &std::path::Path) -> bool {
        self.invocations.fetch_add(1, Ordering::Relaxed);
        let run = match execute(&self.primary_cmd, file, self.timeout) {
            Ok(r) => r,
            Err(_) => return false,
        };
        if !matches_golden(&self.golden, &run, self.match_out.as_deref(), self.match_err.as_deref()) {
            return false;
        }
        if let Some(cc_cmd) = &self.cross_check_cmd {
            let cc_run = match execute(cc_cmd, file, self.timeout_cc.or(self.timeout)) {
                Ok(r) => r,
                Err(_) => return false,
            };
            let golden_cc = self.golden_cc.as_ref().expect("cross-check golden captured");
            if !matches_golden(golden_cc, &cc_run, self.match_out_cc.as_deref(), self.match_err_cc.as_deref()) {
                return false;
            }
        }
        true
    }

    pub fn check_exprs(&self, exprs: &[Node]) -> Result<bool> {
        let candidate = tmpfiles::write_candidate(exprs)?;
        Ok(self.check(candidate.path()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_golden_exact_output() {
        let golden = RunInfo { exit_code: Some(0), stdout: b"ok".to_vec(), stderr: vec![], runtime: Duration::ZERO, timed_out: false };
        let same = RunInfo { exit_code: Some(0), stdout: b"ok".to_vec(), stderr: vec![], runtime: Duration::ZERO, timed_out: false };
        let different = RunInfo { exit_code: Some(0), stdout: b"no".to_vec(), stderr: vec![], runtime: Duration::ZERO, timed_out: false };
        assert!(matches_golden(&golden, &same, None, None));
        assert!(!matches_golden(&golden, &different, None, None));
    }

    #[test]
    fn matches_golden_substring_mode() {
        let golden = RunInfo { exit_code: Some(1), stdout: b"whatever".to_vec(), stderr: vec![], runtime: Duration::ZERO, timed_out: false };
        let run = RunInfo { exit_code: Some(1), stdout: b"xx error yy".to_vec(), stderr: vec![], runtime: Duration::ZERO, timed_out: false };
        assert!(matches_golden(&golden, &run, Some("error"), None));
        assert!(!matches_golden(&golden, &run, Some("nope"), None));
    }

    #[test]
    fn timed_out_run_never_matches() {
        let golden = RunInfo { exit_code: Some(0), stdout: vec![], stderr: vec![], runtime: Duration::ZERO, timed_out: false };
        let run = RunInfo { exit_code: Some(0), stdout: vec![], stderr: vec![], runtime: Duration::ZERO, timed_out: true };
        assert!(!matches_golden(&golden, &run, None, None));
    }

    #[test]
    fn execute_captures_exit_code_and_stdout() {
        let info = execute(&["sh".into(), "-c".into(), "echo hi; exit 3".into()], std::path::Path::new("/dev/null"), None).unwrap();
        assert_eq!(info.exit_code, Some(3));
        assert_eq!(info.stdout, b"hi\n");
    }

    #[test]
    fn execute_enforces_timeout() {
        let info = execute(&["sh".into(), "-c".into(), "sleep 5".into()], std::path::Path::new("/dev/null"), Some(Duration::from_millis(100))).unwrap();
        assert!(info.timed_out);
    }
}
