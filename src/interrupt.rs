//! Cooperative cancellation flag set by the SIGINT handler installed in
//! `main`. Strategies poll this between rounds rather than aborting
//! mid-step, so the candidate persisted to the output file is always the
//! last accepted one, never a half-applied mutation.
use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

pub fn request() {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

pub fn requested() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}
