//! The worker pool that evaluates candidates in parallel: a fixed set of
//! threads pulls from a shared lock-free queue and reports results back
//! over an `mpsc` channel, with cooperative cancellation once any worker
//! reports an acceptance. Workers run a subprocess per candidate (the
//! checker), so process isolation against a misbehaving solver is already
//! provided at that boundary instead of by the pool itself. `thread::scope`
//! lets the workers borrow `checker` directly instead of requiring an
//! `Arc<Checker>` the strategies would otherwise have to thread through
//! every call site.
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;

use concurrent_queue::ConcurrentQueue;

use crate::checker::Checker;
use crate::node::Node;

/// One trial: an identifier (used by strategies to track provenance, e.g.
/// the DFS index or chunk) paired with the fully materialized tree to try.
pub struct Candidate<Id> {
    pub id: Id,
    pub tree: Vec<Node>,
}

/// Feed `candidates` (consumed lazily rather than materialized up front)
/// to `num_workers` threads running `checker.check`. Returns the first
/// accepted candidate, or `None` if the queue drains without any
/// acceptance.
pub fn first_acceptance<Id, I>(checker: &Checker, num_workers: usize, candidates: I) -> Option<Candidate<Id>>
where
    Id: Send,
    I: Iterator<Item = Candidate<Id>> + Send,
{
    let queue: ConcurrentQueue<Candidate<Id>> = ConcurrentQueue::unbounded();
    let cancelled = AtomicBool::new(false);
    let (tx, rx) = mpsc::channel();

    std::thread::scope(|scope| {
        let workers = num_workers.max(1);
        for _ in 0..workers {
            let queue = &queue;
            let cancelled = &cancelled;
            let tx = tx.clone();
            scope.spawn(move || loop {
                if cancelled.load(Ordering::Relaxed) {
                    return;
                }
                match queue.pop() {
                    Ok(candidate) => {
                        if cancelled.load(Ordering::Relaxed) {
                            return;
                        }
                        let accepted = checker.check_exprs(&candidate.tree).unwrap_or(false);
                        if accepted {
                            cancelled.store(true, Ordering::Relaxed);
                            let _ = tx.send(Some(candidate));
                            return;
                        }
                    }
                    Err(concurrent_queue::PopError::Closed) => return,
                    Err(concurrent_queue::PopError::Empty) => {
                        std::thread::yield_now();
                    }
                }
            });
        }
        drop(tx);

        scope.spawn(|| {
            for candidate in candidates {
                if cancelled.load(Ordering::Relaxed) {
                    break;
                }
                if queue.push(candidate).is_err() {
                    break;
                }
            }
            queue.close();
        });

        let result = rx.recv().ok().flatten();
        cancelled.store(true, Ordering::Relaxed);
        queue.close();
        result
    })
}
