//! Bounded worker pool. Workers pull cases from a shared queue and push
//! finished verdicts through a bounded channel, so results stream back in
//! completion order and a consumer that stops pulling stops the pool.

use std::collections::VecDeque;
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;

use crate::model::{TestCase, TestResult};

/// Callback that runs one case to a verdict. Implementations time the
/// execution themselves so a case that never starts keeps an absent
/// `run_time`.
pub type CaseRunner = Arc<dyn Fn(&TestCase) -> TestResult + Send + Sync>;

/// Default worker count: three quarters of the logical CPUs, at least one.
#[must_use]
pub fn default_worker_count() -> usize {
    let cpus = thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get);
    (cpus * 3 / 4).max(1)
}

/// Fixed-size pool that executes a batch of cases exactly once.
#[derive(Debug, Clone, Copy)]
pub struct ExecutorPool {
    workers: usize,
}

impl ExecutorPool {
    /// `workers` is clamped to at least one.
    #[must_use]
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
        }
    }

    #[must_use]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Spawn the workers over `cases` and hand back the verdict stream.
    ///
    /// Workers are detached: nothing joins them, so dropping the stream early
    /// never blocks process exit. In-flight cases run to completion and their
    /// verdicts are discarded once the stream is gone.
    pub fn execute(&self, cases: Vec<TestCase>, runner: CaseRunner) -> VerdictStream {
        let queued = cases.len();
        let queue = Arc::new(Mutex::new(VecDeque::from(cases)));
        // Bounded by worker count: a stalled consumer back-pressures the
        // workers instead of buffering every verdict.
        let (tx, rx) = mpsc::sync_channel::<TestResult>(self.workers);

        tracing::debug!(workers = self.workers, queued, "starting executor pool");

        for worker in 0..self.workers {
            let queue = Arc::clone(&queue);
            let tx = tx.clone();
            let runner = Arc::clone(&runner);
            thread::spawn(move || {
                loop {
                    let case = {
                        let mut guard = match queue.lock() {
                            Ok(guard) => guard,
                            Err(_) => break,
                        };
                        guard.pop_front()
                    };
                    let Some(case) = case else { break };
                    tracing::trace!(
                        worker,
                        parser = %case.parser,
                        filename = %case.filename,
                        "picked up case"
                    );
                    let verdict = runner(&case);
                    if tx.send(verdict).is_err() {
                        // Consumer dropped the stream; stop pulling work.
                        break;
                    }
                }
            });
        }
        drop(tx);

        VerdictStream { rx }
    }
}

/// Single-pass stream of verdicts in completion order.
///
/// Yields `None` once every worker has exited; iterating again after that
/// keeps yielding `None`. Dropping the stream early cancels outstanding work.
pub struct VerdictStream {
    rx: mpsc::Receiver<TestResult>,
}

impl Iterator for VerdictStream {
    type Item = TestResult;

    fn next(&mut self) -> Option<TestResult> {
        self.rx.recv().ok()
    }
}
