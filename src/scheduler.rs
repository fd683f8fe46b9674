//! Deferred execution
//!
//! The dialog needs exactly one kind of suspension: running a task on a later
//! turn of the event loop (so the page renders the hidden state before the
//! visible one) or after a delay (timed transitions). [`Scheduler`] abstracts
//! over where that turn comes from.

use std::cell::{Cell, RefCell};
use std::time::Duration;

use tracing::trace;

#[cfg(feature = "web")]
pub use crate::dom::web::TimeoutScheduler;

/// A unit of deferred work
pub type Task = Box<dyn FnOnce()>;

/// Source of later event-loop turns
pub trait Scheduler {
    /// Run `task` on a later turn, never synchronously
    fn defer(&self, task: Task);

    /// Run `task` once `delay` has elapsed
    fn defer_for(&self, delay: Duration, task: Task);
}

struct Pending {
    due: Duration,
    seq: u64,
    task: Task,
}

/// Deterministic scheduler driven by the caller.
///
/// Tasks are queued against a virtual clock and only run from
/// [`run_pending`](Self::run_pending) or [`advance`](Self::advance).
#[derive(Default)]
pub struct ManualScheduler {
    queue: RefCell<Vec<Pending>>,
    now: Cell<Duration>,
    seq: Cell<u64>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of queued tasks, due or not
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    /// Current virtual time
    pub fn now(&self) -> Duration {
        self.now.get()
    }

    /// Run every task that is due, including tasks queued by those tasks.
    /// Returns the number of tasks run.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        while let Some(task) = self.next_due() {
            task();
            ran += 1;
        }
        if ran > 0 {
            trace!(ran, "ran deferred tasks");
        }
        ran
    }

    /// Move the virtual clock forward and run what became due
    pub fn advance(&self, by: Duration) -> usize {
        self.now.set(self.now.get() + by);
        self.run_pending()
    }

    fn next_due(&self) -> Option<Task> {
        let mut queue = self.queue.borrow_mut();
        let now = self.now.get();
        let position = queue
            .iter()
            .enumerate()
            .filter(|(_, p)| p.due <= now)
            .min_by_key(|(_, p)| (p.due, p.seq))
            .map(|(i, _)| i)?;
        Some(queue.remove(position).task)
    }

    fn push(&self, due: Duration, task: Task) {
        let seq = self.seq.get();
        self.seq.set(seq + 1);
        self.queue.borrow_mut().push(Pending { due, seq, task });
    }
}

impl Scheduler for ManualScheduler {
    fn defer(&self, task: Task) {
        self.push(self.now.get(), task);
    }

    fn defer_for(&self, delay: Duration, task: Task) {
        self.push(self.now.get() + delay, task);
    }
}

/// Scheduler backed by the current tokio [`LocalSet`](tokio::task::LocalSet).
///
/// Tasks are `!Send` (they capture dialog handles), so they are spawned with
/// `spawn_local`; calling into this scheduler outside a `LocalSet` panics.
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

#[cfg(not(target_arch = "wasm32"))]
impl Scheduler for TokioScheduler {
    fn defer(&self, task: Task) {
        tokio::task::spawn_local(async move {
            tokio::task::yield_now().await;
            task();
        });
    }

    fn defer_for(&self, delay: Duration, task: Task) {
        tokio::task::spawn_local(async move {
            tokio::time::sleep(delay).await;
            task();
        });
    }
}
