//! Deferred Scheduler - Two-phase task queue.
//!
//! Structural rewrites (several repivots, an offset change) are queued and
//! become observable together on the next flush:
//!
//! 1. **pre-tick** tasks run first. Propagation "start" work lives here.
//! 2. **dirty** tasks run once no pre-tick task is left. Propagation "end"
//!    work lives here.
//!
//! Within one flush every pre-tick task, including ones queued by other
//! tasks, runs before the next dirty task. A dirty task that queues pre-tick
//! work sends the flush back to phase 1.
//!
//! # Example
//!
//! ```ignore
//! use spark_reduce_list::DeferredScheduler;
//!
//! let scheduler = DeferredScheduler::new();
//! scheduler.push_dirty(|| println!("end"));
//! scheduler.push_pre_tick(|| println!("start"));
//! scheduler.flush(); // start, end
//! ```

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::trace;

/// A queued unit of work.
pub type Task = Box<dyn FnOnce()>;

/// Which queue a task sits in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    PreTick,
    Dirty,
}

// =============================================================================
// Queue State
// =============================================================================

#[derive(Default)]
struct Queues {
    pre_tick: VecDeque<Task>,
    dirty: VecDeque<Task>,
    flushing: bool,
}

/// Clears the flushing flag when a flush ends, including by unwinding.
struct FlushGuard<'a>(&'a RefCell<Queues>);

impl Drop for FlushGuard<'_> {
    fn drop(&mut self) {
        self.0.borrow_mut().flushing = false;
    }
}

thread_local! {
    /// Scheduler shared by every list on this thread that wasn't given one.
    static SHARED: DeferredScheduler = DeferredScheduler::new();
}

// =============================================================================
// DeferredScheduler
// =============================================================================

/// Cloneable handle to a two-phase task queue.
#[derive(Clone, Default)]
pub struct DeferredScheduler {
    queues: Rc<RefCell<Queues>>,
}

impl DeferredScheduler {
    /// A private scheduler.
    pub fn new() -> Self {
        Self::default()
    }

    /// The thread's shared scheduler.
    pub fn shared() -> Self {
        SHARED.with(|s| s.clone())
    }

    /// Queue a task for the pre-tick phase.
    pub fn push_pre_tick(&self, task: impl FnOnce() + 'static) {
        self.push(Phase::PreTick, Box::new(task));
    }

    /// Queue a task for the dirty phase.
    pub fn push_dirty(&self, task: impl FnOnce() + 'static) {
        self.push(Phase::Dirty, Box::new(task));
    }

    pub fn push(&self, phase: Phase, task: Task) {
        let mut queues = self.queues.borrow_mut();
        match phase {
            Phase::PreTick => queues.pre_tick.push_back(task),
            Phase::Dirty => queues.dirty.push_back(task),
        }
    }

    /// Run queued tasks until both phases are empty.
    ///
    /// Returns the number of tasks run. A flush started from inside a task
    /// returns 0 immediately; the outer flush picks up anything queued.
    ///
    /// A panicking task ends the flush; the scheduler stays usable and the
    /// remaining tasks run on the next flush.
    pub fn flush(&self) -> usize {
        {
            let mut queues = self.queues.borrow_mut();
            if queues.flushing {
                return 0;
            }
            queues.flushing = true;
        }
        let _guard = FlushGuard(&self.queues);

        let mut ran = 0;
        while let Some((phase, task)) = self.next_task() {
            trace!(?phase, "deferred task");
            task();
            ran += 1;
        }

        if ran > 0 {
            trace!(tasks = ran, "deferred flush");
        }
        ran
    }

    /// Pop the next task, pre-tick first. The borrow ends before the task runs.
    fn next_task(&self) -> Option<(Phase, Task)> {
        let mut queues = self.queues.borrow_mut();
        if let Some(task) = queues.pre_tick.pop_front() {
            return Some((Phase::PreTick, task));
        }
        queues.dirty.pop_front().map(|task| (Phase::Dirty, task))
    }

    /// Queued task counts as `(pre_tick, dirty)`.
    pub fn pending(&self) -> (usize, usize) {
        let queues = self.queues.borrow();
        (queues.pre_tick.len(), queues.dirty.len())
    }

    pub fn is_idle(&self) -> bool {
        self.pending() == (0, 0)
    }

    /// True if both handles drive the same queues.
    pub fn same_as(&self, other: &DeferredScheduler) -> bool {
        Rc::ptr_eq(&self.queues, &other.queues)
    }
}
