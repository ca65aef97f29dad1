//! A manually drained FIFO task queue.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use crate::{Scheduler, Task};

/// Single-threaded scheduler whose tasks run only when the owner drains it.
///
/// Clones share one queue: hand a clone to the engine and keep another to
/// drive it. Tasks scheduled while draining are appended behind the tasks
/// already queued.
#[derive(Clone, Default)]
pub struct TaskQueue {
    tasks: Rc<RefCell<VecDeque<Task>>>,
}

impl TaskQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.borrow().is_empty()
    }

    /// Run the oldest task. Returns `false` if the queue was empty.
    pub fn run_next(&self) -> bool {
        // Release the borrow before running: tasks schedule more tasks.
        let task = self.tasks.borrow_mut().pop_front();
        match task {
            Some(task) => {
                task();
                true
            }
            None => false,
        }
    }

    /// Run only the tasks queued before this call; anything they schedule
    /// waits for the next tick.
    pub fn run_tick(&self) -> usize {
        let queued = self.len();
        let mut ran = 0;
        while ran < queued && self.run_next() {
            ran += 1;
        }
        ran
    }

    /// Run tasks until none remain, including ones scheduled along the way.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.run_next() {
            ran += 1;
        }
        tracing::trace!(ran, "task queue idle");
        ran
    }
}

impl Scheduler for TaskQueue {
    fn schedule(&self, task: Task) {
        self.tasks.borrow_mut().push_back(task);
    }
}

impl fmt::Debug for TaskQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskQueue")
            .field("len", &self.len())
            .finish()
    }
}
