//! Channel-backed task loop.
//!
//! [`LoopHandle`] is the [`Scheduler`] handed to an engine; every scheduled
//! task travels over an unbounded channel to the [`EventLoop`], which runs
//! them one at a time, in submission order, on the thread that drives it.

use pledge_config::DEFAULT_TASK_BUDGET;
use pledge_core::{Promise, Scheduler, Task};
use pledge_types::Value;
use tokio::sync::mpsc;

use crate::RuntimeError;

/// Sending half of the loop. Cheap to clone.
#[derive(Debug, Clone)]
pub struct LoopHandle {
    tx: mpsc::UnboundedSender<Task>,
}

impl LoopHandle {
    /// True once the owning [`EventLoop`] has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl Scheduler for LoopHandle {
    fn schedule(&self, task: Task) {
        if self.tx.send(task).is_err() {
            tracing::warn!("Event loop is gone; dropping scheduled task");
        }
    }
}

#[derive(Debug)]
pub struct EventLoop {
    rx: mpsc::UnboundedReceiver<Task>,
    budget: usize,
}

impl EventLoop {
    #[must_use]
    pub fn new() -> (Self, LoopHandle) {
        Self::with_budget(DEFAULT_TASK_BUDGET)
    }

    /// `budget` caps how many tasks one call to a drive method may run.
    #[must_use]
    pub fn with_budget(budget: usize) -> (Self, LoopHandle) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { rx, budget }, LoopHandle { tx })
    }

    #[must_use]
    pub const fn budget(&self) -> usize {
        self.budget
    }

    /// Tasks queued but not yet run.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.rx.len()
    }

    /// Run queued tasks, including any they schedule, until the channel is
    /// empty. Never waits. Returns the number of tasks run.
    pub fn run_until_idle(&mut self) -> Result<usize, RuntimeError> {
        let mut executed = 0;
        self.drain(&mut executed)?;
        tracing::debug!(executed, "Event loop idle");
        Ok(executed)
    }

    /// Drain the loop, then report how `promise` settled.
    ///
    /// Returns [`RuntimeError::Stalled`] if the promise is still pending once
    /// no work is left.
    pub fn block_on(&mut self, promise: &Promise) -> Result<Value, RuntimeError> {
        let settlement = promise.capture();
        self.run_until_idle()?;
        match settlement.outcome() {
            Some(outcome) => outcome.map_err(|reason| RuntimeError::Rejected { reason }),
            None => Err(RuntimeError::Stalled),
        }
    }

    /// Drive the loop until `promise` settles, waiting for tasks sent from
    /// elsewhere (timers, local tasks) whenever the channel runs dry.
    ///
    /// Waits indefinitely while any [`LoopHandle`] is alive and the promise
    /// stays pending.
    pub async fn run_until(&mut self, promise: &Promise) -> Result<Value, RuntimeError> {
        let settlement = promise.capture();
        let mut executed = 0;
        loop {
            self.drain(&mut executed)?;
            if let Some(outcome) = settlement.outcome() {
                tracing::debug!(executed, "Promise settled");
                return outcome.map_err(|reason| RuntimeError::Rejected { reason });
            }

            // Out of budget: leave the next task queued for a later drive.
            if executed >= self.budget {
                return Err(self.exhausted());
            }
            let Some(task) = self.rx.recv().await else {
                return Err(RuntimeError::Disconnected);
            };
            task();
            executed += 1;
        }
    }

    fn drain(&mut self, executed: &mut usize) -> Result<(), RuntimeError> {
        loop {
            if *executed >= self.budget {
                if self.rx.is_empty() {
                    return Ok(());
                }
                return Err(self.exhausted());
            }
            match self.rx.try_recv() {
                Ok(task) => {
                    task();
                    *executed += 1;
                }
                Err(mpsc::error::TryRecvError::Empty | mpsc::error::TryRecvError::Disconnected) => {
                    return Ok(());
                }
            }
        }
    }

    fn exhausted(&self) -> RuntimeError {
        tracing::warn!(budget = self.budget, "Task budget exhausted");
        RuntimeError::BudgetExhausted {
            budget: self.budget,
        }
    }
}
