//! Host collaborators: the scheduling primitive and the diagnostic sink.

use std::rc::Rc;

use pledge_types::Value;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce()>;

/// Runs a task later, after the current synchronous call stack unwinds.
///
/// Implementations must preserve submission order for tasks scheduled during
/// the same synchronous turn. Nothing else is assumed: no cancellation, no
/// synchronization, no ordering between independent turns beyond FIFO.
pub trait Scheduler {
    fn schedule(&self, task: Task);
}

impl<F> Scheduler for F
where
    F: Fn(Task),
{
    fn schedule(&self, task: Task) {
        self(task);
    }
}

/// Receives every failure thrown by a user handler.
///
/// Observational only: a sink never alters settlement and must not panic.
pub trait DiagnosticSink {
    fn report(&self, error: &Value);
}

impl<F> DiagnosticSink for F
where
    F: Fn(&Value),
{
    fn report(&self, error: &Value) {
        self(error);
    }
}

/// The two collaborators every deferred needs, shared by all deferreds an
/// engine creates.
pub(crate) struct Context {
    scheduler: Box<dyn Scheduler>,
    sink: Box<dyn DiagnosticSink>,
}

pub(crate) type ContextRef = Rc<Context>;

impl Context {
    pub(crate) fn new(
        scheduler: impl Scheduler + 'static,
        sink: impl DiagnosticSink + 'static,
    ) -> ContextRef {
        Rc::new(Self {
            scheduler: Box::new(scheduler),
            sink: Box::new(sink),
        })
    }

    pub(crate) fn schedule(&self, task: impl FnOnce() + 'static) {
        self.scheduler.schedule(Box::new(task));
    }

    pub(crate) fn report(&self, error: &Value) {
        tracing::trace!(error = %error.preview(120), "handler failure forwarded to sink");
        self.sink.report(error);
    }
}
