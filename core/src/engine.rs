use std::fmt;
use std::rc::Rc;

use pledge_types::{Collection, Handlers, Value};

use crate::combinators;
use crate::deferred::{Deferred, Promise};
use crate::scheduler::{Context, ContextRef};
use crate::{DiagnosticSink, Scheduler};

/// Factory for deferreds bound to one scheduler and one diagnostic sink.
///
/// Cloning is cheap; clones share the collaborators.
#[derive(Clone)]
pub struct Engine {
    ctx: ContextRef,
}

impl Engine {
    pub fn new(scheduler: impl Scheduler + 'static, sink: impl DiagnosticSink + 'static) -> Self {
        Self {
            ctx: Context::new(scheduler, sink),
        }
    }

    #[must_use]
    pub fn defer(&self) -> Deferred {
        Deferred::new(Rc::clone(&self.ctx))
    }

    /// A promise already rejected with `reason`.
    pub fn reject(&self, reason: impl Into<Value>) -> Promise {
        let deferred = self.defer();
        deferred.reject(reason);
        deferred.promise()
    }

    /// Adopt `value` (plain or thenable) and apply `handlers` to its outcome.
    /// Never settles before the next tick.
    pub fn when(&self, value: impl Into<Value>, handlers: Handlers) -> Promise {
        combinators::when(&self.ctx, value.into(), handlers)
    }

    /// Join a list or map of values and promises into one promise of the same
    /// shape.
    pub fn all(&self, promises: impl Into<Collection>) -> Promise {
        combinators::all(&self.ctx, promises.into())
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine").finish_non_exhaustive()
    }
}
