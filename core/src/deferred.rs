//! The deferred/promise pair.
//!
//! A [`Deferred`] is the producer side: it settles exactly once via
//! [`resolve`](Deferred::resolve) or [`reject`](Deferred::reject) and may
//! report progress any number of times before that. A [`Promise`] is the
//! read-only consumer view of the same state.
//!
//! # Delivery
//!
//! Handlers never run inside the call that registered them or settled the
//! deferred. Settlement captures the registered triples and schedules one task
//! that forwards each triple, in registration order, to the adopted outcome.
//! Registrations after settlement are forwarded to the outcome directly, which
//! schedules on its own.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use pledge_types::{Handlers, Outcome, Thenable, ThenableRef, Value};

use crate::adapters::{adopt, rejected};
use crate::scheduler::ContextRef;
use crate::settlement::Settlement;

/// Triples registered before settlement.
///
/// Shared with in-flight progress tasks: a `notify` task reads the list when
/// it runs, not when it was scheduled.
type PendingList = Rc<RefCell<Vec<Handlers>>>;

enum State {
    Pending(PendingList),
    /// The adopted thenable that represents the final outcome.
    Settled(ThenableRef),
}

struct Shared {
    ctx: ContextRef,
    state: RefCell<State>,
}

/// Producer handle: settles the paired [`Promise`].
///
/// Clones share the same state. Only code meant to produce the result should
/// hold one.
#[derive(Clone)]
pub struct Deferred {
    shared: Rc<Shared>,
}

/// Consumer view over a [`Deferred`]. Cheap to clone and freely shareable.
#[derive(Clone)]
pub struct Promise {
    shared: Rc<Shared>,
}

impl Deferred {
    pub(crate) fn new(ctx: ContextRef) -> Self {
        Self {
            shared: Rc::new(Shared {
                ctx,
                state: RefCell::new(State::Pending(Rc::default())),
            }),
        }
    }

    #[must_use]
    pub fn promise(&self) -> Promise {
        Promise {
            shared: Rc::clone(&self.shared),
        }
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(*self.shared.state.borrow(), State::Settled(_))
    }

    /// Settle with `value`, adopting it if it is a thenable. No-op if already
    /// settled.
    ///
    /// Resolving with this deferred's own promise is not detected: the next
    /// subscription recurses until the stack overflows.
    pub fn resolve(&self, value: impl Into<Value>) {
        let value = value.into();
        let (callbacks, adopted) = {
            let mut state = self.shared.state.borrow_mut();
            let State::Pending(list) = &*state else {
                tracing::trace!("resolve ignored: deferred already settled");
                return;
            };
            let callbacks = Rc::clone(list);
            let adopted = adopt(&self.shared.ctx, value);
            *state = State::Settled(Rc::clone(&adopted));
            (callbacks, adopted)
        };

        if callbacks.borrow().is_empty() {
            return;
        }
        self.shared.ctx.schedule(move || {
            let handlers = std::mem::take(&mut *callbacks.borrow_mut());
            for triple in handlers {
                adopted.then_with(triple);
            }
        });
    }

    /// Settle as a failure with `reason`. No-op if already settled.
    pub fn reject(&self, reason: impl Into<Value>) {
        if self.is_settled() {
            tracing::trace!("reject ignored: deferred already settled");
            return;
        }
        self.resolve(rejected(&self.shared.ctx, reason.into()));
    }

    /// Deliver `progress` to every triple registered when the delivery task
    /// runs. Triples registered after this call but before that task still
    /// receive it. No-op once settled or with nothing registered.
    pub fn notify(&self, progress: impl Into<Value>) {
        let callbacks = match &*self.shared.state.borrow() {
            State::Pending(list) => Rc::clone(list),
            State::Settled(_) => return,
        };
        if callbacks.borrow().is_empty() {
            return;
        }

        let progress = progress.into();
        let ctx = Rc::clone(&self.shared.ctx);
        self.shared.ctx.schedule(move || {
            let progressbacks: Vec<_> = callbacks
                .borrow()
                .iter()
                .filter_map(|triple| triple.progress().cloned())
                .collect();
            for progressback in progressbacks {
                if let Err(error) = progressback(progress.clone()) {
                    ctx.report(&error);
                }
            }
        });
    }

    /// Settle from a handler's outcome. A thrown failure both rejects and is
    /// forwarded to the diagnostic sink.
    pub(crate) fn settle(&self, outcome: Outcome) {
        match outcome {
            Ok(value) => self.resolve(value),
            Err(error) => {
                self.reject(error.clone());
                self.shared.ctx.report(&error);
            }
        }
    }

    pub(crate) fn ctx(&self) -> &ContextRef {
        &self.shared.ctx
    }
}

impl Promise {
    /// Register a full callback triple. Returns the promise for the handlers'
    /// result.
    ///
    /// Returned values are adopted: a handler returning a thenable makes the
    /// result follow that thenable. A handler returning `Err` rejects the
    /// result and reports the failure. Progress handler failures are only
    /// reported.
    pub fn then_with(&self, handlers: Handlers) -> Promise {
        let result = Deferred::new(Rc::clone(&self.shared.ctx));
        let (on_fulfill, on_reject, on_progress) = handlers.into_parts();

        let wrapped = Handlers::new()
            .with_fulfill({
                let result = result.clone();
                move |value| {
                    result.settle(match on_fulfill {
                        Some(on_fulfill) => on_fulfill(value),
                        None => Ok(value),
                    });
                    Ok(Value::Undefined)
                }
            })
            .with_reject({
                let result = result.clone();
                move |reason| {
                    match on_reject {
                        Some(on_reject) => result.settle(on_reject(reason)),
                        None => result.reject(reason),
                    }
                    Ok(Value::Undefined)
                }
            })
            .with_progress({
                let result = result.clone();
                move |progress| {
                    let outcome = match &on_progress {
                        Some(on_progress) => on_progress(progress),
                        None => Ok(progress),
                    };
                    match outcome {
                        Ok(progress) => result.notify(progress),
                        Err(error) => result.ctx().report(&error),
                    }
                    Ok(Value::Undefined)
                }
            });

        self.subscribe(wrapped);
        result.promise()
    }

    pub fn then(&self, on_fulfill: impl FnOnce(Value) -> Outcome + 'static) -> Promise {
        self.then_with(Handlers::new().with_fulfill(on_fulfill))
    }

    pub fn catch(&self, on_reject: impl FnOnce(Value) -> Outcome + 'static) -> Promise {
        self.then_with(Handlers::new().with_reject(on_reject))
    }

    pub fn progress(&self, on_progress: impl Fn(Value) -> Outcome + 'static) -> Promise {
        self.then_with(Handlers::new().with_progress(on_progress))
    }

    /// Run `on_settled` whatever the outcome, then pass the original outcome
    /// through.
    ///
    /// If `on_settled` returns a thenable, the original outcome waits for it.
    /// A failure from `on_settled` (thrown or from the returned thenable)
    /// replaces the original outcome with a rejection.
    pub fn finally(&self, on_settled: impl FnOnce() -> Outcome + 'static) -> Promise {
        let ctx = Rc::clone(&self.shared.ctx);
        let on_settled: Rc<RefCell<Option<Box<dyn FnOnce() -> Outcome>>>> =
            Rc::new(RefCell::new(Some(Box::new(on_settled))));

        self.then_with(
            Handlers::new()
                .with_fulfill({
                    let ctx = Rc::clone(&ctx);
                    let on_settled = Rc::clone(&on_settled);
                    move |value| Ok(run_finally(&ctx, &on_settled, Ok(value)))
                })
                .with_reject(move |reason| Ok(run_finally(&ctx, &on_settled, Err(reason)))),
        )
    }

    /// Record the eventual outcome for synchronous inspection.
    #[must_use]
    pub fn capture(&self) -> Settlement {
        let settlement = Settlement::default();
        let on_fulfill = settlement.clone();
        let on_reject = settlement.clone();
        self.subscribe(
            Handlers::new()
                .with_fulfill(move |value| {
                    on_fulfill.record(Ok(value));
                    Ok(Value::Undefined)
                })
                .with_reject(move |reason| {
                    on_reject.record(Err(reason));
                    Ok(Value::Undefined)
                }),
        );
        settlement
    }

    /// Queue a triple while pending, or forward it to the outcome once
    /// settled.
    fn subscribe(&self, handlers: Handlers) {
        let adopted = {
            let state = self.shared.state.borrow();
            match &*state {
                State::Pending(list) => {
                    list.borrow_mut().push(handlers);
                    return;
                }
                State::Settled(adopted) => Rc::clone(adopted),
            }
        };
        adopted.then_with(handlers);
    }
}

/// Run a `finally` callback and build the value the finally-promise adopts.
fn run_finally(
    ctx: &ContextRef,
    on_settled: &RefCell<Option<Box<dyn FnOnce() -> Outcome>>>,
    original: Outcome,
) -> Value {
    let callback = on_settled.borrow_mut().take();
    let output = match callback {
        Some(callback) => callback(),
        None => Ok(Value::Undefined),
    };

    match output {
        Err(error) => {
            ctx.report(&error);
            rejected(ctx, error)
        }
        Ok(Value::Thenable(wait_for)) => {
            let reject_ctx = Rc::clone(ctx);
            let pass_ctx = Rc::clone(ctx);
            let waited = wait_for.then_with(
                Handlers::new()
                    .with_fulfill(move |_| Ok(replay(&pass_ctx, original)))
                    .with_reject(move |error| Ok(rejected(&reject_ctx, error))),
            );
            Value::Thenable(waited)
        }
        Ok(_) => replay(ctx, original),
    }
}

fn replay(ctx: &ContextRef, original: Outcome) -> Value {
    match original {
        Ok(value) => value,
        Err(reason) => rejected(ctx, reason),
    }
}

impl Thenable for Promise {
    fn then_with(&self, handlers: Handlers) -> ThenableRef {
        Rc::new(Promise::then_with(self, handlers))
    }
}

impl From<Promise> for Value {
    fn from(promise: Promise) -> Self {
        Value::thenable(promise)
    }
}

impl PartialEq for Promise {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.shared, &other.shared)
    }
}

impl fmt::Debug for Shared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &*self.state.borrow() {
            State::Pending(list) => write!(f, "Pending({} registered)", list.borrow().len()),
            State::Settled(_) => f.write_str("Settled"),
        }
    }
}

impl fmt::Debug for Deferred {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Deferred").field(&self.shared).finish()
    }
}

impl fmt::Debug for Promise {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Promise").field(&self.shared).finish()
    }
}
