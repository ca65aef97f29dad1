//! `when` and `all`.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::rc::Rc;

use pledge_types::{Callback, Collection, Handlers, Progressback, Value};

use crate::adapters::{adopt, rejected};
use crate::deferred::{Deferred, Promise};
use crate::scheduler::ContextRef;

/// Adopt `value` one tick from now and apply the optional transforms.
///
/// The first terminal signal from the adopted thenable wins; later ones are
/// dropped. Progress is not guarded and keeps flowing until the result
/// settles.
pub(crate) fn when(ctx: &ContextRef, value: Value, handlers: Handlers) -> Promise {
    let result = Deferred::new(Rc::clone(ctx));
    let done = Rc::new(Cell::new(false));
    let (on_fulfill, on_reject, on_progress) = handlers.into_parts();
    // Either path may end up running the reject transform.
    let on_reject: Rc<RefCell<Option<Callback>>> = Rc::new(RefCell::new(on_reject));

    let task_ctx = Rc::clone(ctx);
    let task_result = result.clone();
    ctx.schedule(move || {
        let ctx = task_ctx;
        let result = task_result;
        let adopted = adopt(&ctx, value);

        let observe = Handlers::new()
            .with_fulfill({
                let ctx = Rc::clone(&ctx);
                let result = result.clone();
                let done = Rc::clone(&done);
                let on_reject = Rc::clone(&on_reject);
                let on_progress = on_progress.clone();
                move |value| {
                    if done.replace(true) {
                        return Ok(Value::Undefined);
                    }
                    let transform_ctx = Rc::clone(&ctx);
                    let reject_ctx = Rc::clone(&ctx);
                    let progress_ctx = Rc::clone(&ctx);
                    let progress_result = result.clone();
                    let transformed = adopt(&ctx, value).then_with(
                        Handlers::new()
                            .with_fulfill(move |value| {
                                Ok(transform_fulfilled(&transform_ctx, on_fulfill, value))
                            })
                            .with_reject(move |reason| {
                                let on_reject = on_reject.borrow_mut().take();
                                Ok(transform_rejected(&reject_ctx, on_reject, reason))
                            })
                            .with_progress(move |progress| {
                                if let Some(progress) =
                                    transform_progress(&progress_ctx, on_progress.as_ref(), progress)
                                {
                                    progress_result.notify(progress);
                                }
                                Ok(Value::Undefined)
                            }),
                    );
                    result.resolve(Value::Thenable(transformed));
                    Ok(Value::Undefined)
                }
            })
            .with_reject({
                let ctx = Rc::clone(&ctx);
                let result = result.clone();
                let done = Rc::clone(&done);
                move |reason| {
                    if done.replace(true) {
                        return Ok(Value::Undefined);
                    }
                    let on_reject = on_reject.borrow_mut().take();
                    result.resolve(transform_rejected(&ctx, on_reject, reason));
                    Ok(Value::Undefined)
                }
            })
            .with_progress(move |progress| {
                if let Some(progress) = transform_progress(&ctx, on_progress.as_ref(), progress) {
                    result.notify(progress);
                }
                Ok(Value::Undefined)
            });

        adopted.then_with(observe);
    });

    result.promise()
}

fn transform_fulfilled(ctx: &ContextRef, on_fulfill: Option<Callback>, value: Value) -> Value {
    let Some(on_fulfill) = on_fulfill else {
        return value;
    };
    match on_fulfill(value) {
        Ok(value) => value,
        Err(error) => {
            ctx.report(&error);
            rejected(ctx, error)
        }
    }
}

fn transform_rejected(ctx: &ContextRef, on_reject: Option<Callback>, reason: Value) -> Value {
    let Some(on_reject) = on_reject else {
        return rejected(ctx, reason);
    };
    match on_reject(reason) {
        Ok(value) => value,
        Err(error) => {
            ctx.report(&error);
            rejected(ctx, error)
        }
    }
}

/// `None` when the progress transform failed; the failure is reported and
/// the notification dropped.
fn transform_progress(
    ctx: &ContextRef,
    on_progress: Option<&Progressback>,
    progress: Value,
) -> Option<Value> {
    let Some(on_progress) = on_progress else {
        return Some(progress);
    };
    match on_progress(progress) {
        Ok(progress) => Some(progress),
        Err(error) => {
            ctx.report(&error);
            None
        }
    }
}

#[derive(Debug, Clone)]
enum Key {
    Index(usize),
    Name(String),
}

/// Fulfillment values recorded so far, in the shape of the input.
enum Results {
    List(Vec<Option<Value>>),
    Map(BTreeMap<String, Value>),
}

impl Results {
    fn is_recorded(&self, key: &Key) -> bool {
        match (self, key) {
            (Self::List(slots), Key::Index(index)) => {
                slots.get(*index).is_some_and(Option::is_some)
            }
            (Self::Map(entries), Key::Name(name)) => entries.contains_key(name),
            _ => false,
        }
    }

    fn record(&mut self, key: Key, value: Value) {
        match (self, key) {
            (Self::List(slots), Key::Index(index)) => {
                if let Some(slot) = slots.get_mut(index) {
                    *slot = Some(value);
                }
            }
            (Self::Map(entries), Key::Name(name)) => {
                entries.insert(name, value);
            }
            _ => {}
        }
    }

    fn snapshot(&self) -> Value {
        match self {
            Self::List(slots) => Value::List(
                slots
                    .iter()
                    .map(|slot| slot.clone().unwrap_or_default())
                    .collect(),
            ),
            Self::Map(entries) => Value::Map(entries.clone()),
        }
    }
}

/// Join every entry of `promises` into one promise of the same shape.
///
/// Rejects with the first rejection observed; anything arriving after the
/// join has settled is ignored.
pub(crate) fn all(ctx: &ContextRef, promises: Collection) -> Promise {
    let deferred = Deferred::new(Rc::clone(ctx));

    let (results, entries): (Results, Vec<(Key, Value)>) = match promises {
        Collection::List(items) => (
            Results::List(vec![None; items.len()]),
            items
                .into_iter()
                .enumerate()
                .map(|(index, item)| (Key::Index(index), item))
                .collect(),
        ),
        Collection::Map(items) => (
            Results::Map(BTreeMap::new()),
            items
                .into_iter()
                .map(|(name, item)| (Key::Name(name), item))
                .collect(),
        ),
    };

    if entries.is_empty() {
        deferred.resolve(results.snapshot());
        return deferred.promise();
    }

    let results = Rc::new(RefCell::new(results));
    let remaining = Rc::new(Cell::new(entries.len()));

    for (key, item) in entries {
        let reject_key = key.clone();
        let fulfill_results = Rc::clone(&results);
        let reject_results = Rc::clone(&results);
        let fulfill_deferred = deferred.clone();
        let reject_deferred = deferred.clone();
        let remaining = Rc::clone(&remaining);

        adopt(ctx, item).then_with(
            Handlers::new()
                .with_fulfill(move |value| {
                    let joined = {
                        let mut results = fulfill_results.borrow_mut();
                        if results.is_recorded(&key) {
                            return Ok(Value::Undefined);
                        }
                        results.record(key, value);
                        remaining.set(remaining.get() - 1);
                        (remaining.get() == 0).then(|| results.snapshot())
                    };
                    if let Some(joined) = joined {
                        fulfill_deferred.resolve(joined);
                    }
                    Ok(Value::Undefined)
                })
                .with_reject(move |reason| {
                    if !reject_results.borrow().is_recorded(&reject_key) {
                        reject_deferred.reject(reason);
                    }
                    Ok(Value::Undefined)
                }),
        );
    }

    deferred.promise()
}
