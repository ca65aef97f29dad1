//! Unit tests for the deferred/promise state machine.

use std::cell::RefCell;
use std::rc::Rc;

use super::*;

fn engine() -> (Engine, TaskQueue, RecordingSink) {
    let queue = TaskQueue::new();
    let sink = RecordingSink::new();
    (Engine::new(queue.clone(), sink.clone()), queue, sink)
}

/// A shared log plus a handler factory that appends to it.
#[derive(Clone, Default)]
struct Log(Rc<RefCell<Vec<Value>>>);

impl Log {
    fn push(&self, value: Value) {
        self.0.borrow_mut().push(value);
    }

    fn entries(&self) -> Vec<Value> {
        self.0.borrow().clone()
    }

    fn recorder(&self) -> impl FnOnce(Value) -> Outcome + 'static {
        let log = self.clone();
        move |value| {
            log.push(value.clone());
            Ok(value)
        }
    }

    fn progress_recorder(&self) -> impl Fn(Value) -> Outcome + 'static {
        let log = self.clone();
        move |value| {
            log.push(value.clone());
            Ok(value)
        }
    }
}

#[test]
fn resolve_is_idempotent() {
    let (engine, queue, _sink) = engine();
    let deferred = engine.defer();
    let settlement = deferred.promise().capture();

    deferred.resolve(1);
    deferred.resolve(2);
    deferred.reject("late");
    queue.run_until_idle();

    assert!(deferred.is_settled());
    assert_eq!(settlement.outcome(), Some(Ok(Value::from(1))));
}

#[test]
fn reject_then_resolve_keeps_rejection() {
    let (engine, queue, _sink) = engine();
    let deferred = engine.defer();
    let settlement = deferred.promise().capture();

    deferred.reject("first");
    deferred.resolve("second");
    queue.run_until_idle();

    assert_eq!(settlement.reason(), Some(Value::from("first")));
}

#[test]
fn handlers_registered_before_resolution_run_later() {
    let (engine, queue, _sink) = engine();
    let deferred = engine.defer();
    let log = Log::default();

    deferred.promise().then(log.recorder());
    deferred.resolve("v");
    assert!(log.entries().is_empty());

    queue.run_until_idle();
    assert_eq!(log.entries(), vec![Value::from("v")]);
}

#[test]
fn handlers_registered_after_resolution_run_later() {
    let (engine, queue, _sink) = engine();
    let deferred = engine.defer();
    deferred.resolve("v");
    queue.run_until_idle();

    let log = Log::default();
    deferred.promise().then(log.recorder());
    assert!(log.entries().is_empty());

    queue.run_until_idle();
    assert_eq!(log.entries(), vec![Value::from("v")]);
}

#[test]
fn delivery_follows_registration_order() {
    let (engine, queue, _sink) = engine();
    let deferred = engine.defer();
    let promise = deferred.promise();
    let log = Log::default();

    for tag in ["a", "b", "c"] {
        let log = log.clone();
        promise.then(move |_| {
            log.push(Value::from(tag));
            Ok(Value::Undefined)
        });
    }
    deferred.resolve(());
    queue.run_until_idle();

    assert_eq!(
        log.entries(),
        vec![Value::from("a"), Value::from("b"), Value::from("c")]
    );
}

#[test]
fn resolution_with_no_handlers_schedules_nothing() {
    let (engine, queue, _sink) = engine();
    let deferred = engine.defer();
    deferred.resolve(3);
    assert!(queue.is_empty());
}

#[test]
fn thrown_failure_reaches_next_reject_handler_and_sink() {
    let (engine, queue, sink) = engine();
    let deferred = engine.defer();
    let fulfilled = Log::default();
    let rejected = Log::default();

    deferred
        .promise()
        .then(|_| Err(Value::from("bad")))
        .then_with(
            Handlers::new()
                .with_fulfill(fulfilled.recorder())
                .with_reject(rejected.recorder()),
        );
    deferred.resolve(0);
    queue.run_until_idle();

    assert!(fulfilled.entries().is_empty());
    assert_eq!(rejected.entries(), vec![Value::from("bad")]);
    assert_eq!(sink.reports(), vec![Value::from("bad")]);
}

#[test]
fn rejection_passes_through_links_without_reject_handlers() {
    let (engine, queue, sink) = engine();
    let deferred = engine.defer();
    let skipped = Log::default();

    let settlement = deferred
        .promise()
        .then(skipped.recorder())
        .then(skipped.recorder())
        .capture();
    deferred.reject("x");
    queue.run_until_idle();

    assert!(skipped.entries().is_empty());
    assert_eq!(settlement.reason(), Some(Value::from("x")));
    assert!(sink.is_empty());
}

#[test]
fn returned_thenable_is_adopted() {
    let (engine, queue, _sink) = engine();
    let outer = engine.defer();
    let inner = engine.defer();

    let settlement = {
        let inner = inner.clone();
        outer
            .promise()
            .then(move |_| Ok(Value::from(inner.promise())))
            .capture()
    };
    outer.resolve(1);
    queue.run_until_idle();
    assert!(!settlement.is_settled());

    inner.resolve("inner");
    queue.run_until_idle();
    assert_eq!(settlement.value(), Some(Value::from("inner")));
}

#[test]
fn resolving_with_rejected_promise_rejects() {
    let (engine, queue, _sink) = engine();
    let deferred = engine.defer();
    let settlement = deferred.promise().capture();

    deferred.resolve(engine.reject("nope"));
    queue.run_until_idle();

    assert_eq!(settlement.reason(), Some(Value::from("nope")));
}

#[test]
fn registering_inside_a_handler_does_not_reenter() {
    let (engine, queue, _sink) = engine();
    let deferred = engine.defer();
    let promise = deferred.promise();
    let log = Log::default();

    {
        let promise = promise.clone();
        let log = log.clone();
        promise.clone().then(move |value| {
            promise.then(log.recorder());
            Ok(value)
        });
    }
    deferred.resolve("again");
    queue.run_until_idle();

    assert_eq!(log.entries(), vec![Value::from("again")]);
}

#[test]
fn notify_reaches_progress_handlers_and_propagates() {
    let (engine, queue, _sink) = engine();
    let deferred = engine.defer();
    let direct = Log::default();
    let chained = Log::default();

    deferred.promise().progress(direct.progress_recorder());
    deferred
        .promise()
        .then(Ok)
        .progress(chained.progress_recorder());

    deferred.notify(10);
    deferred.notify(20);
    queue.run_until_idle();

    assert_eq!(direct.entries(), vec![Value::from(10), Value::from(20)]);
    assert_eq!(chained.entries(), vec![Value::from(10), Value::from(20)]);
}

#[test]
fn progress_transform_feeds_the_next_link() {
    let (engine, queue, _sink) = engine();
    let deferred = engine.defer();
    let log = Log::default();

    deferred
        .promise()
        .progress(|value| Ok(Value::from(value.as_f64()? * 2.0)))
        .progress(log.progress_recorder());
    deferred.notify(21);
    queue.run_until_idle();

    assert_eq!(log.entries(), vec![Value::from(42)]);
}

#[test]
fn notify_reaches_handlers_registered_before_its_task_runs() {
    let (engine, queue, _sink) = engine();
    let deferred = engine.defer();
    let early = Log::default();
    let late = Log::default();

    deferred.promise().progress(early.progress_recorder());
    deferred.notify("tick");
    deferred.promise().progress(late.progress_recorder());
    queue.run_until_idle();

    assert_eq!(early.entries(), vec![Value::from("tick")]);
    assert_eq!(late.entries(), vec![Value::from("tick")]);
}

#[test]
fn notify_without_handlers_is_dropped() {
    let (engine, queue, _sink) = engine();
    let deferred = engine.defer();
    let log = Log::default();

    deferred.notify("lost");
    deferred.promise().progress(log.progress_recorder());
    queue.run_until_idle();

    assert!(log.entries().is_empty());
}

#[test]
fn notify_after_settlement_is_ignored() {
    let (engine, queue, _sink) = engine();
    let deferred = engine.defer();
    let log = Log::default();

    deferred.promise().progress(log.progress_recorder());
    deferred.resolve(0);
    deferred.notify(1);
    queue.run_until_idle();

    assert!(log.entries().is_empty());
}

#[test]
fn notify_before_resolution_in_same_turn_still_delivers() {
    let (engine, queue, _sink) = engine();
    let deferred = engine.defer();
    let log = Log::default();

    let settlement = deferred.promise().progress(log.progress_recorder()).capture();
    deferred.notify("half");
    deferred.resolve("done");
    queue.run_until_idle();

    assert_eq!(log.entries(), vec![Value::from("half")]);
    assert_eq!(settlement.value(), Some(Value::from("done")));
}

#[test]
fn progress_failure_is_reported_but_never_rejects() {
    let (engine, queue, sink) = engine();
    let deferred = engine.defer();

    let settlement = deferred
        .promise()
        .progress(|_| Err(Value::from("progress broke")))
        .capture();
    deferred.notify(1);
    queue.run_until_idle();
    assert_eq!(sink.reports(), vec![Value::from("progress broke")]);
    assert!(!settlement.is_settled());

    deferred.resolve(3);
    queue.run_until_idle();
    assert_eq!(settlement.value(), Some(Value::from(3)));
}

#[test]
fn catch_recovers_from_rejection() {
    let (engine, queue, _sink) = engine();
    let deferred = engine.defer();
    let settlement = deferred
        .promise()
        .catch(|reason| Ok(Value::from(format!("caught {reason}"))))
        .capture();

    deferred.reject("oops");
    queue.run_until_idle();

    assert_eq!(settlement.value(), Some(Value::from("caught oops")));
}

#[test]
fn catch_passes_fulfillment_through() {
    let (engine, queue, _sink) = engine();
    let deferred = engine.defer();
    let settlement = deferred
        .promise()
        .catch(|_| Ok(Value::from("unused")))
        .capture();

    deferred.resolve(7);
    queue.run_until_idle();

    assert_eq!(settlement.value(), Some(Value::from(7)));
}

#[test]
fn finally_keeps_fulfillment() {
    let (engine, queue, sink) = engine();
    let deferred = engine.defer();
    let ran = Log::default();
    let settlement = {
        let ran = ran.clone();
        deferred
            .promise()
            .finally(move || {
                ran.push(Value::from("ran"));
                Ok(Value::Undefined)
            })
            .capture()
    };

    deferred.resolve("A");
    queue.run_until_idle();

    assert_eq!(ran.entries(), vec![Value::from("ran")]);
    assert_eq!(settlement.value(), Some(Value::from("A")));
    assert!(sink.is_empty());
}

#[test]
fn finally_keeps_rejection_when_callback_succeeds() {
    let (engine, queue, _sink) = engine();
    let deferred = engine.defer();
    let settlement = deferred
        .promise()
        .finally(|| Ok(Value::from("ignored")))
        .capture();

    deferred.reject("E");
    queue.run_until_idle();

    assert_eq!(settlement.reason(), Some(Value::from("E")));
}

#[test]
fn finally_failure_replaces_rejection() {
    let (engine, queue, sink) = engine();
    let deferred = engine.defer();
    let settlement = deferred
        .promise()
        .finally(|| Err(Value::from("F")))
        .capture();

    deferred.reject("E");
    queue.run_until_idle();

    assert_eq!(settlement.reason(), Some(Value::from("F")));
    assert_eq!(sink.reports(), vec![Value::from("F")]);
}

#[test]
fn finally_waits_for_returned_thenable() {
    let (engine, queue, _sink) = engine();
    let deferred = engine.defer();
    let gate = engine.defer();
    let settlement = {
        let gate = gate.promise();
        deferred
            .promise()
            .finally(move || Ok(Value::from(gate)))
            .capture()
    };

    deferred.resolve("A");
    queue.run_until_idle();
    assert!(!settlement.is_settled());

    gate.resolve("gate value is discarded");
    queue.run_until_idle();
    assert_eq!(settlement.value(), Some(Value::from("A")));
}

#[test]
fn finally_returned_rejection_takes_precedence() {
    let (engine, queue, _sink) = engine();
    let deferred = engine.defer();
    let cleanup = engine.reject("cleanup failed");
    let settlement = deferred
        .promise()
        .finally(move || Ok(Value::from(cleanup)))
        .capture();

    deferred.resolve("A");
    queue.run_until_idle();

    assert_eq!(settlement.reason(), Some(Value::from("cleanup failed")));
}

#[test]
fn capture_after_settlement_still_records() {
    let (engine, queue, _sink) = engine();
    let deferred = engine.defer();
    deferred.resolve("early");
    queue.run_until_idle();

    let settlement = deferred.promise().capture();
    assert!(!settlement.is_settled());
    queue.run_until_idle();
    assert_eq!(settlement.value(), Some(Value::from("early")));
}

#[test]
fn promises_compare_by_identity() {
    let (engine, _queue, _sink) = engine();
    let deferred = engine.defer();
    assert_eq!(deferred.promise(), deferred.promise());
    assert_ne!(deferred.promise(), engine.defer().promise());
    let as_value = Value::from(deferred.promise());
    assert_eq!(as_value, as_value.clone());
}

#[test]
fn debug_shows_phase() {
    let (engine, _queue, _sink) = engine();
    let deferred = engine.defer();
    deferred.promise().then(Ok);
    assert_eq!(format!("{deferred:?}"), "Deferred(Pending(1 registered))");
    deferred.resolve(());
    assert_eq!(format!("{:?}", deferred.promise()), "Promise(Settled)");
}
