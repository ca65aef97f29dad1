//! One-shot boxes that give plain values and known failures the `then`
//! capability.

use std::rc::Rc;

use pledge_types::{Handlers, Thenable, ThenableRef, Value};

use crate::deferred::Deferred;
use crate::scheduler::ContextRef;

/// Normalize `value` into a thenable.
///
/// Thenables are adopted as-is so long chains do not stack wrapper layers.
pub(crate) fn adopt(ctx: &ContextRef, value: Value) -> ThenableRef {
    match value {
        Value::Thenable(thenable) => thenable,
        value => Rc::new(ValueBox {
            ctx: Rc::clone(ctx),
            value,
        }),
    }
}

/// A value that behaves as a failure with `reason` wherever it is adopted.
pub(crate) fn rejected(ctx: &ContextRef, reason: Value) -> Value {
    Value::Thenable(Rc::new(RejectionBox {
        ctx: Rc::clone(ctx),
        reason,
    }))
}

/// An already-known fulfillment value. Only the fulfill path exists.
struct ValueBox {
    ctx: ContextRef,
    value: Value,
}

impl Thenable for ValueBox {
    fn then_with(&self, handlers: Handlers) -> ThenableRef {
        let result = Deferred::new(Rc::clone(&self.ctx));
        let value = self.value.clone();
        let (on_fulfill, _, _) = handlers.into_parts();

        let settle = result.clone();
        self.ctx.schedule(move || match on_fulfill {
            // Handlers reaching a box are already wrapped and report their own
            // failures.
            Some(on_fulfill) => match on_fulfill(value) {
                Ok(value) => settle.resolve(value),
                Err(reason) => settle.reject(reason),
            },
            None => settle.resolve(value),
        });
        Rc::new(result.promise())
    }
}

/// An already-known failure.
struct RejectionBox {
    ctx: ContextRef,
    reason: Value,
}

impl Thenable for RejectionBox {
    fn then_with(&self, handlers: Handlers) -> ThenableRef {
        let result = Deferred::new(Rc::clone(&self.ctx));
        let reason = self.reason.clone();
        let (_, on_reject, _) = handlers.into_parts();

        let settle = result.clone();
        self.ctx.schedule(move || match on_reject {
            Some(on_reject) => settle.settle(on_reject(reason)),
            None => settle.reject(reason),
        });
        Rc::new(result.promise())
    }
}
