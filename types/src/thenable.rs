//! The `then` capability and the callback triple it consumes.

use std::fmt;
use std::rc::Rc;

use crate::Value;

/// Result of running a handler. `Err` means the handler threw; the payload
/// becomes the rejection reason of the dependent promise.
pub type Outcome = Result<Value, Value>;

/// Fulfillment or rejection handler. Invoked at most once.
pub type Callback = Box<dyn FnOnce(Value) -> Outcome>;

/// Progress handler. Shared because it may run any number of times.
pub type Progressback = Rc<dyn Fn(Value) -> Outcome>;

pub type ThenableRef = Rc<dyn Thenable>;

/// Anything that can register a callback triple and hand back the thenable
/// representing the handlers' eventual result.
///
/// Engine promises, the internal value and rejection boxes, and foreign
/// promise adapters all implement this. Foreign values enter the engine only
/// through [`Value::Thenable`].
pub trait Thenable {
    fn then_with(&self, handlers: Handlers) -> ThenableRef;
}

/// A callback triple `(on_fulfill, on_reject, on_progress)`.
///
/// Absent handlers fall back to the engine defaults: identity for fulfill and
/// progress, re-rejection for reject.
#[derive(Default)]
pub struct Handlers {
    on_fulfill: Option<Callback>,
    on_reject: Option<Callback>,
    on_progress: Option<Progressback>,
}

impl Handlers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fulfill(mut self, on_fulfill: impl FnOnce(Value) -> Outcome + 'static) -> Self {
        self.on_fulfill = Some(Box::new(on_fulfill));
        self
    }

    pub fn with_reject(mut self, on_reject: impl FnOnce(Value) -> Outcome + 'static) -> Self {
        self.on_reject = Some(Box::new(on_reject));
        self
    }

    pub fn with_progress(mut self, on_progress: impl Fn(Value) -> Outcome + 'static) -> Self {
        self.on_progress = Some(Rc::new(on_progress));
        self
    }

    #[must_use]
    pub fn progress(&self) -> Option<&Progressback> {
        self.on_progress.as_ref()
    }

    #[must_use]
    pub fn into_parts(self) -> (Option<Callback>, Option<Callback>, Option<Progressback>) {
        (self.on_fulfill, self.on_reject, self.on_progress)
    }
}

impl fmt::Debug for Handlers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handlers")
            .field("on_fulfill", &self.on_fulfill.is_some())
            .field("on_reject", &self.on_reject.is_some())
            .field("on_progress", &self.on_progress.is_some())
            .finish()
    }
}
