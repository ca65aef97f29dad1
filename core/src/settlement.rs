//! Synchronous inspection of a promise's eventual outcome.

use std::cell::RefCell;
use std::rc::Rc;

use pledge_types::{Outcome, Value};

/// Filled in once the observed promise settles. Clones share the record.
#[derive(Debug, Clone, Default)]
pub struct Settlement {
    outcome: Rc<RefCell<Option<Outcome>>>,
}

impl Settlement {
    pub(crate) fn record(&self, outcome: Outcome) {
        let mut slot = self.outcome.borrow_mut();
        if slot.is_none() {
            *slot = Some(outcome);
        }
    }

    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.outcome.borrow().is_some()
    }

    /// `None` while pending.
    #[must_use]
    pub fn outcome(&self) -> Option<Outcome> {
        self.outcome.borrow().clone()
    }

    #[must_use]
    pub fn value(&self) -> Option<Value> {
        self.outcome().and_then(Result::ok)
    }

    #[must_use]
    pub fn reason(&self) -> Option<Value> {
        self.outcome().and_then(Result::err)
    }
}
