//! Diagnostic sinks for handler failures.

use std::cell::RefCell;
use std::rc::Rc;

use pledge_types::Value;

use crate::DiagnosticSink;

/// Longest rendering of a reported value written to a log line.
const REPORT_PREVIEW_CHARS: usize = 200;

/// Logs every reported failure through `tracing` at a fixed level.
#[derive(Debug, Clone, Copy)]
pub struct TracingSink {
    level: tracing::Level,
}

impl TracingSink {
    #[must_use]
    pub const fn new(level: tracing::Level) -> Self {
        Self { level }
    }

    #[must_use]
    pub const fn level(&self) -> tracing::Level {
        self.level
    }
}

impl Default for TracingSink {
    fn default() -> Self {
        Self::new(tracing::Level::WARN)
    }
}

impl DiagnosticSink for TracingSink {
    fn report(&self, error: &Value) {
        let error = error.preview(REPORT_PREVIEW_CHARS);
        // tracing needs the level at compile time
        match self.level {
            tracing::Level::ERROR => tracing::error!(%error, "promise handler failed"),
            tracing::Level::WARN => tracing::warn!(%error, "promise handler failed"),
            tracing::Level::INFO => tracing::info!(%error, "promise handler failed"),
            tracing::Level::DEBUG => tracing::debug!(%error, "promise handler failed"),
            _ => tracing::trace!(%error, "promise handler failed"),
        }
    }
}

/// Keeps every reported failure, in report order.
///
/// Clones share the same record, so one handle can go to the engine while
/// another is inspected.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    reports: Rc<RefCell<Vec<Value>>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn reports(&self) -> Vec<Value> {
        self.reports.borrow().clone()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.reports.borrow().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.reports.borrow().is_empty()
    }

    /// Take all reports, clearing the record.
    pub fn take(&self) -> Vec<Value> {
        std::mem::take(&mut *self.reports.borrow_mut())
    }
}

impl DiagnosticSink for RecordingSink {
    fn report(&self, error: &Value) {
        self.reports.borrow_mut().push(error.clone());
    }
}
