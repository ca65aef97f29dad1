//! Deferred/promise settlement engine for Pledge.
//!
//! Everything runs on one logical thread driven by a host [`Scheduler`].
//! An [`Engine`] binds that scheduler and a [`DiagnosticSink`] together and
//! hands out [`Deferred`]s; their [`Promise`]s chain with `then`, `catch`,
//! and `finally`, and combine with [`Engine::when`] and [`Engine::all`].
//!
//! Handlers are plain closures returning [`Outcome`]: `Ok` fulfills the next
//! link, `Err` rejects it and is also forwarded to the sink.

mod adapters;
mod combinators;
mod deferred;
mod diagnostics;
mod engine;
mod queue;
mod scheduler;
mod settlement;

pub use deferred::{Deferred, Promise};
pub use diagnostics::{RecordingSink, TracingSink};
pub use engine::Engine;
pub use queue::TaskQueue;
pub use scheduler::{DiagnosticSink, Scheduler, Task};
pub use settlement::Settlement;

pub use pledge_types::{
    Callback, Collection, Handlers, Outcome, Progressback, Thenable, ThenableRef, Value, ValueError,
};

#[cfg(test)]
mod tests;
