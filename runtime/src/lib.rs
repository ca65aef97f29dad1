//! Event loop and wiring for running Pledge engines.
//!
//! [`build`] turns a [`PledgeConfig`] into an [`Engine`] whose tasks run on an
//! [`EventLoop`]. Drive the loop with [`EventLoop::run_until_idle`],
//! [`EventLoop::block_on`], or from async code with [`EventLoop::run_until`].

mod event_loop;

use pledge_config::{ConfigError, PledgeConfig};
use pledge_core::{Engine, TracingSink};
use pledge_types::Value;
use thiserror::Error;

pub use event_loop::{EventLoop, LoopHandle};
pub use pledge_config::DEFAULT_TASK_BUDGET;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("task budget of {budget} exhausted before the loop went idle")]
    BudgetExhausted { budget: usize },
    #[error("promise still pending with no work left to run")]
    Stalled,
    #[error("every loop handle was dropped while the promise was pending")]
    Disconnected,
    #[error("promise rejected: {reason}")]
    Rejected { reason: Value },
}

/// Build an engine scheduled on a fresh event loop.
///
/// Handler failures go to `tracing` at the configured level, or nowhere when
/// diagnostics are disabled.
#[must_use]
pub fn build(config: &PledgeConfig) -> (Engine, EventLoop) {
    let (event_loop, handle) = EventLoop::with_budget(config.runtime.task_budget);
    let diagnostics = &config.diagnostics;
    let engine = if diagnostics.enabled {
        tracing::debug!(level = diagnostics.level.as_str(), "Reporting handler failures");
        Engine::new(handle, TracingSink::new(diagnostics.level.as_tracing_level()))
    } else {
        Engine::new(handle, |_: &Value| {})
    };
    (engine, event_loop)
}

/// [`build`] from the config file [`PledgeConfig::load`] finds, falling back to
/// defaults when there is none.
pub fn build_from_env() -> Result<(Engine, EventLoop), ConfigError> {
    let config = PledgeConfig::load()?.unwrap_or_default();
    Ok(build(&config))
}
