//! Core domain types for Pledge.
//!
//! This crate contains the pure types shared by every layer: dynamic values,
//! the `then` capability, and the callback triple. No scheduling, no IO.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory
#![allow(clippy::missing_panics_doc)] // Panics are documented in assertions

mod thenable;
mod value;

pub use thenable::{Callback, Handlers, Outcome, Progressback, Thenable, ThenableRef};
pub use value::{Collection, Value, ValueError};
