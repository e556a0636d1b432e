//! Shared test infrastructure.

/// Component tree harness with a queue log and tracing setup.
pub mod harness;
