//! Worker pool backing the fan-out engine.
//!
//! - [`manager`] - spawns and joins the workers (`WorkerPool`).
//! - [`worker`] - the per-worker pull/resolve/publish loop.

pub mod manager;
pub mod worker;
