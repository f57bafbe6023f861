//! Signal and trajectory files for the simulator.
//!
//! Signals are stored as BART `cfl`/`hdr` pairs so they can be picked up by
//! reconstruction tools directly. Trajectories and run summaries are JSON.

pub mod cfl;
pub mod error;
pub mod trajectory;

pub use error::{DataError, Result};
