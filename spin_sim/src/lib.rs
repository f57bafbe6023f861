//! Bloch simulation of an isochromat ensemble driven by a discrete event sequence.
//!
//! A [`TissueMap`] initializes a [`SpinSystem`], an [`EventSequence`] configures a
//! [`Scanner`], and [`Scanner::forward`] produces the complex [`Signal`].

pub mod context;
pub mod error;
pub mod matmath;
pub mod process;
pub mod scanner;
pub mod sequence;
pub mod signal;
pub mod spin;
pub mod spin_operators;
pub mod tissue;
pub mod unit;

pub use context::{ExecutionContext, Precision};
pub use error::{Result, SimError};
pub use process::{CoilCombine, GaussianNoise, SignalProcessor};
pub use scanner::{RepetitionReset, Scanner, ScannerConfig};
pub use sequence::{EventSequence, KspaceAccumulation, SequenceClass};
pub use signal::Signal;
pub use spin::{FrequencyDistribution, SpinSystem};
pub use tissue::{TissueMap, TissueVoxel};
