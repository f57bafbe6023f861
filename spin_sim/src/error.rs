//! Simulation errors

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("grid mismatch: expected {expected:?}, found {found:?}")]
    GridMismatch { expected: (usize, usize), found: (usize, usize) },

    #[error("shape mismatch for {name}: expected {expected:?}, found {found:?}")]
    ShapeMismatch { name: &'static str, expected: Vec<usize>, found: Vec<usize> },

    #[error("invalid parameter {name}: {message}")]
    InvalidParameter { name: &'static str, message: String },

    #[error("numerical domain error in voxel {voxel}: {message}")]
    NumericalDomain { voxel: usize, message: String },

    #[error("non-finite signal at event {event}, repetition {repetition}")]
    NonFinite { event: usize, repetition: usize },

    #[error("scanner is not configured: {0}")]
    NotConfigured(&'static str),

    #[error("unknown sequence class: {0}")]
    UnknownSequenceClass(String),

    #[error("failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

impl SimError {
    pub(crate) fn invalid(name: &'static str, message: impl Into<String>) -> Self {
        SimError::InvalidParameter { name, message: message.into() }
    }

    pub(crate) fn shape(name: &'static str, expected: &[usize], found: &[usize]) -> Self {
        SimError::ShapeMismatch { name, expected: expected.to_vec(), found: found.to_vec() }
    }
}
