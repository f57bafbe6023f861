//! Experiment runner around the `spin_sim` engine: TOML configs, built-in
//! protocols and the files written after a run.

pub mod args;
pub mod config;
pub mod logging;
pub mod protocol;
pub mod run;
