pub mod config;
pub mod memory;
pub mod run_wrapper;
pub mod stats;
pub mod trace;

pub mod error;
