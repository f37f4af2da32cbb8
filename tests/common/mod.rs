//! Common test utilities for t212-export integration tests

#[allow(dead_code)]
pub mod config;
#[allow(dead_code)]
pub mod upstream;

pub use config::*;
#[allow(unused_imports)]
pub use upstream::*;
