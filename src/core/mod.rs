//! Core runtime plumbing: configuration, errors and logging

pub mod config;
pub mod error;
pub mod logging;

pub use config::RuntimeConfig;
pub use error::Error;
