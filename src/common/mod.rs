//! Common utilities shared by the resolver, device control and orchestration

pub mod config;
pub mod error;
pub mod logging;
pub mod paths;

pub use error::{Error, Result};
