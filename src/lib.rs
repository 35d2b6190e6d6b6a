//! Release e2e - end-to-end testing harness for framework releases
//!
//! This library resolves CircleCI build artifacts for a branch and drives
//! test apps through platform build tools.

pub mod bundler;
pub mod circleci;
pub mod cli;
pub mod commands;
pub mod common;
pub mod device;
pub mod e2e;
pub mod exec;

// Re-export commonly used types for tests
pub use circleci::{ArtifactResolver, CiTransport, CircleCiClient, JsEngine};
pub use common::{Error, Result};
