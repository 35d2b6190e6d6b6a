//! CircleCI artifact resolution
//!
//! Finds the newest pipeline of a branch, checks that the release dry-run
//! and tests workflows are green, and turns (job, path fragment) pairs into
//! downloadable artifact URLs.

pub mod client;
pub mod resolver;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{CiTransport, CircleCiClient};
pub use resolver::{ArtifactResolver, JsEngine};
