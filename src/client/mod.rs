//! Jenkins client modules
//!
//! An async client for the job and build endpoints of the Jenkins REST API,
//! plus a watcher for callers that need to wait on builds.

pub mod api;
pub mod config;
pub mod error;
pub mod watcher;

#[cfg(test)]
mod tests;

// Re-export main types for convenience
pub use api::JobsClient;
pub use config::ClientConfig;
pub use error::{ClientError, Result};
pub use watcher::BuildWatcher;
