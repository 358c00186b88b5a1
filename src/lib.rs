//! Async client for the job and build endpoints of the Jenkins REST API.
//!
//! ```no_run
//! use jenkins_jobs::client::{ClientConfig, JobsClient};
//!
//! # async fn demo() -> jenkins_jobs::client::Result<()> {
//! let config = ClientConfig::new("https://ci.example.com", "admin", "api-token");
//! let jobs = JobsClient::new(config)?;
//!
//! for job in jobs.list_all().await? {
//!     println!("{}", job.name);
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod config;
pub mod domain;
pub mod id;
pub mod logging;
pub mod result;

pub use client::{BuildWatcher, ClientConfig, ClientError, JobsClient};
pub use domain::{BuildDetail, BuildResult, JobDetails, JobReference, QueueItem, ServerInfo};
pub use id::{BuildNumber, QueueItemId};
