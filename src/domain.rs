// Jenkins remote access API: https://www.jenkins.io/doc/book/using/remote-access-api/
use chrono::{DateTime, Duration, Utc};
use compact_str::CompactString;
use serde::Deserialize;

use crate::id::{BuildNumber, QueueItemId};

/// Console logs of finished builds end with this marker followed by the result.
pub const FINISHED_MARKER: &str = "Finished: ";

/// A job as listed in the server's root `jobs` array.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct JobReference {
    pub name: CompactString,
    #[serde(default)]
    pub url: CompactString,
    /// Status ball color; absent for folders and other non-buildable items.
    #[serde(default)]
    pub color: Option<CompactString>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct BuildSummary {
    pub number: BuildNumber,
    #[serde(default)]
    pub url: CompactString,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobDetails {
    pub name: CompactString,
    #[serde(default)]
    pub display_name: Option<CompactString>,
    #[serde(default)]
    pub description: Option<CompactString>,
    #[serde(default)]
    pub url: CompactString,
    #[serde(default)]
    pub buildable: bool,
    #[serde(default)]
    pub in_queue: bool,
    #[serde(default)]
    pub color: Option<CompactString>,
    #[serde(default)]
    pub next_build_number: Option<BuildNumber>,
    #[serde(default)]
    pub builds: Vec<BuildSummary>,
    #[serde(default)]
    pub last_build: Option<BuildSummary>,
    #[serde(default)]
    pub last_completed_build: Option<BuildSummary>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BuildResult {
    Success,
    Unstable,
    Failure,
    NotBuilt,
    Aborted,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildDetail {
    pub number: BuildNumber,
    /// `None` while the build is still running.
    #[serde(default)]
    pub result: Option<BuildResult>,
    #[serde(default)]
    pub building: bool,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "duration", default)]
    pub duration_ms: u64,
    /// Negative when the server has no history to estimate from.
    #[serde(rename = "estimatedDuration", default)]
    pub estimated_duration_ms: i64,
    #[serde(default)]
    pub display_name: Option<CompactString>,
    #[serde(default)]
    pub full_display_name: Option<CompactString>,
    #[serde(default)]
    pub description: Option<CompactString>,
    #[serde(default)]
    pub url: CompactString,
}

/// Server-wide summary from the root `api/json` document.
#[derive(Debug, Clone, Default)]
pub struct ServerInfo {
    pub mode: Option<CompactString>,
    pub node_description: Option<CompactString>,
    pub num_executors: u32,
    pub use_security: bool,
    pub description: Option<CompactString>,
    pub jobs: Vec<JobReference>,
    /// Taken from the `X-Jenkins` response header.
    pub version: Option<CompactString>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerInfoDto {
    #[serde(default)]
    pub mode: Option<CompactString>,
    #[serde(default)]
    pub node_description: Option<CompactString>,
    #[serde(default)]
    pub num_executors: u32,
    #[serde(default)]
    pub use_security: bool,
    #[serde(default)]
    pub description: Option<CompactString>,
    #[serde(default)]
    pub jobs: Vec<JobReference>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobListDto {
    #[serde(default)]
    pub jobs: Vec<JobReference>,
}

/// Crumb issued by the server's CSRF protection.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrumbDto {
    pub crumb: CompactString,
    pub crumb_request_field: CompactString,
}

/// One slice of a console log fetched through the progressive text endpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogChunk {
    pub text: String,
    /// Offset to request the next slice from.
    pub next_offset: u64,
    /// `true` while the build is still producing output.
    pub has_more: bool,
}

/// Outcome of a build trigger.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildTrigger {
    pub queue_item: Option<QueueItemId>,
}

/// A build waiting in (or just leaving) the server queue.
///
/// `executable` appears once an executor picked the item up and names the
/// build it became.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub id: QueueItemId,
    #[serde(default)]
    pub cancelled: bool,
    #[serde(default)]
    pub why: Option<CompactString>,
    #[serde(default)]
    pub executable: Option<BuildSummary>,
}

impl QueueItem {
    /// Number of the build this item turned into, once it has started
    pub fn build_number(&self) -> Option<BuildNumber> {
        self.executable.as_ref().map(|b| b.number)
    }
}

/// Per-name outcome of a best-effort batch delete.
#[derive(Debug, Default)]
pub struct BatchDeleteReport {
    pub outcomes: Vec<(CompactString, crate::client::Result<()>)>,
}

impl JobReference {
    pub fn is_building(&self) -> bool {
        self.color.as_ref().is_some_and(|c| c.ends_with("_anime"))
    }

    pub fn is_disabled(&self) -> bool {
        self.color.as_deref() == Some("disabled")
    }
}

impl JobDetails {
    pub fn build_count(&self) -> usize {
        self.builds.len()
    }

    pub fn is_building(&self) -> bool {
        self.color.as_ref().is_some_and(|c| c.ends_with("_anime"))
    }
}

impl BuildResult {
    /// Result reported by the completion marker of a finished console log.
    pub fn from_log(log: &str) -> Option<BuildResult> {
        let line = log.lines().rev().find(|l| l.starts_with(FINISHED_MARKER))?;
        match line[FINISHED_MARKER.len()..].trim() {
            "SUCCESS" => Some(BuildResult::Success),
            "UNSTABLE" => Some(BuildResult::Unstable),
            "FAILURE" => Some(BuildResult::Failure),
            "NOT_BUILT" => Some(BuildResult::NotBuilt),
            "ABORTED" => Some(BuildResult::Aborted),
            _ => Some(BuildResult::Unknown),
        }
    }
}

impl std::fmt::Display for BuildResult {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let s = match self {
            BuildResult::Success => "SUCCESS",
            BuildResult::Unstable => "UNSTABLE",
            BuildResult::Failure => "FAILURE",
            BuildResult::NotBuilt => "NOT_BUILT",
            BuildResult::Aborted => "ABORTED",
            BuildResult::Unknown => "UNKNOWN",
        };
        f.write_str(s)
    }
}

impl BuildDetail {
    pub fn duration(&self) -> Duration {
        if self.building {
            Utc::now().signed_duration_since(self.timestamp)
        } else {
            Duration::milliseconds(self.duration_ms as i64)
        }
    }

    pub fn is_finished(&self) -> bool {
        !self.building && self.result.is_some()
    }
}

impl ServerInfo {
    pub fn job_count(&self) -> usize {
        self.jobs.len()
    }
}

impl ServerInfoDto {
    pub fn into_server_info(self, version: Option<CompactString>) -> ServerInfo {
        ServerInfo {
            mode: self.mode,
            node_description: self.node_description,
            num_executors: self.num_executors,
            use_security: self.use_security,
            description: self.description,
            jobs: self.jobs,
            version,
        }
    }
}

impl BatchDeleteReport {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|(_, r)| r.is_ok())
    }

    pub fn deleted(&self) -> impl Iterator<Item = &str> {
        self.outcomes
            .iter()
            .filter(|(_, r)| r.is_ok())
            .map(|(name, _)| name.as_str())
    }

    pub fn failed(&self) -> impl Iterator<Item = (&str, &crate::client::ClientError)> {
        self.outcomes
            .iter()
            .filter_map(|(name, r)| r.as_ref().err().map(|e| (name.as_str(), e)))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_build_detail_in_progress() {
        let detail: BuildDetail = serde_json::from_value(json!({
            "number": 3,
            "result": null,
            "building": true,
            "timestamp": 1672531200000_i64,
            "duration": 0,
            "estimatedDuration": -1,
            "url": "http://ci.example.com/job/hello/3/"
        }))
        .unwrap();

        assert_eq!(detail.number, BuildNumber::new(3));
        assert_eq!(detail.result, None);
        assert!(!detail.is_finished());
        assert_eq!(detail.timestamp.to_rfc3339(), "2023-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_queue_item_waiting_then_started() {
        let waiting: QueueItem = serde_json::from_value(json!({
            "_class": "hudson.model.Queue$WaitingItem",
            "id": 42,
            "blocked": false,
            "why": "In the quiet period. Expires in 4.9 sec",
            "executable": null
        }))
        .unwrap();
        assert_eq!(waiting.id, QueueItemId::new(42));
        assert_eq!(waiting.build_number(), None);
        assert!(!waiting.cancelled);

        let started: QueueItem = serde_json::from_value(json!({
            "_class": "hudson.model.Queue$LeftItem",
            "id": 42,
            "cancelled": false,
            "executable": { "number": 8, "url": "http://ci.example.com/job/hello/8/" }
        }))
        .unwrap();
        assert_eq!(started.build_number(), Some(BuildNumber::new(8)));
    }

    #[test]
    fn test_build_result_unknown_value() {
        let result: BuildResult = serde_json::from_value(json!("PLUGIN_STATE")).unwrap();
        assert_eq!(result, BuildResult::Unknown);
    }

    #[test]
    fn test_build_result_from_log() {
        let log = "Started by user admin\n+ echo hello\nhello\nFinished: SUCCESS\n";
        assert_eq!(BuildResult::from_log(log), Some(BuildResult::Success));
        assert_eq!(BuildResult::from_log("Started by user admin\n"), None);
        assert_eq!(BuildResult::from_log("Finished: ABORTED"), Some(BuildResult::Aborted));
    }

    #[test]
    fn test_job_reference_color() {
        let job: JobReference = serde_json::from_value(json!({
            "name": "hello",
            "url": "http://ci.example.com/job/hello/",
            "color": "blue_anime"
        }))
        .unwrap();
        assert!(job.is_building());
        assert!(!job.is_disabled());

        let folder: JobReference = serde_json::from_value(json!({ "name": "folder" })).unwrap();
        assert!(!folder.is_building());
        assert_eq!(folder.color, None);
    }
}
