//! Test utilities and common test fixtures for client modules

use std::time::Duration;

use serde_json::json;

use crate::client::config::{ClientConfig, PollingConfig};


pub const TEST_USER: &str = "admin";
pub const TEST_TOKEN: &str = "test-token";

pub const JOB_XML: &str = "<?xml version='1.1' encoding='UTF-8'?>
<project>
  <description></description>
  <keepDependencies>false</keepDependencies>
  <properties/>
  <scm class=\"hudson.scm.NullSCM\"/>
  <canRoam>true</canRoam>
  <disabled>false</disabled>
  <blockBuildWhenDownstreamBuilding>false</blockBuildWhenDownstreamBuilding>
  <blockBuildWhenUpstreamBuilding>false</blockBuildWhenUpstreamBuilding>
  <triggers/>
  <concurrentBuild>false</concurrentBuild>
  <builders/>
  <publishers/>
  <buildWrappers/>
</project>
";

/// Create JSON representation of a job listing
pub fn job_list_json(names: &[&str]) -> serde_json::Value {
    let jobs: Vec<_> = names
        .iter()
        .map(|name| {
            json!({
                "_class": "hudson.model.FreeStyleProject",
                "name": name,
                "url": format!("http://ci.example.com/job/{name}/"),
                "color": "notbuilt"
            })
        })
        .collect();

    json!({ "_class": "hudson.model.Hudson", "jobs": jobs })
}

/// Create JSON representation of a job with `build_count` builds
pub fn job_details_json(name: &str, build_count: u32) -> serde_json::Value {
    let builds: Vec<_> = (1..=build_count)
        .rev()
        .map(|n| json!({ "number": n, "url": format!("http://ci.example.com/job/{name}/{n}/") }))
        .collect();
    let last_build = builds.first().cloned().unwrap_or(serde_json::Value::Null);

    json!({
        "_class": "hudson.model.FreeStyleProject",
        "name": name,
        "displayName": name,
        "description": "",
        "url": format!("http://ci.example.com/job/{name}/"),
        "buildable": true,
        "inQueue": false,
        "color": "blue",
        "nextBuildNumber": build_count + 1,
        "builds": builds,
        "lastBuild": last_build,
        "lastCompletedBuild": last_build
    })
}

/// Create JSON representation of a build
pub fn build_json(name: &str, number: u32, result: Option<&str>) -> serde_json::Value {
    let duration = if result.is_some() { 1534 } else { 0 };
    json!({
        "_class": "hudson.model.FreeStyleBuild",
        "number": number,
        "result": result,
        "building": result.is_none(),
        "timestamp": 1672531200000_i64,
        "duration": duration,
        "estimatedDuration": 1534,
        "displayName": format!("#{number}"),
        "fullDisplayName": format!("{name} #{number}"),
        "url": format!("http://ci.example.com/job/{name}/{number}/")
    })
}

/// Create JSON representation of the server root document
pub fn server_info_json(names: &[&str]) -> serde_json::Value {
    let mut info = job_list_json(names);
    info["mode"] = json!("NORMAL");
    info["nodeDescription"] = json!("the built-in node");
    info["numExecutors"] = json!(2);
    info["useSecurity"] = json!(true);
    info["description"] = serde_json::Value::Null;
    info
}

/// Create JSON representation of a queue item, started once `build` is set
pub fn queue_item_json(id: u64, build: Option<u32>) -> serde_json::Value {
    match build {
        Some(number) => json!({
            "_class": "hudson.model.Queue$LeftItem",
            "id": id,
            "cancelled": false,
            "executable": {
                "_class": "hudson.model.FreeStyleBuild",
                "number": number,
                "url": format!("http://ci.example.com/job/hello/{number}/")
            }
        }),
        None => json!({
            "_class": "hudson.model.Queue$WaitingItem",
            "id": id,
            "blocked": false,
            "why": "In the quiet period. Expires in 4.9 sec",
            "executable": null
        }),
    }
}

pub fn crumb_json() -> serde_json::Value {
    json!({
        "_class": "hudson.security.csrf.DefaultCrumbIssuer",
        "crumb": "c0ffee",
        "crumbRequestField": "Jenkins-Crumb"
    })
}

pub fn finished_log(lines: &[&str], result: &str) -> String {
    let mut log = String::from("Started by user admin\nRunning as SYSTEM\n");
    for line in lines {
        log.push_str(line);
        log.push('\n');
    }
    log.push_str(&format!("Finished: {result}\n"));
    log
}

/// Polling settings short enough for tests
pub fn test_polling_config() -> PollingConfig {
    PollingConfig {
        build_interval: Duration::from_millis(10),
        wait_timeout: Duration::from_secs(5),
    }
}

/// Mock HTTP server for testing
pub struct MockServer {
    pub server: wiremock::MockServer,
}

impl MockServer {
    /// Start a new mock server
    pub async fn start() -> Self {
        let server = wiremock::MockServer::start().await;
        Self { server }
    }

    /// Get the base URL of the mock server
    pub fn base_url(&self) -> String {
        self.server.uri()
    }

    /// Create a test config pointing to this mock server
    pub fn test_config(&self) -> ClientConfig {
        ClientConfig::new(self.base_url(), TEST_USER, TEST_TOKEN).with_polling(test_polling_config())
    }
}

#[cfg(test)]
#[allow(clippy::module_inception)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_shapes() {
        let listing = job_list_json(&["hello"]);
        assert_eq!(listing["jobs"][0]["name"], "hello");

        let details = job_details_json("hello", 2);
        assert_eq!(details["builds"].as_array().unwrap().len(), 2);
        assert_eq!(details["lastBuild"]["number"], 2);

        let running = build_json("hello", 1, None);
        assert_eq!(running["building"], true);

        assert!(finished_log(&["hello"], "SUCCESS").ends_with("Finished: SUCCESS\n"));
    }
}
