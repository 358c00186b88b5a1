//! Core HTTP client for the Jenkins job and build endpoints

use std::collections::HashMap;

use chrono::Local;
use compact_str::{format_compact, CompactString};
use reqwest::{
    header::{CONTENT_TYPE, LOCATION},
    Client, Method, RequestBuilder, Response, Url,
};
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use super::{
    config::ClientConfig,
    error::{ClientError, Result},
};
use crate::{
    domain::{
        BatchDeleteReport, BuildDetail, BuildTrigger, CrumbDto, JobDetails, JobListDto,
        JobReference, LogChunk, QueueItem, ServerInfo, ServerInfoDto,
    },
    id::{BuildNumber, QueueItemId},
};

const XML_CONTENT_TYPE: &str = "application/xml";
const JOB_LIST_TREE: &str = "jobs[name,url,color]";

/// Pure HTTP client for the Jenkins REST API
///
/// Clones share the underlying connection pool.
#[derive(Debug, Clone)]
pub struct JobsClient {
    client: Client,
    config: ClientConfig,
    base_url: Url,
}

impl JobsClient {
    /// Create a new Jenkins API client
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;

        let client = Client::builder()
            .timeout(config.request.timeout)
            .build()
            .map_err(ClientError::Transport)?;

        Self::with_http_client(config, client)
    }

    /// Create a client on top of an existing transport
    pub fn with_http_client(config: ClientConfig, client: Client) -> Result<Self> {
        config.validate()?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ClientError::config_validation("base_url", e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(ClientError::config_validation("base_url", "cannot be used as a base"));
        }

        Ok(Self { client, config, base_url })
    }

    /// List the jobs at the server root
    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<JobReference>> {
        let mut url = self.url(&["api", "json"])?;
        url.query_pairs_mut().append_pair("tree", JOB_LIST_TREE);

        let listing: JobListDto = self.get_json(url, "job listing").await?;
        debug!(job_count = listing.jobs.len(), "Successfully listed jobs");
        Ok(listing.jobs)
    }

    /// Create a job from its XML definition
    ///
    /// A name containing `/` creates the job inside the named folder.
    #[instrument(skip(self, xml), fields(job = %name))]
    pub async fn create(&self, name: &str, xml: &str) -> Result<()> {
        let (folder, leaf) = split_job_name(name)?;
        let mut url = match folder {
            Some(folder) => self.job_url(folder, &["createItem"])?,
            None => self.url(&["createItem"])?,
        };
        url.query_pairs_mut().append_pair("name", leaf);

        let request = self
            .post(url)
            .await?
            .header(CONTENT_TYPE, XML_CONTENT_TYPE)
            .body(xml.to_owned());

        self.execute(request, &job_resource(name)).await?;
        debug!("Job created");
        Ok(())
    }

    /// Replace the XML definition of an existing job
    #[instrument(skip(self, xml), fields(job = %name))]
    pub async fn update_xml(&self, name: &str, xml: &str) -> Result<()> {
        let url = self.job_url(name, &["config.xml"])?;
        let request = self
            .post(url)
            .await?
            .header(CONTENT_TYPE, XML_CONTENT_TYPE)
            .body(xml.to_owned());

        self.execute(request, &job_resource(name)).await?;
        Ok(())
    }

    /// Trigger a build without parameters
    ///
    /// Returns once the server has queued the build.
    #[instrument(skip(self), fields(job = %name))]
    pub async fn build(&self, name: &str) -> Result<BuildTrigger> {
        let url = self.job_url(name, &["build"])?;
        let response = self.execute(self.post(url).await?, &job_resource(name)).await?;
        Ok(Self::build_trigger(&response))
    }

    /// Trigger a parameterized build, sending the parameters form-encoded
    #[instrument(skip(self, params), fields(job = %name, param_count = params.len()))]
    pub async fn build_with_params(
        &self,
        name: &str,
        params: &HashMap<String, String>,
    ) -> Result<BuildTrigger> {
        let url = self.job_url(name, &["buildWithParameters"])?;
        let request = self.post(url).await?.form(params);
        let response = self.execute(request, &job_resource(name)).await?;
        Ok(Self::build_trigger(&response))
    }

    /// Abort a build; the server ignores this for finished builds
    #[instrument(skip(self), fields(job = %name, build = %number))]
    pub async fn stop(&self, name: &str, number: BuildNumber) -> Result<()> {
        let url = self.build_url(name, number, &["stop"])?;
        self.execute(self.post(url).await?, &build_resource(name, number))
            .await?;
        Ok(())
    }

    /// Full console log of a build
    #[instrument(skip(self), fields(job = %name, build = %number))]
    pub async fn get_log_text(&self, name: &str, number: BuildNumber) -> Result<String> {
        let url = self.build_url(name, number, &["consoleText"])?;
        self.get_text(url, &build_resource(name, number)).await
    }

    /// Console log from byte offset `start`, as far as the server has it
    #[instrument(skip(self), fields(job = %name, build = %number, start = start))]
    pub async fn get_log_progressive(
        &self,
        name: &str,
        number: BuildNumber,
        start: u64,
    ) -> Result<LogChunk> {
        let mut url = self.build_url(name, number, &["logText", "progressiveText"])?;
        url.query_pairs_mut().append_pair("start", &start.to_string());

        let response = self
            .execute(self.request(Method::GET, url), &build_resource(name, number))
            .await?;

        let headers = response.headers();
        let text_size = headers
            .get("X-Text-Size")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let has_more = headers
            .get("X-More-Data")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));

        let text = response.text().await?;
        let next_offset = text_size.unwrap_or(start + text.len() as u64);

        Ok(LogChunk { text, next_offset, has_more })
    }

    /// State of a queued build; `executable` is set once it has started
    #[instrument(skip(self), fields(queue_item = %id))]
    pub async fn get_queue_item(&self, id: QueueItemId) -> Result<QueueItem> {
        let id_segment = id.to_string();
        let url = self.url(&["queue", "item", &id_segment, "api", "json"])?;
        self.get_json(url, &format!("queue item {id}")).await
    }

    /// Job metadata including its recent builds
    #[instrument(skip(self), fields(job = %name))]
    pub async fn get_details(&self, name: &str) -> Result<JobDetails> {
        let url = self.job_url(name, &["api", "json"])?;
        self.get_json(url, &job_resource(name)).await
    }

    /// Metadata of a single build
    #[instrument(skip(self), fields(job = %name, build = %number))]
    pub async fn get_build_details(&self, name: &str, number: BuildNumber) -> Result<BuildDetail> {
        let url = self.build_url(name, number, &["api", "json"])?;
        self.get_json(url, &build_resource(name, number)).await
    }

    /// Metadata of the most recent build
    #[instrument(skip(self), fields(job = %name))]
    pub async fn get_last_build_details(&self, name: &str) -> Result<BuildDetail> {
        let url = self.job_url(name, &["lastBuild", "api", "json"])?;
        self.get_json(url, &format!("last build of job '{name}'")).await
    }

    /// Raw `config.xml` of a job
    #[instrument(skip(self), fields(job = %name))]
    pub async fn get_xml(&self, name: &str) -> Result<String> {
        let url = self.job_url(name, &["config.xml"])?;
        self.get_text(url, &job_resource(name)).await
    }

    /// Delete a single job
    #[instrument(skip(self), fields(job = %name))]
    pub async fn delete(&self, name: &str) -> Result<()> {
        let url = self.job_url(name, &["doDelete"])?;
        self.execute(self.post(url).await?, &job_resource(name)).await?;
        Ok(())
    }

    /// Delete each named job in turn
    ///
    /// Not transactional: a failure is recorded and the remaining names are
    /// still attempted.
    #[instrument(skip(self, names))]
    pub async fn batch_del<S: AsRef<str>>(&self, names: &[S]) -> BatchDeleteReport {
        let mut report = BatchDeleteReport::default();
        for name in names {
            let name = name.as_ref();
            let outcome = self.delete(name).await;
            if let Err(e) = &outcome {
                warn!(job = %name, error = %e, "Failed to delete job");
            }
            report.outcomes.push((name.into(), outcome));
        }

        debug!(
            requested = names.len(),
            deleted = report.deleted().count(),
            "Batch delete finished"
        );
        report
    }

    /// Enable a disabled job
    #[instrument(skip(self), fields(job = %name))]
    pub async fn enable(&self, name: &str) -> Result<()> {
        let url = self.job_url(name, &["enable"])?;
        self.execute(self.post(url).await?, &job_resource(name)).await?;
        Ok(())
    }

    /// Disable a job so it can no longer be built
    #[instrument(skip(self), fields(job = %name))]
    pub async fn disable(&self, name: &str) -> Result<()> {
        let url = self.job_url(name, &["disable"])?;
        self.execute(self.post(url).await?, &job_resource(name)).await?;
        Ok(())
    }

    /// Server-wide summary
    #[instrument(skip(self))]
    pub async fn get_all(&self) -> Result<ServerInfo> {
        let url = self.url(&["api", "json"])?;
        let response = self.execute(self.request(Method::GET, url), "server info").await?;

        let version = response
            .headers()
            .get("X-Jenkins")
            .and_then(|v| v.to_str().ok())
            .map(CompactString::from);

        let dto: ServerInfoDto = self.parse_json(response).await?;
        Ok(dto.into_server_info(version))
    }

    /// Validate API connection and credentials
    #[instrument(skip(self))]
    pub async fn validate_connection(&self) -> Result<()> {
        let mut url = self.url(&["api", "json"])?;
        url.query_pairs_mut().append_pair("tree", "mode");

        let response: serde_json::Value = self.get_json(url, "server info").await?;

        if response.is_object() {
            debug!("Connection validation successful");
            Ok(())
        } else {
            Err(ClientError::UnexpectedStatus {
                status: 200,
                message: format_compact!("Invalid response format: {}", response),
            })
        }
    }

    /// Get current configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    // Private helper methods

    /// Root URL extended by `segments`, each percent-encoded
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ClientError::config_validation("base_url", "cannot be used as a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// URL below a job; folder paths `a/b` expand to `job/a/job/b`
    fn job_url(&self, name: &str, tail: &[&str]) -> Result<Url> {
        let mut segments = job_segments(name)?;
        segments.extend_from_slice(tail);
        self.url(&segments)
    }

    fn build_url(&self, name: &str, number: BuildNumber, tail: &[&str]) -> Result<Url> {
        let number = number.to_string();
        let mut segments = job_segments(name)?;
        segments.push(&number);
        segments.extend_from_slice(tail);
        self.url(&segments)
    }

    /// Create authenticated request builder
    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.client
            .request(method, url)
            .basic_auth(self.config.user.as_str(), Some(self.config.api_token.as_str()))
    }

    /// Authenticated POST, carrying a CSRF crumb when configured
    async fn post(&self, url: Url) -> Result<RequestBuilder> {
        let request = self.request(Method::POST, url);
        if !self.config.request.use_crumb {
            return Ok(request);
        }

        let crumb = self.fetch_crumb().await?;
        Ok(request.header(crumb.crumb_request_field.as_str(), crumb.crumb.as_str()))
    }

    async fn fetch_crumb(&self) -> Result<CrumbDto> {
        let url = self.url(&["crumbIssuer", "api", "json"])?;
        self.get_json(url, "crumb issuer").await
    }

    /// Perform authenticated GET request and deserialize JSON response
    async fn get_json<T>(&self, url: Url, resource: &str) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let response = self.execute(self.request(Method::GET, url), resource).await?;
        self.parse_json(response).await
    }

    /// Perform authenticated GET request returning the body as text
    async fn get_text(&self, url: Url, resource: &str) -> Result<String> {
        let response = self.execute(self.request(Method::GET, url), resource).await?;
        let url_path = response.url().path().to_string();
        let body = response.text().await?;

        if self.config.debug.log_responses {
            self.log_response_to_file(&url_path, &body);
        }

        Ok(body)
    }

    /// Send a request, turning non-2xx responses into errors
    async fn execute(&self, request: RequestBuilder, resource: &str) -> Result<Response> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            Ok(response)
        } else {
            Err(self.error_from_response(response, resource).await)
        }
    }

    /// Deserialize a successful JSON response
    async fn parse_json<T>(&self, response: Response) -> Result<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let url_path = response.url().path().to_string();
        let body = response.text().await?;

        if self.config.debug.log_responses {
            self.log_response_to_file(&url_path, &body);
        }

        serde_json::from_str(&body).map_err(|e| {
            ClientError::json_parse(url_path.clone(), format!("Failed to parse response from {url_path}"), e)
        })
    }

    /// Build a typed error from a failed response
    ///
    /// Jenkins reports the reason in the `X-Error` header; the HTML body is
    /// only used for server errors.
    async fn error_from_response(&self, response: Response, resource: &str) -> ClientError {
        let status = response.status();
        let x_error = response
            .headers()
            .get("X-Error")
            .and_then(|v| v.to_str().ok())
            .map(CompactString::from);
        let body = response.text().await.unwrap_or_default();

        let message = x_error.clone().unwrap_or_else(|| {
            if status.is_server_error() && !body.trim().is_empty() {
                body.trim().into()
            } else {
                status.canonical_reason().unwrap_or_default().into()
            }
        });

        debug!(status = status.as_u16(), resource = %resource, message = %message, "Request failed");

        // duplicate job names are rejected with 400 rather than 409
        if status.as_u16() == 400 && x_error.is_some_and(|e| e.contains("already exists")) {
            return ClientError::conflict(status.as_u16(), message);
        }

        ClientError::from_status(status.as_u16(), resource, message)
    }

    fn build_trigger(response: &Response) -> BuildTrigger {
        let queue_item = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .and_then(QueueItemId::from_location);

        debug!(queue_item = ?queue_item, "Build triggered");
        BuildTrigger { queue_item }
    }

    /// Log HTTP response to file for debugging
    fn log_response_to_file(&self, path: &str, body: &str) {
        if let Some(log_dir) = &self.config.debug.log_directory {
            if !log_dir.exists() {
                if let Err(e) = std::fs::create_dir_all(log_dir) {
                    warn!("Failed to create log directory: {}", e);
                    return;
                }
            }

            let filename = format!(
                "{}_{}.txt",
                Local::now().format("%Y-%m-%d_%H-%M-%S"),
                path.replace('/', "_")
            );

            let log_path = log_dir.join(filename);

            if let Err(e) = std::fs::write(&log_path, body) {
                warn!("Failed to write response log to {:?}: {}", log_path, e);
            } else {
                debug!("Response logged to {:?}", log_path);
            }
        }
    }
}

/// `a/b/c` becomes `["job", "a", "job", "b", "job", "c"]`
///
/// Empty names and empty folder segments are rejected so a request never
/// lands on the server root.
fn job_segments(name: &str) -> Result<Vec<&str>> {
    if name.is_empty() || name.split('/').any(str::is_empty) {
        return Err(ClientError::InvalidJobName { name: name.to_string() });
    }
    Ok(name.split('/').flat_map(|s| ["job", s]).collect())
}

/// Splits `folder/sub/job` into `(Some("folder/sub"), "job")`
fn split_job_name(name: &str) -> Result<(Option<&str>, &str)> {
    job_segments(name)?;
    Ok(match name.rfind('/') {
        Some(i) => (Some(&name[..i]), &name[i + 1..]),
        None => (None, name),
    })
}

fn job_resource(name: &str) -> String {
    format!("job '{name}'")
}

fn build_resource(name: &str, number: BuildNumber) -> String {
    format!("build #{number} of job '{name}'")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> ClientConfig {
        ClientConfig::new("https://ci.example.com", "admin", "test-token")
    }

    #[test]
    fn test_api_creation() {
        let api = JobsClient::new(test_config());
        assert!(api.is_ok());
    }

    #[test]
    fn test_api_creation_invalid_config() {
        let api = JobsClient::new(ClientConfig::new("", "admin", "test-token"));
        assert!(api.is_err());
    }

    #[test]
    fn test_job_url() {
        let api = JobsClient::new(test_config()).unwrap();

        let url = api.job_url("hello", &["api", "json"]).unwrap();
        assert_eq!(url.as_str(), "https://ci.example.com/job/hello/api/json");
    }

    #[test]
    fn test_job_url_in_folder() {
        let api = JobsClient::new(test_config()).unwrap();

        let url = api.job_url("team/service", &["config.xml"]).unwrap();
        assert_eq!(url.as_str(), "https://ci.example.com/job/team/job/service/config.xml");
    }

    #[test]
    fn test_job_url_escapes_segments() {
        let api = JobsClient::new(test_config()).unwrap();

        let url = api.job_url("my job#1", &["api", "json"]).unwrap();
        assert_eq!(url.as_str(), "https://ci.example.com/job/my%20job%231/api/json");
    }

    #[test]
    fn test_build_url_with_context_path() {
        let config = ClientConfig::new("https://ci.example.com/jenkins/", "admin", "token");
        let api = JobsClient::new(config).unwrap();

        let url = api.build_url("hello", BuildNumber::new(7), &["stop"]).unwrap();
        assert_eq!(url.as_str(), "https://ci.example.com/jenkins/job/hello/7/stop");
    }

    #[test]
    fn test_split_job_name() {
        assert_eq!(split_job_name("hello").unwrap(), (None, "hello"));
        assert_eq!(split_job_name("team/hello").unwrap(), (Some("team"), "hello"));
        assert_eq!(split_job_name("a/b/hello").unwrap(), (Some("a/b"), "hello"));
        assert!(split_job_name("a/b/hello/").is_err());
    }

    #[test]
    fn test_job_url_rejects_empty_segments() {
        let api = JobsClient::new(test_config()).unwrap();

        for name in ["", "/", "a//b", "/hello", "hello/"] {
            assert!(
                matches!(api.job_url(name, &["doDelete"]), Err(ClientError::InvalidJobName { .. })),
                "accepted {name:?}"
            );
        }
        assert!(api.build_url("", BuildNumber::new(1), &["stop"]).is_err());
    }

    #[test]
    fn test_queue_item_url() {
        let api = JobsClient::new(test_config()).unwrap();

        let url = api.url(&["queue", "item", "42", "api", "json"]).unwrap();
        assert_eq!(url.as_str(), "https://ci.example.com/queue/item/42/api/json");
    }
}
