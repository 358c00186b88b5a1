use std::path::{Path, PathBuf};

use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::result::{CliError, Result};

/// Settings persisted by the command line tool
#[derive(Default, Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CliConfig {
    /// The root URL of the Jenkins server
    pub jenkins_url: String,
    /// The user the API token belongs to
    pub jenkins_user: String,
    /// The API token used instead of a password
    pub jenkins_token: String,
    /// Log level, or "Off" to disable file logging
    pub log_level: Option<String>,
}

impl CliConfig {
    /// Values from `JENKINS_URL`, `JENKINS_USER` and `JENKINS_TOKEN` win over the file.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("JENKINS_URL") {
            self.jenkins_url = url;
        }
        if let Ok(user) = std::env::var("JENKINS_USER") {
            self.jenkins_user = user;
        }
        if let Ok(token) = std::env::var("JENKINS_TOKEN") {
            self.jenkins_token = token;
        }
        self
    }
}

pub fn default_config_path() -> PathBuf {
    if let Some(dirs) = BaseDirs::new() {
        dirs.config_dir().join("jenkins-jobs.toml")
    } else {
        PathBuf::from("jenkins-jobs.toml")
    }
}

pub fn load_config(config_file: &Path) -> Result<CliConfig> {
    if !config_file.exists() {
        return Ok(CliConfig::default());
    }

    confy::load_path(config_file).map_err(|e| CliError::ConfigError(e.to_string()))
}

pub fn save_config(config_file: &Path, config: &CliConfig) -> Result<()> {
    confy::store_path(config_file, config).map_err(|e| CliError::ConfigError(e.to_string()))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_default() {
        let path = std::env::temp_dir().join("jenkins-jobs-does-not-exist.toml");
        let config = load_config(&path).unwrap();
        assert_eq!(config, CliConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let path = std::env::temp_dir().join(format!("jenkins-jobs-{}.toml", std::process::id()));
        let config = CliConfig {
            jenkins_url: "https://ci.example.com".into(),
            jenkins_user: "admin".into(),
            jenkins_token: "secret".into(),
            log_level: None,
        };

        save_config(&path, &config).unwrap();
        let loaded = load_config(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, config);
    }
}
