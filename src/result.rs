use thiserror::Error;

use crate::client::ClientError;

pub type Result<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Client(#[from] ClientError),
    #[error("Failure reading configuration file: {0}")]
    ConfigError(String),
    #[error("Failed to initialize logging: {0}")]
    LoggingError(String),
    #[error("Invalid build parameter '{0}', expected KEY=VALUE")]
    InvalidParameter(String),
    #[error("{failed} of {requested} jobs could not be deleted")]
    PartialDelete { failed: usize, requested: usize },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Process exit code; HTTP failures map onto distinct codes for scripting
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Client(ClientError::Conflict { .. }) => 5,
            CliError::Client(ClientError::InvalidJobName { .. }) => 2,
            CliError::Client(e) => match e.status() {
                Some(404) => 4,
                Some(401) | Some(403) => 3,
                _ => 1,
            },
            CliError::InvalidParameter(_) => 2,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(CliError::from(ClientError::not_found("job 'x'")).exit_code(), 4);
        assert_eq!(CliError::from(ClientError::Unauthorized).exit_code(), 3);
        assert_eq!(CliError::from(ClientError::conflict(400, "exists")).exit_code(), 5);
        assert_eq!(CliError::from(ClientError::conflict(409, "exists")).exit_code(), 5);
        assert_eq!(
            CliError::from(ClientError::InvalidJobName { name: "/".into() }).exit_code(),
            2
        );
        assert_eq!(CliError::InvalidParameter("x".into()).exit_code(), 2);
        assert_eq!(CliError::ConfigError("bad".into()).exit_code(), 1);
    }
}
