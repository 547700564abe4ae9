//! Error types for CLI operations.

use coordinator::PipelineError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration parsing or validation error
    #[error("Invalid configuration: {0}")]
    Config(#[source] contracts::ContractError),

    /// Pipeline stopped on a fatal error
    #[error("Pipeline execution failed: {0}")]
    PipelineExecution(#[from] PipelineError),

    /// Error while stopping the session
    #[error("Error during shutdown: {message}")]
    Shutdown { message: String },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn shutdown(message: impl Into<String>) -> Self {
        Self::Shutdown {
            message: message.into(),
        }
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConfigNotFound { .. } | Self::Config(_) => 2,
            Self::PipelineExecution(_) | Self::Shutdown { .. } => 1,
        }
    }
}

/// Result type alias for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ContractError;

    #[test]
    fn test_messages_and_exit_codes() {
        let err = CliError::config_not_found("rig.toml");
        assert_eq!(err.to_string(), "Configuration file not found: rig.toml");
        assert_eq!(err.exit_code(), 2);

        let err = CliError::from(PipelineError::Fatal(ContractError::capture_lost("unplugged")));
        assert!(err.to_string().starts_with("Pipeline execution failed"));
        assert_eq!(err.exit_code(), 1);
    }
}
