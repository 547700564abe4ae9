//! Display error types

use thiserror::Error;

/// Display-specific errors
#[derive(Debug, Error)]
pub enum DisplayError {
    /// Sink creation error
    #[error("failed to create display '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DisplayError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl From<DisplayError> for contracts::ContractError {
    fn from(err: DisplayError) -> Self {
        match err {
            DisplayError::SinkCreation { name, message } => {
                contracts::ContractError::display_lost(name, message)
            }
            DisplayError::Io(e) => contracts::ContractError::Io(e),
        }
    }
}
