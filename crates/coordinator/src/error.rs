//! Coordinator error types

use contracts::ContractError;
use thiserror::Error;

/// Outcome of a pipeline run that did not end cleanly
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A resource failure stopped every stage
    #[error("pipeline stopped on fatal error: {0}")]
    Fatal(ContractError),

    /// A stage task panicked or was cancelled
    #[error("stage '{stage}' terminated abnormally: {message}")]
    StageTerminated { stage: &'static str, message: String },
}

impl PipelineError {
    /// The underlying fatal error, if any
    pub fn as_contract_error(&self) -> Option<&ContractError> {
        match self {
            Self::Fatal(e) => Some(e),
            Self::StageTerminated { .. } => None,
        }
    }
}
