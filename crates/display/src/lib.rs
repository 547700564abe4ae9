//! # Display
//!
//! Display outputs for the composed eye pair.
//!
//! - `LogDisplay`: logs a summary of every output
//! - `PngDisplay`: writes every Nth output to disk as PNG plus JSON metadata
//! - `ChannelDisplay`: hands outputs to an in-process consumer
//!
//! `create_display` builds the configured backend. Write failures are
//! transient; only `DisplayLost` stops the pipeline.

pub mod error;
pub mod sinks;

use contracts::{ContractError, DisplayConfig, DisplayKind, DisplayOutput};
use tracing::instrument;

pub use contracts::DisplaySink;
pub use error::DisplayError;
pub use sinks::{ChannelDisplay, FrameMeta, LogDisplay, PngDisplay};

/// Display backend selected by configuration
pub enum DisplayBackend {
    Log(LogDisplay),
    Png(PngDisplay),
}

impl DisplaySink for DisplayBackend {
    fn name(&self) -> &str {
        match self {
            Self::Log(sink) => sink.name(),
            Self::Png(sink) => sink.name(),
        }
    }

    async fn present(&mut self, output: &DisplayOutput) -> Result<(), ContractError> {
        match self {
            Self::Log(sink) => sink.present(output).await,
            Self::Png(sink) => sink.present(output).await,
        }
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        match self {
            Self::Log(sink) => sink.flush().await,
            Self::Png(sink) => sink.flush().await,
        }
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        match self {
            Self::Log(sink) => sink.close().await,
            Self::Png(sink) => sink.close().await,
        }
    }
}

/// Create the display named by `config`
#[instrument(name = "display_create", skip(config), fields(kind = ?config.kind))]
pub fn create_display(config: &DisplayConfig) -> Result<DisplayBackend, DisplayError> {
    match config.kind {
        DisplayKind::Log => Ok(DisplayBackend::Log(LogDisplay::new("log", config.every_nth))),
        DisplayKind::Png => {
            let dir = config
                .output_dir
                .as_ref()
                .ok_or_else(|| DisplayError::sink_creation("png", "output_dir is required"))?;
            let sink = PngDisplay::new("png", dir, config.every_nth)
                .map_err(|e| DisplayError::sink_creation("png", e.to_string()))?;
            Ok(DisplayBackend::Png(sink))
        }
    }
}
