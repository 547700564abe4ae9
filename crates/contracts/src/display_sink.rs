//! Display output and screen capture interfaces

use crate::{CapturedFrame, ContractError, DisplayOutput};

/// Display output trait
///
/// `DisplayLost` from any method is fatal for the pipeline, every other error
/// only drops the output.
#[trait_variant::make(DisplaySink: Send)]
pub trait LocalDisplaySink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Present one composed output
    async fn present(&mut self, output: &DisplayOutput) -> Result<(), ContractError>;

    /// Flush buffered output (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Release the output device
    async fn close(&mut self) -> Result<(), ContractError>;
}

/// Screen capture trait
///
/// Pull based and restartable: each call blocks until the next frame is due.
/// `CaptureLost` is fatal, `MalformedFrame` skips one frame.
#[trait_variant::make(FrameSource: Send)]
pub trait LocalFrameSource {
    /// Source name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Next captured desktop frame
    async fn next_frame(&mut self) -> Result<CapturedFrame, ContractError>;

    /// Release the capture device
    async fn close(&mut self) -> Result<(), ContractError>;
}
