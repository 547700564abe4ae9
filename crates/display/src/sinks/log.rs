//! LogDisplay - logs output summaries via tracing

use contracts::{ContractError, DisplayOutput, DisplaySink, TrackingStatus};
use tracing::{debug, info, instrument};

/// Display that only logs what it would have shown
pub struct LogDisplay {
    name: String,
    every_nth: u64,
    presented: u64,
}

impl LogDisplay {
    /// Create a new LogDisplay; every `every_nth` output is logged at info level
    pub fn new(name: impl Into<String>, every_nth: u64) -> Self {
        Self {
            name: name.into(),
            every_nth: every_nth.max(1),
            presented: 0,
        }
    }

    pub fn presented(&self) -> u64 {
        self.presented
    }

    fn log_output_summary(&self, output: &DisplayOutput) {
        let (width, height) = output.surface.dimensions();
        let tracking = match output.tracking {
            TrackingStatus::Live => "live",
            TrackingStatus::Stale { .. } => "stale",
            TrackingStatus::Lost => "lost",
        };

        if self.presented.is_multiple_of(self.every_nth) {
            info!(
                sink = %self.name,
                frame_id = output.frame_id,
                t_frame = output.frame_timestamp,
                t_orientation = output.orientation_timestamp,
                width,
                height,
                tracking,
                "Output presented"
            );
        } else {
            debug!(sink = %self.name, frame_id = output.frame_id, tracking, "Output presented");
        }
    }
}

impl DisplaySink for LogDisplay {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_display_present",
        skip(self, output),
        fields(sink = %self.name, frame_id = output.frame_id)
    )]
    async fn present(&mut self, output: &DisplayOutput) -> Result<(), ContractError> {
        self.log_output_summary(output);
        self.presented += 1;
        Ok(())
    }

    #[instrument(name = "log_display_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "log_display_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        info!(sink = %self.name, presented = self.presented, "LogDisplay closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::test_support::{dual, side_by_side};

    #[tokio::test]
    async fn test_log_display_present() {
        let mut sink = LogDisplay::new("test_log", 2);
        sink.present(&side_by_side(1, 8, 4)).await.unwrap();
        sink.present(&dual(2)).await.unwrap();
        sink.present(&side_by_side(3, 8, 4)).await.unwrap();
        assert_eq!(sink.presented(), 3);
        sink.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_log_display_name() {
        let sink = LogDisplay::new("my_logger", 0);
        assert_eq!(sink.name(), "my_logger");
    }
}
