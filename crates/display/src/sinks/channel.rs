//! ChannelDisplay - hands outputs to an in-process consumer

use contracts::{ContractError, DisplayOutput, DisplaySink};
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

/// Display backed by a bounded channel
///
/// A full channel drops the output (transient); a dropped receiver means the
/// display is gone.
pub struct ChannelDisplay {
    name: String,
    tx: mpsc::Sender<DisplayOutput>,
}

impl ChannelDisplay {
    pub fn new(name: impl Into<String>, capacity: usize) -> (Self, mpsc::Receiver<DisplayOutput>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                name: name.into(),
                tx,
            },
            rx,
        )
    }
}

impl DisplaySink for ChannelDisplay {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "channel_display_present",
        skip(self, output),
        fields(sink = %self.name, frame_id = output.frame_id)
    )]
    async fn present(&mut self, output: &DisplayOutput) -> Result<(), ContractError> {
        match self.tx.try_send(output.clone()) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(sink = %self.name, frame_id = output.frame_id, "Consumer behind, output dropped");
                Err(ContractError::display_write(&self.name, "consumer queue full"))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(ContractError::display_lost(&self.name, "consumer went away"))
            }
        }
    }

    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        debug!(sink = %self.name, "ChannelDisplay closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::test_support::side_by_side;

    #[tokio::test]
    async fn test_outputs_reach_consumer() {
        let (mut sink, mut rx) = ChannelDisplay::new("viewer", 4);
        sink.present(&side_by_side(5, 2, 2)).await.unwrap();
        assert_eq!(rx.recv().await.unwrap().frame_id, 5);
    }

    #[tokio::test]
    async fn test_full_then_closed() {
        let (mut sink, rx) = ChannelDisplay::new("viewer", 1);
        sink.present(&side_by_side(1, 2, 2)).await.unwrap();

        let err = sink.present(&side_by_side(2, 2, 2)).await.unwrap_err();
        assert!(!err.is_fatal());

        drop(rx);
        let err = sink.present(&side_by_side(3, 2, 2)).await.unwrap_err();
        assert!(matches!(err, ContractError::DisplayLost { .. }));
    }
}
