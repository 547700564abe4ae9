//! Latest-orientation cell: one writer (the tracker), any number of readers.

use contracts::OrientationEstimate;
use tokio::sync::watch;

/// Writer half, owned by the tracker worker
///
/// Dropping it is how readers learn that the sensor is gone.
#[derive(Debug)]
pub struct LatestOrientation {
    tx: watch::Sender<Option<OrientationEstimate>>,
}

impl LatestOrientation {
    /// Create the cell with no estimate yet
    pub fn new() -> (Self, OrientationReader) {
        let (tx, rx) = watch::channel(None);
        (Self { tx }, OrientationReader { rx })
    }

    /// Replace the published estimate
    pub fn publish(&self, estimate: OrientationEstimate) {
        self.tx.send_replace(Some(estimate));
    }

    /// Another reader handle
    pub fn subscribe(&self) -> OrientationReader {
        OrientationReader {
            rx: self.tx.subscribe(),
        }
    }
}

/// Read-only handle to the latest estimate
#[derive(Debug, Clone)]
pub struct OrientationReader {
    rx: watch::Receiver<Option<OrientationEstimate>>,
}

impl OrientationReader {
    /// Most recent estimate, None until the first one is published
    pub fn latest(&self) -> Option<OrientationEstimate> {
        *self.rx.borrow()
    }

    /// True once the writer has been dropped
    pub fn is_lost(&self) -> bool {
        self.rx.has_changed().is_err()
    }

    /// Wait for the next published estimate
    ///
    /// Returns None when the writer is gone.
    pub async fn next(&mut self) -> Option<OrientationEstimate> {
        self.rx.changed().await.ok()?;
        *self.rx.borrow_and_update()
    }
}
