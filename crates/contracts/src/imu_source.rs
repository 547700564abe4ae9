//! ImuSource trait - sensor transport abstraction
//!
//! Decouples the tracker from the concrete transport (serial, HID, replay, mock).
//! Transports push messages through a callback, the way hardware drivers do.

use std::sync::Arc;

use crate::ImuMessage;

/// Sensor message callback type
///
/// Shared with `Arc` so the same callback can be cloned into transport threads.
pub type ImuCallback = Arc<dyn Fn(ImuMessage) + Send + Sync>;

/// Sensor transport trait
///
/// # Example
///
/// ```ignore
/// let source: Box<dyn ImuSource> = open_transport();
/// source.listen(Arc::new(|msg| {
///     println!("imu: {:?}", msg.timestamp());
/// }));
/// // ...
/// source.stop();
/// ```
pub trait ImuSource: Send + Sync {
    /// Transport identifier (used for logging/metrics)
    fn source_id(&self) -> &str;

    /// Register the message callback and start producing
    ///
    /// Repeated calls while listening are ignored.
    fn listen(&self, callback: ImuCallback);

    /// Stop producing; no callback runs after this returns
    fn stop(&self);

    /// Check if currently listening
    fn is_listening(&self) -> bool;
}
