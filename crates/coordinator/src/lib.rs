//! # Coordinator
//!
//! Runs the capture → process → render pipeline.
//!
//! ## Stages
//! - **capture**: pulls frames from a [`contracts::FrameSource`]
//! - **process**: pairs each frame with the latest orientation and projects both eyes
//! - **render**: composes the eye pair and hands it to a [`contracts::DisplaySink`]
//!
//! Stages are connected by bounded queues that drop the oldest frame when full,
//! so a slow stage never stalls the one before it. Frames reach the display in
//! capture order; anything older than the last presented frame is discarded.
//!
//! Fatal resource errors (capture, sensor or display lost) abort every stage
//! and are returned from [`PipelineHandle::wait`].

mod control;
mod error;
mod pipeline;
mod queue;
mod stages;
mod state;
mod stats;

pub use control::RunSignal;
pub use error::PipelineError;
pub use pipeline::{Coordinator, CoordinatorConfig, PipelineHandle};
pub use queue::{frame_queue, PopOutcome, PushOutcome, QueueConsumer, QueueProducer};
pub use state::{StageId, StageState};
pub use stats::{DropReason, PipelineStats};
