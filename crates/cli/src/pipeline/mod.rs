//! Session orchestration module.

mod orchestrator;

pub use orchestrator::{Session, SessionConfig};
