//! Stage lifecycle: `Idle → Running → Draining → Stopped`

use std::fmt;

use parking_lot::Mutex;

/// Lifecycle state of one stage or of the whole pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum StageState {
    #[default]
    Idle,
    Running,
    Draining,
    Stopped,
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// The three pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StageId {
    Capture,
    Process,
    Render,
}

impl StageId {
    pub const ALL: [StageId; 3] = [Self::Capture, Self::Process, Self::Render];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Capture => "capture",
            Self::Process => "process",
            Self::Render => "render",
        }
    }

    fn index(self) -> usize {
        match self {
            Self::Capture => 0,
            Self::Process => 1,
            Self::Render => 2,
        }
    }
}

/// Per-stage states; transitions only move forward
#[derive(Debug, Default)]
pub struct StageBoard {
    states: Mutex<[StageState; 3]>,
}

impl StageBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move `stage` to `next`; backward moves are ignored
    ///
    /// Returns true if the state changed.
    pub fn advance(&self, stage: StageId, next: StageState) -> bool {
        let mut states = self.states.lock();
        let current = &mut states[stage.index()];
        if next > *current {
            *current = next;
            true
        } else {
            false
        }
    }

    pub fn get(&self, stage: StageId) -> StageState {
        self.states.lock()[stage.index()]
    }

    /// Whole-pipeline state: Stopped once every stage stopped, Draining once any
    /// stage has left Running
    pub fn pipeline(&self) -> StageState {
        let states = *self.states.lock();
        if states.iter().all(|s| *s == StageState::Stopped) {
            StageState::Stopped
        } else if states
            .iter()
            .any(|s| matches!(s, StageState::Draining | StageState::Stopped))
        {
            StageState::Draining
        } else if states.iter().any(|s| *s == StageState::Running) {
            StageState::Running
        } else {
            StageState::Idle
        }
    }
}
