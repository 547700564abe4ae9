//! Run signal and fatal-error slot shared by the stages

use contracts::ContractError;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::error;

/// What the stages should be doing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunSignal {
    Run,
    /// Stop taking new input, flush what is in flight
    Drain,
    /// Stop immediately, no flush
    Abort,
}

#[derive(Debug)]
pub(crate) struct Control {
    signal: watch::Sender<RunSignal>,
    fatal: Mutex<Option<ContractError>>,
}

impl Control {
    pub(crate) fn new() -> Self {
        let (signal, _) = watch::channel(RunSignal::Run);
        Self {
            signal,
            fatal: Mutex::new(None),
        }
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<RunSignal> {
        self.signal.subscribe()
    }

    pub(crate) fn current(&self) -> RunSignal {
        *self.signal.borrow()
    }

    pub(crate) fn is_aborted(&self) -> bool {
        self.current() == RunSignal::Abort
    }

    /// Request a graceful drain; no-op once draining or aborted
    pub(crate) fn drain(&self) {
        self.signal.send_if_modified(|signal| {
            if *signal == RunSignal::Run {
                *signal = RunSignal::Drain;
                true
            } else {
                false
            }
        });
    }

    /// Record a fatal error and abort every stage; only the first error is kept
    pub(crate) fn fail(&self, err: ContractError) {
        {
            let mut slot = self.fatal.lock();
            if slot.is_none() {
                error!(error = %err, "Fatal pipeline error, aborting all stages");
                *slot = Some(err);
            }
        }
        self.signal.send_replace(RunSignal::Abort);
    }

    /// Stop every stage without recording an error
    pub(crate) fn abort(&self) {
        self.signal.send_replace(RunSignal::Abort);
    }

    pub(crate) fn take_fatal(&self) -> Option<ContractError> {
        self.fatal.lock().take()
    }
}
