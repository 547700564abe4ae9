//! Line transport - replays `Yaw: .., Pitch: .., Roll: ..` logs
//!
//! Stands in for a serial port: lines are delivered at a fixed rate and stamped
//! with the session clock on arrival, the way a live board's output would be.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use contracts::{ImuCallback, ImuMessage, ImuSource, SessionClock};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::attitude::parse_attitude_line;
use crate::config::IngestionMetrics;
use crate::error::{IngestionError, Result};

#[derive(Debug, Clone)]
enum LineInput {
    File(PathBuf),
    Memory(Arc<Vec<String>>),
}

/// Why a replay pass ended
enum PassEnd {
    Eof,
    Stopped,
    Failed(String),
}

/// Attitude line transport
pub struct LineImuSource {
    source_id: String,
    input: LineInput,
    interval: Duration,
    clock: SessionClock,
    loop_replay: bool,
    metrics: Option<Arc<IngestionMetrics>>,
    parse_errors: Arc<AtomicU64>,
    listening: Arc<AtomicBool>,
    thread_handle: Mutex<Option<JoinHandle<()>>>,
}

impl LineImuSource {
    /// Replay a log file
    pub fn from_path(
        source_id: impl Into<String>,
        path: impl AsRef<Path>,
        rate_hz: f64,
        clock: SessionClock,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        std::fs::metadata(&path).map_err(|source| IngestionError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::with_input(
            source_id.into(),
            LineInput::File(path),
            rate_hz,
            clock,
        ))
    }

    /// Replay lines held in memory
    pub fn from_lines(
        source_id: impl Into<String>,
        lines: Vec<String>,
        rate_hz: f64,
        clock: SessionClock,
    ) -> Self {
        Self::with_input(
            source_id.into(),
            LineInput::Memory(Arc::new(lines)),
            rate_hz,
            clock,
        )
    }

    fn with_input(source_id: String, input: LineInput, rate_hz: f64, clock: SessionClock) -> Self {
        let rate_hz = if rate_hz.is_finite() && rate_hz > 0.0 {
            rate_hz
        } else {
            1.0
        };
        Self {
            source_id,
            input,
            interval: Duration::from_secs_f64(1.0 / rate_hz),
            clock,
            loop_replay: false,
            metrics: None,
            parse_errors: Arc::new(AtomicU64::new(0)),
            listening: Arc::new(AtomicBool::new(false)),
            thread_handle: Mutex::new(None),
        }
    }

    /// Restart at EOF instead of reporting a disconnect
    pub fn looping(mut self, loop_replay: bool) -> Self {
        self.loop_replay = loop_replay;
        self
    }

    /// Count parse failures into shared ingestion metrics
    pub fn with_metrics(mut self, metrics: Arc<IngestionMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Lines rejected by the parser so far
    pub fn parse_errors(&self) -> u64 {
        self.parse_errors.load(Ordering::Relaxed)
    }
}

/// State moved into the replay thread
struct Replayer {
    source_id: String,
    input: LineInput,
    interval: Duration,
    clock: SessionClock,
    metrics: Option<Arc<IngestionMetrics>>,
    parse_errors: Arc<AtomicU64>,
    listening: Arc<AtomicBool>,
    callback: ImuCallback,
}

impl Replayer {
    fn run(&self, loop_replay: bool) {
        debug!(source_id = %self.source_id, "Replay thread started");

        let mut passes = 0u64;
        loop {
            let end = match &self.input {
                LineInput::Memory(lines) => self.play(lines.iter().map(|l| Ok(l.clone()))),
                LineInput::File(path) => match File::open(path) {
                    Ok(file) => self.play(BufReader::new(file).lines()),
                    Err(e) => PassEnd::Failed(format!("cannot open {}: {e}", path.display())),
                },
            };
            passes += 1;

            match end {
                PassEnd::Stopped => {
                    debug!(source_id = %self.source_id, "Replay stopped");
                    return;
                }
                PassEnd::Failed(message) => {
                    warn!(source_id = %self.source_id, error = %message, "Replay failed");
                    (self.callback)(ImuMessage::Disconnected(message));
                    break;
                }
                PassEnd::Eof if loop_replay => {
                    debug!(source_id = %self.source_id, passes, "Looping replay");
                }
                PassEnd::Eof => {
                    info!(source_id = %self.source_id, "Replay completed");
                    (self.callback)(ImuMessage::Disconnected("end of replay log".to_string()));
                    break;
                }
            }
        }

        self.listening.store(false, Ordering::SeqCst);
    }

    fn play(&self, lines: impl Iterator<Item = std::io::Result<String>>) -> PassEnd {
        let mut delivered = 0u64;
        for line in lines {
            if !self.listening.load(Ordering::Relaxed) {
                return PassEnd::Stopped;
            }
            let line = match line {
                Ok(line) => line,
                Err(e) => return PassEnd::Failed(format!("read error: {e}")),
            };
            if line.trim().is_empty() {
                continue;
            }

            match parse_attitude_line(&line, self.clock.now()) {
                Ok(reading) => {
                    (self.callback)(ImuMessage::Attitude(reading));
                    delivered += 1;
                }
                Err(e) => {
                    self.parse_errors.fetch_add(1, Ordering::Relaxed);
                    if let Some(metrics) = &self.metrics {
                        metrics.record_parse_error();
                    }
                    debug!(source_id = %self.source_id, error = %e, "Skipping malformed line");
                }
            }
            thread::sleep(self.interval);
        }

        if delivered == 0 && !self.listening.load(Ordering::Relaxed) {
            return PassEnd::Stopped;
        }
        if delivered == 0 {
            return PassEnd::Failed("no valid attitude lines".to_string());
        }
        PassEnd::Eof
    }
}

impl ImuSource for LineImuSource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn listen(&self, callback: ImuCallback) {
        if self.listening.swap(true, Ordering::SeqCst) {
            return;
        }

        let replayer = Replayer {
            source_id: self.source_id.clone(),
            input: self.input.clone(),
            interval: self.interval,
            clock: self.clock,
            metrics: self.metrics.clone(),
            parse_errors: self.parse_errors.clone(),
            listening: self.listening.clone(),
            callback,
        };
        let loop_replay = self.loop_replay;

        let handle = thread::spawn(move || replayer.run(loop_replay));
        *self.thread_handle.lock() = Some(handle);
    }

    fn stop(&self) {
        self.listening.store(false, Ordering::SeqCst);

        if let Some(handle) = self.thread_handle.lock().take() {
            let _ = handle.join();
        }
    }

    fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Relaxed)
    }
}

impl Drop for LineImuSource {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::mpsc;

    fn collect(source: &LineImuSource, until_disconnect: bool) -> Vec<ImuMessage> {
        let (tx, rx) = mpsc::channel();
        source.listen(Arc::new(move |msg| {
            let _ = tx.send(msg);
        }));

        let mut messages = Vec::new();
        while let Ok(msg) = rx.recv_timeout(Duration::from_secs(2)) {
            let done = matches!(msg, ImuMessage::Disconnected(_));
            messages.push(msg);
            if done && until_disconnect {
                break;
            }
            if !until_disconnect && messages.len() >= 6 {
                break;
            }
        }
        messages
    }

    #[test]
    fn test_eof_reports_disconnect() {
        let lines = vec![
            "Yaw: 1, Pitch: 0, Roll: 0".to_string(),
            "Yaw: 2, Pitch: 0, Roll: 0".to_string(),
        ];
        let source = LineImuSource::from_lines("serial", lines, 1000.0, SessionClock::start());

        let messages = collect(&source, true);
        assert_eq!(messages.len(), 3);
        assert!(matches!(messages[2], ImuMessage::Disconnected(_)));

        let stamps: Vec<f64> = messages.iter().filter_map(|m| m.timestamp()).collect();
        assert!(stamps[1] >= stamps[0]);
    }

    #[test]
    fn test_looping_replay_keeps_going() {
        let lines = vec!["Yaw: 5, Pitch: 0, Roll: 0".to_string()];
        let source = LineImuSource::from_lines("serial", lines, 1000.0, SessionClock::start())
            .looping(true);

        let messages = collect(&source, false);
        source.stop();
        assert_eq!(messages.len(), 6);
        assert!(messages.iter().all(|m| matches!(m, ImuMessage::Attitude(_))));
        assert!(!source.is_listening());
    }

    #[test]
    fn test_file_replay_counts_bad_lines() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "boot ok").unwrap();
        writeln!(file, "Yaw: 90.0, Pitch: 10.0, Roll: -10.0").unwrap();
        writeln!(file).unwrap();
        writeln!(file, "Yaw: nope").unwrap();

        let metrics = Arc::new(IngestionMetrics::new());
        let source = LineImuSource::from_path("serial", file.path(), 1000.0, SessionClock::start())
            .unwrap()
            .with_metrics(metrics.clone());

        let messages = collect(&source, true);
        assert_eq!(messages.len(), 2);
        match &messages[0] {
            ImuMessage::Attitude(reading) => assert_eq!(reading.yaw_deg, 90.0),
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(source.parse_errors(), 2);
        assert_eq!(metrics.snapshot().parse_errors, 2);
    }

    #[test]
    fn test_missing_file_rejected() {
        let result = LineImuSource::from_path(
            "serial",
            "/definitely/not/here.log",
            100.0,
            SessionClock::start(),
        );
        assert!(matches!(result, Err(IngestionError::Io { .. })));
    }

    #[test]
    fn test_log_without_valid_lines_disconnects() {
        let source = LineImuSource::from_lines(
            "serial",
            vec!["junk".to_string()],
            1000.0,
            SessionClock::start(),
        )
        .looping(true);

        let messages = collect(&source, true);
        assert_eq!(messages.len(), 1);
        assert!(matches!(messages[0], ImuMessage::Disconnected(_)));
    }
}
