//! PngDisplay - writes composed outputs to disk
//!
//! Layout: `<output_dir>/session-<local time>/frame_<id>.png` (or `_left`/`_right`
//! for the dual layout) plus `frame_<id>.json` with timing and tracking.

use std::fs::{self, File};
use std::path::{Path, PathBuf};

use contracts::{ContractError, DisplayOutput, DisplaySink, DisplaySurface, TrackingStatus};
use serde::Serialize;
use tracing::{debug, error, info, instrument};

/// Metadata written next to every saved image
#[derive(Debug, Clone, Serialize)]
pub struct FrameMeta {
    pub frame_id: u64,
    pub frame_timestamp: f64,
    pub orientation_timestamp: f64,
    pub tracking: TrackingStatus,
    pub width: u32,
    pub height: u32,
}

impl From<&DisplayOutput> for FrameMeta {
    fn from(output: &DisplayOutput) -> Self {
        let (width, height) = output.surface.dimensions();
        Self {
            frame_id: output.frame_id,
            frame_timestamp: output.frame_timestamp,
            orientation_timestamp: output.orientation_timestamp,
            tracking: output.tracking,
            width,
            height,
        }
    }
}

/// Display that saves every Nth output as PNG
pub struct PngDisplay {
    name: String,
    session_dir: PathBuf,
    every_nth: u64,
    presented: u64,
    written: u64,
}

impl PngDisplay {
    /// Create a new PngDisplay with a fresh session directory under `output_dir`
    pub fn new(name: impl Into<String>, output_dir: &Path, every_nth: u64) -> std::io::Result<Self> {
        let stamp = chrono::Local::now().format("%Y%m%d-%H%M%S%.3f");
        let session_dir = output_dir.join(format!("session-{stamp}"));
        fs::create_dir_all(&session_dir)?;

        info!(dir = %session_dir.display(), every_nth, "PngDisplay writing to session directory");

        Ok(Self {
            name: name.into(),
            session_dir,
            every_nth: every_nth.max(1),
            presented: 0,
            written: 0,
        })
    }

    pub fn session_dir(&self) -> &Path {
        &self.session_dir
    }

    pub fn written(&self) -> u64 {
        self.written
    }

    fn write_output(dir: &Path, output: &DisplayOutput) -> std::io::Result<()> {
        let stem = format!("frame_{:06}", output.frame_id);

        match &output.surface {
            DisplaySurface::SideBySide {
                width,
                height,
                data,
            } => {
                save_rgba(&dir.join(format!("{stem}.png")), data, *width, *height)?;
            }
            DisplaySurface::Dual { left, right } => {
                save_rgba(
                    &dir.join(format!("{stem}_left.png")),
                    &left.data,
                    left.width,
                    left.height,
                )?;
                save_rgba(
                    &dir.join(format!("{stem}_right.png")),
                    &right.data,
                    right.width,
                    right.height,
                )?;
            }
        }

        let meta_file = File::create(dir.join(format!("{stem}.json")))?;
        serde_json::to_writer(meta_file, &FrameMeta::from(output))
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        Ok(())
    }
}

fn save_rgba(path: &Path, data: &[u8], width: u32, height: u32) -> std::io::Result<()> {
    let expected = width as usize * height as usize * 4;
    if data.len() != expected {
        return Err(std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("buffer is {} bytes, expected {expected}", data.len()),
        ));
    }
    image::save_buffer(path, data, width, height, image::ColorType::Rgba8)
        .map_err(std::io::Error::other)
}

impl DisplaySink for PngDisplay {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "png_display_present",
        skip(self, output),
        fields(sink = %self.name, frame_id = output.frame_id)
    )]
    async fn present(&mut self, output: &DisplayOutput) -> Result<(), ContractError> {
        let due = self.presented.is_multiple_of(self.every_nth);
        self.presented += 1;
        if !due {
            return Ok(());
        }

        let dir = self.session_dir.clone();
        let owned = output.clone();
        let result = tokio::task::spawn_blocking(move || Self::write_output(&dir, &owned))
            .await
            .map_err(|e| ContractError::display_write(&self.name, e.to_string()))?;

        result.map_err(|e| {
            error!(sink = %self.name, frame_id = output.frame_id, error = %e, "Write failed");
            ContractError::display_write(&self.name, e.to_string())
        })?;

        self.written += 1;
        Ok(())
    }

    #[instrument(name = "png_display_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), ContractError> {
        Ok(())
    }

    #[instrument(name = "png_display_close", skip(self))]
    async fn close(&mut self) -> Result<(), ContractError> {
        debug!(sink = %self.name, written = self.written, "PngDisplay closed");
        Ok(())
    }
}
