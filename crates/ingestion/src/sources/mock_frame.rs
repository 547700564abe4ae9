//! Mock screen capture
//!
//! Emits a synthetic desktop (solid colour or RGB gradient) at a fixed rate.
//! The pixel buffer is built once and shared between frames.

use bytes::Bytes;
use contracts::{
    CaptureConfig, CapturedFrame, ContractError, FrameSource, MockPattern, PixelFormat,
    SessionClock,
};
use tracing::{debug, trace};

use super::pacer::Pacer;

/// Build the pixels of a synthetic desktop
pub fn render_pattern(pattern: MockPattern, width: u32, height: u32, color: [u8; 4]) -> Bytes {
    let mut data = Vec::with_capacity(width as usize * height as usize * 4);
    match pattern {
        MockPattern::Solid => {
            for _ in 0..(width as usize * height as usize) {
                data.extend_from_slice(&color);
            }
        }
        MockPattern::Gradient => {
            let wmax = width.saturating_sub(1).max(1) as f32;
            let hmax = height.saturating_sub(1).max(1) as f32;
            for y in 0..height {
                let g = (y as f32 / hmax * 255.0).round() as u8;
                for x in 0..width {
                    let r = (x as f32 / wmax * 255.0).round() as u8;
                    data.extend_from_slice(&[r, g, 128, 255]);
                }
            }
        }
    }
    Bytes::from(data)
}

/// Synthetic desktop source
#[derive(Debug)]
pub struct MockFrameSource {
    name: String,
    width: u32,
    height: u32,
    pixels: Bytes,
    clock: SessionClock,
    pacer: Pacer,
    next_id: u64,
    fail_after: Option<u64>,
    closed: bool,
}

impl MockFrameSource {
    pub fn new(config: &CaptureConfig, clock: SessionClock) -> Self {
        Self {
            name: "mock_capture".to_string(),
            width: config.width,
            height: config.height,
            pixels: render_pattern(config.pattern, config.width, config.height, config.color),
            clock,
            pacer: Pacer::new(config.fps),
            next_id: 0,
            fail_after: None,
            closed: false,
        }
    }

    /// Report `CaptureLost` after `frames` frames
    pub fn fail_after(mut self, frames: u64) -> Self {
        self.fail_after = Some(frames);
        self
    }

    pub fn frames_emitted(&self) -> u64 {
        self.next_id
    }
}

impl FrameSource for MockFrameSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn next_frame(&mut self) -> Result<CapturedFrame, ContractError> {
        if self.closed {
            return Err(ContractError::capture_lost("capture source closed"));
        }
        if self.fail_after.is_some_and(|limit| self.next_id >= limit) {
            return Err(ContractError::capture_lost("mock display unplugged"));
        }

        self.pacer.tick().await;

        let frame = CapturedFrame {
            frame_id: self.next_id,
            timestamp: self.clock.now(),
            width: self.width,
            height: self.height,
            format: PixelFormat::Rgba8,
            data: self.pixels.clone(),
        };
        self.next_id += 1;

        trace!(frame_id = frame.frame_id, timestamp = frame.timestamp, "mock frame captured");
        Ok(frame)
    }

    async fn close(&mut self) -> Result<(), ContractError> {
        if !self.closed {
            debug!(frames = self.next_id, period = ?self.pacer.period(), "mock capture closed");
            self.closed = true;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(pattern: MockPattern) -> CaptureConfig {
        CaptureConfig {
            width: 8,
            height: 4,
            fps: 500.0,
            pattern,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_frames_are_sequential_and_valid() {
        let mut source = MockFrameSource::new(&config(MockPattern::Gradient), SessionClock::start());

        let mut last_ts = -1.0;
        for expected in 0..3 {
            let frame = source.next_frame().await.unwrap();
            assert_eq!(frame.frame_id, expected);
            assert!(frame.validate().is_ok());
            assert!(frame.timestamp >= last_ts);
            last_ts = frame.timestamp;
        }
        assert_eq!(source.frames_emitted(), 3);
    }

    #[test]
    fn test_gradient_corners() {
        let pixels = render_pattern(MockPattern::Gradient, 8, 4, [0; 4]);
        assert_eq!(&pixels[0..4], &[0, 0, 128, 255]);
        let last = pixels.len() - 4;
        assert_eq!(&pixels[last..], &[255, 255, 128, 255]);
    }

    #[tokio::test]
    async fn test_solid_pattern_uses_colour() {
        let mut cfg = config(MockPattern::Solid);
        cfg.color = [1, 2, 3, 255];
        let mut source = MockFrameSource::new(&cfg, SessionClock::start());

        let frame = source.next_frame().await.unwrap();
        assert_eq!(frame.rgba_at(7, 3), [1, 2, 3, 255]);
    }

    #[tokio::test]
    async fn test_capture_lost_after_limit_and_close() {
        let mut source =
            MockFrameSource::new(&config(MockPattern::Solid), SessionClock::start()).fail_after(1);
        assert!(source.next_frame().await.is_ok());
        let err = source.next_frame().await.unwrap_err();
        assert!(err.is_fatal());

        let mut source = MockFrameSource::new(&config(MockPattern::Solid), SessionClock::start());
        source.close().await.unwrap();
        assert!(source.next_frame().await.unwrap_err().is_fatal());
    }
}
