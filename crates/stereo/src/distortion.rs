//! Lens pre-distortion remap tables.
//!
//! For a destination pixel (x, y):
//!   n = ((x + 0.5 - c_x) / R, (y + 0.5 - c_y) / R),  R = max(w, h) / 2
//!   scale = 1 + k1·r² + k2·r⁴
//!   src = c + n·scale·R - 0.5   (clamped to the buffer)
//! The lens centre is shifted by `center_offset_x·R`, mirrored for the right eye.

use contracts::{DistortionKey, EyeBuffer, EyeParameters, EyeSide};

use crate::sampling::{bilinear_taps, blend};

/// One destination pixel of a remap table
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemapEntry {
    /// Fractional source coordinate
    pub src_x: f32,
    pub src_y: f32,
    /// Top-left neighbour
    pub x0: u32,
    pub y0: u32,
    /// Bilinear weights: top-left, top-right, bottom-left, bottom-right
    pub weights: [f32; 4],
}

/// Per-eye remap table
#[derive(Debug, Clone, PartialEq)]
pub struct DistortionMap {
    pub key: DistortionKey,
    pub fingerprint: u64,
    pub width: u32,
    pub height: u32,
    pub entries: Vec<RemapEntry>,
}

impl DistortionMap {
    /// Build the table for one eye; O(width·height), deterministic
    pub fn build(params: &EyeParameters, side: EyeSide) -> Self {
        let w = params.eye_width;
        let h = params.eye_height;
        let lens = params.lens(side);

        let radius = w.max(h) as f64 / 2.0;
        let offset = match side {
            EyeSide::Left => lens.center_offset_x,
            EyeSide::Right => -lens.center_offset_x,
        };
        let cx = w as f64 / 2.0 + offset * radius;
        let cy = h as f64 / 2.0;

        let mut entries = Vec::with_capacity(w as usize * h as usize);
        for y in 0..h {
            let ny = (y as f64 + 0.5 - cy) / radius;
            for x in 0..w {
                let nx = (x as f64 + 0.5 - cx) / radius;
                let r2 = nx * nx + ny * ny;
                let scale = 1.0 + lens.k1 * r2 + lens.k2 * r2 * r2;

                let sx = (cx + nx * scale * radius - 0.5).clamp(0.0, (w - 1) as f64) as f32;
                let sy = (cy + ny * scale * radius - 0.5).clamp(0.0, (h - 1) as f64) as f32;
                let (x0, y0, _, _, weights) = bilinear_taps(sx, sy, w, h);

                entries.push(RemapEntry {
                    src_x: sx,
                    src_y: sy,
                    x0,
                    y0,
                    weights,
                });
            }
        }

        Self {
            key: params.distortion_key(side),
            fingerprint: params.fingerprint(),
            width: w,
            height: h,
            entries,
        }
    }

    /// Warp an undistorted eye buffer through the table
    ///
    /// The buffer must match the table dimensions.
    pub fn apply(&self, source: &EyeBuffer) -> EyeBuffer {
        debug_assert_eq!((source.width, source.height), (self.width, self.height));

        let mut out = EyeBuffer {
            side: source.side,
            width: self.width,
            height: self.height,
            data: vec![0u8; source.data.len()],
            frame_timestamp: source.frame_timestamp,
            orientation_timestamp: source.orientation_timestamp,
        };

        let max_x = self.width - 1;
        let max_y = self.height - 1;
        for (entry, dst) in self.entries.iter().zip(out.data.chunks_exact_mut(4)) {
            let x1 = (entry.x0 + 1).min(max_x);
            let y1 = (entry.y0 + 1).min(max_y);
            let px = blend(
                [
                    source.pixel(entry.x0, entry.y0),
                    source.pixel(x1, entry.y0),
                    source.pixel(entry.x0, y1),
                    source.pixel(x1, y1),
                ],
                entry.weights,
            );
            dst.copy_from_slice(&px);
        }
        out
    }

    /// Approximate heap size in bytes
    pub fn size_bytes(&self) -> usize {
        self.entries.len() * std::mem::size_of::<RemapEntry>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::LensCoefficients;

    fn small_params() -> EyeParameters {
        EyeParameters {
            eye_width: 64,
            eye_height: 48,
            left_lens: LensCoefficients {
                k1: 0.22,
                k2: 0.24,
                center_offset_x: 0.05,
            },
            right_lens: LensCoefficients {
                k1: 0.22,
                k2: 0.24,
                center_offset_x: 0.05,
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_build_is_deterministic() {
        let params = small_params();
        let a = DistortionMap::build(&params, EyeSide::Left);
        let b = DistortionMap::build(&params, EyeSide::Left);
        assert_eq!(a, b);
        assert_eq!(a.entries.len(), 64 * 48);
    }

    #[test]
    fn test_single_parameter_change_changes_map() {
        let base = small_params();
        let reference = DistortionMap::build(&base, EyeSide::Left);

        let mut k1 = base;
        k1.left_lens.k1 = 0.3;
        assert_ne!(reference.entries, DistortionMap::build(&k1, EyeSide::Left).entries);

        let mut k2 = base;
        k2.left_lens.k2 = 0.1;
        assert_ne!(reference.entries, DistortionMap::build(&k2, EyeSide::Left).entries);

        let mut offset = base;
        offset.left_lens.center_offset_x = 0.0;
        assert_ne!(
            reference.entries,
            DistortionMap::build(&offset, EyeSide::Left).entries
        );

        let mut size = base;
        size.eye_width = 66;
        assert_ne!(reference.entries, DistortionMap::build(&size, EyeSide::Left).entries);

        let mut ipd = base;
        ipd.ipd_m = 0.07;
        assert_ne!(reference.key, DistortionMap::build(&ipd, EyeSide::Left).key);
    }

    #[test]
    fn test_zero_coefficients_are_identity() {
        let params = EyeParameters {
            eye_width: 8,
            eye_height: 6,
            ..Default::default()
        };
        let map = DistortionMap::build(&params, EyeSide::Right);
        for (i, entry) in map.entries.iter().enumerate() {
            let x = (i % 8) as f32;
            let y = (i / 8) as f32;
            assert!((entry.src_x - x).abs() < 1e-4, "entry {i}: {entry:?}");
            assert!((entry.src_y - y).abs() < 1e-4);
        }
    }

    #[test]
    fn test_right_eye_centre_is_mirrored() {
        let params = small_params();
        let left = DistortionMap::build(&params, EyeSide::Left);
        let right = DistortionMap::build(&params, EyeSide::Right);

        // row through the centre: left entry x maps like right entry (w-1-x) mirrored
        let w = params.eye_width as usize;
        let row = (params.eye_height / 2) as usize * w;
        for x in 0..w {
            let l = left.entries[row + x].src_x;
            let r = right.entries[row + (w - 1 - x)].src_x;
            assert!((l - ((w - 1) as f32 - r)).abs() < 1e-3, "x={x}: {l} vs {r}");
        }
    }

    #[test]
    fn test_weights_normalised() {
        let map = DistortionMap::build(&small_params(), EyeSide::Left);
        for entry in &map.entries {
            assert!((entry.weights.iter().sum::<f32>() - 1.0).abs() < 1e-5);
            assert!(entry.x0 < map.width && entry.y0 < map.height);
        }
    }

    #[test]
    fn test_apply_preserves_solid_colour() {
        let params = small_params();
        let map = DistortionMap::build(&params, EyeSide::Left);
        let mut buffer = EyeBuffer::new(EyeSide::Left, 64, 48);
        for px in buffer.data.chunks_exact_mut(4) {
            px.copy_from_slice(&[200, 100, 50, 255]);
        }
        let warped = map.apply(&buffer);
        assert!(warped.data.chunks_exact(4).all(|p| p == [200, 100, 50, 255]));
    }
}
