//! Display composition of an eye pair

use contracts::{DisplayLayout, DisplaySurface, EyeBuffer, StereoFrame};

/// Left eye in the left half, right eye in the right half
///
/// Heights may differ; the shorter eye is padded with opaque black.
pub fn compose_side_by_side(left: &EyeBuffer, right: &EyeBuffer) -> DisplaySurface {
    let width = left.width + right.width;
    let height = left.height.max(right.height);
    let row_bytes = width as usize * 4;

    let mut data = vec![0u8; row_bytes * height as usize];
    for px in data.chunks_exact_mut(4) {
        px[3] = 255;
    }

    for (eye, x_offset) in [(left, 0usize), (right, left.width as usize)] {
        let eye_row = eye.width as usize * 4;
        for y in 0..eye.height as usize {
            let src = &eye.data[y * eye_row..(y + 1) * eye_row];
            let start = y * row_bytes + x_offset * 4;
            data[start..start + eye_row].copy_from_slice(src);
        }
    }

    DisplaySurface::SideBySide {
        width,
        height,
        data,
    }
}

/// Surface for the configured layout
pub fn compose(stereo: StereoFrame, layout: DisplayLayout) -> DisplaySurface {
    match layout {
        DisplayLayout::SideBySide => compose_side_by_side(&stereo.left, &stereo.right),
        DisplayLayout::Dual => DisplaySurface::Dual {
            left: stereo.left,
            right: stereo.right,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{EyeSide, TrackingStatus};

    fn filled(side: EyeSide, w: u32, h: u32, rgba: [u8; 4]) -> EyeBuffer {
        let mut buffer = EyeBuffer::new(side, w, h);
        for px in buffer.data.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
        buffer
    }

    #[test]
    fn test_side_by_side_layout() {
        let left = filled(EyeSide::Left, 3, 2, [255, 0, 0, 255]);
        let right = filled(EyeSide::Right, 3, 2, [0, 0, 255, 255]);
        let DisplaySurface::SideBySide {
            width,
            height,
            data,
        } = compose_side_by_side(&left, &right)
        else {
            panic!("expected side-by-side surface");
        };
        assert_eq!((width, height), (6, 2));
        let px = |x: usize, y: usize| &data[(y * 6 + x) * 4..(y * 6 + x) * 4 + 4];
        assert_eq!(px(2, 1), [255, 0, 0, 255]);
        assert_eq!(px(3, 0), [0, 0, 255, 255]);
    }

    #[test]
    fn test_dual_passes_buffers_through() {
        let stereo = StereoFrame {
            left: filled(EyeSide::Left, 2, 2, [1, 1, 1, 255]),
            right: filled(EyeSide::Right, 2, 2, [2, 2, 2, 255]),
            tracking: TrackingStatus::Live,
        };
        let surface = compose(stereo.clone(), DisplayLayout::Dual);
        assert_eq!(
            surface,
            DisplaySurface::Dual {
                left: stereo.left,
                right: stereo.right
            }
        );
    }
}
