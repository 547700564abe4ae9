//! Pixel sampling helpers

use contracts::CapturedFrame;

/// Bilinear neighbours and weights for a fractional coordinate
///
/// Returns `(x0, y0, x1, y1, [w00, w10, w01, w11])`; the coordinate is clamped
/// to the image first.
#[inline]
pub fn bilinear_taps(x: f32, y: f32, width: u32, height: u32) -> (u32, u32, u32, u32, [f32; 4]) {
    let max_x = (width - 1) as f32;
    let max_y = (height - 1) as f32;
    let x = x.clamp(0.0, max_x);
    let y = y.clamp(0.0, max_y);

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    (
        x0,
        y0,
        x1,
        y1,
        [
            (1.0 - fx) * (1.0 - fy),
            fx * (1.0 - fy),
            (1.0 - fx) * fy,
            fx * fy,
        ],
    )
}

/// Blend four RGBA pixels, rounding to nearest
#[inline]
pub fn blend(pixels: [[u8; 4]; 4], weights: [f32; 4]) -> [u8; 4] {
    let mut out = [0u8; 4];
    for (c, slot) in out.iter_mut().enumerate() {
        let v = pixels[0][c] as f32 * weights[0]
            + pixels[1][c] as f32 * weights[1]
            + pixels[2][c] as f32 * weights[2]
            + pixels[3][c] as f32 * weights[3];
        *slot = v.round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Bilinear sample of a captured frame at pixel-centre coordinates
#[inline]
pub fn sample_frame(frame: &CapturedFrame, x: f32, y: f32) -> [u8; 4] {
    let (x0, y0, x1, y1, weights) = bilinear_taps(x, y, frame.width, frame.height);
    blend(
        [
            frame.rgba_at(x0, y0),
            frame.rgba_at(x1, y0),
            frame.rgba_at(x0, y1),
            frame.rgba_at(x1, y1),
        ],
        weights,
    )
}
