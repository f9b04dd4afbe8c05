use ndarray::{Array3, ArrayView3, ArrayViewMut3};

/// Channels of a float scratch plane (RGBA; RGB images leave the last one unused).
pub const SCRATCH_CHANNELS: usize = 4;

/// Allocate a zeroed float scratch plane shaped `(height, width, 4)`.
pub fn scratch_plane(width: usize, height: usize) -> Array3<f32> {
    Array3::zeros((height, width, SCRATCH_CHANNELS))
}

/// Replicate-border index: `base + offset` clamped into `[0, len)`.
fn clamp_index(base: usize, offset: isize, len: usize) -> usize {
    (base as isize + offset).clamp(0, len as isize - 1) as usize
}

/// Horizontal pass: 8-bit `src` → float `dst`.
pub fn horizontal_pass(src: ArrayView3<'_, u8>, kernel: &[f32], dst: &mut Array3<f32>) {
    let (height, width, channels) = src.dim();
    let half = (kernel.len() / 2) as isize;

    for y in 0..height {
        for x in 0..width {
            for c in 0..channels {
                let mut sum = 0.0f32;
                for (k, &w) in kernel.iter().enumerate() {
                    let sx = clamp_index(x, k as isize - half, width);
                    sum += src[[y, sx, c]] as f32 * w;
                }
                dst[[y, x, c]] = sum;
            }
        }
    }
}

/// Vertical pass over the first `channels` channels: float `src` → float `dst`.
pub fn vertical_pass(src: &Array3<f32>, kernel: &[f32], channels: usize, dst: &mut Array3<f32>) {
    let (height, width, _) = src.dim();
    let half = (kernel.len() / 2) as isize;

    for y in 0..height {
        for x in 0..width {
            for c in 0..channels {
                let mut sum = 0.0f32;
                for (k, &w) in kernel.iter().enumerate() {
                    let sy = clamp_index(y, k as isize - half, height);
                    sum += src[[sy, x, c]] * w;
                }
                dst[[y, x, c]] = sum;
            }
        }
    }
}

/// Round and clamp a float plane into the channels of an 8-bit image.
pub fn quantize(src: &Array3<f32>, mut dst: ArrayViewMut3<'_, u8>) {
    let (height, width, channels) = dst.dim();
    for y in 0..height {
        for x in 0..width {
            for c in 0..channels {
                dst[[y, x, c]] = src[[y, x, c]].round().clamp(0.0, 255.0) as u8;
            }
        }
    }
}

/// Two-pass separable Gaussian blur through the two scratch planes.
pub fn separable_blur(
    src: ArrayView3<'_, u8>,
    kernel: &[f32],
    scratch: &mut [Array3<f32>; 2],
    dst: ArrayViewMut3<'_, u8>,
) {
    let channels = src.dim().2;
    let [horizontal, vertical] = scratch;
    horizontal_pass(src, kernel, horizontal);
    vertical_pass(horizontal, kernel, channels, vertical);
    quantize(vertical, dst);
}
