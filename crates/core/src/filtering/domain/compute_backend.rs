use crate::filtering::domain::blur_radius::GaussianKernel;
use crate::filtering::domain::hue_matrix::HueMatrix;
use crate::shared::error::FilterResult;
use crate::shared::pixel_buffer::{PixelBuffer, PixelFormat};

/// Memory and kernel primitives of a compute device.
///
/// `Image` buffers hold pixels in the device's own layout; `Scratch` buffers
/// hold float RGBA intermediates for the blur. Kernels only ever read the
/// input and write the buffers handed to them.
pub trait ComputeBackend: Send {
    type Image: Send;
    type Scratch: Send;

    fn name(&self) -> &'static str;

    /// Copy `image` into a new device buffer. Called once per configuration.
    fn upload(&self, image: &PixelBuffer) -> FilterResult<Self::Image>;

    /// Allocate a device buffer that kernels write and `synchronize` reads back.
    fn allocate_output(
        &self,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> FilterResult<Self::Image>;

    /// Allocate a float intermediate buffer of `width * height` pixels.
    fn allocate_scratch(&self, width: u32, height: u32) -> FilterResult<Self::Scratch>;

    /// `output = matrix * input.rgb` per pixel, alpha copied through.
    fn color_matrix(
        &self,
        input: &Self::Image,
        matrix: &HueMatrix,
        output: &mut Self::Image,
    ) -> FilterResult<()>;

    /// Horizontal pass into `scratch[0]`, vertical pass into `scratch[1]`,
    /// then quantize into `output`. Edges replicate the border pixel.
    fn gaussian_blur(
        &self,
        input: &Self::Image,
        kernel: &GaussianKernel,
        scratch: &mut [Self::Scratch; 2],
        output: &mut Self::Image,
    ) -> FilterResult<()>;

    /// Make the last device write to `buffer` visible in `image`.
    fn synchronize(&self, buffer: &Self::Image, image: &mut PixelBuffer) -> FilterResult<()>;
}
