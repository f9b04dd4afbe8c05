use crate::shared::error::FilterResult;
use crate::shared::pixel_buffer::PixelBuffer;

/// Domain interface for an image filter engine.
///
/// A processor is configured once with an input image and a number of output
/// slots, then any filter may be run into any slot. Each filter call returns the
/// CPU-visible image of the slot it wrote. Backends are interchangeable behind
/// this trait; hosts pick one at composition time.
pub trait ImageProcessor: Send {
    /// Identifier distinguishing this backend from other implementations.
    fn name(&self) -> &str;

    /// Upload `input` and allocate `output_count` output slots, replacing any
    /// previous configuration.
    fn configure(&mut self, input: &PixelBuffer, output_count: usize) -> FilterResult<()>;

    /// Rotate the hue of the input image by `radians` into slot `output_index`.
    fn rotate_hue(&mut self, radians: f32, output_index: usize) -> FilterResult<&PixelBuffer>;

    /// Gaussian-blur the input image with `radius` into slot `output_index`.
    fn blur(&mut self, radius: f32, output_index: usize) -> FilterResult<&PixelBuffer>;

    /// Release every buffer. Safe to call repeatedly.
    fn cleanup(&mut self);
}
