use crate::filtering::domain::blur_radius::{BlurRadius, GaussianKernel};
use crate::filtering::domain::compute_backend::ComputeBackend;
use crate::filtering::domain::hue_matrix::build_hue_rotation_matrix;
use crate::filtering::domain::image_processor::ImageProcessor;
use crate::shared::error::{FilterError, FilterResult};
use crate::shared::pixel_buffer::PixelBuffer;

use super::buffer_manager::BufferManager;
use super::cpu_backend::CpuBackend;
use super::gpu_backend::GpuBackend;

/// Hue-rotation and blur filters over a compute backend.
///
/// Unconfigured until `configure` succeeds; `cleanup` returns it there.
/// Every filter call dispatches into one slot, synchronizes that slot and
/// returns its CPU-visible image. Other slots are never touched.
pub struct ImageFilterPipeline<B: ComputeBackend> {
    backend: B,
    buffers: Option<BufferManager<B>>,
}

pub type CpuImageProcessor = ImageFilterPipeline<CpuBackend>;
pub type GpuImageProcessor = ImageFilterPipeline<GpuBackend>;

impl<B: ComputeBackend> ImageFilterPipeline<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            buffers: None,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn is_configured(&self) -> bool {
        self.buffers.is_some()
    }

    /// Number of output slots, or 0 when unconfigured.
    pub fn output_count(&self) -> usize {
        self.buffers.as_ref().map_or(0, BufferManager::output_count)
    }

    /// The last synchronized image of slot `index`.
    pub fn output(&self, index: usize) -> FilterResult<&PixelBuffer> {
        let buffers = self.buffers.as_ref().ok_or(FilterError::NotConfigured)?;
        buffers.output_slot(index).map(|(image, _)| image)
    }
}

impl CpuImageProcessor {
    pub fn cpu() -> Self {
        Self::new(CpuBackend::new())
    }
}

impl Default for CpuImageProcessor {
    fn default() -> Self {
        Self::cpu()
    }
}

impl<B: ComputeBackend> ImageProcessor for ImageFilterPipeline<B> {
    fn name(&self) -> &str {
        self.backend.name()
    }

    fn configure(&mut self, input: &PixelBuffer, output_count: usize) -> FilterResult<()> {
        // Build the replacement first so a failure keeps the old configuration.
        let buffers = BufferManager::configure(&self.backend, input, output_count)?;
        log::info!(
            "{}: configured {}x{} {:?} input with {} output slot(s)",
            self.backend.name(),
            input.width(),
            input.height(),
            input.format(),
            output_count
        );
        self.buffers = Some(buffers);
        Ok(())
    }

    fn rotate_hue(&mut self, radians: f32, output_index: usize) -> FilterResult<&PixelBuffer> {
        let buffers = self.buffers.as_mut().ok_or(FilterError::NotConfigured)?;
        let targets = buffers.dispatch_targets(output_index)?;

        let matrix = build_hue_rotation_matrix(radians);
        log::debug!("rotate_hue({radians}) into slot {output_index}");
        self.backend
            .color_matrix(targets.input, &matrix, targets.output)?;

        buffers.synchronize(&self.backend, output_index)
    }

    fn blur(&mut self, radius: f32, output_index: usize) -> FilterResult<&PixelBuffer> {
        let radius = BlurRadius::new(radius)?;
        let buffers = self.buffers.as_mut().ok_or(FilterError::NotConfigured)?;
        let targets = buffers.dispatch_targets(output_index)?;

        let kernel = GaussianKernel::new(radius);
        log::debug!(
            "blur(radius={}, taps={}) into slot {output_index}",
            radius.value(),
            kernel.len()
        );
        self.backend
            .gaussian_blur(targets.input, &kernel, targets.scratch, targets.output)?;

        buffers.synchronize(&self.backend, output_index)
    }

    fn cleanup(&mut self) {
        if self.buffers.take().is_some() {
            log::debug!("{}: released all buffers", self.backend.name());
        }
    }
}
