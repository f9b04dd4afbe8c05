use std::sync::Arc;

use crate::filtering::domain::blur_radius::GaussianKernel;
use crate::filtering::domain::compute_backend::ComputeBackend;
use crate::filtering::domain::hue_matrix::HueMatrix;
use crate::shared::constants::GPU_PROCESSOR_NAME;
use crate::shared::error::{FilterError, FilterResult};
use crate::shared::pixel_buffer::{PixelBuffer, PixelFormat};

use super::gpu_context::{BlurBindings, GpuBlurParams, GpuColorMatrixParams, GpuContext};

const PACKED_PIXEL_BYTES: u64 = 4;
const SCRATCH_PIXEL_BYTES: u64 = 16;

/// A device-resident image: one packed RGBA8 `u32` per pixel.
///
/// Output images also own a mappable readback buffer; the uploaded input
/// does not, since it is never read back.
pub struct GpuImage {
    storage: wgpu::Buffer,
    readback: Option<wgpu::Buffer>,
    width: u32,
    height: u32,
    format: PixelFormat,
}

impl GpuImage {
    fn byte_size(&self) -> u64 {
        pixel_count(self.width, self.height) * PACKED_PIXEL_BYTES
    }
}

/// A float RGBA plane used between blur passes.
pub struct GpuScratch {
    buffer: wgpu::Buffer,
    width: u32,
    height: u32,
}

fn pixel_count(width: u32, height: u32) -> u64 {
    width as u64 * height as u64
}

/// Pack interleaved 8-bit pixels as little-endian RGBA `u32`s; RGB gets opaque alpha.
pub fn pack_pixels(image: &PixelBuffer) -> Vec<u32> {
    let channels = image.channels();
    image
        .data()
        .chunks_exact(channels)
        .map(|px| {
            let alpha = if channels == 4 { px[3] } else { u8::MAX };
            u32::from_le_bytes([px[0], px[1], px[2], alpha])
        })
        .collect()
}

/// Unpack RGBA `u32`s into `image`, dropping alpha for RGB images.
pub fn unpack_pixels(packed: &[u32], image: &mut PixelBuffer) {
    let channels = image.channels();
    for (px, &value) in image
        .data_mut()
        .chunks_exact_mut(channels)
        .zip(packed.iter())
    {
        px.copy_from_slice(&value.to_le_bytes()[..channels]);
    }
}

/// Compute backend running the filter kernels as wgpu compute shaders.
///
/// Kernel calls only submit work; the queue is drained in `synchronize`,
/// which copies the output into its readback buffer and maps it.
pub struct GpuBackend {
    ctx: Arc<GpuContext>,
}

impl GpuBackend {
    pub fn new(ctx: Arc<GpuContext>) -> Self {
        Self { ctx }
    }

    /// Probe for an adapter and build a backend on it.
    pub fn try_new() -> Option<Self> {
        GpuContext::new().map(|ctx| Self::new(Arc::new(ctx)))
    }

    pub fn context(&self) -> &GpuContext {
        &self.ctx
    }
}

fn ensure_same_shape(a: &GpuImage, b: &GpuImage) -> FilterResult<()> {
    if a.width == b.width && a.height == b.height {
        Ok(())
    } else {
        Err(FilterError::backend(format!(
            "device image shape mismatch: {}x{} vs {}x{}",
            a.width, a.height, b.width, b.height
        )))
    }
}

impl ComputeBackend for GpuBackend {
    type Image = GpuImage;
    type Scratch = GpuScratch;

    fn name(&self) -> &'static str {
        GPU_PROCESSOR_NAME
    }

    fn upload(&self, image: &PixelBuffer) -> FilterResult<GpuImage> {
        let (width, height) = (image.width(), image.height());
        let storage = self.ctx.create_buffer(
            "input",
            pixel_count(width, height) * PACKED_PIXEL_BYTES,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_DST,
        )?;
        self.ctx
            .queue
            .write_buffer(&storage, 0, bytemuck::cast_slice(&pack_pixels(image)));
        log::debug!("Uploaded {width}x{height} input to {}", self.ctx.adapter_name);

        Ok(GpuImage {
            storage,
            readback: None,
            width,
            height,
            format: image.format(),
        })
    }

    fn allocate_output(
        &self,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> FilterResult<GpuImage> {
        let size = pixel_count(width, height) * PACKED_PIXEL_BYTES;
        let storage = self.ctx.create_buffer(
            "output",
            size,
            wgpu::BufferUsages::STORAGE | wgpu::BufferUsages::COPY_SRC,
        )?;
        let readback = self.ctx.create_buffer(
            "readback",
            size,
            wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
        )?;

        Ok(GpuImage {
            storage,
            readback: Some(readback),
            width,
            height,
            format,
        })
    }

    fn allocate_scratch(&self, width: u32, height: u32) -> FilterResult<GpuScratch> {
        let buffer = self.ctx.create_buffer(
            "scratch",
            pixel_count(width, height) * SCRATCH_PIXEL_BYTES,
            wgpu::BufferUsages::STORAGE,
        )?;
        Ok(GpuScratch {
            buffer,
            width,
            height,
        })
    }

    fn color_matrix(
        &self,
        input: &GpuImage,
        matrix: &HueMatrix,
        output: &mut GpuImage,
    ) -> FilterResult<()> {
        ensure_same_shape(input, output)?;
        let rows = *matrix.rows();
        let params = GpuColorMatrixParams {
            rows: rows.map(|[a, b, c]| [a, b, c, 0.0]),
            width: input.width,
            height: input.height,
            _pad0: 0,
            _pad1: 0,
        };
        self.ctx
            .run_color_matrix(&params, &input.storage, &output.storage)
    }

    fn gaussian_blur(
        &self,
        input: &GpuImage,
        kernel: &GaussianKernel,
        scratch: &mut [GpuScratch; 2],
        output: &mut GpuImage,
    ) -> FilterResult<()> {
        ensure_same_shape(input, output)?;
        if scratch
            .iter()
            .any(|s| s.width != input.width || s.height != input.height)
        {
            return Err(FilterError::backend("scratch planes do not match input size"));
        }

        let params = GpuBlurParams {
            width: input.width,
            height: input.height,
            kernel_radius: kernel.half_width() as u32,
            _pad: 0,
        };
        let [scratch_a, scratch_b] = scratch;
        self.ctx.run_blur(
            &params,
            kernel.weights(),
            BlurBindings {
                input: &input.storage,
                scratch_a: &scratch_a.buffer,
                scratch_b: &scratch_b.buffer,
                output: &output.storage,
            },
        )
    }

    fn synchronize(&self, buffer: &GpuImage, image: &mut PixelBuffer) -> FilterResult<()> {
        if buffer.width != image.width()
            || buffer.height != image.height()
            || buffer.format != image.format()
        {
            return Err(FilterError::backend(
                "host image does not match device buffer shape",
            ));
        }
        let readback = buffer
            .readback
            .as_ref()
            .ok_or_else(|| FilterError::backend("buffer has no readback staging"))?;

        let packed = self
            .ctx
            .read_back(&buffer.storage, readback, buffer.byte_size())?;
        unpack_pixels(&packed, image);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filtering::domain::blur_radius::BlurRadius;
    use crate::filtering::domain::hue_matrix::build_hue_rotation_matrix;

    fn try_gpu_backend() -> Option<GpuBackend> {
        GpuBackend::try_new()
    }

    #[test]
    fn test_pack_rgba_is_little_endian() {
        let image = PixelBuffer::new(vec![1, 2, 3, 4], 1, 1, PixelFormat::Rgba8);
        assert_eq!(pack_pixels(&image), vec![0x0403_0201]);
    }

    #[test]
    fn test_pack_rgb_adds_opaque_alpha() {
        let image = PixelBuffer::new(vec![1, 2, 3], 1, 1, PixelFormat::Rgb8);
        assert_eq!(pack_pixels(&image), vec![0xff03_0201]);
    }

    #[test]
    fn test_unpack_inverts_pack() {
        let source = PixelBuffer::new(
            vec![10, 20, 30, 40, 50, 60, 70, 80],
            2,
            1,
            PixelFormat::Rgba8,
        );
        let mut target = PixelBuffer::blank(2, 1, PixelFormat::Rgba8);
        unpack_pixels(&pack_pixels(&source), &mut target);
        assert_eq!(target, source);
    }

    #[test]
    fn test_unpack_into_rgb_drops_alpha() {
        let mut target = PixelBuffer::blank(1, 1, PixelFormat::Rgb8);
        unpack_pixels(&[0x8003_0201], &mut target);
        assert_eq!(target.data(), &[1, 2, 3]);
    }

    #[test]
    fn test_identity_matrix_round_trips_input() {
        let backend = match try_gpu_backend() {
            Some(b) => b,
            None => return,
        };
        let input = PixelBuffer::filled(5, 3, PixelFormat::Rgba8, &[10, 20, 30, 200]);
        let uploaded = backend.upload(&input).unwrap();
        let mut output = backend.allocate_output(5, 3, PixelFormat::Rgba8).unwrap();
        backend
            .color_matrix(&uploaded, &HueMatrix::identity(), &mut output)
            .unwrap();

        let mut image = PixelBuffer::blank(5, 3, PixelFormat::Rgba8);
        backend.synchronize(&output, &mut image).unwrap();
        assert_eq!(image, input);
    }

    #[test]
    fn test_hue_rotation_matches_cpu_formula() {
        let backend = match try_gpu_backend() {
            Some(b) => b,
            None => return,
        };
        let input = PixelBuffer::filled(4, 4, PixelFormat::Rgba8, &[200, 100, 50, 255]);
        let matrix = build_hue_rotation_matrix(1.0);
        let uploaded = backend.upload(&input).unwrap();
        let mut output = backend.allocate_output(4, 4, PixelFormat::Rgba8).unwrap();
        backend.color_matrix(&uploaded, &matrix, &mut output).unwrap();

        let mut image = PixelBuffer::blank(4, 4, PixelFormat::Rgba8);
        backend.synchronize(&output, &mut image).unwrap();
        let expected = matrix.apply_to_pixel(&[200, 100, 50]);
        for (got, want) in image.pixel(2, 2)[..3].iter().zip(expected) {
            assert!((*got as i32 - want as i32).abs() <= 1);
        }
        assert_eq!(image.pixel(2, 2)[3], 255);
    }

    #[test]
    fn test_blur_uniform_image_unchanged() {
        let backend = match try_gpu_backend() {
            Some(b) => b,
            None => return,
        };
        let input = PixelBuffer::filled(20, 20, PixelFormat::Rgb8, &[90, 90, 90]);
        let uploaded = backend.upload(&input).unwrap();
        let mut output = backend.allocate_output(20, 20, PixelFormat::Rgb8).unwrap();
        let mut scratch = [
            backend.allocate_scratch(20, 20).unwrap(),
            backend.allocate_scratch(20, 20).unwrap(),
        ];
        let kernel = GaussianKernel::new(BlurRadius::new(5.0).unwrap());
        backend
            .gaussian_blur(&uploaded, &kernel, &mut scratch, &mut output)
            .unwrap();

        let mut image = PixelBuffer::blank(20, 20, PixelFormat::Rgb8);
        backend.synchronize(&output, &mut image).unwrap();
        assert!(image.data().iter().all(|&v| (v as i32 - 90).abs() <= 1));
    }

    #[test]
    fn test_synchronize_input_without_readback_fails() {
        let backend = match try_gpu_backend() {
            Some(b) => b,
            None => return,
        };
        let input = PixelBuffer::blank(2, 2, PixelFormat::Rgba8);
        let uploaded = backend.upload(&input).unwrap();
        let mut image = PixelBuffer::blank(2, 2, PixelFormat::Rgba8);
        assert!(backend.synchronize(&uploaded, &mut image).is_err());
    }
}
