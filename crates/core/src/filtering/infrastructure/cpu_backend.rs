use ndarray::Array3;

use crate::filtering::domain::blur_radius::GaussianKernel;
use crate::filtering::domain::compute_backend::ComputeBackend;
use crate::filtering::domain::hue_matrix::HueMatrix;
use crate::shared::constants::CPU_PROCESSOR_NAME;
use crate::shared::error::{FilterError, FilterResult};
use crate::shared::pixel_buffer::{PixelBuffer, PixelFormat};

use super::gaussian;

/// Reference backend that runs every kernel on the calling thread.
///
/// Device buffers are plain host allocations, so synchronizing an output is
/// an in-place copy into the caller-visible image.
#[derive(Clone, Copy, Debug, Default)]
pub struct CpuBackend;

impl CpuBackend {
    pub fn new() -> Self {
        Self
    }
}

fn ensure_same_shape(a: &PixelBuffer, b: &PixelBuffer) -> FilterResult<()> {
    if a.same_shape(b) {
        Ok(())
    } else {
        Err(FilterError::backend(format!(
            "buffer shape mismatch: {}x{} {:?} vs {}x{} {:?}",
            a.width(),
            a.height(),
            a.format(),
            b.width(),
            b.height(),
            b.format()
        )))
    }
}

impl ComputeBackend for CpuBackend {
    type Image = PixelBuffer;
    type Scratch = Array3<f32>;

    fn name(&self) -> &'static str {
        CPU_PROCESSOR_NAME
    }

    fn upload(&self, image: &PixelBuffer) -> FilterResult<PixelBuffer> {
        Ok(image.clone())
    }

    fn allocate_output(
        &self,
        width: u32,
        height: u32,
        format: PixelFormat,
    ) -> FilterResult<PixelBuffer> {
        Ok(PixelBuffer::blank(width, height, format))
    }

    fn allocate_scratch(&self, width: u32, height: u32) -> FilterResult<Array3<f32>> {
        Ok(gaussian::scratch_plane(width as usize, height as usize))
    }

    fn color_matrix(
        &self,
        input: &PixelBuffer,
        matrix: &HueMatrix,
        output: &mut PixelBuffer,
    ) -> FilterResult<()> {
        ensure_same_shape(input, output)?;
        let channels = input.channels();

        for (out, inp) in output
            .data_mut()
            .chunks_exact_mut(channels)
            .zip(input.data().chunks_exact(channels))
        {
            out[..3].copy_from_slice(&matrix.apply_to_pixel(inp));
            // Alpha and any trailing channels pass through untouched.
            out[3..].copy_from_slice(&inp[3..]);
        }

        Ok(())
    }

    fn gaussian_blur(
        &self,
        input: &PixelBuffer,
        kernel: &GaussianKernel,
        scratch: &mut [Array3<f32>; 2],
        output: &mut PixelBuffer,
    ) -> FilterResult<()> {
        ensure_same_shape(input, output)?;
        let expected = (input.height() as usize, input.width() as usize);
        for plane in scratch.iter() {
            let (h, w, _) = plane.dim();
            if (h, w) != expected {
                return Err(FilterError::backend(format!(
                    "scratch plane is {w}x{h}, expected {}x{}",
                    expected.1, expected.0
                )));
            }
        }

        gaussian::separable_blur(
            input.as_ndarray(),
            kernel.weights(),
            scratch,
            output.as_ndarray_mut(),
        );
        Ok(())
    }

    fn synchronize(&self, buffer: &PixelBuffer, image: &mut PixelBuffer) -> FilterResult<()> {
        ensure_same_shape(buffer, image)?;
        image.data_mut().copy_from_slice(buffer.data());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filtering::domain::blur_radius::BlurRadius;
    use crate::filtering::domain::hue_matrix::build_hue_rotation_matrix;

    fn kernel(radius: f32) -> GaussianKernel {
        GaussianKernel::new(BlurRadius::new(radius).unwrap())
    }

    fn scratch(backend: &CpuBackend, w: u32, h: u32) -> [Array3<f32>; 2] {
        [
            backend.allocate_scratch(w, h).unwrap(),
            backend.allocate_scratch(w, h).unwrap(),
        ]
    }

    #[test]
    fn test_upload_is_independent_copy() {
        let backend = CpuBackend::new();
        let mut image = PixelBuffer::filled(2, 2, PixelFormat::Rgba8, &[1, 2, 3, 4]);
        let uploaded = backend.upload(&image).unwrap();
        image.data_mut()[0] = 99;
        assert_eq!(uploaded.pixel(0, 0), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_color_matrix_identity_copies_input() {
        let backend = CpuBackend::new();
        let input = PixelBuffer::filled(3, 3, PixelFormat::Rgba8, &[10, 20, 30, 77]);
        let mut output = backend.allocate_output(3, 3, PixelFormat::Rgba8).unwrap();
        backend
            .color_matrix(&input, &HueMatrix::identity(), &mut output)
            .unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_color_matrix_preserves_alpha() {
        let backend = CpuBackend::new();
        let input = PixelBuffer::filled(2, 1, PixelFormat::Rgba8, &[255, 0, 0, 42]);
        let mut output = backend.allocate_output(2, 1, PixelFormat::Rgba8).unwrap();
        backend
            .color_matrix(&input, &build_hue_rotation_matrix(2.0), &mut output)
            .unwrap();
        assert_eq!(output.pixel(0, 0)[3], 42);
        assert_eq!(output.pixel(1, 0)[3], 42);
    }

    #[test]
    fn test_color_matrix_on_rgb() {
        let backend = CpuBackend::new();
        let input = PixelBuffer::filled(2, 2, PixelFormat::Rgb8, &[255, 0, 0]);
        let mut output = backend.allocate_output(2, 2, PixelFormat::Rgb8).unwrap();
        backend
            .color_matrix(
                &input,
                &build_hue_rotation_matrix(std::f32::consts::PI),
                &mut output,
            )
            .unwrap();
        assert_eq!(output.pixel(1, 1), &[0, 152, 152]);
    }

    #[test]
    fn test_color_matrix_rejects_mismatched_output() {
        let backend = CpuBackend::new();
        let input = PixelBuffer::blank(2, 2, PixelFormat::Rgba8);
        let mut output = backend.allocate_output(3, 2, PixelFormat::Rgba8).unwrap();
        let err = backend
            .color_matrix(&input, &HueMatrix::identity(), &mut output)
            .unwrap_err();
        assert!(matches!(err, FilterError::Backend(_)));
    }

    #[test]
    fn test_blur_uniform_image_unchanged() {
        let backend = CpuBackend::new();
        let input = PixelBuffer::filled(6, 5, PixelFormat::Rgba8, &[30, 60, 90, 255]);
        let mut output = backend.allocate_output(6, 5, PixelFormat::Rgba8).unwrap();
        let mut planes = scratch(&backend, 6, 5);
        backend
            .gaussian_blur(&input, &kernel(4.0), &mut planes, &mut output)
            .unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_blur_rejects_wrong_scratch_size() {
        let backend = CpuBackend::new();
        let input = PixelBuffer::blank(6, 5, PixelFormat::Rgba8);
        let mut output = backend.allocate_output(6, 5, PixelFormat::Rgba8).unwrap();
        let mut planes = scratch(&backend, 5, 6);
        assert!(backend
            .gaussian_blur(&input, &kernel(1.0), &mut planes, &mut output)
            .is_err());
    }

    #[test]
    fn test_synchronize_copies_into_existing_image() {
        let backend = CpuBackend::new();
        let buffer = PixelBuffer::filled(2, 2, PixelFormat::Rgb8, &[5, 6, 7]);
        let mut image = PixelBuffer::blank(2, 2, PixelFormat::Rgb8);
        let before = image.data().as_ptr();
        backend.synchronize(&buffer, &mut image).unwrap();
        assert_eq!(image, buffer);
        assert_eq!(image.data().as_ptr(), before);
    }

    #[test]
    fn test_name() {
        assert_eq!(CpuBackend::new().name(), "CPU Reference");
    }
}
