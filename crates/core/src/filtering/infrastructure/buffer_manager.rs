use crate::filtering::domain::compute_backend::ComputeBackend;
use crate::shared::error::{FilterError, FilterResult};
use crate::shared::pixel_buffer::PixelBuffer;

/// One addressable output: a device buffer and its CPU-visible image.
pub struct OutputSlot<B: ComputeBackend> {
    image: PixelBuffer,
    buffer: B::Image,
}

/// Borrowed device buffers for a single kernel dispatch into one slot.
///
/// The input is shared read-only; scratch and the target slot are exclusive.
pub struct DispatchTargets<'a, B: ComputeBackend> {
    pub input: &'a B::Image,
    pub scratch: &'a mut [B::Scratch; 2],
    pub output: &'a mut B::Image,
}

/// Owns every buffer of one configuration.
///
/// The input mirror is uploaded once at construction and only ever lent out
/// immutably. Scratch planes are allocated once and never resized. All
/// buffers are released together when the manager is dropped.
pub struct BufferManager<B: ComputeBackend> {
    input: B::Image,
    scratch: [B::Scratch; 2],
    outputs: Vec<OutputSlot<B>>,
    width: u32,
    height: u32,
}

impl<B: ComputeBackend> BufferManager<B> {
    /// Validate, upload `input` and allocate `output_count` slots.
    ///
    /// Validation runs before any allocation, so a rejected call touches no
    /// backend memory.
    pub fn configure(backend: &B, input: &PixelBuffer, output_count: usize) -> FilterResult<Self> {
        if output_count == 0 {
            return Err(FilterError::invalid_parameter(
                "output count",
                output_count,
                "at least 1",
            ));
        }
        if input.width() == 0 || input.height() == 0 {
            return Err(FilterError::invalid_parameter(
                "input size",
                format!("{}x{}", input.width(), input.height()),
                "non-empty",
            ));
        }

        let (width, height, format) = (input.width(), input.height(), input.format());
        let mirror = backend.upload(input)?;
        let scratch = [
            backend.allocate_scratch(width, height)?,
            backend.allocate_scratch(width, height)?,
        ];
        let outputs = (0..output_count)
            .map(|_| {
                Ok(OutputSlot {
                    image: PixelBuffer::blank(width, height, format),
                    buffer: backend.allocate_output(width, height, format)?,
                })
            })
            .collect::<FilterResult<Vec<_>>>()?;

        Ok(Self {
            input: mirror,
            scratch,
            outputs,
            width,
            height,
        })
    }

    pub fn output_count(&self) -> usize {
        self.outputs.len()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Read-only view of the uploaded input mirror.
    pub fn input(&self) -> &B::Image {
        &self.input
    }

    fn check_index(&self, index: usize) -> FilterResult<()> {
        if index < self.outputs.len() {
            Ok(())
        } else {
            Err(FilterError::IndexOutOfRange {
                index,
                count: self.outputs.len(),
            })
        }
    }

    /// The CPU-visible image and device buffer of slot `index`.
    pub fn output_slot(&self, index: usize) -> FilterResult<(&PixelBuffer, &B::Image)> {
        self.check_index(index)?;
        let slot = &self.outputs[index];
        Ok((&slot.image, &slot.buffer))
    }

    /// Split borrows so a kernel can read the input while writing slot `index`.
    pub fn dispatch_targets(&mut self, index: usize) -> FilterResult<DispatchTargets<'_, B>> {
        self.check_index(index)?;
        Ok(DispatchTargets {
            input: &self.input,
            scratch: &mut self.scratch,
            output: &mut self.outputs[index].buffer,
        })
    }

    /// Make the last device write to slot `index` visible in its CPU image.
    pub fn synchronize(&mut self, backend: &B, index: usize) -> FilterResult<&PixelBuffer> {
        self.check_index(index)?;
        let slot = &mut self.outputs[index];
        backend.synchronize(&slot.buffer, &mut slot.image)?;
        Ok(&slot.image)
    }
}
