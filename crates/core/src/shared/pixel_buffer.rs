use ndarray::{ArrayView3, ArrayViewMut3};

/// Interleaved 8-bit pixel layout of a [`PixelBuffer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Rgb8,
    Rgba8,
}

impl PixelFormat {
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Rgb8 => 3,
            PixelFormat::Rgba8 => 4,
        }
    }

    pub fn has_alpha(self) -> bool {
        matches!(self, PixelFormat::Rgba8)
    }
}

/// A CPU-visible image: contiguous interleaved bytes in row-major order.
///
/// This is the exchange type at the processor boundary. Filters never
/// define its layout beyond `width * height * format.channels()` bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    data: Vec<u8>,
    width: u32,
    height: u32,
    format: PixelFormat,
}

impl PixelBuffer {
    pub fn new(data: Vec<u8>, width: u32, height: u32, format: PixelFormat) -> Self {
        debug_assert_eq!(
            data.len(),
            (width as usize) * (height as usize) * format.channels(),
            "data length must equal width * height * channels"
        );
        Self {
            data,
            width,
            height,
            format,
        }
    }

    /// A zero-filled buffer with the given shape.
    pub fn blank(width: u32, height: u32, format: PixelFormat) -> Self {
        let len = (width as usize) * (height as usize) * format.channels();
        Self::new(vec![0; len], width, height, format)
    }

    /// A buffer where every pixel holds `pixel` (length must match the format).
    pub fn filled(width: u32, height: u32, format: PixelFormat, pixel: &[u8]) -> Self {
        debug_assert_eq!(pixel.len(), format.channels());
        let data = pixel
            .iter()
            .copied()
            .cycle()
            .take((width as usize) * (height as usize) * format.channels())
            .collect();
        Self::new(data, width, height, format)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    pub fn channels(&self) -> usize {
        self.format.channels()
    }

    pub fn pixel_count(&self) -> usize {
        (self.width as usize) * (self.height as usize)
    }

    /// Channel values of the pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let c = self.channels();
        let start = ((y as usize) * (self.width as usize) + x as usize) * c;
        &self.data[start..start + c]
    }

    pub fn pixel_mut(&mut self, x: u32, y: u32) -> &mut [u8] {
        let c = self.channels();
        let start = ((y as usize) * (self.width as usize) + x as usize) * c;
        &mut self.data[start..start + c]
    }

    /// True when both buffers have identical width, height and format.
    pub fn same_shape(&self, other: &PixelBuffer) -> bool {
        self.width == other.width && self.height == other.height && self.format == other.format
    }

    pub fn as_ndarray(&self) -> ArrayView3<'_, u8> {
        ArrayView3::from_shape(self.shape(), &self.data)
            .expect("PixelBuffer data length must match dimensions")
    }

    pub fn as_ndarray_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        ArrayViewMut3::from_shape(self.shape(), &mut self.data)
            .expect("PixelBuffer data length must match dimensions")
    }

    fn shape(&self) -> (usize, usize, usize) {
        (self.height as usize, self.width as usize, self.channels())
    }
}
