/// Smallest accepted Gaussian blur radius, in pixels.
pub const MIN_BLUR_RADIUS: f32 = 1.0;
/// Largest accepted Gaussian blur radius, in pixels.
pub const MAX_BLUR_RADIUS: f32 = 25.0;

/// Compute shader workgroup edge; must match `@workgroup_size` in the WGSL sources.
pub const WORKGROUP_SIZE: u32 = 16;

pub const CPU_PROCESSOR_NAME: &str = "CPU Reference";
pub const GPU_PROCESSOR_NAME: &str = "wgpu Compute";

pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];
