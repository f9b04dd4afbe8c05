use std::sync::Arc;

use crate::shared::constants::WORKGROUP_SIZE;
use crate::shared::error::{FilterError, FilterResult};

/// Shared GPU state for the filter kernels.
///
/// Holds the wgpu device, queue and the compiled compute pipelines so they
/// are created once and reused by every configuration and filter call.
pub struct GpuContext {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    pub adapter_name: String,
    color_matrix_pipeline: wgpu::ComputePipeline,
    color_matrix_layout: wgpu::BindGroupLayout,
    blur_horizontal_pipeline: wgpu::ComputePipeline,
    blur_vertical_pipeline: wgpu::ComputePipeline,
    blur_quantize_pipeline: wgpu::ComputePipeline,
    blur_layout: wgpu::BindGroupLayout,
}

/// Packed params matching the color matrix WGSL uniform (64 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuColorMatrixParams {
    pub rows: [[f32; 4]; 3],
    pub width: u32,
    pub height: u32,
    pub _pad0: u32,
    pub _pad1: u32,
}

/// Packed params matching the blur WGSL uniform (16 bytes).
#[repr(C)]
#[derive(Clone, Copy, Debug, bytemuck::Pod, bytemuck::Zeroable)]
pub struct GpuBlurParams {
    pub width: u32,
    pub height: u32,
    pub kernel_radius: u32,
    pub _pad: u32,
}

/// Buffers bound for one blur dispatch chain.
pub struct BlurBindings<'a> {
    pub input: &'a wgpu::Buffer,
    pub scratch_a: &'a wgpu::Buffer,
    pub scratch_b: &'a wgpu::Buffer,
    pub output: &'a wgpu::Buffer,
}

fn buffer_entry(binding: u32, ty: wgpu::BufferBindingType) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::COMPUTE,
        ty: wgpu::BindingType::Buffer {
            ty,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

/// Weights, input, two scratch planes and output.
const BLUR_STORAGE_BINDINGS: u32 = 5;

const UNIFORM: wgpu::BufferBindingType = wgpu::BufferBindingType::Uniform;
const STORAGE_READ: wgpu::BufferBindingType = wgpu::BufferBindingType::Storage { read_only: true };
const STORAGE_RW: wgpu::BufferBindingType = wgpu::BufferBindingType::Storage { read_only: false };

impl GpuContext {
    /// Create a new GPU context. Returns `None` if no suitable adapter is available.
    pub fn new() -> Option<Self> {
        let instance = wgpu::Instance::default();
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::HighPerformance,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))?;
        let adapter_name = adapter.get_info().name;
        let adapter_limits = adapter.limits();

        let (device, queue) = pollster::block_on(adapter.request_device(
            &wgpu::DeviceDescriptor {
                label: Some("filter-device"),
                required_features: wgpu::Features::empty(),
                required_limits: wgpu::Limits {
                    max_storage_buffers_per_shader_stage: BLUR_STORAGE_BINDINGS,
                    max_storage_buffer_binding_size: adapter_limits.max_storage_buffer_binding_size,
                    max_buffer_size: adapter_limits.max_buffer_size,
                    ..wgpu::Limits::downlevel_defaults()
                },
                memory_hints: wgpu::MemoryHints::Performance,
            },
            None,
        ))
        .ok()?;

        let device = Arc::new(device);
        let queue = Arc::new(queue);

        let color_matrix_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("color-matrix-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/color_matrix.wgsl").into()),
        });
        let blur_shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("gaussian-blur-shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("shaders/gaussian_blur.wgsl").into()),
        });

        let color_matrix_layout =
            device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                label: Some("color-matrix-bind-group-layout"),
                entries: &[
                    // params uniform
                    buffer_entry(0, UNIFORM),
                    // input pixels (read)
                    buffer_entry(1, STORAGE_READ),
                    // output pixels (read-write)
                    buffer_entry(2, STORAGE_RW),
                ],
            });

        let blur_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("blur-bind-group-layout"),
            entries: &[
                buffer_entry(0, UNIFORM),
                // kernel weights
                buffer_entry(1, STORAGE_READ),
                buffer_entry(2, STORAGE_READ),
                // float scratch planes
                buffer_entry(3, STORAGE_RW),
                buffer_entry(4, STORAGE_RW),
                buffer_entry(5, STORAGE_RW),
            ],
        });

        let color_matrix_pipeline = Self::create_pipeline(
            &device,
            "color-matrix-pipeline",
            &color_matrix_layout,
            &color_matrix_shader,
            "main",
        );
        let blur_horizontal_pipeline = Self::create_pipeline(
            &device,
            "blur-horizontal-pipeline",
            &blur_layout,
            &blur_shader,
            "blur_horizontal",
        );
        let blur_vertical_pipeline = Self::create_pipeline(
            &device,
            "blur-vertical-pipeline",
            &blur_layout,
            &blur_shader,
            "blur_vertical",
        );
        let blur_quantize_pipeline = Self::create_pipeline(
            &device,
            "blur-quantize-pipeline",
            &blur_layout,
            &blur_shader,
            "blur_quantize",
        );

        Some(Self {
            device,
            queue,
            adapter_name,
            color_matrix_pipeline,
            color_matrix_layout,
            blur_horizontal_pipeline,
            blur_vertical_pipeline,
            blur_quantize_pipeline,
            blur_layout,
        })
    }

    fn create_pipeline(
        device: &wgpu::Device,
        label: &str,
        layout: &wgpu::BindGroupLayout,
        module: &wgpu::ShaderModule,
        entry_point: &str,
    ) -> wgpu::ComputePipeline {
        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some(label),
            bind_group_layouts: &[layout],
            push_constant_ranges: &[],
        });
        device.create_compute_pipeline(&wgpu::ComputePipelineDescriptor {
            label: Some(label),
            layout: Some(&pipeline_layout),
            module,
            entry_point: Some(entry_point),
            compilation_options: Default::default(),
            cache: None,
        })
    }

    /// Allocate a buffer, surfacing out-of-memory and validation failures as errors.
    pub fn create_buffer(
        &self,
        label: &str,
        size: u64,
        usage: wgpu::BufferUsages,
    ) -> FilterResult<wgpu::Buffer> {
        let limits = self.device.limits();
        if size > limits.max_buffer_size
            || (usage.contains(wgpu::BufferUsages::STORAGE)
                && size > limits.max_storage_buffer_binding_size as u64)
        {
            return Err(FilterError::backend(format!(
                "{label} buffer of {size} bytes exceeds device limits"
            )));
        }

        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);
        let buffer = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage,
            mapped_at_creation: false,
        });
        let validation = pollster::block_on(self.device.pop_error_scope());
        let out_of_memory = pollster::block_on(self.device.pop_error_scope());

        match validation.or(out_of_memory) {
            Some(err) => Err(FilterError::backend(format!(
                "failed to allocate {label} buffer: {err}"
            ))),
            None => Ok(buffer),
        }
    }

    /// Create a uniform/storage buffer and fill it with `contents`.
    fn create_filled_buffer(
        &self,
        label: &str,
        contents: &[u8],
        usage: wgpu::BufferUsages,
    ) -> FilterResult<wgpu::Buffer> {
        let buffer = self.create_buffer(
            label,
            contents.len() as u64,
            usage | wgpu::BufferUsages::COPY_DST,
        )?;
        self.queue.write_buffer(&buffer, 0, contents);
        Ok(buffer)
    }

    fn workgroups(width: u32, height: u32) -> (u32, u32) {
        (width.div_ceil(WORKGROUP_SIZE), height.div_ceil(WORKGROUP_SIZE))
    }

    /// Apply a color matrix from `input` into `output`. Submits without waiting.
    pub fn run_color_matrix(
        &self,
        params: &GpuColorMatrixParams,
        input: &wgpu::Buffer,
        output: &wgpu::Buffer,
    ) -> FilterResult<()> {
        let params_buf = self.create_filled_buffer(
            "color-matrix-params",
            bytemuck::bytes_of(params),
            wgpu::BufferUsages::UNIFORM,
        )?;

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("bg-color-matrix"),
            layout: &self.color_matrix_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: input.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: output.as_entire_binding(),
                },
            ],
        });

        let (wx, wy) = Self::workgroups(params.width, params.height);
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("enc-color-matrix"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some("color-matrix"),
                timestamp_writes: None,
            });
            pass.set_pipeline(&self.color_matrix_pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(wx, wy, 1);
        }
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    /// Run horizontal, vertical and quantize passes. Submits without waiting.
    pub fn run_blur(
        &self,
        params: &GpuBlurParams,
        weights: &[f32],
        buffers: BlurBindings<'_>,
    ) -> FilterResult<()> {
        let params_buf = self.create_filled_buffer(
            "blur-params",
            bytemuck::bytes_of(params),
            wgpu::BufferUsages::UNIFORM,
        )?;
        let weights_buf = self.create_filled_buffer(
            "blur-weights",
            bytemuck::cast_slice(weights),
            wgpu::BufferUsages::STORAGE,
        )?;

        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("bg-blur"),
            layout: &self.blur_layout,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: params_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: weights_buf.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 2,
                    resource: buffers.input.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 3,
                    resource: buffers.scratch_a.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 4,
                    resource: buffers.scratch_b.as_entire_binding(),
                },
                wgpu::BindGroupEntry {
                    binding: 5,
                    resource: buffers.output.as_entire_binding(),
                },
            ],
        });

        let (wx, wy) = Self::workgroups(params.width, params.height);
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("enc-blur"),
            });
        for (label, pipeline) in [
            ("horizontal", &self.blur_horizontal_pipeline),
            ("vertical", &self.blur_vertical_pipeline),
            ("quantize", &self.blur_quantize_pipeline),
        ] {
            let mut pass = encoder.begin_compute_pass(&wgpu::ComputePassDescriptor {
                label: Some(label),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(wx, wy, 1);
        }
        self.queue.submit(Some(encoder.finish()));
        Ok(())
    }

    /// Copy `storage` into the mappable `readback` buffer, wait for the GPU and
    /// return the mapped contents.
    pub fn read_back(
        &self,
        storage: &wgpu::Buffer,
        readback: &wgpu::Buffer,
        size: u64,
    ) -> FilterResult<Vec<u32>> {
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("enc-readback"),
            });
        encoder.copy_buffer_to_buffer(storage, 0, readback, 0, size);
        self.queue.submit(Some(encoder.finish()));

        let (tx, rx) = crossbeam_channel::bounded(1);
        let slice = readback.slice(..size);
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        let _ = self.device.poll(wgpu::Maintain::Wait);

        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                return Err(FilterError::backend(format!("readback map failed: {err}")));
            }
            Err(_) => return Err(FilterError::backend("readback map was never resolved")),
        }

        let mapped = slice.get_mapped_range();
        let result: Vec<u32> = bytemuck::cast_slice(&mapped).to_vec();
        drop(mapped);
        readback.unmap();

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_layouts_match_wgsl_sizes() {
        assert_eq!(std::mem::size_of::<GpuColorMatrixParams>(), 64);
        assert_eq!(std::mem::size_of::<GpuBlurParams>(), 16);
    }

    #[test]
    fn test_workgroups_round_up() {
        assert_eq!(GpuContext::workgroups(1, 1), (1, 1));
        assert_eq!(GpuContext::workgroups(16, 17), (1, 2));
        assert_eq!(GpuContext::workgroups(100, 33), (7, 3));
    }

    #[test]
    fn test_oversized_buffer_is_rejected() {
        let ctx = match GpuContext::new() {
            Some(c) => c,
            None => return,
        };
        let err = ctx
            .create_buffer("huge", u64::MAX / 2, wgpu::BufferUsages::STORAGE)
            .unwrap_err();
        assert!(err.to_string().contains("exceeds device limits"));
    }
}
