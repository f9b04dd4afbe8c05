pub mod buffer_manager;
pub mod cpu_backend;
pub mod filter_pipeline;
mod gaussian;
pub mod gpu_backend;
pub mod gpu_context;
pub mod processor_factory;
