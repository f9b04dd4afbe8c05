use std::fmt;
use std::str::FromStr;

use crate::filtering::domain::image_processor::ImageProcessor;
use crate::shared::error::{FilterError, FilterResult};

use super::filter_pipeline::{CpuImageProcessor, GpuImageProcessor};
use super::gpu_backend::GpuBackend;

/// Which compute backend a host wants its processor to run on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BackendPreference {
    /// GPU when an adapter is present, otherwise CPU.
    #[default]
    Auto,
    Cpu,
    Gpu,
}

impl fmt::Display for BackendPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendPreference::Auto => write!(f, "auto"),
            BackendPreference::Cpu => write!(f, "cpu"),
            BackendPreference::Gpu => write!(f, "gpu"),
        }
    }
}

impl FromStr for BackendPreference {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(BackendPreference::Auto),
            "cpu" => Ok(BackendPreference::Cpu),
            "gpu" => Ok(BackendPreference::Gpu),
            _ => Err(FilterError::invalid_parameter(
                "backend",
                s,
                "one of auto, cpu, gpu",
            )),
        }
    }
}

/// Creates an image processor for the requested backend.
///
/// `Auto` probes for a wgpu adapter and falls back to the CPU reference
/// implementation when none is found. `Gpu` fails instead of falling back.
/// Logs which backend is selected.
pub fn create_processor(preference: BackendPreference) -> FilterResult<Box<dyn ImageProcessor>> {
    match preference {
        BackendPreference::Cpu => {
            log::info!("Using CPU backend for image filters");
            Ok(Box::new(CpuImageProcessor::cpu()))
        }
        BackendPreference::Gpu => match GpuBackend::try_new() {
            Some(backend) => Ok(Box::new(gpu_processor(backend))),
            None => Err(FilterError::BackendUnavailable(
                "no wgpu adapter found".to_string(),
            )),
        },
        BackendPreference::Auto => match GpuBackend::try_new() {
            Some(backend) => Ok(Box::new(gpu_processor(backend))),
            None => {
                log::warn!("No GPU available, falling back to CPU backend for image filters");
                Ok(Box::new(CpuImageProcessor::cpu()))
            }
        },
    }
}

fn gpu_processor(backend: GpuBackend) -> GpuImageProcessor {
    log::info!(
        "Using GPU backend for image filters ({})",
        backend.context().adapter_name
    );
    GpuImageProcessor::new(backend)
}

/// Returns true if a GPU adapter is available for compute shaders.
pub fn gpu_available() -> bool {
    GpuBackend::try_new().is_some()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::pixel_buffer::{PixelBuffer, PixelFormat};
    use rstest::rstest;

    #[rstest]
    #[case("auto", BackendPreference::Auto)]
    #[case("CPU", BackendPreference::Cpu)]
    #[case("gpu", BackendPreference::Gpu)]
    fn test_parse_preference(#[case] input: &str, #[case] expected: BackendPreference) {
        assert_eq!(input.parse::<BackendPreference>().unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown_preference_fails() {
        assert!("vulkan".parse::<BackendPreference>().is_err());
    }

    #[test]
    fn test_display_round_trips_through_parse() {
        for pref in [
            BackendPreference::Auto,
            BackendPreference::Cpu,
            BackendPreference::Gpu,
        ] {
            assert_eq!(pref.to_string().parse::<BackendPreference>().unwrap(), pref);
        }
    }

    #[test]
    fn test_cpu_processor_always_created() {
        let processor = create_processor(BackendPreference::Cpu).unwrap();
        assert_eq!(processor.name(), "CPU Reference");
    }

    #[test]
    fn test_auto_processor_filters() {
        let mut processor = create_processor(BackendPreference::Auto).unwrap();
        let input = PixelBuffer::filled(8, 8, PixelFormat::Rgba8, &[40, 80, 120, 255]);
        processor.configure(&input, 1).unwrap();
        let out = processor.blur(2.0, 0).unwrap();
        assert!(out
            .data()
            .iter()
            .zip(input.data())
            .all(|(&a, &b)| (a as i32 - b as i32).abs() <= 1));
    }

    #[test]
    fn test_gpu_request_matches_availability() {
        assert_eq!(
            create_processor(BackendPreference::Gpu).is_ok(),
            gpu_available()
        );
    }
}
