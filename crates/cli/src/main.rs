mod image_io;

use std::fmt;
use std::path::{Path, PathBuf};
use std::process;
use std::time::{Duration, Instant};

use clap::Parser;

use image_filter_core::filtering::domain::image_processor::ImageProcessor;
use image_filter_core::filtering::infrastructure::processor_factory::{
    create_processor, BackendPreference,
};
use image_filter_core::shared::constants::{MAX_BLUR_RADIUS, MIN_BLUR_RADIUS};
use image_filter_core::shared::error::FilterResult;
use image_filter_core::shared::pixel_buffer::PixelBuffer;

use crate::image_io::{is_image, load_image, save_image};

/// Hue rotation and Gaussian blur for images, on the GPU or the CPU.
#[derive(Parser)]
#[command(name = "image-filter")]
struct Cli {
    /// Input image file.
    input: PathBuf,

    /// Directory the filtered images are written to.
    output_dir: PathBuf,

    /// Compute backend: auto, gpu or cpu.
    #[arg(long, default_value = "auto")]
    backend: BackendPreference,

    /// Number of output slots to allocate.
    #[arg(long, default_value = "2")]
    outputs: usize,

    /// Hue rotation in degrees.
    #[arg(long, allow_hyphen_values = true)]
    hue_degrees: Option<f32>,

    /// Gaussian blur radius in pixels (1.0-25.0).
    #[arg(long)]
    blur_radius: Option<f32>,

    /// Times each filter runs, for timing comparisons between backends.
    #[arg(long, default_value = "1")]
    iterations: u32,
}

/// One filter call of a run.
#[derive(Clone, Copy, Debug, PartialEq)]
enum FilterStep {
    Hue { degrees: f32 },
    Blur { radius: f32 },
}

impl FilterStep {
    fn apply<'a>(
        self,
        processor: &'a mut dyn ImageProcessor,
        slot: usize,
    ) -> FilterResult<&'a PixelBuffer> {
        match self {
            FilterStep::Hue { degrees } => processor.rotate_hue(degrees.to_radians(), slot),
            FilterStep::Blur { radius } => processor.blur(radius, slot),
        }
    }

    fn file_tag(self) -> String {
        match self {
            FilterStep::Hue { degrees } => format!("hue{degrees}"),
            FilterStep::Blur { radius } => format!("blur{radius}"),
        }
    }
}

impl fmt::Display for FilterStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterStep::Hue { degrees } => write!(f, "rotate_hue({degrees}°)"),
            FilterStep::Blur { radius } => write!(f, "blur({radius})"),
        }
    }
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let image = load_image(&cli.input)?;
    log::info!(
        "Loaded {} ({}x{} {:?})",
        cli.input.display(),
        image.width(),
        image.height(),
        image.format()
    );

    let mut processor = create_processor(cli.backend)?;
    let backend_name = processor.name().to_string();
    processor.configure(&image, cli.outputs)?;

    let steps = plan_steps(&cli);
    let stem = cli
        .input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("image");

    for (i, step) in steps.into_iter().enumerate() {
        let slot = i % cli.outputs;
        let start = Instant::now();
        for _ in 1..cli.iterations {
            step.apply(processor.as_mut(), slot)?;
        }
        let result = step.apply(processor.as_mut(), slot)?;
        let per_call = start.elapsed() / cli.iterations;
        log::info!(
            "{backend_name}: {step} into slot {slot} took {} per call over {} call(s)",
            format_duration(per_call),
            cli.iterations
        );

        let path = output_path(&cli.output_dir, stem, slot, step);
        save_image(&path, result)?;
        log::info!("Output written to {}", path.display());
    }

    processor.cleanup();
    Ok(())
}

fn plan_steps(cli: &Cli) -> Vec<FilterStep> {
    let hue = cli.hue_degrees.map(|degrees| FilterStep::Hue { degrees });
    let blur = cli.blur_radius.map(|radius| FilterStep::Blur { radius });
    hue.into_iter().chain(blur).collect()
}

fn output_path(dir: &Path, stem: &str, slot: usize, step: FilterStep) -> PathBuf {
    dir.join(format!("{stem}_slot{slot}_{}.png", step.file_tag()))
}

fn format_duration(d: Duration) -> String {
    format!("{:.3} ms", d.as_secs_f64() * 1000.0)
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if !cli.input.exists() {
        return Err(format!("Input file not found: {}", cli.input.display()).into());
    }
    if !is_image(&cli.input) {
        return Err(format!("Unsupported image format: {}", cli.input.display()).into());
    }
    if cli.outputs == 0 {
        return Err("Outputs must be at least 1".into());
    }
    if cli.iterations == 0 {
        return Err("Iterations must be at least 1".into());
    }
    if cli.hue_degrees.is_none() && cli.blur_radius.is_none() {
        return Err("Nothing to do: pass --hue-degrees and/or --blur-radius".into());
    }
    if let Some(radius) = cli.blur_radius {
        if !(MIN_BLUR_RADIUS..=MAX_BLUR_RADIUS).contains(&radius) {
            return Err(format!(
                "Blur radius must be between {MIN_BLUR_RADIUS} and {MAX_BLUR_RADIUS}, got {radius}"
            )
            .into());
        }
    }
    Ok(())
}
