pub mod blur_radius;
pub mod compute_backend;
pub mod hue_matrix;
pub mod image_processor;
