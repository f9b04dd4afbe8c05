use crate::shared::constants::{MAX_BLUR_RADIUS, MIN_BLUR_RADIUS};
use crate::shared::error::{FilterError, FilterResult};

/// A blur radius validated to lie within `[MIN_BLUR_RADIUS, MAX_BLUR_RADIUS]`.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct BlurRadius(f32);

impl BlurRadius {
    pub fn new(radius: f32) -> FilterResult<Self> {
        // NaN fails both comparisons, so test for containment rather than exclusion.
        if (MIN_BLUR_RADIUS..=MAX_BLUR_RADIUS).contains(&radius) {
            Ok(Self(radius))
        } else {
            Err(FilterError::invalid_parameter(
                "radius",
                radius,
                "within [1.0, 25.0]",
            ))
        }
    }

    pub fn value(self) -> f32 {
        self.0
    }

    /// Standard deviation of the Gaussian for this radius.
    pub fn sigma(self) -> f32 {
        0.4 * self.0 + 0.6
    }

    /// Number of taps on each side of the center tap.
    pub fn half_width(self) -> usize {
        self.0.ceil() as usize
    }
}

/// Normalized 1-D Gaussian weights, `2 * half_width + 1` taps, symmetric about the center.
#[derive(Clone, Debug, PartialEq)]
pub struct GaussianKernel {
    weights: Vec<f32>,
}

impl GaussianKernel {
    pub fn new(radius: BlurRadius) -> Self {
        let sigma = radius.sigma() as f64;
        let half = radius.half_width() as i64;
        let mut weights_f64: Vec<f64> = (-half..=half)
            .map(|i| {
                let x = i as f64;
                (-x * x / (2.0 * sigma * sigma)).exp()
            })
            .collect();
        let sum: f64 = weights_f64.iter().sum();
        for w in &mut weights_f64 {
            *w /= sum;
        }
        Self {
            weights: weights_f64.iter().map(|&w| w as f32).collect(),
        }
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn half_width(&self) -> usize {
        self.weights.len() / 2
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[rstest]
    #[case::min(1.0)]
    #[case::fractional(2.5)]
    #[case::mid(12.0)]
    #[case::max(25.0)]
    fn test_in_range_radius_accepted(#[case] radius: f32) {
        assert_eq!(BlurRadius::new(radius).unwrap().value(), radius);
    }

    #[rstest]
    #[case::below(0.99)]
    #[case::zero(0.0)]
    #[case::negative(-3.0)]
    #[case::above(25.01)]
    #[case::nan(f32::NAN)]
    #[case::infinite(f32::INFINITY)]
    fn test_out_of_range_radius_rejected(#[case] radius: f32) {
        let err = BlurRadius::new(radius).unwrap_err();
        assert!(matches!(
            err,
            FilterError::InvalidParameter { name: "radius", .. }
        ));
    }

    #[test]
    fn test_rejection_names_offending_value() {
        let err = BlurRadius::new(30.0).unwrap_err();
        assert!(err.to_string().contains("30"));
    }

    #[test]
    fn test_sigma_and_half_width() {
        let r = BlurRadius::new(2.5).unwrap();
        assert_relative_eq!(r.sigma(), 1.6);
        assert_eq!(r.half_width(), 3);
    }

    #[rstest]
    #[case(1.0, 3)]
    #[case(4.2, 11)]
    #[case(25.0, 51)]
    fn test_kernel_length(#[case] radius: f32, #[case] expected: usize) {
        let k = GaussianKernel::new(BlurRadius::new(radius).unwrap());
        assert_eq!(k.len(), expected);
        assert_eq!(k.half_width(), (expected - 1) / 2);
    }

    #[test]
    fn test_kernel_sums_to_one() {
        let k = GaussianKernel::new(BlurRadius::new(7.0).unwrap());
        let sum: f32 = k.weights().iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_kernel_is_symmetric() {
        let k = GaussianKernel::new(BlurRadius::new(7.0).unwrap());
        let w = k.weights();
        for i in 0..w.len() / 2 {
            assert_eq!(w[i], w[w.len() - 1 - i]);
        }
    }

    #[test]
    fn test_kernel_decays_from_center() {
        let k = GaussianKernel::new(BlurRadius::new(5.0).unwrap());
        let w = k.weights();
        let center = k.half_width();
        for i in center..w.len() - 1 {
            assert!(w[i] > w[i + 1]);
        }
    }
}
