use thiserror::Error;

pub type FilterResult<T> = Result<T, FilterError>;

/// Errors surfaced by image processors.
///
/// Parameter, index and state errors are raised before any allocation or
/// backend dispatch, so they never leave a processor partially mutated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("invalid {name} {value}, must be {expected}")]
    InvalidParameter {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("output index {index} out of range for {count} output slots")]
    IndexOutOfRange { index: usize, count: usize },
    #[error("processor is not configured; call configure() first")]
    NotConfigured,
    #[error("compute backend unavailable: {0}")]
    BackendUnavailable(String),
    #[error("compute backend failure: {0}")]
    Backend(String),
}

impl FilterError {
    pub fn invalid_parameter(
        name: &'static str,
        value: impl ToString,
        expected: &'static str,
    ) -> Self {
        Self::InvalidParameter {
            name,
            value: value.to_string(),
            expected,
        }
    }

    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_parameter_message_names_value() {
        let err = FilterError::invalid_parameter("radius", 30.5, "within [1.0, 25.0]");
        assert_eq!(
            err.to_string(),
            "invalid radius 30.5, must be within [1.0, 25.0]"
        );
    }

    #[test]
    fn test_index_out_of_range_message() {
        let err = FilterError::IndexOutOfRange { index: 3, count: 2 };
        assert_eq!(
            err.to_string(),
            "output index 3 out of range for 2 output slots"
        );
    }

    #[test]
    fn test_backend_prefix_is_stable() {
        assert!(FilterError::backend("map failed")
            .to_string()
            .starts_with("compute backend failure:"));
    }
}
