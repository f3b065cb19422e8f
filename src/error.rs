use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("shape mismatch: {0}")]
    Shape(String),
    #[error("inconsistent exchange system: {0}")]
    Consistency(String),
    #[error("invalid parameter `{name}`: {reason}")]
    Parameter { name: &'static str, reason: String },
    #[error("invalid time grid: {0}")]
    Grid(#[from] GridError),
}

/// Reasons a time grid is rejected before any convolution is attempted.
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum GridError {
    #[error("time step must be positive and finite (found {0})")]
    NonPositiveStep(f64),
    #[error("time points must be finite (index {0})")]
    NotFinite(usize),
    #[error("negative time point at index {0}")]
    Negative(usize),
    #[error("time points must be strictly increasing (index {0})")]
    NotIncreasing(usize),
}

pub type Result<T> = std::result::Result<T, ModelError>;

impl ModelError {
    pub(crate) fn parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::Parameter {
            name,
            reason: reason.into(),
        }
    }
}
