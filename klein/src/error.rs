use thiserror::Error;

/// Errors raised at the boundary of the automaton: construction and seeding.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum KleinError {
    #[error("grid {width}x{height} is invalid: both sides must be powers of two and height at least 2")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("invalid {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

impl KleinError {
    pub(crate) fn parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, KleinError>;
