//! Error types for elimination-order search.

use thiserror::Error;

/// Errors raised while building graphs, running searches or checking orders.
///
/// Everything here is recoverable at the call site: the coordinator discards
/// failed runs and only surfaces [`OrderError::NoOrderFound`] when no run at
/// all succeeded.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OrderError {
    /// Every remaining candidate violates the active early-termination bounds.
    #[error("no variables left to pick under the current bounds")]
    NoVariablesLeft,

    /// The induced width crossed the configured bound mid-run.
    #[error("induced width {width} exceeded bound {bound}")]
    WidthExceeded { width: usize, bound: usize },

    /// The accumulated log10 complexity crossed the configured bound mid-run.
    #[error("complexity {complexity:.4} exceeded bound {bound:.4}")]
    ComplexityExceeded { complexity: f64, bound: f64 },

    /// An arena (edge records or index-set slots) could not grow.
    #[error("out of memory: {0}")]
    OutOfMemory(&'static str),

    /// Bad caller input: empty problems, out-of-range ids, broken orders.
    #[error("malformed input: {0}")]
    MalformedInput(String),

    /// A structural self-check failed.
    #[error("inconsistent state: {0}")]
    Inconsistent(String),

    /// No search run completed successfully.
    #[error("no elimination order found")]
    NoOrderFound,
}

impl OrderError {
    /// True for the errors that only mean "this run cannot beat the best".
    pub fn is_abandoned_run(&self) -> bool {
        matches!(
            self,
            OrderError::NoVariablesLeft
                | OrderError::WidthExceeded { .. }
                | OrderError::ComplexityExceeded { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, OrderError>;
