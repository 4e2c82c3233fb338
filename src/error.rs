//! Unified error type for the overlay engine.
//!
//! Nothing here is fatal to the host. Engine entry points log these and
//! drop the offending input; the detailed variants exist so callers that
//! want to know why something was rejected (tests, the CLI) can find out.

use thiserror::Error;

/// Errors produced while ingesting geometry, locations or configuration.
#[derive(Debug, Error)]
pub enum OverlayError {
    #[error("geometry type '{found}' is not a line type")]
    NotALineType { found: String },

    #[error("geometry has no coordinate sequence")]
    MissingCoordinates,

    #[error("{context}: {point_count} points, need at least {minimum_required}")]
    InsufficientPoints {
        context: String,
        point_count: usize,
        minimum_required: usize,
    },

    #[error("coordinate {index} is invalid: {reason}")]
    InvalidCoordinate { index: usize, reason: String },

    #[error("malformed route candidate: {reason}")]
    MalformedCandidate { reason: String },

    #[error("mapping capability is unavailable")]
    CapabilityUnavailable,

    #[error("location lookup failed: {reason}")]
    LocationLookup { reason: String },

    #[error("location lookup timed out after {elapsed_ms} ms (limit {timeout_ms} ms)")]
    LookupTimedOut { elapsed_ms: u64, timeout_ms: u64 },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OverlayError>;

/// Convenience conversions from `Option` to `Result`.
pub trait OptionExt<T> {
    /// Map `None` to [`OverlayError::InsufficientPoints`].
    fn ok_or_insufficient_points(
        self,
        context: &str,
        point_count: usize,
        minimum_required: usize,
    ) -> Result<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_insufficient_points(
        self,
        context: &str,
        point_count: usize,
        minimum_required: usize,
    ) -> Result<T> {
        self.ok_or_else(|| OverlayError::InsufficientPoints {
            context: context.to_string(),
            point_count,
            minimum_required,
        })
    }
}
