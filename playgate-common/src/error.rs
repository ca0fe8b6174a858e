//! Common error types for playgate
//!
//! Defines workspace-wide error types using thiserror for clear error
//! propagation.

use thiserror::Error;

/// Common result type for playgate operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types across the playgate workspace
#[derive(Error, Debug)]
pub enum Error {
    /// Malformed timeline data; rejected, previous timeline retained
    #[error("Invalid timeline data: {reason}")]
    Validation {
        /// Index of the offending segment, if the failure is per-segment
        index: Option<usize>,
        /// What was wrong with it
        reason: String,
    },

    /// Remote timeline unavailable; surfaced, no state change
    #[error("Timeline fetch failed: {0}")]
    Fetch(String),

    /// Playback start failed (see [`PlayError`] for subclassification)
    #[error("Playback start failed: {0}")]
    Play(#[from] PlayError),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid state for operation
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Terminal lockout after repeated tamper detection; not recoverable
    /// in-session
    #[error("Security violation: {0}")]
    SecurityViolation(String),
}

/// Classification of asynchronous playback-start failures
///
/// The play/pause coordinator maps surface failures onto these variants:
/// - `BenignAbort` is swallowed silently (expected outcome of a legitimate
///   pause racing a start)
/// - `AutoplayRestricted` propagates to the caller so a fallback (e.g. muted
///   retry) can be attempted
/// - `Media` is surfaced as a non-fatal player error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlayError {
    /// Start was aborted by a racing pause request
    #[error("start aborted by a racing pause")]
    BenignAbort,

    /// Platform refused the unmuted/ungestured start
    #[error("autoplay restricted: {0}")]
    AutoplayRestricted(String),

    /// Media-level failure (decode, source, network)
    #[error("media error: {0}")]
    Media(String),
}
