//! Severity classification for taskboard errors
//!
//! Each crate defines its own error enum; this module only provides the shared
//! vocabulary for how bad an error is, so callers can decide whether to log it,
//! surface it to the user, or treat it as a bug in the integration layer.

/// Severity levels for error classification
///
/// # Severity Levels
///
/// - **Warning**: Expected and recoverable. The board stays consistent and the
///   user is told about it (a rejected move that was rolled back).
/// - **Error**: The specific operation failed but the board is still usable.
/// - **Critical**: A structural invariant was broken by the calling layer.
///   These indicate a bug and should never be swallowed.
///
/// # Examples
///
/// ```rust
/// use taskboard_common::ErrorSeverity;
///
/// // Warning: the server rejected a move and the card snapped back
/// let rejected = ErrorSeverity::Warning;
///
/// // Critical: a task id was inserted twice into the same column
/// let duplicate = ErrorSeverity::Critical;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Recoverable, user-visible as a transient notification
    Warning,

    /// Operation failed, board remains usable
    Error,

    /// Integration bug, the calling layer broke a structural invariant
    Critical,
}

impl ErrorSeverity {
    /// The tracing level this severity is logged at
    pub fn tracing_level(self) -> tracing::Level {
        match self {
            Self::Warning => tracing::Level::WARN,
            Self::Error | Self::Critical => tracing::Level::ERROR,
        }
    }
}

/// Trait for error types that have severity levels
///
/// # Example
///
/// ```rust
/// use taskboard_common::{ErrorSeverity, Severity};
///
/// #[derive(Debug)]
/// enum MoveError {
///     Duplicate,
///     Rejected,
/// }
///
/// impl Severity for MoveError {
///     fn severity(&self) -> ErrorSeverity {
///         match self {
///             MoveError::Duplicate => ErrorSeverity::Critical,
///             MoveError::Rejected => ErrorSeverity::Warning,
///         }
///     }
/// }
///
/// assert_eq!(MoveError::Rejected.severity(), ErrorSeverity::Warning);
/// ```
pub trait Severity {
    /// Get the severity level of this error
    fn severity(&self) -> ErrorSeverity;

    /// Whether this error indicates a bug in the caller rather than a runtime failure
    fn is_integration_bug(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }
}
