//! Error kinds surfaced by the recording and statistics core.

/// Errors returned by the recorder, the ride repository and the commands
/// built on top of them. None of them is fatal to the process.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RideError {
    #[error("location permission was not granted")]
    PermissionDenied,

    #[error("location tracking unavailable: {0}")]
    TrackingUnavailable(String),

    #[error("invalid recorder state: {0}")]
    InvalidState(String),

    #[error("stored rides could not be parsed: {0}")]
    CorruptState(String),

    #[error("failed to persist rides: {0}")]
    PersistenceFailed(String),
}

impl RideError {
    /// Whether the error should be shown to the rider. Usage errors and
    /// locally recovered corruption only go to the log.
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            RideError::PermissionDenied
                | RideError::TrackingUnavailable(_)
                | RideError::PersistenceFailed(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, RideError>;
