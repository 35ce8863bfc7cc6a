//! Error types for haptics-engine
//!
//! One variant per failure kind the host can observe. Every variant carries
//! the underlying diagnostic so native failures surface verbatim.

use thiserror::Error;

/// Main error type for haptics-engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Waveform timings and amplitudes differ in length
    #[error("Argument mismatch: {0}")]
    ArgumentMismatch(String),

    /// Predefined effects are not available on this capability tier
    #[error("Unsupported effect: {0}")]
    UnsupportedEffect(String),

    /// Operation needs finer control than the device offers
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// External pattern content could not be parsed
    #[error("Pattern parse error: {0}")]
    PatternParse(String),

    /// Actuator could not be created or armed
    #[error("Actuator unavailable: {0}")]
    ActuatorUnavailable(String),

    /// Player could not be created or started
    #[error("Playback error: {0}")]
    Playback(String),

    /// Native player rejected a transport control
    #[error("Player control error: {0}")]
    PlayerControl(String),

    /// Transport control issued with no active player
    #[error("No active player")]
    NoActivePlayer,

    /// Asset could not be resolved
    #[error("Not found: {0}")]
    NotFound(String),

    /// Command argument missing or of the wrong type
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Command name not recognized
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// Engine configuration rejected
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Stable error code for the host dispatch layer
    pub fn code(&self) -> &'static str {
        match self {
            Error::ArgumentMismatch(_) => "ARGUMENT_MISMATCH",
            Error::UnsupportedEffect(_) => "UNSUPPORTED_EFFECT",
            Error::UnsupportedOperation(_) => "UNSUPPORTED_OPERATION",
            Error::PatternParse(_) => "PATTERN_PARSE_ERROR",
            Error::ActuatorUnavailable(_) => "ACTUATOR_UNAVAILABLE",
            Error::Playback(_) => "PLAYBACK_ERROR",
            Error::PlayerControl(_) => "PLAYER_CONTROL_ERROR",
            Error::NoActivePlayer => "NO_ACTIVE_PLAYER",
            Error::NotFound(_) => "NOT_FOUND",
            Error::InvalidArguments(_) => "INVALID_ARGS",
            Error::UnknownCommand(_) => "NOT_IMPLEMENTED",
            Error::Config(_) => "CONFIG_ERROR",
        }
    }
}

impl From<haptics_common::Error> for Error {
    fn from(err: haptics_common::Error) -> Self {
        match err {
            haptics_common::Error::NotFound(msg) => Error::NotFound(msg),
            haptics_common::Error::InvalidInput(msg) => Error::InvalidArguments(msg),
            haptics_common::Error::Config(msg) => Error::Config(msg),
            other => Error::Config(other.to_string()),
        }
    }
}

/// Convenience Result type using haptics-engine Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_carries_diagnostic() {
        let err = Error::Playback("engine not running".into());
        assert_eq!(err.to_string(), "Playback error: engine not running");
    }

    #[test]
    fn test_error_codes_are_distinct() {
        let errors = [
            Error::ArgumentMismatch(String::new()),
            Error::UnsupportedEffect(String::new()),
            Error::UnsupportedOperation(String::new()),
            Error::PatternParse(String::new()),
            Error::ActuatorUnavailable(String::new()),
            Error::Playback(String::new()),
            Error::PlayerControl(String::new()),
            Error::NoActivePlayer,
            Error::NotFound(String::new()),
            Error::InvalidArguments(String::new()),
            Error::UnknownCommand(String::new()),
            Error::Config(String::new()),
        ];
        let mut codes: Vec<_> = errors.iter().map(|e| e.code()).collect();
        codes.sort_unstable();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn test_common_error_conversion() {
        let err: Error = haptics_common::Error::NotFound("a.ahap".into()).into();
        assert_eq!(err, Error::NotFound("a.ahap".into()));

        let err: Error = haptics_common::Error::Config("bad".into()).into();
        assert_eq!(err.code(), "CONFIG_ERROR");
    }
}
