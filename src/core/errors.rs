//! Error types shared by the trimming, validation and pipeline layers

use thiserror::Error;

/// Result alias used by the library modules
pub type Result<T, E = ValidatorError> = std::result::Result<T, E>;

/// Errors raised while trimming, validating or orchestrating a barcode run
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidatorError {
    #[error("Invalid parameter {parameter}={value}: {reason}")]
    InvalidParameter {
        parameter: String,
        value: String,
        reason: String,
    },

    #[error("Sequence '{sequence}' has no quality track")]
    MissingQualityData { sequence: String },

    #[error("External program {program} failed (exit code {exit_code:?}): {stderr}")]
    ExternalProcessFailure {
        program: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("Operation canceled")]
    Canceled,

    #[error("Configuration mismatch: expected options for '{expected}', found '{found}'")]
    ConfigurationMismatch { expected: String, found: String },

    #[error("No options supplied for validation '{identifier}'")]
    MissingOptions { identifier: String },

    #[error("Alignment error: {message}")]
    Alignment { message: String },

    #[error("Input/Output error: {message}")]
    Io { message: String },

    #[error("Failed to parse {what}: {message}")]
    Parse { what: String, message: String },
}

impl ValidatorError {
    /// Shorthand for [`ValidatorError::InvalidParameter`]
    pub fn invalid_parameter(
        parameter: impl Into<String>,
        value: impl ToString,
        reason: impl Into<String>,
    ) -> Self {
        ValidatorError::InvalidParameter {
            parameter: parameter.into(),
            value: value.to_string(),
            reason: reason.into(),
        }
    }

    pub fn parse(what: impl Into<String>, message: impl Into<String>) -> Self {
        ValidatorError::Parse {
            what: what.into(),
            message: message.into(),
        }
    }

    /// Cancellation is not a failure; callers report it separately
    pub fn is_canceled(&self) -> bool {
        matches!(self, ValidatorError::Canceled)
    }
}

impl From<std::io::Error> for ValidatorError {
    fn from(err: std::io::Error) -> Self {
        ValidatorError::Io {
            message: err.to_string(),
        }
    }
}
