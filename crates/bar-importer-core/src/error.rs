use thiserror::Error;

/// Startup configuration failures. These are not recoverable per call.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Unknown time zone: {0}")]
    UnknownTimeZone(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown period '{0}'")]
pub struct ParsePeriodError(pub String);
