use thiserror::Error;

/// Why a stored profile was not trusted.
///
/// Only surfaced by [`crate::codec::try_parse_adaptive_profile`]; the
/// infallible parser logs it and substitutes the default profile.
#[derive(Debug, Error)]
pub enum ProfileDecodeError {
    #[error("malformed profile: {0}")]
    Syntax(#[from] serde_json::Error),
    #[error("{field} out of range: {value}")]
    OutOfRange { field: String, value: f64 },
    #[error("{field} is not a finite number")]
    NonFinite { field: String },
    #[error("reserved subject key: {0}")]
    ReservedSubjectKey(String),
    #[error("invalid subject key: {0:?}")]
    InvalidSubjectKey(String),
}

#[derive(Debug, Error)]
pub enum ProfileEncodeError {
    #[error("refusing to encode invalid profile: {0}")]
    Invalid(#[from] ProfileDecodeError),
    #[error("serialization failed: {0}")]
    Serialize(serde_json::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("validation error: {0}")]
    Validation(String),
}
