use thiserror::Error;

use bincode::error::{DecodeError, EncodeError};

pub type Result<T> = std::result::Result<T, HitSetError>;

#[derive(Error, Debug, PartialEq)]
pub enum HitSetError {
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    #[error(
        "Incompatible {what} encoding: requires version {compat}, this build supports up to {supported}"
    )]
    IncompatibleVersion {
        what: &'static str,
        compat: u8,
        supported: u8,
    },

    #[error("Unexpected end of buffer: needed {needed} bytes, {remaining} left")]
    UnexpectedEof { needed: usize, remaining: usize },

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Rollback of {oid} failed: {reason}")]
    Rollback { oid: String, reason: String },
}

// Conversion from bincode::error::EncodeError to HitSetError
impl From<EncodeError> for HitSetError {
    fn from(err: EncodeError) -> Self {
        HitSetError::Serialization(err.to_string())
    }
}

// Bytes bincode cannot make sense of are malformed input, not a local
// serialization failure
impl From<DecodeError> for HitSetError {
    fn from(err: DecodeError) -> Self {
        HitSetError::MalformedInput(err.to_string())
    }
}
