//! Error types for fetching, parsing and decoding key sets.

use std::fmt;
use std::time::Duration;

use super::http_client::HttpClientError;

/// The reason a single JWK field could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// The field is not valid unpadded base64url.
    Base64(String),
    /// The field decoded to zero bytes.
    Empty,
    /// The field decoded to more bytes than the target integer can hold.
    Oversized { len: usize, max: usize },
}

/// A field of a JWK record is malformed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodeError {
    /// Name of the offending JWK member (`"n"` or `"e"`).
    pub field: &'static str,
    pub kind: DecodeErrorKind,
}

impl DecodeError {
    pub fn new(field: &'static str, kind: DecodeErrorKind) -> Self {
        Self { field, kind }
    }
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            DecodeErrorKind::Base64(err) => {
                write!(f, "field `{}` is not valid base64url: {}", self.field, err)
            }
            DecodeErrorKind::Empty => write!(f, "field `{}` is empty", self.field),
            DecodeErrorKind::Oversized { len, max } => {
                let field = self.field;
                write!(f, "field `{}` decodes to {} bytes, at most {} allowed", field, len, max)
            }
        }
    }
}

impl std::error::Error for DecodeError {}

/// The JWKS endpoint could not be reached or answered badly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    Transport(String),
    Status(u16),
    Timeout(Duration),
    BodyTooLarge { len: usize, max: usize },
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(err) => write!(f, "transport error: {}", err),
            Self::Status(status) => write!(f, "endpoint answered with status {}", status),
            Self::Timeout(after) => write!(f, "fetch timed out after {:?}", after),
            Self::BodyTooLarge { len, max } => {
                write!(f, "response body of {} bytes exceeds limit of {}", len, max)
            }
        }
    }
}

impl std::error::Error for FetchError {}

/// Top-level error for every fallible key set operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JwksError {
    Fetch(FetchError),
    Parse(String),
    Decode(DecodeError),
    Config(String),
}

impl fmt::Display for JwksError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch(err) => write!(f, "JWKS fetch failed: {}", err),
            Self::Parse(err) => write!(f, "JWKS document is malformed: {}", err),
            Self::Decode(err) => write!(f, "JWK could not be decoded: {}", err),
            Self::Config(err) => write!(f, "invalid rotator configuration: {}", err),
        }
    }
}

impl std::error::Error for JwksError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Fetch(err) => Some(err),
            Self::Decode(err) => Some(err),
            _ => None,
        }
    }
}

impl From<FetchError> for JwksError {
    fn from(err: FetchError) -> Self {
        Self::Fetch(err)
    }
}

impl From<DecodeError> for JwksError {
    fn from(err: DecodeError) -> Self {
        Self::Decode(err)
    }
}

impl From<serde_json::Error> for JwksError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<HttpClientError> for JwksError {
    fn from(err: HttpClientError) -> Self {
        Self::Fetch(FetchError::Transport(err.to_string()))
    }
}

pub type Result<T> = std::result::Result<T, JwksError>;
