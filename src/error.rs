use std::io;

/// Errors produced while building, decoding or encoding CBOR values.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CborError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Malformed, truncated or trailing input, invalid UTF-8, or a tagged
    /// value whose content does not have the shape its tag requires.
    #[error("invalid CBOR: {0}")]
    Format(String),

    /// A numeric conversion whose target cannot hold the value.
    #[error("value out of range: {0}")]
    Range(String),

    /// An operation applied to a value of the wrong kind.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    #[error("invalid argument: {0}")]
    Argument(String),

    /// A container reached itself while being encoded.
    #[error("circular reference detected while encoding")]
    CircularReference,
}

impl CborError {
    pub(crate) fn format(msg: impl Into<String>) -> Self {
        CborError::Format(msg.into())
    }

    pub(crate) fn range(msg: impl Into<String>) -> Self {
        CborError::Range(msg.into())
    }

    pub(crate) fn invalid_operation(msg: impl Into<String>) -> Self {
        CborError::InvalidOperation(msg.into())
    }

    pub(crate) fn argument(msg: impl Into<String>) -> Self {
        CborError::Argument(msg.into())
    }

    /// Maps a read failure, turning a premature end of input into a format error.
    pub(crate) fn from_read(e: io::Error) -> Self {
        if e.kind() == io::ErrorKind::UnexpectedEof {
            CborError::format("unexpected end of input")
        } else {
            CborError::Io(e)
        }
    }
}

pub type Result<T> = std::result::Result<T, CborError>;

/// Alias kept for callers that spell the type `error::Error`.
pub type Error = CborError;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eof_becomes_format_error() {
        let err = CborError::from_read(io::Error::from(io::ErrorKind::UnexpectedEof));
        assert!(matches!(err, CborError::Format(_)));

        let err = CborError::from_read(io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, CborError::Io(_)));
    }

    #[test]
    fn test_display() {
        assert_eq!(
            CborError::format("trailing bytes").to_string(),
            "invalid CBOR: trailing bytes"
        );
        assert_eq!(
            CborError::CircularReference.to_string(),
            "circular reference detected while encoding"
        );
    }
}
