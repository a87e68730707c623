//! Error types for response compression.

use thiserror::Error;

/// Errors raised while negotiating or encoding a response.
#[derive(Error, Debug)]
pub enum CompressionError {
    /// The codec was not compiled into this build.
    #[error("{0} encoding is not available in this build")]
    Unavailable(&'static str),

    /// The encoder was fed again after its final chunk.
    #[error("encoder already finished")]
    Finished,

    /// The underlying codec failed.
    #[error("compression failed: {0}")]
    Io(#[from] std::io::Error),

    /// A rewritten header value was not valid.
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] http::header::InvalidHeaderValue),
}

impl From<CompressionError> for std::io::Error {
    fn from(err: CompressionError) -> Self {
        match err {
            CompressionError::Io(err) => err,
            other => std::io::Error::other(other),
        }
    }
}
