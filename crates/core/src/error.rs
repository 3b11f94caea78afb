//! Error types for FRA Atlas.

/// Result type for atlas operations.
pub type Result<T> = std::result::Result<T, AtlasError>;

/// Failures talking to the records API or loading configuration.
///
/// None of these reach the result display: the session logs them and falls
/// back to the full claim set.
#[derive(Debug, thiserror::Error)]
pub enum AtlasError {
    /// The request never produced a response (unreachable host, timeout, reset).
    #[error("transport error: {message}")]
    Transport {
        /// Human-readable transport details.
        message: String,
    },

    /// The API answered with a non-2xx status.
    #[error("unexpected status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// The response body was not in a recognized shape.
    #[error("decode error: {message}")]
    Decode {
        /// Human-readable decoding details.
        message: String,
    },

    /// Configuration could not be read or is invalid.
    #[error("config error: {message}")]
    Config {
        /// Human-readable configuration details.
        message: String,
    },
}

impl AtlasError {
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    #[must_use]
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// True for failures of the request itself rather than of its payload.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Status { .. })
    }
}
