//! Errors returned by the client.
//!
//! Lower layers wrap errors into [`Error::Context`] to record which phase failed.
//! The wrapped error is kept intact, so [`Error::root_cause`] can always recover it
//! and [`Error::status_code`] can classify it for an HTTP consumer.

use {
    megalink_protocol::{ApiError, Handle, NodeType, link::LinkError},
    reqwest::StatusCode,
    std::error::Error as StdError,
    thiserror::Error,
};

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("invalid key length; got {actual}, expected {expected}")]
    InvalidKeyLength { expected: usize, actual: usize },
    #[error("ciphertext length {len} is not a multiple of the block size")]
    MisalignedCiphertext { len: usize },
    /// Decrypted attributes don't start with `MEGA`: wrong key or corrupted data.
    #[error("invalid attribute magic: {prefix}")]
    BadMagic { prefix: String },
    #[error("failed to parse decrypted attributes: {0}")]
    AttributeParse(#[source] serde_json::Error),
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("{context}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
    #[error("network error: {0}")]
    Network(#[source] Box<dyn StdError + Send + Sync>),
    #[error("invalid http status: {0}")]
    HttpStatus(StatusCode),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("failed to encode request: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode response: {0}")]
    Decode(#[source] serde_json::Error),
    #[error("malformed response: {0}")]
    MalformedResponse(String),
    #[error(transparent)]
    Crypto(#[from] CryptoError),
    #[error(transparent)]
    InvalidLink(#[from] LinkError),
    #[error("invalid node type; got {actual:?}, expected {expected:?}")]
    InvalidNodeType { expected: NodeType, actual: NodeType },
    #[error("not found: {0}")]
    NotFound(String),
    #[error("range not satisfiable")]
    RangeNotSatisfiable,
    #[error("node {root} was listed first but its parent {parent} is listed after it")]
    RootOutOfOrder { root: Handle, parent: Handle },
}

impl From<base64::DecodeError> for Error {
    #[inline]
    fn from(err: base64::DecodeError) -> Self {
        Self::Crypto(CryptoError::Base64(err))
    }
}

impl Error {
    #[inline]
    pub fn network(err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Network(err.into())
    }

    #[must_use]
    #[inline]
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error below all context layers.
    #[must_use]
    #[inline]
    pub fn root_cause(&self) -> &Self {
        let mut current = self;
        while let Self::Context { source, .. } = current {
            current = source;
        }
        current
    }

    /// HTTP status that a gateway should answer with for this error.
    #[must_use]
    #[inline]
    pub fn status_code(&self) -> StatusCode {
        match self.root_cause() {
            Self::HttpStatus(status) => *status,
            Self::Api(err) => match err {
                ApiError::Internal => StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::Again => StatusCode::SERVICE_UNAVAILABLE,
                ApiError::RateLimit | ApiError::TooMany | ApiError::TooManyConnections => {
                    StatusCode::TOO_MANY_REQUESTS
                }
                ApiError::NotFound | ApiError::TemporarilyUnavailable => StatusCode::NOT_FOUND,
                ApiError::AccessDenied => StatusCode::FORBIDDEN,
                ApiError::Blocked => StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS,
                _ => StatusCode::BAD_REQUEST,
            },
            Self::Crypto(_) | Self::InvalidLink(_) | Self::InvalidNodeType { .. } => {
                StatusCode::BAD_REQUEST
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RangeNotSatisfiable => StatusCode::RANGE_NOT_SATISFIABLE,
            Self::Network(_) => StatusCode::BAD_GATEWAY,
            Self::Context { .. }
            | Self::Encode(_)
            | Self::Decode(_)
            | Self::MalformedResponse(_)
            | Self::RootOutOfOrder { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message that can be shown to the end user. Internal details are not exposed.
    #[must_use]
    #[inline]
    pub fn public_message(&self) -> String {
        match self.root_cause() {
            Self::Api(err) => err.to_string(),
            Self::Crypto(_) => ApiError::Key.message().to_owned(),
            Self::HttpStatus(_) => "invalid status from upstream".to_owned(),
            _ => String::new(),
        }
    }
}

pub trait ErrorContext<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;

    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Into<String>,
        F: FnOnce() -> C;
}

impl<T, E: Into<Error>> ErrorContext<T> for Result<T, E> {
    #[inline]
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|err| err.into().context(context))
    }

    #[inline]
    fn with_context<C, F>(self, f: F) -> Result<T>
    where
        C: Into<String>,
        F: FnOnce() -> C,
    {
        self.map_err(|err| err.into().context(f()))
    }
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "test")]
mod tests {
    use super::*;

    #[test]
    fn root_cause_survives_wrapping() {
        let err = Error::from(ApiError::RateLimit)
            .context("fetch nodes failed")
            .context("open folder failed");
        assert_eq!(err.to_string(), "open folder failed");
        assert!(matches!(err.root_cause(), Error::Api(ApiError::RateLimit)));
        assert_eq!(err.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            err.source().map(ToString::to_string).as_deref(),
            Some("fetch nodes failed")
        );
    }

    #[test]
    fn classification() {
        let cases = [
            (Error::from(ApiError::NotFound), StatusCode::NOT_FOUND),
            (Error::from(ApiError::Blocked), StatusCode::UNAVAILABLE_FOR_LEGAL_REASONS),
            (Error::from(ApiError::AccessDenied), StatusCode::FORBIDDEN),
            (Error::from(ApiError::Again), StatusCode::SERVICE_UNAVAILABLE),
            (Error::from(ApiError::OverQuota), StatusCode::BAD_REQUEST),
            (Error::HttpStatus(StatusCode::GONE), StatusCode::GONE),
            (
                Error::from(CryptoError::BadMagic {
                    prefix: "00000000".into(),
                }),
                StatusCode::BAD_REQUEST,
            ),
            (Error::RangeNotSatisfiable, StatusCode::RANGE_NOT_SATISFIABLE),
        ];
        for (err, status) in cases {
            assert_eq!(err.context("wrapped").status_code(), status);
        }
    }

    #[test]
    fn result_context() {
        let result: Result<(), ApiError> = Err(ApiError::Expired);
        let err = result.context("download failed").unwrap_err();
        assert!(matches!(err.root_cause(), Error::Api(ApiError::Expired)));
        assert_eq!(err.public_message(), "api error code -8: resource expired");
    }
}
