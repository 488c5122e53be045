use {std::fmt, thiserror::Error};

/// Error code returned by the API in place of a response object.
///
/// Codes and messages follow the provider's own SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ApiError {
    Internal,
    BadArguments,
    Again,
    RateLimit,
    Failed,
    TooMany,
    OutOfRange,
    Expired,
    NotFound,
    Circular,
    AccessDenied,
    AlreadyExists,
    Incomplete,
    Key,
    BadSessionId,
    Blocked,
    OverQuota,
    TemporarilyUnavailable,
    TooManyConnections,
    Write,
    Read,
    AppKey,
    Ssl,
    GoingOverQuota,
    MfaRequired,
    Other(i64),
}

impl ApiError {
    #[must_use]
    #[inline]
    pub fn from_code(code: i64) -> Self {
        match code {
            -1 => Self::Internal,
            -2 => Self::BadArguments,
            -3 => Self::Again,
            -4 => Self::RateLimit,
            -5 => Self::Failed,
            -6 => Self::TooMany,
            -7 => Self::OutOfRange,
            -8 => Self::Expired,
            -9 => Self::NotFound,
            -10 => Self::Circular,
            -11 => Self::AccessDenied,
            -12 => Self::AlreadyExists,
            -13 => Self::Incomplete,
            -14 => Self::Key,
            -15 => Self::BadSessionId,
            -16 => Self::Blocked,
            -17 => Self::OverQuota,
            -18 => Self::TemporarilyUnavailable,
            -19 => Self::TooManyConnections,
            -20 => Self::Write,
            -21 => Self::Read,
            -22 => Self::AppKey,
            -23 => Self::Ssl,
            -24 => Self::GoingOverQuota,
            -26 => Self::MfaRequired,
            other => Self::Other(other),
        }
    }

    #[must_use]
    #[inline]
    pub fn code(&self) -> i64 {
        match *self {
            Self::Internal => -1,
            Self::BadArguments => -2,
            Self::Again => -3,
            Self::RateLimit => -4,
            Self::Failed => -5,
            Self::TooMany => -6,
            Self::OutOfRange => -7,
            Self::Expired => -8,
            Self::NotFound => -9,
            Self::Circular => -10,
            Self::AccessDenied => -11,
            Self::AlreadyExists => -12,
            Self::Incomplete => -13,
            Self::Key => -14,
            Self::BadSessionId => -15,
            Self::Blocked => -16,
            Self::OverQuota => -17,
            Self::TemporarilyUnavailable => -18,
            Self::TooManyConnections => -19,
            Self::Write => -20,
            Self::Read => -21,
            Self::AppKey => -22,
            Self::Ssl => -23,
            Self::GoingOverQuota => -24,
            Self::MfaRequired => -26,
            Self::Other(code) => code,
        }
    }

    #[must_use]
    #[inline]
    pub fn message(&self) -> &'static str {
        match *self {
            Self::Internal => "internal error",
            Self::BadArguments => "bad arguments",
            Self::Again => "request failed, retry with exponential backoff",
            Self::RateLimit => "too many requests, slow down",
            Self::Failed => "request failed permanently",
            Self::TooMany => "too many requests for this resource",
            Self::OutOfRange => "resource access out of range",
            Self::Expired => "resource expired",
            Self::NotFound => "resource does not exist",
            Self::Circular => "circular linkage",
            Self::AccessDenied => "access denied",
            Self::AlreadyExists => "resource already exists",
            Self::Incomplete => "request incomplete",
            Self::Key => "cryptographic error",
            Self::BadSessionId => "bad session ID",
            Self::Blocked => "resource administratively blocked",
            Self::OverQuota => "quota exceeded",
            Self::TemporarilyUnavailable => "resource temporarily not available",
            Self::TooManyConnections => "too many connections on this resource",
            Self::Write => "file could not be written to",
            Self::Read => "file could not be read from",
            Self::AppKey => "invalid or missing application key",
            Self::Ssl => "SSL verification failed",
            Self::GoingOverQuota => "not enough quota",
            Self::MfaRequired => "multi-factor authentication required",
            Self::Other(_) => "unknown error",
        }
    }
}

impl fmt::Display for ApiError {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "api error code {}: {}", self.code(), self.message())
    }
}

#[cfg(test)]
mod tests {
    use {super::*, std::error::Error as StdError};

    #[test]
    fn code_roundtrip() {
        for code in -26..=-1 {
            assert_eq!(ApiError::from_code(code).code(), code);
        }
        assert_eq!(ApiError::from_code(-25), ApiError::Other(-25));
    }

    #[test]
    fn display() {
        assert_eq!(
            ApiError::NotFound.to_string(),
            "api error code -9: resource does not exist"
        );
    }

    #[test]
    fn source_chain() {
        let err: Box<dyn StdError> = Box::new(ApiError::Key);
        assert!(err.source().is_none());
        assert_eq!(err.to_string(), "api error code -14: cryptographic error");
    }
}
