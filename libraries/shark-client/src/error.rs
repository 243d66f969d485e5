//! Error types for the Shark client.

use std::fmt;
use thiserror::Error;

/// Numeric fault codes used by the Shark API and by the client itself.
///
/// Server faults arrive as `{"fault": {"code": n, "message": ...}}`; the
/// transport-level codes (`HttpError`, `HttpTimeout`, `ParseError`,
/// `Cancelled`) are assigned locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    FetchingToken,
    InvalidType,
    HttpError,
    ParseError,
    HttpTimeout,
    MustBeLoggedIn,
    Maintenance,
    InvalidSession,
    InvalidToken,
    RateLimited,
    InvalidClient,
    Cancelled,
}

impl ErrorCode {
    /// Map a wire code onto a known fault. Unknown codes yield `None`.
    pub fn from_code(code: i64) -> Option<Self> {
        let code = match code {
            0 => Self::FetchingToken,
            1 => Self::InvalidType,
            2 => Self::HttpError,
            4 => Self::ParseError,
            6 => Self::HttpTimeout,
            8 => Self::MustBeLoggedIn,
            10 => Self::Maintenance,
            16 => Self::InvalidSession,
            256 => Self::InvalidToken,
            512 => Self::RateLimited,
            1024 => Self::InvalidClient,
            333 => Self::Cancelled,
            _ => return None,
        };
        Some(code)
    }

    /// The numeric value of this code.
    pub fn code(self) -> i64 {
        match self {
            Self::FetchingToken => 0,
            Self::InvalidType => 1,
            Self::HttpError => 2,
            Self::ParseError => 4,
            Self::HttpTimeout => 6,
            Self::MustBeLoggedIn => 8,
            Self::Maintenance => 10,
            Self::InvalidSession => 16,
            Self::InvalidToken => 256,
            Self::RateLimited => 512,
            Self::InvalidClient => 1024,
            Self::Cancelled => 333,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} ({})", self, self.code())
    }
}

/// Errors surfaced by the Shark client.
///
/// Every call completes with exactly one of these or a payload. Intermediate
/// resends are never reported.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Invalid API URL in the configuration
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),

    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Request(#[from] reqwest::Error),

    /// HTTP exchange failed or returned a non-200 status
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// No response before the per-call deadline
    #[error("HTTP request timed out")]
    HttpTimeout,

    /// Response body was not a valid envelope
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Server requires a logged-in user for this method
    #[error("Must be logged in: {0}")]
    MustBeLoggedIn(String),

    /// Communication token rejected again after a refresh
    #[error("Invalid communication token: {0}")]
    InvalidToken(String),

    /// Session rejected by the server
    #[error("Invalid session: {0}")]
    InvalidSession(String),

    /// Server could not issue a communication token
    #[error("Error fetching token: {0}")]
    FetchingToken(String),

    /// Login rejected (unknown user or wrong password)
    #[error("Login failed: {0}")]
    LoginFailed(String),

    /// Call cancelled before dispatch (connection fault, rejection, shutdown)
    #[error("Request cancelled")]
    Cancelled,

    /// IO error in the settings store
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings store contents could not be read or written
    #[error("Settings error: {0}")]
    Settings(String),
}

impl ClientError {
    /// Build the terminal error for a server fault code.
    pub(crate) fn from_fault(code: ErrorCode, message: impl Into<String>) -> Self {
        let message = message.into();
        match code {
            ErrorCode::MustBeLoggedIn => Self::MustBeLoggedIn(message),
            ErrorCode::InvalidToken => Self::InvalidToken(message),
            ErrorCode::InvalidSession => Self::InvalidSession(message),
            ErrorCode::FetchingToken => Self::FetchingToken(message),
            ErrorCode::HttpTimeout => Self::HttpTimeout,
            ErrorCode::ParseError => Self::Parse(message),
            ErrorCode::Cancelled => Self::Cancelled,
            _ => Self::Http(message),
        }
    }

    /// The fault code this error corresponds to, if any.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Request(_) | Self::Http(_) => Some(ErrorCode::HttpError),
            Self::HttpTimeout => Some(ErrorCode::HttpTimeout),
            Self::Parse(_) => Some(ErrorCode::ParseError),
            Self::MustBeLoggedIn(_) => Some(ErrorCode::MustBeLoggedIn),
            Self::InvalidToken(_) => Some(ErrorCode::InvalidToken),
            Self::InvalidSession(_) => Some(ErrorCode::InvalidSession),
            Self::FetchingToken(_) => Some(ErrorCode::FetchingToken),
            Self::Cancelled => Some(ErrorCode::Cancelled),
            Self::InvalidUrl(_) | Self::LoginFailed(_) | Self::Io(_) | Self::Settings(_) => None,
        }
    }
}

/// Result type for Shark client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_round_trip() {
        for code in [0, 1, 2, 4, 6, 8, 10, 16, 256, 512, 1024, 333] {
            let parsed = ErrorCode::from_code(code).expect("known code");
            assert_eq!(parsed.code(), code);
        }
        assert!(ErrorCode::from_code(7).is_none());
    }

    #[test]
    fn test_fault_mapping() {
        let err = ClientError::from_fault(ErrorCode::MustBeLoggedIn, "login first");
        assert_eq!(err.code(), Some(ErrorCode::MustBeLoggedIn));
        assert!(err.to_string().contains("login first"));

        let err = ClientError::from_fault(ErrorCode::InvalidToken, "bad token");
        assert!(matches!(err, ClientError::InvalidToken(_)));
    }
}
