//! Error types for directory operations.
//!
//! This module maps HTTP status codes returned by an HDAP server onto a
//! closed error taxonomy, and composes the human-readable notification
//! messages published alongside each failure.

use reqwest::StatusCode;
use thiserror::Error;

/// Main error type for directory operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The resource has not changed since the revision presented (304).
    #[error("HTTP 304 Not Modified: {0}")]
    NotModified(String),

    /// The request was malformed (400).
    #[error("HTTP 400 Bad Request: {0}")]
    BadRequest(String),

    /// Authentication is required or the credentials were rejected (401).
    #[error("HTTP 401 Unauthorized: {0}")]
    Unauthorized(String),

    /// The authenticated identity lacks access (403).
    #[error("HTTP 403 Forbidden: {0}")]
    Forbidden(String),

    /// No resource exists at the identifier (404).
    #[error("HTTP 404 Not Found: {0}")]
    NotFound(String),

    /// The HTTP method is not supported for this resource (405).
    #[error("HTTP 405 Method Not Allowed: {0}")]
    MethodNotAllowed(String),

    /// The server cannot produce an acceptable representation (406).
    #[error("HTTP 406 Not Acceptable: {0}")]
    NotAcceptable(String),

    /// The supplied revision no longer matches the resource (409).
    #[error("HTTP 409 Conflict: {0}")]
    Conflict(String),

    /// The resource existed but has been removed (410).
    #[error("HTTP 410 Gone: {0}")]
    Gone(String),

    /// A precondition failed, such as creating a resource that already
    /// exists (412).
    #[error("HTTP 412 Precondition Failed: {0}")]
    PreconditionFailed(String),

    /// The result set is too large to return (413).
    #[error("HTTP 413 Content Too Large: {0}")]
    PayloadTooLarge(String),

    /// The request payload media type is unsupported (415).
    #[error("HTTP 415 Unsupported Media Type: {0}")]
    UnsupportedMediaType(String),

    /// The server requires a revision precondition (428).
    #[error("HTTP 428 Precondition Required: {0}")]
    PreconditionRequired(String),

    /// The server failed internally (500).
    #[error("HTTP 500 Internal Server Error: {0}")]
    InternalServerError(String),

    /// The server does not implement the operation (501).
    #[error("HTTP 501 Not Implemented: {0}")]
    NotImplemented(String),

    /// The server is temporarily unavailable (503).
    #[error("HTTP 503 Service Unavailable: {0}")]
    ServiceUnavailable(String),

    /// Any other HTTP error status.
    #[error("HTTP {status} error: {message}")]
    Http {
        /// The unrecognized status code.
        status: u16,
        /// The server-provided message.
        message: String,
    },

    /// A required input was missing or malformed; no request was sent.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The HTTP exchange itself failed (connection, TLS, protocol).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The request timed out.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The response body could not be parsed.
    #[error("Failed to parse directory response: {0}")]
    Parse(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Specialized result type for directory operations.
pub type Result<T> = std::result::Result<T, Error>;

const PAYLOAD_TOO_LARGE_HINT: &str =
    "Refine the search criteria to limit the number of results.";

impl Error {
    /// Map an HTTP status code and server message onto the taxonomy.
    #[must_use]
    pub fn from_status(status: StatusCode, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            StatusCode::NOT_MODIFIED => Self::NotModified(message),
            StatusCode::BAD_REQUEST => Self::BadRequest(message),
            StatusCode::UNAUTHORIZED => Self::Unauthorized(message),
            StatusCode::FORBIDDEN => Self::Forbidden(message),
            StatusCode::NOT_FOUND => Self::NotFound(message),
            StatusCode::METHOD_NOT_ALLOWED => Self::MethodNotAllowed(message),
            StatusCode::NOT_ACCEPTABLE => Self::NotAcceptable(message),
            StatusCode::CONFLICT => Self::Conflict(message),
            StatusCode::GONE => Self::Gone(message),
            StatusCode::PRECONDITION_FAILED => Self::PreconditionFailed(message),
            StatusCode::PAYLOAD_TOO_LARGE => Self::PayloadTooLarge(message),
            StatusCode::UNSUPPORTED_MEDIA_TYPE => Self::UnsupportedMediaType(message),
            StatusCode::PRECONDITION_REQUIRED => Self::PreconditionRequired(message),
            StatusCode::INTERNAL_SERVER_ERROR => Self::InternalServerError(message),
            StatusCode::NOT_IMPLEMENTED => Self::NotImplemented(message),
            StatusCode::SERVICE_UNAVAILABLE => Self::ServiceUnavailable(message),
            _ => Self::Http {
                status: status.as_u16(),
                message,
            },
        }
    }

    /// Returns the HTTP status code behind this error, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::NotModified(_) => Some(304),
            Self::BadRequest(_) => Some(400),
            Self::Unauthorized(_) => Some(401),
            Self::Forbidden(_) => Some(403),
            Self::NotFound(_) => Some(404),
            Self::MethodNotAllowed(_) => Some(405),
            Self::NotAcceptable(_) => Some(406),
            Self::Conflict(_) => Some(409),
            Self::Gone(_) => Some(410),
            Self::PreconditionFailed(_) => Some(412),
            Self::PayloadTooLarge(_) => Some(413),
            Self::UnsupportedMediaType(_) => Some(415),
            Self::PreconditionRequired(_) => Some(428),
            Self::InternalServerError(_) => Some(500),
            Self::NotImplemented(_) => Some(501),
            Self::ServiceUnavailable(_) => Some(503),
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the formal status label for HTTP-mapped errors.
    #[must_use]
    pub fn status_label(&self) -> Option<String> {
        let label = match self {
            Self::NotModified(_) => "HTTP 304 Not Modified",
            Self::BadRequest(_) => "HTTP 400 Bad Request",
            Self::Unauthorized(_) => "HTTP 401 Unauthorized",
            Self::Forbidden(_) => "HTTP 403 Forbidden",
            Self::NotFound(_) => "HTTP 404 Not Found",
            Self::MethodNotAllowed(_) => "HTTP 405 Method Not Allowed",
            Self::NotAcceptable(_) => "HTTP 406 Not Acceptable",
            Self::Conflict(_) => "HTTP 409 Conflict",
            Self::Gone(_) => "HTTP 410 Gone",
            Self::PreconditionFailed(_) => "HTTP 412 Precondition Failed",
            Self::PayloadTooLarge(_) => "HTTP 413 Content Too Large",
            Self::UnsupportedMediaType(_) => "HTTP 415 Unsupported Media Type",
            Self::PreconditionRequired(_) => "HTTP 428 Precondition Required",
            Self::InternalServerError(_) => "HTTP 500 Internal Server Error",
            Self::NotImplemented(_) => "HTTP 501 Not Implemented",
            Self::ServiceUnavailable(_) => "HTTP 503 Service Unavailable",
            Self::Http { status, .. } => return Some(format!("HTTP {status} error")),
            _ => return None,
        };
        Some(label.to_string())
    }

    /// Returns the remediation hint attached to this error category.
    #[must_use]
    pub const fn remediation(&self) -> Option<&'static str> {
        match self {
            Self::PayloadTooLarge(_) => Some(PAYLOAD_TOO_LARGE_HINT),
            _ => None,
        }
    }

    /// Compose the user-facing notification message for this error.
    ///
    /// HTTP-mapped errors read `<status label>: <server message>.` plus
    /// the remediation hint when one exists; other errors use their
    /// display form unchanged.
    #[must_use]
    pub fn notification(&self) -> String {
        let Some(label) = self.status_label() else {
            return self.to_string();
        };
        let message = self.server_message();
        match self.remediation() {
            Some(hint) => format!("{label}: {message}. {hint}"),
            None => format!("{label}: {message}."),
        }
    }

    fn server_message(&self) -> &str {
        match self {
            Self::NotModified(m)
            | Self::BadRequest(m)
            | Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::NotFound(m)
            | Self::MethodNotAllowed(m)
            | Self::NotAcceptable(m)
            | Self::Conflict(m)
            | Self::Gone(m)
            | Self::PreconditionFailed(m)
            | Self::PayloadTooLarge(m)
            | Self::UnsupportedMediaType(m)
            | Self::PreconditionRequired(m)
            | Self::InternalServerError(m)
            | Self::NotImplemented(m)
            | Self::ServiceUnavailable(m)
            | Self::Http { message: m, .. }
            | Self::Validation(m)
            | Self::Transport(m)
            | Self::Timeout(m)
            | Self::Parse(m)
            | Self::Config(m) => m,
        }
    }
}

// Conversions from external error types
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Config(err.to_string())
    }
}
