//! Completion provider error types.
//!
//! Every provider failure is classified as either "the provider could not be
//! reached or refused the request" or "the provider answered with something
//! we cannot use". Nothing here is retried.

/// Error from a completion provider call.
#[derive(Debug)]
pub struct LlmError {
    /// The kind of error
    pub kind: LlmErrorKind,
    /// HTTP status code, if applicable
    pub status_code: Option<u16>,
    /// Error message
    pub message: String,
}

impl LlmError {
    /// Create an error from a non-success HTTP status.
    pub fn from_status(status_code: u16, message: String) -> Self {
        Self {
            kind: classify_http_status(status_code),
            status_code: Some(status_code),
            message,
        }
    }

    /// Create a network error (connection failure, timeout).
    pub fn network_error(message: String) -> Self {
        Self {
            kind: LlmErrorKind::NetworkError,
            status_code: None,
            message,
        }
    }

    /// Create a parse error for an unreadable provider envelope.
    pub fn parse_error(message: String) -> Self {
        Self {
            kind: LlmErrorKind::ParseError,
            status_code: None,
            message,
        }
    }

    /// Create an error for a response that carried no usable completion.
    pub fn empty_completion(message: String) -> Self {
        Self {
            kind: LlmErrorKind::EmptyCompletion,
            status_code: None,
            message,
        }
    }

    /// Create a configuration error (client could not be built).
    pub fn configuration(message: String) -> Self {
        Self {
            kind: LlmErrorKind::Configuration,
            status_code: None,
            message,
        }
    }

    /// True when the provider was unreachable or rejected the request.
    pub fn is_unavailable(&self) -> bool {
        self.kind.is_unavailable()
    }
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "{} (HTTP {}): {}", self.kind, code, self.message),
            None => write!(f, "{}: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for LlmError {}

/// Classification of provider errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LlmErrorKind {
    /// Rate limited (429)
    RateLimited,
    /// Server error (5xx)
    ServerError,
    /// Client error (400, 401, 403, 404)
    ClientError,
    /// Network error (connection failed, timeout)
    NetworkError,
    /// The provider envelope could not be decoded
    ParseError,
    /// The envelope decoded but held no text or tool output
    EmptyCompletion,
    /// The HTTP client could not be constructed
    Configuration,
}

impl LlmErrorKind {
    /// Check if this error means the provider is unavailable to us.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            LlmErrorKind::RateLimited
                | LlmErrorKind::ServerError
                | LlmErrorKind::ClientError
                | LlmErrorKind::NetworkError
                | LlmErrorKind::Configuration
        )
    }
}

impl std::fmt::Display for LlmErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmErrorKind::RateLimited => write!(f, "Rate limited"),
            LlmErrorKind::ServerError => write!(f, "Server error"),
            LlmErrorKind::ClientError => write!(f, "Client error"),
            LlmErrorKind::NetworkError => write!(f, "Network error"),
            LlmErrorKind::ParseError => write!(f, "Parse error"),
            LlmErrorKind::EmptyCompletion => write!(f, "Empty completion"),
            LlmErrorKind::Configuration => write!(f, "Configuration error"),
        }
    }
}

/// Parse HTTP status code into error kind.
pub fn classify_http_status(status: u16) -> LlmErrorKind {
    match status {
        429 => LlmErrorKind::RateLimited,
        500..=599 => LlmErrorKind::ServerError,
        400..=499 => LlmErrorKind::ClientError,
        _ => LlmErrorKind::ServerError,
    }
}
