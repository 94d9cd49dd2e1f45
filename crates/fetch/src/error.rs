use thiserror::Error;

use crate::consumer::ConsumerId;
use crate::transport::status as transport_status;

/// NetworkError represents the terminal outcomes and setup failures of the fetch pipeline
#[derive(Error, Debug)]
pub enum NetworkError {
    /// The transport reported a negative status (DNS, connect, TLS, timeout)
    #[error("Transport failure {code} while loading {url}")]
    TransportFailure { code: i32, url: String },

    /// The server answered with a 4xx/5xx status and no body
    #[error("HTTP error {status} ({status_text}) while loading {url}")]
    HttpError {
        status: u16,
        url: String,
        status_text: String,
    },

    /// The redirect chain went past the configured bound
    #[error("Too many redirects while loading {url}")]
    TooManyRedirects { url: String },

    /// The user dismissed the credential prompt
    #[error("Authentication for realm \"{realm}\" abandoned while loading {url}")]
    AuthenticationAbandoned { url: String, realm: String },

    /// No transport stream could be created for the request
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    /// A job is already registered for this consumer
    #[error("A network job is already running for consumer {0}")]
    DuplicateJob(ConsumerId),

    /// URL parsing errors
    #[error("URL parsing error: {0}")]
    UrlError(#[from] url::ParseError),

    /// HTTP client construction errors
    #[error("HTTP client error: {0}")]
    ClientError(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

impl NetworkError {
    /// Returns true if the failure happened below the HTTP layer
    pub fn is_transport_related(&self) -> bool {
        matches!(
            self,
            NetworkError::TransportFailure { .. } | NetworkError::TransportUnavailable(_)
        )
    }

    /// Returns true if the error is likely temporary and the request could be retried
    pub fn is_retryable(&self) -> bool {
        match self {
            NetworkError::TransportFailure { code, .. } => matches!(
                *code,
                transport_status::NETWORK_ERROR
                    | transport_status::CONNECT_ERROR
                    | transport_status::TIMEOUT
            ),
            NetworkError::HttpError { status, .. } => matches!(*status, 502..=504),
            _ => false,
        }
    }

    /// The extended status code carried by the error, if any
    pub fn status_code(&self) -> Option<i32> {
        match self {
            NetworkError::TransportFailure { code, .. } => Some(*code),
            NetworkError::HttpError { status, .. } => Some(i32::from(*status)),
            NetworkError::TooManyRedirects { .. } => Some(transport_status::TOO_MANY_REDIRECTS),
            NetworkError::AuthenticationAbandoned { .. } => Some(401),
            _ => None,
        }
    }
}

/// Reasons a challenge or redirect header is not acted upon.
///
/// These never reach the consumer; the job falls back to treating the
/// response as an ordinary one.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderParseError {
    #[error("challenge is missing an authentication scheme")]
    MissingScheme,

    #[error("unsupported authentication scheme: {0}")]
    UnsupportedScheme(String),

    #[error("challenge is missing a realm")]
    MissingRealm,

    #[error("challenge realm is not terminated")]
    UnterminatedRealm,

    #[error("redirect response has no Location header")]
    MissingLocation,

    #[error("redirect Location cannot be resolved: {0}")]
    InvalidLocation(String),
}
