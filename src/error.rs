//! Error types for device API calls.
//!
//! Errors keep whatever the device sent back: status, headers, raw body and
//! the parsed [`Document`], so callers can inspect the detail of a failure.

use crate::{backoff, Document, Response};
use http::{HeaderMap, StatusCode};

/// The main error type for device API calls.
///
/// # Examples
///
/// ```no_run
/// use nxapi::{Client, Error};
///
/// # async fn example() -> Result<(), Error> {
/// let client = Client::new("https://10.0.0.1", "admin", "secret", true)?;
///
/// match client.get_dn("sys/bgp").await {
///     Ok(response) => println!("BGP: {}", response.data),
///     Err(Error::Api { code, text, .. }) => eprintln!("Device refused ({}): {}", code, text),
///     Err(Error::MaxRetriesExceeded { attempts, last_error }) => {
///         eprintln!("Gave up after {} attempts: {}", attempts, last_error);
///     }
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A network-level error occurred (connection failed, DNS lookup failed,
    /// TLS handshake failed, or the response body could not be read).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The request timed out.
    #[error("Request timed out")]
    Timeout,

    /// The device answered with a retryable status and no error envelope.
    ///
    /// Statuses in [`RETRYABLE_STATUS_CODES`](crate::backoff::RETRYABLE_STATUS_CODES)
    /// only surface after the retries are used up, wrapped in
    /// [`Error::MaxRetriesExceeded`]. Other statuses are returned as a
    /// [`Response`].
    #[error("HTTP error {status}: {raw_response}")]
    HttpError {
        /// The HTTP status code
        status: StatusCode,
        /// The raw response body
        raw_response: String,
        /// The response headers
        headers: HeaderMap,
        /// The response body, parsed
        document: Document,
    },

    /// The response carried an error at `imdata.0.error.attributes`,
    /// whatever its HTTP status.
    #[error("API error {code}: {text}")]
    Api {
        /// The error code reported by the device
        code: String,
        /// The error text reported by the device
        text: String,
        /// The full response
        response: Box<Response<Document>>,
    },

    /// Login or refresh did not yield a session token.
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// A response could not be converted into the requested type.
    #[error("Failed to deserialize response (status {status}): {serde_error}")]
    DeserializationFailed {
        /// The raw response body that failed to deserialize
        raw_response: String,
        /// The serde error message
        serde_error: String,
        /// The HTTP status code
        status: StatusCode,
    },

    /// Invalid configuration was provided.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// All attempts failed with retryable errors.
    #[error("Max retries exceeded after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded {
        /// The number of attempts made
        attempts: usize,
        /// The error of the last attempt
        last_error: Box<Error>,
    },

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl Error {
    /// Wraps a transport error, separating out timeouts.
    pub(crate) fn transport(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Error::Timeout
        } else {
            Error::Network(error)
        }
    }

    /// Returns `true` if the failed attempt may be retried.
    ///
    /// Transport failures, timeouts and the statuses listed in
    /// [`RETRYABLE_STATUS_CODES`](crate::backoff::RETRYABLE_STATUS_CODES)
    /// are retryable. Everything else is final.
    ///
    /// # Examples
    ///
    /// ```
    /// use nxapi::{Document, Error};
    /// use http::StatusCode;
    ///
    /// let err = Error::HttpError {
    ///     status: StatusCode::SERVICE_UNAVAILABLE,
    ///     raw_response: String::new(),
    ///     headers: http::HeaderMap::new(),
    ///     document: Document::default(),
    /// };
    /// assert!(err.is_retryable());
    ///
    /// let err = Error::HttpError {
    ///     status: StatusCode::NOT_FOUND,
    ///     raw_response: String::new(),
    ///     headers: http::HeaderMap::new(),
    ///     document: Document::default(),
    /// };
    /// assert!(!err.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(_) => true,
            Error::Timeout => true,
            Error::HttpError { status, .. } => backoff::is_retryable_status(*status),
            Error::Api { .. } => false,
            Error::Authentication(_) => false,
            Error::DeserializationFailed { .. } => false,
            Error::ConfigurationError(_) => false,
            Error::MaxRetriesExceeded { .. } => false,
            Error::InvalidUrl(_) => false,
        }
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::HttpError { status, .. } => Some(*status),
            Error::Api { response, .. } => Some(response.status),
            Error::DeserializationFailed { status, .. } => Some(*status),
            Error::MaxRetriesExceeded { last_error, .. } => last_error.status(),
            _ => None,
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::HttpError { raw_response, .. } => Some(raw_response),
            Error::Api { response, .. } => Some(&response.raw_body),
            Error::DeserializationFailed { raw_response, .. } => Some(raw_response),
            Error::MaxRetriesExceeded { last_error, .. } => last_error.raw_response(),
            _ => None,
        }
    }

    /// Returns the parsed response body if this error has one.
    pub fn document(&self) -> Option<&Document> {
        match self {
            Error::HttpError { document, .. } => Some(document),
            Error::Api { response, .. } => Some(&response.data),
            Error::MaxRetriesExceeded { last_error, .. } => last_error.document(),
            _ => None,
        }
    }
}

/// A specialized `Result` type for device API calls.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn http_error(code: u16, body: &str) -> Error {
        Error::HttpError {
            status: StatusCode::from_u16(code).unwrap(),
            raw_response: body.to_string(),
            headers: HeaderMap::new(),
            document: Document::parse(body),
        }
    }

    #[test]
    fn test_retryable_classification() {
        assert!(http_error(503, "").is_retryable());
        assert!(http_error(405, "").is_retryable());
        assert!(!http_error(404, "").is_retryable());
        assert!(Error::Timeout.is_retryable());
        assert!(!Error::Authentication("no token".into()).is_retryable());
    }

    #[test]
    fn test_accessors_see_through_retries() {
        let err = Error::MaxRetriesExceeded {
            attempts: 4,
            last_error: Box::new(http_error(502, r#"{"reason":"gateway"}"#)),
        };
        assert_eq!(err.status(), Some(StatusCode::BAD_GATEWAY));
        assert_eq!(err.raw_response(), Some(r#"{"reason":"gateway"}"#));
        assert_eq!(err.document().unwrap().get("reason").str(), "gateway");
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_api_error_exposes_response() {
        let body = r#"{"imdata":[{"error":{"attributes":{"code":"103","text":"Bad dn"}}}]}"#;
        let err = Error::Api {
            code: "103".into(),
            text: "Bad dn".into(),
            response: Box::new(Response::new(
                Document::parse(body),
                body.to_string(),
                StatusCode::BAD_REQUEST,
                HeaderMap::new(),
                Duration::from_millis(3),
                1,
            )),
        };
        assert_eq!(err.to_string(), "API error 103: Bad dn");
        assert_eq!(err.status(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(
            err.document().unwrap().get("imdata.0.error.attributes.code").str(),
            "103"
        );
    }
}
