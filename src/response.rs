//! Response wrapper that keeps the parsed document next to the raw exchange.

use crate::{Document, Error, Result};
use http::{HeaderMap, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// A completed exchange with the device.
///
/// `data` is the response body as a path-addressable [`Document`] (or, after
/// [`map`](Response::map), whatever it was turned into). The raw body and
/// transport details stay available for debugging.
///
/// # Examples
///
/// ```no_run
/// use nxapi::Client;
///
/// # async fn example() -> Result<(), nxapi::Error> {
/// let client = Client::new("https://10.0.0.1", "admin", "secret", true)?;
///
/// let response = client.get_class("l1PhysIf").await?;
/// for interface in response.array() {
///     println!("{}", interface.get("l1PhysIf.attributes.id").str());
/// }
/// println!("Request took {:?} over {} attempt(s)", response.latency, response.attempts);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response<T = Document> {
    /// The response data.
    pub data: T,

    /// The raw response body as a string.
    pub raw_body: String,

    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// The total latency of the request, including all retry attempts.
    pub latency: Duration,

    /// The number of attempts made to complete this request.
    pub attempts: usize,
}

impl<T> Response<T> {
    /// Creates a new `Response`.
    pub fn new(
        data: T,
        raw_body: String,
        status: StatusCode,
        headers: HeaderMap,
        latency: Duration,
        attempts: usize,
    ) -> Self {
        Self {
            data,
            raw_body,
            status,
            headers,
            latency,
            attempts,
        }
    }

    /// Maps the response data to a different type using the provided function,
    /// keeping the metadata.
    ///
    /// # Examples
    ///
    /// ```
    /// # use nxapi::{Document, Response};
    /// # use http::{HeaderMap, StatusCode};
    /// # use std::time::Duration;
    /// let body = r#"{"imdata":[{"topSystem":{"attributes":{"name":"leaf1"}}}]}"#;
    /// let response = Response::new(
    ///     Document::parse(body),
    ///     body.to_string(),
    ///     StatusCode::OK,
    ///     HeaderMap::new(),
    ///     Duration::from_millis(100),
    ///     1,
    /// );
    ///
    /// let first = response.map(|doc| doc.get("imdata.0"));
    /// assert_eq!(first.data.get("topSystem.attributes.name").str(), "leaf1");
    /// ```
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            data: f(self.data),
            raw_body: self.raw_body,
            status: self.status,
            headers: self.headers,
            latency: self.latency,
            attempts: self.attempts,
        }
    }

    /// Returns `true` if the request required retries.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Returns a reference to a header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

impl Response<Document> {
    /// Deserializes the document into a typed structure.
    ///
    /// # Errors
    ///
    /// Returns [`Error::DeserializationFailed`] with the raw body when the
    /// document does not match `U`.
    pub fn deserialize<U>(&self) -> Result<U>
    where
        U: DeserializeOwned,
    {
        self.data
            .deserialize()
            .map_err(|e| Error::DeserializationFailed {
                raw_response: self.raw_body.clone(),
                serde_error: e.to_string(),
                status: self.status,
            })
    }
}

impl<T> AsRef<T> for Response<T> {
    fn as_ref(&self) -> &T {
        &self.data
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}
