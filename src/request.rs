//! Request descriptors and per-request options.

use crate::{Error, Result};
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use std::fmt;
use std::time::Duration;
use url::Url;

/// Per-request options accepted by the `*_with` methods of [`Client`](crate::Client).
///
/// By default a request checks the session before it is sent and logs its
/// payloads at debug level.
///
/// # Examples
///
/// ```
/// use nxapi::RequestOptions;
///
/// let options = RequestOptions::new()
///     .with_query_param("rsp-subtree-include", "faults")
///     .with_query_param("query-target-filter", r#"eq(bgpInst.asn,"100")"#)
///     .no_log_payload();
/// ```
#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub(crate) refresh: bool,
    pub(crate) log_payload: bool,
    pub(crate) override_url: Option<String>,
    pub(crate) query_params: Vec<(String, String)>,
    pub(crate) headers: HeaderMap,
    pub(crate) timeout: Option<Duration>,
}

impl RequestOptions {
    /// Creates options with the defaults.
    pub fn new() -> Self {
        Self {
            refresh: true,
            log_payload: true,
            override_url: None,
            query_params: Vec::new(),
            headers: HeaderMap::new(),
            timeout: None,
        }
    }

    /// Skips the automatic login/refresh check for this request.
    ///
    /// Used by the login and refresh calls themselves, or by callers that
    /// manage the session by hand.
    pub fn no_refresh(mut self) -> Self {
        self.refresh = false;
        self
    }

    /// Keeps request and response payloads out of the logs.
    pub fn no_log_payload(mut self) -> Self {
        self.log_payload = false;
        self
    }

    /// Appends a query parameter. Repeating a key adds another value.
    pub fn with_query_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push((key.into(), value.into()));
        self
    }

    /// Sends the request to `base` instead of the client's base URL,
    /// keeping the path and query.
    pub fn with_override_url(mut self, base: impl Into<String>) -> Self {
        self.override_url = Some(base.into());
        self
    }

    /// Adds a header to the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.headers.append(name, value);
        Ok(self)
    }

    /// Overrides the client-wide timeout for this request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// A single HTTP exchange to run through [`Client::execute`](crate::Client::execute).
///
/// The body is held as text so every retry attempt can send it again.
#[derive(Clone)]
pub struct Request {
    /// The HTTP method.
    pub method: Method,
    /// The absolute target URL, query included.
    pub url: Url,
    /// The request body, if any.
    pub body: Option<String>,
    /// Extra headers for this request.
    pub headers: HeaderMap,
    /// Whether the session is checked before sending.
    pub refresh: bool,
    /// Whether payloads are logged.
    pub log_payload: bool,
    /// Timeout override for this request.
    pub timeout: Option<Duration>,
    pub(crate) basic_auth: Option<(String, String)>,
}

impl Request {
    /// Creates a request with default flags.
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            body: None,
            headers: HeaderMap::new(),
            refresh: true,
            log_payload: true,
            timeout: None,
            basic_auth: None,
        }
    }

    /// Sets the request body.
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Authenticates this request with HTTP basic credentials.
    pub fn with_basic_auth(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.basic_auth = Some((username.into(), password.into()));
        self
    }

    /// Applies per-request options.
    ///
    /// # Errors
    ///
    /// Returns an error if the override URL cannot be parsed.
    pub fn with_options(mut self, options: RequestOptions) -> Result<Self> {
        if let Some(base) = &options.override_url {
            self.url = override_base(&self.url, base)?;
        }
        if !options.query_params.is_empty() {
            let mut pairs = self.url.query_pairs_mut();
            for (key, value) in &options.query_params {
                pairs.append_pair(key, value);
            }
        }
        self.headers.extend(options.headers);
        self.refresh = options.refresh;
        self.log_payload = options.log_payload;
        if options.timeout.is_some() {
            self.timeout = options.timeout;
        }
        Ok(self)
    }
}

impl fmt::Debug for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let body = match (&self.body, self.log_payload) {
            (Some(body), true) => Some(body.as_str()),
            (Some(_), false) => Some("<redacted>"),
            (None, _) => None,
        };
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url.as_str())
            .field("body", &body)
            .field("refresh", &self.refresh)
            .field("log_payload", &self.log_payload)
            .field("timeout", &self.timeout)
            .field("basic_auth", &self.basic_auth.as_ref().map(|(user, _)| user))
            .finish()
    }
}

/// Swaps scheme, host and port of `url` for those of `base`.
fn override_base(url: &Url, base: &str) -> Result<Url> {
    let mut target = format!("{}{}", base.trim_end_matches('/'), url.path());
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }
    Ok(Url::parse(&target)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(url: &str) -> Request {
        Request::new(Method::GET, Url::parse(url).unwrap())
    }

    #[test]
    fn test_defaults() {
        let req = request("https://10.0.0.1/api/mo/sys/bgp.json");
        assert!(req.refresh);
        assert!(req.log_payload);
        assert!(req.body.is_none());
    }

    #[test]
    fn test_flags() {
        let req = request("https://10.0.0.1/api/aaaLogin.json")
            .with_options(RequestOptions::new().no_refresh().no_log_payload())
            .unwrap();
        assert!(!req.refresh);
        assert!(!req.log_payload);
    }

    #[test]
    fn test_query_params_keep_repeated_keys() {
        let req = request("https://10.0.0.1/api/class/bgpInst.json")
            .with_options(
                RequestOptions::new()
                    .with_query_param("rsp-subtree-include", "faults")
                    .with_query_param("rsp-subtree-include", "health")
                    .with_query_param("foo", "bar,baz"),
            )
            .unwrap();

        let pairs: Vec<(String, String)> = req.url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("rsp-subtree-include".to_string(), "faults".to_string()),
                ("rsp-subtree-include".to_string(), "health".to_string()),
                ("foo".to_string(), "bar,baz".to_string()),
            ]
        );
    }

    #[test]
    fn test_override_url_keeps_path_and_query() {
        let req = request("https://10.0.0.1/api/mo/sys/bgp.json?rsp-subtree=full")
            .with_options(RequestOptions::new().with_override_url("https://10.0.0.2:8443/"))
            .unwrap();
        assert_eq!(
            req.url.as_str(),
            "https://10.0.0.2:8443/api/mo/sys/bgp.json?rsp-subtree=full"
        );
    }

    #[test]
    fn test_invalid_override_url() {
        let result = request("https://10.0.0.1/api/mo/sys.json")
            .with_options(RequestOptions::new().with_override_url("not a url"));
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_invalid_header() {
        let result = RequestOptions::new().with_header("bad header", "value");
        assert!(matches!(result, Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let req = request("https://10.0.0.1/api/aaaLogin.json")
            .with_body(r#"{"pwd":"secret"}"#)
            .with_basic_auth("usr", "secret")
            .with_options(RequestOptions::new().no_log_payload())
            .unwrap();
        let rendered = format!("{:?}", req);
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("usr"));
    }
}
