//! HTTP client with session handling, retries and path-addressed results.
//!
//! The [`Client`] type is the main entry point for talking to a device.
//! Use [`ClientBuilder`] to configure and create clients.

use crate::{
    auth::{Session, DEFAULT_REFRESH_INTERVAL},
    backoff::{self, Backoff},
    Body, Document, Error, Request, RequestOptions, Response, Result,
};
use http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use url::Url;

/// Default timeout for a single HTTP exchange.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

const MAX_IDLE_CONNECTIONS_PER_HOST: usize = 32;
const JSON_RPC_PATH: &str = "/ins";
const ERROR_CODE_PATH: &str = "imdata.0.error.attributes.code";
const ERROR_TEXT_PATH: &str = "imdata.0.error.attributes.text";

/// A session-aware client for one device.
///
/// The client is cheap to clone and designed to be shared: clones use the
/// same connection pool and the same session. Requests run concurrently;
/// only login and token refresh are serialized.
///
/// # Examples
///
/// ```no_run
/// use nxapi::{Body, Client};
///
/// # async fn example() -> Result<(), nxapi::Error> {
/// let client = Client::builder()
///     .base_url("https://10.0.0.1")?
///     .credentials("admin", "secret")
///     .insecure(true)
///     .max_retries(5)
///     .build()?;
///
/// // Read every instance of a class
/// let interfaces = client.get_class("l1PhysIf").await?;
/// println!("{} interfaces", interfaces.array().len());
///
/// // Create or update an object
/// let body = Body::new()
///     .set("bgpEntity.attributes.adminSt", "enabled")
///     .set("bgpEntity.children.0.bgpInst.attributes.asn", "65001");
/// client.post("sys/bgp", body).await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    pub(crate) inner: Arc<ClientInner>,
}

pub(crate) struct ClientInner {
    pub(crate) http_client: reqwest::Client,
    pub(crate) base_url: String,
    pub(crate) username: String,
    pub(crate) password: String,
    pub(crate) insecure: bool,
    pub(crate) default_headers: HeaderMap,
    pub(crate) backoff: Backoff,
    pub(crate) timeout: Duration,
    pub(crate) refresh_interval: Duration,
    pub(crate) session: Mutex<Session>,
}

/// What a single attempt brought back from the transport.
struct Exchange {
    status: StatusCode,
    headers: HeaderMap,
    body: String,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a client with default tunables.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(
        base_url: impl AsRef<str>,
        username: impl Into<String>,
        password: impl Into<String>,
        insecure: bool,
    ) -> Result<Self> {
        Self::builder()
            .base_url(base_url)?
            .credentials(username, password)
            .insecure(insecure)
            .build()
    }

    /// Returns the base URL requests are sent to.
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Returns the configured username.
    pub fn username(&self) -> &str {
        &self.inner.username
    }

    /// Returns `true` if certificate validation is disabled.
    pub fn is_insecure(&self) -> bool {
        self.inner.insecure
    }

    /// Returns the retry policy.
    pub fn backoff(&self) -> &Backoff {
        &self.inner.backoff
    }

    /// Returns the client-wide request timeout.
    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// Builds a request for `<base><path>.json`.
    ///
    /// # Errors
    ///
    /// Returns an error if the resulting URL or the options are invalid.
    pub fn new_request(
        &self,
        method: Method,
        path: &str,
        body: Option<String>,
        options: RequestOptions,
    ) -> Result<Request> {
        let url = Url::parse(&format!("{}{}.json", self.inner.base_url, path))?;
        let mut request = Request::new(method, url);
        request.body = body;
        request.with_options(options)
    }

    /// Executes a request, retrying transient failures.
    ///
    /// Transport failures, body read failures and the statuses in
    /// [`RETRYABLE_STATUS_CODES`](crate::backoff::RETRYABLE_STATUS_CODES) are
    /// retried following the client's [`Backoff`]. Any other status ends the
    /// loop at once. The body is then parsed; an error code at
    /// `imdata.0.error.attributes.code` yields [`Error::Api`] even on 200.
    ///
    /// This does not check the session. The convenience methods do that
    /// before calling it.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use nxapi::{Client, RequestOptions};
    /// use http::Method;
    ///
    /// # async fn example() -> Result<(), nxapi::Error> {
    /// let client = Client::new("https://10.0.0.1", "admin", "secret", true)?;
    ///
    /// let request = client.new_request(
    ///     Method::GET,
    ///     "/api/mo/sys/bgp",
    ///     None,
    ///     RequestOptions::new().with_query_param("rsp-subtree", "full"),
    /// )?;
    /// client.authenticate().await?;
    /// let response = client.execute(request).await?;
    /// println!("{}", response.get("imdata.0"));
    /// # Ok(())
    /// # }
    /// ```
    pub async fn execute(&self, request: Request) -> Result<Response<Document>> {
        let start_time = Instant::now();
        let mut attempt = 0;

        loop {
            let error = match self.execute_once(&request, attempt).await {
                Ok(exchange) if !backoff::is_retryable_status(exchange.status) => {
                    return self.finish(&request, exchange, start_time.elapsed(), attempt + 1);
                }
                Ok(exchange) => {
                    let document = Document::parse(&exchange.body);
                    Error::HttpError {
                        status: exchange.status,
                        raw_response: exchange.body,
                        headers: exchange.headers,
                        document,
                    }
                }
                Err(e) => e,
            };

            match self.inner.backoff.next_delay(attempt) {
                Some(delay) => {
                    tracing::warn!(
                        error = %error,
                        attempt = attempt,
                        max_retries = self.inner.backoff.max_retries,
                        delay_ms = delay.as_millis(),
                        method = %request.method,
                        url = %request.url,
                        "Request failed, retrying after delay"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => {
                    tracing::error!(
                        error = %error,
                        attempts = attempt + 1,
                        method = %request.method,
                        url = %request.url,
                        "Request failed, no retries left"
                    );
                    return Err(Error::MaxRetriesExceeded {
                        attempts: attempt + 1,
                        last_error: Box::new(error),
                    });
                }
            }
        }
    }

    /// Runs one attempt: send the request and read the full body.
    async fn execute_once(&self, request: &Request, attempt: usize) -> Result<Exchange> {
        if request.log_payload {
            tracing::debug!(
                method = %request.method,
                url = %request.url,
                attempt = attempt,
                body = request.body.as_deref().unwrap_or(""),
                "Executing HTTP request"
            );
        } else {
            tracing::debug!(
                method = %request.method,
                url = %request.url,
                attempt = attempt,
                "Executing HTTP request"
            );
        }

        let mut builder = self
            .inner
            .http_client
            .request(request.method.clone(), request.url.clone());

        for (name, value) in &self.inner.default_headers {
            builder = builder.header(name, value);
        }
        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }
        if let Some((username, password)) = &request.basic_auth {
            builder = builder.basic_auth(username, Some(password));
        }
        if let Some(body) = &request.body {
            if !request.headers.contains_key(header::CONTENT_TYPE) {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
            }
            // The transport consumes the body, so every attempt gets its own copy.
            builder = builder.body(body.clone());
        }

        let response = builder.send().await.map_err(Error::transport)?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await.map_err(Error::transport)?;

        if request.log_payload {
            tracing::debug!(status = status.as_u16(), body = %body, "Received HTTP response");
        } else {
            tracing::debug!(status = status.as_u16(), "Received HTTP response");
        }

        Ok(Exchange {
            status,
            headers,
            body,
        })
    }

    /// Turns the final exchange into a response or an error.
    fn finish(
        &self,
        request: &Request,
        exchange: Exchange,
        latency: Duration,
        attempts: usize,
    ) -> Result<Response<Document>> {
        tracing::info!(
            method = %request.method,
            url = %request.url,
            status = exchange.status.as_u16(),
            latency_ms = latency.as_millis(),
            attempts = attempts,
            "Received HTTP response"
        );

        let document = Document::parse(&exchange.body);
        let code = document.get(ERROR_CODE_PATH).str().to_owned();
        if !code.is_empty() {
            let text = document.get(ERROR_TEXT_PATH).string();
            tracing::error!(
                code = %code,
                text = %text,
                status = exchange.status.as_u16(),
                "Device returned an API error"
            );
            return Err(Error::Api {
                code,
                text,
                response: Box::new(Response::new(
                    document,
                    exchange.body,
                    exchange.status,
                    exchange.headers,
                    latency,
                    attempts,
                )),
            });
        }

        Ok(Response::new(
            document,
            exchange.body,
            exchange.status,
            exchange.headers,
            latency,
            attempts,
        ))
    }

    /// Checks the session unless the request opted out, then executes it.
    async fn send(&self, request: Request) -> Result<Response<Document>> {
        if request.refresh {
            self.authenticate().await?;
        }
        self.execute(request).await
    }

    /// Makes a GET request for `<base><path>.json`.
    ///
    /// The result is the raw document, with objects wrapped in `imdata`:
    ///
    /// ```text
    /// {"totalCount":"1","imdata":[{"bgpEntity":{"attributes":{"dn":"sys/bgp"}}}]}
    /// ```
    pub async fn get(&self, path: &str) -> Result<Response<Document>> {
        self.get_with(path, RequestOptions::default()).await
    }

    /// Like [`get`](Client::get), with per-request options.
    pub async fn get_with(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> Result<Response<Document>> {
        let request = self.new_request(Method::GET, path, None, options)?;
        self.send(request).await
    }

    /// Reads all objects of a class, unwrapped from `imdata`.
    ///
    /// The result is a list of objects still keyed by class:
    ///
    /// ```text
    /// [{"l1PhysIf":{"attributes":{"id":"eth1/1"}}},{"l1PhysIf":{"attributes":{"id":"eth1/2"}}}]
    /// ```
    pub async fn get_class(&self, class: &str) -> Result<Response<Document>> {
        self.get_class_with(class, RequestOptions::default()).await
    }

    /// Like [`get_class`](Client::get_class), with per-request options.
    pub async fn get_class_with(
        &self,
        class: &str,
        options: RequestOptions,
    ) -> Result<Response<Document>> {
        let response = self.get_with(&format!("/api/class/{}", class), options).await?;
        Ok(response.map(|doc| doc.get("imdata")))
    }

    /// Reads one object by its distinguished name.
    ///
    /// The result is the first object of `imdata`:
    ///
    /// ```text
    /// {"bgpEntity":{"attributes":{"dn":"sys/bgp","adminSt":"enabled"}}}
    /// ```
    pub async fn get_dn(&self, dn: &str) -> Result<Response<Document>> {
        self.get_dn_with(dn, RequestOptions::default()).await
    }

    /// Like [`get_dn`](Client::get_dn), with per-request options.
    pub async fn get_dn_with(
        &self,
        dn: &str,
        options: RequestOptions,
    ) -> Result<Response<Document>> {
        let response = self.get_with(&format!("/api/mo/{}", dn), options).await?;
        Ok(response.map(|doc| doc.get("imdata.0")))
    }

    /// Deletes an object by its distinguished name.
    pub async fn delete_dn(&self, dn: &str) -> Result<Response<Document>> {
        self.delete_dn_with(dn, RequestOptions::default()).await
    }

    /// Like [`delete_dn`](Client::delete_dn), with per-request options.
    pub async fn delete_dn_with(
        &self,
        dn: &str,
        options: RequestOptions,
    ) -> Result<Response<Document>> {
        let request = self.new_request(Method::DELETE, &format!("/api/mo/{}", dn), None, options)?;
        self.send(request).await
    }

    /// Creates or updates an object, merging `body` into it.
    ///
    /// Build the body with [`Body`].
    pub async fn post(&self, dn: &str, body: impl Into<String>) -> Result<Response<Document>> {
        self.post_with(dn, body, RequestOptions::default()).await
    }

    /// Like [`post`](Client::post), with per-request options.
    pub async fn post_with(
        &self,
        dn: &str,
        body: impl Into<String>,
        options: RequestOptions,
    ) -> Result<Response<Document>> {
        let request = self.new_request(
            Method::POST,
            &format!("/api/mo/{}", dn),
            Some(body.into()),
            options,
        )?;
        self.send(request).await
    }

    /// Replaces an object with `body`.
    pub async fn put(&self, dn: &str, body: impl Into<String>) -> Result<Response<Document>> {
        self.put_with(dn, body, RequestOptions::default()).await
    }

    /// Like [`put`](Client::put), with per-request options.
    pub async fn put_with(
        &self,
        dn: &str,
        body: impl Into<String>,
        options: RequestOptions,
    ) -> Result<Response<Document>> {
        let request = self.new_request(
            Method::PUT,
            &format!("/api/mo/{}", dn),
            Some(body.into()),
            options,
        )?;
        self.send(request).await
    }

    /// Runs a CLI command through the JSON-RPC endpoint.
    ///
    /// This endpoint uses basic authentication with the configured
    /// credentials instead of the session token.
    pub async fn json_rpc(&self, command: &str) -> Result<Response<Document>> {
        self.json_rpc_with(command, RequestOptions::default()).await
    }

    /// Like [`json_rpc`](Client::json_rpc), with per-request options.
    pub async fn json_rpc_with(
        &self,
        command: &str,
        options: RequestOptions,
    ) -> Result<Response<Document>> {
        let body = Body::from("[]")
            .set("0.jsonrpc", "2.0")
            .set("0.method", "cli")
            .set("0.params.cmd", command)
            .set_value("0.params.version", 1)
            .set_value("0.id", 1);

        let url = Url::parse(&format!("{}{}", self.inner.base_url, JSON_RPC_PATH))?;
        let options = options
            .with_header(header::CONTENT_TYPE, "application/json-rpc")?
            .with_header(header::CACHE_CONTROL, "no-cache")?;
        let request = Request::new(Method::POST, url)
            .with_body(body)
            .with_basic_auth(self.inner.username.as_str(), self.inner.password.as_str())
            .with_options(options)?;

        self.execute(request).await
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// Unset options keep their defaults: 60 s timeout, 3 retries, backoff
/// between 4 s and 60 s with factor 3, token refresh after 480 s and
/// certificate validation on.
///
/// # Examples
///
/// ```no_run
/// use nxapi::ClientBuilder;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), nxapi::Error> {
/// let client = ClientBuilder::new()
///     .base_url("https://10.0.0.1")?
///     .credentials("admin", "secret")
///     .timeout(Duration::from_secs(120))
///     .backoff_min_delay(Duration::from_secs(1))
///     .default_header("User-Agent", "netops/1.0")?
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    base_url: Option<Url>,
    username: String,
    password: String,
    insecure: bool,
    default_headers: HeaderMap,
    backoff: Backoff,
    timeout: Duration,
    refresh_interval: Duration,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            base_url: None,
            username: String::new(),
            password: String::new(),
            insecure: false,
            default_headers: HeaderMap::new(),
            backoff: Backoff::default(),
            timeout: DEFAULT_TIMEOUT,
            refresh_interval: DEFAULT_REFRESH_INTERVAL,
        }
    }

    /// Sets the base URL of the device, e.g. `https://10.0.0.1`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn base_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.base_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Sets the username and password used for login and JSON-RPC.
    pub fn credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Accepts invalid TLS certificates when `true`.
    pub fn insecure(mut self, insecure: bool) -> Self {
        self.insecure = insecure;
        self
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the timeout of a single HTTP exchange.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the maximum number of retries.
    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.backoff.max_retries = max_retries;
        self
    }

    /// Sets the minimum delay between two attempts.
    pub fn backoff_min_delay(mut self, delay: Duration) -> Self {
        self.backoff.min_delay = delay;
        self
    }

    /// Sets the maximum delay between two attempts.
    pub fn backoff_max_delay(mut self, delay: Duration) -> Self {
        self.backoff.max_delay = delay;
        self
    }

    /// Sets the factor the delay grows by per attempt.
    pub fn backoff_delay_factor(mut self, factor: f64) -> Self {
        self.backoff.factor = factor;
        self
    }

    /// Replaces the whole retry policy.
    pub fn backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    /// Sets the age after which the session token is refreshed.
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if no base URL was provided, the backoff settings
    /// are inconsistent, or the HTTP client cannot be built.
    pub fn build(self) -> Result<Client> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::ConfigurationError("Base URL is required".to_string()))?;
        self.backoff.validate()?;

        let http_client = reqwest::Client::builder()
            .timeout(self.timeout)
            .cookie_store(true)
            .danger_accept_invalid_certs(self.insecure)
            .pool_max_idle_per_host(MAX_IDLE_CONNECTIONS_PER_HOST)
            .build()
            .map_err(|e| {
                Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Client {
            inner: Arc::new(ClientInner {
                http_client,
                base_url: base_url.as_str().trim_end_matches('/').to_string(),
                username: self.username,
                password: self.password,
                insecure: self.insecure,
                default_headers: self.default_headers,
                backoff: self.backoff,
                timeout: self.timeout,
                refresh_interval: self.refresh_interval,
                session: Mutex::new(Session::default()),
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let client = Client::builder()
            .base_url("https://10.0.0.1")
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(client.base_url(), "https://10.0.0.1");
        assert_eq!(client.timeout(), DEFAULT_TIMEOUT);
        assert_eq!(*client.backoff(), Backoff::default());
        assert!(!client.is_insecure());
    }

    #[test]
    fn test_builder_overrides() {
        let client = Client::builder()
            .base_url("https://10.0.0.1/")
            .unwrap()
            .credentials("usr", "pwd")
            .insecure(true)
            .timeout(Duration::from_secs(120))
            .max_retries(5)
            .backoff_min_delay(Duration::from_secs(1))
            .backoff_max_delay(Duration::from_secs(10))
            .backoff_delay_factor(2.0)
            .build()
            .unwrap();

        assert_eq!(client.base_url(), "https://10.0.0.1");
        assert_eq!(client.username(), "usr");
        assert!(client.is_insecure());
        assert_eq!(client.timeout(), Duration::from_secs(120));
        assert_eq!(
            *client.backoff(),
            Backoff {
                max_retries: 5,
                min_delay: Duration::from_secs(1),
                max_delay: Duration::from_secs(10),
                factor: 2.0,
            }
        );
    }

    #[test]
    fn test_builder_requires_base_url() {
        assert!(matches!(
            Client::builder().build(),
            Err(Error::ConfigurationError(_))
        ));
    }

    #[test]
    fn test_builder_rejects_inverted_backoff() {
        let result = Client::builder()
            .base_url("https://10.0.0.1")
            .unwrap()
            .backoff_min_delay(Duration::from_secs(30))
            .backoff_max_delay(Duration::from_secs(5))
            .build();
        assert!(matches!(result, Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn test_new_request_appends_json_suffix() {
        let client = Client::new("https://10.0.0.1", "usr", "pwd", true).unwrap();
        let request = client
            .new_request(
                Method::GET,
                "/api/mo/sys/intf/phys-[eth1/1]",
                None,
                RequestOptions::new().with_query_param("rsp-subtree", "full"),
            )
            .unwrap();

        assert_eq!(
            request.url.as_str(),
            "https://10.0.0.1/api/mo/sys/intf/phys-[eth1/1].json?rsp-subtree=full"
        );
        assert!(request.refresh);
    }
}
