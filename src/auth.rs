//! Session authentication: login, token refresh and the check that runs
//! before every authenticated request.
//!
//! The token and the instant of its last refresh live behind one async mutex
//! owned by the client. [`Client::authenticate`] holds that lock for the whole
//! check-then-act region, so concurrent callers that all see a missing or
//! stale token queue up behind a single login or refresh and then find the
//! fresh session already in place.

use crate::{Body, Client, Error, RequestOptions, Result};
use http::Method;
use std::time::{Duration, Instant};

/// Default age after which the session token is refreshed.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(480);

const LOGIN_PATH: &str = "/api/aaaLogin";
const REFRESH_PATH: &str = "/api/aaaRefresh";
const LOGIN_TOKEN_PATH: &str = "imdata.0.aaaLogin.attributes.token";
const REFRESH_TOKEN_PATH: &str = "imdata.0.aaaRefresh.attributes.token";

/// Session state guarded by the client's auth lock.
#[derive(Debug, Default)]
pub(crate) struct Session {
    token: String,
    last_refresh: Option<Instant>,
}

/// What [`Client::authenticate`] has to do for the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionAction {
    Login,
    Refresh,
    Keep,
}

impl Session {
    fn next_action(&self, refresh_interval: Duration, now: Instant) -> SessionAction {
        match self.last_refresh {
            _ if self.token.is_empty() => SessionAction::Login,
            Some(at) if now.saturating_duration_since(at) <= refresh_interval => {
                SessionAction::Keep
            }
            _ => SessionAction::Refresh,
        }
    }

    fn store(&mut self, token: String, now: Instant) {
        self.token = token;
        self.last_refresh = Some(now);
    }
}

impl Client {
    /// Logs in with the configured credentials and stores the session token.
    ///
    /// The login exchange never checks the session itself and never logs its
    /// payloads, so credentials and tokens stay out of the logs.
    ///
    /// # Errors
    ///
    /// Returns the transport, status or API error of the login call, or
    /// [`Error::Authentication`] if the response carried no token.
    pub async fn login(&self) -> Result<()> {
        let mut session = self.inner.session.lock().await;
        self.login_locked(&mut session).await
    }

    /// Requests a new token for the current session and stores it.
    ///
    /// This happens automatically before requests once the token is older
    /// than the refresh interval; pass [`RequestOptions::no_refresh`] to
    /// requests that should manage the session by hand.
    ///
    /// # Errors
    ///
    /// Returns the transport, status or API error of the refresh call, or
    /// [`Error::Authentication`] if the response carried no token.
    pub async fn refresh(&self) -> Result<()> {
        let mut session = self.inner.session.lock().await;
        self.refresh_locked(&mut session).await
    }

    /// Logs in if no token is held, or refreshes the token once it is older
    /// than the refresh interval. Otherwise does nothing.
    ///
    /// Only one login or refresh runs at a time; other callers wait for it
    /// and then reuse its result. The login retries under the lock, so waiters
    /// may block through its whole retry budget (about 3 x 60 s with defaults).
    pub async fn authenticate(&self) -> Result<()> {
        let mut session = self.inner.session.lock().await;
        match session.next_action(self.inner.refresh_interval, Instant::now()) {
            SessionAction::Login => self.login_locked(&mut session).await,
            SessionAction::Refresh => self.refresh_locked(&mut session).await,
            SessionAction::Keep => Ok(()),
        }
    }

    /// Returns the current session token, if logged in.
    pub async fn token(&self) -> Option<String> {
        let session = self.inner.session.lock().await;
        (!session.token.is_empty()).then(|| session.token.clone())
    }

    /// Returns when the session token was last obtained.
    pub async fn last_refresh(&self) -> Option<Instant> {
        self.inner.session.lock().await.last_refresh
    }

    async fn login_locked(&self, session: &mut Session) -> Result<()> {
        tracing::debug!(username = %self.inner.username, "Logging in");

        let body = Body::new()
            .set("aaaUser.attributes.name", self.inner.username.as_str())
            .set("aaaUser.attributes.pwd", self.inner.password.as_str());
        let request = self.new_request(
            Method::POST,
            LOGIN_PATH,
            Some(body.into_string()),
            session_options(),
        )?;
        let response = self.execute(request).await?;

        let token = response.get(LOGIN_TOKEN_PATH).str().to_owned();
        if token.is_empty() {
            return Err(Error::Authentication(
                "login response carried no token".to_string(),
            ));
        }
        session.store(token, Instant::now());

        tracing::info!(username = %self.inner.username, "Logged in");
        Ok(())
    }

    async fn refresh_locked(&self, session: &mut Session) -> Result<()> {
        tracing::debug!("Refreshing session token");

        let request = self.new_request(Method::GET, REFRESH_PATH, None, session_options())?;
        let response = self.execute(request).await?;

        let token = response.get(REFRESH_TOKEN_PATH).str().to_owned();
        if token.is_empty() {
            return Err(Error::Authentication(
                "refresh response carried no token".to_string(),
            ));
        }
        session.store(token, Instant::now());

        tracing::debug!("Session token refreshed");
        Ok(())
    }
}

/// Options for the login and refresh calls.
fn session_options() -> RequestOptions {
    RequestOptions::new().no_refresh().no_log_payload()
}
