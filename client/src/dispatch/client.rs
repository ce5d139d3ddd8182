//! Authenticated dispatch of API calls.
//!
//! [`HttpDispatcher`] looks up the session token before every call. When
//! none is cached it first acquires one from the token endpoint, stores it,
//! and then performs the original call exactly once.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, AUTHORIZATION};
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::DispatchError;
use crate::config::{Config, CredentialsConfig};
use crate::session::{CredentialStore, CredentialToken};

/// Path of the token acquisition endpoint, relative to the API base URL.
pub const TOKEN_ENDPOINT: &str = "api-token-auth/";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP methods the API layer issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => Self::GET,
            Method::Post => Self::POST,
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Get => f.write_str("GET"),
            Self::Post => f.write_str("POST"),
        }
    }
}

/// Trait for authenticated API calls.
///
/// `url` is either absolute or relative to the API base URL. Use
/// `HttpDispatcher` for real HTTP calls, or `mock::MockDispatcher` in tests.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    /// Issue one authenticated request and return its parsed JSON body.
    async fn dispatch(
        &self,
        url: &str,
        method: Method,
        body: Option<&Value>,
    ) -> Result<Value, DispatchError>;
}

/// Username/password pair exchanged for a token.
#[derive(Clone)]
pub struct AcquisitionCredentials {
    username: String,
    password: String,
}

impl AcquisitionCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl From<&CredentialsConfig> for AcquisitionCredentials {
    fn from(config: &CredentialsConfig) -> Self {
        Self::new(config.username.clone(), config.password.clone())
    }
}

impl fmt::Debug for AcquisitionCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AcquisitionCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

/// HTTP-based implementation of `Dispatcher`.
pub struct HttpDispatcher {
    client: reqwest::Client,
    base_url: String,
    credentials: AcquisitionCredentials,
    store: CredentialStore,
    timeout: Duration,
}

impl HttpDispatcher {
    /// Create a dispatcher for `base_url` with the default timeout.
    pub fn new(
        base_url: impl Into<String>,
        credentials: AcquisitionCredentials,
        store: CredentialStore,
    ) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, credentials, store)
    }

    /// Create a dispatcher with a custom `reqwest::Client`.
    pub fn with_client(
        client: reqwest::Client,
        base_url: impl Into<String>,
        credentials: AcquisitionCredentials,
        store: CredentialStore,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            credentials,
            store,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Build a dispatcher from loaded configuration.
    #[must_use]
    pub fn from_config(config: &Config, store: CredentialStore) -> Self {
        Self::new(
            config.api.base_url.clone(),
            AcquisitionCredentials::from(&config.credentials),
            store,
        )
        .with_timeout(config.api.timeout())
    }

    /// Override the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub const fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Resolve `path` against the base URL. Absolute URLs pass through.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    async fn acquire_token(&self) -> Result<CredentialToken, DispatchError> {
        let url = self.endpoint(TOKEN_ENDPOINT);
        tracing::info!(%url, username = %self.credentials.username, "Acquiring API token");

        let body = json!({
            "username": self.credentials.username,
            "password": self.credentials.password,
        });
        let value = self.send(&url, Method::Post, Some(&body), None).await?;

        let response: TokenResponse = serde_json::from_value(value)
            .map_err(|e| DispatchError::Parse(format!("token response: {e}")))?;
        if response.token.is_empty() {
            return Err(DispatchError::Parse("token response: empty token".into()));
        }
        Ok(CredentialToken::new(response.token))
    }

    async fn send(
        &self,
        url: &str,
        method: Method,
        body: Option<&Value>,
        token: Option<&CredentialToken>,
    ) -> Result<Value, DispatchError> {
        tracing::debug!(%method, %url, authenticated = token.is_some(), "Dispatching request");

        let mut request = self
            .client
            .request(method.into(), url)
            .timeout(self.timeout)
            .header(ACCEPT, "application/json");

        if let Some(token) = token {
            request = request.header(AUTHORIZATION, token.authorization());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| DispatchError::from_reqwest(e, url, self.timeout))?;

        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(DispatchError::Status {
                code: status.as_u16(),
                message,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| DispatchError::from_reqwest(e, url, self.timeout))?;

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Err(DispatchError::Parse("empty response body".into()));
        }

        serde_json::from_slice(&bytes).map_err(|e| DispatchError::Parse(e.to_string()))
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn dispatch(
        &self,
        url: &str,
        method: Method,
        body: Option<&Value>,
    ) -> Result<Value, DispatchError> {
        let token = match self.store.get() {
            Some(token) => token,
            None => {
                let token = self.acquire_token().await?;
                if let Err(e) = self.store.set(&token) {
                    // The token is still good for this call.
                    tracing::warn!("Failed to persist API token: {e}");
                }
                token
            }
        };

        let url = self.endpoint(url);
        self.send(&url, method, body, Some(&token)).await
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[allow(
    clippy::unwrap_used,
    clippy::missing_panics_doc,
    clippy::missing_const_for_fn,
    clippy::must_use_candidate
)]
pub mod mock {
    //! Mock implementation for unit testing.

    use super::{DispatchError, Dispatcher, Method};
    use async_trait::async_trait;
    use serde_json::Value;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// One call seen by `MockDispatcher`.
    #[derive(Debug, Clone, PartialEq)]
    pub struct RecordedCall {
        pub url: String,
        pub method: Method,
        pub body: Option<Value>,
    }

    /// Mock implementation of `Dispatcher` for unit tests.
    ///
    /// Queue responses per method and URL with `push_*`; each call pops the
    /// next one. Unstubbed calls fail with a 404 `Status` error.
    pub struct MockDispatcher {
        responses: Mutex<HashMap<(Method, String), VecDeque<Result<Value, DispatchError>>>>,
        calls: Mutex<Vec<RecordedCall>>,
    }

    impl MockDispatcher {
        pub fn new() -> Self {
            Self {
                responses: Mutex::new(HashMap::new()),
                calls: Mutex::new(Vec::new()),
            }
        }

        /// Queue a result for `method url`.
        pub fn push(&self, method: Method, url: &str, result: Result<Value, DispatchError>) {
            self.responses
                .lock()
                .unwrap()
                .entry((method, url.to_string()))
                .or_default()
                .push_back(result);
        }

        pub fn push_get(&self, url: &str, value: Value) {
            self.push(Method::Get, url, Ok(value));
        }

        pub fn push_post(&self, url: &str, value: Value) {
            self.push(Method::Post, url, Ok(value));
        }

        /// Every call made so far, in order.
        pub fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }

        /// Calls made to `url`.
        pub fn calls_to(&self, url: &str) -> Vec<RecordedCall> {
            self.calls()
                .into_iter()
                .filter(|call| call.url == url)
                .collect()
        }
    }

    impl Default for MockDispatcher {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl Dispatcher for MockDispatcher {
        async fn dispatch(
            &self,
            url: &str,
            method: Method,
            body: Option<&Value>,
        ) -> Result<Value, DispatchError> {
            self.calls.lock().unwrap().push(RecordedCall {
                url: url.to_string(),
                method,
                body: body.cloned(),
            });

            self.responses
                .lock()
                .unwrap()
                .get_mut(&(method, url.to_string()))
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| {
                    Err(DispatchError::Status {
                        code: 404,
                        message: format!("no stub for {method} {url}"),
                    })
                })
        }
    }
}
