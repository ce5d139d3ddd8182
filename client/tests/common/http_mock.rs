//! HTTP mock server helpers for testing outbound HTTP calls.
//!
//! A thin builder over `wiremock` for declarative stubbing of the API.
//!
//! # Quick Start
//!
//! ```ignore
//! use crate::common::http_mock::MockHttpServer;
//!
//! #[tokio::test]
//! async fn test_countries() {
//!     let server = MockHttpServer::start().await;
//!
//!     server
//!         .expect_get("/countries/")
//!         .with_header("Authorization", "Token abc")
//!         .respond_with_json(json!([]))
//!         .expect_times(1)
//!         .mount()
//!         .await;
//!
//!     // Point the dispatcher at server.url()
//!     server.verify().await;
//! }
//! ```
//!
//! # Patterns
//!
//! - **Success response**: `.respond_with_json(value)` or `.respond_with_body(string)`
//! - **Error response**: `.respond_with_status(500)`, optionally `.with_json_response(value)`
//! - **Timeout simulation**: `.respond_with_delay(Duration::from_secs(30))`
//! - **Request verification**: `.expect_times(1)` to assert call count

use std::time::Duration;

use serde_json::Value;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub struct MockHttpServer {
    server: MockServer,
}

impl MockHttpServer {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Base URL of the server, without trailing slash.
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// The wrapped wiremock server, for raw `Mock` mounting.
    pub const fn inner(&self) -> &MockServer {
        &self.server
    }

    /// Panic unless every `expect_times` expectation was met.
    pub async fn verify(&self) {
        self.server.verify().await;
    }

    pub fn expect_get(&self, path: &str) -> StubBuilder<'_> {
        StubBuilder::new(self, "GET", path)
    }

    pub fn expect_post(&self, path: &str) -> StubBuilder<'_> {
        StubBuilder::new(self, "POST", path)
    }
}

pub struct StubBuilder<'a> {
    server: &'a MockHttpServer,
    method: &'static str,
    path: String,
    headers: Vec<(String, String)>,
    query: Vec<(String, String)>,
    body: Option<Value>,
    status: u16,
    response_json: Option<Value>,
    response_body: Option<String>,
    delay: Option<Duration>,
    times: Option<u64>,
}

impl<'a> StubBuilder<'a> {
    fn new(server: &'a MockHttpServer, method: &'static str, path: &str) -> Self {
        Self {
            server,
            method,
            path: path.to_string(),
            headers: Vec::new(),
            query: Vec::new(),
            body: None,
            status: 200,
            response_json: None,
            response_body: None,
            delay: None,
            times: None,
        }
    }

    /// Only match requests carrying this header value.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Only match requests with this query parameter.
    pub fn with_query(mut self, name: &str, value: &str) -> Self {
        self.query.push((name.to_string(), value.to_string()));
        self
    }

    /// Only match requests whose JSON body equals `body`.
    pub fn with_json_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn respond_with_json(mut self, body: Value) -> Self {
        self.response_json = Some(body);
        self
    }

    pub fn respond_with_body(mut self, body: &str) -> Self {
        self.response_body = Some(body.to_string());
        self
    }

    pub const fn respond_with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    /// JSON body for a non-default status.
    pub fn with_json_response(self, body: Value) -> Self {
        self.respond_with_json(body)
    }

    pub const fn respond_with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub const fn expect_times(mut self, times: u64) -> Self {
        self.times = Some(times);
        self
    }

    pub async fn mount(self) {
        let mut builder = Mock::given(method(self.method)).and(path(self.path.as_str()));
        for (name, value) in &self.headers {
            builder = builder.and(header(name.as_str(), value.as_str()));
        }
        for (name, value) in &self.query {
            builder = builder.and(query_param(name.as_str(), value.as_str()));
        }
        if let Some(body) = self.body {
            builder = builder.and(body_json(body));
        }

        let mut response = ResponseTemplate::new(self.status);
        if let Some(json) = self.response_json {
            response = response.set_body_json(json);
        } else if let Some(body) = self.response_body {
            response = response.set_body_string(body);
        }
        if let Some(delay) = self.delay {
            response = response.set_delay(delay);
        }

        let mut mock = builder.respond_with(response);
        if let Some(times) = self.times {
            mock = mock.expect(times);
        }
        mock.mount(self.server.inner()).await;
    }
}
