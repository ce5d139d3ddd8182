//! Common test utilities for integration tests.
//!
//! - [`http_mock::MockHttpServer`] - Declarative wiremock stubs for the API
//! - [`test_config`] - A valid `Config` pointing at a mock server

#![allow(dead_code)]

pub mod http_mock;

use bureaudechange_client::config::{ApiConfig, Config, CredentialsConfig, NavigationConfig};

pub const USERNAME: &str = "bdc-test";
pub const PASSWORD: &str = "not-a-real-password";

/// Configuration for tests: mock base URL, test credentials, short navigation delay.
pub fn test_config(base_url: &str) -> Config {
    Config {
        api: ApiConfig {
            base_url: base_url.to_string(),
            timeout_secs: 5,
        },
        credentials: CredentialsConfig {
            username: USERNAME.to_string(),
            password: PASSWORD.to_string(),
        },
        navigation: NavigationConfig {
            delay_ms: 50,
            ..NavigationConfig::default()
        },
        ..Config::default()
    }
}
