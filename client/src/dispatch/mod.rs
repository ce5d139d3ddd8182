//! Authenticated API dispatch.
//!
//! # Architecture
//!
//! - [`Dispatcher`] - Trait every API consumer depends on
//! - [`HttpDispatcher`] - reqwest implementation that acquires a token on first use
//! - [`mock::MockDispatcher`] - Queue-based mock (behind `test-utils` feature)
//!
//! # Example
//!
//! ```ignore
//! use bureaudechange_client::dispatch::{Dispatcher, HttpDispatcher, Method};
//! use bureaudechange_client::session::CredentialStore;
//!
//! let dispatcher = HttpDispatcher::from_config(&config, CredentialStore::in_memory());
//! let countries = dispatcher.dispatch("countries/", Method::Get, None).await?;
//! ```

mod client;
mod error;

pub use client::{AcquisitionCredentials, Dispatcher, HttpDispatcher, Method, TOKEN_ENDPOINT};
pub use error::{DispatchError, NetworkError};

#[cfg(any(test, feature = "test-utils"))]
pub use client::mock;
