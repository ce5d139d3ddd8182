//! Session credential handling.
//!
//! [`CredentialStore`] owns the single token slot for a session. It is
//! created explicitly and injected into the dispatcher; nothing reads the
//! token from ambient state.

mod storage;

pub use storage::{FileStorage, MemoryStorage, SessionStorage, StorageError};

use std::fmt;
use std::sync::Arc;

use crate::config::{SessionConfig, StorageKind};

/// Opaque API token. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialToken(String);

impl CredentialToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for the `Authorization` header.
    #[must_use]
    pub fn authorization(&self) -> String {
        format!("Token {}", self.0)
    }
}

impl fmt::Debug for CredentialToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CredentialToken(<redacted>)")
    }
}

/// Holds the session token in session-scoped storage.
///
/// Single consumer per session; there is no expiry tracking and no refresh.
#[derive(Clone)]
pub struct CredentialStore {
    storage: Arc<dyn SessionStorage>,
    key: String,
}

impl CredentialStore {
    /// Bind a store to `storage` under `key`.
    pub fn init(storage: Arc<dyn SessionStorage>, key: impl Into<String>) -> Self {
        Self {
            storage,
            key: key.into(),
        }
    }

    /// A store whose token lives as long as the process.
    pub fn in_memory() -> Self {
        Self::init(Arc::new(MemoryStorage::new()), "bdc.auth_token")
    }

    /// Build the storage backend named by the session configuration.
    #[must_use]
    pub fn from_config(config: &SessionConfig) -> Self {
        let storage: Arc<dyn SessionStorage> = match (config.storage, &config.path) {
            (StorageKind::File, Some(path)) => Arc::new(FileStorage::new(path)),
            (StorageKind::File, None) => {
                tracing::warn!("File session storage requested without a path, using memory");
                Arc::new(MemoryStorage::new())
            }
            (StorageKind::Memory, _) => Arc::new(MemoryStorage::new()),
        };
        Self::init(storage, config.token_key.clone())
    }

    #[must_use]
    pub fn get(&self) -> Option<CredentialToken> {
        self.storage
            .get_item(&self.key)
            .filter(|value| !value.is_empty())
            .map(CredentialToken)
    }

    /// # Errors
    /// Returns an error if the storage backend cannot persist the token.
    pub fn set(&self, token: &CredentialToken) -> Result<(), StorageError> {
        self.storage.set_item(&self.key, token.as_str())
    }

    /// Forget the token, e.g. at the end of a session.
    ///
    /// # Errors
    /// Returns an error if the storage backend cannot persist the removal.
    pub fn clear(&self) -> Result<(), StorageError> {
        self.storage.remove_item(&self.key)
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("key", &self.key)
            .field("has_token", &self.get().is_some())
            .finish()
    }
}
