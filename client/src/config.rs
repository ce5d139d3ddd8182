use figment::{
    providers::{Env, Format, Serialized, Yaml},
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_aux::prelude::deserialize_vec_from_string_or_vec;
use std::fmt;
use std::time::Duration;

/// Client configuration loaded from multiple sources.
///
/// Configuration is loaded in priority order (lowest to highest):
/// 1. Struct defaults
/// 2. config.yaml file (if exists)
/// 3. Environment variables with BDC_ prefix (always wins)
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub api: ApiConfig,
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub lookup: LookupConfig,
    #[serde(default)]
    pub forms: FormsConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub navigation: NavigationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// Base URL of the remote API (required, supplied by the host deployment).
    #[serde(default)]
    pub base_url: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ApiConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Credentials used to acquire an API token on first authenticated call.
#[derive(Clone, Default, Deserialize, Serialize)]
pub struct CredentialsConfig {
    /// Acquisition username (required, no compiled-in default).
    #[serde(default)]
    pub username: String,

    /// Acquisition password (required, no compiled-in default).
    #[serde(default)]
    pub password: String,
}

impl fmt::Debug for CredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsConfig")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Memory,
    File,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    /// Where the session token lives (default: memory).
    #[serde(default = "default_storage_kind")]
    pub storage: StorageKind,

    /// File path for `storage = "file"`.
    pub path: Option<String>,

    /// Key the token is stored under.
    #[serde(default = "default_token_key")]
    pub token_key: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LookupConfig {
    /// Minimum search length before a remote lookup is issued.
    #[serde(default = "default_min_query_len")]
    pub min_query_len: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FormsConfig {
    /// Country whose postal codes can be looked up remotely.
    #[serde(default = "default_country")]
    pub default_country: String,

    /// Accepted first letters of a member identifier.
    /// Accepts either an array or comma-separated string.
    #[serde(
        default = "default_member_id_prefixes",
        deserialize_with = "deserialize_prefixes"
    )]
    pub member_id_prefixes: Vec<String>,

    /// Lowest custom subscription amount accepted.
    #[serde(default = "default_minimum_custom_amount")]
    pub minimum_custom_amount: u32,
}

impl FormsConfig {
    /// Prefix letters as chars. Entries that are not a single char are skipped;
    /// `Config::validate` rejects them before this is reached.
    #[must_use]
    pub fn prefix_chars(&self) -> Vec<char> {
        self.member_id_prefixes
            .iter()
            .filter_map(|p| {
                let mut chars = p.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(c),
                    _ => None,
                }
            })
            .collect()
    }
}

/// Deserialize prefixes from comma-separated string or array, filtering empty values.
fn deserialize_prefixes<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let prefixes: Vec<String> = deserialize_vec_from_string_or_vec(deserializer)?;
    Ok(prefixes
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect())
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NotificationConfig {
    /// How long a toast stays on screen.
    #[serde(default = "default_display_ms")]
    pub display_ms: u64,

    /// How long a toast stays after the pointer leaves it.
    #[serde(default = "default_extended_ms")]
    pub extended_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NavigationConfig {
    /// Delay before following up a successful submission.
    #[serde(default = "default_navigation_delay_ms")]
    pub delay_ms: u64,

    /// Where to go after a member is created. `{id}` is replaced by the new id.
    #[serde(default = "default_member_follow_on")]
    pub member_follow_on: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level filter (debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

// These functions cannot be const because serde uses function pointers for defaults
#[allow(clippy::missing_const_for_fn)]
fn default_timeout_secs() -> u64 {
    30
}

#[allow(clippy::missing_const_for_fn)]
fn default_storage_kind() -> StorageKind {
    StorageKind::Memory
}

fn default_token_key() -> String {
    "bdc.auth_token".to_string()
}

#[allow(clippy::missing_const_for_fn)]
fn default_min_query_len() -> usize {
    4
}

fn default_country() -> String {
    "France".to_string()
}

fn default_member_id_prefixes() -> Vec<String> {
    vec!["E".to_string(), "Z".to_string()]
}

#[allow(clippy::missing_const_for_fn)]
fn default_minimum_custom_amount() -> u32 {
    20
}

#[allow(clippy::missing_const_for_fn)]
fn default_display_ms() -> u64 {
    5_000
}

#[allow(clippy::missing_const_for_fn)]
fn default_extended_ms() -> u64 {
    10_000
}

#[allow(clippy::missing_const_for_fn)]
fn default_navigation_delay_ms() -> u64 {
    3_000
}

fn default_member_follow_on() -> String {
    "/members/subscription/add/{id}".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            storage: default_storage_kind(),
            path: None,
            token_key: default_token_key(),
        }
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            min_query_len: default_min_query_len(),
        }
    }
}

impl Default for FormsConfig {
    fn default() -> Self {
        Self {
            default_country: default_country(),
            member_id_prefixes: default_member_id_prefixes(),
            minimum_custom_amount: default_minimum_custom_amount(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            display_ms: default_display_ms(),
            extended_ms: default_extended_ms(),
        }
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            delay_ms: default_navigation_delay_ms(),
            member_follow_on: default_member_follow_on(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: String::new(),
                timeout_secs: default_timeout_secs(),
            },
            credentials: CredentialsConfig::default(),
            session: SessionConfig::default(),
            lookup: LookupConfig::default(),
            forms: FormsConfig::default(),
            notifications: NotificationConfig::default(),
            navigation: NavigationConfig::default(),
            logging: LoggingConfig {
                level: default_log_level(),
            },
        }
    }
}

/// Configuration loading and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// Sources are merged in priority order:
    /// 1. Struct defaults (lowest)
    /// 2. config.yaml file (if exists)
    /// 3. Environment variables with BDC_ prefix (highest)
    ///
    /// # Errors
    /// Returns an error if configuration cannot be loaded or is invalid.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config.yaml")
    }

    /// Load configuration with a custom YAML file path.
    ///
    /// # Errors
    /// Returns an error if configuration cannot be loaded or is invalid.
    pub fn load_from(yaml_path: &str) -> Result<Self, ConfigError> {
        let config: Self = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(Yaml::file(yaml_path))
            .merge(Env::prefixed("BDC_").split("__"))
            .extract()?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let base_url = &self.api.base_url;
        if base_url.is_empty() {
            return Err(ConfigError::Validation(
                "api.base_url is required. Set BDC_API__BASE_URL environment variable or configure in config.yaml.".into(),
            ));
        }
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(format!(
                "api.base_url must start with http:// or https://, got: '{base_url}'"
            )));
        }

        if self.api.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "api.timeout_secs cannot be 0".into(),
            ));
        }

        if self.credentials.username.is_empty() {
            return Err(ConfigError::Validation(
                "credentials.username is required. Set BDC_CREDENTIALS__USERNAME environment variable or configure in config.yaml.".into(),
            ));
        }

        if self.credentials.password.is_empty() {
            return Err(ConfigError::Validation(
                "credentials.password is required. Set BDC_CREDENTIALS__PASSWORD environment variable or configure in config.yaml.".into(),
            ));
        }

        if self.session.storage == StorageKind::File && self.session.path.is_none() {
            return Err(ConfigError::Validation(
                "session.path is required when session.storage is 'file'".into(),
            ));
        }

        if self.session.token_key.is_empty() {
            return Err(ConfigError::Validation(
                "session.token_key cannot be empty".into(),
            ));
        }

        if self.lookup.min_query_len == 0 {
            return Err(ConfigError::Validation(
                "lookup.min_query_len cannot be 0".into(),
            ));
        }

        if self.forms.member_id_prefixes.is_empty() {
            return Err(ConfigError::Validation(
                "forms.member_id_prefixes cannot be empty".into(),
            ));
        }
        for prefix in &self.forms.member_id_prefixes {
            let mut chars = prefix.chars();
            let single_upper = matches!(
                (chars.next(), chars.next()),
                (Some(c), None) if c.is_ascii_uppercase()
            );
            if !single_upper {
                return Err(ConfigError::Validation(format!(
                    "forms.member_id_prefixes contains invalid prefix '{prefix}'. Must be a single uppercase letter"
                )));
            }
        }

        if self.notifications.display_ms == 0 {
            return Err(ConfigError::Validation(
                "notifications.display_ms cannot be 0".into(),
            ));
        }

        if self.notifications.extended_ms < self.notifications.display_ms {
            return Err(ConfigError::Validation(format!(
                "notifications.extended_ms ({}) must be at least notifications.display_ms ({})",
                self.notifications.extended_ms, self.notifications.display_ms
            )));
        }

        if !self.navigation.member_follow_on.contains("{id}") {
            return Err(ConfigError::Validation(format!(
                "navigation.member_follow_on must contain '{{id}}', got: '{}'",
                self.navigation.member_follow_on
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.api.base_url = "http://localhost:8000/".into();
        config.credentials.username = "bdc".into();
        config.credentials.password = "s3cret".into();
        config
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.api.timeout_secs, 30);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.session.storage, StorageKind::Memory);
        assert_eq!(config.session.token_key, "bdc.auth_token");
        assert_eq!(config.lookup.min_query_len, 4);
        assert_eq!(config.forms.default_country, "France");
        assert_eq!(config.forms.member_id_prefixes, vec!["E", "Z"]);
        assert_eq!(config.forms.minimum_custom_amount, 20);
        assert_eq!(config.notifications.display_ms, 5_000);
        assert_eq!(config.notifications.extended_ms, 10_000);
        assert!(config.api.base_url.is_empty());
        assert!(config.credentials.username.is_empty());
        assert!(config.credentials.password.is_empty());
    }

    #[test]
    fn test_validation_accepts_valid_config() {
        let config = valid_config();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_missing_base_url() {
        let mut config = valid_config();
        config.api.base_url = "".into();
        let result = config.validate();
        assert!(result.unwrap_err().to_string().contains("api.base_url"));
    }

    #[test]
    fn test_validation_rejects_empty_credentials() {
        let mut config = valid_config();
        config.credentials.username = "".into();
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("credentials.username"));

        let mut config = valid_config();
        config.credentials.password = "".into();
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("credentials.password"));
    }

    #[test]
    fn test_validation_requires_path_for_file_storage() {
        let mut config = valid_config();
        config.session.storage = StorageKind::File;
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("session.path"));

        config.session.path = Some("/tmp/bdc-session.json".into());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_credentials_debug_redacts_password() {
        let config = valid_config();
        let debug = format!("{:?}", config.credentials);
        assert!(debug.contains("bdc"));
        assert!(!debug.contains("s3cret"));
    }

    #[test]
    fn test_prefixes_deserialize_comma_separated_string() {
        let json = r#"{"member_id_prefixes": "E, Z"}"#;
        let config: FormsConfig = serde_json::from_str(json).expect("should parse");
        assert_eq!(config.member_id_prefixes, vec!["E", "Z"]);
        assert_eq!(config.prefix_chars(), vec!['E', 'Z']);
    }

    #[test]
    fn test_prefixes_deserialize_array() {
        let json = r#"{"member_id_prefixes": ["E"]}"#;
        let config: FormsConfig = serde_json::from_str(json).expect("should parse");
        assert_eq!(config.prefix_chars(), vec!['E']);
    }

    #[test]
    fn test_load_from_env_overrides_yaml() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "bdc.yaml",
                r"
api:
  base_url: http://yaml.example.com/
credentials:
  username: from-yaml
  password: from-yaml
logging:
  level: debug
",
            )?;
            jail.set_env("BDC_API__BASE_URL", "https://env.example.com/");
            jail.set_env("BDC_LOOKUP__MIN_QUERY_LEN", "3");

            let config = Config::load_from("bdc.yaml").expect("config should load");
            assert_eq!(config.api.base_url, "https://env.example.com/");
            assert_eq!(config.credentials.username, "from-yaml");
            assert_eq!(config.lookup.min_query_len, 3);
            assert_eq!(config.logging.level, "debug");
            Ok(())
        });
    }

    // Table-driven boundary tests for validation rules

    #[test]
    fn base_url_boundaries() {
        let cases = [
            ("http://localhost:8000/", true, "http with port"),
            ("https://api.example.com/", true, "https"),
            ("ftp://api.example.com/", false, "ftp scheme"),
            ("api.example.com", false, "no scheme"),
        ];

        for (url, should_pass, desc) in cases {
            let mut config = valid_config();
            config.api.base_url = url.into();
            let result = config.validate();
            assert_eq!(result.is_ok(), should_pass, "case '{}': {:?}", desc, result);
        }
    }

    #[test]
    fn prefix_boundaries() {
        let cases = [
            (vec!["E"], true, "single prefix"),
            (vec!["E", "Z"], true, "default prefixes"),
            (vec![], false, "empty list"),
            (vec!["e"], false, "lowercase"),
            (vec!["EZ"], false, "two letters"),
            (vec!["1"], false, "digit"),
        ];

        for (prefixes, should_pass, desc) in cases {
            let mut config = valid_config();
            config.forms.member_id_prefixes = prefixes.into_iter().map(String::from).collect();
            let result = config.validate();
            assert_eq!(result.is_ok(), should_pass, "case '{}': {:?}", desc, result);
        }
    }

    #[test]
    fn notification_duration_boundaries() {
        let cases = [
            (5_000u64, 10_000u64, true, "defaults"),
            (3_000, 3_000, true, "equal durations"),
            (0, 10_000, false, "zero display"),
            (5_000, 4_000, false, "extended shorter than display"),
        ];

        for (display, extended, should_pass, desc) in cases {
            let mut config = valid_config();
            config.notifications.display_ms = display;
            config.notifications.extended_ms = extended;
            let result = config.validate();
            assert_eq!(result.is_ok(), should_pass, "case '{}': {:?}", desc, result);
        }
    }

    #[test]
    fn follow_on_boundaries() {
        let cases = [
            ("/members/subscription/add/{id}", true, "default"),
            ("/members/{id}", true, "custom"),
            ("/members/subscription/add/", false, "missing placeholder"),
        ];

        for (template, should_pass, desc) in cases {
            let mut config = valid_config();
            config.navigation.member_follow_on = template.into();
            let result = config.validate();
            assert_eq!(result.is_ok(), should_pass, "case '{}': {:?}", desc, result);
        }
    }
}
