//! Catalog configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required (REST store)
//! - `CATALOG_STORE_URL` - Base URL of the `PostgREST` project (e.g., `https://abc.supabase.co`)
//! - `CATALOG_STORE_KEY` - API key sent as `apikey` and bearer token (high entropy)
//!
//! ## Optional
//! - `CATALOG_BUILD_HOOK_URL` - Deploy hook notified after catalog mutations
//! - `CATALOG_RELOAD_TIMEOUT_SECS` - Reload timeout (default: 15)
//! - `CATALOG_COALESCE_MS` - Change notification coalescing window (default: 250)
//! - `CATALOG_POLL_INTERVAL_SECS` - REST change polling interval (default: 5)
//! - `CATALOG_BUILD_DELAY_MS` - Build hook settle delay (default: 1000)

use std::collections::HashMap;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Full catalog configuration for the REST-backed store.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    /// Remote store endpoint and credentials
    pub remote: RemoteConfig,
    /// Deploy hook notified after mutations
    pub build_hook_url: Option<Url>,
    /// Reload and notification timing
    pub sync: SyncOptions,
}

/// Remote store endpoint and credentials.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct RemoteConfig {
    /// Project base URL, always ending in `/`
    pub url: Url,
    /// API key
    pub api_key: SecretString,
}

impl std::fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteConfig")
            .field("url", &self.url.as_str())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

/// Timing knobs for reloads, reconciliation and build notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncOptions {
    /// Upper bound on one reload's fetch sequence
    pub reload_timeout: Duration,
    /// Notifications arriving within this window share one reload
    pub coalesce_window: Duration,
    /// How often the REST store polls for changes
    pub poll_interval: Duration,
    /// Settle delay before the build hook fires
    pub build_delay: Duration,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            reload_timeout: Duration::from_secs(15),
            coalesce_window: Duration::from_millis(250),
            poll_interval: Duration::from_secs(5),
            build_delay: Duration::from_millis(1000),
        }
    }
}

impl CatalogConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if the store key fails validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Ok(Self {
            remote: RemoteConfig::from_env()?,
            build_hook_url: build_hook_url_from_env()?,
            sync: SyncOptions::from_env()?,
        })
    }
}

impl RemoteConfig {
    /// Load the remote store endpoint and key.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if either variable is missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = parse_base_url("CATALOG_STORE_URL", &get_required_env("CATALOG_STORE_URL")?)?;
        let api_key = get_validated_secret("CATALOG_STORE_KEY")?;
        Ok(Self { url, api_key })
    }
}

impl SyncOptions {
    /// Load timing values, falling back to defaults for unset variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a value is not a whole number.
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            reload_timeout: parse_duration(
                "CATALOG_RELOAD_TIMEOUT_SECS",
                get_optional_env("CATALOG_RELOAD_TIMEOUT_SECS"),
                defaults.reload_timeout,
                Duration::from_secs,
            )?,
            coalesce_window: parse_duration(
                "CATALOG_COALESCE_MS",
                get_optional_env("CATALOG_COALESCE_MS"),
                defaults.coalesce_window,
                Duration::from_millis,
            )?,
            poll_interval: parse_duration(
                "CATALOG_POLL_INTERVAL_SECS",
                get_optional_env("CATALOG_POLL_INTERVAL_SECS"),
                defaults.poll_interval,
                Duration::from_secs,
            )?,
            build_delay: parse_duration(
                "CATALOG_BUILD_DELAY_MS",
                get_optional_env("CATALOG_BUILD_DELAY_MS"),
                defaults.build_delay,
                Duration::from_millis,
            )?,
        })
    }
}

/// Load the optional build hook URL.
///
/// # Errors
///
/// Returns `ConfigError::InvalidEnvVar` if the variable is set but not a URL.
pub fn build_hook_url_from_env() -> Result<Option<Url>, ConfigError> {
    get_optional_env("CATALOG_BUILD_HOOK_URL")
        .filter(|value| !value.trim().is_empty())
        .map(|value| {
            Url::parse(value.trim()).map_err(|e| {
                ConfigError::InvalidEnvVar("CATALOG_BUILD_HOOK_URL".to_string(), e.to_string())
            })
        })
        .transpose()
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Parse a project base URL, adding the trailing `/` that `Url::join` needs.
fn parse_base_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(value.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Parse a whole-number duration, or return `default` when unset.
fn parse_duration(
    key: &str,
    value: Option<String>,
    default: Duration,
    unit: fn(u64) -> Duration,
) -> Result<Duration, ConfigError> {
    value.map_or(Ok(default), |raw| {
        raw.trim()
            .parse::<u64>()
            .map(unit)
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    })
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // Key length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
