//! Shared configuration for Wiser tools.
//!
//! TOML profiles, hub secret resolution (env + keyring + plaintext),
//! and translation to `wiser_core::HubConfig`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use wiser_core::{HubConfig, RetryPolicy};

const KEYRING_SERVICE: &str = "wiser";
const DEFAULT_PROFILE: &str = "default";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no profile named '{profile}' in config")]
    UnknownProfile { profile: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is given on the command line.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named hub profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some(DEFAULT_PROFILE.into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Pick a profile: `name`, else `default_profile`, else `"default"`.
    pub fn profile(&self, name: Option<&str>) -> Result<(String, &Profile), ConfigError> {
        let name = name
            .or(self.default_profile.as_deref())
            .unwrap_or(DEFAULT_PROFILE);
        self.profiles
            .get(name)
            .map(|profile| (name.to_owned(), profile))
            .ok_or_else(|| ConfigError::UnknownProfile {
                profile: name.to_owned(),
            })
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    /// Snapshot polling period in milliseconds.
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,

    /// HTTP timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Pause between write retries in milliseconds.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            refresh_interval_ms: default_refresh_interval_ms(),
            timeout: default_timeout(),
            retry_delay_ms: default_retry_delay_ms(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_refresh_interval_ms() -> u64 {
    5000
}
fn default_timeout() -> u64 {
    30
}
fn default_retry_delay_ms() -> u64 {
    1000
}

/// A named hub profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Hub address, `host` or `host:port`.
    pub endpoint: String,

    /// Hub secret (plaintext, prefer keyring or env var).
    pub secret: Option<String>,

    /// Environment variable name containing the hub secret.
    pub secret_env: Option<String>,

    /// Override the polling period.
    pub refresh_interval_ms: Option<u64>,

    /// Override the HTTP timeout.
    pub timeout: Option<u64>,

    /// Override the retry delay.
    pub retry_delay_ms: Option<u64>,

    /// Give up writes after this many attempts. Unset retries forever.
    pub max_attempts: Option<u32>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("com", "wiser", "wiser").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("wiser");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config from `path` (missing file is fine) + `WISER_` environment.
///
/// Nested keys use a double underscore: `WISER_DEFAULTS__TIMEOUT=10`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("WISER_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file doesn't exist.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Secret resolution ───────────────────────────────────────────────

fn keyring_entry(profile_name: &str) -> Result<keyring::Entry, ConfigError> {
    Ok(keyring::Entry::new(
        KEYRING_SERVICE,
        &format!("{profile_name}/secret"),
    )?)
}

/// Resolve the hub secret. `None` means the hub is used without one.
///
/// Order: env var named by `secret_env`, system keyring, plaintext.
pub fn resolve_secret(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    // 1. Profile's secret_env → env var lookup
    if let Some(val) = profile
        .secret_env
        .as_deref()
        .and_then(|name| std::env::var(name).ok())
    {
        return Some(SecretString::from(val));
    }

    // 2. System keyring
    if let Some(secret) = keyring_entry(profile_name)
        .ok()
        .and_then(|entry| entry.get_password().ok())
    {
        return Some(SecretString::from(secret));
    }

    // 3. Plaintext in config
    profile.secret.clone().map(SecretString::from)
}

/// Store a hub secret in the system keyring for `profile_name`.
pub fn store_secret(profile_name: &str, secret: &str) -> Result<(), ConfigError> {
    keyring_entry(profile_name)?.set_password(secret)?;
    Ok(())
}

// ── Translation to HubConfig ────────────────────────────────────────

/// Build a `HubConfig` from a profile, filling gaps from `defaults`.
pub fn profile_to_hub_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<HubConfig, ConfigError> {
    let endpoint = profile.endpoint.trim();
    if endpoint.is_empty() {
        return Err(ConfigError::Validation {
            field: "endpoint".into(),
            reason: format!("profile '{profile_name}' has no hub endpoint"),
        });
    }

    let refresh_ms = profile
        .refresh_interval_ms
        .unwrap_or(defaults.refresh_interval_ms);
    if refresh_ms == 0 {
        return Err(ConfigError::Validation {
            field: "refresh_interval_ms".into(),
            reason: "must be greater than zero".into(),
        });
    }

    let retry = RetryPolicy {
        delay: Duration::from_millis(profile.retry_delay_ms.unwrap_or(defaults.retry_delay_ms)),
        max_attempts: profile.max_attempts,
    };

    let mut config = HubConfig::new(endpoint)
        .with_refresh_interval(Duration::from_millis(refresh_ms))
        .with_timeout(Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)))
        .with_retry(retry);

    if let Some(secret) = resolve_secret(profile, profile_name) {
        config = config.with_secret(secret);
    }

    Ok(config)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn write(dir: &tempfile::TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("config.toml");
        std::fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config_from(&dir.path().join("absent.toml")).unwrap();

        assert_eq!(config.default_profile.as_deref(), Some("default"));
        assert_eq!(config.defaults.refresh_interval_ms, 5000);
        assert!(config.profiles.is_empty());
    }

    #[test]
    fn profiles_are_read_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = write(
            &dir,
            r#"
default_profile = "home"

[defaults]
timeout = 10

[profiles.home]
endpoint = "192.168.1.20"
refresh_interval_ms = 2000
max_attempts = 3
"#,
        );

        let config = load_config_from(&path).unwrap();
        let (name, profile) = config.profile(None).unwrap();

        assert_eq!(name, "home");
        assert_eq!(profile.endpoint, "192.168.1.20");
        assert_eq!(config.defaults.timeout, 10);
        assert_eq!(config.defaults.output, "table");
        assert!(matches!(
            config.profile(Some("office")),
            Err(ConfigError::UnknownProfile { .. })
        ));
    }

    #[test]
    fn save_then_load_keeps_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.profiles.insert(
            "default".into(),
            Profile {
                endpoint: "hub.local:8080".into(),
                ..Profile::default()
            },
        );
        save_config_to(&config, &path).unwrap();

        let loaded = load_config_from(&path).unwrap();
        assert_eq!(loaded.profile(None).unwrap().1.endpoint, "hub.local:8080");
    }

    #[test]
    fn hub_config_merges_profile_and_defaults() {
        let profile = Profile {
            endpoint: " hub.local ".into(),
            timeout: Some(5),
            max_attempts: Some(4),
            ..Profile::default()
        };

        let hub = profile_to_hub_config(&profile, "test-merge", &Defaults::default()).unwrap();

        assert_eq!(hub.endpoint, "hub.local");
        assert_eq!(hub.refresh_interval, Duration::from_millis(5000));
        assert_eq!(hub.timeout, Duration::from_secs(5));
        assert_eq!(hub.retry.delay, Duration::from_secs(1));
        assert_eq!(hub.retry.max_attempts, Some(4));
    }

    #[test]
    fn empty_endpoint_is_rejected() {
        let err = profile_to_hub_config(&Profile::default(), "empty", &Defaults::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "endpoint"));
    }

    #[test]
    fn unset_secret_env_falls_back_to_plaintext() {
        use secrecy::ExposeSecret;

        let var = "WISER_CONFIG_TEST_UNSET_SECRET";
        let profile = Profile {
            endpoint: "hub.local".into(),
            secret: Some("from-file".into()),
            secret_env: Some(var.into()),
            ..Profile::default()
        };

        let secret = resolve_secret(&profile, "wiser-config-test-no-keyring").unwrap();
        assert_eq!(secret.expose_secret(), "from-file");
    }
}
