//! Shared configuration for botdesk tools.
//!
//! TOML profiles layered with `BOTDESK_` environment overrides, translation
//! to `botdesk_core::ClientConfig`, and [`FileStorage`], the on-disk
//! persistence backend for the core's session and settings stores.

mod storage;

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

use botdesk_core::{ClientConfig, DEFAULT_API_URL, TlsVerification};

pub use storage::FileStorage;

/// Overrides the active profile's backend URL.
pub const ENV_API_URL: &str = "BOTDESK_API_URL";

/// Password for non-interactive login.
pub const ENV_PASSWORD: &str = "BOTDESK_PASSWORD";

/// Profile used when neither the flag nor the config names one.
pub const DEFAULT_PROFILE: &str = "default";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("unknown profile '{name}'")]
    UnknownProfile { name: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level `config.toml`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when `--profile` is not given.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
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

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Seconds a cached read is served without refetching.
    #[serde(default = "default_stale_time")]
    pub stale_time: u64,

    /// Seconds between `version.json` polls. `0` disables polling.
    #[serde(default = "default_version_poll")]
    pub version_poll: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
            stale_time: default_stale_time(),
            version_poll: default_version_poll(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    30
}
fn default_stale_time() -> u64 {
    30
}
fn default_version_poll() -> u64 {
    300
}

/// A named backend profile.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Profile {
    /// Backend base URL (e.g., "https://bots.example.com").
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Account used by `auth login` when `--email` is omitted.
    pub email: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override timeout.
    pub timeout: Option<u64>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            email: None,
            ca_cert: None,
            insecure: None,
            timeout: None,
        }
    }
}

fn default_api_url() -> String {
    DEFAULT_API_URL.into()
}

impl Config {
    /// The profile to use: explicit name, then `default_profile`, then `"default"`.
    pub fn active_profile_name(&self, requested: Option<&str>) -> String {
        requested
            .or(self.default_profile.as_deref())
            .unwrap_or(DEFAULT_PROFILE)
            .to_owned()
    }

    /// Look up a profile. The default profile always exists, even if unconfigured.
    pub fn profile(&self, name: &str) -> Result<Profile, ConfigError> {
        match self.profiles.get(name) {
            Some(profile) => Ok(profile.clone()),
            None if name == DEFAULT_PROFILE => Ok(Profile::default()),
            None => Err(ConfigError::UnknownProfile { name: name.into() }),
        }
    }
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "botdesk", "botdesk")
}

fn home_fallback(parts: &[&str]) -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.extend(parts);
    p
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(&[".config", "botdesk", "config.toml"]),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

/// Directory holding client-persisted state (session, settings).
pub fn data_dir() -> PathBuf {
    project_dirs().map_or_else(
        || home_fallback(&[".local", "share", "botdesk"]),
        |dirs| dirs.data_dir().to_path_buf(),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from `path` + environment. A missing file yields the defaults.
///
/// Nested keys are overridden with a double underscore, e.g.
/// `BOTDESK_DEFAULTS__TIMEOUT=60`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("BOTDESK_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if it can't be read.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credentials ─────────────────────────────────────────────────────

/// Password from `BOTDESK_PASSWORD`, if set and non-empty.
pub fn password_from_env() -> Option<SecretString> {
    std::env::var(ENV_PASSWORD)
        .ok()
        .filter(|pw| !pw.is_empty())
        .map(SecretString::from)
}

// ── Translation to the core config ──────────────────────────────────

/// Build a `ClientConfig` from a profile and the global defaults.
///
/// `api_url_override` (the `--api-url` flag or `BOTDESK_API_URL`) wins over
/// the profile's URL.
pub fn profile_to_client_config(
    profile: &Profile,
    defaults: &Defaults,
    api_url_override: Option<&str>,
) -> Result<ClientConfig, ConfigError> {
    let raw = api_url_override.unwrap_or(&profile.api_url);
    let base_url: url::Url = raw.parse().map_err(|_| ConfigError::Validation {
        field: "api_url".into(),
        reason: format!("invalid URL: {raw}"),
    })?;
    if !matches!(base_url.scheme(), "http" | "https") {
        return Err(ConfigError::Validation {
            field: "api_url".into(),
            reason: format!("expected an http(s) URL, got '{raw}'"),
        });
    }

    let tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    Ok(ClientConfig {
        tls,
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
        stale_time: Duration::from_secs(defaults.stale_time),
        version_poll_interval: Duration::from_secs(defaults.version_poll),
        ..ClientConfig::new(base_url)
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = load_config_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(cfg.default_profile.as_deref(), Some("default"));
        assert_eq!(cfg.defaults.timeout, 30);
        assert!(cfg.profiles.is_empty());
    }

    #[test]
    fn file_profiles_merge_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
default_profile = "staging"

[defaults]
timeout = 10

[profiles.staging]
api_url = "https://staging.example.com"
email = "ops@example.com"
insecure = true
"#,
        )
        .unwrap();

        let cfg = load_config_from(&path).unwrap();
        assert_eq!(cfg.active_profile_name(None), "staging");
        assert_eq!(cfg.defaults.output, "table");
        let staging = cfg.profile("staging").unwrap();
        assert_eq!(staging.email.as_deref(), Some("ops@example.com"));

        let client = profile_to_client_config(&staging, &cfg.defaults, None).unwrap();
        assert_eq!(client.base_url.as_str(), "https://staging.example.com/");
        assert_eq!(client.tls, TlsVerification::DangerAcceptInvalid);
        assert_eq!(client.timeout, Duration::from_secs(10));
    }

    #[test]
    fn save_then_load_keeps_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");
        let mut cfg = Config::default();
        cfg.profiles.insert(
            "prod".into(),
            Profile {
                api_url: "https://bots.example.com".into(),
                ca_cert: Some(PathBuf::from("/etc/ssl/botdesk.pem")),
                ..Profile::default()
            },
        );

        save_config_to(&cfg, &path).unwrap();
        assert_eq!(load_config_from(&path).unwrap(), cfg);
    }

    #[test]
    fn unknown_profiles_are_errors_but_default_always_resolves() {
        let cfg = Config::default();
        assert_eq!(cfg.profile("default").unwrap().api_url, DEFAULT_API_URL);
        assert!(matches!(
            cfg.profile("nope"),
            Err(ConfigError::UnknownProfile { .. })
        ));
        assert_eq!(cfg.active_profile_name(Some("nope")), "nope");
    }

    #[test]
    fn api_url_override_wins() {
        let profile = Profile::default();
        let client = profile_to_client_config(
            &profile,
            &Defaults::default(),
            Some("https://override.example.com/app"),
        )
        .unwrap();
        assert_eq!(client.base_url.as_str(), "https://override.example.com/app");
        assert_eq!(client.tls, TlsVerification::SystemDefaults);
    }

    #[test]
    fn non_http_urls_are_rejected() {
        let err = profile_to_client_config(
            &Profile::default(),
            &Defaults::default(),
            Some("ftp://bots.example.com"),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation { ref field, .. } if field == "api_url"));
    }

    #[test]
    fn ca_cert_selects_custom_ca() {
        let profile = Profile {
            ca_cert: Some(PathBuf::from("/tmp/ca.pem")),
            ..Profile::default()
        };
        let client = profile_to_client_config(&profile, &Defaults::default(), None).unwrap();
        assert_eq!(
            client.tls,
            TlsVerification::CustomCa(PathBuf::from("/tmp/ca.pem"))
        );
        assert_eq!(client.version_poll_interval, Duration::from_secs(300));
    }
}
