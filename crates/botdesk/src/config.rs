//! CLI configuration: thin wrapper around `botdesk_config`.
//!
//! Adds resolution that respects `GlobalOpts` overrides (--api-url,
//! --insecure, --timeout, --data-dir) on top of the shared profile types.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use botdesk_core::{ClientConfig, Dashboard, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use botdesk_config::{
    Config, FileStorage, Profile, config_path, data_dir, load_config, load_config_or_default,
    save_config,
};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.active_profile_name(global.profile.as_deref())
}

/// The active profile, or a `ProfileNotFound` listing the alternatives.
pub fn active_profile(global: &GlobalOpts, config: &Config) -> Result<(String, Profile), CliError> {
    let name = active_profile_name(global, config);
    match config.profile(&name) {
        Ok(profile) => Ok((name, profile)),
        Err(botdesk_config::ConfigError::UnknownProfile { name }) => {
            let mut available: Vec<_> = config.profiles.keys().cloned().collect();
            available.sort();
            Err(CliError::ProfileNotFound {
                name,
                available: if available.is_empty() {
                    "(none)".into()
                } else {
                    available.join(", ")
                },
            })
        }
        Err(e) => Err(e.into()),
    }
}

/// Translate config + global flags into a `ClientConfig`.
///
/// CLI flag overrides take priority over profile values.
pub fn resolve_client_config(
    global: &GlobalOpts,
    config: &Config,
) -> Result<ClientConfig, CliError> {
    let (_, profile) = active_profile(global, config)?;
    let mut client =
        botdesk_config::profile_to_client_config(&profile, &config.defaults, global.api_url.as_deref())?;

    if global.insecure {
        client.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        client.timeout = Duration::from_secs(secs);
    }
    Ok(client)
}

/// Where the session and settings are persisted.
///
/// Each profile gets its own subdirectory so sessions never leak across
/// backends.
pub fn storage_dir(global: &GlobalOpts, config: &Config) -> PathBuf {
    let root = global.data_dir.clone().unwrap_or_else(data_dir);
    root.join(active_profile_name(global, config))
}

/// Build the dashboard for backend-bound commands.
pub fn build_dashboard(global: &GlobalOpts) -> Result<Dashboard, CliError> {
    build_dashboard_with(global, |_| {})
}

/// Like [`build_dashboard`], letting the caller adjust the resolved client
/// config first.
pub fn build_dashboard_with(
    global: &GlobalOpts,
    adjust: impl FnOnce(&mut ClientConfig),
) -> Result<Dashboard, CliError> {
    let config = load_config()?;
    let mut client = resolve_client_config(global, &config)?;
    adjust(&mut client);
    let storage = Arc::new(FileStorage::new(storage_dir(global, &config)));
    tracing::debug!(url = %client.base_url, dir = %storage.dir().display(), "building dashboard");
    Ok(Dashboard::new(client, storage)?)
}
