//! CLI configuration: thin wrapper around `dhub_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides (--url,
//! --token, etc.) on top of the shared profile loading.

use std::time::Duration;

use secrecy::SecretString;

use dhub_core::ClientConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use dhub_config::{Config, Profile, config_path, load_config_or_default};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `ClientConfig` from the config file, the active profile and the
/// CLI overrides. Flags win over the profile; without a profile, `--url`
/// is required.
pub fn build_client_config(global: &GlobalOpts, config: &Config) -> Result<ClientConfig, CliError> {
    let profile_name = active_profile_name(global, config);

    let mut client = match config.profiles.get(&profile_name) {
        Some(profile) => {
            let mut profile = profile.clone();
            if let Some(url) = &global.url {
                profile.url.clone_from(url);
            }
            dhub_config::profile_to_client_config(&profile, &profile_name, &config.defaults)?
        }
        None => {
            let url_str = global.url.as_deref().ok_or_else(|| CliError::NoConfig {
                path: config_path().display().to_string(),
            })?;
            let url: url::Url = url_str.parse().map_err(|_| CliError::Validation {
                field: "url".into(),
                reason: format!("invalid URL: {url_str}"),
            })?;
            let mut client = ClientConfig::new(url);
            client.timeout = Duration::from_secs(config.defaults.timeout);
            client.per_page = config.defaults.per_page;
            client.accept_invalid_certs = config.defaults.insecure;
            client
        }
    };

    if let Some(database) = &global.database {
        client.database = Some(database.clone());
    }
    if let Some(token) = &global.token {
        client.token = Some(SecretString::from(token.clone()));
    }
    if let Some(timeout) = global.timeout {
        client.timeout = Duration::from_secs(timeout);
    }
    client.accept_invalid_certs |= global.insecure;
    Ok(client)
}
