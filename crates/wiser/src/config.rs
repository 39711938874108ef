//! Profile resolution: config file + global flags → `HubConfig`.

use std::time::Duration;

use secrecy::SecretString;

use wiser_config::{Config, Profile};
use wiser_core::HubConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Interactive commands give up after this many attempts unless the
/// profile says otherwise.
const CLI_MAX_ATTEMPTS: u32 = 3;

pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `HubConfig` from the config file, profile, and CLI overrides.
pub fn build_hub_config(global: &GlobalOpts) -> Result<HubConfig, CliError> {
    let cfg = wiser_config::load_config()?;
    let profile_name = active_profile_name(global, &cfg);

    // An explicitly named profile must exist
    if global.profile.is_some() && !cfg.profiles.contains_key(&profile_name) {
        return Err(wiser_config::ConfigError::UnknownProfile {
            profile: profile_name,
        }
        .into());
    }

    let profile = match (cfg.profiles.get(&profile_name), global.endpoint.as_deref()) {
        (Some(profile), endpoint) => {
            let mut profile = profile.clone();
            if let Some(endpoint) = endpoint {
                profile.endpoint = endpoint.to_owned();
            }
            profile
        }
        // No profile: run from flags / env alone
        (None, Some(endpoint)) => Profile {
            endpoint: endpoint.to_owned(),
            ..Profile::default()
        },
        (None, None) => {
            return Err(CliError::NoConfig {
                path: wiser_config::config_path().display().to_string(),
            });
        }
    };

    let mut hub = wiser_config::profile_to_hub_config(&profile, &profile_name, &cfg.defaults)?;

    if let Some(ref secret) = global.secret {
        hub = hub.with_secret(SecretString::from(secret.clone()));
    }
    if let Some(secs) = global.timeout {
        hub = hub.with_timeout(Duration::from_secs(secs));
    }
    if hub.retry.max_attempts.is_none() {
        hub.retry.max_attempts = Some(CLI_MAX_ATTEMPTS);
    }

    Ok(hub)
}
