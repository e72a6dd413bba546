//! CLI configuration: thin wrapper around `vigil_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--backend, --stream-url, --api-token, --insecure, --timeout).

use secrecy::SecretString;

use vigil_core::MonitorConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use vigil_config::{
    Config, Defaults, Profile, config_path, load_config, load_config_or_default, save_config,
};

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    config.active_profile_name(global.profile.as_deref())
}

/// Comma-separated profile names for diagnostics.
pub fn available_profiles(config: &Config) -> String {
    if config.profiles.is_empty() {
        "(none)".into()
    } else {
        config.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Load the config file and build a `MonitorConfig` for the active profile.
///
/// A missing default profile is fine (built-in defaults apply); a profile
/// requested with `--profile` must exist.
pub fn resolve_monitor_config(global: &GlobalOpts) -> Result<MonitorConfig, CliError> {
    let cfg = load_config()?;
    let profile_name = active_profile_name(global, &cfg);

    let profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(&cfg),
            });
        }
        None => Profile::default(),
    };

    resolve_profile(&profile, &profile_name, &cfg.defaults, global)
}

/// Translate a `Profile` + global flags into a `MonitorConfig`.
///
/// Flags win over profile values, which win over `[defaults]`.
pub fn resolve_profile(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
    global: &GlobalOpts,
) -> Result<MonitorConfig, CliError> {
    let mut profile = profile.clone();

    if let Some(ref backend) = global.backend {
        profile.backend.clone_from(backend);
    }
    if let Some(ref stream_url) = global.stream_url {
        profile.stream_url = Some(stream_url.clone());
    }
    if global.insecure || (profile.insecure.is_none() && defaults.insecure) {
        profile.insecure = Some(true);
    }
    profile.timeout = global.timeout.or(profile.timeout).or(Some(defaults.timeout));

    let token = match global.api_token {
        Some(ref token) => Some(SecretString::from(token.clone())),
        None => vigil_config::resolve_api_token(&profile, profile_name),
    };

    Ok(vigil_config::profile_to_monitor_config(&profile, token)?)
}
