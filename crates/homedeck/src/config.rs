//! Flag-aware configuration resolution.
//!
//! Loads the shared `homedeck-config` file and layers `GlobalOpts` on top.
//! This is the single boundary where CLI flags cross into core types.

use std::time::Duration;

use homedeck_config::{Config, Profile};
use homedeck_core::{ControllerConfig, RecordingConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build a `ControllerConfig` from the config file, profile, and CLI overrides.
pub fn build_controller_config(global: &GlobalOpts) -> Result<ControllerConfig, CliError> {
    let cfg = homedeck_config::load_config()?;
    resolve(global, &cfg)
}

fn resolve(global: &GlobalOpts, cfg: &Config) -> Result<ControllerConfig, CliError> {
    let profile_name = active_profile_name(global, cfg);
    let actions_file = homedeck_config::actions_path();

    let mut config = match (cfg.profiles.get(&profile_name), global.server.as_deref()) {
        (Some(profile), _) => {
            let mut profile = profile.clone();
            if let Some(server) = &global.server {
                profile.server.clone_from(server);
            }
            homedeck_config::profile_to_controller_config(&profile, &cfg.defaults, &actions_file)?
        }
        // An explicitly named profile must exist.
        (None, _) if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available_profiles(cfg),
            });
        }
        (None, Some(server)) => homedeck_config::profile_to_controller_config(
            &Profile::new(server),
            &cfg.defaults,
            &actions_file,
        )?,
        (None, None) => {
            return Err(CliError::NoConfig {
                path: homedeck_config::config_path().display().to_string(),
            });
        }
    };

    apply_overrides(&mut config, global);
    Ok(config)
}

fn apply_overrides(config: &mut ControllerConfig, global: &GlobalOpts) {
    if global.insecure {
        config.tls = TlsVerification::DangerAcceptInvalid;
    }
    if let Some(secs) = global.timeout {
        config.timeout = Duration::from_secs(secs);
    }
    if let Some(interval) = global.interval {
        config.poll_interval = interval;
    }
    if let Some(debounce) = global.debounce {
        config.debounce = debounce;
    }
    config.debug |= global.debug;
    if let Some(action) = &global.record {
        config.record_action = Some(RecordingConfig {
            action: action.clone(),
            path: homedeck_config::actions_path(),
        });
    }
}

pub fn available_profiles(cfg: &Config) -> String {
    if cfg.profiles.is_empty() {
        return "(none)".into();
    }
    cfg.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::Parser;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["homedeck"];
        argv.extend_from_slice(args);
        argv.extend_from_slice(&["rooms", "list"]);
        Cli::try_parse_from(argv).unwrap().global
    }

    fn config_with_home() -> Config {
        let mut cfg = Config::default();
        let mut home = Profile::new("http://homebridge.local:8581");
        home.poll_interval_ms = Some(2000);
        cfg.profiles.insert("default".into(), home);
        cfg
    }

    #[test]
    fn flags_override_profile() {
        let cfg = config_with_home();
        let opts = global(&["--interval", "750ms", "--debounce", "100ms", "--debug", "-k"]);
        let resolved = resolve(&opts, &cfg).unwrap();
        assert_eq!(resolved.poll_interval, Duration::from_millis(750));
        assert_eq!(resolved.debounce, Duration::from_millis(100));
        assert!(resolved.debug);
        assert!(matches!(resolved.tls, TlsVerification::DangerAcceptInvalid));
    }

    #[test]
    fn profile_values_apply_without_flags() {
        let cfg = config_with_home();
        let resolved = resolve(&global(&[]), &cfg).unwrap();
        assert_eq!(resolved.base_url.as_str(), "http://homebridge.local:8581/");
        assert_eq!(resolved.poll_interval, Duration::from_secs(2));
        assert!(resolved.record_action.is_none());
    }

    #[test]
    fn server_flag_works_without_profile() {
        let resolved = resolve(&global(&["--server", "http://10.0.0.5:8581"]), &Config::default())
            .unwrap();
        assert_eq!(resolved.base_url.host_str(), Some("10.0.0.5"));
    }

    #[test]
    fn missing_configuration_is_reported() {
        assert!(matches!(
            resolve(&global(&[]), &Config::default()),
            Err(CliError::NoConfig { .. })
        ));
        assert!(matches!(
            resolve(&global(&["--profile", "lab"]), &config_with_home()),
            Err(CliError::ProfileNotFound { ref name, .. }) if name == "lab"
        ));
    }
}
