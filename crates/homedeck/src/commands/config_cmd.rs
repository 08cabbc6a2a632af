//! Config subcommand handlers.

use homedeck_config::{self as config, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config::{active_profile_name, available_profiles};
use crate::error::CliError;
use crate::output;

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init { url, name, force } => {
            url.parse::<url::Url>().map_err(|e| CliError::Validation {
                field: "url".into(),
                reason: format!("invalid URL '{url}': {e}"),
            })?;

            let path = config::config_path();
            let mut cfg = config::load_config()?;
            if cfg.profiles.contains_key(&name) && !force {
                return Err(CliError::ProfileExists { name });
            }
            cfg.profiles.insert(name.clone(), Profile::new(url));
            if cfg.default_profile.is_none() || cfg.profiles.len() == 1 {
                cfg.default_profile = Some(name.clone());
            }
            config::save_config(&cfg)?;

            if !global.quiet {
                eprintln!("Profile '{name}' written to {}", path.display());
            }
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            let active = active_profile_name(global, &cfg);
            let out = match global.output {
                OutputFormat::Table | OutputFormat::Plain => {
                    let body = toml::to_string_pretty(&cfg)
                        .map_err(|e| CliError::Serialization(e.to_string()))?;
                    format!(
                        "# {}\n# active profile: {active} (available: {})\n{body}",
                        config::config_path().display(),
                        available_profiles(&cfg)
                    )
                }
                OutputFormat::Json => output::render_json(&cfg, false),
                OutputFormat::JsonCompact => output::render_json(&cfg, true),
                OutputFormat::Yaml => output::render_yaml(&cfg),
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), false);
            Ok(())
        }
    }
}
