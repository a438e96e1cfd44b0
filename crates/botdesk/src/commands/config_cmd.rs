//! Config subcommand handlers.

use dialoguer::{Confirm, Input};
use serde::Serialize;
use tabled::Tabled;

use botdesk_core::DEFAULT_API_URL;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts, OutputFormat};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

use super::util::prompt_err;

#[derive(Serialize)]
struct ProfileView {
    name: String,
    default: bool,
    api_url: String,
    email: Option<String>,
}

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "")]
    marker: &'static str,
    #[tabled(rename = "Profile")]
    name: String,
    #[tabled(rename = "API URL")]
    api_url: String,
    #[tabled(rename = "Email")]
    email: String,
}

fn profile_views(cfg: &Config) -> Vec<ProfileView> {
    let default = cfg.active_profile_name(None);
    let mut names: Vec<_> = cfg.profiles.keys().cloned().collect();
    names.sort();
    names
        .into_iter()
        .map(|name| {
            let p = &cfg.profiles[&name];
            ProfileView {
                default: name == default,
                api_url: p.api_url.clone(),
                email: p.email.clone(),
                name,
            }
        })
        .collect()
}

fn validate_url(raw: &str) -> Result<(), CliError> {
    let profile = Profile {
        api_url: raw.to_owned(),
        ..Profile::default()
    };
    botdesk_config::profile_to_client_config(&profile, &Config::default().defaults, None)?;
    Ok(())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let path = config::config_path();
            eprintln!("botdesk configuration wizard");
            eprintln!("   Config path: {}\n", path.display());

            let mut cfg = config::load_config()?;

            let name: String = Input::new()
                .with_prompt("Profile name")
                .default(config::active_profile_name(global, &cfg))
                .interact_text()
                .map_err(prompt_err)?;

            let api_url: String = Input::new()
                .with_prompt("Backend URL")
                .default(global.api_url.clone().unwrap_or_else(|| DEFAULT_API_URL.into()))
                .interact_text()
                .map_err(prompt_err)?;
            validate_url(&api_url)?;

            let email: String = Input::new()
                .with_prompt("Login email (optional)")
                .allow_empty(true)
                .interact_text()
                .map_err(prompt_err)?;

            let make_default = cfg.profiles.is_empty()
                || Confirm::new()
                    .with_prompt(format!("Make '{name}' the default profile?"))
                    .default(true)
                    .interact()
                    .map_err(prompt_err)?;

            cfg.profiles.insert(
                name.clone(),
                Profile {
                    api_url,
                    email: Some(email).filter(|e| !e.is_empty()),
                    insecure: global.insecure.then_some(true),
                    ..Profile::default()
                },
            );
            if make_default {
                cfg.default_profile = Some(name.clone());
            }

            let saved = config::save_config(&cfg)?;
            eprintln!("\n   Profile '{name}' saved to {}", saved.display());
            eprintln!("   Next: botdesk auth login --profile {name}");
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            let out = match global.output {
                OutputFormat::Table | OutputFormat::Plain => {
                    toml::to_string_pretty(&cfg).map_err(|e| CliError::Render(e.to_string()))?
                }
                OutputFormat::Json => output::render_json(&cfg, false)?,
                OutputFormat::JsonCompact => output::render_json(&cfg, true)?,
                OutputFormat::Yaml => output::render_yaml(&cfg)?,
            };
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config()?;
            let views = profile_views(&cfg);
            let out = output::render_list(
                global.output,
                &views,
                |v| ProfileRow {
                    marker: if v.default { "*" } else { "" },
                    name: v.name.clone(),
                    api_url: v.api_url.clone(),
                    email: v.email.clone().unwrap_or_default(),
                },
                |v| v.name.clone(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
