//! Config subcommand handlers.

use dialoguer::{Input, Select};
use serde::Serialize;

use iotas_config::{Config, Defaults, Profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

use super::config_file;

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn load_or_default(global: &GlobalOpts) -> Config {
    iotas_config::load_config_from(&config_file(global)).unwrap_or_default()
}

#[derive(Serialize)]
struct ProfileView<'a> {
    name: &'a str,
    default: bool,
    username: Option<&'a str>,
    unit: Option<&'a str>,
    base_url: Option<&'a str>,
    password: &'static str,
}

#[derive(Serialize)]
struct ConfigView<'a> {
    path: String,
    default_profile: Option<&'a str>,
    defaults: &'a Defaults,
    profiles: Vec<ProfileView<'a>>,
}

fn config_view<'a>(cfg: &'a Config, path: String) -> ConfigView<'a> {
    let default = cfg.default_profile.as_deref();
    let mut profiles: Vec<ProfileView<'a>> = cfg
        .profiles
        .iter()
        .map(|(name, p)| ProfileView {
            name,
            default: Some(name.as_str()) == default,
            username: p.username.as_deref(),
            unit: p.unit.as_deref(),
            base_url: p.base_url.as_deref(),
            password: if p.password.is_some() {
                "plaintext"
            } else {
                "keyring or IOTAS_PASSWORD"
            },
        })
        .collect();
    profiles.sort_by(|a, b| a.name.cmp(b.name));
    ConfigView {
        path,
        default_profile: default,
        defaults: &cfg.defaults,
        profiles,
    }
}

fn show_detail(view: &ConfigView<'_>) -> String {
    let d = view.defaults;
    let mut lines = vec![
        format!("Config:           {}", view.path),
        format!("Default profile:  {}", view.default_profile.unwrap_or("-")),
        format!("Timeout:          {}s", d.timeout),
        format!("Refresh interval: {}s", d.refresh_interval),
        format!("Auth retry delay: {}s", d.auth_retry_delay),
    ];
    for p in &view.profiles {
        let marker = if p.default { " *" } else { "" };
        lines.push(String::new());
        lines.push(format!("[{}]{marker}", p.name));
        lines.push(format!("  username: {}", p.username.unwrap_or("-")));
        lines.push(format!("  unit:     {}", p.unit.unwrap_or("(first residency)")));
        if let Some(url) = p.base_url {
            lines.push(format!("  base_url: {url}"));
        }
        lines.push(format!("  password: {}", p.password));
    }
    lines.join("\n")
}

// ── Handler ─────────────────────────────────────────────────────────

#[allow(clippy::too_many_lines)]
pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        // ── Init: interactive wizard ────────────────────────────────
        ConfigCommand::Init => {
            let path = config_file(global);
            eprintln!("IOTAS bridge configuration wizard");
            eprintln!("   Config path: {}\n", path.display());

            let profile_name: String = Input::new()
                .with_prompt("Profile name")
                .default("default".into())
                .interact_text()
                .map_err(prompt_err)?;

            let username: String = Input::new()
                .with_prompt("IOTAS account email")
                .interact_text()
                .map_err(prompt_err)?;

            let unit: String = Input::new()
                .with_prompt("Unit name (empty = first residency)")
                .allow_empty(true)
                .interact_text()
                .map_err(prompt_err)?;

            let password = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
            if username.trim().is_empty() || password.is_empty() {
                return Err(CliError::Validation {
                    field: "credentials".into(),
                    reason: "email and password cannot be empty".into(),
                });
            }

            let store_choices = &[
                "Store password in system keyring (recommended)",
                "Save to config file (plaintext)",
            ];
            let store_selection = Select::new()
                .with_prompt("Where to store the password?")
                .items(store_choices)
                .default(0)
                .interact()
                .map_err(prompt_err)?;

            let password_field = if store_selection == 0 {
                iotas_config::store_password(&profile_name, &password)?;
                eprintln!("   ✓ Password stored in system keyring");
                None
            } else {
                Some(password)
            };

            let mut cfg = load_or_default(global);
            cfg.profiles.insert(
                profile_name.clone(),
                Profile {
                    username: Some(username.trim().to_owned()),
                    password: password_field,
                    unit: Some(unit.trim().to_owned()).filter(|u| !u.is_empty()),
                    ..Profile::default()
                },
            );
            if cfg.default_profile.is_none() || cfg.profiles.len() == 1 {
                cfg.default_profile = Some(profile_name.clone());
            }
            iotas_config::save_config_to(&cfg, &path)?;

            eprintln!("\n✓ Configuration written to {}", path.display());
            eprintln!("  Profile: {profile_name}");
            eprintln!("\n  Test it: iotas-bridge devices list");
            Ok(())
        }

        ConfigCommand::Path => {
            println!("{}", config_file(global).display());
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = load_or_default(global);
            let view = config_view(&cfg, config_file(global).display().to_string());
            let out = output::render_single(&global.output, &view, show_detail, |v| {
                v.path.clone()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = load_or_default(global);
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: iotas-bridge config init");
                return Ok(());
            }
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            let mut names: Vec<&String> = cfg.profiles.keys().collect();
            names.sort();
            for name in names {
                let marker = if name == default { " *" } else { "" };
                println!("{name}{marker}");
            }
            Ok(())
        }

        ConfigCommand::SetPassword { profile } => {
            let cfg = load_or_default(global);
            let requested = profile.or_else(|| global.profile.clone());
            let (profile_name, _) = cfg.profile(requested.as_deref()).map_err(|_| {
                let mut available: Vec<_> = cfg.profiles.keys().cloned().collect();
                available.sort();
                CliError::ProfileNotFound {
                    name: requested.clone().unwrap_or_else(|| "default".into()),
                    path: format!(
                        "{} (available: {})",
                        config_file(global).display(),
                        if available.is_empty() {
                            "none".to_owned()
                        } else {
                            available.join(", ")
                        }
                    ),
                }
            })?;

            let secret = rpassword::prompt_password("Password: ").map_err(prompt_err)?;
            if secret.is_empty() {
                return Err(CliError::Validation {
                    field: "password".into(),
                    reason: "value cannot be empty".into(),
                });
            }

            iotas_config::store_password(&profile_name, &secret)?;
            eprintln!("✓ Password stored in system keyring for profile '{profile_name}'");
            Ok(())
        }
    }
}
