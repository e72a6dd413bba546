//! Config subcommand handlers.

use dialoguer::{Input, Select};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

const REDACTED: &str = "********";

// ── Helpers ─────────────────────────────────────────────────────────

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Validation {
        field: "interactive".into(),
        reason: format!("prompt failed: {e}"),
    }
}

fn prompt_token() -> Result<String, CliError> {
    let token = rpassword::prompt_password("API token: ").map_err(prompt_err)?;
    let token = token.trim().to_owned();
    if token.is_empty() {
        return Err(CliError::Validation {
            field: "api_token".into(),
            reason: "token cannot be empty".into(),
        });
    }
    Ok(token)
}

/// The config as a TOML tree with plaintext tokens masked.
fn redacted(cfg: &Config) -> Result<toml::Value, CliError> {
    let mut value = toml::Value::try_from(cfg).map_err(|e| CliError::Internal {
        message: format!("failed to encode config: {e}"),
    })?;
    if let Some(profiles) = value.get_mut("profiles").and_then(toml::Value::as_table_mut) {
        for (_, profile) in profiles.iter_mut() {
            if let Some(token) = profile.get_mut("api_token") {
                *token = toml::Value::String(REDACTED.into());
            }
        }
    }
    Ok(value)
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(),

        ConfigCommand::Show => {
            let cfg = config::load_config()?;
            let value = redacted(&cfg)?;
            let out = output::render_single(
                &global.output,
                &value,
                |v| toml::to_string_pretty(v).unwrap_or_else(|e| format!("# cannot render: {e}")),
                |_| config::config_path().display().to_string(),
            )?;
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::SetToken { profile } => {
            let cfg = config::load_config_or_default();
            let profile_name =
                profile.unwrap_or_else(|| config::active_profile_name(global, &cfg));

            let token = prompt_token()?;
            vigil_config::store_api_token(&profile_name, &token)?;

            if !global.quiet {
                eprintln!("✓ Token stored in system keyring for profile '{profile_name}'");
            }
            Ok(())
        }
    }
}

// ── Init: interactive wizard ────────────────────────────────────────

fn init() -> Result<(), CliError> {
    let config_path = config::config_path();
    eprintln!("vigil configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    // 1. Profile name
    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;

    // 2. Backend URL
    let backend: String = Input::new()
        .with_prompt("Backend API URL")
        .default(vigil_config::DEFAULT_BACKEND.into())
        .validate_with(|input: &String| -> Result<(), String> {
            url::Url::parse(input)
                .map(|_| ())
                .map_err(|e| format!("invalid URL: {e}"))
        })
        .interact_text()
        .map_err(prompt_err)?;

    // 3. Stream URL (blank = derive from the backend URL)
    let stream_url: String = Input::new()
        .with_prompt("Live stream URL (blank to derive)")
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)?;
    let stream_url = Some(stream_url.trim().to_owned()).filter(|s| !s.is_empty());

    // 4. Optional bearer token
    let token_choices = &[
        "No token (backend is open)",
        "Store token in system keyring (recommended)",
        "Save token to config file (plaintext)",
    ];
    let token_selection = Select::new()
        .with_prompt("Does the backend require a bearer token?")
        .items(token_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    let api_token = match token_selection {
        1 => {
            let token = prompt_token()?;
            vigil_config::store_api_token(&profile_name, &token)?;
            eprintln!("   ✓ Token stored in system keyring");
            None
        }
        2 => Some(prompt_token()?),
        _ => None,
    };

    // 5. Merge into the existing config and write
    let profile = Profile {
        backend,
        stream_url,
        api_token,
        ..Profile::default()
    };
    // Reject a bad stream URL before anything is written.
    vigil_config::profile_to_monitor_config(&profile, None)?;

    let mut cfg = config::load_config_or_default();
    cfg.profiles.insert(profile_name.clone(), profile);
    cfg.default_profile = Some(profile_name.clone());
    let written = config::save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", written.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Test it: vigil health");
    Ok(())
}
