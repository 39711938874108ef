//! Config subcommand handlers.

use wiser_config::Config;

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::active_profile_name;
use crate::error::CliError;
use crate::output;

/// Format config for display, masking the plaintext secret.
fn format_config_redacted(cfg: &Config) -> String {
    use std::fmt::Write;
    let mut out = String::new();

    if let Some(ref default) = cfg.default_profile {
        let _ = writeln!(out, "default_profile = \"{default}\"");
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "[defaults]");
    let _ = writeln!(out, "output = \"{}\"", cfg.defaults.output);
    let _ = writeln!(out, "refresh_interval_ms = {}", cfg.defaults.refresh_interval_ms);
    let _ = writeln!(out, "timeout = {}", cfg.defaults.timeout);
    let _ = writeln!(out, "retry_delay_ms = {}", cfg.defaults.retry_delay_ms);

    let mut names: Vec<_> = cfg.profiles.keys().collect();
    names.sort();
    for name in names {
        let p = &cfg.profiles[name];
        let _ = writeln!(out);
        let _ = writeln!(out, "[profiles.{name}]");
        let _ = writeln!(out, "endpoint = \"{}\"", p.endpoint);
        if p.secret.is_some() {
            let _ = writeln!(out, "secret = \"****\"");
        }
        if let Some(ref env) = p.secret_env {
            let _ = writeln!(out, "secret_env = \"{env}\"");
        }
        if let Some(ms) = p.refresh_interval_ms {
            let _ = writeln!(out, "refresh_interval_ms = {ms}");
        }
        if let Some(timeout) = p.timeout {
            let _ = writeln!(out, "timeout = {timeout}");
        }
        if let Some(ms) = p.retry_delay_ms {
            let _ = writeln!(out, "retry_delay_ms = {ms}");
        }
        if let Some(n) = p.max_attempts {
            let _ = writeln!(out, "max_attempts = {n}");
        }
    }

    out
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Path => {
            output::print_output(
                &wiser_config::config_path().display().to_string(),
                global.quiet,
            );
            Ok(())
        }

        ConfigCommand::Show => {
            let cfg = wiser_config::load_config()?;
            output::print_output(format_config_redacted(&cfg).trim_end(), global.quiet);
            Ok(())
        }

        ConfigCommand::SetProfile {
            name,
            endpoint,
            secret_env,
            default,
        } => {
            let mut cfg = wiser_config::load_config()?;
            let profile = cfg.profiles.entry(name.clone()).or_default();
            profile.endpoint = endpoint;
            if secret_env.is_some() {
                profile.secret_env = secret_env;
            }
            if default {
                cfg.default_profile = Some(name.clone());
            }
            wiser_config::save_config(&cfg)?;
            output::print_output(&format!("Profile '{name}' saved"), global.quiet);
            Ok(())
        }

        ConfigCommand::SetSecret { secret } => {
            let cfg = wiser_config::load_config()?;
            let profile_name = active_profile_name(global, &cfg);
            wiser_config::store_secret(&profile_name, &secret)?;
            output::print_output(
                &format!("Secret stored in keyring for profile '{profile_name}'"),
                global.quiet,
            );
            Ok(())
        }
    }
}
