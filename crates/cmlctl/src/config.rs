//! Flag-aware wrapper over `cml-config`.
//!
//! Picks the active profile, layers `--host`, `--username`, `--token`,
//! `--insecure` and `--timeout` over it, and hands the result to
//! `cml_config::profile_to_client_config`.

use cml_api::ClientConfig;
use cml_config::{Config, Profile};

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

/// Build a `ClientConfig` from the config file, profile, and CLI overrides.
pub fn build_client_config(global: &GlobalOpts) -> Result<ClientConfig, CliError> {
    let cfg = cml_config::load_config()?;
    let profile_name = active_profile_name(global, &cfg);

    let mut profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        // An explicitly named profile must exist.
        None if global.profile.is_some() => {
            let mut available: Vec<&str> = cfg.profiles.keys().map(String::as_str).collect();
            available.sort_unstable();
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: available.join(", "),
            });
        }
        None => Profile::default(),
    };
    apply_overrides(&mut profile, global);

    if profile.host.is_empty() {
        return Err(CliError::NoConfig {
            path: cml_config::config_path().display().to_string(),
        });
    }

    tracing::debug!(profile = %profile_name, host = %profile.host, "resolved profile");
    Ok(cml_config::profile_to_client_config(
        &profile,
        &profile_name,
        &cfg.defaults,
    )?)
}

/// Flags win over whatever the profile holds.
fn apply_overrides(profile: &mut Profile, global: &GlobalOpts) {
    if let Some(ref host) = global.host {
        profile.host.clone_from(host);
    }
    if let Some(ref username) = global.username {
        profile.username = Some(username.clone());
    }
    if let Some(ref token) = global.token {
        profile.token = Some(token.clone());
        profile.token_env = None;
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;
    use crate::cli::Cli;

    fn global(args: &[&str]) -> GlobalOpts {
        let mut argv = vec!["cmlctl"];
        argv.extend_from_slice(args);
        argv.extend_from_slice(&["system", "info"]);
        Cli::try_parse_from(argv).expect("valid args").global
    }

    #[test]
    fn flags_override_profile_fields() {
        let mut profile = Profile {
            host: "https://old.example.com".into(),
            token_env: Some("CML_TEST_TOKEN".into()),
            timeout: Some(5),
            ..Profile::default()
        };
        let opts = global(&[
            "--host",
            "https://new.example.com",
            "--token",
            "T",
            "--timeout",
            "60",
            "-k",
        ]);

        apply_overrides(&mut profile, &opts);
        assert_eq!(profile.host, "https://new.example.com");
        assert_eq!(profile.token.as_deref(), Some("T"));
        assert!(profile.token_env.is_none());
        assert_eq!(profile.timeout, Some(60));
        assert_eq!(profile.insecure, Some(true));
    }

    #[test]
    fn profile_flag_beats_default_profile() {
        let config = Config::default();
        assert_eq!(active_profile_name(&global(&["-p", "lab"]), &config), "lab");
        assert_eq!(active_profile_name(&global(&[]), &config), "default");
    }
}
