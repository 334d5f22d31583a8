use std::env;
use std::path::PathBuf;

use serde::Serialize;

use crate::cli::ConfigCommands;
use crate::commands::common::Context;
use crate::config_profiles::{is_http_url, normalize_text_option, CliProfilesConfig};
use crate::error::CliError;

/// Values supplied to `config init`; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ProfileInit {
    pub email: Option<String>,
    pub api_base_url: Option<String>,
    pub mirror_dir: Option<PathBuf>,
    pub index_cooldown_secs: Option<u64>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ProfileSummary {
    pub profile: String,
    pub active: bool,
    pub email: Option<String>,
    pub api_base_url: String,
    pub mirror_dir: String,
    pub index_cooldown_secs: u64,
}

pub fn run_config(
    command: ConfigCommands,
    global_profile: Option<&str>,
    mirror_dir: Option<PathBuf>,
) -> Result<(), CliError> {
    match command {
        ConfigCommands::Init {
            email,
            api_base_url,
            index_cooldown_secs,
            no_activate,
        } => run_config_init(
            global_profile,
            ProfileInit {
                email,
                api_base_url,
                mirror_dir,
                index_cooldown_secs,
            },
            no_activate,
        ),
        ConfigCommands::Show { json } => run_config_show(global_profile, mirror_dir, json),
    }
}

pub fn run_config_init(
    profile_name: Option<&str>,
    init: ProfileInit,
    no_activate: bool,
) -> Result<(), CliError> {
    let mut config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let profile_name = config.resolve_profile_name(profile_name);

    let init = ProfileInit {
        email: normalize_text_option(init.email)
            .or_else(|| normalize_text_option(env::var("NOTEMIRROR_EMAIL").ok())),
        api_base_url: normalize_text_option(init.api_base_url)
            .or_else(|| normalize_text_option(env::var("NOTEMIRROR_API_URL").ok())),
        ..init
    };
    apply_profile_init(&mut config, &profile_name, init, !no_activate)?;

    let path = config.save().map_err(CliError::Config)?;
    println!(
        "Profile '{}' initialized at {}",
        profile_name,
        path.display()
    );

    let has_email = config
        .profile(&profile_name)
        .and_then(|profile| profile.email())
        .is_some();
    if has_email {
        println!("Run `notemirror auth login` to sign in profile '{profile_name}'.");
    } else {
        println!("Profile '{profile_name}' is missing: email");
    }

    Ok(())
}

/// Merge `init` into the named profile, creating it when absent.
pub fn apply_profile_init(
    config: &mut CliProfilesConfig,
    profile_name: &str,
    init: ProfileInit,
    activate: bool,
) -> Result<(), CliError> {
    let api_base_url = normalize_text_option(init.api_base_url)
        .map(normalize_api_base_url)
        .transpose()?;

    let profile = config.profile_mut_or_default(profile_name);
    if let Some(email) = normalize_text_option(init.email) {
        profile.email = Some(email);
    }
    if let Some(url) = api_base_url {
        profile.api_base_url = Some(url);
    }
    if let Some(dir) = init.mirror_dir {
        profile.mirror_dir = Some(dir.to_string_lossy().into_owned());
    }
    if let Some(secs) = init.index_cooldown_secs {
        profile.index_cooldown_secs = Some(secs);
    }

    if activate {
        config.active_profile = Some(profile_name.to_string());
    }
    Ok(())
}

pub fn normalize_api_base_url(url: String) -> Result<String, CliError> {
    let normalized = normalize_text_option(Some(url))
        .ok_or_else(|| CliError::Config("api_base_url must not be empty".to_string()))?;
    if !is_http_url(&normalized) {
        return Err(CliError::Config(
            "api_base_url must include http:// or https://".to_string(),
        ));
    }
    Ok(normalized.trim_end_matches('/').to_string())
}

pub fn run_config_show(
    global_profile: Option<&str>,
    mirror_dir: Option<PathBuf>,
    as_json: bool,
) -> Result<(), CliError> {
    let config = CliProfilesConfig::load().map_err(CliError::Config)?;
    let context = Context::from_config(&config, global_profile, mirror_dir, false)?;
    let summary = profile_summary(&config, &context)?;

    if as_json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for line in format_profile_summary(&summary) {
            println!("{line}");
        }
    }
    Ok(())
}

pub fn profile_summary(
    config: &CliProfilesConfig,
    context: &Context,
) -> Result<ProfileSummary, CliError> {
    Ok(ProfileSummary {
        profile: context.profile_name.clone(),
        active: config.active_profile.as_deref() == Some(context.profile_name.as_str()),
        email: context.profile.email(),
        api_base_url: context.client_config()?.base_url,
        mirror_dir: context.mirror_dir.display().to_string(),
        index_cooldown_secs: context.engine_config().index_cooldown.as_secs(),
    })
}

pub fn format_profile_summary(summary: &ProfileSummary) -> Vec<String> {
    let active = if summary.active { " (active)" } else { "" };
    vec![
        format!("profile:        {}{active}", summary.profile),
        format!(
            "email:          {}",
            summary.email.as_deref().unwrap_or("(not set)")
        ),
        format!("api_base_url:   {}", summary.api_base_url),
        format!("mirror_dir:     {}", summary.mirror_dir),
        format!("index_cooldown: {}s", summary.index_cooldown_secs),
    ]
}
