use serde_json::json;

use crate::cli::config::{
    get_config_dir, load_auth_config, load_environment_config, load_server_config,
    save_auth_config, save_environment_config, save_server_config,
};
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;

/// Create the config directory and write default files for any that are
/// missing. Safe to run repeatedly; existing files are left alone.
pub async fn handle(output_format: OutputFormat) -> anyhow::Result<()> {
    let config_dir = get_config_dir()?;

    if !config_dir.join("servers.yaml").exists() {
        save_server_config(&load_server_config()?)?;
    }
    if !config_dir.join("env.yaml").exists() {
        save_environment_config(&load_environment_config()?)?;
    }
    if !config_dir.join("auth.yaml").exists() {
        save_auth_config(&load_auth_config()?)?;
    }

    output_success(
        &output_format,
        &format!("Configuration initialized at {}", config_dir.display()),
        Some(json!({ "config_dir": config_dir.display().to_string() })),
    )
}
