use chrono::Utc;
use clap::Subcommand;
use serde_json::{json, Value};

use crate::cli::config::*;
use crate::cli::utils::*;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum AuthCommands {
    #[command(about = "Store a bearer token obtained from the identity provider")]
    SetToken {
        #[arg(help = "JWT access token")]
        token: String,
    },

    #[command(about = "Show current authentication status")]
    Status,

    #[command(about = "Ask the current server who this token belongs to")]
    Whoami,
}

pub async fn handle(cmd: AuthCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        AuthCommands::SetToken { token } => {
            let trimmed = token.trim();
            if trimmed.is_empty() {
                return Err(anyhow::anyhow!("Token must not be empty"));
            }

            let config = AuthConfig {
                token: Some(trimmed.to_string()),
                saved_at: Some(Utc::now()),
            };
            save_auth_config(&config)?;

            output_success(&output_format, "Token saved", None)?;
            Ok(())
        }
        AuthCommands::Status => {
            let auth = load_auth_config()?;
            let env_config = load_environment_config()?;

            match output_format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({
                            "token_saved": auth.token.is_some(),
                            "saved_at": auth.saved_at,
                            "current_server": env_config.current_server
                        }))?
                    );
                }
                OutputFormat::Text => {
                    match (&auth.token, &auth.saved_at) {
                        (Some(_), Some(saved_at)) => {
                            println!(
                                "Token saved at {}",
                                saved_at.format("%Y-%m-%d %H:%M:%S UTC")
                            );
                        }
                        (Some(_), None) => println!("Token saved"),
                        _ => println!("No token saved"),
                    }
                    match env_config.current_server {
                        Some(server) => println!("Current server: {}", server),
                        None => println!("No current server set"),
                    }
                }
            }

            Ok(())
        }
        AuthCommands::Whoami => {
            let data = api_get("/api/auth/whoami", &[]).await?;

            match output_format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&data)?);
                }
                OutputFormat::Text => {
                    if let Some(email) = data.get("email").and_then(Value::as_str) {
                        println!("Email: {}", email);
                    }
                    if let Some(user_id) = data.get("user_id").and_then(Value::as_str) {
                        println!("User ID: {}", user_id);
                    }
                    match data.get("profile") {
                        Some(profile) if !profile.is_null() => {
                            if let Some(name) = profile.get("full_name").and_then(Value::as_str) {
                                println!("Name: {}", name);
                            }
                            if let Some(role) = profile.get("role_type").and_then(Value::as_str) {
                                println!("Role: {}", role);
                            }
                            if let Some(dept) = profile.get("department").and_then(Value::as_str) {
                                println!("Department: {}", dept);
                            }
                        }
                        _ => println!("No profile yet (onboarding pending)"),
                    }
                }
            }

            Ok(())
        }
    }
}
