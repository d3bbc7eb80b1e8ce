use clap::Subcommand;
use serde_json::json;

use crate::cli::config::*;
use crate::cli::utils::*;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum ServerCommands {
    #[command(about = "Register a server by URL")]
    Add {
        #[arg(help = "Server URL, e.g. https://api.example.com")]
        url: String,
        #[arg(help = "Server name (defaults to the hostname)")]
        name: Option<String>,
    },

    #[command(about = "List all servers with health status")]
    List,

    #[command(about = "Switch to a server, or show the current one")]
    Use {
        #[arg(help = "Server name to switch to")]
        name: Option<String>,
    },

    #[command(about = "Health check a server (defaults to current server)")]
    Ping {
        #[arg(help = "Server name to ping")]
        name: Option<String>,
    },
}

pub async fn handle(cmd: ServerCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ServerCommands::Add { url, name } => {
            let (protocol, hostname, port) = parse_server_url(&url)?;
            let name = name.unwrap_or_else(|| hostname.clone());

            let mut config = load_server_config()?;
            if config.servers.contains_key(&name) {
                return Err(anyhow::anyhow!("Server '{}' already exists", name));
            }

            let info = ServerInfo::new(hostname, port, protocol, String::new());
            let server_url = info.url();
            config.servers.insert(name.clone(), info);
            save_server_config(&config)?;

            // First registered server becomes the current one
            let mut env_config = load_environment_config()?;
            if env_config.current_server.is_none() {
                env_config.current_server = Some(name.clone());
                save_environment_config(&env_config)?;
            }

            output_success(
                &output_format,
                &format!("Server '{}' registered", name),
                Some(json!({ "server": name, "url": server_url })),
            )?;

            Ok(())
        }
        ServerCommands::List => {
            let mut config = load_server_config()?;
            let env_config = load_environment_config()?;

            if config.servers.is_empty() {
                return output_empty_collection(
                    &output_format,
                    "servers",
                    "No servers registered",
                );
            }

            // Refresh health for every entry before printing
            let mut statuses: Vec<(String, ServerStatus)> = Vec::new();
            for (name, info) in &config.servers {
                let status = ping_server(info).await;
                statuses.push((name.clone(), status));
            }
            for (name, status) in &statuses {
                if let Some(info) = config.servers.get_mut(name) {
                    info.update_ping(*status);
                }
            }
            save_server_config(&config)?;

            match output_format {
                OutputFormat::Json => {
                    let servers: Vec<_> = config
                        .servers
                        .iter()
                        .map(|(name, info)| {
                            json!({
                                "name": name,
                                "url": info.url(),
                                "status": info.status,
                                "added_at": info.added_at,
                                "last_ping": info.last_ping,
                                "current": env_config.current_server.as_ref() == Some(name)
                            })
                        })
                        .collect();
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({ "servers": servers }))?
                    );
                }
                OutputFormat::Text => {
                    println!(
                        "{:<20} {:<40} {:<8} {}",
                        "NAME", "URL", "STATUS", "ADDED"
                    );
                    println!("{}", "-".repeat(85));

                    for (name, info) in &config.servers {
                        let current_marker = if env_config.current_server.as_ref() == Some(name) {
                            "*"
                        } else {
                            " "
                        };
                        let status_text = match info.status {
                            ServerStatus::Up => "up",
                            ServerStatus::Down => "down",
                            ServerStatus::Unknown => "unknown",
                        };
                        let added_date = info.added_at.format("%Y-%m-%d %H:%M").to_string();

                        println!(
                            "{}{:<19} {:<40} {:<8} {}",
                            current_marker,
                            name,
                            info.url(),
                            status_text,
                            added_date
                        );
                    }
                }
            }

            Ok(())
        }
        ServerCommands::Use { name } => {
            match name {
                Some(server_name) => {
                    switch_current_item(
                        &server_name,
                        "server",
                        |name| Ok(load_server_config()?.servers.contains_key(name)),
                        |name| {
                            let mut env_config = load_environment_config()?;
                            env_config.current_server = Some(name.to_string());
                            save_environment_config(&env_config)
                        },
                        &output_format,
                    )?;
                }
                None => {
                    let env_config = load_environment_config()?;
                    match env_config.current_server {
                        Some(server_name) => {
                            let config = load_server_config()?;
                            if let Some(info) = config.servers.get(&server_name) {
                                let details = json!({
                                    "name": server_name,
                                    "url": info.url(),
                                    "description": info.description
                                });
                                output_current_item(
                                    &output_format,
                                    "server",
                                    &server_name,
                                    details,
                                )?;
                            } else {
                                return Err(anyhow::anyhow!(
                                    "Current server '{}' not found in configuration",
                                    server_name
                                ));
                            }
                        }
                        None => {
                            output_no_current_item(&output_format, "server")?;
                        }
                    }
                }
            }

            Ok(())
        }
        ServerCommands::Ping { name } => {
            let target = resolve_target_item(
                name,
                || Ok(load_environment_config()?.current_server),
                "server",
            )?;

            let mut config = load_server_config()?;
            let info = config
                .servers
                .get(&target)
                .ok_or_else(|| anyhow::anyhow!("Server '{}' not found", target))?;

            let status = ping_server(info).await;
            let url = info.url();
            if let Some(info) = config.servers.get_mut(&target) {
                info.update_ping(status);
            }
            save_server_config(&config)?;

            let status_text = match status {
                ServerStatus::Up => "up",
                ServerStatus::Down => "down",
                ServerStatus::Unknown => "unknown",
            };

            output_success(
                &output_format,
                &format!("Server '{}' is {}", target, status_text),
                Some(json!({ "server": target, "url": url, "status": status })),
            )?;

            Ok(())
        }
    }
}
