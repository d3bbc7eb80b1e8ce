use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub hostname: String,
    pub port: u16,
    pub protocol: String,
    pub description: String,
    pub added_at: DateTime<Utc>,
    pub last_ping: Option<DateTime<Utc>>,
    pub status: ServerStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    Up,
    Down,
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub servers: HashMap<String, ServerInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    pub current_server: Option<String>,
    pub recents: Vec<String>,
}

/// Bearer token for a third-party identity provider. The CLI never mints
/// tokens itself; `auth set-token` stores one obtained elsewhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub token: Option<String>,
    pub saved_at: Option<DateTime<Utc>>,
}

impl ServerInfo {
    pub fn new(hostname: String, port: u16, protocol: String, description: String) -> Self {
        Self {
            hostname,
            port,
            protocol,
            description,
            added_at: Utc::now(),
            last_ping: None,
            status: ServerStatus::Unknown,
        }
    }

    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.protocol, self.hostname, self.port)
    }

    pub fn update_ping(&mut self, status: ServerStatus) {
        self.last_ping = Some(Utc::now());
        self.status = status;
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            servers: HashMap::new(),
        }
    }
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            current_server: None,
            recents: Vec::new(),
        }
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token: None,
            saved_at: None,
        }
    }
}

pub fn get_config_dir() -> anyhow::Result<PathBuf> {
    let config_dir = if let Ok(custom_dir) = std::env::var("COMPASS_CLI_CONFIG_DIR") {
        PathBuf::from(custom_dir)
    } else {
        let home = std::env::var("HOME")
            .map_err(|_| anyhow::anyhow!("HOME environment variable not set"))?;
        PathBuf::from(home).join(".config").join("compass").join("cli")
    };

    if !config_dir.exists() {
        fs::create_dir_all(&config_dir)?;
    }

    Ok(config_dir)
}

pub fn load_server_config() -> anyhow::Result<ServerConfig> {
    let config_dir = get_config_dir()?;
    let server_file = config_dir.join("servers.yaml");

    if !server_file.exists() {
        return Ok(ServerConfig::default());
    }

    let content = fs::read_to_string(server_file)?;
    let config: ServerConfig = serde_yaml::from_str(&content)?;
    Ok(config)
}

pub fn save_server_config(config: &ServerConfig) -> anyhow::Result<()> {
    let config_dir = get_config_dir()?;
    let server_file = config_dir.join("servers.yaml");

    let content = serde_yaml::to_string(config)?;
    fs::write(server_file, content)?;
    Ok(())
}

pub fn load_environment_config() -> anyhow::Result<EnvironmentConfig> {
    let config_dir = get_config_dir()?;
    let env_file = config_dir.join("env.yaml");

    if !env_file.exists() {
        return Ok(EnvironmentConfig::default());
    }

    let content = fs::read_to_string(env_file)?;
    let config: EnvironmentConfig = serde_yaml::from_str(&content)?;
    Ok(config)
}

pub fn save_environment_config(config: &EnvironmentConfig) -> anyhow::Result<()> {
    let config_dir = get_config_dir()?;
    let env_file = config_dir.join("env.yaml");

    let content = serde_yaml::to_string(config)?;
    fs::write(env_file, content)?;
    Ok(())
}

pub fn load_auth_config() -> anyhow::Result<AuthConfig> {
    let config_dir = get_config_dir()?;
    let auth_file = config_dir.join("auth.yaml");

    if !auth_file.exists() {
        return Ok(AuthConfig::default());
    }

    let content = fs::read_to_string(auth_file)?;
    let config: AuthConfig = serde_yaml::from_str(&content)?;
    Ok(config)
}

pub fn save_auth_config(config: &AuthConfig) -> anyhow::Result<()> {
    let config_dir = get_config_dir()?;
    let auth_file = config_dir.join("auth.yaml");

    let content = serde_yaml::to_string(config)?;
    fs::write(auth_file, content)?;
    Ok(())
}

/// Split a user-supplied URL into (protocol, hostname, port). Only http and
/// https are accepted; the port falls back to the scheme default.
pub fn parse_server_url(raw: &str) -> anyhow::Result<(String, String, u16)> {
    let url = url::Url::parse(raw).map_err(|e| anyhow::anyhow!("Invalid server URL: {}", e))?;

    let protocol = url.scheme().to_string();
    if protocol != "http" && protocol != "https" {
        return Err(anyhow::anyhow!(
            "Unsupported scheme '{}', expected http or https",
            protocol
        ));
    }

    let hostname = url
        .host_str()
        .ok_or_else(|| anyhow::anyhow!("Server URL has no hostname"))?
        .to_string();

    let port = url
        .port_or_known_default()
        .ok_or_else(|| anyhow::anyhow!("Server URL has no usable port"))?;

    Ok((protocol, hostname, port))
}

pub async fn ping_server(server_info: &ServerInfo) -> ServerStatus {
    let client = reqwest::Client::new();
    let url = format!("{}/health", server_info.url());

    match client
        .get(&url)
        .timeout(std::time::Duration::from_secs(5))
        .send()
        .await
    {
        Ok(response) if response.status().is_success() => ServerStatus::Up,
        _ => ServerStatus::Down,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_url_with_explicit_port() {
        let (protocol, hostname, port) = parse_server_url("http://localhost:3000").unwrap();
        assert_eq!(protocol, "http");
        assert_eq!(hostname, "localhost");
        assert_eq!(port, 3000);
    }

    #[test]
    fn parses_https_default_port() {
        let (protocol, hostname, port) = parse_server_url("https://api.example.com").unwrap();
        assert_eq!(protocol, "https");
        assert_eq!(hostname, "api.example.com");
        assert_eq!(port, 443);
    }

    #[test]
    fn rejects_non_http_schemes() {
        assert!(parse_server_url("ftp://example.com").is_err());
        assert!(parse_server_url("not a url").is_err());
    }
}
