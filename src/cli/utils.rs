use serde_json::{json, Value};

use crate::cli::config::{load_auth_config, load_environment_config, load_server_config};
use crate::cli::OutputFormat;

/// Output a success message in the appropriate format
pub fn output_success(
    output_format: &OutputFormat,
    message: &str,
    data: Option<Value>,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let Some(Value::Object(fields)) = data {
                if let Some(map) = response.as_object_mut() {
                    map.extend(fields);
                }
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an empty collection in the appropriate format
pub fn output_empty_collection(
    output_format: &OutputFormat,
    collection_name: &str,
    message: &str,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({
                    collection_name: []
                }))?
            );
        }
        OutputFormat::Text => {
            println!("{}", message);
        }
    }
    Ok(())
}

/// Output current item information in the appropriate format
pub fn output_current_item(
    output_format: &OutputFormat,
    item_type: &str,
    name: &str,
    details: Value,
) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = serde_json::Map::new();
            response.insert(format!("current_{}", item_type), details);
            println!("{}", serde_json::to_string_pretty(&Value::Object(response))?);
        }
        OutputFormat::Text => {
            println!("Current {}: {}", item_type, name);
            if let Some(url) = details.get("url").and_then(Value::as_str) {
                println!("URL: {}", url);
            }
            if let Some(desc) = details.get("description").and_then(Value::as_str) {
                if !desc.is_empty() {
                    println!("Description: {}", desc);
                }
            }
        }
    }
    Ok(())
}

/// Output "no current item" message in the appropriate format
pub fn output_no_current_item(output_format: &OutputFormat, item_type: &str) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = serde_json::Map::new();
            response.insert(format!("current_{}", item_type), Value::Null);
            println!("{}", serde_json::to_string_pretty(&Value::Object(response))?);
        }
        OutputFormat::Text => {
            println!("No current {} set", item_type);
        }
    }
    Ok(())
}

/// Generic function to handle switching between items
pub fn switch_current_item<F, G>(
    item_name: &str,
    item_type: &str,
    check_exists: F,
    update_current: G,
    output_format: &OutputFormat,
) -> anyhow::Result<()>
where
    F: Fn(&str) -> anyhow::Result<bool>,
    G: Fn(&str) -> anyhow::Result<()>,
{
    if !check_exists(item_name)? {
        return Err(anyhow::anyhow!("{} '{}' not found", item_type, item_name));
    }

    update_current(item_name)?;

    output_success(
        output_format,
        &format!("Switched to {} '{}'", item_type, item_name),
        Some(json!({ format!("current_{}", item_type): item_name })),
    )?;

    Ok(())
}

/// Extract target item name from optional parameter or use current
pub fn resolve_target_item(
    provided_name: Option<String>,
    current_getter: impl Fn() -> anyhow::Result<Option<String>>,
    item_type: &str,
) -> anyhow::Result<String> {
    match provided_name {
        Some(name) => Ok(name),
        None => match current_getter()? {
            Some(current) => Ok(current),
            None => Err(anyhow::anyhow!("No current {} set", item_type)),
        },
    }
}

/// Authenticated GET against the current server. Unwraps the response
/// envelope: returns `data` on success, the server's error message otherwise.
pub async fn api_get(path: &str, query: &[(&str, String)]) -> anyhow::Result<Value> {
    let env_config = load_environment_config()?;
    let server_name = env_config.current_server.ok_or_else(|| {
        anyhow::anyhow!("No current server set. Use 'compass server use <name>' first")
    })?;

    let server_config = load_server_config()?;
    let server = server_config.servers.get(&server_name).ok_or_else(|| {
        anyhow::anyhow!("Current server '{}' not found in configuration", server_name)
    })?;

    let auth = load_auth_config()?;
    let token = auth.token.ok_or_else(|| {
        anyhow::anyhow!("No token saved. Use 'compass auth set-token <jwt>' first")
    })?;

    let url = format!("{}{}", server.url(), path);
    let client = reqwest::Client::new();
    let response = client
        .get(&url)
        .query(query)
        .bearer_auth(&token)
        .timeout(std::time::Duration::from_secs(10))
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("Request to {} failed: {}", url, e))?;

    let status = response.status();
    let body: Value = response
        .json()
        .await
        .map_err(|e| anyhow::anyhow!("Invalid response from {}: {}", url, e))?;

    if body.get("success").and_then(Value::as_bool) == Some(true) {
        Ok(body.get("data").cloned().unwrap_or(Value::Null))
    } else {
        let message = body
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("request failed");
        Err(anyhow::anyhow!("{} (HTTP {})", message, status.as_u16()))
    }
}
