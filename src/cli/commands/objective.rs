use clap::Subcommand;
use serde_json::{json, Value};

use crate::cli::utils::*;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum ObjectiveCommands {
    #[command(about = "List objectives visible to the saved token")]
    List {
        #[arg(long, help = "Filter by status (active, completed, archived)")]
        status: Option<String>,

        #[arg(long, help = "Filter by quarter (1-4)")]
        quarter: Option<i32>,

        #[arg(long, help = "Filter by year")]
        year: Option<i32>,

        #[arg(long, help = "Maximum rows to return")]
        limit: Option<i64>,
    },
}

pub async fn handle(cmd: ObjectiveCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        ObjectiveCommands::List {
            status,
            quarter,
            year,
            limit,
        } => {
            let mut query: Vec<(&str, String)> = Vec::new();
            if let Some(status) = status {
                query.push(("status", status));
            }
            if let Some(quarter) = quarter {
                query.push(("quarter", quarter.to_string()));
            }
            if let Some(year) = year {
                query.push(("year", year.to_string()));
            }
            if let Some(limit) = limit {
                query.push(("limit", limit.to_string()));
            }

            let data = api_get("/api/objectives", &query).await?;
            let objectives = data.as_array().cloned().unwrap_or_default();

            if objectives.is_empty() {
                return output_empty_collection(&output_format, "objectives", "No objectives");
            }

            match output_format {
                OutputFormat::Json => {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&json!({ "objectives": objectives }))?
                    );
                }
                OutputFormat::Text => {
                    println!(
                        "{:<38} {:<40} {:<10} {:>8}  {:<8} {}",
                        "ID", "TITLE", "STATUS", "PROGRESS", "PERIOD", "DEPARTMENT"
                    );
                    println!("{}", "-".repeat(115));

                    for objective in &objectives {
                        let id = objective.get("id").and_then(Value::as_str).unwrap_or("-");
                        let title = objective
                            .get("title")
                            .and_then(Value::as_str)
                            .unwrap_or("-");
                        let status = objective
                            .get("status")
                            .and_then(Value::as_str)
                            .unwrap_or("-");
                        let progress = objective
                            .get("progress")
                            .and_then(Value::as_i64)
                            .unwrap_or(0);
                        let quarter = objective
                            .get("quarter")
                            .and_then(Value::as_i64)
                            .unwrap_or(0);
                        let year = objective.get("year").and_then(Value::as_i64).unwrap_or(0);
                        let department = objective
                            .get("department")
                            .and_then(Value::as_str)
                            .unwrap_or("-");

                        println!(
                            "{:<38} {:<40} {:<10} {:>7}%  Q{} {}  {}",
                            id,
                            truncate(title, 38),
                            status,
                            progress,
                            quarter,
                            year,
                            department
                        );
                    }
                }
            }

            Ok(())
        }
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", cut)
}
