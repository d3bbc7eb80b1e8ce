use chrono::NaiveDate;
use serde::Serialize;
use sqlx::{FromRow, PgPool};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::models::ObjectiveStatus;
use crate::database::scope::CompanyScope;
use crate::email::EmailClient;

/// Objectives below this progress while still active count as at risk.
const AT_RISK_THRESHOLD: i32 = 30;

/// The slice of an objective the weekly aggregation needs.
#[derive(Debug, Clone, FromRow)]
pub struct ObjectiveStatRow {
    pub department: Option<String>,
    pub status: ObjectiveStatus,
    pub progress: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct DepartmentStats {
    pub total: i32,
    pub avg_progress: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct WeeklyMetrics {
    pub total: i32,
    pub completed: i32,
    pub at_risk: i32,
    pub avg_progress: f64,
    pub by_department: BTreeMap<String, DepartmentStats>,
}

#[derive(Debug, Serialize)]
pub struct WeeklyRunSummary {
    pub week_start: NaiveDate,
    pub companies: u32,
    pub reports_written: u32,
    pub emails_sent: u32,
}

/// Pure aggregation over one company's objectives. Kept free of the
/// database so the counting rules stay testable.
pub fn aggregate(rows: &[ObjectiveStatRow]) -> WeeklyMetrics {
    let total = rows.len() as i32;
    let mut completed = 0;
    let mut at_risk = 0;
    let mut progress_sum: i64 = 0;

    let mut departments: BTreeMap<String, (i32, i64)> = BTreeMap::new();

    for row in rows {
        progress_sum += row.progress as i64;
        match row.status {
            ObjectiveStatus::Completed => completed += 1,
            ObjectiveStatus::Active if row.progress < AT_RISK_THRESHOLD => at_risk += 1,
            _ => {}
        }

        let key = row
            .department
            .clone()
            .unwrap_or_else(|| "unassigned".to_string());
        let entry = departments.entry(key).or_insert((0, 0));
        entry.0 += 1;
        entry.1 += row.progress as i64;
    }

    let avg_progress = if total > 0 {
        progress_sum as f64 / total as f64
    } else {
        0.0
    };

    let by_department = departments
        .into_iter()
        .map(|(dept, (count, sum))| {
            (
                dept,
                DepartmentStats {
                    total: count,
                    avg_progress: sum as f64 / count as f64,
                },
            )
        })
        .collect();

    WeeklyMetrics {
        total,
        completed,
        at_risk,
        avg_progress,
        by_department,
    }
}

pub struct ReportService {
    pool: PgPool,
}

impl ReportService {
    pub async fn new() -> Result<Self, DatabaseError> {
        let pool = DatabaseManager::pool().await?;
        Ok(Self { pool })
    }

    /// Aggregate every company's objectives into a weekly_reports row.
    /// Reruns for the same week overwrite. Summary emails to corporativo
    /// profiles go out after commit, best effort.
    pub async fn run_weekly(&self, week_start: NaiveDate) -> Result<WeeklyRunSummary, DatabaseError> {
        let mut scope = CompanyScope::service(&self.pool).await?;

        let companies: Vec<(Uuid, String)> =
            sqlx::query_as("SELECT id, name FROM companies ORDER BY created_at")
                .fetch_all(scope.conn())
                .await?;

        let mut reports_written = 0u32;
        let mut outbox: Vec<(String, String, WeeklyMetrics)> = Vec::new();

        for (company_id, company_name) in &companies {
            // The service scope sees every company; the per-company filter
            // is deliberate here, not tenant isolation.
            let rows: Vec<ObjectiveStatRow> = sqlx::query_as(
                "SELECT department, status, progress FROM objectives \
                 WHERE company_id = $1 AND deleted_at IS NULL",
            )
            .bind(company_id)
            .fetch_all(scope.conn())
            .await?;

            let metrics = aggregate(&rows);
            let summary_json = serde_json::to_value(&metrics.by_department)
                .map_err(|e| DatabaseError::QueryError(format!("summary serialization: {}", e)))?;

            sqlx::query(
                "INSERT INTO weekly_reports \
                 (company_id, week_start, total_objectives, completed_objectives, \
                  at_risk_objectives, avg_progress, summary) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7) \
                 ON CONFLICT (company_id, week_start) DO UPDATE SET \
                   total_objectives = EXCLUDED.total_objectives, \
                   completed_objectives = EXCLUDED.completed_objectives, \
                   at_risk_objectives = EXCLUDED.at_risk_objectives, \
                   avg_progress = EXCLUDED.avg_progress, \
                   summary = EXCLUDED.summary, \
                   generated_at = now()",
            )
            .bind(company_id)
            .bind(week_start)
            .bind(metrics.total)
            .bind(metrics.completed)
            .bind(metrics.at_risk)
            .bind(metrics.avg_progress)
            .bind(&summary_json)
            .execute(scope.conn())
            .await?;
            reports_written += 1;

            let recipients: Vec<(String,)> = sqlx::query_as(
                "SELECT email FROM profiles \
                 WHERE company_id = $1 AND role_type = 'corporativo'",
            )
            .bind(company_id)
            .fetch_all(scope.conn())
            .await?;

            for (email,) in recipients {
                outbox.push((email, company_name.clone(), metrics.clone()));
            }
        }

        scope.commit().await?;

        let mut emails_sent = 0u32;
        if let Some(client) = EmailClient::from_config() {
            for (email, company_name, metrics) in &outbox {
                match client.send_report_summary(email, company_name, metrics).await {
                    Ok(_) => emails_sent += 1,
                    Err(e) => tracing::warn!("Weekly summary email to {} failed: {}", email, e),
                }
            }
        }

        Ok(WeeklyRunSummary {
            week_start,
            companies: companies.len() as u32,
            reports_written,
            emails_sent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(department: Option<&str>, status: ObjectiveStatus, progress: i32) -> ObjectiveStatRow {
        ObjectiveStatRow {
            department: department.map(|s| s.to_string()),
            status,
            progress,
        }
    }

    #[test]
    fn aggregates_counts_and_average() {
        let rows = vec![
            row(Some("sales"), ObjectiveStatus::Active, 80),
            row(Some("sales"), ObjectiveStatus::Completed, 100),
            row(Some("eng"), ObjectiveStatus::Active, 10),
            row(None, ObjectiveStatus::Archived, 50),
        ];

        let m = aggregate(&rows);
        assert_eq!(m.total, 4);
        assert_eq!(m.completed, 1);
        assert_eq!(m.at_risk, 1); // only the active 10% one
        assert_eq!(m.avg_progress, 60.0);
    }

    #[test]
    fn at_risk_requires_active_status() {
        // Low progress but archived: not at risk.
        let rows = vec![
            row(None, ObjectiveStatus::Archived, 5),
            row(None, ObjectiveStatus::Completed, 100),
        ];
        assert_eq!(aggregate(&rows).at_risk, 0);
    }

    #[test]
    fn boundary_progress_is_not_at_risk() {
        let rows = vec![row(None, ObjectiveStatus::Active, AT_RISK_THRESHOLD)];
        assert_eq!(aggregate(&rows).at_risk, 0);
    }

    #[test]
    fn departments_bucket_with_unassigned_fallback() {
        let rows = vec![
            row(Some("sales"), ObjectiveStatus::Active, 40),
            row(Some("sales"), ObjectiveStatus::Active, 60),
            row(None, ObjectiveStatus::Active, 90),
        ];

        let m = aggregate(&rows);
        assert_eq!(m.by_department.len(), 2);
        assert_eq!(m.by_department["sales"].total, 2);
        assert_eq!(m.by_department["sales"].avg_progress, 50.0);
        assert_eq!(m.by_department["unassigned"].total, 1);
    }

    #[test]
    fn empty_company_aggregates_to_zeroes() {
        let m = aggregate(&[]);
        assert_eq!(m.total, 0);
        assert_eq!(m.avg_progress, 0.0);
        assert!(m.by_department.is_empty());
    }
}
