use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::ai::{AiClient, AiError, InitiativeOutline, ObjectiveAnalysis, ObjectiveOutline};
use crate::config::config;
use crate::database::manager::{DatabaseError, DatabaseManager};
use crate::database::scope::CompanyScope;

use super::{JobError, ScheduledJob};

/// An active objective untouched for this long is a candidate for analysis.
const STALE_AFTER_DAYS: i32 = 14;

/// Objectives at or above this progress are left alone.
const PROGRESS_CUTOFF: i32 = 70;

/// Minimum days between analyses of the same objective.
const REANALYZE_AFTER_DAYS: i32 = 7;

/// Requests an AI health analysis for stale objectives and stores the
/// verdicts in `okr_analyses`. Per-objective AI failures are logged and
/// counted, never fatal to the run.
pub struct OkrAnalysisJob;

#[derive(Debug, Serialize)]
pub struct AnalysisRunSummary {
    pub companies: u32,
    pub objectives_examined: u32,
    pub analyses_written: u32,
    pub failures: u32,
}

#[derive(Debug, FromRow)]
struct StaleObjective {
    id: Uuid,
    company_id: Uuid,
    title: String,
    description: Option<String>,
    progress: i32,
    quarter: i32,
    year: i32,
}

struct AnalysisCase {
    objective_id: Uuid,
    company_id: Uuid,
    outline: ObjectiveOutline,
}

#[async_trait]
impl ScheduledJob for OkrAnalysisJob {
    fn name(&self) -> &'static str {
        "okr-analysis"
    }

    fn enabled(&self) -> bool {
        config().jobs.okr_analysis_enabled
    }

    async fn run(&self) -> Result<Value, JobError> {
        // The job is pointless without the AI backend, so a missing key
        // reads as the job itself being off.
        let client = match AiClient::from_config() {
            Ok(client) => client,
            Err(AiError::Disabled) => return Err(JobError::Disabled(self.name())),
            Err(e) => return Err(JobError::Failed(e.to_string())),
        };

        let pool = DatabaseManager::pool().await?;
        let batch_size = config().jobs.analysis_batch_size;
        let (companies, cases) = collect_stale(&pool, batch_size).await?;
        let objectives_examined = cases.len() as u32;

        let mut failures = 0u32;
        let mut verdicts: Vec<(AnalysisCase, ObjectiveAnalysis)> = Vec::new();
        for case in cases {
            match client.analyze_objective(&case.outline).await {
                Ok(analysis) => verdicts.push((case, analysis)),
                Err(e) => {
                    tracing::warn!("Analysis of objective {} failed: {}", case.objective_id, e);
                    failures += 1;
                }
            }
        }

        let analyses_written = if verdicts.is_empty() {
            0
        } else {
            store_verdicts(&pool, client.model(), &verdicts).await?
        };

        let summary = AnalysisRunSummary {
            companies,
            objectives_examined,
            analyses_written,
            failures,
        };
        serde_json::to_value(&summary).map_err(|e| JobError::Failed(e.to_string()))
    }
}

/// Walks every company and pulls its stale objectives, capped per company so
/// one tenant cannot eat the whole run.
async fn collect_stale(
    pool: &PgPool,
    batch_size: i64,
) -> Result<(u32, Vec<AnalysisCase>), DatabaseError> {
    let mut scope = CompanyScope::service(pool).await?;

    let companies: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM companies ORDER BY created_at")
        .fetch_all(scope.conn())
        .await?;

    let mut cases = Vec::new();
    for (company_id,) in &companies {
        // The NOT EXISTS arm keeps a daily cron from re-analyzing the same
        // objective before anyone has had a chance to act on the verdict.
        let stale: Vec<StaleObjective> = sqlx::query_as(
            "SELECT id, company_id, title, description, progress, quarter, year \
             FROM objectives o \
             WHERE company_id = $1 \
               AND deleted_at IS NULL \
               AND status = 'active' \
               AND progress < $2 \
               AND updated_at < now() - make_interval(days => $3) \
               AND NOT EXISTS (SELECT 1 FROM okr_analyses a \
                 WHERE a.objective_id = o.id \
                 AND a.generated_at > now() - make_interval(days => $4)) \
             ORDER BY updated_at ASC \
             LIMIT $5",
        )
        .bind(company_id)
        .bind(PROGRESS_CUTOFF)
        .bind(STALE_AFTER_DAYS)
        .bind(REANALYZE_AFTER_DAYS)
        .bind(batch_size)
        .fetch_all(scope.conn())
        .await?;

        for objective in stale {
            let initiatives: Vec<(String, String, i32)> = sqlx::query_as(
                "SELECT title, status, progress FROM initiatives \
                 WHERE objective_id = $1 ORDER BY created_at",
            )
            .bind(objective.id)
            .fetch_all(scope.conn())
            .await?;

            cases.push(case_for(objective, initiatives));
        }
    }

    scope.commit().await?;
    Ok((companies.len() as u32, cases))
}

fn case_for(objective: StaleObjective, initiatives: Vec<(String, String, i32)>) -> AnalysisCase {
    AnalysisCase {
        objective_id: objective.id,
        company_id: objective.company_id,
        outline: ObjectiveOutline {
            title: objective.title,
            description: objective.description,
            status: "active".to_string(),
            progress: objective.progress,
            quarter: objective.quarter,
            year: objective.year,
            initiatives: initiatives
                .into_iter()
                .map(|(title, status, progress)| InitiativeOutline { title, status, progress })
                .collect(),
        },
    }
}

async fn store_verdicts(
    pool: &PgPool,
    model: &str,
    verdicts: &[(AnalysisCase, ObjectiveAnalysis)],
) -> Result<u32, DatabaseError> {
    let mut scope = CompanyScope::service(pool).await?;
    let mut written = 0u32;

    for (case, analysis) in verdicts {
        sqlx::query(
            "INSERT INTO okr_analyses (company_id, objective_id, risk_level, summary, model) \
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(case.company_id)
        .bind(case.objective_id)
        .bind(&analysis.risk_level)
        .bind(&analysis.summary)
        .bind(model)
        .execute(scope.conn())
        .await?;
        written += 1;
    }

    scope.commit().await?;
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_for_maps_outline_fields() {
        let objective = StaleObjective {
            id: Uuid::new_v4(),
            company_id: Uuid::new_v4(),
            title: "Grow ARR".to_string(),
            description: Some("Focus on expansion".to_string()),
            progress: 35,
            quarter: 2,
            year: 2025,
        };
        let case = case_for(
            objective,
            vec![("Upsell campaign".to_string(), "in_progress".to_string(), 50)],
        );

        assert_eq!(case.outline.title, "Grow ARR");
        assert_eq!(case.outline.status, "active");
        assert_eq!(case.outline.progress, 35);
        assert_eq!(case.outline.initiatives.len(), 1);
        assert_eq!(case.outline.initiatives[0].status, "in_progress");
    }
}
