use async_trait::async_trait;
use chrono::{Datelike, Days, NaiveDate, Utc};
use serde_json::Value;

use crate::config::config;
use crate::services::reports::ReportService;

use super::{JobError, ScheduledJob};

/// Computes weekly per-company OKR metrics and stores one report row per
/// company, keyed by the Monday of the current ISO week. Re-running within
/// the same week overwrites that week's row.
pub struct WeeklyReportJob;

#[async_trait]
impl ScheduledJob for WeeklyReportJob {
    fn name(&self) -> &'static str {
        "weekly-report"
    }

    fn enabled(&self) -> bool {
        config().jobs.weekly_report_enabled
    }

    async fn run(&self) -> Result<Value, JobError> {
        let service = ReportService::new().await?;
        let summary = service.run_weekly(week_start_for(Utc::now().date_naive())).await?;
        serde_json::to_value(&summary).map_err(|e| JobError::Failed(e.to_string()))
    }
}

/// Monday of the ISO week containing `today`.
fn week_start_for(today: NaiveDate) -> NaiveDate {
    let back = today.weekday().num_days_from_monday() as u64;
    today.checked_sub_days(Days::new(back)).unwrap_or(today)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_week_start_is_monday() {
        let wednesday = NaiveDate::from_ymd_opt(2025, 8, 20).unwrap();
        assert_eq!(
            week_start_for(wednesday),
            NaiveDate::from_ymd_opt(2025, 8, 18).unwrap()
        );

        let sunday = NaiveDate::from_ymd_opt(2025, 8, 24).unwrap();
        assert_eq!(
            week_start_for(sunday),
            NaiveDate::from_ymd_opt(2025, 8, 18).unwrap()
        );
    }

    #[test]
    fn test_week_start_of_monday_is_itself() {
        let monday = NaiveDate::from_ymd_opt(2025, 8, 18).unwrap();
        assert_eq!(week_start_for(monday), monday);
    }
}
