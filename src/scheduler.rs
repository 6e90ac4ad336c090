use anyhow::{bail, Result};
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info, warn};

use crate::engine::SyncEngine;

/// Initialize and start the scheduler: one reconciliation job per content type
pub async fn start_scheduler(engine: Arc<SyncEngine>) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    for entry in engine.registry().entries() {
        let cron_expr = interval_to_cron(entry.reconcile_interval_minutes)?;
        let content_type = entry.name().to_string();
        info!(
            "Scheduling reconciliation for {} every {} min (cron: {})",
            content_type, entry.reconcile_interval_minutes, cron_expr
        );

        let engine_clone = Arc::clone(&engine);

        let job = Job::new_async(cron_expr.as_str(), move |_uuid, _l| {
            let engine = Arc::clone(&engine_clone);
            let content_type = content_type.clone();

            Box::pin(async move {
                info!("⏰ Reconciliation triggered for {}", content_type);
                match engine.reconcile(&content_type).await {
                    Ok(report) if report.is_clean() => {}
                    Ok(report) => warn!(
                        content_type = %content_type,
                        failed = report.failed,
                        item_failures = report.item_failures,
                        aborted = ?report.aborted,
                        "Reconciliation finished with errors"
                    ),
                    Err(e) => error!("Scheduled reconciliation failed: {}", e),
                }
            })
        })?;

        scheduler.add(job).await?;
    }

    scheduler.start().await?;
    info!("✓ Scheduler started");

    Ok(scheduler)
}

/// Convert a reconciliation interval in minutes to a 6-field cron expression.
///
/// Sub-hour intervals use a minute step, whole hours an hour step, and 1440
/// runs once a day at midnight UTC. A minute step that does not divide 60
/// restarts at the top of every hour.
pub fn interval_to_cron(minutes: u32) -> Result<String> {
    match minutes {
        0 => bail!("Reconcile interval must be at least 1 minute"),
        1..=59 => Ok(format!("0 */{} * * * *", minutes)),
        1440 => Ok("0 0 0 * * *".to_string()),
        m if m < 1440 && m % 60 == 0 => Ok(format!("0 0 */{} * * *", m / 60)),
        m if m > 1440 => bail!("Reconcile interval {} exceeds one day", m),
        m => bail!(
            "Reconcile interval {} must be under an hour or a whole number of hours",
            m
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== interval_to_cron Tests ====================

    #[test]
    fn test_minute_intervals() {
        assert_eq!(interval_to_cron(1).unwrap(), "0 */1 * * * *");
        assert_eq!(interval_to_cron(15).unwrap(), "0 */15 * * * *");
        assert_eq!(interval_to_cron(59).unwrap(), "0 */59 * * * *");
    }

    #[test]
    fn test_hour_intervals() {
        assert_eq!(interval_to_cron(60).unwrap(), "0 0 */1 * * *");
        assert_eq!(interval_to_cron(360).unwrap(), "0 0 */6 * * *");
    }

    #[test]
    fn test_daily_interval() {
        assert_eq!(interval_to_cron(1440).unwrap(), "0 0 0 * * *");
    }

    #[test]
    fn test_invalid_intervals() {
        assert!(interval_to_cron(0).is_err());
        assert!(interval_to_cron(90).is_err());
        assert!(interval_to_cron(1441).is_err());
        assert!(interval_to_cron(2880).is_err());
    }

    #[tokio::test]
    async fn test_expressions_parse_as_jobs() {
        for minutes in [5, 60, 720, 1440] {
            let cron = interval_to_cron(minutes).unwrap();
            let job = Job::new_async(cron.as_str(), |_uuid, _l| Box::pin(async {}));
            assert!(job.is_ok(), "cron for {} minutes rejected: {}", minutes, cron);
        }
    }
}
