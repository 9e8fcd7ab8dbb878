use crate::models::{AbortReason, SyncRun};
use crate::sync::SyncCoordinator;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};

/// Periodic quote synchronization job
///
/// Each tick calls `SyncCoordinator::synchronize_detached`; overlap and cooldown are
/// enforced by the coordinator's run guard, not by the scheduler.
pub struct QuoteSyncJob {
    coordinator: Arc<SyncCoordinator>,
    schedule: String,
}

impl QuoteSyncJob {
    pub fn new(coordinator: Arc<SyncCoordinator>, schedule: impl Into<String>) -> Self {
        Self {
            coordinator,
            schedule: schedule.into(),
        }
    }

    /// Register this job with the scheduler
    pub async fn register(self, scheduler: &JobScheduler) -> Result<(), Box<dyn std::error::Error>> {
        let coordinator = self.coordinator.clone();

        let job = Job::new_async(self.schedule.as_str(), move |_uuid, _lock| {
            let coordinator = coordinator.clone();

            Box::pin(async move {
                let run = coordinator.synchronize_detached().await;

                match run.abort_reason {
                    Some(reason @ (AbortReason::AlreadyRunning | AbortReason::TooSoon)) => {
                        tracing::debug!("Scheduled sync did not run: {:?}", reason);
                    }
                    Some(reason) => {
                        tracing::warn!("Scheduled sync {} aborted: {:?}", run.run_id, reason);
                    }
                    None => {
                        tracing::debug!("Scheduled sync {} completed", run.run_id);
                    }
                }
            })
        })?;

        scheduler.add(job).await?;

        tracing::info!("Quote sync job registered (schedule: {})", self.schedule);

        Ok(())
    }

    /// Run a synchronization immediately (manual trigger)
    pub async fn run_now(&self) -> SyncRun {
        self.coordinator.synchronize_detached().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use crate::database::repositories::InMemoryQuoteRepository;
    use crate::models::RunStatus;
    use crate::sync::RepositoryGateway;
    use crate::test_support::{history, ScriptedQuoteProvider};
    use tokio_util::sync::CancellationToken;

    fn coordinator() -> Arc<SyncCoordinator> {
        let repo = Arc::new(InMemoryQuoteRepository::with_keys(["TCS"]));
        let provider = ScriptedQuoteProvider::new().with("TCS.NS", history(3400.0, 3410.0));
        Arc::new(SyncCoordinator::new(
            Arc::new(RepositoryGateway::new(repo)),
            Arc::new(provider),
            &SyncConfig::default(),
            CancellationToken::new(),
        ))
    }

    #[tokio::test]
    async fn test_run_now_synchronizes() {
        let job = QuoteSyncJob::new(coordinator(), "0 */15 * * * *");

        let run = job.run_now().await;

        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!(run.symbols_updated, 1);
    }

    #[tokio::test]
    async fn test_register_rejects_bad_schedule() {
        let scheduler = JobScheduler::new().await.unwrap();

        let job = QuoteSyncJob::new(coordinator(), "every fifteen minutes");

        assert!(job.register(&scheduler).await.is_err());
    }
}
