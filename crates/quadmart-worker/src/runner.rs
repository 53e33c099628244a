//! Worker runner: the loop that claims jobs and executes them.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time;
use tracing::{error, info, warn};

use quadmart_core::config::worker::WorkerConfig;
use quadmart_entity::job::model::Job;

use crate::executor::JobExecutor;
use crate::queue::JobQueue;

/// Polls the durable queue and executes claimed jobs.
///
/// Exactly one job is in flight at a time; horizontal scale comes from
/// running more worker processes, each claiming through
/// `FOR UPDATE SKIP LOCKED`. Shutdown lets the in-flight job finish
/// before the loop exits.
pub struct WorkerRunner {
    queue: Arc<JobQueue>,
    executor: Arc<JobExecutor>,
    config: WorkerConfig,
}

impl WorkerRunner {
    /// Create a new worker runner.
    pub fn new(queue: Arc<JobQueue>, executor: Arc<JobExecutor>, config: WorkerConfig) -> Self {
        Self {
            queue,
            executor,
            config,
        }
    }

    /// Run until the cancel signal flips to `true`.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        info!(
            worker_id = self.queue.worker_id(),
            poll_interval = self.config.poll_interval_seconds,
            lease = self.config.lease_seconds,
            "Worker started"
        );

        let poll_interval = Duration::from_secs(self.config.poll_interval_seconds);

        loop {
            if *cancel.borrow() {
                break;
            }

            match self.queue.claim_next(self.config.lease_seconds).await {
                Ok(Some(job)) => {
                    // The in-flight job always runs to a verdict, even if
                    // shutdown arrives mid-execution.
                    self.process(job).await;
                }
                Ok(None) => {
                    tokio::select! {
                        _ = cancel.changed() => {}
                        _ = self.queue.notified() => {}
                        _ = time::sleep(poll_interval) => {}
                    }
                }
                Err(e) => {
                    error!("Failed to claim next job: {e}");
                    tokio::select! {
                        _ = cancel.changed() => {}
                        _ = time::sleep(poll_interval) => {}
                    }
                }
            }
        }

        info!(worker_id = self.queue.worker_id(), "Worker shut down");
    }

    /// Execute one claimed job and settle its outcome in the queue.
    async fn process(&self, job: Job) {
        let job_id = job.id;
        match self.executor.execute(&job).await {
            Ok(result) => {
                if let Err(e) = self.queue.complete(job_id, result.as_ref()).await {
                    error!(%job_id, "Failed to mark job completed: {e}");
                } else {
                    info!(%job_id, "Job completed");
                }
            }
            Err(err) if err.is_transient() && job.can_retry() => {
                let delay = self.config.backoff_for_attempt(job.attempts);
                warn!(%job_id, delay, "Job failed, will retry: {err}");
                if let Err(e) = self
                    .queue
                    .retry_later(job_id, &err.to_string(), delay)
                    .await
                {
                    error!(%job_id, "Failed to schedule job retry: {e}");
                }
            }
            Err(err) => {
                warn!(%job_id, "Job failed permanently: {err}");
                if let Err(e) = self.queue.fail(job_id, &err.to_string()).await {
                    error!(%job_id, "Failed to mark job failed: {e}");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use serde_json::Value;

    use quadmart_entity::job::model::CreateJob;
    use quadmart_entity::job::status::{JobStatus, JobType};

    use crate::executor::JobExecutionError;
    use crate::memory::InMemoryJobStore;
    use crate::JobHandler;

    struct FlakyHandler {
        calls: Arc<AtomicU32>,
        succeed_on_call: u32,
    }

    #[async_trait]
    impl JobHandler for FlakyHandler {
        fn job_type(&self) -> JobType {
            JobType::EmailSend
        }

        async fn execute(&self, _job: &Job) -> Result<Option<Value>, JobExecutionError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call >= self.succeed_on_call {
                Ok(Some(serde_json::json!({ "call": call })))
            } else {
                Err(JobExecutionError::Transient("smtp timed out".to_string()))
            }
        }
    }

    fn runner_with_handler(handler: FlakyHandler) -> (WorkerRunner, Arc<JobQueue>) {
        let queue = Arc::new(JobQueue::new(
            Arc::new(InMemoryJobStore::new()),
            "worker-test".to_string(),
        ));
        let mut executor = JobExecutor::new();
        executor.register(Arc::new(handler));
        let config = WorkerConfig {
            poll_interval_seconds: 0,
            backoff_seconds: vec![0],
            ..WorkerConfig::default()
        };
        (
            WorkerRunner::new(queue.clone(), Arc::new(executor), config),
            queue,
        )
    }

    async fn wait_for_status(queue: &JobQueue, id: uuid::Uuid, status: JobStatus) -> Job {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let job = queue.find_by_id(id).await.unwrap().unwrap();
                if job.status == status {
                    return job;
                }
                time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_transient_failure_retries_then_fails_at_ceiling() {
        let calls = Arc::new(AtomicU32::new(0));
        let (runner, queue) = runner_with_handler(FlakyHandler {
            calls: calls.clone(),
            succeed_on_call: u32::MAX,
        });

        let job = queue
            .enqueue(CreateJob {
                job_type: JobType::EmailSend,
                payload: serde_json::json!({}),
                priority: 0,
                max_attempts: 2,
                run_at: None,
            })
            .await
            .unwrap();

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let handle = tokio::spawn(async move { runner.run(cancel_rx).await });

        let failed = wait_for_status(&queue, job.id, JobStatus::Failed).await;
        assert_eq!(failed.attempts, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        cancel_tx.send(true).unwrap();
        handle.await.unwrap();

        // Once failed at the ceiling the job is never handed out again.
        assert!(queue.claim_next(60).await.unwrap().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_succeeds_before_ceiling() {
        let calls = Arc::new(AtomicU32::new(0));
        let (runner, queue) = runner_with_handler(FlakyHandler {
            calls: calls.clone(),
            succeed_on_call: 2,
        });

        let job = queue
            .enqueue(CreateJob {
                job_type: JobType::EmailSend,
                payload: serde_json::json!({}),
                priority: 0,
                max_attempts: 3,
                run_at: None,
            })
            .await
            .unwrap();

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let handle = tokio::spawn(async move { runner.run(cancel_rx).await });

        let completed = wait_for_status(&queue, job.id, JobStatus::Completed).await;
        assert_eq!(completed.attempts, 1);
        assert_eq!(completed.result, Some(serde_json::json!({ "call": 2 })));

        cancel_tx.send(true).unwrap();
        handle.await.unwrap();
    }
}
