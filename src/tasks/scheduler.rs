use anyhow::Result;
use tokio::sync::watch;
use tokio::time::{sleep, Duration};

use crate::core::state::AppState;
use crate::services::error::SubmissionError;
use crate::services::media::remove_quietly;
use crate::services::orchestrator::{AttemptAction, Orchestrator};
use crate::tasks::queue::{JobQueue, RetryJob};

pub(crate) async fn run(state: AppState) -> Result<()> {
    let orchestrator = state.orchestrator().clone();
    let queue = JobQueue::new(state.redis().clone());
    let concurrency = state.settings().queue().worker_concurrency.max(1);
    let poll_interval = Duration::from_secs(state.settings().queue().poll_interval_seconds.max(1));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let mut handles = Vec::with_capacity(concurrency);
    for _ in 0..concurrency {
        handles.push(tokio::spawn(retry_worker(
            orchestrator.clone(),
            queue.clone(),
            poll_interval,
            shutdown_rx.clone(),
        )));
    }

    crate::core::shutdown::shutdown_signal().await;
    if shutdown_tx.send(true).is_err() {
        tracing::warn!("Failed to broadcast shutdown signal to background tasks");
    }

    for handle in handles {
        if let Err(err) = handle.await {
            tracing::error!(error = %err, "Background task join failed");
        }
    }

    Ok(())
}

async fn retry_worker(
    orchestrator: Orchestrator,
    queue: JobQueue,
    poll_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() {
            break;
        }

        match queue.claim_due().await {
            Ok(Some(job)) => {
                run_retry(&orchestrator, job).await;
                continue;
            }
            Ok(None) => {}
            Err(err) => tracing::error!(error = %err, "Failed to claim retry job"),
        }

        tokio::select! {
            _ = shutdown.changed() => break,
            _ = sleep(poll_interval) => {}
        }
    }
}

/// Runs the claimed retry and then disposes of the job's uploaded video,
/// whatever the outcome. A RETRY attempt never schedules another retry,
/// so the file has no further consumer.
async fn run_retry(orchestrator: &Orchestrator, job: RetryJob) {
    let submission_id = job.submission_id;
    tracing::info!(submission_id, "Running scheduled retry");

    match orchestrator.run_attempt(submission_id, AttemptAction::Retry, job.video_path.clone()).await
    {
        Ok(_) => {
            tracing::info!(submission_id, "Scheduled retry succeeded");
        }
        Err(SubmissionError::AlreadyRevised(_)) => {
            tracing::info!(submission_id, "Skipping retry, submission was revised manually");
        }
        Err(err) => {
            tracing::error!(submission_id, error = %err, "Scheduled retry failed");
        }
    }

    if let Some(path) = job.video_path.as_deref() {
        remove_quietly(path).await;
    }
}
