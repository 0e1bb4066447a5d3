use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::AutosaveError;

/// Boxed future returned by [`AutosaveJob`] methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The work an autosave session repeats.
pub trait AutosaveJob: Send + Sync + 'static {
    /// Looks up the save-location template recorded for `folder_id`.
    fn save_location<'a>(
        &'a self,
        folder_id: &'a str,
    ) -> BoxFuture<'a, Result<Option<String>, AutosaveError>>;

    /// Archives `save_location` and uploads it into `folder_id`.
    fn backup<'a>(
        &'a self,
        folder_id: &'a str,
        save_location: &'a str,
    ) -> BoxFuture<'a, Result<(), AutosaveError>>;
}

/// A running autosave timer for one game folder.
///
/// Cancelled by [`cancel`](Self::cancel), by cancelling the parent token
/// passed to [`start`](Self::start), or by dropping the session.
pub struct AutosaveSession {
    folder_id: String,
    cancel: CancellationToken,
    firings: Arc<AtomicU64>,
    task: Option<JoinHandle<()>>,
}

impl AutosaveSession {
    /// Starts repeating `job` every `interval`, first firing one interval from now.
    ///
    /// Fails without scheduling anything if no save location is recorded
    /// for the folder.
    pub async fn start(
        job: Arc<dyn AutosaveJob>,
        folder_id: impl Into<String>,
        interval: Duration,
        parent: &CancellationToken,
    ) -> Result<Self, AutosaveError> {
        let folder_id = folder_id.into();
        if interval.is_zero() {
            return Err(AutosaveError::InvalidInterval);
        }
        let first_tick = Instant::now()
            .checked_add(interval)
            .ok_or(AutosaveError::InvalidInterval)?;

        let location = job
            .save_location(&folder_id)
            .await?
            .filter(|l| !l.trim().is_empty())
            .ok_or_else(|| AutosaveError::NoSaveLocation(folder_id.clone()))?;

        let cancel = parent.child_token();
        let firings = Arc::new(AtomicU64::new(0));

        let task = tokio::spawn(run_timer(
            job,
            folder_id.clone(),
            location,
            first_tick,
            interval,
            cancel.clone(),
            Arc::clone(&firings),
        ));

        tracing::info!(
            folder_id = %folder_id,
            interval_secs = interval.as_secs(),
            "autosave started"
        );

        Ok(Self {
            folder_id,
            cancel,
            firings,
            task: Some(task),
        })
    }

    /// Stops future firings. An in-flight firing still completes.
    pub fn cancel(&self) {
        if !self.cancel.is_cancelled() {
            self.cancel.cancel();
            tracing::info!(folder_id = %self.folder_id, "autosave stopped");
        }
    }

    /// Cancels the session and waits for an in-flight firing to finish.
    pub async fn shutdown(mut self) {
        self.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(folder_id = %self.folder_id, error = %e, "autosave task panicked");
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Number of firings that have finished, successful or not.
    pub fn firings(&self) -> u64 {
        self.firings.load(Ordering::SeqCst)
    }
}

impl Drop for AutosaveSession {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Timer loop. Firings run inline, so they never overlap; ticks missed
/// while one runs collapse into a single firing.
async fn run_timer(
    job: Arc<dyn AutosaveJob>,
    folder_id: String,
    location: String,
    first_tick: Instant,
    interval: Duration,
    cancel: CancellationToken,
    firings: Arc<AtomicU64>,
) {
    let mut ticker = tokio::time::interval_at(first_tick, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match job.backup(&folder_id, &location).await {
            Ok(()) => {
                let at = chrono::Local::now().format("%H:%M:%S");
                tracing::info!(folder_id = %folder_id, at = %at, "autosave completed");
            }
            Err(e) => {
                tracing::error!(folder_id = %folder_id, error = %e, "autosave failed");
            }
        }
        firings.fetch_add(1, Ordering::SeqCst);
    }

    tracing::debug!(folder_id = %folder_id, "autosave timer exited");
}
