// ABOUTME: Background status poller for ETL jobs
// ABOUTME: Re-fetches the job snapshot on a fixed interval while it runs, stops on terminal states

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::remote::client::ApiClient;
use crate::remote::models::EtlStatus;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5000);

/// What observers see after each tick. Replaced whole, never merged.
#[derive(Debug, Clone, Default)]
pub struct PollSnapshot {
    /// Latest successfully fetched status, if any tick has succeeded yet.
    pub status: Option<EtlStatus>,
    /// Error from the most recent tick, cleared by the next successful one.
    pub last_error: Option<String>,
}

/// Owns the recurring fetch task for one watching session.
///
/// The loop performs one unconditional initial fetch (so a job already in
/// progress is picked up), then keeps polling only while the last fetched
/// state was `running`. A failed tick records the error and keeps the loop
/// alive; only a non-running state ends it. The watch channel closes when
/// the loop exits, which is how observers learn that polling is over.
pub struct StatusPoller {
    snapshots: watch::Receiver<PollSnapshot>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl StatusPoller {
    pub fn spawn(client: Arc<ApiClient>, interval: Duration) -> Self {
        let (tx, snapshots) = watch::channel(PollSnapshot::default());
        let cancel = CancellationToken::new();
        let task = tokio::spawn(poll_loop(client, interval, tx, cancel.clone()));
        Self {
            snapshots,
            cancel,
            task,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<PollSnapshot> {
        self.snapshots.clone()
    }

    pub fn latest(&self) -> PollSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Cancels the loop. Once this returns, no further status requests are
    /// issued; an in-flight fetch is dropped rather than awaited.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.task.await;
    }

    /// Waits for the loop to disarm on its own and returns the final snapshot.
    pub async fn join(self) -> PollSnapshot {
        let _ = self.task.await;
        self.snapshots.borrow().clone()
    }
}

async fn poll_loop(
    client: Arc<ApiClient>,
    interval: Duration,
    tx: watch::Sender<PollSnapshot>,
    cancel: CancellationToken,
) {
    // Armed only after observing a running job; a tick error leaves the
    // previous arming untouched so a transient failure cannot end polling.
    let mut armed = false;

    loop {
        let result = tokio::select! {
            _ = cancel.cancelled() => break,
            result = client.fetch_status() => result,
        };

        match result {
            Ok(status) => {
                armed = status.state.is_active();
                debug!(job_id = %status.job_id, state = %status.state, "fetched job status");
                tx.send_modify(|snap| {
                    snap.status = Some(status);
                    snap.last_error = None;
                });
            }
            Err(err) => {
                debug!(error = %err, "status fetch failed, polling continues");
                tx.send_modify(|snap| snap.last_error = Some(err.to_string()));
            }
        }

        if !armed {
            break;
        }

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }
}
