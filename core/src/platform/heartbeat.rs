//! Periodic keep-alive heartbeat
//!
//! While the host runs, the heartbeat re-asserts `start()` on a fixed
//! interval. Start is idempotent, so a healthy service sees no OS calls.
//! Once the OS has destroyed the service (`on_destroy`), the next beat
//! registers it again. A kill the supervisor is never told about goes
//! unnoticed until that callback arrives.

use crate::platform::service::{Ack, LivenessSupervisor};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Handle to a running heartbeat task. Dropping it also ends the heartbeat.
pub struct HeartbeatHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
    ticks: Arc<AtomicU64>,
}

impl HeartbeatHandle {
    /// Heartbeats completed so far
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Cancel the heartbeat and wait for the task to finish
    pub async fn stop(mut self) -> u64 {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Err(e) = (&mut self.task).await {
            tracing::warn!("Heartbeat task ended abnormally: {}", e);
        }
        self.ticks()
    }
}

/// Spawn the heartbeat on the current tokio runtime. The first beat happens
/// one full `period` after spawning.
pub fn spawn_heartbeat(supervisor: Arc<LivenessSupervisor>, period: Duration) -> HeartbeatHandle {
    let (shutdown, mut shutdown_rx) = oneshot::channel();
    let ticks = Arc::new(AtomicU64::new(0));
    let counter = ticks.clone();

    let task = tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::debug!("Keep-alive heartbeat every {:?}", period);
        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                _ = interval.tick() => {
                    // start() holds the state lock across host calls
                    let supervisor = supervisor.clone();
                    if let Err(e) = tokio::task::spawn_blocking(move || beat(&supervisor)).await {
                        tracing::warn!("Heartbeat beat panicked: {}", e);
                    }
                    counter.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
        tracing::debug!("Keep-alive heartbeat stopped");
    });

    HeartbeatHandle {
        shutdown: Some(shutdown),
        task,
        ticks,
    }
}

fn beat(supervisor: &LivenessSupervisor) {
    match supervisor.start() {
        Ok(Ack::Skipped) => tracing::debug!("Heartbeat: foreground denied, skipped"),
        Ok(_) => tracing::trace!("Heartbeat: keep-alive service asserted"),
        Err(e) => tracing::warn!("Heartbeat could not start keep-alive service: {}", e),
    }
}
