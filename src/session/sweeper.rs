//! Periodic idle-session sweep.
//!
//! Runs on its own timer, independent of request traffic, so idle sessions
//! are reclaimed even when no new requests arrive. The task subscribes to
//! the shutdown channel and exits cleanly before the registry is drained.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::session::registry::SessionRegistry;

pub fn spawn(
    registry: Arc<SessionRegistry>,
    interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = registry.sweep(Instant::now());
                    if !removed.is_empty() {
                        tracing::info!(reclaimed = removed.len(), "idle sessions swept");
                    }
                }
                _ = shutdown.recv() => break,
            }
        }
        tracing::debug!("session sweeper stopped");
    })
}
