//! Background job: reclaim expired CSRF records.
//!
//! Validation checks expiry on its own; this only bounds memory for
//! principals that never come back to use their token.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

use crate::AppState;

/// Spawn the sweep task. It exits when `shutdown` flips to `true` or its sender drops.
pub fn spawn(
    state: Arc<AppState>,
    every: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = time::interval(every);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick fires immediately; nothing can be expired yet
        interval.tick().await;

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    run_once(&state);
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        tracing::debug!("csrf sweep job stopping");
                        break;
                    }
                }
            }
        }
    })
}

/// One sweep pass. Returns the number of records removed.
pub fn run_once(state: &AppState) -> usize {
    let removed = state.csrf.sweep();
    let live = state.csrf.len();
    state.metrics.record_sweep(removed, live);
    if removed > 0 {
        tracing::info!(removed, live, "swept expired csrf tokens");
    }
    removed
}
