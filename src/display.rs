//! Display synchronizer: a fixed-period polling loop that re-reads the store
//! and publishes render snapshots. There is no push channel between the
//! engine and a display; cross-instance sync is polling plus shared storage,
//! so a display is at most one refresh period (~100ms) stale.

use std::time::Duration;

use log::{error, info};
use serde::Serialize;
use tokio::{
    sync::watch,
    task::JoinHandle,
    time::{interval, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

use crate::{clock, model::TimerState, store::Database};

pub const REFRESH_PERIOD: Duration = Duration::from_millis(100);

/// Everything a page needs to render one frame of the countdown.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DisplaySnapshot {
    /// "MM:SS", the large countdown readout.
    pub clock: String,
    /// "MM:SS.T", the precise remaining-time readout.
    pub clock_precise: String,
    /// Consumed fraction of the countdown, 0.0 when no total is set.
    pub progress: f64,
    pub project: String,
    pub is_running: bool,
}

impl DisplaySnapshot {
    pub fn from_state(state: &TimerState) -> Self {
        Self {
            clock: clock::to_clock_coarse(state.remaining_tenths),
            clock_precise: clock::to_clock(state.remaining_tenths),
            progress: state.progress(),
            project: state.selected_project.clone(),
            is_running: state.is_running,
        }
    }
}

impl Default for DisplaySnapshot {
    fn default() -> Self {
        Self::from_state(&TimerState::default())
    }
}

/// Owns the refresh task. Runs on every page instance regardless of role;
/// it only ever reads the store.
pub struct DisplayLoop {
    snapshot_rx: watch::Receiver<DisplaySnapshot>,
    cancel: CancellationToken,
    worker: Option<JoinHandle<()>>,
}

impl DisplayLoop {
    pub fn spawn(db: Database) -> Self {
        let (snapshot_tx, snapshot_rx) = watch::channel(DisplaySnapshot::default());
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let worker = tokio::spawn(async move {
            refresh_loop(db, snapshot_tx, token).await;
        });

        Self {
            snapshot_rx,
            cancel,
            worker: Some(worker),
        }
    }

    /// Watch channel carrying every published snapshot.
    pub fn subscribe(&self) -> watch::Receiver<DisplaySnapshot> {
        self.snapshot_rx.clone()
    }

    pub fn latest(&self) -> DisplaySnapshot {
        self.snapshot_rx.borrow().clone()
    }

    /// Cancel the refresh task and wait for it to finish.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(worker) = self.worker.take() {
            let _ = worker.await;
        }
    }
}

async fn refresh_loop(
    db: Database,
    snapshot_tx: watch::Sender<DisplaySnapshot>,
    cancel: CancellationToken,
) {
    let mut ticker = interval(REFRESH_PERIOD);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match db.load_timer_state().await {
                    Ok(state) => {
                        snapshot_tx.send_replace(DisplaySnapshot::from_state(&state));
                    }
                    Err(err) => error!("display refresh failed to read the store: {err:?}"),
                }
            }
            _ = cancel.cancelled() => {
                info!("display refresh loop shutting down");
                break;
            }
        }
    }
}
