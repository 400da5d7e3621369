//! The countdown engine: owns the 100ms tick, start/stop transitions and the
//! per-tick project bookkeeping. The engine holds no authoritative copy of
//! the timer state; every operation re-reads the store first and writes its
//! result back, so concurrent display instances are never more than one
//! refresh cycle behind.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::Result;
use log::{error, info, warn};
use tokio::{sync::Mutex, task::JoinHandle, time};

use crate::{
    clock,
    model::{TimerState, NEUTRAL},
    store::Database,
};

/// One tick per tenth-second of wall clock.
pub const TICK_PERIOD: Duration = Duration::from_millis(100);

/// Seconds credited to the active project's accumulated total on every
/// running tick.
const ACCUMULATED_STEP_SECONDS: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
    /// remaining is 0; there is nothing to count down.
    NothingToCount,
    /// "Neutral" is selected; starting is refused with a user-facing warning.
    NeutralBlocked,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Ticked(i64),
    Expired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    Applied,
    NeutralBlocked,
}

#[derive(Clone)]
pub struct CountdownController {
    db: Database,
    running: Arc<AtomicBool>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl CountdownController {
    pub fn new(db: Database) -> Self {
        Self {
            db,
            running: Arc::new(AtomicBool::new(false)),
            ticker: Arc::new(Mutex::new(None)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Begin counting down. Refused while already running, with nothing on
    /// the clock, or while "Neutral" is selected.
    pub async fn start(&self) -> Result<StartOutcome> {
        if self.is_running() {
            return Ok(StartOutcome::AlreadyRunning);
        }

        let state = self.db.load_timer_state().await?;
        if state.remaining_tenths <= 0 {
            return Ok(StartOutcome::NothingToCount);
        }
        if state.is_neutral() {
            warn!("select a project before starting the countdown");
            return Ok(StartOutcome::NeutralBlocked);
        }

        self.running.store(true, Ordering::SeqCst);
        self.db.save_running(true).await?;
        self.spawn_ticker().await;
        info!(
            "countdown started at {} for '{}'",
            clock::to_clock(state.remaining_tenths),
            state.selected_project
        );
        Ok(StartOutcome::Started)
    }

    /// Cancel the tick source and record the stop. Idempotent.
    pub async fn stop(&self) -> Result<()> {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
        self.db.save_running(false).await?;
        Ok(())
    }

    /// Play/pause: stop when running, start otherwise. Returns whether the
    /// engine is running afterwards.
    pub async fn toggle(&self) -> Result<bool> {
        if self.is_running() {
            self.stop().await?;
            Ok(false)
        } else {
            Ok(self.start().await? == StartOutcome::Started)
        }
    }

    /// Abort the ticker task without recording a stop in the store. Used at
    /// page shutdown, where the persisted running flag is written separately.
    pub async fn abort_ticker(&self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.ticker.lock().await.take() {
            handle.abort();
        }
    }

    /// One tick of the countdown; the ticker task calls this every 100ms.
    /// While time remains: decrement by a tenth, book the tick against the
    /// active project, persist. A tick that fires with 0 on the clock stops
    /// the engine instead of decrementing below zero.
    pub async fn tick_once(&self) -> Result<TickOutcome> {
        let mut state = self.db.load_timer_state().await?;

        if state.remaining_tenths > 0 {
            state.remaining_tenths -= 1;
            self.record_tick(&state).await?;
            self.db
                .save_times(state.remaining_tenths, state.total_tenths)
                .await?;
            Ok(TickOutcome::Ticked(state.remaining_tenths))
        } else {
            self.running.store(false, Ordering::SeqCst);
            self.db.save_running(false).await?;
            info!("countdown expired");
            Ok(TickOutcome::Expired)
        }
    }

    /// Per-tick bookkeeping for the active project: the open-session elapsed
    /// counter is rewritten from the fresh remaining/total pair, and while
    /// running a flat 0.1s lands on the accumulated total as well. The
    /// current tick is therefore counted in both values; that double-count is
    /// long-standing behaviour and is kept on purpose.
    async fn record_tick(&self, state: &TimerState) -> Result<()> {
        if state.is_neutral() || state.total_tenths <= 0 {
            return Ok(());
        }

        let elapsed = state.total_tenths - state.remaining_tenths;
        self.db.save_elapsed(&state.selected_project, elapsed).await?;

        if state.is_running {
            let accumulator = self.db.load_accumulator(&state.selected_project).await?;
            self.db
                .save_accumulated(
                    &state.selected_project,
                    accumulator.accumulated_total + ACCUMULATED_STEP_SECONDS,
                )
                .await?;
        }
        Ok(())
    }

    /// Apply a signed delta (a change-time button) to both remaining and
    /// total. Each is floored at 0, then remaining is re-clamped to total.
    /// Works whether or not the countdown is running.
    pub async fn apply_change(&self, delta_tenths: i64) -> Result<ChangeOutcome> {
        let mut state = self.db.load_timer_state().await?;
        if state.is_neutral() {
            warn!("select a project before changing the time");
            return Ok(ChangeOutcome::NeutralBlocked);
        }

        state.remaining_tenths = (state.remaining_tenths + delta_tenths).max(0);
        state.total_tenths = (state.total_tenths + delta_tenths).max(0);
        state.clamp_remaining();

        self.db
            .save_times(state.remaining_tenths, state.total_tenths)
            .await?;
        Ok(ChangeOutcome::Applied)
    }

    /// Set total and remaining to the same value unconditionally. This is
    /// the predefined-duration buttons and the minutes/seconds inputs; no
    /// project needs to be selected.
    pub async fn set_total(&self, tenths: i64) -> Result<()> {
        self.db.save_times(tenths, tenths).await
    }

    /// Fine adjustment of remaining only (the +/-5s controls), clamped to
    /// `[0, total]`. Refused while "Neutral" is selected.
    pub async fn nudge_remaining(&self, delta_tenths: i64) -> Result<ChangeOutcome> {
        let mut state = self.db.load_timer_state().await?;
        if state.is_neutral() {
            warn!("select a project before adjusting the remaining time");
            return Ok(ChangeOutcome::NeutralBlocked);
        }

        state.remaining_tenths =
            (state.remaining_tenths + delta_tenths).clamp(0, state.total_tenths.max(0));
        self.db
            .save_times(state.remaining_tenths, state.total_tenths)
            .await?;
        Ok(ChangeOutcome::Applied)
    }

    /// Change the selected project. Open elapsed time on the previous
    /// project is folded into its accumulated total (the stored value is
    /// added as-is, matching the original bookkeeping) and its elapsed
    /// counter is cleared.
    pub async fn select_project(&self, project: &str) -> Result<()> {
        let previous = self.db.load_selected_project().await?;
        if previous != NEUTRAL && previous != project {
            let accumulator = self.db.load_accumulator(&previous).await?;
            if accumulator.elapsed_tenths > 0 {
                self.db
                    .save_accumulated(
                        &previous,
                        accumulator.accumulated_total + accumulator.elapsed_tenths as f64,
                    )
                    .await?;
            }
            self.db.delete_elapsed(&previous).await?;
        }

        self.db.save_selected_project(project).await?;
        info!("selected project '{project}'");
        Ok(())
    }

    async fn spawn_ticker(&self) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let controller = self.clone();
        let handle = tokio::spawn(async move {
            let mut interval = time::interval(TICK_PERIOD);
            interval.set_missed_tick_behavior(time::MissedTickBehavior::Delay);
            // the first interval tick completes immediately; the first
            // decrement belongs a full period after start
            interval.tick().await;
            loop {
                interval.tick().await;

                if !controller.running.load(Ordering::SeqCst) {
                    break;
                }

                match controller.tick_once().await {
                    Ok(TickOutcome::Ticked(_)) => {}
                    Ok(TickOutcome::Expired) => break,
                    Err(err) => {
                        error!("tick failed: {err:?}");
                    }
                }
            }
        });

        *ticker_guard = Some(handle);
    }
}
