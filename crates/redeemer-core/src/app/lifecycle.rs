//! LifecycleController - スケジュールの開始と停止
//!
//! # 状態遷移
//! - `start()`: Idle → (Scheduler が駆動) → Terminated
//! - `stop()`: cancel を通知し、Scheduler が active でなくなるまで待ってから `stopped` を出す
//!
//! `stop()` は sleep 中の待機を即座に打ち切る。実行中の run は打ち切らず、
//! その run の terminal イベントが出た後に返る。

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::app::publisher::Publisher;
use crate::app::scheduler::Scheduler;
use crate::domain::{Event, ScheduleState, SchedulePhase, StartedMode};
use crate::error::OrchestratorError;

pub struct LifecycleController {
    scheduler: Scheduler,
    publisher: Publisher,
    cancel: CancellationToken,
    state: watch::Sender<ScheduleState>,
    running: AtomicBool,
}

impl LifecycleController {
    pub(crate) fn new(scheduler: Scheduler, publisher: Publisher) -> Self {
        let (state, _) = watch::channel(ScheduleState::default());
        Self {
            scheduler,
            publisher,
            cancel: CancellationToken::new(),
            state,
            running: AtomicBool::new(false),
        }
    }

    /// Run the schedule to completion.
    ///
    /// One-shot schedules return after their single run; interval schedules return
    /// once [`stop`](Self::stop) is called.
    pub async fn start(&self) -> Result<(), OrchestratorError> {
        if self.cancel.is_cancelled() {
            return Err(OrchestratorError::Stopped);
        }
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(OrchestratorError::AlreadyRunning);
        }

        self.state.send_replace(ScheduleState {
            phase: SchedulePhase::Running,
            ..ScheduleState::default()
        });
        // Running を公開した後に見直す: これより前の stop() は Idle を見て `stopped` を出し終えている
        if self.cancel.is_cancelled() {
            self.state.send_modify(|s| {
                s.cancelled = true;
                s.terminate();
            });
            self.running.store(false, Ordering::SeqCst);
            return Err(OrchestratorError::Stopped);
        }

        let outcome = self.run_schedule().await;

        self.state.send_modify(ScheduleState::terminate);
        self.running.store(false, Ordering::SeqCst);
        outcome
    }

    async fn run_schedule(&self) -> Result<(), OrchestratorError> {
        let interval = self.scheduler.interval();
        let started = Event::Started {
            mode: if interval.is_some() {
                StartedMode::Continuous
            } else {
                StartedMode::Once
            },
            run_mode: self.scheduler.mode(),
            interval_minutes: interval.map(|i| i.minutes()),
        };
        self.publisher.publish(started)?;
        info!(mode = %self.scheduler.mode(), interval_minutes = ?interval.map(|i| i.minutes()), "schedule started");

        self.scheduler.run(&self.cancel, &self.state).await
    }

    /// Cancel the schedule and wait for the loop to wind down.
    ///
    /// Idempotent: only the first call emits `stopped`.
    pub async fn stop(&self) -> Result<(), OrchestratorError> {
        if self.cancel.is_cancelled() {
            return Ok(());
        }
        self.cancel.cancel();
        info!("stop requested");

        let mut rx = self.state.subscribe();
        // Sender は self が持っているので wait_for が Err になることはない
        let _ = rx.wait_for(|s| !s.phase.is_active()).await;

        self.state.send_modify(|s| {
            s.cancelled = true;
            s.terminate();
        });
        self.publisher.publish(Event::Stopped)?;
        info!("schedule stopped");
        Ok(())
    }

    /// A snapshot of the current schedule state.
    pub fn state(&self) -> ScheduleState {
        self.state.borrow().clone()
    }

    /// Watch the schedule state as it changes.
    pub fn subscribe(&self) -> watch::Receiver<ScheduleState> {
        self.state.subscribe()
    }

    /// The publisher shared with the schedule, for host-level events.
    pub fn publisher(&self) -> &Publisher {
        &self.publisher
    }
}
