//! Scheduler - one-shot / interval の実行ループ
//!
//! # フロー（interval）
//! 1. 直ちに 1 回実行
//! 2. next_run = now + interval を `scheduled` として公開
//! 3. interval だけ待つ（cancel で即座に起床）
//! 4. 1 に戻る
//!
//! ループ内で orchestrator の失敗（イベント配送失敗など）が起きた場合は
//! loop_error を報告し、loop_backoff だけ待ってから 2 に戻る。
//! run は直列で、前の run が終わるまで次は始まらない。

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::app::config::Interval;
use crate::app::executor::RunExecutor;
use crate::app::publisher::Publisher;
use crate::domain::{Event, RunError, RunMode, ScheduleState};
use crate::error::OrchestratorError;
use crate::ports::Clock;

enum Wake {
    Elapsed,
    Cancelled,
}

pub struct Scheduler {
    executor: RunExecutor,
    publisher: Publisher,
    clock: Arc<dyn Clock>,
    mode: RunMode,
    interval: Option<Interval>,
    loop_backoff: Duration,
}

impl Scheduler {
    pub fn new(
        executor: RunExecutor,
        publisher: Publisher,
        mode: RunMode,
        interval: Option<Interval>,
        loop_backoff: Duration,
    ) -> Self {
        let clock = Arc::clone(publisher.clock());
        Self {
            executor,
            publisher,
            clock,
            mode,
            interval,
            loop_backoff,
        }
    }

    pub fn mode(&self) -> RunMode {
        self.mode
    }

    pub fn interval(&self) -> Option<Interval> {
        self.interval
    }

    /// Drive the schedule until it completes (one-shot) or `cancel` fires.
    ///
    /// Only the one-shot path can return `Err`; the interval loop absorbs its own
    /// failures and keeps going.
    pub async fn run(
        &self,
        cancel: &CancellationToken,
        state: &watch::Sender<ScheduleState>,
    ) -> Result<(), OrchestratorError> {
        let outcome = match self.interval {
            None => self.run_single(state).await,
            Some(interval) => {
                self.run_forever(interval, cancel, state).await;
                Ok(())
            }
        };
        state.send_modify(ScheduleState::terminate);
        outcome
    }

    async fn run_single(&self, state: &watch::Sender<ScheduleState>) -> Result<(), OrchestratorError> {
        if let Err(err) = self.run_and_record(state).await {
            self.report_loop_error(&err);
            return Err(err);
        }
        Ok(())
    }

    async fn run_forever(
        &self,
        interval: Interval,
        cancel: &CancellationToken,
        state: &watch::Sender<ScheduleState>,
    ) {
        let mut run_due = true;
        while !cancel.is_cancelled() {
            match self.cycle(run_due, interval, cancel, state).await {
                Ok(Wake::Elapsed) => run_due = true,
                Ok(Wake::Cancelled) => break,
                Err(err) => {
                    self.report_loop_error(&err);
                    state.send_modify(ScheduleState::back_off);
                    warn!(backoff_secs = self.loop_backoff.as_secs(), "loop backing off");
                    if let Wake::Cancelled = self.pause(self.loop_backoff, cancel).await {
                        break;
                    }
                    // 次の周期は schedule から再開する（即時実行はしない）
                    run_due = false;
                }
            }
        }
        debug!("schedule loop exited");
    }

    async fn cycle(
        &self,
        run_due: bool,
        interval: Interval,
        cancel: &CancellationToken,
        state: &watch::Sender<ScheduleState>,
    ) -> Result<Wake, OrchestratorError> {
        if run_due {
            self.run_and_record(state).await?;
        }
        if cancel.is_cancelled() {
            return Ok(Wake::Cancelled);
        }

        let now = self.clock.now();
        let next_run = now.checked_add_signed(interval.as_delta()).ok_or(
            OrchestratorError::NextRunOutOfRange {
                from: now,
                interval_minutes: interval.minutes(),
            },
        )?;
        state.send_modify(|s| s.sleep_until(next_run));
        self.publisher.publish(Event::Scheduled {
            next_run,
            interval_minutes: interval.minutes(),
        })?;
        info!(%next_run, "next run scheduled");

        Ok(self.pause(interval.as_duration(), cancel).await)
    }

    async fn run_and_record(&self, state: &watch::Sender<ScheduleState>) -> Result<(), OrchestratorError> {
        let now = self.clock.now();
        state.send_modify(|s| s.begin_run(now));
        self.executor.run_once(self.mode).await?;
        state.send_modify(ScheduleState::finish_run);
        Ok(())
    }

    async fn pause(&self, duration: Duration, cancel: &CancellationToken) -> Wake {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Wake::Cancelled,
            _ = tokio::time::sleep(duration) => Wake::Elapsed,
        }
    }

    fn report_loop_error(&self, err: &OrchestratorError) {
        error!(error = %err, "schedule loop error");
        if let Err(sink_err) = self.publisher.publish(Event::RunError(RunError::loop_error(err.to_string()))) {
            error!(error = %sink_err, "failed to report loop error");
        }
    }
}
