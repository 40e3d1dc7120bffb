//! State - スケジュールの状態
//!
//! # 状態遷移
//! - one-shot: Idle → Running → Terminated
//! - interval: Idle → Running → {Sleeping ⇄ Running} → Terminated
//!   （ループ内の失敗時は BackingOff を経由して Sleeping に戻る）

use chrono::{DateTime, Utc};
use serde::Serialize;

/// SchedulePhase はスケジューラが今どこにいるか
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulePhase {
    #[default]
    Idle,
    Running,
    Sleeping,
    BackingOff,
    Terminated,
}

impl SchedulePhase {
    /// The loop still owns the timeline in these phases; `stop()` waits them out.
    pub fn is_active(self) -> bool {
        matches!(self, Self::Running | Self::Sleeping | Self::BackingOff)
    }
}

/// Snapshot of the schedule, written only by the scheduler.
///
/// Invariant: `next_run_at` is `None` while a run is in flight.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScheduleState {
    pub phase: SchedulePhase,
    pub next_run_at: Option<DateTime<Utc>>,
    pub last_run_at: Option<DateTime<Utc>>,
    pub cancelled: bool,
    pub runs_completed: u64,
}

impl ScheduleState {
    pub(crate) fn begin_run(&mut self, now: DateTime<Utc>) {
        self.phase = SchedulePhase::Running;
        self.next_run_at = None;
        self.last_run_at = Some(now);
    }

    pub(crate) fn finish_run(&mut self) {
        self.runs_completed += 1;
    }

    pub(crate) fn sleep_until(&mut self, next_run_at: DateTime<Utc>) {
        self.phase = SchedulePhase::Sleeping;
        self.next_run_at = Some(next_run_at);
    }

    pub(crate) fn back_off(&mut self) {
        self.phase = SchedulePhase::BackingOff;
        self.next_run_at = None;
    }

    pub(crate) fn terminate(&mut self) {
        self.phase = SchedulePhase::Terminated;
        self.next_run_at = None;
    }
}
