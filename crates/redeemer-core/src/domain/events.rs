//! Events - 外部に見える唯一の出力
//!
//! すべての状態遷移と run の結果は、1 本のタイムライン上に時系列順で
//! 1 つずつ `Event` として出力されます。
//!
//! # ワイヤ形式
//! `EventRecord` が 1 行の JSON オブジェクトになります:
//! ```text
//! {"timestamp":"2025-01-01T00:00:00Z","event":"start","run_id":"run-01H...","mode":"redeem"}
//! ```
//! `event` タグ: started / scheduled / start / result / error / stopped / interrupted / cancelled

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::errors::RunErrorKind;
use super::ids::RunId;
use super::mode::RunMode;
use super::result::RunResult;

/// How the schedule was started: a single pass or a loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartedMode {
    Once,
    Continuous,
}

/// Payload of a failure event.
///
/// Per-run failures carry the `run_id` and `mode` of the run; loop-level failures
/// carry neither.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<RunId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<RunMode>,
    pub error: RunErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

impl RunError {
    /// Build the failure payload for a run, or `None` if the run succeeded.
    pub fn from_result(result: &RunResult) -> Option<Self> {
        let kind = result.failure?;
        let raw = result.raw_output.trim();
        let message = match kind {
            RunErrorKind::WorkerNotFound => raw.to_string(),
            RunErrorKind::WorkerTimeout => "Redemption script timed out".to_string(),
            RunErrorKind::WorkerFailure => {
                format!("Redemption script exited with code {}", result.exit_code)
            }
            RunErrorKind::Exception | RunErrorKind::LoopError => raw.to_string(),
        };
        // 診断用に worker の出力全体を添える（not-found は出力がない）
        let raw_output = match kind {
            RunErrorKind::WorkerFailure | RunErrorKind::WorkerTimeout => Some(raw.to_string()),
            _ => None,
        };

        Some(Self {
            run_id: Some(result.run_id),
            mode: Some(result.mode),
            error: kind,
            message,
            exit_code: Some(result.exit_code),
            raw_output,
        })
    }

    pub fn loop_error(message: impl Into<String>) -> Self {
        Self {
            run_id: None,
            mode: None,
            error: RunErrorKind::LoopError,
            message: message.into(),
            exit_code: None,
            raw_output: None,
        }
    }
}

/// An externally observable event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Event {
    /// The schedule started.
    Started {
        mode: StartedMode,
        run_mode: RunMode,
        #[serde(skip_serializing_if = "Option::is_none")]
        interval_minutes: Option<u64>,
    },

    /// The next run was scheduled.
    Scheduled {
        next_run: DateTime<Utc>,
        interval_minutes: u64,
    },

    /// A run is about to invoke the worker.
    #[serde(rename = "start")]
    RunStarted { run_id: RunId, mode: RunMode },

    /// A run finished successfully.
    #[serde(rename = "result")]
    RunResult(RunResult),

    /// A run (or the loop itself) failed.
    #[serde(rename = "error")]
    RunError(RunError),

    /// Configuration was rejected before the schedule could start.
    #[serde(rename = "error")]
    ConfigError { error: String, message: String },

    /// The schedule was stopped.
    Stopped,

    /// The host received a termination signal.
    Interrupted,

    /// The operator aborted interactive input.
    Cancelled,
}

impl Event {
    /// The single terminal event for a finished run.
    pub fn terminal(result: &RunResult) -> Self {
        match RunError::from_result(result) {
            Some(error) => Self::RunError(error),
            None => Self::RunResult(result.clone()),
        }
    }

    pub fn is_run_terminal(&self) -> bool {
        match self {
            Self::RunResult(_) => true,
            Self::RunError(error) => error.error.is_worker_attributable(),
            _ => false,
        }
    }

    /// The `event` tag this variant serializes with.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Started { .. } => "started",
            Self::Scheduled { .. } => "scheduled",
            Self::RunStarted { .. } => "start",
            Self::RunResult(_) => "result",
            Self::RunError(_) | Self::ConfigError { .. } => "error",
            Self::Stopped => "stopped",
            Self::Interrupted => "interrupted",
            Self::Cancelled => "cancelled",
        }
    }
}

/// An event stamped with the time it was emitted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventRecord {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: Event,
}

impl EventRecord {
    pub fn new(timestamp: DateTime<Utc>, event: Event) -> Self {
        Self { timestamp, event }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ParsedOutput;
    use chrono::TimeZone;
    use ulid::Ulid;

    fn at_noon() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn record_flattens_event_tag_next_to_timestamp() {
        let record = EventRecord::new(at_noon(), Event::Stopped);
        let v = serde_json::to_value(&record).unwrap();
        assert_eq!(v["event"], "stopped");
        assert!(v["timestamp"].as_str().unwrap().starts_with("2025-01-01T12:00:00"));
    }

    #[test]
    fn run_started_is_tagged_start() {
        let run_id = RunId::from_ulid(Ulid::new());
        let record = EventRecord::new(
            at_noon(),
            Event::RunStarted {
                run_id,
                mode: RunMode::CheckOnly,
            },
        );
        let v = serde_json::to_value(&record).unwrap();
        assert_eq!(v["event"], "start");
        assert_eq!(v["mode"], "check");
        assert_eq!(v["run_id"], run_id.to_string());
    }

    #[test]
    fn terminal_event_for_success_is_result() {
        let result = RunResult::completed(
            RunId::from_ulid(Ulid::new()),
            RunMode::Redeem,
            0,
            ParsedOutput::default(),
            String::new(),
        );
        let event = Event::terminal(&result);
        assert_eq!(event.name(), "result");
        assert!(event.is_run_terminal());
    }

    #[test]
    fn terminal_event_for_failure_carries_raw_output() {
        let result = RunResult::completed(
            RunId::from_ulid(Ulid::new()),
            RunMode::Redeem,
            2,
            ParsedOutput::default(),
            "  Error: RPC unavailable\n".to_string(),
        );
        let Event::RunError(error) = Event::terminal(&result) else {
            panic!("expected error event");
        };
        assert_eq!(error.error, RunErrorKind::WorkerFailure);
        assert_eq!(error.exit_code, Some(2));
        assert_eq!(error.raw_output.as_deref(), Some("Error: RPC unavailable"));

        let v = serde_json::to_value(Event::RunError(error)).unwrap();
        assert_eq!(v["event"], "error");
        assert_eq!(v["error"], "script_failed");
    }

    #[test]
    fn loop_error_is_not_a_run_terminal() {
        let event = Event::RunError(RunError::loop_error("sink closed"));
        assert!(!event.is_run_terminal());
        let v = serde_json::to_value(&event).unwrap();
        assert_eq!(v["error"], "loop_error");
        assert!(v.get("run_id").is_none());
    }

    #[test]
    fn scheduled_serializes_next_run_as_rfc3339() {
        let event = Event::Scheduled {
            next_run: at_noon(),
            interval_minutes: 15,
        };
        let v = serde_json::to_value(&event).unwrap();
        assert_eq!(v["event"], "scheduled");
        assert_eq!(v["interval_minutes"], 15);
        assert!(v["next_run"].as_str().unwrap().starts_with("2025-01-01T12:00:00"));
    }
}
