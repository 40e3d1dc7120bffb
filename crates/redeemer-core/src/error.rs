use thiserror::Error;

/// Configuration rejected before the schedule starts.
///
/// Always fatal: the host reports it as an `error` event and exits non-zero.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "Interval must be at least 1 minute and at most {max} minutes (got {0})",
        max = crate::app::config::MAX_INTERVAL_MINUTES
    )]
    InvalidInterval(u64),

    #[error("outer timeout ({outer:?}) must be greater than the process timeout ({process:?})")]
    InvalidTimeouts {
        process: std::time::Duration,
        outer: std::time::Duration,
    },

    #[error("Encrypted keys not configured. Run: npx tsx src/redeem.ts --setup")]
    KeysNotConfigured,

    #[error("Node.js is not installed or not in PATH")]
    NodeNotFound,

    #[error("Redemption script not found at {0}")]
    ScriptNotFound(String),

    #[error("no credential in {0} and no terminal to prompt on")]
    CredentialUnavailable(String),
}

impl ConfigError {
    /// Stable code for the `error` field of the event.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInterval(_) => "invalid_interval",
            Self::InvalidTimeouts { .. } => "invalid_timeouts",
            Self::KeysNotConfigured => "keys_not_configured",
            Self::NodeNotFound => "node_not_found",
            Self::ScriptNotFound(_) => "script_not_found",
            Self::CredentialUnavailable(_) => "credential_unavailable",
        }
    }
}

/// Failure to deliver an event.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("event sink write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("event serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("event sink closed")]
    Closed,
}

/// A failure inside the orchestrator itself, not attributable to the worker.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error(transparent)]
    Sink(#[from] SinkError),

    #[error("schedule is already running")]
    AlreadyRunning,

    #[error("schedule was stopped")]
    Stopped,

    #[error("next run time is out of range ({interval_minutes} minutes after {from})")]
    NextRunOutOfRange {
        from: chrono::DateTime<chrono::Utc>,
        interval_minutes: u64,
    },
}
