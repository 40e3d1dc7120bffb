//! Config - orchestrator に渡す明示的な設定値
//!
//! スクリプトのパスや credential をグローバルに探しに行かず、
//! すべて構築時に値として渡します。

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use chrono::TimeDelta;

use crate::domain::RunMode;
use crate::error::ConfigError;
use crate::ports::WorkerInvocation;

/// Default budget for the worker process itself.
pub const DEFAULT_PROCESS_TIMEOUT: Duration = Duration::from_secs(115);
/// Default budget for the whole run, strictly above the process budget.
pub const DEFAULT_OUTER_TIMEOUT: Duration = Duration::from_secs(120);
/// Pause after an orchestrator failure before the loop resumes.
pub const DEFAULT_LOOP_BACKOFF: Duration = Duration::from_secs(60);

/// Longest accepted interval (100 years), so `now + interval` stays within chrono's range.
pub const MAX_INTERVAL_MINUTES: u64 = 100 * 365 * 24 * 60;

/// Time between scheduled runs, between one minute and [`MAX_INTERVAL_MINUTES`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interval {
    minutes: u64,
    delta: TimeDelta,
}

impl Interval {
    pub fn from_minutes(minutes: u64) -> Result<Self, ConfigError> {
        if !(1..=MAX_INTERVAL_MINUTES).contains(&minutes) {
            return Err(ConfigError::InvalidInterval(minutes));
        }
        let delta = i64::try_from(minutes)
            .ok()
            .and_then(TimeDelta::try_minutes)
            .ok_or(ConfigError::InvalidInterval(minutes))?;
        Ok(Self { minutes, delta })
    }

    pub fn minutes(&self) -> u64 {
        self.minutes
    }

    pub fn as_delta(&self) -> TimeDelta {
        self.delta
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(self.delta.num_seconds().unsigned_abs())
    }
}

/// Secret handed to the worker through its environment.
///
/// Never printed: `Debug` is redacted and there is no `Display` or `Serialize`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// What to run and how often.
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub mode: RunMode,
    /// `None` runs exactly once.
    pub interval: Option<Interval>,
    pub credential: Option<Credential>,
}

impl ScheduleConfig {
    pub fn once(mode: RunMode) -> Self {
        Self {
            mode,
            interval: None,
            credential: None,
        }
    }

    pub fn every(mode: RunMode, interval: Interval) -> Self {
        Self {
            mode,
            interval: Some(interval),
            credential: None,
        }
    }

    pub fn with_credential(mut self, credential: Credential) -> Self {
        self.credential = (!credential.is_empty()).then_some(credential);
        self
    }
}

/// Time budgets for one run.
///
/// The outer budget must exceed the process budget so the caller always gets a
/// definitive answer from the runner before giving up on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub process: Duration,
    pub outer: Duration,
}

impl Timeouts {
    pub fn new(process: Duration, outer: Duration) -> Result<Self, ConfigError> {
        let timeouts = Self { process, outer };
        timeouts.validate()?;
        Ok(timeouts)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.outer <= self.process {
            return Err(ConfigError::InvalidTimeouts {
                process: self.process,
                outer: self.outer,
            });
        }
        Ok(())
    }
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            process: DEFAULT_PROCESS_TIMEOUT,
            outer: DEFAULT_OUTER_TIMEOUT,
        }
    }
}

/// How to launch the worker.
///
/// Defaults to `npx tsx src/redeem.ts [--check]` run from `working_dir`, with the
/// credential in `REDEEM_PASSWORD`.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub working_dir: PathBuf,
    /// Worker entry point, relative to `working_dir`.
    pub script: PathBuf,
    pub program: String,
    pub program_args: Vec<String>,
    pub check_flag: String,
    pub credential_env: String,
}

impl WorkerConfig {
    pub fn new(working_dir: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: working_dir.into(),
            script: PathBuf::from("src").join("redeem.ts"),
            program: "npx".to_string(),
            program_args: vec!["tsx".to_string()],
            check_flag: "--check".to_string(),
            credential_env: "REDEEM_PASSWORD".to_string(),
        }
    }

    pub fn with_program(mut self, program: impl Into<String>, program_args: Vec<String>) -> Self {
        self.program = program.into();
        self.program_args = program_args;
        self
    }

    /// Absolute location of the worker entry point.
    pub fn script_path(&self) -> PathBuf {
        self.working_dir.join(&self.script)
    }

    pub fn args_for(&self, mode: RunMode) -> Vec<String> {
        let mut args = self.program_args.clone();
        args.push(self.script.to_string_lossy().replace('\\', "/"));
        if mode.is_check_only() {
            args.push(self.check_flag.clone());
        }
        args
    }

    pub fn invocation(
        &self,
        mode: RunMode,
        credential: Option<&Credential>,
        timeout: Duration,
    ) -> WorkerInvocation {
        let mut env = BTreeMap::new();
        if let Some(credential) = credential {
            env.insert(self.credential_env.clone(), credential.expose().to_string());
        }
        WorkerInvocation {
            program: self.program.clone(),
            args: self.args_for(mode),
            working_dir: self.working_dir.clone(),
            env,
            timeout,
        }
    }
}
