//! ProcessRunner port - worker プロセスの 1 回の実行
//!
//! # 契約
//! - 必ず `ProcessOutput` を返す（timeout も spawn 失敗も「結果」であって error ではない）
//! - リトライはしない（リトライ方針は Scheduler の責務）

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;

/// Sentinel output for a worker killed by its own timeout.
pub const TIMED_OUT_OUTPUT: &str = "Script timed out";

/// One worker invocation: command line, environment, and time budget.
#[derive(Clone)]
pub struct WorkerInvocation {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    /// Variables added on top of the inherited environment.
    pub env: BTreeMap<String, String>,
    pub timeout: Duration,
}

// env には credential が入るので値は出さない
impl fmt::Debug for WorkerInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerInvocation")
            .field("program", &self.program)
            .field("args", &self.args)
            .field("working_dir", &self.working_dir)
            .field("env", &self.env.keys().collect::<Vec<_>>())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// What one invocation produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    /// stdout and stderr, interleaved on a best-effort basis.
    pub combined_output: String,
    /// Exit code, or `-1` when the process was killed, timed out, or never started.
    pub exit_code: i32,
    pub timed_out: bool,
}

impl ProcessOutput {
    pub fn exited(exit_code: i32, combined_output: String) -> Self {
        Self {
            combined_output,
            exit_code,
            timed_out: false,
        }
    }

    pub fn timed_out() -> Self {
        Self {
            combined_output: TIMED_OUT_OUTPUT.to_string(),
            exit_code: -1,
            timed_out: true,
        }
    }

    pub fn spawn_failed(description: impl fmt::Display) -> Self {
        Self {
            combined_output: description.to_string(),
            exit_code: -1,
            timed_out: false,
        }
    }
}

/// ProcessRunner は worker を 1 回実行して出力を捕捉する
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn execute(&self, invocation: &WorkerInvocation) -> ProcessOutput;
}
