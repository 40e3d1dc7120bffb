//! Errors - 実行失敗の分類
//!
//! worker に帰属する失敗（per-run で回復）と、ループ自体の失敗（backoff で回復）を
//! 区別するための分類です。

use serde::{Deserialize, Serialize};

/// RunErrorKind は `error` イベントの `error` フィールドになる分類
///
/// # 分類
/// - WorkerNotFound: worker artifact が存在しない（プロセスは起動しない）
/// - WorkerTimeout: 時間予算を超えた（プロセスは kill 済み）
/// - WorkerFailure: 非 0 で終了した
/// - Exception: runner タスク自体が panic した
/// - LoopError: worker に帰属しないループ内の失敗
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RunErrorKind {
    #[serde(rename = "script_not_found")]
    WorkerNotFound,
    #[serde(rename = "timeout")]
    WorkerTimeout,
    #[serde(rename = "script_failed")]
    WorkerFailure,
    #[serde(rename = "exception")]
    Exception,
    #[serde(rename = "loop_error")]
    LoopError,
}

impl RunErrorKind {
    /// Worker-attributable failures are reported per run and never trigger the loop backoff.
    pub fn is_worker_attributable(self) -> bool {
        !matches!(self, Self::LoopError)
    }
}
