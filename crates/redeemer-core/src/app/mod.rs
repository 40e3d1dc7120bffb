//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせて orchestrator のロジックを実装します。
//!
//! # 主要コンポーネント
//! - **OrchestratorBuilder**: 構築とワイヤリング
//! - **RunExecutor**: 1 回の run（start → worker 実行 → 抽出 → terminal イベント）
//! - **Scheduler**: one-shot / interval のループ
//! - **LifecycleController**: start / stop と状態の公開
//! - **Publisher**: イベントへの時刻付与と配送

pub mod builder;
pub mod config;
pub mod executor;
pub mod lifecycle;
pub mod publisher;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod testing;

// 主要な型を再エクスポート
pub use self::builder::{BuildError, OrchestratorBuilder};
pub use self::config::{
    Credential, DEFAULT_LOOP_BACKOFF, DEFAULT_OUTER_TIMEOUT, DEFAULT_PROCESS_TIMEOUT, Interval,
    MAX_INTERVAL_MINUTES, ScheduleConfig, Timeouts, WorkerConfig,
};
pub use self::executor::RunExecutor;
pub use self::lifecycle::LifecycleController;
pub use self::publisher::Publisher;
pub use self::scheduler::Scheduler;
