//! OrchestratorBuilder - orchestrator の構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターンの実装
//! - 起動時検証（Fail-fast 設計）
//! - ports の差し替え（テストでは ScriptedRunner / ChannelSink を注入）

use std::sync::Arc;
use std::time::Duration;

use crate::app::config::{DEFAULT_LOOP_BACKOFF, ScheduleConfig, Timeouts, WorkerConfig};
use crate::app::executor::RunExecutor;
use crate::app::lifecycle::LifecycleController;
use crate::app::publisher::Publisher;
use crate::app::scheduler::Scheduler;
use crate::error::ConfigError;
use crate::impls::{LogScrapeParser, TokioProcessRunner};
use crate::ports::{Clock, EventSink, IdGenerator, MonotonicClock, OutputParser, ProcessRunner, UlidGenerator};

/// OrchestratorBuilder は LifecycleController を構築
///
/// # 使用例
/// ```ignore
/// let controller = OrchestratorBuilder::new(schedule, WorkerConfig::new(worker_dir))
///     .sink(Arc::new(JsonLinesSink::stdout()))
///     .build()?;
/// controller.start().await?;
/// ```
///
/// # Fail-fast 設計
/// - sink は必須（イベントの出し先がない orchestrator は作らない）
/// - build() 時に timeout の大小関係（outer > process）をチェック
pub struct OrchestratorBuilder {
    schedule: ScheduleConfig,
    worker: WorkerConfig,
    timeouts: Timeouts,
    loop_backoff: Duration,
    runner: Option<Arc<dyn ProcessRunner>>,
    parser: Option<Arc<dyn OutputParser>>,
    sink: Option<Arc<dyn EventSink>>,
    clock: Option<Arc<dyn Clock>>,
    ids: Option<Arc<dyn IdGenerator>>,
}

/// BuildError は構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("No event sink configured. Call .sink() before .build().")]
    MissingSink,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl OrchestratorBuilder {
    pub fn new(schedule: ScheduleConfig, worker: WorkerConfig) -> Self {
        Self {
            schedule,
            worker,
            timeouts: Timeouts::default(),
            loop_backoff: DEFAULT_LOOP_BACKOFF,
            runner: None,
            parser: None,
            sink: None,
            clock: None,
            ids: None,
        }
    }

    pub fn timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn loop_backoff(mut self, backoff: Duration) -> Self {
        self.loop_backoff = backoff;
        self
    }

    pub fn runner(mut self, runner: Arc<dyn ProcessRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn parser(mut self, parser: Arc<dyn OutputParser>) -> Self {
        self.parser = Some(parser);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// 検証してから LifecycleController を組み立てる
    ///
    /// 未指定の port は本番用の実装（TokioProcessRunner / LogScrapeParser /
    /// MonotonicClock / UlidGenerator）で埋める。
    pub fn build(self) -> Result<LifecycleController, BuildError> {
        let sink = self.sink.ok_or(BuildError::MissingSink)?;
        self.timeouts.validate()?;

        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(MonotonicClock::new()));
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(Arc::clone(&clock))));
        let runner = self
            .runner
            .unwrap_or_else(|| Arc::new(TokioProcessRunner::new()));
        let parser = self
            .parser
            .unwrap_or_else(|| Arc::new(LogScrapeParser::new()));

        let publisher = Publisher::new(clock, sink);
        let executor = RunExecutor::new(
            self.worker,
            self.timeouts,
            self.schedule.credential,
            runner,
            parser,
            ids,
            publisher.clone(),
        );
        let scheduler = Scheduler::new(
            executor,
            publisher.clone(),
            self.schedule.mode,
            self.schedule.interval,
            self.loop_backoff,
        );
        Ok(LifecycleController::new(scheduler, publisher))
    }
}
