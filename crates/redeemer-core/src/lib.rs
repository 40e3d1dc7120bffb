//! redeemer-core
//!
//! Orchestration for an external redemption worker: run it once or on an
//! interval, scrape its log output, and report every run as a structured event.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, mode, result, state, errors, events）
//! - **ports**: 抽象化レイヤー（ProcessRunner, OutputParser, EventSink, Clock, IdGenerator）
//! - **app**: アプリケーションロジック（builder, executor, scheduler, lifecycle）
//! - **impls**: 実装（TokioProcessRunner, LogScrapeParser, JsonLinesSink, ChannelSink）
//! - **error**: 設定・配送・orchestrator のエラー型

pub mod app;
pub mod domain;
pub mod error;
pub mod impls;
pub mod ports;

pub use crate::app::{LifecycleController, OrchestratorBuilder};
pub use crate::error::{ConfigError, OrchestratorError, SinkError};
