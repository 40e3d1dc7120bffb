//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! 外部プロセス・出力チャネル・時計への依存を trait の裏に隠し、
//! app 層（executor / scheduler / lifecycle）をテスト可能に保ちます。

pub mod clock;
pub mod event_sink;
pub mod id_generator;
pub mod output_parser;
pub mod process;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, MonotonicClock};
pub use self::event_sink::EventSink;
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::output_parser::OutputParser;
pub use self::process::{ProcessOutput, ProcessRunner, TIMED_OUT_OUTPUT, WorkerInvocation};
