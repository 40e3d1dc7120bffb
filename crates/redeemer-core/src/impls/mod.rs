//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **TokioProcessRunner**: tokio::process による worker 実行
//! - **LogScrapeParser**: 正規表現による worker ログの抽出
//! - **JsonLinesSink**: 1 行 1 JSON のイベント出力
//! - **ChannelSink**: mpsc へのイベント出力

pub mod channel_sink;
pub mod json_lines_sink;
pub mod log_parser;
pub mod process;

// 主要な型を再エクスポート
pub use self::channel_sink::ChannelSink;
pub use self::json_lines_sink::JsonLinesSink;
pub use self::log_parser::LogScrapeParser;
pub use self::process::TokioProcessRunner;
