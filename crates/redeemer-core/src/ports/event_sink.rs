//! EventSink port - イベント出力の抽象化
//!
//! # 実装
//! - JsonLinesSink: 1 イベント 1 行の JSON（CLI では stdout）
//! - ChannelSink: tokio の mpsc に流す（supervisor 埋め込み・テスト用）

use crate::domain::EventRecord;
use crate::error::SinkError;

/// EventSink は時刻付きイベントを 1 本のチャネルに出力
///
/// # 設計原則
/// - 同期 API: 呼び出し順がそのまま出力順になる
/// - 失敗は `SinkError` で返す（worker の失敗ではなく orchestrator の失敗）
pub trait EventSink: Send + Sync {
    fn emit(&self, record: &EventRecord) -> Result<(), SinkError>;
}
