//! ChannelSink - イベントを tokio の mpsc に流す
//!
//! supervisor に埋め込む場合や、テストで順序を検証する場合に使います。

use tokio::sync::mpsc;

use crate::domain::EventRecord;
use crate::error::SinkError;
use crate::ports::EventSink;

pub struct ChannelSink {
    tx: mpsc::UnboundedSender<EventRecord>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<EventRecord>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, record: &EventRecord) -> Result<(), SinkError> {
        self.tx.send(record.clone()).map_err(|_| SinkError::Closed)
    }
}
