//! Publisher - イベントに時刻を付けて sink に配送
//!
//! # フロー
//! 1. Clock::now() で timestamp を決める
//! 2. EventRecord に包む
//! 3. EventSink::emit() で出力
//!
//! executor / scheduler / lifecycle / CLI が同じ Publisher（同じ sink）を共有するので、
//! イベントは 1 本のタイムライン上に並ぶ。

use std::sync::Arc;

use crate::domain::{Event, EventRecord};
use crate::error::SinkError;
use crate::ports::{Clock, EventSink};

#[derive(Clone)]
pub struct Publisher {
    clock: Arc<dyn Clock>,
    sink: Arc<dyn EventSink>,
}

impl Publisher {
    pub fn new(clock: Arc<dyn Clock>, sink: Arc<dyn EventSink>) -> Self {
        Self { clock, sink }
    }

    pub fn publish(&self, event: Event) -> Result<(), SinkError> {
        let record = EventRecord::new(self.clock.now(), event);
        self.sink.emit(&record)
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }
}
