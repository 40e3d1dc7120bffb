//! JsonLinesSink - 1 イベント 1 行の JSON を Write に書き出す
//!
//! CLI では stdout に向けます。ログ（tracing）は stderr なので混ざりません。

use std::io::Write;
use std::sync::Mutex;

use crate::domain::EventRecord;
use crate::error::SinkError;
use crate::ports::EventSink;

/// Writes each record as one JSON object followed by `\n`, flushing after every line.
///
/// The mutex keeps lines whole when several components share the sink.
pub struct JsonLinesSink<W> {
    writer: Mutex<W>,
}

impl<W: Write + Send> JsonLinesSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl JsonLinesSink<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }
}

impl<W: Write + Send> EventSink for JsonLinesSink<W> {
    fn emit(&self, record: &EventRecord) -> Result<(), SinkError> {
        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut writer = self
            .writer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        writer.write_all(&line)?;
        writer.flush()?;
        Ok(())
    }
}
