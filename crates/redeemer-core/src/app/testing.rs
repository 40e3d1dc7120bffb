//! Test doubles shared by the app-layer tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::mpsc;

use crate::domain::{Event, EventRecord};
use crate::error::SinkError;
use crate::impls::ChannelSink;
use crate::ports::{EventSink, ProcessOutput, ProcessRunner, WorkerInvocation};

/// A worker directory containing `src/redeem.ts`.
pub fn worker_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("src")).unwrap();
    std::fs::write(dir.path().join("src").join("redeem.ts"), "// worker").unwrap();
    dir
}

/// Replays canned outputs (the last one repeats) after an optional delay.
pub struct ScriptedRunner {
    outputs: Mutex<VecDeque<ProcessOutput>>,
    delay: Duration,
    calls: AtomicUsize,
    invocations: Mutex<Vec<WorkerInvocation>>,
}

impl ScriptedRunner {
    pub fn new(outputs: Vec<ProcessOutput>) -> Arc<Self> {
        Self::delayed(outputs, Duration::ZERO)
    }

    pub fn delayed(outputs: Vec<ProcessOutput>, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            outputs: Mutex::new(outputs.into()),
            delay,
            calls: AtomicUsize::new(0),
            invocations: Mutex::new(Vec::new()),
        })
    }

    pub fn ok(text: &str) -> Arc<Self> {
        Self::new(vec![ProcessOutput::exited(0, text.to_string())])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn invocations(&self) -> Vec<WorkerInvocation> {
        self.invocations.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProcessRunner for ScriptedRunner {
    async fn execute(&self, invocation: &WorkerInvocation) -> ProcessOutput {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.invocations.lock().unwrap().push(invocation.clone());
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let mut outputs = self.outputs.lock().unwrap();
        if outputs.len() > 1 {
            outputs.pop_front().unwrap()
        } else {
            outputs
                .front()
                .cloned()
                .unwrap_or_else(|| ProcessOutput::exited(0, String::new()))
        }
    }
}

/// Panics inside the runner task.
pub struct PanickingRunner;

#[async_trait]
impl ProcessRunner for PanickingRunner {
    async fn execute(&self, _invocation: &WorkerInvocation) -> ProcessOutput {
        panic!("runner exploded");
    }
}

/// Forwards to a channel, but fails the first `failures` emits of one event tag.
pub struct FlakySink {
    inner: ChannelSink,
    event: &'static str,
    failures: AtomicUsize,
}

impl FlakySink {
    pub fn new(event: &'static str, failures: usize) -> (Arc<Self>, mpsc::UnboundedReceiver<EventRecord>) {
        let (inner, rx) = ChannelSink::new();
        let sink = Arc::new(Self {
            inner,
            event,
            failures: AtomicUsize::new(failures),
        });
        (sink, rx)
    }
}

impl EventSink for FlakySink {
    fn emit(&self, record: &EventRecord) -> Result<(), SinkError> {
        if record.event.name() == self.event
            && self
                .failures
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok()
        {
            return Err(SinkError::Io(std::io::Error::other("disk full")));
        }
        self.inner.emit(record)
    }
}

/// Everything currently buffered in the channel.
pub fn drain(rx: &mut mpsc::UnboundedReceiver<EventRecord>) -> Vec<EventRecord> {
    let mut records = Vec::new();
    while let Ok(record) = rx.try_recv() {
        records.push(record);
    }
    records
}

pub fn names(records: &[EventRecord]) -> Vec<&'static str> {
    records.iter().map(|r| r.event.name()).collect()
}

/// Waits for the next record matching `pred`, skipping others.
pub async fn next_matching(
    rx: &mut mpsc::UnboundedReceiver<EventRecord>,
    pred: impl Fn(&Event) -> bool,
) -> EventRecord {
    loop {
        let record = rx.recv().await.expect("event channel closed");
        if pred(&record.event) {
            return record;
        }
    }
}
