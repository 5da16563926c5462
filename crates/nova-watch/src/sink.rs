//! Output side of a watch session.
//!
//! Callbacks run concurrently on application threads, so every sink must serialize its
//! writes. [`SerializedSink`] does that with a mutex around a single-threaded
//! [`RecordWriter`]; [`ChannelSink`] hands events to a single consumer through a queue.

use std::io;

use nova_config::WATCH_TARGET;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::record::WatchRecord;

pub trait OutputSink: Send + Sync {
    fn record(&self, record: WatchRecord);
    fn echo(&self, text: &str);
    /// Ends the session with the given exit status.
    fn abort(&self, status: i32, message: &str);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SinkEvent {
    Record(WatchRecord),
    Echo { text: String },
    Abort { status: i32, message: String },
}

impl SinkEvent {
    pub fn as_record(&self) -> Option<&WatchRecord> {
        match self {
            Self::Record(record) => Some(record),
            _ => None,
        }
    }
}

/// Single-threaded event writer. Wrap in [`SerializedSink`] to share across threads.
pub trait RecordWriter: Send {
    fn write_event(&mut self, event: SinkEvent);
}

impl RecordWriter for Vec<SinkEvent> {
    fn write_event(&mut self, event: SinkEvent) {
        self.push(event);
    }
}

#[derive(Debug, Default)]
pub struct SerializedSink<W> {
    inner: Mutex<W>,
}

impl<W: RecordWriter> SerializedSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            inner: Mutex::new(writer),
        }
    }

    pub fn with_writer<R>(&self, f: impl FnOnce(&mut W) -> R) -> R {
        f(&mut self.inner.lock())
    }

    pub fn into_inner(self) -> W {
        self.inner.into_inner()
    }
}

impl<W: RecordWriter> OutputSink for SerializedSink<W> {
    fn record(&self, record: WatchRecord) {
        self.inner.lock().write_event(SinkEvent::Record(record));
    }

    fn echo(&self, text: &str) {
        self.inner.lock().write_event(SinkEvent::Echo {
            text: text.to_owned(),
        });
    }

    fn abort(&self, status: i32, message: &str) {
        self.inner.lock().write_event(SinkEvent::Abort {
            status,
            message: message.to_owned(),
        });
    }
}

/// In-memory sink, mostly for tests and embedding.
pub type CollectingSink = SerializedSink<Vec<SinkEvent>>;

impl SerializedSink<Vec<SinkEvent>> {
    pub fn collecting() -> Self {
        Self::new(Vec::new())
    }

    pub fn events(&self) -> Vec<SinkEvent> {
        self.inner.lock().clone()
    }

    pub fn records(&self) -> Vec<WatchRecord> {
        self.inner
            .lock()
            .iter()
            .filter_map(SinkEvent::as_record)
            .cloned()
            .collect()
    }
}

/// Writes one JSON object per event.
pub struct JsonLinesWriter<W> {
    out: W,
}

impl<W: io::Write + Send> JsonLinesWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_line(&mut self, event: &SinkEvent) -> io::Result<()> {
        serde_json::to_writer(&mut self.out, event)?;
        self.out.write_all(b"\n")?;
        self.out.flush()
    }
}

impl<W: io::Write + Send> RecordWriter for JsonLinesWriter<W> {
    fn write_event(&mut self, event: SinkEvent) {
        if let Err(err) = self.write_line(&event) {
            tracing::warn!(target: WATCH_TARGET, error = %err, "failed to write watch event");
        }
    }
}

/// Forwards events to an async consumer.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<SinkEvent>,
}

impl ChannelSink {
    pub fn unbounded() -> (Self, mpsc::UnboundedReceiver<SinkEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: SinkEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!(target: WATCH_TARGET, "watch event receiver dropped");
        }
    }
}

impl OutputSink for ChannelSink {
    fn record(&self, record: WatchRecord) {
        self.send(SinkEvent::Record(record));
    }

    fn echo(&self, text: &str) {
        self.send(SinkEvent::Echo {
            text: text.to_owned(),
        });
    }

    fn abort(&self, status: i32, message: &str) {
        self.send(SinkEvent::Abort {
            status,
            message: message.to_owned(),
        });
    }
}
