// Test doubles for the link seams
use crate::application::link_error::LinkError;
use crate::application::link_transport::{ByteSink, ChunkSource, LinkChannels, LinkTransport};
use crate::application::status_sink::StatusSink;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub type ChunkFeed = mpsc::UnboundedSender<Result<Bytes, LinkError>>;

#[derive(Debug, Default)]
pub struct RecordingStatus {
    lines: Mutex<Vec<String>>,
}

impl RecordingStatus {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().unwrap().clone()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }
}

impl StatusSink for RecordingStatus {
    fn publish(&self, status: String) {
        self.lines.lock().unwrap().push(status);
    }
}

pub struct ChannelSource {
    rx: mpsc::UnboundedReceiver<Result<Bytes, LinkError>>,
    closed: Arc<AtomicUsize>,
}

#[async_trait]
impl ChunkSource for ChannelSource {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, LinkError> {
        match self.rx.recv().await {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(err)) => Err(err),
            None => Ok(None),
        }
    }

    async fn close(&mut self) {
        self.rx.close();
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Clone, Default)]
pub struct RecordingSink {
    writes: Arc<Mutex<Vec<Vec<u8>>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingSink {
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.writes.lock().unwrap().clone()
    }

    pub fn fail_writes(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl ByteSink for RecordingSink {
    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(LinkError::Transport(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "pad controller unplugged",
            )));
        }
        self.writes.lock().unwrap().push(bytes.to_vec());
        Ok(())
    }
}

/// Hands out queued sessions in order; fails once the queue is empty.
#[derive(Default)]
pub struct MockTransport {
    sessions: Mutex<VecDeque<LinkChannels>>,
    failure: Option<String>,
    hanging: AtomicBool,
    opens: AtomicUsize,
    sources_closed: Arc<AtomicUsize>,
}

impl MockTransport {
    pub fn failing(reason: &str) -> Self {
        Self {
            failure: Some(reason.to_string()),
            ..Self::default()
        }
    }

    /// `open` never resolves until `stop_hanging`.
    pub fn hanging() -> Self {
        let transport = Self::default();
        transport.hanging.store(true, Ordering::SeqCst);
        transport
    }

    pub fn stop_hanging(&self) {
        self.hanging.store(false, Ordering::SeqCst);
    }

    pub fn add_session(&self) -> (ChunkFeed, RecordingSink) {
        let (feed, rx) = mpsc::unbounded_channel();
        let sink = RecordingSink::default();
        self.sessions
            .lock()
            .unwrap()
            .push_back(LinkChannels::new(
                ChannelSource {
                    rx,
                    closed: self.sources_closed.clone(),
                },
                sink.clone(),
            ));
        (feed, sink)
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn sources_closed(&self) -> usize {
        self.sources_closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LinkTransport for MockTransport {
    fn describe(&self) -> String {
        "mock".to_string()
    }

    async fn open(&self) -> Result<LinkChannels, LinkError> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        if self.hanging.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if let Some(reason) = &self.failure {
            return Err(LinkError::TransportUnavailable(reason.clone()));
        }
        self.sessions
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| LinkError::TransportUnavailable("no device attached".to_string()))
    }
}

/// Poll `check` until it holds, failing the test after two seconds.
pub async fn eventually(mut check: impl FnMut() -> bool) {
    let waited = tokio::time::timeout(Duration::from_secs(2), async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "condition not reached within 2s");
}
