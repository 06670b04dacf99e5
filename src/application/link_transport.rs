// Transport traits for the vehicle link
use crate::application::link_error::LinkError;
use async_trait::async_trait;
use bytes::Bytes;

/// Inbound half of an open link.
#[async_trait]
pub trait ChunkSource: Send {
    /// Next chunk in arrival order, or `None` once the stream has ended.
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, LinkError>;

    /// Release the underlying device. Returns once it can be reopened.
    async fn close(&mut self) {}
}

/// Outbound half of an open link.
#[async_trait]
pub trait ByteSink: Send {
    /// Returns once the local transport has accepted every byte.
    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), LinkError>;
}

pub struct LinkChannels {
    pub source: Box<dyn ChunkSource>,
    pub sink: Box<dyn ByteSink>,
}

impl LinkChannels {
    pub fn new(source: impl ChunkSource + 'static, sink: impl ByteSink + 'static) -> Self {
        Self {
            source: Box::new(source),
            sink: Box::new(sink),
        }
    }
}

#[async_trait]
pub trait LinkTransport: Send + Sync {
    /// Human-readable endpoint, used in logs and status output.
    fn describe(&self) -> String;

    /// Acquire the device and open both directions. Failures map to
    /// `LinkError::TransportUnavailable`.
    async fn open(&self) -> Result<LinkChannels, LinkError>;
}
