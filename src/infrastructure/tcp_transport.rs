// Serial-over-TCP transport (ser2net style bridges) and generic async stream halves
use crate::application::link_error::LinkError;
use crate::application::link_transport::{ByteSink, ChunkSource, LinkChannels, LinkTransport};
use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;

const READ_BUFFER_SIZE: usize = 1024;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
pub struct TcpTransport {
    addr: String,
}

impl TcpTransport {
    pub fn new(addr: String) -> Self {
        Self { addr }
    }
}

#[async_trait]
impl LinkTransport for TcpTransport {
    fn describe(&self) -> String {
        format!("tcp://{}", self.addr)
    }

    async fn open(&self) -> Result<LinkChannels, LinkError> {
        let stream = tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(&self.addr))
            .await
            .map_err(|_| {
                LinkError::TransportUnavailable(format!(
                    "timed out connecting to {} after {}s",
                    self.addr,
                    CONNECT_TIMEOUT.as_secs()
                ))
            })?
            .map_err(|e| {
                LinkError::TransportUnavailable(format!("failed to connect to {}: {}", self.addr, e))
            })?;
        stream.set_nodelay(true)?;

        let (reader, writer) = stream.into_split();
        Ok(LinkChannels::new(StreamSource::new(reader), StreamSink::new(writer)))
    }
}

/// Chunk source over any async byte stream.
pub struct StreamSource<R> {
    reader: R,
    buffer: BytesMut,
}

impl<R> StreamSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: BytesMut::with_capacity(READ_BUFFER_SIZE),
        }
    }
}

#[async_trait]
impl<R> ChunkSource for StreamSource<R>
where
    R: AsyncRead + Unpin + Send,
{
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, LinkError> {
        self.buffer.reserve(READ_BUFFER_SIZE);
        let n = self.reader.read_buf(&mut self.buffer).await?;
        if n == 0 {
            return Ok(None);
        }
        Ok(Some(self.buffer.split().freeze()))
    }
}

/// Byte sink over any async byte stream; flushes after every write.
pub struct StreamSink<W> {
    writer: W,
}

impl<W> StreamSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl<W> ByteSink for StreamSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        self.writer.write_all(bytes).await?;
        self.writer.flush().await?;
        Ok(())
    }
}
