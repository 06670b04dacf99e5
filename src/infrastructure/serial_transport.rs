// Serial port transport backed by the serialport crate
use crate::application::link_error::LinkError;
use crate::application::link_transport::{ByteSink, ChunkSource, LinkChannels, LinkTransport};
use async_trait::async_trait;
use bytes::Bytes;
use serialport::SerialPort;
use std::io::{ErrorKind, Read, Write};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::mpsc;

const READ_BUFFER_SIZE: usize = 1024;
const CHUNK_QUEUE_DEPTH: usize = 64;

#[derive(Debug, Clone)]
pub struct SerialTransport {
    port_name: String,
    baud_rate: u32,
    read_poll: Duration,
}

impl SerialTransport {
    pub fn new(port_name: String, baud_rate: u32, read_poll: Duration) -> Self {
        Self {
            port_name,
            baud_rate,
            read_poll,
        }
    }

    fn open_blocking(&self) -> Result<(Box<dyn SerialPort>, Box<dyn SerialPort>), LinkError> {
        let port = serialport::new(&self.port_name, self.baud_rate)
            .data_bits(serialport::DataBits::Eight)
            .stop_bits(serialport::StopBits::One)
            .parity(serialport::Parity::None)
            .timeout(self.read_poll)
            .open()
            .map_err(|e| {
                LinkError::TransportUnavailable(format!(
                    "failed to open serial port {}: {}",
                    self.port_name, e
                ))
            })?;
        let reader = port.try_clone().map_err(|e| {
            LinkError::TransportUnavailable(format!(
                "failed to clone serial port {}: {}",
                self.port_name, e
            ))
        })?;
        Ok((reader, port))
    }
}

#[async_trait]
impl LinkTransport for SerialTransport {
    fn describe(&self) -> String {
        format!("{} @ {} baud", self.port_name, self.baud_rate)
    }

    async fn open(&self) -> Result<LinkChannels, LinkError> {
        let transport = self.clone();
        let (reader, writer) = tokio::task::spawn_blocking(move || transport.open_blocking())
            .await
            .map_err(|e| LinkError::TransportUnavailable(format!("serial open task failed: {}", e)))??;

        let (tx, rx) = mpsc::channel(CHUNK_QUEUE_DEPTH);
        let port_name = self.port_name.clone();
        let reader = std::thread::Builder::new()
            .name(format!("serial-reader {}", port_name))
            .spawn(move || read_port(reader, tx))
            .map_err(|e| LinkError::TransportUnavailable(format!("failed to start reader: {}", e)))?;

        tracing::debug!(port = %port_name, "serial port opened");
        Ok(LinkChannels::new(
            SerialSource {
                rx,
                reader: Some(reader),
            },
            SerialSink {
                port: Arc::new(Mutex::new(writer)),
            },
        ))
    }
}

/// Blocking reader: forwards chunks until the port fails or the source closes.
/// A closed source is noticed within one read poll.
fn read_port(mut port: Box<dyn SerialPort>, tx: mpsc::Sender<std::io::Result<Bytes>>) {
    let mut buffer = [0u8; READ_BUFFER_SIZE];
    loop {
        match port.read(&mut buffer) {
            Ok(0) => {
                if tx.is_closed() {
                    break;
                }
            }
            Ok(n) => {
                if tx.blocking_send(Ok(Bytes::copy_from_slice(&buffer[..n]))).is_err() {
                    break;
                }
            }
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::Interrupted => {
                if tx.is_closed() {
                    break;
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "serial read error");
                let _ = tx.blocking_send(Err(e));
                break;
            }
        }
    }
    tracing::debug!("serial reader stopped");
}

pub struct SerialSource {
    rx: mpsc::Receiver<std::io::Result<Bytes>>,
    reader: Option<std::thread::JoinHandle<()>>,
}

#[async_trait]
impl ChunkSource for SerialSource {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>, LinkError> {
        match self.rx.recv().await {
            Some(Ok(chunk)) => Ok(Some(chunk)),
            Some(Err(e)) => Err(LinkError::Transport(e)),
            None => Ok(None),
        }
    }

    /// Stop the reader thread and wait for it to drop its port handle, so an
    /// immediate reconnect does not find the device busy.
    async fn close(&mut self) {
        self.rx.close();
        let Some(reader) = self.reader.take() else {
            return;
        };
        match tokio::task::spawn_blocking(move || reader.join()).await {
            Ok(Ok(())) => tracing::debug!("serial reader joined"),
            Ok(Err(_)) => tracing::warn!("serial reader panicked"),
            Err(e) => tracing::warn!(error = %e, "failed to join serial reader"),
        }
    }
}

pub struct SerialSink {
    port: Arc<Mutex<Box<dyn SerialPort>>>,
}

#[async_trait]
impl ByteSink for SerialSink {
    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        let port = self.port.clone();
        let bytes = bytes.to_vec();
        tokio::task::spawn_blocking(move || {
            let mut port = port.lock().unwrap_or_else(PoisonError::into_inner);
            port.write_all(&bytes)?;
            port.flush()
        })
        .await
        .map_err(|e| LinkError::Transport(std::io::Error::other(e)))??;
        Ok(())
    }
}
