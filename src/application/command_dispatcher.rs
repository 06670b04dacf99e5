// Command dispatcher - Serialized single-byte command writes
use crate::application::link_error::LinkError;
use crate::application::link_transport::ByteSink;
use crate::application::session_stats::SessionStats;
use crate::application::status_sink::StatusSink;
use crate::domain::command::Command;
use crate::domain::link_state::LinkState;
use crate::domain::status::StatusLine;
use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};

struct AttachedSink {
    sink: Box<dyn ByteSink>,
    /// Reports write failures to the session's read loop.
    faults: mpsc::UnboundedSender<String>,
}

/// Sends commands to the pad, one write at a time.
///
/// The outbound mutex is held across the write, so concurrent callers queue
/// instead of interleaving bytes. There is no acknowledgment from the vehicle:
/// `Ok` means the local transport accepted the bytes.
pub struct CommandDispatcher {
    state: watch::Receiver<LinkState>,
    outbound: Mutex<Option<AttachedSink>>,
    status: Arc<dyn StatusSink>,
    stats: Arc<SessionStats>,
    line_terminator: bool,
}

impl CommandDispatcher {
    pub fn new(
        state: watch::Receiver<LinkState>,
        status: Arc<dyn StatusSink>,
        stats: Arc<SessionStats>,
        line_terminator: bool,
    ) -> Self {
        Self {
            state,
            outbound: Mutex::new(None),
            status,
            stats,
            line_terminator,
        }
    }

    pub(crate) async fn attach(
        &self,
        sink: Box<dyn ByteSink>,
        faults: mpsc::UnboundedSender<String>,
    ) {
        *self.outbound.lock().await = Some(AttachedSink { sink, faults });
    }

    /// Drop the outbound channel. Returns whether one was attached.
    pub(crate) async fn detach(&self) -> bool {
        self.outbound.lock().await.take().is_some()
    }

    pub async fn send(&self, command: Command) -> Result<(), LinkError> {
        let state = *self.state.borrow();
        if !state.accepts_commands() {
            tracing::warn!(%command, %state, "command rejected, link not connected");
            self.status.publish_line(StatusLine::NotConnected);
            return Err(LinkError::NotConnected);
        }

        let mut outbound = self.outbound.lock().await;
        let Some(attached) = outbound.as_mut() else {
            self.status.publish_line(StatusLine::NotConnected);
            return Err(LinkError::NotConnected);
        };

        let frame = command.frame(self.line_terminator);
        let written = attached.sink.write_all(&frame).await;
        if let Err(err) = written {
            tracing::error!(%command, error = %err, "command write failed");
            if let Some(attached) = outbound.take() {
                let _ = attached.faults.send(format!("command write failed: {}", err));
            }
            self.status
                .publish_line(StatusLine::Error(format!("Command send failed: {}", err)));
            return Err(err);
        }
        drop(outbound);

        self.stats.command_sent();
        tracing::info!(%command, code = %char::from(command.code()), "command sent");
        self.status.publish_line(StatusLine::CommandSent(command));

        if command.is_irreversible() {
            tracing::warn!("launch command accepted by transport, ignition sequence started");
            self.status.publish_line(StatusLine::LaunchSequenceStarted);
        }

        Ok(())
    }
}
