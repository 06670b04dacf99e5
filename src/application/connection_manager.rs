// Connection manager - Link lifecycle and the telemetry read loop
use crate::application::command_dispatcher::CommandDispatcher;
use crate::application::history_store::HistoryStore;
use crate::application::link_error::LinkError;
use crate::application::link_transport::{ChunkSource, LinkTransport};
use crate::application::session_stats::{SessionStats, SessionStatsSnapshot};
use crate::application::status_sink::StatusSink;
use crate::application::stream_framer::{StreamFramer, DEFAULT_MAX_LINE_BYTES};
use crate::domain::command::Command;
use crate::domain::link_state::LinkState;
use crate::domain::status::StatusLine;
use crate::domain::telemetry::TelemetryDecoder;
use bytes::Bytes;
use std::sync::{Arc, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub max_line_bytes: usize,
    /// Warn when the link stays silent this long. Silence never ends a session.
    pub inactivity_timeout: Option<Duration>,
    pub decoder: TelemetryDecoder,
    pub command_line_terminator: bool,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            max_line_bytes: DEFAULT_MAX_LINE_BYTES,
            inactivity_timeout: None,
            decoder: TelemetryDecoder::default(),
            command_line_terminator: true,
        }
    }
}

struct Session {
    cancel: CancellationToken,
    reader: JoinHandle<()>,
}

/// Owns every piece of session state: link state, history, dispatcher and the
/// read loop task.
pub struct ConnectionManager {
    transport: Arc<dyn LinkTransport>,
    history: Arc<HistoryStore>,
    dispatcher: Arc<CommandDispatcher>,
    status: Arc<dyn StatusSink>,
    stats: Arc<SessionStats>,
    state: Arc<watch::Sender<LinkState>>,
    settings: ConnectionSettings,
    session: Mutex<Option<Session>>,
    /// Token of the newest session, reachable while `connect` holds `session`.
    cancel: std::sync::Mutex<Option<CancellationToken>>,
}

impl ConnectionManager {
    pub fn new(
        transport: Arc<dyn LinkTransport>,
        history: Arc<HistoryStore>,
        status: Arc<dyn StatusSink>,
        settings: ConnectionSettings,
    ) -> Self {
        let (state, state_rx) = watch::channel(LinkState::Disconnected);
        let stats = Arc::new(SessionStats::default());
        let dispatcher = Arc::new(CommandDispatcher::new(
            state_rx,
            status.clone(),
            stats.clone(),
            settings.command_line_terminator,
        ));

        Self {
            transport,
            history,
            dispatcher,
            status,
            stats,
            state: Arc::new(state),
            settings,
            session: Mutex::new(None),
            cancel: std::sync::Mutex::new(None),
        }
    }

    pub fn state(&self) -> LinkState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<LinkState> {
        self.state.subscribe()
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    pub fn stats(&self) -> SessionStatsSnapshot {
        self.stats.snapshot()
    }

    pub fn describe_transport(&self) -> String {
        self.transport.describe()
    }

    pub async fn send(&self, command: Command) -> Result<(), LinkError> {
        self.dispatcher.send(command).await
    }

    /// Open the link and start the read loop.
    ///
    /// Only valid from `Disconnected`. On acquisition failure the state passes
    /// through `Errored` back to `Disconnected` and the cause is returned. A
    /// `disconnect` while the transport is still opening aborts the attempt.
    pub async fn connect(&self) -> Result<(), LinkError> {
        let mut session = self.session.lock().await;

        let current = self.state();
        if current != LinkState::Disconnected {
            return Err(LinkError::AlreadyConnected(current));
        }
        if let Some(stale) = session.take() {
            // The previous read loop already tore itself down.
            let _ = stale.reader.await;
        }

        let cancel = CancellationToken::new();
        self.replace_cancel(Some(cancel.clone()));

        let endpoint = self.transport.describe();
        transition(&self.state, LinkState::Connecting);
        self.status.publish_line(StatusLine::Connecting);
        tracing::info!(%endpoint, "opening link");

        let opened = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            opened = self.transport.open() => Some(opened),
        };
        let channels = match opened {
            None => return Err(self.abort_connect(&endpoint)),
            Some(Ok(_)) if cancel.is_cancelled() => return Err(self.abort_connect(&endpoint)),
            Some(Ok(channels)) => channels,
            Some(Err(err)) => {
                tracing::error!(%endpoint, error = %err, "failed to open link");
                transition(&self.state, LinkState::Errored);
                self.status.publish_line(StatusLine::Error(err.to_string()));
                transition(&self.state, LinkState::Disconnected);
                return Err(err);
            }
        };

        self.history.reset();
        self.stats.reset();

        let (faults_tx, faults_rx) = mpsc::unbounded_channel();
        self.dispatcher.attach(channels.sink, faults_tx).await;

        transition(&self.state, LinkState::Connected);
        self.status.publish_line(StatusLine::Online(None));
        tracing::info!(%endpoint, "link connected");

        let read_loop = ReadLoop {
            source: channels.source,
            framer: StreamFramer::new(self.settings.max_line_bytes),
            decoder: self.settings.decoder.clone(),
            history: self.history.clone(),
            stats: self.stats.clone(),
            status: self.status.clone(),
            dispatcher: self.dispatcher.clone(),
            state: self.state.clone(),
            cancel: cancel.clone(),
            faults: faults_rx,
            inactivity_timeout: self.settings.inactivity_timeout,
        };
        let reader = tokio::spawn(read_loop.run());

        *session = Some(Session { cancel, reader });
        Ok(())
    }

    /// Stop the read loop and release the transport. Safe to call in any state.
    /// History is kept for export until the next `connect`.
    pub async fn disconnect(&self) {
        // Cancel before taking the session lock so a pending open gives it up.
        if let Some(cancel) = self.replace_cancel(None) {
            cancel.cancel();
        }
        let mut session = self.session.lock().await;

        if let Some(Session { cancel, reader }) = session.take() {
            cancel.cancel();
            if let Err(err) = reader.await {
                tracing::warn!(error = %err, "read loop ended abnormally");
            }
        }
        self.dispatcher.detach().await;

        if transition(&self.state, LinkState::Disconnected) {
            self.status.publish_line(StatusLine::Disconnected);
        }
    }

    fn replace_cancel(&self, next: Option<CancellationToken>) -> Option<CancellationToken> {
        let mut cancel = self.cancel.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::replace(&mut *cancel, next)
    }

    fn abort_connect(&self, endpoint: &str) -> LinkError {
        tracing::info!(%endpoint, "link open aborted by disconnect");
        if transition(&self.state, LinkState::Disconnected) {
            self.status.publish_line(StatusLine::Disconnected);
        }
        LinkError::ConnectAborted
    }
}

/// Apply a state change if the state machine allows it. Returns whether the
/// state changed.
fn transition(state: &watch::Sender<LinkState>, next: LinkState) -> bool {
    state.send_if_modified(|current| {
        if *current == next {
            return false;
        }
        if !current.can_transition_to(next) {
            tracing::warn!(from = %current, to = %next, "rejected link state transition");
            return false;
        }
        tracing::debug!(from = %current, to = %next, "link state transition");
        *current = next;
        true
    })
}

struct ReadLoop {
    source: Box<dyn ChunkSource>,
    framer: StreamFramer,
    decoder: TelemetryDecoder,
    history: Arc<HistoryStore>,
    stats: Arc<SessionStats>,
    status: Arc<dyn StatusSink>,
    dispatcher: Arc<CommandDispatcher>,
    state: Arc<watch::Sender<LinkState>>,
    cancel: CancellationToken,
    faults: mpsc::UnboundedReceiver<String>,
    inactivity_timeout: Option<Duration>,
}

impl ReadLoop {
    async fn run(mut self) {
        let outcome = self.pump().await;

        self.dispatcher.detach().await;
        let partial = self.framer.pending_len();
        if partial > 0 {
            tracing::debug!(bytes = partial, "discarding unterminated telemetry line");
        }
        match outcome {
            Ok(()) => tracing::info!("read loop stopped"),
            Err(err) => {
                tracing::error!(error = %err, "link session terminated");
                transition(&self.state, LinkState::Errored);
                self.status.publish_line(StatusLine::Error(err.to_string()));
            }
        }

        let Self { mut source, state, status, .. } = self;
        source.close().await;
        drop(source);
        if transition(&state, LinkState::Disconnected) {
            status.publish_line(StatusLine::Disconnected);
        }
    }

    async fn pump(&mut self) -> Result<(), LinkError> {
        loop {
            let next = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Ok(()),
                Some(reason) = self.faults.recv() => {
                    return Err(LinkError::Transport(std::io::Error::other(reason)));
                }
                next = next_chunk(self.source.as_mut(), self.inactivity_timeout, self.status.as_ref()) => next?,
            };

            match next {
                Some(chunk) => self.ingest(&chunk)?,
                None => return Err(LinkError::StreamEnded),
            }
        }
    }

    fn ingest(&mut self, chunk: &[u8]) -> Result<(), LinkError> {
        self.stats.chunk_received();

        for line in self.framer.push(chunk)? {
            self.stats.line_framed();
            let Some(reading) = self.decoder.decode(&line) else {
                self.stats.line_rejected();
                tracing::trace!(%line, "discarded telemetry line without known fields");
                continue;
            };

            self.stats.reading_recorded();
            if reading.temperature.is_some() && reading.humidity.is_some() {
                self.status
                    .publish_line(StatusLine::Online(Some(reading.clone())));
            }
            self.history.record(reading);
        }

        Ok(())
    }
}

/// Await the next chunk, reporting silence past `inactivity_timeout` without
/// giving up on the link.
async fn next_chunk(
    source: &mut dyn ChunkSource,
    inactivity_timeout: Option<Duration>,
    status: &dyn StatusSink,
) -> Result<Option<Bytes>, LinkError> {
    let Some(limit) = inactivity_timeout else {
        return source.next_chunk().await;
    };

    let mut silent = Duration::ZERO;
    loop {
        match tokio::time::timeout(limit, source.next_chunk()).await {
            Ok(next) => return next,
            Err(_) => {
                silent += limit;
                tracing::warn!(silent_secs = silent.as_secs(), "no telemetry received");
                status.publish_line(StatusLine::NoData {
                    silent_secs: silent.as_secs(),
                });
            }
        }
    }
}
