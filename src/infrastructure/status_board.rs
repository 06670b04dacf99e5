// Status board - Latest operator status line, shared with the HTTP layer
use crate::application::status_sink::StatusSink;
use crate::domain::status::StatusLine;
use tokio::sync::watch;

pub struct StatusBoard {
    tx: watch::Sender<String>,
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBoard {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(StatusLine::Disconnected.to_string());
        Self { tx }
    }

    pub fn current(&self) -> String {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<String> {
        self.tx.subscribe()
    }
}

impl StatusSink for StatusBoard {
    fn publish(&self, status: String) {
        tracing::debug!(%status, "status update");
        self.tx.send_replace(status);
    }
}
