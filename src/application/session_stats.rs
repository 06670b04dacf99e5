// Per-session link counters
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct SessionStats {
    chunks_received: AtomicU64,
    lines_framed: AtomicU64,
    lines_rejected: AtomicU64,
    readings_recorded: AtomicU64,
    commands_sent: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionStatsSnapshot {
    pub chunks_received: u64,
    pub lines_framed: u64,
    /// Lines the decoder found no recognized field in.
    pub lines_rejected: u64,
    pub readings_recorded: u64,
    pub commands_sent: u64,
}

impl SessionStats {
    pub fn chunk_received(&self) {
        self.chunks_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn line_framed(&self) {
        self.lines_framed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn line_rejected(&self) {
        self.lines_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reading_recorded(&self) {
        self.readings_recorded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn command_sent(&self) {
        self.commands_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reset(&self) {
        for counter in [
            &self.chunks_received,
            &self.lines_framed,
            &self.lines_rejected,
            &self.readings_recorded,
            &self.commands_sent,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }

    pub fn snapshot(&self) -> SessionStatsSnapshot {
        SessionStatsSnapshot {
            chunks_received: self.chunks_received.load(Ordering::Relaxed),
            lines_framed: self.lines_framed.load(Ordering::Relaxed),
            lines_rejected: self.lines_rejected.load(Ordering::Relaxed),
            readings_recorded: self.readings_recorded.load(Ordering::Relaxed),
            commands_sent: self.commands_sent.load(Ordering::Relaxed),
        }
    }
}
