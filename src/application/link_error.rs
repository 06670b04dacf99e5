// Link error taxonomy
use crate::domain::link_state::LinkState;

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// The link could not be opened (missing device, permissions, refused).
    #[error("transport unavailable: {0}")]
    TransportUnavailable(String),

    /// A read or write failed mid-session.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// The vehicle side closed the stream.
    #[error("link closed by the vehicle")]
    StreamEnded,

    #[error("not connected")]
    NotConnected,

    /// `disconnect` was called while the transport was still opening.
    #[error("connect aborted by disconnect")]
    ConnectAborted,

    #[error("link is already {0}")]
    AlreadyConnected(LinkState),

    /// The pending partial line grew past the cap without a newline.
    #[error("telemetry line exceeded {max} bytes without a newline ({size} pending)")]
    UnboundedLine { size: usize, max: usize },
}

