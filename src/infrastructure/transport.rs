// Transport selection from configuration
use crate::application::link_transport::LinkTransport;
use crate::infrastructure::config::LinkSettings;
use crate::infrastructure::serial_transport::SerialTransport;
use crate::infrastructure::tcp_transport::TcpTransport;
use std::sync::Arc;
use std::time::Duration;

/// `tcp://host:port` selects the TCP bridge; anything else is a serial device.
pub fn build_transport(settings: &LinkSettings) -> Arc<dyn LinkTransport> {
    match settings.port.strip_prefix("tcp://") {
        Some(addr) => Arc::new(TcpTransport::new(addr.to_string())),
        None => Arc::new(SerialTransport::new(
            settings.port.clone(),
            settings.baud_rate,
            Duration::from_millis(settings.read_poll_ms.max(1)),
        )),
    }
}
