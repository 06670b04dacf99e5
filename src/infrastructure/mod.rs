// Infrastructure layer - External dependencies and adapters
pub mod config;
pub mod serial_transport;
pub mod status_board;
pub mod tcp_transport;
pub mod transport;
