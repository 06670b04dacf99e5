// Application layer - Framing, history, command dispatch and connection lifecycle
pub mod command_dispatcher;
pub mod connection_manager;
pub mod history_store;
pub mod link_error;
pub mod link_transport;
pub mod session_stats;
pub mod status_sink;
pub mod stream_framer;

#[cfg(test)]
pub(crate) mod testing;
