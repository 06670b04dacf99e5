// Domain layer - Telemetry, commands and link lifecycle
pub mod command;
pub mod link_state;
pub mod status;
pub mod telemetry;
