// Presentation layer - HTTP console API
pub mod app_state;
pub mod handlers;
