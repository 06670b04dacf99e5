// Application state for HTTP handlers
use crate::application::connection_manager::ConnectionManager;
use crate::infrastructure::status_board::StatusBoard;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<ConnectionManager>,
    pub status: Arc<StatusBoard>,
}
