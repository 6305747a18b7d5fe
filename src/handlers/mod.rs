pub mod sessions;

use std::sync::Arc;

use crate::services::session::EditSessionService;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer behind the HTTP handlers.
#[derive(Clone)]
pub struct AppServices {
    pub sessions: Arc<EditSessionService>,
}

impl AppServices {
    pub fn new(sessions: Arc<EditSessionService>) -> Self {
        Self { sessions }
    }
}
