use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};

use parley_runtime::Dispatcher;

/// Inbound frame senders keyed by SSE session id.
pub type Sessions = Arc<RwLock<HashMap<String, mpsc::Sender<String>>>>;

pub struct AppState {
    pub dispatcher: Dispatcher,
    pub sessions: Sessions,
    pub server_name: String,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            sessions: Arc::new(RwLock::new(HashMap::new())),
            server_name: "parley".to_string(),
        }
    }

    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }
}
