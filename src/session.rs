//! In-memory client session owned by one core instance.
//!
//! Credentials are handed to the service collaborator and never kept here;
//! the session only remembers who is logged in and which server is selected.

use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientSession {
    pub server_address: Option<String>,
    pub username: Option<String>,
}

impl ClientSession {
    pub fn is_logged_in(&self) -> bool {
        self.username.is_some()
    }
}

pub type SharedSession = Arc<RwLock<ClientSession>>;

pub fn shared(session: ClientSession) -> SharedSession {
    Arc::new(RwLock::new(session))
}
