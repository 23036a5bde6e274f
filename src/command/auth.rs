use super::Command;
use crate::error::{CoreError, CoreResult, require_non_empty};
use crate::service::ExerciseService;
use crate::session::SharedSession;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Verify credentials with the service and remember the user on success
pub struct Authenticate {
    credentials: Credentials,
    service: Arc<dyn ExerciseService>,
    session: SharedSession,
}

impl Authenticate {
    pub fn new(credentials: Credentials, service: Arc<dyn ExerciseService>, session: SharedSession) -> Self {
        Self {
            credentials,
            service,
            session,
        }
    }
}

#[async_trait]
impl Command for Authenticate {
    type Output = bool;

    fn name(&self) -> &'static str {
        "login"
    }

    fn validate(&self) -> CoreResult<()> {
        require_non_empty(&[
            ("username", self.credentials.username.as_str()),
            ("password", self.credentials.password.as_str()),
        ])
    }

    async fn execute(self) -> CoreResult<bool> {
        let accepted = self
            .service
            .authenticate(&self.credentials.username, &self.credentials.password)
            .await
            .map_err(CoreError::Transport)?;

        if accepted {
            self.session.write().await.username = Some(self.credentials.username.clone());
            info!("Logged in as {}", self.credentials.username);
        } else {
            warn!("Server rejected credentials for {}", self.credentials.username);
        }
        Ok(accepted)
    }
}

/// Forget the logged-in user; resolves to whether anyone was logged in
pub struct Logout {
    service: Arc<dyn ExerciseService>,
    session: SharedSession,
}

impl Logout {
    pub fn new(service: Arc<dyn ExerciseService>, session: SharedSession) -> Self {
        Self { service, session }
    }
}

#[async_trait]
impl Command for Logout {
    type Output = bool;

    fn name(&self) -> &'static str {
        "logout"
    }

    async fn execute(self) -> CoreResult<bool> {
        // Local state is cleared even if the server call fails
        let previous = self.session.write().await.username.take();

        if previous.is_some() {
            if let Err(e) = self.service.logout().await {
                warn!("Server-side logout failed: {:#}", e);
            }
            info!("Logged out");
        }
        Ok(previous.is_some())
    }
}

/// Make `address` the server all further requests go to
pub struct SelectServer {
    address: String,
    service: Arc<dyn ExerciseService>,
    session: SharedSession,
}

impl SelectServer {
    pub fn new(address: impl Into<String>, service: Arc<dyn ExerciseService>, session: SharedSession) -> Self {
        Self {
            address: address.into(),
            service,
            session,
        }
    }
}

#[async_trait]
impl Command for SelectServer {
    type Output = bool;

    fn name(&self) -> &'static str {
        "select_server"
    }

    fn validate(&self) -> CoreResult<()> {
        require_non_empty(&[("server_address", self.address.as_str())])
    }

    async fn execute(self) -> CoreResult<bool> {
        let selected = self
            .service
            .select_server(&self.address)
            .await
            .map_err(CoreError::Transport)?;

        if selected {
            self.session.write().await.server_address = Some(self.address.clone());
            info!("Selected server {}", self.address);
        }
        Ok(selected)
    }
}
