use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

use shared_models::auth::{AuthSession, PortalUser, SessionEvent};

/// Process-wide sign-in state.
///
/// Written only by the login/logout flow and by the client's expiry handler;
/// every outgoing request reads the bearer token from here.
pub struct SessionContext {
    session: RwLock<Option<AuthSession>>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionContext {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(16);

        Self {
            session: RwLock::new(None),
            events,
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    pub async fn begin(&self, session: AuthSession) {
        let user = session.user.clone();
        {
            let mut current = self.session.write().await;
            *current = Some(session);
        }

        info!("Session started for user {} ({})", user.id, user.role);
        self.publish(SessionEvent::SignedIn(user));
    }

    /// Ends the session at the user's request. Returns whether one was active.
    pub async fn end(&self) -> bool {
        let previous = self.session.write().await.take();

        match previous {
            Some(session) => {
                info!("Session ended for user {}", session.user.id);
                self.publish(SessionEvent::SignedOut);
                true
            }
            None => false,
        }
    }

    /// Tears down the session if it still holds `token`.
    ///
    /// A rejection of an older credential must not sign out a session that
    /// was established after the request went out.
    pub async fn expire_token(&self, token: &str) -> bool {
        let mut current = self.session.write().await;

        let matches = current
            .as_ref()
            .map(|s| s.access_token == token)
            .unwrap_or(false);

        if !matches {
            debug!("Ignoring expiry for a credential that is no longer active");
            return false;
        }

        if let Some(session) = current.take() {
            info!("Session expired for user {}", session.user.id);
        }
        drop(current);

        self.publish(SessionEvent::Expired);
        true
    }

    pub async fn token(&self) -> Option<String> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.access_token.clone())
    }

    pub async fn current_user(&self) -> Option<PortalUser> {
        self.session.read().await.as_ref().map(|s| s.user.clone())
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_some()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn publish(&self, event: SessionEvent) {
        if let Err(e) = self.events.send(event) {
            debug!("No session listeners: {}", e);
        }
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}
