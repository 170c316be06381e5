use std::sync::Arc;
use tracing::{debug, info, warn};

use shared_api::PortalClient;
use shared_models::auth::{AuthSession, PortalUser};
use shared_models::error::{ApiError, AuthError};

use crate::models::{Dashboard, LoginResponse};

pub struct AuthService {
    client: Arc<PortalClient>,
}

impl AuthService {
    pub fn new(client: Arc<PortalClient>) -> Self {
        Self { client }
    }

    /// Exchanges credentials for a bearer token and starts the session.
    pub async fn login(&self, email: &str, password: &str) -> Result<PortalUser, ApiError> {
        if email.trim().is_empty() || password.is_empty() {
            return Err(AuthError::InvalidCredentials(
                "Email and password are required".to_string(),
            ).into());
        }

        debug!("Requesting access token for {}", email);

        let response: LoginResponse = self.client
            .post_form("/auth/token", &[("username", email.trim()), ("password", password)])
            .await?;

        if !response.token_type.eq_ignore_ascii_case("bearer") {
            warn!("Unexpected token type from login endpoint: {}", response.token_type);
        }

        let user = response.user();
        self.client.session().begin(AuthSession {
            access_token: response.access_token,
            user: user.clone(),
        }).await;

        info!("Signed in as {} ({})", user.email, user.role);
        Ok(user)
    }

    pub async fn logout(&self) -> bool {
        self.client.session().end().await
    }

    pub async fn current_user(&self) -> Option<PortalUser> {
        self.client.session().current_user().await
    }

    pub async fn dashboard(&self) -> Option<Dashboard> {
        self.current_user().await.map(|user| Dashboard::from(user.role))
    }
}
