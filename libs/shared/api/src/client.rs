use std::sync::Arc;

use reqwest::{
    Client, RequestBuilder, StatusCode,
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION},
    Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, warn};

use shared_config::AppConfig;
use shared_models::error::{ApiError, AuthError};
use shared_utils::jwt;

use crate::session::SessionContext;

/// Authenticated transport to the portal backend.
///
/// Injects the bearer credential held in the [`SessionContext`] and tears the
/// session down when the backend answers 401. Never retries.
pub struct PortalClient {
    client: Client,
    base_url: String,
    session: Arc<SessionContext>,
}

impl PortalClient {
    pub fn new(config: &AppConfig, session: Arc<SessionContext>) -> Self {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .unwrap_or_else(|e| {
                warn!("Falling back to default HTTP client: {}", e);
                Client::new()
            });

        Self {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap, ApiError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(token) = auth_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| ApiError::Auth(AuthError::SessionExpired(
                    "Stored credential is not a valid header value".to_string(),
                )))?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }

    /// Current bearer token, expiring the session first if the token is
    /// already past its `exp` claim.
    async fn bearer(&self) -> Result<Option<String>, ApiError> {
        let Some(token) = self.session.token().await else {
            return Ok(None);
        };

        if jwt::is_expired(&token) {
            warn!("Stored credential has expired, ending session");
            self.session.expire_token(&token).await;
            return Err(AuthError::SessionExpired("Access token has expired".to_string()).into());
        }

        Ok(Some(token))
    }

    pub async fn request<T>(&self, method: Method, path: &str,
                            query: &[(&str, String)], body: Option<Value>)
                            -> Result<T, ApiError>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let token = self.bearer().await?;
        let headers = self.get_headers(token.as_deref())?;

        let mut req = self.client.request(method, &url)
            .headers(headers);

        if !query.is_empty() {
            req = req.query(query);
        }

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        self.execute(req, token.as_deref()).await
    }

    /// Form-encoded POST, used by the token endpoint. A 401 here means the
    /// submitted credentials were wrong, not that a session expired.
    pub async fn post_form<T>(&self, path: &str, form: &[(&str, &str)]) -> Result<T, ApiError>
    where T: DeserializeOwned {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making form POST request to {}", url);

        let req = self.client.post(&url)
            .headers(self.get_headers(None)?)
            .form(form);

        match self.execute(req, None).await {
            Err(ApiError::Auth(AuthError::SessionExpired(msg))) => {
                Err(AuthError::InvalidCredentials(msg).into())
            }
            other => other,
        }
    }

    pub async fn get<T>(&self, path: &str, query: &[(&str, String)]) -> Result<T, ApiError>
    where T: DeserializeOwned {
        self.request(Method::GET, path, query, None).await
    }

    pub async fn post<T>(&self, path: &str, body: Value) -> Result<T, ApiError>
    where T: DeserializeOwned {
        self.request(Method::POST, path, &[], Some(body)).await
    }

    pub async fn put<T>(&self, path: &str, body: Value) -> Result<T, ApiError>
    where T: DeserializeOwned {
        self.request(Method::PUT, path, &[], Some(body)).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), ApiError> {
        let _: Value = self.request(Method::DELETE, path, &[], None).await?;
        Ok(())
    }

    async fn execute<T>(&self, req: RequestBuilder, auth_token: Option<&str>) -> Result<T, ApiError>
    where T: DeserializeOwned {
        let response = req.send().await.map_err(|e| {
            error!("Request failed: {}", e);
            if e.is_timeout() {
                ApiError::Transport("Request timed out".to_string())
            } else {
                ApiError::Transport(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message = error_message(&error_text, status);
            error!("API error ({}): {}", status, message);

            return Err(match status {
                StatusCode::UNAUTHORIZED => {
                    if let Some(token) = auth_token {
                        self.session.expire_token(token).await;
                    }
                    AuthError::SessionExpired(message).into()
                }
                StatusCode::NOT_FOUND => ApiError::NotFound(message),
                _ => ApiError::Status { status: status.as_u16(), message },
            });
        }

        let bytes = response.bytes().await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        // 204 and other empty bodies decode as JSON null
        let data = if bytes.iter().all(u8::is_ascii_whitespace) {
            serde_json::from_value(Value::Null)
        } else {
            serde_json::from_slice(&bytes)
        };

        data.map_err(|e| {
            error!("Failed to decode response body: {}", e);
            ApiError::Decode(e.to_string())
        })
    }
}

/// Pulls the backend's `detail` field out of an error body, falling back to
/// the raw text or the status reason.
fn error_message(body: &str, status: StatusCode) -> String {
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(body) {
        match map.get("detail") {
            Some(Value::String(detail)) => return detail.clone(),
            Some(other) => return other.to_string(),
            None => {}
        }
    }

    if body.trim().is_empty() {
        status.canonical_reason().unwrap_or("Unknown error").to_string()
    } else {
        body.to_string()
    }
}
