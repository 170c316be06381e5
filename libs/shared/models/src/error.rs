use thiserror::Error;

/// Credential failures. Any of these ends the current session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Session expired: {0}")]
    SessionExpired(String),

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),
}

/// Errors surfaced by the remote access client.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Not Found: {0}")]
    NotFound(String),

    #[error("API error ({status}): {message}")]
    Status { status: u16, message: String },

    #[error("Decode error: {0}")]
    Decode(String),
}

impl ApiError {
    pub fn is_auth(&self) -> bool {
        matches!(self, ApiError::Auth(_))
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Auth(_) => Some(401),
            ApiError::NotFound(_) => Some(404),
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(_) | ApiError::Decode(_) => None,
        }
    }
}

/// A read failed. Nothing local changed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("Invalid query: {0}")]
    InvalidInput(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl QueryError {
    pub fn is_auth(&self) -> bool {
        matches!(self, QueryError::Api(e) if e.is_auth())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(ApiError::NotFound("x".into()).status(), Some(404));
        assert_eq!(
            ApiError::Auth(AuthError::SessionExpired("gone".into())).status(),
            Some(401)
        );
        assert_eq!(ApiError::Transport("refused".into()).status(), None);
    }

    #[test]
    fn test_query_error_wraps_auth() {
        let err: QueryError = ApiError::from(AuthError::SessionExpired("gone".into())).into();
        assert!(err.is_auth());
        assert_eq!(err.to_string(), "Session expired: gone");
        assert!(!QueryError::InvalidInput("bad".into()).is_auth());
    }
}
