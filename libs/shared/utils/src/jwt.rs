use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use tracing::debug;
use shared_models::auth::JwtClaims;

/// Reads the claims segment of a JWT without verifying the signature.
///
/// The portal never holds the signing secret; this is only used to spot
/// credentials that are already past their `exp` before a request goes out.
pub fn decode_claims(token: &str) -> Result<JwtClaims, String> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err("Invalid token format".to_string());
    }

    let claims_json = match URL_SAFE_NO_PAD.decode(parts[1].trim_end_matches('=')) {
        Ok(bytes) => match String::from_utf8(bytes) {
            Ok(json_str) => json_str,
            Err(_) => return Err("Invalid claims encoding".to_string()),
        },
        Err(_) => return Err("Invalid claims encoding".to_string()),
    };

    serde_json::from_str(&claims_json).map_err(|e| {
        debug!("Failed to parse claims: {}", e);
        "Invalid claims format".to_string()
    })
}

/// True only for a well-formed JWT whose `exp` is at or before `now`.
/// Opaque tokens and tokens without `exp` are left for the backend to judge.
pub fn is_expired_at(token: &str, now: DateTime<Utc>) -> bool {
    match decode_claims(token) {
        Ok(JwtClaims { exp: Some(exp), .. }) => {
            let expired = exp <= now.timestamp();
            if expired {
                debug!("Token expired at {} (now: {})", exp, now.timestamp());
            }
            expired
        }
        _ => false,
    }
}

pub fn is_expired(token: &str) -> bool {
    is_expired_at(token, Utc::now())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{JwtTestUtils, TestUser};
    use chrono::Duration;

    #[test]
    fn test_decode_claims_reads_subject_and_role() {
        let user = TestUser::doctor("doc@example.com");
        let token = JwtTestUtils::create_test_token(&user, "secret", Some(1));

        let claims = decode_claims(&token).unwrap();
        assert_eq!(claims.sub, Some(user.id.to_string()));
        assert_eq!(claims.role.as_deref(), Some("doctor"));
        assert!(claims.exp.is_some());
    }

    #[test]
    fn test_expired_token_detected() {
        let user = TestUser::default();
        let token = JwtTestUtils::create_expired_token(&user, "secret");
        assert!(is_expired(&token));
    }

    #[test]
    fn test_fresh_token_not_expired() {
        let user = TestUser::default();
        let token = JwtTestUtils::create_test_token(&user, "secret", Some(2));
        assert!(!is_expired(&token));
        assert!(is_expired_at(&token, Utc::now() + Duration::hours(3)));
    }

    #[test]
    fn test_opaque_token_never_expired() {
        assert!(!is_expired("opaque-session-token"));
        assert!(!is_expired(&JwtTestUtils::create_malformed_token()));
    }
}
