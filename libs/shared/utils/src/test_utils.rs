use std::sync::atomic::{AtomicI64, Ordering};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use base64::{Engine as _, engine::general_purpose};
use serde_json::{json, Value};

use shared_config::AppConfig;
use shared_models::auth::{AuthSession, PortalUser, UserRole};

static NEXT_USER_ID: AtomicI64 = AtomicI64::new(1000);

pub struct TestConfig {
    pub jwt_secret: String,
    pub api_base_url: String,
    pub request_timeout_secs: u64,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-signing-must-be-long-enough".to_string(),
            api_base_url: "http://localhost:8000/api/v1".to_string(),
            request_timeout_secs: 5,
        }
    }
}

impl TestConfig {
    /// Config pointing at a mock server, e.g. `TestConfig::for_server(&mock_server.uri())`.
    pub fn for_server(uri: &str) -> Self {
        Self {
            api_base_url: uri.to_string(),
            ..Self::default()
        }
    }

    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            api_base_url: self.api_base_url.clone(),
            request_timeout_secs: self.request_timeout_secs,
        }
    }
}

pub struct TestUser {
    pub id: i64,
    pub email: String,
    pub full_name: String,
    pub role: UserRole,
}

impl Default for TestUser {
    fn default() -> Self {
        Self::new("test@example.com", UserRole::Patient)
    }
}

impl TestUser {
    pub fn new(email: &str, role: UserRole) -> Self {
        Self {
            id: NEXT_USER_ID.fetch_add(1, Ordering::Relaxed),
            email: email.to_string(),
            full_name: "Test User".to_string(),
            role,
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, UserRole::Doctor)
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, UserRole::Patient)
    }

    pub fn to_user(&self) -> PortalUser {
        PortalUser {
            id: self.id,
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            role: self.role,
        }
    }

    /// A session carrying a fresh HS256 token for this user.
    pub fn to_session(&self, secret: &str) -> AuthSession {
        AuthSession {
            access_token: JwtTestUtils::create_test_token(self, secret, Some(24)),
            user: self.to_user(),
        }
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(user: &TestUser, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(24));

        let header = json!({
            "alg": "HS256",
            "typ": "JWT"
        });

        let payload = json!({
            "sub": user.id.to_string(),
            "email": user.email,
            "role": user.role.to_string(),
            "iat": now.timestamp(),
            "exp": exp.timestamp()
        });

        let header_encoded = general_purpose::URL_SAFE_NO_PAD.encode(header.to_string());
        let payload_encoded = general_purpose::URL_SAFE_NO_PAD.encode(payload.to_string());

        let signing_input = format!("{}.{}", header_encoded, payload_encoded);

        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(signing_input.as_bytes());
        let signature = mac.finalize().into_bytes();
        let signature_encoded = general_purpose::URL_SAFE_NO_PAD.encode(signature);

        format!("{}.{}", signing_input, signature_encoded)
    }

    pub fn create_expired_token(user: &TestUser, secret: &str) -> String {
        Self::create_test_token(user, secret, Some(-1))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

pub struct MockPortalResponses;

impl MockPortalResponses {
    pub fn login_response(user: &TestUser, access_token: &str) -> Value {
        json!({
            "access_token": access_token,
            "token_type": "bearer",
            "user_id": user.id,
            "email": user.email,
            "full_name": user.full_name,
            "role": user.role.to_string()
        })
    }

    pub fn appointment_response(id: i64, patient_id: i64, doctor_id: i64, status: &str) -> Value {
        json!({
            "id": id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "appointment_time": "2024-12-25T10:00:00",
            "end_time": "2024-12-25T10:30:00",
            "status": status,
            "reason": "Annual checkup",
            "symptoms": null,
            "diagnosis": null,
            "created_at": "2024-12-01T09:00:00",
            "calendar_event_id": null,
            "doctor_name": "Dr. Test",
            "patient_name": "Test Patient"
        })
    }

    pub fn availability_response(doctor_id: i64, doctor_name: &str) -> Value {
        json!([{
            "doctor_id": doctor_id,
            "doctor_name": doctor_name,
            "available_slots": [
                { "start_time": "2024-12-26T09:00:00", "end_time": "2024-12-26T09:30:00" },
                { "start_time": "2024-12-26T10:00:00", "end_time": "2024-12-26T10:30:00" }
            ]
        }])
    }

    pub fn stats_response(total: u32, completed: u32, scheduled: u32, cancelled: u32) -> Value {
        json!({
            "total": total,
            "completed": completed,
            "scheduled": scheduled,
            "cancelled": cancelled
        })
    }

    pub fn report_response(doctor_id: i64, doctor_name: &str) -> Value {
        json!({
            "doctor_id": doctor_id,
            "doctor_name": doctor_name,
            "report_date": "2024-12-31T18:00:00",
            "appointment_stats": Self::stats_response(10, 6, 3, 1),
            "daily_breakdown": [
                { "date": "2024-12-30", "count": 4 },
                { "date": "2024-12-31", "count": 6 }
            ],
            "common_conditions": [
                { "condition": "Hypertension", "count": 4 },
                { "condition": "Migraine", "count": 2 }
            ],
            "summary": "Steady week with mostly routine follow-ups."
        })
    }

    pub fn chat_response(reply: &str, history: Value) -> Value {
        json!({
            "response": reply,
            "conversation_history": history
        })
    }

    pub fn error_response(message: &str) -> Value {
        json!({ "detail": message })
    }
}
