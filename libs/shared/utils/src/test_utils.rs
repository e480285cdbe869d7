use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};
use chrono::{Duration, Utc};
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use uuid::Uuid;

use shared_config::AppConfig;
use shared_models::auth::User;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_anon_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "test-anon-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            supabase_url: self.supabase_url.clone(),
            supabase_anon_key: self.supabase_anon_key.clone(),
            supabase_jwt_secret: self.jwt_secret.clone(),
        }
    }

    pub fn to_arc(&self) -> Arc<AppConfig> {
        Arc::new(self.to_app_config())
    }
}

pub struct TestUser {
    pub id: String,
    pub email: String,
    pub role: String,
}

impl Default for TestUser {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: "test@example.com".to_string(),
            role: "patient".to_string(),
        }
    }
}

impl TestUser {
    pub fn new(email: &str, role: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            role: role.to_string(),
        }
    }

    pub fn doctor(email: &str) -> Self {
        Self::new(email, "doctor")
    }

    pub fn patient(email: &str) -> Self {
        Self::new(email, "patient")
    }

    pub fn admin(email: &str) -> Self {
        Self::new(email, "admin")
    }

    pub fn to_user(&self) -> User {
        User {
            id: self.id.clone(),
            email: Some(self.email.clone()),
            role: Some(self.role.clone()),
            metadata: None,
            created_at: Some(Utc::now()),
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
            "sub": user.id,
            "email": user.email,
            "role": user.role,
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
}

/// Canned PostgREST rows for the clinic store tables, shaped exactly like
/// the responses the scheduling services deserialize.
pub struct MockStoreResponses;

impl MockStoreResponses {
    pub fn user_response(id: &str, full_name: &str, email: &str, role: &str) -> Value {
        json!({
            "id": id,
            "full_name": full_name,
            "email": email,
            "role": role,
            "is_active": true
        })
    }

    pub fn doctor_profile_response(
        user_id: &str,
        department_id: &str,
        room_id: Option<&str>,
    ) -> Value {
        json!({
            "id": Uuid::new_v4().to_string(),
            "user_id": user_id,
            "department_id": department_id,
            "room_id": room_id,
            "specialization": "Cardiology"
        })
    }

    pub fn department_response(id: &str, name: &str, health_examination_fee: f64) -> Value {
        json!({
            "id": id,
            "name": name,
            "icon": "❤️",
            "health_examination_fee": health_examination_fee,
            "is_active": true
        })
    }

    pub fn service_response(id: &str, department_id: &str, name: &str, price: f64) -> Value {
        json!({
            "id": id,
            "department_id": department_id,
            "name": name,
            "price": price,
            "is_active": true
        })
    }

    pub fn room_response(id: &str, room_number: &str, department_id: Option<&str>) -> Value {
        json!({
            "id": id,
            "room_number": room_number,
            "floor": 1,
            "department_id": department_id,
            "is_active": true
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn appointment_response(
        id: &str,
        patient_id: &str,
        doctor_id: &str,
        department_id: &str,
        date: &str,
        time: &str,
        status: &str,
        estimated_fee: f64,
    ) -> Value {
        let now = Utc::now().to_rfc3339();
        json!({
            "id": id,
            "patient_id": patient_id,
            "doctor_id": doctor_id,
            "department_id": department_id,
            "service_id": null,
            "room_id": null,
            "appointment_date": date,
            "appointment_time": time,
            "status": status,
            "symptoms": null,
            "reason": null,
            "notes": null,
            "estimated_fee": estimated_fee,
            "cancellation_reason": null,
            "cancelled_at": null,
            "rescheduled_from": null,
            "created_at": now,
            "updated_at": now
        })
    }
}
