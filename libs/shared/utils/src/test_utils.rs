use std::sync::Arc;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};

use shared_config::{AppConfig, StoreBackend};
use shared_database::{DocumentStore, MemoryStore};
use shared_models::auth::AccessClaims;

use crate::state::AppState;

pub struct TestConfig {
    pub jwt_secret: String,
    pub supabase_url: String,
    pub supabase_service_key: String,
}

impl Default for TestConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "test-secret-key-for-jwt-validation-must-be-long-enough".to_string(),
            supabase_url: "http://localhost:54321".to_string(),
            supabase_service_key: "test-service-key".to_string(),
        }
    }
}

impl TestConfig {
    pub fn to_app_config(&self) -> AppConfig {
        AppConfig {
            port: 5000,
            store_backend: StoreBackend::Memory,
            supabase_url: self.supabase_url.clone(),
            supabase_service_key: self.supabase_service_key.clone(),
            access_token_secret: self.jwt_secret.clone(),
            seed_file: None,
        }
    }

    pub fn to_state(&self, store: Arc<dyn DocumentStore>) -> Arc<AppState> {
        AppState::new(self.to_app_config(), store)
    }

    pub fn to_memory_state(&self, store: MemoryStore) -> Arc<AppState> {
        self.to_state(Arc::new(store))
    }
}

pub struct JwtTestUtils;

impl JwtTestUtils {
    pub fn create_test_token(email: &str, secret: &str, exp_hours: Option<i64>) -> String {
        let now = Utc::now();
        let exp = now + Duration::hours(exp_hours.unwrap_or(1));

        let claims = AccessClaims {
            email: email.to_string(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
        };

        encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
            .expect("HMAC can take key of any size")
    }

    pub fn create_expired_token(email: &str, secret: &str) -> String {
        Self::create_test_token(email, secret, Some(-2))
    }

    pub fn create_invalid_signature_token(email: &str) -> String {
        Self::create_test_token(email, "wrong-secret", Some(1))
    }

    pub fn create_malformed_token() -> String {
        "invalid.token.format".to_string()
    }
}

pub struct Fixtures;

impl Fixtures {
    pub fn treatment_option(name: &str, slots: &[&str]) -> Value {
        json!({
            "name": name,
            "slots": slots
        })
    }

    pub fn booking(treatment: &str, appointment_date: &str, slot: &str, email: &str) -> Value {
        json!({
            "treatment": treatment,
            "appointmentDate": appointment_date,
            "slot": slot,
            "email": email,
            "patient": "Test Patient",
            "phone": "+15550000000"
        })
    }

    pub fn user(email: &str) -> Value {
        json!({
            "name": "Test Patient",
            "email": email,
            "role": "patient"
        })
    }
}
