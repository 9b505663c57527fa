use std::sync::Arc;

use axum::{
    Router,
    routing::get,
};

use appointment_cell::router::appointment_routes;
use auth_cell::router::auth_routes;
use shared_utils::AppState;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(|| async { "Hello from doctors portal" }))
        .merge(appointment_routes(state.clone()))
        .merge(auth_routes(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::{Request, StatusCode}};
    use tower::ServiceExt;

    use shared_database::MemoryStore;
    use shared_utils::test_utils::{Fixtures, TestConfig};

    #[tokio::test]
    async fn greets_on_root() {
        let app = create_router(TestConfig::default().to_memory_state(MemoryStore::new()));

        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Hello from doctors portal");
    }

    #[tokio::test]
    async fn token_from_jwt_unlocks_bookings() {
        let store = MemoryStore::new()
            .with_collection("users", vec![Fixtures::user("patient@example.com")])
            .with_collection(
                "bookings",
                vec![Fixtures::booking("Cleaning", "2023-01-01", "08:00", "patient@example.com")],
            );
        let app = create_router(TestConfig::default().to_memory_state(store));

        let response = app
            .clone()
            .oneshot(Request::builder().uri("/jwt?email=patient@example.com").body(Body::empty()).unwrap())
            .await
            .unwrap();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let token: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let token = token["accessToken"].as_str().unwrap().to_string();

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/bookings?email=patient@example.com")
                    .header("authorization", format!("Bearer {}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
