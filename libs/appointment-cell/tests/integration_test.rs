use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use appointment_cell::models::{BOOKINGS_COLLECTION, TREATMENT_OPTIONS_COLLECTION};
use appointment_cell::router::appointment_routes;
use shared_database::MemoryStore;
use shared_utils::test_utils::{Fixtures, JwtTestUtils, TestConfig};

fn create_test_app() -> Router {
    let store = MemoryStore::new()
        .with_collection(
            TREATMENT_OPTIONS_COLLECTION,
            vec![
                Fixtures::treatment_option("Cleaning", &["08:00", "09:00", "10:00"]),
                Fixtures::treatment_option("Filling", &["13:00", "14:00"]),
            ],
        )
        .with_collection(
            BOOKINGS_COLLECTION,
            vec![
                Fixtures::booking("Cleaning", "2023-01-01", "09:00", "patient@example.com"),
                Fixtures::booking("Filling", "2023-01-02", "13:00", "other@example.com"),
            ],
        );

    appointment_routes(TestConfig::default().to_memory_state(store))
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_booking(body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/bookings")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_appointment_options_endpoint() {
    let app = create_test_app();

    let response = app
        .oneshot(get("/appointmentOptions?date=2023-01-01", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!([
            { "name": "Cleaning", "slots": ["08:00", "10:00"] },
            { "name": "Filling", "slots": ["13:00", "14:00"] }
        ])
    );
}

#[tokio::test]
async fn test_v2_endpoint_matches_v1() {
    let app = create_test_app();

    for date in ["2023-01-01", "2023-01-02"] {
        let v1 = app
            .clone()
            .oneshot(get(&format!("/appointmentOptions?date={}", date), None))
            .await
            .unwrap();
        let v2 = app
            .clone()
            .oneshot(get(&format!("/v2/appointmentOptions?date={}", date), None))
            .await
            .unwrap();

        assert_eq!(v2.status(), StatusCode::OK);
        assert_eq!(body_json(v1).await, body_json(v2).await);
    }
}

#[tokio::test]
async fn test_appointment_options_without_date_is_rejected() {
    let app = create_test_app();

    let response = app.oneshot(get("/appointmentOptions", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_bookings_without_token_unauthorized() {
    let app = create_test_app();

    let response = app
        .oneshot(get("/bookings?email=patient@example.com", None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_bookings_with_bad_tokens_unauthorized() {
    let app = create_test_app();
    let secret = TestConfig::default().jwt_secret;

    let tokens = [
        JwtTestUtils::create_malformed_token(),
        JwtTestUtils::create_invalid_signature_token("patient@example.com"),
        JwtTestUtils::create_expired_token("patient@example.com", &secret),
    ];

    for token in tokens {
        let response = app
            .clone()
            .oneshot(get("/bookings?email=patient@example.com", Some(&token)))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}

#[tokio::test]
async fn test_bookings_for_other_email_unauthorized() {
    let app = create_test_app();
    let token = JwtTestUtils::create_test_token("other@example.com", &TestConfig::default().jwt_secret, None);

    let response = app
        .oneshot(get("/bookings?email=patient@example.com", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["error"], "forbidden access");
}

#[tokio::test]
async fn test_bookings_with_valid_token() {
    let app = create_test_app();
    let token = JwtTestUtils::create_test_token("patient@example.com", &TestConfig::default().jwt_secret, None);

    let response = app
        .oneshot(get("/bookings?email=patient@example.com", Some(&token)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let bookings = body_json(response).await;
    assert_eq!(bookings.as_array().unwrap().len(), 1);
    assert_eq!(bookings[0]["treatment"], "Cleaning");
    assert_eq!(bookings[0]["appointmentDate"], "2023-01-01");
}

#[tokio::test]
async fn test_post_booking_then_duplicate() {
    let app = create_test_app();
    let booking = Fixtures::booking("Filling", "2023-01-01", "14:00", "new@example.com");

    let first = app.clone().oneshot(post_booking(booking.clone())).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let first = body_json(first).await;
    assert_eq!(first["acknowledged"], true);
    assert!(first["insertedId"].is_string());

    let second = app.clone().oneshot(post_booking(booking)).await.unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    let second = body_json(second).await;
    assert_eq!(second["acknowledged"], false);
    assert_eq!(second["message"], "You already have a booking on 2023-01-01");

    let options = app
        .oneshot(get("/v2/appointmentOptions?date=2023-01-01", None))
        .await
        .unwrap();
    assert_eq!(body_json(options).await[1]["slots"], json!(["13:00"]));
}

#[tokio::test]
async fn test_post_booking_does_not_need_token() {
    let app = create_test_app();

    let response = app
        .oneshot(post_booking(Fixtures::booking("Cleaning", "2023-02-01", "08:00", "walkin@example.com")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}
