use std::sync::Arc;

use axum::{
    extract::{Query, State, Json},
    http::StatusCode,
};
use serde_json::Value;
use tracing::{debug, info};

use shared_database::{Filter, InsertOneResult};
use shared_models::auth::{EmailQuery, TokenResponse};
use shared_models::error::AppError;
use shared_utils::AppState;
use shared_utils::jwt::issue_token;

pub const USERS_COLLECTION: &str = "users";
pub const USER_COLUMNS: &[&str] = &["_id", "email"];

/// Hands out a one-hour access token to registered users only.
pub async fn issue_access_token(
    State(state): State<Arc<AppState>>,
    Query(query): Query<EmailQuery>,
) -> Result<(StatusCode, Json<TokenResponse>), AppError> {
    debug!("Token requested for {}", query.email);

    let user = state
        .store
        .find_one(USERS_COLLECTION, &Filter::new().eq("email", query.email.as_str()))
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    if user.is_none() {
        debug!("No user registered for {}", query.email);
        return Ok((StatusCode::FORBIDDEN, Json(TokenResponse::empty())));
    }

    let access_token = issue_token(&query.email, &state.config.access_token_secret)
        .map_err(|e| AppError::Internal(e.to_string()))?;

    Ok((StatusCode::OK, Json(TokenResponse { access_token })))
}

pub async fn register_user(
    State(state): State<Arc<AppState>>,
    Json(user): Json<Value>,
) -> Result<Json<InsertOneResult>, AppError> {
    if !user.is_object() {
        return Err(AppError::BadRequest("user must be a JSON object".to_string()));
    }

    let ack = state
        .store
        .insert_one(USERS_COLLECTION, user)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    info!("Registered user {}", ack.inserted_id);
    Ok(Json(ack))
}
