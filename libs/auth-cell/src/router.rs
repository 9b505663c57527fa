use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};

use shared_utils::AppState;

use crate::handlers;

pub fn auth_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/jwt", get(handlers::issue_access_token))
        .route("/users", post(handlers::register_user))
        .with_state(state)
}
