// libs/appointment-cell/src/router.rs
use std::sync::Arc;

use axum::{
    Router,
    routing::get,
    middleware,
};

use shared_utils::AppState;
use shared_utils::extractor::auth_middleware;

use crate::handlers;
use crate::services::availability::{InProcessStrategy, StorePipelineStrategy};

pub fn appointment_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route(
            "/appointmentOptions",
            get(handlers::appointment_options::<InProcessStrategy>),
        )
        .route(
            "/v2/appointmentOptions",
            get(handlers::appointment_options::<StorePipelineStrategy>),
        )
        // Only the listing is protected; creating a booking is public
        .route(
            "/bookings",
            get(handlers::get_bookings)
                .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware))
                .post(handlers::create_booking),
        )
        .with_state(state)
}
