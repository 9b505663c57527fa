// libs/appointment-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Extension, Query, State},
    Json,
};
use tracing::debug;

use shared_models::auth::{AccessClaims, EmailQuery};
use shared_models::error::AppError;
use shared_utils::AppState;

use crate::models::{AvailabilityQuery, AvailabilityView, Booking, BookingOutcome};
use crate::services::availability::AvailabilityStrategy;
use crate::services::booking::BookingService;

/// Remaining slots per treatment for `?date=`, computed by strategy `S`.
pub async fn appointment_options<S>(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AvailabilityQuery>,
) -> Result<Json<Vec<AvailabilityView>>, AppError>
where
    S: AvailabilityStrategy + Default,
{
    debug!("Listing appointment options for {}", query.date);

    let views = S::default()
        .appointment_options(state.store.as_ref(), &query.date)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(views))
}

pub async fn get_bookings(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<AccessClaims>,
    Query(query): Query<EmailQuery>,
) -> Result<Json<Vec<Booking>>, AppError> {
    // Patients may only read their own bookings
    if claims.email != query.email {
        return Err(AppError::Auth("forbidden access".to_string()));
    }

    let bookings = BookingService::new(&state)
        .bookings_for_email(&query.email)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(bookings))
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(booking): Json<Booking>,
) -> Result<Json<BookingOutcome>, AppError> {
    let outcome = BookingService::new(&state)
        .create_booking(booking)
        .await
        .map_err(|e| AppError::Database(e.to_string()))?;

    Ok(Json(outcome))
}
