// libs/appointment-cell/src/services/booking.rs
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use shared_database::{DocumentStore, Filter};
use shared_utils::AppState;

use crate::models::{Booking, BookingOutcome, BOOKINGS_COLLECTION};

pub struct BookingService {
    store: Arc<dyn DocumentStore>,
}

impl BookingService {
    pub fn new(state: &AppState) -> Self {
        Self {
            store: Arc::clone(&state.store),
        }
    }

    /// Bookings whose `email` equals the given address, in store order.
    pub async fn bookings_for_email(&self, email: &str) -> Result<Vec<Booking>> {
        debug!("Fetching bookings for {}", email);

        let rows = self
            .store
            .find(BOOKINGS_COLLECTION, &Filter::new().eq("email", email))
            .await?;

        rows.into_iter()
            .map(|row| serde_json::from_value(row).context("malformed booking document"))
            .collect()
    }

    /// Inserts the booking unless the patient already holds one for the same
    /// treatment on the same date.
    pub async fn create_booking(&self, mut booking: Booking) -> Result<BookingOutcome> {
        booking.id = None;

        let key = Filter::new()
            .eq("appointmentDate", booking.appointment_date.as_str())
            .eq("email", booking.email.as_str())
            .eq("treatment", booking.treatment.as_str());
        let document = serde_json::to_value(&booking)?;

        match self
            .store
            .insert_one_unless_exists(BOOKINGS_COLLECTION, document, &key)
            .await?
        {
            Some(ack) => {
                info!(
                    "Booked {} at {} on {} ({})",
                    booking.treatment, booking.slot, booking.appointment_date, ack.inserted_id
                );
                Ok(BookingOutcome::Created(ack))
            }
            None => {
                info!(
                    "Rejected duplicate {} booking on {}",
                    booking.treatment, booking.appointment_date
                );
                Ok(BookingOutcome::duplicate(&booking.appointment_date))
            }
        }
    }
}
