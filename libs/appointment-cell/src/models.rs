// libs/appointment-cell/src/models.rs
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use shared_database::InsertOneResult;

pub const TREATMENT_OPTIONS_COLLECTION: &str = "appointmentOptions";
pub const BOOKINGS_COLLECTION: &str = "bookings";

/// Fields stored as table columns by stores that need a fixed schema.
pub const TREATMENT_OPTION_COLUMNS: &[&str] = &["_id", "name", "slots"];
pub const BOOKING_COLUMNS: &[&str] = &["_id", "treatment", "appointmentDate", "slot", "email"];

// ==============================================================================
// CATALOG
// ==============================================================================

/// A bookable treatment. `name` identifies it; `slots` are time labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreatmentOption {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub slots: Vec<String>,
}

/// Unbooked slots of one treatment on one date. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityView {
    pub name: String,
    #[serde(default)]
    pub slots: Vec<String>,
}

// ==============================================================================
// BOOKINGS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub treatment: String,
    pub appointment_date: String,
    pub slot: String,
    pub email: String,
    /// Patient name, phone and anything else the client sends, stored as-is.
    #[serde(flatten)]
    pub details: Map<String, Value>,
}

/// The part of a booking that occupies a slot. Availability reads bookings
/// through this view so that descriptive fields never have to be present.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookedSlot {
    #[serde(default)]
    pub treatment: Option<String>,
    #[serde(default)]
    pub appointment_date: Option<String>,
    #[serde(default)]
    pub slot: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DuplicateBooking {
    pub acknowledged: bool,
    pub message: String,
}

/// Response of `POST /bookings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BookingOutcome {
    Created(InsertOneResult),
    Duplicate(DuplicateBooking),
}

impl BookingOutcome {
    pub fn duplicate(appointment_date: &str) -> Self {
        BookingOutcome::Duplicate(DuplicateBooking {
            acknowledged: false,
            message: format!("You already have a booking on {}", appointment_date),
        })
    }

    pub fn is_acknowledged(&self) -> bool {
        match self {
            BookingOutcome::Created(ack) => ack.acknowledged,
            BookingOutcome::Duplicate(_) => false,
        }
    }
}

// ==============================================================================
// QUERY PARAMETERS
// ==============================================================================

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: String,
}
