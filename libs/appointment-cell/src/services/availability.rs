// libs/appointment-cell/src/services/availability.rs
use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use shared_database::{DocumentStore, Filter, Pipeline, Stage};

use crate::models::{
    AvailabilityView, BookedSlot, TreatmentOption, BOOKINGS_COLLECTION,
    TREATMENT_OPTIONS_COLLECTION,
};

/// Removes booked slots from every treatment option.
///
/// `date` is compared verbatim against the booking's `appointmentDate`; bookings
/// for any other date, or missing the date, treatment or slot, are ignored. Slot
/// order and catalog order are preserved, and a slot booked more than once is
/// simply absent.
pub fn compute_availability(
    date: &str,
    options: &[TreatmentOption],
    bookings: &[BookedSlot],
) -> Vec<AvailabilityView> {
    let mut booked: HashMap<&str, HashSet<&str>> = HashMap::new();
    for booking in bookings
        .iter()
        .filter(|b| b.appointment_date.as_deref() == Some(date))
    {
        if let (Some(treatment), Some(slot)) = (booking.treatment.as_deref(), booking.slot.as_deref()) {
            booked.entry(treatment).or_default().insert(slot);
        }
    }

    options
        .iter()
        .map(|option| {
            let taken = booked.get(option.name.as_str());
            let slots = option
                .slots
                .iter()
                .filter(|slot| taken.map_or(true, |taken| !taken.contains(slot.as_str())))
                .cloned()
                .collect();

            AvailabilityView {
                name: option.name.clone(),
                slots,
            }
        })
        .collect()
}

/// Pipeline computing the same views inside the store, with `date` bound into
/// the join filter.
pub fn availability_pipeline(date: &str) -> Pipeline {
    Pipeline::new()
        .stage(Stage::Lookup {
            from: BOOKINGS_COLLECTION.to_string(),
            local_field: "name".to_string(),
            foreign_field: "treatment".to_string(),
            filter: Filter::new().eq("appointmentDate", date),
            as_field: "booked".to_string(),
        })
        .stage(Stage::SetDifference {
            field: "slots".to_string(),
            source: "booked".to_string(),
            key: "slot".to_string(),
        })
        .stage(Stage::Project(vec!["name".to_string(), "slots".to_string()]))
}

fn decode_all<T: DeserializeOwned>(rows: Vec<Value>, what: &str) -> Result<Vec<T>> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).with_context(|| format!("malformed {} document", what)))
        .collect()
}

/// One way of answering "which slots are still free on this date".
#[async_trait]
pub trait AvailabilityStrategy: Send + Sync {
    async fn appointment_options(
        &self,
        store: &dyn DocumentStore,
        date: &str,
    ) -> Result<Vec<AvailabilityView>>;
}

/// Fetches the catalog and the day's bookings, then filters in memory.
#[derive(Debug, Default, Clone, Copy)]
pub struct InProcessStrategy;

#[async_trait]
impl AvailabilityStrategy for InProcessStrategy {
    async fn appointment_options(
        &self,
        store: &dyn DocumentStore,
        date: &str,
    ) -> Result<Vec<AvailabilityView>> {
        let catalog_filter = Filter::new();
        let bookings_filter = Filter::new().eq("appointmentDate", date);

        let (options, bookings) = tokio::try_join!(
            store.find(TREATMENT_OPTIONS_COLLECTION, &catalog_filter),
            store.find(BOOKINGS_COLLECTION, &bookings_filter),
        )?;

        let options: Vec<TreatmentOption> = decode_all(options, "treatment option")?;
        let bookings: Vec<BookedSlot> = decode_all(bookings, "booking")?;
        debug!(
            "Computing availability for {} from {} options and {} bookings",
            date,
            options.len(),
            bookings.len()
        );

        Ok(compute_availability(date, &options, &bookings))
    }
}

/// Runs the join and set difference as a store aggregation.
#[derive(Debug, Default, Clone, Copy)]
pub struct StorePipelineStrategy;

#[async_trait]
impl AvailabilityStrategy for StorePipelineStrategy {
    async fn appointment_options(
        &self,
        store: &dyn DocumentStore,
        date: &str,
    ) -> Result<Vec<AvailabilityView>> {
        let rows = store
            .aggregate(TREATMENT_OPTIONS_COLLECTION, &availability_pipeline(date))
            .await?;

        decode_all(rows, "availability")
    }
}
