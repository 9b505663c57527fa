pub mod availability;
pub mod booking;

pub use availability::{AvailabilityStrategy, InProcessStrategy, StorePipelineStrategy, compute_availability};
pub use booking::BookingService;
