pub mod approval;
pub mod booking;
pub mod fee_slab;
pub mod show;
pub mod ticket_inventory;
pub mod user;

pub use approval::ApprovalRecord;
pub use booking::{Booking, BookingStatus, BookingTransition, NewBooking, ShowRevenue, TransitionOutcome};
pub use fee_slab::{FeeSlab, FeeSlabInput};
pub use show::{AdminShowUpdate, CreateShowRequest, DeleteShowOutcome, NewShow, Show, ShowDetails, UpdateShowRequest};
pub use ticket_inventory::TicketInventory;
pub use user::{ApprovalStatus, OnboardRequest, Role, User};

/// A status/role column held a value the enum does not know about.
#[derive(Debug, thiserror::Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    kind: &'static str,
    value: String,
}

impl UnknownVariant {
    pub fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}
