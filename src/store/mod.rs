//! Persistence boundary. Every mutation of shows, inventory and bookings goes
//! through a [`Store`], so the conditional-update discipline lives in one place
//! per backend.

pub mod memory;
pub mod postgres;

use crate::models::{
    AdminShowUpdate, ApprovalRecord, ApprovalStatus, Booking, BookingTransition, DeleteShowOutcome,
    FeeSlab, FeeSlabInput, NewBooking, NewShow, OnboardRequest, Show, ShowDetails, ShowRevenue,
    TransitionOutcome, UpdateShowRequest, User,
};
use anyhow::Result;
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[async_trait]
pub trait Store: Send + Sync {
    // users
    async fn find_user(&self, id: Uuid) -> Result<Option<User>>;
    async fn upsert_user(&self, id: Uuid, request: &OnboardRequest) -> Result<User>;
    async fn list_creators(&self, status: Option<ApprovalStatus>) -> Result<Vec<User>>;
    /// Sets a creator's approval status and appends the audit row in one unit.
    /// `None` if the user does not exist or is not a creator.
    async fn record_approval(
        &self,
        user_id: Uuid,
        admin_id: Uuid,
        decision: ApprovalStatus,
        reason: Option<&str>,
    ) -> Result<Option<(User, ApprovalRecord)>>;
    async fn approval_history(&self, user_id: Uuid) -> Result<Vec<ApprovalRecord>>;
    /// Sets the creator override and copies it onto their un-disbursed shows.
    /// Returns the user and the number of shows updated.
    async fn set_creator_platform_fee(
        &self,
        user_id: Uuid,
        percent: Option<&BigDecimal>,
    ) -> Result<Option<(User, u64)>>;

    // shows
    async fn create_show(&self, new_show: &NewShow) -> Result<ShowDetails>;
    async fn find_show(&self, id: Uuid) -> Result<Option<ShowDetails>>;
    async fn list_published_upcoming(&self, search: Option<&str>, now: DateTime<Utc>) -> Result<Vec<ShowDetails>>;
    async fn list_creator_shows(&self, created_by: Uuid) -> Result<Vec<ShowDetails>>;
    async fn list_undisbursed_shows(&self) -> Result<Vec<Show>>;
    async fn update_show(&self, id: Uuid, update: &UpdateShowRequest) -> Result<Option<Show>>;
    async fn admin_update_show(&self, id: Uuid, update: &AdminShowUpdate) -> Result<Option<Show>>;
    async fn set_show_platform_fee(&self, id: Uuid, percent: Option<&BigDecimal>) -> Result<Option<Show>>;
    async fn set_show_default_fee(&self, id: Uuid, percent: &BigDecimal) -> Result<()>;
    async fn delete_show(&self, id: Uuid) -> Result<DeleteShowOutcome>;

    // fee slabs
    async fn fee_slabs(&self) -> Result<Vec<FeeSlab>>;
    async fn replace_fee_slabs(&self, slabs: &[FeeSlabInput]) -> Result<Vec<FeeSlab>>;

    // bookings
    /// Inserts the booking and takes its tickets out of `available` in one atomic
    /// unit: into `locked` for PENDING bookings, straight to sold otherwise.
    /// `None` when the show no longer has `quantity` tickets available.
    async fn reserve_booking(&self, booking: &NewBooking) -> Result<Option<Booking>>;
    async fn find_booking(&self, id: Uuid) -> Result<Option<Booking>>;
    async fn find_pending_booking_by_payment(&self, payment_id: &str) -> Result<Option<Booking>>;
    /// Most recent booking carrying this gateway reference, whatever its status.
    async fn find_booking_by_payment(&self, payment_id: &str) -> Result<Option<Booking>>;
    async fn list_user_bookings(&self, user_id: Uuid, show_id: Option<Uuid>) -> Result<Vec<Booking>>;
    async fn list_pending_created_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>>;
    /// Moves a PENDING booking to `transition.to` and applies the matching
    /// inventory adjustment, only if the booking is still PENDING.
    async fn transition_booking(&self, id: Uuid, transition: &BookingTransition) -> Result<TransitionOutcome>;
    async fn show_revenue(&self, show_id: Uuid) -> Result<ShowRevenue>;
}
