use super::Store;
use crate::models::booking::record_webhook_event_in_tx;
use crate::models::{
    AdminShowUpdate, ApprovalRecord, ApprovalStatus, Booking, BookingStatus, BookingTransition,
    DeleteShowOutcome, FeeSlab, FeeSlabInput, NewBooking, NewShow, OnboardRequest, Show, ShowDetails,
    ShowRevenue, TicketInventory, TransitionOutcome, UpdateShowRequest, User,
};
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use log::{info, warn};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn attach_inventory(&self, shows: Vec<Show>) -> Result<Vec<ShowDetails>> {
        let ids: Vec<Uuid> = shows.iter().map(|s| s.id).collect();
        let mut inventories: HashMap<Uuid, TicketInventory> = TicketInventory::find_by_shows(&self.pool, &ids)
            .await?
            .into_iter()
            .map(|inv| (inv.show_id, inv))
            .collect();

        shows
            .into_iter()
            .map(|show| {
                let inventory = inventories
                    .remove(&show.id)
                    .ok_or_else(|| anyhow!("Show {} has no inventory row", show.id))?;
                Ok(ShowDetails { show, inventory })
            })
            .collect()
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        User::find_by_id(&self.pool, id).await
    }

    async fn upsert_user(&self, id: Uuid, request: &OnboardRequest) -> Result<User> {
        User::upsert(&self.pool, id, request).await
    }

    async fn list_creators(&self, status: Option<ApprovalStatus>) -> Result<Vec<User>> {
        User::find_creators(&self.pool, status).await
    }

    async fn record_approval(
        &self,
        user_id: Uuid,
        admin_id: Uuid,
        decision: ApprovalStatus,
        reason: Option<&str>,
    ) -> Result<Option<(User, ApprovalRecord)>> {
        let mut tx = self.pool.begin().await?;

        let user = match User::set_approval_status_in_tx(&mut tx, user_id, decision).await? {
            Some(user) => user,
            None => return Ok(None),
        };
        let record = ApprovalRecord::create_in_tx(&mut tx, user_id, admin_id, decision, reason).await?;

        tx.commit().await?;
        Ok(Some((user, record)))
    }

    async fn approval_history(&self, user_id: Uuid) -> Result<Vec<ApprovalRecord>> {
        ApprovalRecord::find_by_user(&self.pool, user_id).await
    }

    async fn set_creator_platform_fee(
        &self,
        user_id: Uuid,
        percent: Option<&BigDecimal>,
    ) -> Result<Option<(User, u64)>> {
        let mut tx = self.pool.begin().await?;

        let user = match User::set_custom_platform_fee_in_tx(&mut tx, user_id, percent).await? {
            Some(user) => user,
            None => return Ok(None),
        };
        let shows_updated = Show::propagate_creator_fee_in_tx(&mut tx, user_id, percent).await?;

        tx.commit().await?;
        Ok(Some((user, shows_updated)))
    }

    async fn create_show(&self, new_show: &NewShow) -> Result<ShowDetails> {
        let mut tx = self.pool.begin().await?;

        let show = Show::create_in_tx(&mut tx, new_show).await?;
        let inventory = TicketInventory::create_in_tx(&mut tx, show.id, show.total_tickets).await?;

        tx.commit().await?;
        Ok(ShowDetails { show, inventory })
    }

    async fn find_show(&self, id: Uuid) -> Result<Option<ShowDetails>> {
        let show = match Show::find_by_id(&self.pool, id).await? {
            Some(show) => show,
            None => return Ok(None),
        };
        let inventory = TicketInventory::find_by_show(&self.pool, id)
            .await?
            .ok_or_else(|| anyhow!("Show {} has no inventory row", id))?;

        Ok(Some(ShowDetails { show, inventory }))
    }

    async fn list_published_upcoming(&self, search: Option<&str>, now: DateTime<Utc>) -> Result<Vec<ShowDetails>> {
        let shows = Show::find_published_upcoming(&self.pool, search, now).await?;
        self.attach_inventory(shows).await
    }

    async fn list_creator_shows(&self, created_by: Uuid) -> Result<Vec<ShowDetails>> {
        let shows = Show::find_by_creator(&self.pool, created_by).await?;
        self.attach_inventory(shows).await
    }

    async fn list_undisbursed_shows(&self) -> Result<Vec<Show>> {
        Show::find_undisbursed(&self.pool).await
    }

    async fn update_show(&self, id: Uuid, update: &UpdateShowRequest) -> Result<Option<Show>> {
        Show::update(&self.pool, id, update).await
    }

    async fn admin_update_show(&self, id: Uuid, update: &AdminShowUpdate) -> Result<Option<Show>> {
        Show::admin_update(&self.pool, id, update).await
    }

    async fn set_show_platform_fee(&self, id: Uuid, percent: Option<&BigDecimal>) -> Result<Option<Show>> {
        Show::set_custom_platform_fee(&self.pool, id, percent).await
    }

    async fn set_show_default_fee(&self, id: Uuid, percent: &BigDecimal) -> Result<()> {
        Show::set_platform_fee_percent(&self.pool, id, percent).await
    }

    async fn delete_show(&self, id: Uuid) -> Result<DeleteShowOutcome> {
        Show::delete_if_unbooked(&self.pool, id).await
    }

    async fn fee_slabs(&self) -> Result<Vec<FeeSlab>> {
        FeeSlab::find_all(&self.pool).await
    }

    async fn replace_fee_slabs(&self, slabs: &[FeeSlabInput]) -> Result<Vec<FeeSlab>> {
        FeeSlab::replace_all(&self.pool, slabs).await
    }

    async fn reserve_booking(&self, booking: &NewBooking) -> Result<Option<Booking>> {
        let mut tx = self.pool.begin().await?;

        let inventory = match booking.status {
            BookingStatus::Pending => {
                TicketInventory::reserve_in_tx(&mut tx, booking.show_id, booking.quantity).await?
            }
            BookingStatus::Confirmed => {
                TicketInventory::sell_in_tx(&mut tx, booking.show_id, booking.quantity).await?
            }
            other => bail!("Bookings cannot be created in status {}", other),
        };

        if inventory.is_none() {
            // dropping the transaction rolls it back
            return Ok(None);
        }

        let saved = Booking::insert_in_tx(&mut tx, booking).await?;
        tx.commit().await?;

        Ok(Some(saved))
    }

    async fn find_booking(&self, id: Uuid) -> Result<Option<Booking>> {
        Booking::find_by_id(&self.pool, id).await
    }

    async fn find_pending_booking_by_payment(&self, payment_id: &str) -> Result<Option<Booking>> {
        Booking::find_pending_by_payment_id(&self.pool, payment_id).await
    }

    async fn find_booking_by_payment(&self, payment_id: &str) -> Result<Option<Booking>> {
        Booking::find_latest_by_payment_id(&self.pool, payment_id).await
    }

    async fn list_user_bookings(&self, user_id: Uuid, show_id: Option<Uuid>) -> Result<Vec<Booking>> {
        Booking::find_by_user(&self.pool, user_id, show_id).await
    }

    async fn list_pending_created_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>> {
        Booking::find_pending_created_before(&self.pool, cutoff).await
    }

    async fn transition_booking(&self, id: Uuid, transition: &BookingTransition) -> Result<TransitionOutcome> {
        if transition.to == BookingStatus::Pending {
            bail!("A booking cannot transition back to PENDING");
        }

        let mut tx = self.pool.begin().await?;

        if let Some(event_id) = &transition.event_id {
            if !record_webhook_event_in_tx(&mut tx, event_id).await? {
                info!("Gateway event {} already processed, skipping", event_id);
                return Ok(TransitionOutcome::AlreadyProcessed);
            }
        }

        let booking = match Booking::transition_in_tx(&mut tx, id, transition).await? {
            Some(booking) => booking,
            None => {
                drop(tx);
                return match Booking::find_by_id(&self.pool, id).await? {
                    Some(current) => {
                        warn!(
                            "Booking {} is {} and cannot move to {}",
                            id, current.status, transition.to
                        );
                        Ok(TransitionOutcome::AlreadyProcessed)
                    }
                    None => Ok(TransitionOutcome::NotFound),
                };
            }
        };

        if transition.to.releases_inventory() {
            TicketInventory::release_locked_in_tx(&mut tx, booking.show_id, booking.quantity).await?;
        } else {
            TicketInventory::settle_locked_in_tx(&mut tx, booking.show_id, booking.quantity).await?;
        }

        tx.commit().await?;
        Ok(TransitionOutcome::Applied(booking))
    }

    async fn show_revenue(&self, show_id: Uuid) -> Result<ShowRevenue> {
        Booking::revenue_for_show(&self.pool, show_id).await
    }
}
