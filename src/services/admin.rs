use crate::error::{AppError, AppResult};
use crate::models::{
    AdminShowUpdate, ApprovalRecord, ApprovalStatus, Booking, BookingStatus, BookingTransition, FeeSlab,
    FeeSlabInput, Show, TransitionOutcome, User,
};
use crate::services::fee_calculator::{self, round_money, validate_percent, validate_slabs, FeeSchedule, Payout};
use crate::store::Store;
use bigdecimal::BigDecimal;
use log::info;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveAction {
    /// Hand the tickets over without a captured payment.
    ConfirmUnpaid,
    Cancel,
}

impl ResolveAction {
    fn target(&self) -> BookingStatus {
        match self {
            ResolveAction::ConfirmUnpaid => BookingStatus::ConfirmedUnpaid,
            ResolveAction::Cancel => BookingStatus::Cancelled,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreatorFeeUpdate {
    pub user: User,
    pub shows_updated: u64,
}

pub struct AdminService {
    store: Arc<dyn Store>,
}

fn checked_percent(percent: Option<BigDecimal>) -> AppResult<Option<BigDecimal>> {
    match percent {
        Some(percent) => {
            validate_percent(&percent).map_err(AppError::Validation)?;
            Ok(Some(round_money(&percent)))
        }
        None => Ok(None),
    }
}

impl AdminService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    pub async fn list_creators(&self, status: Option<ApprovalStatus>) -> AppResult<Vec<User>> {
        Ok(self.store.list_creators(status).await?)
    }

    pub async fn approve_creator(&self, admin_id: Uuid, user_id: Uuid) -> AppResult<(User, ApprovalRecord)> {
        let result = self
            .store
            .record_approval(user_id, admin_id, ApprovalStatus::Approved, None)
            .await?
            .ok_or_else(|| AppError::not_found("Creator not found"))?;

        info!("✅ Creator {} approved", user_id);
        Ok(result)
    }

    pub async fn reject_creator(&self, admin_id: Uuid, user_id: Uuid, reason: &str) -> AppResult<(User, ApprovalRecord)> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(AppError::validation("A rejection reason is required"));
        }

        let result = self
            .store
            .record_approval(user_id, admin_id, ApprovalStatus::Rejected, Some(reason))
            .await?
            .ok_or_else(|| AppError::not_found("Creator not found"))?;

        info!("🚫 Creator {} rejected: {}", user_id, reason);
        Ok(result)
    }

    pub async fn approval_history(&self, user_id: Uuid) -> AppResult<Vec<ApprovalRecord>> {
        Ok(self.store.approval_history(user_id).await?)
    }

    /// Sets (or clears) a creator's override and copies it onto every show of
    /// theirs that has not been paid out yet.
    pub async fn set_creator_platform_fee(&self, user_id: Uuid, percent: Option<BigDecimal>) -> AppResult<CreatorFeeUpdate> {
        let percent = checked_percent(percent)?;

        let (user, shows_updated) = self
            .store
            .set_creator_platform_fee(user_id, percent.as_ref())
            .await?
            .ok_or_else(|| AppError::not_found("Creator not found"))?;

        info!(
            "💰 Creator {} platform fee set to {:?}; {} show(s) updated",
            user_id, percent, shows_updated
        );
        Ok(CreatorFeeUpdate { user, shows_updated })
    }

    pub async fn set_show_platform_fee(&self, show_id: Uuid, percent: Option<BigDecimal>) -> AppResult<Show> {
        let percent = checked_percent(percent)?;

        let show = self
            .store
            .set_show_platform_fee(show_id, percent.as_ref())
            .await?
            .ok_or_else(|| AppError::not_found("Show not found"))?;

        info!("💰 Show {} platform fee set to {:?}", show_id, percent);
        Ok(show)
    }

    pub async fn moderate_show(&self, show_id: Uuid, update: AdminShowUpdate) -> AppResult<Show> {
        if update.is_published.is_none() && update.is_disbursed.is_none() {
            return Err(AppError::validation("Nothing to update"));
        }

        let show = self
            .store
            .admin_update_show(show_id, &update)
            .await?
            .ok_or_else(|| AppError::not_found("Show not found"))?;

        info!(
            "🛠️ Show {} moderated: published={}, disbursed={}",
            show.id, show.is_published, show.is_disbursed
        );
        Ok(show)
    }

    pub async fn payout(&self, show_id: Uuid) -> AppResult<Payout> {
        let details = self
            .store
            .find_show(show_id)
            .await?
            .ok_or_else(|| AppError::not_found("Show not found"))?;
        let revenue = self.store.show_revenue(show_id).await?;

        Ok(fee_calculator::payout(&details.show, revenue))
    }

    /// Manually settles a PENDING booking, e.g. one paid outside the gateway.
    pub async fn resolve_booking(&self, booking_id: Uuid, action: ResolveAction) -> AppResult<Booking> {
        match self
            .store
            .transition_booking(booking_id, &BookingTransition::to(action.target()))
            .await?
        {
            TransitionOutcome::Applied(booking) => {
                info!("🛠️ Booking {} resolved as {}", booking.id, booking.status);
                Ok(booking)
            }
            TransitionOutcome::AlreadyProcessed => Err(AppError::business("booking is no longer pending")),
            TransitionOutcome::NotFound => Err(AppError::not_found("Booking not found")),
        }
    }

    pub async fn fee_slabs(&self) -> AppResult<Vec<FeeSlab>> {
        Ok(self.store.fee_slabs().await?)
    }

    /// Replaces the slab table and re-derives the default percentage of every
    /// un-disbursed show from it.
    pub async fn replace_fee_slabs(&self, slabs: Vec<FeeSlabInput>) -> AppResult<Vec<FeeSlab>> {
        validate_slabs(&slabs).map_err(AppError::Validation)?;

        let saved = self.store.replace_fee_slabs(&slabs).await?;
        let schedule = FeeSchedule::new(saved.clone());

        let mut resynced = 0;
        for show in self.store.list_undisbursed_shows().await? {
            let percent = schedule.default_percent_for_price(&show.ticket_price);
            if percent != show.platform_fee_percent {
                self.store.set_show_default_fee(show.id, &percent).await?;
                resynced += 1;
            }
        }

        info!("💰 Fee slabs replaced ({} slab(s)); {} show(s) resynced", saved.len(), resynced);
        Ok(saved)
    }
}
