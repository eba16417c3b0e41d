use super::Store;
use crate::models::{
    AdminShowUpdate, ApprovalRecord, ApprovalStatus, Booking, BookingStatus, BookingTransition,
    DeleteShowOutcome, FeeSlab, FeeSlabInput, NewBooking, NewShow, OnboardRequest, Show, ShowDetails,
    ShowRevenue, TicketInventory, TransitionOutcome, UpdateShowRequest, User,
};
use crate::services::fee_calculator::default_fee_slabs;
use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

#[derive(Default)]
struct MemoryState {
    users: HashMap<Uuid, User>,
    approvals: Vec<ApprovalRecord>,
    shows: HashMap<Uuid, Show>,
    inventory: HashMap<Uuid, TicketInventory>,
    bookings: HashMap<Uuid, Booking>,
    fee_slabs: Vec<FeeSlab>,
    processed_events: HashSet<String>,
}

impl MemoryState {
    fn details(&self, show: &Show) -> Result<ShowDetails> {
        let inventory = self
            .inventory
            .get(&show.id)
            .cloned()
            .ok_or_else(|| anyhow!("Show {} has no inventory row", show.id))?;
        Ok(ShowDetails {
            show: show.clone(),
            inventory,
        })
    }
}

/// Process-local store. Each operation runs under a single lock acquisition,
/// which gives it the same all-or-nothing behaviour as a Postgres transaction.
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let state = MemoryState {
            fee_slabs: default_fee_slabs(),
            ..MemoryState::default()
        };
        Self {
            state: Mutex::new(state),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| anyhow!("In-memory store lock poisoned"))
    }

    /// Removes a show's inventory row so later transitions on it fail.
    #[cfg(test)]
    pub(crate) fn drop_inventory(&self, show_id: Uuid) {
        if let Ok(mut state) = self.lock() {
            state.inventory.remove(&show_id);
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn upsert_user(&self, id: Uuid, request: &OnboardRequest) -> Result<User> {
        let mut state = self.lock()?;
        let now = Utc::now();
        let initial_status = if request.role.is_creator() {
            ApprovalStatus::Pending
        } else {
            ApprovalStatus::Approved
        };

        let user = match state.users.get(&id) {
            Some(existing) => User {
                display_name: request.display_name.clone(),
                email: request.email.clone(),
                approval_status: if existing.role == request.role {
                    existing.approval_status
                } else {
                    initial_status
                },
                role: request.role,
                updated_at: now,
                ..existing.clone()
            },
            None => User {
                id,
                display_name: request.display_name.clone(),
                email: request.email.clone(),
                role: request.role,
                approval_status: initial_status,
                custom_platform_fee: None,
                created_at: now,
                updated_at: now,
            },
        };

        state.users.insert(id, user.clone());
        Ok(user)
    }

    async fn list_creators(&self, status: Option<ApprovalStatus>) -> Result<Vec<User>> {
        let state = self.lock()?;
        let mut creators: Vec<User> = state
            .users
            .values()
            .filter(|u| u.role.is_creator())
            .filter(|u| status.map_or(true, |s| u.approval_status == s))
            .cloned()
            .collect();
        creators.sort_by_key(|u| u.created_at);
        Ok(creators)
    }

    async fn record_approval(
        &self,
        user_id: Uuid,
        admin_id: Uuid,
        decision: ApprovalStatus,
        reason: Option<&str>,
    ) -> Result<Option<(User, ApprovalRecord)>> {
        let mut state = self.lock()?;
        let now = Utc::now();

        let user = match state.users.get_mut(&user_id) {
            Some(user) if user.role.is_creator() => {
                user.approval_status = decision;
                user.updated_at = now;
                user.clone()
            }
            _ => return Ok(None),
        };

        let record = ApprovalRecord {
            id: Uuid::new_v4(),
            user_id,
            admin_id,
            decision,
            reason: reason.map(str::to_string),
            created_at: now,
        };
        state.approvals.push(record.clone());

        Ok(Some((user, record)))
    }

    async fn approval_history(&self, user_id: Uuid) -> Result<Vec<ApprovalRecord>> {
        let state = self.lock()?;
        let mut records: Vec<ApprovalRecord> = state
            .approvals
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        records.reverse();
        Ok(records)
    }

    async fn set_creator_platform_fee(
        &self,
        user_id: Uuid,
        percent: Option<&BigDecimal>,
    ) -> Result<Option<(User, u64)>> {
        let mut state = self.lock()?;
        let now = Utc::now();

        let user = match state.users.get_mut(&user_id) {
            Some(user) if user.role.is_creator() => {
                user.custom_platform_fee = percent.cloned();
                user.updated_at = now;
                user.clone()
            }
            _ => return Ok(None),
        };

        let mut updated = 0;
        for show in state.shows.values_mut() {
            if show.created_by == user_id && !show.is_disbursed {
                show.custom_platform_fee = percent.cloned();
                show.updated_at = now;
                updated += 1;
            }
        }

        Ok(Some((user, updated)))
    }

    async fn create_show(&self, new_show: &NewShow) -> Result<ShowDetails> {
        let mut state = self.lock()?;
        let now = Utc::now();
        let request = &new_show.request;

        let show = Show {
            id: new_show.id,
            title: request.title.clone(),
            description: request.description.clone(),
            date: request.date,
            venue: request.venue.clone(),
            ticket_price: request.ticket_price.clone(),
            total_tickets: request.total_tickets,
            created_by: new_show.created_by,
            is_published: false,
            is_disbursed: false,
            custom_platform_fee: new_show.custom_platform_fee.clone(),
            platform_fee_percent: new_show.platform_fee_percent.clone(),
            created_at: now,
            updated_at: now,
        };
        let inventory = TicketInventory::new(show.id, show.total_tickets);

        state.shows.insert(show.id, show.clone());
        state.inventory.insert(show.id, inventory.clone());

        Ok(ShowDetails { show, inventory })
    }

    async fn find_show(&self, id: Uuid) -> Result<Option<ShowDetails>> {
        let state = self.lock()?;
        state.shows.get(&id).map(|show| state.details(show)).transpose()
    }

    async fn list_published_upcoming(&self, search: Option<&str>, now: DateTime<Utc>) -> Result<Vec<ShowDetails>> {
        let state = self.lock()?;
        let needle = search.map(|s| s.trim().to_lowercase());

        let mut shows: Vec<&Show> = state
            .shows
            .values()
            .filter(|s| s.is_published && s.date > now)
            .filter(|s| match &needle {
                Some(n) => s.title.to_lowercase().contains(n) || s.venue.to_lowercase().contains(n),
                None => true,
            })
            .collect();
        shows.sort_by_key(|s| s.date);

        shows.into_iter().map(|show| state.details(show)).collect()
    }

    async fn list_creator_shows(&self, created_by: Uuid) -> Result<Vec<ShowDetails>> {
        let state = self.lock()?;
        let mut shows: Vec<&Show> = state.shows.values().filter(|s| s.created_by == created_by).collect();
        shows.sort_by(|a, b| b.date.cmp(&a.date));

        shows.into_iter().map(|show| state.details(show)).collect()
    }

    async fn list_undisbursed_shows(&self) -> Result<Vec<Show>> {
        let state = self.lock()?;
        Ok(state.shows.values().filter(|s| !s.is_disbursed).cloned().collect())
    }

    async fn update_show(&self, id: Uuid, update: &UpdateShowRequest) -> Result<Option<Show>> {
        let mut state = self.lock()?;
        let Some(show) = state.shows.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(title) = &update.title {
            show.title = title.clone();
        }
        if let Some(description) = &update.description {
            show.description = Some(description.clone());
        }
        if let Some(date) = update.date {
            show.date = date;
        }
        if let Some(venue) = &update.venue {
            show.venue = venue.clone();
        }
        show.updated_at = Utc::now();

        Ok(Some(show.clone()))
    }

    async fn admin_update_show(&self, id: Uuid, update: &AdminShowUpdate) -> Result<Option<Show>> {
        let mut state = self.lock()?;
        let Some(show) = state.shows.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(is_published) = update.is_published {
            show.is_published = is_published;
        }
        if let Some(is_disbursed) = update.is_disbursed {
            show.is_disbursed = is_disbursed;
        }
        show.updated_at = Utc::now();

        Ok(Some(show.clone()))
    }

    async fn set_show_platform_fee(&self, id: Uuid, percent: Option<&BigDecimal>) -> Result<Option<Show>> {
        let mut state = self.lock()?;
        let Some(show) = state.shows.get_mut(&id) else {
            return Ok(None);
        };

        show.custom_platform_fee = percent.cloned();
        show.updated_at = Utc::now();
        Ok(Some(show.clone()))
    }

    async fn set_show_default_fee(&self, id: Uuid, percent: &BigDecimal) -> Result<()> {
        let mut state = self.lock()?;
        if let Some(show) = state.shows.get_mut(&id) {
            show.platform_fee_percent = percent.clone();
            show.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn delete_show(&self, id: Uuid) -> Result<DeleteShowOutcome> {
        let mut state = self.lock()?;
        if !state.shows.contains_key(&id) {
            return Ok(DeleteShowOutcome::NotFound);
        }
        if state.bookings.values().any(|b| b.show_id == id) {
            return Ok(DeleteShowOutcome::HasBookings);
        }

        state.shows.remove(&id);
        state.inventory.remove(&id);
        Ok(DeleteShowOutcome::Deleted)
    }

    async fn fee_slabs(&self) -> Result<Vec<FeeSlab>> {
        Ok(self.lock()?.fee_slabs.clone())
    }

    async fn replace_fee_slabs(&self, slabs: &[FeeSlabInput]) -> Result<Vec<FeeSlab>> {
        let mut state = self.lock()?;
        state.fee_slabs = slabs
            .iter()
            .enumerate()
            .map(|(position, slab)| FeeSlab {
                id: Uuid::new_v4(),
                position: position as i32,
                min_price: slab.min_price.clone(),
                max_price: slab.max_price.clone(),
                fee: slab.fee.clone(),
            })
            .collect();
        Ok(state.fee_slabs.clone())
    }

    async fn reserve_booking(&self, booking: &NewBooking) -> Result<Option<Booking>> {
        let mut state = self.lock()?;
        let now = Utc::now();

        if !state.users.contains_key(&booking.user_id) {
            bail!("Booking {} references missing user {}", booking.id, booking.user_id);
        }

        let inventory = state
            .inventory
            .get_mut(&booking.show_id)
            .ok_or_else(|| anyhow!("Show {} has no inventory row", booking.show_id))?;

        if inventory.available < booking.quantity {
            return Ok(None);
        }

        match booking.status {
            BookingStatus::Pending => {
                inventory.available -= booking.quantity;
                inventory.locked += booking.quantity;
            }
            BookingStatus::Confirmed => {
                inventory.available -= booking.quantity;
            }
            other => bail!("Bookings cannot be created in status {}", other),
        }
        inventory.updated_at = now;

        let saved = Booking {
            id: booking.id,
            show_id: booking.show_id,
            user_id: booking.user_id,
            quantity: booking.quantity,
            total_amount: booking.total_amount.clone(),
            platform_fee: booking.platform_fee.clone(),
            booking_fee: booking.booking_fee.clone(),
            status: booking.status,
            payment_id: booking.payment_id.clone(),
            created_at: now,
            updated_at: now,
        };
        state.bookings.insert(saved.id, saved.clone());

        Ok(Some(saved))
    }

    async fn find_booking(&self, id: Uuid) -> Result<Option<Booking>> {
        Ok(self.lock()?.bookings.get(&id).cloned())
    }

    async fn find_pending_booking_by_payment(&self, payment_id: &str) -> Result<Option<Booking>> {
        let state = self.lock()?;
        Ok(state
            .bookings
            .values()
            .find(|b| b.status == BookingStatus::Pending && b.payment_id.as_deref() == Some(payment_id))
            .cloned())
    }

    async fn find_booking_by_payment(&self, payment_id: &str) -> Result<Option<Booking>> {
        let state = self.lock()?;
        Ok(state
            .bookings
            .values()
            .filter(|b| b.payment_id.as_deref() == Some(payment_id))
            .max_by_key(|b| b.created_at)
            .cloned())
    }

    async fn list_user_bookings(&self, user_id: Uuid, show_id: Option<Uuid>) -> Result<Vec<Booking>> {
        let state = self.lock()?;
        let mut bookings: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| b.user_id == user_id && show_id.map_or(true, |id| b.show_id == id))
            .cloned()
            .collect();
        bookings.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(bookings)
    }

    async fn list_pending_created_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Booking>> {
        let state = self.lock()?;
        let mut bookings: Vec<Booking> = state
            .bookings
            .values()
            .filter(|b| b.status == BookingStatus::Pending && b.created_at < cutoff)
            .cloned()
            .collect();
        bookings.sort_by_key(|b| b.created_at);
        Ok(bookings)
    }

    async fn transition_booking(&self, id: Uuid, transition: &BookingTransition) -> Result<TransitionOutcome> {
        if transition.to == BookingStatus::Pending {
            bail!("A booking cannot transition back to PENDING");
        }

        let mut state = self.lock()?;
        let now = Utc::now();

        if let Some(event_id) = &transition.event_id {
            if state.processed_events.contains(event_id) {
                return Ok(TransitionOutcome::AlreadyProcessed);
            }
        }

        let (show_id, quantity) = match state.bookings.get(&id) {
            None => return Ok(TransitionOutcome::NotFound),
            Some(b) if b.status != BookingStatus::Pending => return Ok(TransitionOutcome::AlreadyProcessed),
            Some(b) => (b.show_id, b.quantity),
        };

        let inventory = state
            .inventory
            .get_mut(&show_id)
            .ok_or_else(|| anyhow!("Show {} has no inventory row", show_id))?;
        if inventory.locked < quantity {
            bail!("Locked inventory for show {} is below {}", show_id, quantity);
        }
        inventory.locked -= quantity;
        if transition.to.releases_inventory() {
            inventory.available += quantity;
        }
        inventory.updated_at = now;

        let booking = state
            .bookings
            .get_mut(&id)
            .ok_or_else(|| anyhow!("Booking {} vanished mid-transition", id))?;
        booking.status = transition.to;
        if let Some(payment_id) = &transition.payment_id {
            booking.payment_id = Some(payment_id.clone());
        }
        if let Some(platform_fee) = &transition.platform_fee {
            booking.platform_fee = platform_fee.clone();
        }
        booking.updated_at = now;
        let booking = booking.clone();

        if let Some(event_id) = &transition.event_id {
            state.processed_events.insert(event_id.clone());
        }

        Ok(TransitionOutcome::Applied(booking))
    }

    async fn show_revenue(&self, show_id: Uuid) -> Result<ShowRevenue> {
        let state = self.lock()?;
        let mut revenue = ShowRevenue::default();
        for booking in state
            .bookings
            .values()
            .filter(|b| b.show_id == show_id && b.status == BookingStatus::Confirmed)
        {
            revenue.tickets_sold += i64::from(booking.quantity);
            revenue.gross_revenue += &booking.total_amount;
            revenue.platform_fees += &booking.platform_fee;
        }
        Ok(revenue)
    }
}
