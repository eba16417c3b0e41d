use crate::error::{AppError, AppResult};
use crate::models::{CreateShowRequest, DeleteShowOutcome, NewShow, ShowDetails, UpdateShowRequest, User};
use crate::services::fee_calculator::{round_money, FeeSchedule};
use crate::store::Store;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use log::{info, warn};
use std::sync::Arc;
use uuid::Uuid;

/// Who is looking at a show; decides whether unpublished shows are visible.
#[derive(Debug, Clone, Copy)]
pub struct Viewer {
    pub user_id: Uuid,
    pub is_admin: bool,
}

pub struct ShowService {
    store: Arc<dyn Store>,
}

fn validate_date(date: DateTime<Utc>) -> AppResult<()> {
    if date <= Utc::now() {
        return Err(AppError::validation("date must be in the future"));
    }
    Ok(())
}

fn non_blank(field: &str, value: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::validation(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

impl ShowService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Lists a new (unpublished) show. The creator's fee override, if any,
    /// is copied onto the show; otherwise the tier for its price applies.
    pub async fn create_show(&self, creator: &User, request: CreateShowRequest) -> AppResult<ShowDetails> {
        if !creator.is_approved_creator() {
            return Err(AppError::forbidden("Only approved organizers and comedians can list shows"));
        }

        if request.total_tickets <= 0 {
            return Err(AppError::validation("total_tickets must be greater than 0"));
        }
        if request.ticket_price < BigDecimal::from(0) {
            return Err(AppError::validation("ticket_price cannot be negative"));
        }
        validate_date(request.date)?;

        let request = CreateShowRequest {
            title: non_blank("title", &request.title)?,
            venue: non_blank("venue", &request.venue)?,
            description: request.description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
            ticket_price: round_money(&request.ticket_price),
            ..request
        };

        let schedule = FeeSchedule::new(self.store.fee_slabs().await?);
        let new_show = NewShow {
            id: Uuid::new_v4(),
            created_by: creator.id,
            platform_fee_percent: schedule.default_percent_for_price(&request.ticket_price),
            custom_platform_fee: creator.custom_platform_fee.clone(),
            request,
        };

        let details = self.store.create_show(&new_show).await?;
        info!(
            "🎤 Show {} '{}' listed by {} ({} tickets at {})",
            details.show.id, details.show.title, creator.id, details.show.total_tickets, details.show.ticket_price
        );
        Ok(details)
    }

    pub async fn list_upcoming(&self, search: Option<&str>) -> AppResult<Vec<ShowDetails>> {
        let search = search.map(str::trim).filter(|s| !s.is_empty());
        Ok(self.store.list_published_upcoming(search, Utc::now()).await?)
    }

    /// Unpublished shows are only visible to their creator and admins.
    pub async fn get_show(&self, id: Uuid, viewer: Option<Viewer>) -> AppResult<ShowDetails> {
        let details = self
            .store
            .find_show(id)
            .await?
            .ok_or_else(|| AppError::not_found("Show not found"))?;

        let privileged = viewer.map_or(false, |v| v.is_admin || v.user_id == details.show.created_by);
        if !details.show.is_published && !privileged {
            return Err(AppError::not_found("Show not found"));
        }
        Ok(details)
    }

    pub async fn list_mine(&self, user_id: Uuid) -> AppResult<Vec<ShowDetails>> {
        Ok(self.store.list_creator_shows(user_id).await?)
    }

    pub async fn update_show(&self, user_id: Uuid, id: Uuid, request: UpdateShowRequest) -> AppResult<ShowDetails> {
        let details = self
            .store
            .find_show(id)
            .await?
            .ok_or_else(|| AppError::not_found("Show not found"))?;
        if details.show.created_by != user_id {
            warn!("User {} attempted to edit show {} they don't own", user_id, id);
            return Err(AppError::forbidden("You can only edit your own shows"));
        }

        if let Some(date) = request.date {
            validate_date(date)?;
        }
        let request = UpdateShowRequest {
            title: request.title.as_deref().map(|t| non_blank("title", t)).transpose()?,
            venue: request.venue.as_deref().map(|v| non_blank("venue", v)).transpose()?,
            description: request.description.map(|d| d.trim().to_string()),
            date: request.date,
        };

        let show = self
            .store
            .update_show(id, &request)
            .await?
            .ok_or_else(|| AppError::not_found("Show not found"))?;

        Ok(ShowDetails {
            show,
            inventory: details.inventory,
        })
    }

    pub async fn delete_show(&self, viewer: Viewer, id: Uuid) -> AppResult<()> {
        let details = self
            .store
            .find_show(id)
            .await?
            .ok_or_else(|| AppError::not_found("Show not found"))?;
        if !viewer.is_admin && details.show.created_by != viewer.user_id {
            warn!("User {} attempted to delete show {} they don't own", viewer.user_id, id);
            return Err(AppError::forbidden("You can only delete your own shows"));
        }

        match self.store.delete_show(id).await? {
            DeleteShowOutcome::Deleted => {
                info!("🗑️ Show {} deleted by {}", id, viewer.user_id);
                Ok(())
            }
            DeleteShowOutcome::NotFound => Err(AppError::not_found("Show not found")),
            DeleteShowOutcome::HasBookings => Err(AppError::business("cannot delete a show that has bookings")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AdminShowUpdate, ApprovalStatus, OnboardRequest, Role};
    use crate::services::booking::{BookingService, CreateBookingRequest};
    use crate::services::payment_gateway::OfflineGateway;
    use crate::services::test_support::{seed_user, test_config};
    use crate::store::MemoryStore;
    use chrono::Duration;
    use std::str::FromStr;

    async fn approved_creator(store: &MemoryStore) -> User {
        let id = Uuid::new_v4();
        store
            .upsert_user(
                id,
                &OnboardRequest {
                    display_name: "Zakir".to_string(),
                    email: None,
                    role: Role::Comedian,
                },
            )
            .await
            .unwrap();
        store
            .record_approval(id, Uuid::nil(), ApprovalStatus::Approved, None)
            .await
            .unwrap()
            .unwrap()
            .0
    }

    fn request(title: &str, price: &str, days: i64) -> CreateShowRequest {
        CreateShowRequest {
            title: title.to_string(),
            description: Some("Crowd work".to_string()),
            date: Utc::now() + Duration::days(days),
            venue: "Canvas Laugh Club".to_string(),
            ticket_price: BigDecimal::from_str(price).unwrap(),
            total_tickets: 50,
        }
    }

    #[tokio::test]
    async fn new_show_gets_inventory_and_tier_percent() {
        let store = Arc::new(MemoryStore::new());
        let creator = approved_creator(&store).await;

        let details = ShowService::new(store.clone())
            .create_show(&creator, request("Tight Five", "250", 5))
            .await
            .unwrap();

        assert!(!details.show.is_published);
        assert_eq!(details.show.platform_fee_percent, BigDecimal::from(7));
        assert_eq!((details.inventory.available, details.inventory.locked), (50, 0));
    }

    #[tokio::test]
    async fn pending_creators_cannot_list() {
        let store = Arc::new(MemoryStore::new());
        let pending = store
            .upsert_user(
                Uuid::new_v4(),
                &OnboardRequest {
                    display_name: "New Comic".to_string(),
                    email: None,
                    role: Role::Comedian,
                },
            )
            .await
            .unwrap();

        let err = ShowService::new(store.clone())
            .create_show(&pending, request("Debut", "100", 5))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn validates_the_listing() {
        let store = Arc::new(MemoryStore::new());
        let creator = approved_creator(&store).await;
        let shows = ShowService::new(store.clone());

        let mut no_tickets = request("Empty Room", "100", 5);
        no_tickets.total_tickets = 0;
        for bad in [request("  ", "100", 5), request("Past", "100", -1), request("Neg", "-1", 5), no_tickets] {
            assert!(matches!(shows.create_show(&creator, bad).await, Err(AppError::Validation(_))));
        }
    }

    #[tokio::test]
    async fn tier_percent_follows_the_stored_price() {
        let store = Arc::new(MemoryStore::new());
        let creator = approved_creator(&store).await;

        // 199.995 rounds up into the 200-400 tier
        let details = ShowService::new(store.clone())
            .create_show(&creator, request("Borderline", "199.995", 5))
            .await
            .unwrap();

        assert_eq!(details.show.ticket_price, BigDecimal::from_str("200.00").unwrap());
        assert_eq!(details.show.platform_fee_percent, BigDecimal::from(7));
    }

    #[tokio::test]
    async fn discovery_hides_unpublished_and_past_shows() {
        let store = Arc::new(MemoryStore::new());
        let creator = approved_creator(&store).await;
        let shows = ShowService::new(store.clone());

        let later = shows.create_show(&creator, request("Late Show", "100", 9)).await.unwrap();
        let sooner = shows.create_show(&creator, request("Early Show", "100", 2)).await.unwrap();
        let hidden = shows.create_show(&creator, request("Secret Show", "100", 4)).await.unwrap();
        for id in [later.show.id, sooner.show.id] {
            store
                .admin_update_show(id, &AdminShowUpdate { is_published: Some(true), is_disbursed: None })
                .await
                .unwrap();
        }

        let listed = shows.list_upcoming(None).await.unwrap();
        let titles: Vec<&str> = listed.iter().map(|d| d.show.title.as_str()).collect();
        assert_eq!(titles, vec!["Early Show", "Late Show"]);

        let searched = shows.list_upcoming(Some("late")).await.unwrap();
        assert_eq!(searched.len(), 1);
        assert!(shows.list_upcoming(Some("%")).await.unwrap().is_empty());
        assert!(shows.list_upcoming(Some("_")).await.unwrap().is_empty());

        assert!(matches!(shows.get_show(hidden.show.id, None).await, Err(AppError::NotFound(_))));
        let owner = Viewer { user_id: creator.id, is_admin: false };
        assert!(shows.get_show(hidden.show.id, Some(owner)).await.is_ok());
    }

    #[tokio::test]
    async fn only_the_owner_edits() {
        let store = Arc::new(MemoryStore::new());
        let creator = approved_creator(&store).await;
        let shows = ShowService::new(store.clone());
        let details = shows.create_show(&creator, request("Draft", "100", 5)).await.unwrap();

        let update = UpdateShowRequest {
            title: Some("Final Draft".to_string()),
            ..UpdateShowRequest::default()
        };
        let err = shows
            .update_show(Uuid::new_v4(), details.show.id, update.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));

        let updated = shows.update_show(creator.id, details.show.id, update).await.unwrap();
        assert_eq!(updated.show.title, "Final Draft");
        assert_eq!(updated.show.venue, "Canvas Laugh Club");
    }

    #[tokio::test]
    async fn shows_with_bookings_cannot_be_deleted() {
        let store = Arc::new(MemoryStore::new());
        let creator = approved_creator(&store).await;
        let shows = ShowService::new(store.clone());
        let owner = Viewer { user_id: creator.id, is_admin: false };

        let booked = shows.create_show(&creator, request("Sold", "100", 5)).await.unwrap();
        store
            .admin_update_show(booked.show.id, &AdminShowUpdate { is_published: Some(true), is_disbursed: None })
            .await
            .unwrap();
        BookingService::new(store.clone(), Arc::new(OfflineGateway), Arc::new(test_config()))
            .create_booking(seed_user(&store).await, CreateBookingRequest { show_id: booked.show.id, quantity: 1 })
            .await
            .unwrap();

        let err = shows.delete_show(owner, booked.show.id).await.unwrap_err();
        assert!(matches!(err, AppError::Business(_)));

        let empty = shows.create_show(&creator, request("Cancelled", "100", 5)).await.unwrap();
        let stranger = Viewer { user_id: Uuid::new_v4(), is_admin: false };
        assert!(matches!(shows.delete_show(stranger, empty.show.id).await, Err(AppError::Forbidden(_))));

        shows.delete_show(owner, empty.show.id).await.unwrap();
        assert!(store.find_show(empty.show.id).await.unwrap().is_none());
    }
}
