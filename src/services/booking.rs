use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::models::{Booking, BookingStatus, NewBooking};
use crate::services::fee_calculator::{fallback_fraction, platform_fee, round_money};
use crate::services::payment_gateway::{to_minor_units, OrderNotes, OrderRequest, PaymentGateway, PaymentOrder};
use crate::store::Store;
use bigdecimal::BigDecimal;
use chrono::Utc;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingRequest {
    pub show_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct BookingCreated {
    pub booking: Booking,
    /// `None` for free shows, which are confirmed on the spot.
    pub payment_order: Option<PaymentOrder>,
}

pub struct BookingService {
    store: Arc<dyn Store>,
    gateway: Arc<dyn PaymentGateway>,
    config: Arc<Config>,
}

impl BookingService {
    pub fn new(store: Arc<dyn Store>, gateway: Arc<dyn PaymentGateway>, config: Arc<Config>) -> Self {
        Self { store, gateway, config }
    }

    pub async fn create_booking(&self, user_id: Uuid, request: CreateBookingRequest) -> AppResult<BookingCreated> {
        info!(
            "🎟️ Booking request: user {} wants {} ticket(s) for show {}",
            user_id, request.quantity, request.show_id
        );

        if request.quantity <= 0 {
            return Err(AppError::validation("quantity must be greater than 0"));
        }

        let details = self
            .store
            .find_show(request.show_id)
            .await?
            .filter(|d| d.show.is_published)
            .ok_or_else(|| AppError::not_found("Show not found"))?;
        let show = &details.show;

        let now = Utc::now();
        if !show.is_upcoming(now) {
            return Err(AppError::business("cannot book past shows"));
        }
        if request.quantity > details.inventory.available {
            return Err(AppError::business("not enough tickets available"));
        }
        if self.store.find_user(user_id).await?.is_none() {
            warn!("User {} tried to book before onboarding", user_id);
            return Err(AppError::forbidden("Complete onboarding before booking"));
        }

        let quantity = BigDecimal::from(request.quantity);
        let total_amount = round_money(&(&show.ticket_price * &quantity));
        let booking_id = Uuid::new_v4();

        let new_booking = if show.is_free() {
            NewBooking {
                id: booking_id,
                show_id: show.id,
                user_id,
                quantity: request.quantity,
                total_amount,
                platform_fee: BigDecimal::from(0),
                booking_fee: BigDecimal::from(0),
                status: BookingStatus::Confirmed,
                payment_id: None,
            }
        } else {
            let provisional_fee = platform_fee(&total_amount, &fallback_fraction());
            let booking_fee = round_money(&(&self.config.booking_fee_per_ticket * &quantity));
            NewBooking {
                id: booking_id,
                show_id: show.id,
                user_id,
                quantity: request.quantity,
                total_amount,
                platform_fee: provisional_fee,
                booking_fee,
                status: BookingStatus::Pending,
                payment_id: None,
            }
        };

        // The order is opened before anything is written, so a gateway failure leaves no trace.
        let payment_order = match new_booking.status {
            BookingStatus::Pending => Some(self.open_order(&new_booking).await?),
            _ => None,
        };
        let new_booking = NewBooking {
            payment_id: payment_order.as_ref().map(|o| o.id.clone()),
            ..new_booking
        };

        let booking = match self.store.reserve_booking(&new_booking).await? {
            Some(booking) => booking,
            None => {
                if let Some(order) = &payment_order {
                    warn!("Inventory ran out under gateway order {}; order left unused", order.id);
                }
                return Err(AppError::business("not enough tickets available"));
            }
        };

        info!(
            "✅ Booking {} created as {} for show {} ({} ticket(s))",
            booking.id, booking.status, booking.show_id, booking.quantity
        );

        Ok(BookingCreated { booking, payment_order })
    }

    async fn open_order(&self, booking: &NewBooking) -> AppResult<PaymentOrder> {
        let amount = &booking.total_amount + &booking.booking_fee;
        let request = OrderRequest {
            amount: to_minor_units(&amount)?,
            currency: self.config.payment_currency.clone(),
            receipt: Booking::generate_receipt(Utc::now()),
            notes: OrderNotes {
                show_id: booking.show_id,
                user_id: booking.user_id,
                quantity: booking.quantity,
            },
        };

        self.gateway.create_order(&request).await.map_err(|e| {
            error!("Payment order via {} failed: {:#}", self.gateway.name(), e);
            AppError::Internal(e.context("Could not open a payment order"))
        })
    }

    pub async fn list_bookings(&self, user_id: Uuid, show_id: Option<Uuid>) -> AppResult<Vec<Booking>> {
        Ok(self.store.list_user_bookings(user_id, show_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BookingTransition, TicketInventory};
    use crate::services::payment_gateway::OfflineGateway;
    use crate::services::test_support::{seed_show, seed_user, test_config, FailingGateway, RecordingGateway};
    use crate::store::MemoryStore;
    use chrono::Duration;
    use futures::future::join_all;
    use std::str::FromStr;

    fn service(store: Arc<MemoryStore>) -> BookingService {
        BookingService::new(store, Arc::new(OfflineGateway), Arc::new(test_config()))
    }

    async fn inventory(store: &MemoryStore, show_id: Uuid) -> TicketInventory {
        store.find_show(show_id).await.unwrap().unwrap().inventory
    }

    #[tokio::test]
    async fn reserves_then_refuses_when_short() {
        let store = Arc::new(MemoryStore::new());
        let show = seed_show(&store, "100", 5, Duration::days(3)).await;
        let bookings = service(store.clone());

        let created = bookings
            .create_booking(seed_user(&store).await, CreateBookingRequest { show_id: show.id, quantity: 3 })
            .await
            .unwrap();
        assert_eq!(created.booking.status, BookingStatus::Pending);
        assert_eq!(created.booking.total_amount, BigDecimal::from(300));
        assert_eq!(created.booking.platform_fee, BigDecimal::from(24));
        assert_eq!(created.booking.payment_id, created.payment_order.map(|o| o.id));

        let inv = inventory(&store, show.id).await;
        assert_eq!((inv.available, inv.locked), (2, 3));

        let err = bookings
            .create_booking(seed_user(&store).await, CreateBookingRequest { show_id: show.id, quantity: 3 })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Business(ref m) if m == "not enough tickets available"));

        let inv = inventory(&store, show.id).await;
        assert_eq!((inv.available, inv.locked), (2, 3));
    }

    #[tokio::test]
    async fn past_shows_cannot_be_booked() {
        let store = Arc::new(MemoryStore::new());
        let show = seed_show(&store, "100", 5, Duration::days(-1)).await;
        let user_id = Uuid::new_v4();

        let err = service(store.clone())
            .create_booking(user_id, CreateBookingRequest { show_id: show.id, quantity: 1 })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Business(ref m) if m == "cannot book past shows"));

        assert!(store.list_user_bookings(user_id, None).await.unwrap().is_empty());
        let inv = inventory(&store, show.id).await;
        assert_eq!((inv.available, inv.locked), (5, 0));
    }

    #[tokio::test]
    async fn rejects_non_positive_quantity() {
        let store = Arc::new(MemoryStore::new());
        let show = seed_show(&store, "100", 5, Duration::days(3)).await;

        for quantity in [0, -2] {
            let err = service(store.clone())
                .create_booking(Uuid::new_v4(), CreateBookingRequest { show_id: show.id, quantity })
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn unknown_or_unpublished_show_is_not_found() {
        let store = Arc::new(MemoryStore::new());
        let show = seed_show(&store, "100", 5, Duration::days(3)).await;
        store
            .admin_update_show(
                show.id,
                &crate::models::AdminShowUpdate { is_published: Some(false), is_disbursed: None },
            )
            .await
            .unwrap();

        for show_id in [show.id, Uuid::new_v4()] {
            let err = service(store.clone())
                .create_booking(Uuid::new_v4(), CreateBookingRequest { show_id, quantity: 1 })
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::NotFound(_)));
        }
    }

    #[tokio::test]
    async fn gateway_failure_persists_nothing() {
        let store = Arc::new(MemoryStore::new());
        let show = seed_show(&store, "100", 5, Duration::days(3)).await;
        let user_id = seed_user(&store).await;
        let bookings = BookingService::new(store.clone(), Arc::new(FailingGateway), Arc::new(test_config()));

        let err = bookings
            .create_booking(user_id, CreateBookingRequest { show_id: show.id, quantity: 2 })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Internal(_)));

        assert!(store.list_user_bookings(user_id, None).await.unwrap().is_empty());
        let inv = inventory(&store, show.id).await;
        assert_eq!((inv.available, inv.locked), (5, 0));
    }

    #[tokio::test]
    async fn free_shows_confirm_without_a_gateway_order() {
        let store = Arc::new(MemoryStore::new());
        let show = seed_show(&store, "0", 10, Duration::days(3)).await;
        let gateway = Arc::new(RecordingGateway::default());
        let bookings = BookingService::new(store.clone(), gateway.clone(), Arc::new(test_config()));

        let created = bookings
            .create_booking(seed_user(&store).await, CreateBookingRequest { show_id: show.id, quantity: 4 })
            .await
            .unwrap();

        assert_eq!(created.booking.status, BookingStatus::Confirmed);
        assert!(created.payment_order.is_none());
        assert_eq!(gateway.requests().len(), 0);

        let inv = inventory(&store, show.id).await;
        assert_eq!((inv.available, inv.locked), (6, 0));
    }

    #[tokio::test]
    async fn gateway_is_charged_total_plus_booking_fee() {
        let store = Arc::new(MemoryStore::new());
        let show = seed_show(&store, "250.50", 10, Duration::days(3)).await;
        let gateway = Arc::new(RecordingGateway::default());
        let mut config = test_config();
        config.booking_fee_per_ticket = BigDecimal::from_str("10").unwrap();
        let bookings = BookingService::new(store.clone(), gateway.clone(), Arc::new(config));

        let created = bookings
            .create_booking(seed_user(&store).await, CreateBookingRequest { show_id: show.id, quantity: 2 })
            .await
            .unwrap();

        assert_eq!(created.booking.booking_fee, BigDecimal::from(20));
        let requests = gateway.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].amount, 52100);
        assert_eq!(requests[0].notes.quantity, 2);
        assert_eq!(requests[0].currency, "INR");
    }

    #[tokio::test]
    async fn concurrent_bookings_never_oversell() {
        let store = Arc::new(MemoryStore::new());
        let show = seed_show(&store, "100", 10, Duration::days(3)).await;

        let mut buyers = Vec::new();
        for _ in 0..25 {
            buyers.push(seed_user(&store).await);
        }

        let attempts = buyers.into_iter().enumerate().map(|(i, user_id)| {
            let bookings = service(store.clone());
            let quantity = 1 + (i as i32 % 3);
            async move {
                bookings
                    .create_booking(user_id, CreateBookingRequest { show_id: show.id, quantity })
                    .await
                    .map(|created| created.booking.quantity)
            }
        });
        let results = join_all(attempts).await;

        let reserved: i32 = results.iter().filter_map(|r| r.as_ref().ok()).sum();
        assert!(reserved <= 10);

        let inv = inventory(&store, show.id).await;
        assert_eq!(inv.locked, reserved);
        assert_eq!(inv.available + inv.locked, 10);
    }

    #[tokio::test]
    async fn lists_the_callers_bookings_newest_first() {
        let store = Arc::new(MemoryStore::new());
        let first = seed_show(&store, "100", 10, Duration::days(3)).await;
        let second = seed_show(&store, "100", 10, Duration::days(4)).await;
        let user_id = seed_user(&store).await;
        let bookings = service(store.clone());

        for show_id in [first.id, second.id, first.id] {
            bookings
                .create_booking(user_id, CreateBookingRequest { show_id, quantity: 1 })
                .await
                .unwrap();
        }
        bookings
            .create_booking(seed_user(&store).await, CreateBookingRequest { show_id: first.id, quantity: 1 })
            .await
            .unwrap();

        assert_eq!(bookings.list_bookings(user_id, None).await.unwrap().len(), 3);
        let for_first = bookings.list_bookings(user_id, Some(first.id)).await.unwrap();
        assert_eq!(for_first.len(), 2);
        assert!(for_first[0].created_at >= for_first[1].created_at);

        // cancelling one releases only its own tickets
        store
            .transition_booking(for_first[0].id, &BookingTransition::to(BookingStatus::Cancelled))
            .await
            .unwrap();
        let inv = inventory(&store, first.id).await;
        assert_eq!((inv.available, inv.locked), (8, 2));
    }

    #[tokio::test]
    async fn callers_without_a_profile_cannot_book() {
        let store = Arc::new(MemoryStore::new());
        let show = seed_show(&store, "100", 5, Duration::days(3)).await;
        let gateway = Arc::new(RecordingGateway::default());
        let bookings = BookingService::new(store.clone(), gateway.clone(), Arc::new(test_config()));

        // admin sessions carry the nil id and never onboard
        for user_id in [Uuid::nil(), Uuid::new_v4()] {
            let err = bookings
                .create_booking(user_id, CreateBookingRequest { show_id: show.id, quantity: 1 })
                .await
                .unwrap_err();
            assert!(matches!(err, AppError::Forbidden(ref m) if m == "Complete onboarding before booking"));
            assert!(store.list_user_bookings(user_id, None).await.unwrap().is_empty());
        }

        assert!(gateway.requests().is_empty());
        let inv = inventory(&store, show.id).await;
        assert_eq!((inv.available, inv.locked), (5, 0));
    }

    #[tokio::test]
    async fn store_refuses_bookings_for_unknown_users() {
        let store = MemoryStore::new();
        let show = seed_show(&store, "100", 5, Duration::days(3)).await;
        let booking = NewBooking {
            id: Uuid::new_v4(),
            show_id: show.id,
            user_id: Uuid::new_v4(),
            quantity: 1,
            total_amount: BigDecimal::from(100),
            platform_fee: BigDecimal::from(8),
            booking_fee: BigDecimal::from(0),
            status: BookingStatus::Pending,
            payment_id: Some("order_orphan".to_string()),
        };

        assert!(store.reserve_booking(&booking).await.is_err());
        let inv = inventory(&store, show.id).await;
        assert_eq!((inv.available, inv.locked), (5, 0));
    }
}
