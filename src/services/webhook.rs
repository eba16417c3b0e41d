use crate::error::{AppError, AppResult};
use crate::models::{Booking, BookingStatus, BookingTransition, TransitionOutcome};
use crate::services::fee_calculator::{platform_fee, FeeSchedule};
use crate::services::payment_gateway::WebhookVerifier;
use crate::store::Store;
use anyhow::anyhow;
use log::{info, warn};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct WebhookEnvelope {
    pub event: String,
    #[serde(default)]
    pub payload: WebhookPayload,
}

#[derive(Debug, Default, Deserialize)]
pub struct WebhookPayload {
    pub payment: Option<PaymentWrapper>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentWrapper {
    pub entity: PaymentEntity,
}

#[derive(Debug, Deserialize)]
pub struct PaymentEntity {
    pub id: String,
    pub order_id: String,
    pub error_description: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EventKind {
    Captured,
    Failed,
    Other,
}

impl EventKind {
    fn parse(event: &str) -> Self {
        match event {
            "payment.captured" => EventKind::Captured,
            "payment.failed" => EventKind::Failed,
            _ => EventKind::Other,
        }
    }

    fn target(&self) -> Option<BookingStatus> {
        match self {
            EventKind::Captured => Some(BookingStatus::Confirmed),
            EventKind::Failed => Some(BookingStatus::Failed),
            EventKind::Other => None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum WebhookOutcome {
    Confirmed(Booking),
    Failed(Booking),
    /// Redelivery of something already handled.
    Duplicate,
    /// An event type this service does not act on.
    Ignored,
}

pub struct WebhookService {
    store: Arc<dyn Store>,
    verifier: WebhookVerifier,
}

impl WebhookService {
    pub fn new(store: Arc<dyn Store>, verifier: WebhookVerifier) -> Self {
        Self { store, verifier }
    }

    /// Verifies and applies one gateway delivery. Nothing in the body is
    /// trusted until the signature over `order_id|payment_id` checks out.
    pub async fn handle(
        &self,
        body: &[u8],
        signature: Option<&str>,
        event_id: Option<&str>,
    ) -> AppResult<WebhookOutcome> {
        let signature = signature
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                warn!("❌ Webhook without signature header");
                AppError::validation("missing webhook signature")
            })?;

        let envelope: WebhookEnvelope = serde_json::from_slice(body).map_err(|e| {
            warn!("❌ Unparseable webhook body: {}", e);
            AppError::validation("invalid webhook payload")
        })?;

        let kind = EventKind::parse(&envelope.event);
        let entity = match (kind, envelope.payload.payment) {
            (_, Some(payment)) => payment.entity,
            (EventKind::Other, None) => {
                info!("Ignoring webhook event {}", envelope.event);
                return Ok(WebhookOutcome::Ignored);
            }
            (_, None) => {
                warn!("❌ {} webhook without a payment entity", envelope.event);
                return Err(AppError::validation("invalid webhook payload"));
            }
        };

        if !self.verifier.verify(&entity.order_id, &entity.id, signature) {
            warn!("❌ Webhook signature mismatch for order {}", entity.order_id);
            return Err(AppError::validation("invalid webhook signature"));
        }

        let event_id = event_id.map(str::trim).filter(|s| !s.is_empty());
        info!(
            "🔔 Webhook {} for order {} (payment {}, event {})",
            envelope.event,
            entity.order_id,
            entity.id,
            event_id.unwrap_or("-")
        );

        match kind {
            EventKind::Captured => self.capture(&entity, event_id).await,
            EventKind::Failed => self.fail(&entity, event_id).await,
            EventKind::Other => {
                info!("Ignoring webhook event {}", envelope.event);
                Ok(WebhookOutcome::Ignored)
            }
        }
    }

    async fn capture(&self, entity: &PaymentEntity, event_id: Option<&str>) -> AppResult<WebhookOutcome> {
        let booking = match self.store.find_pending_booking_by_payment(&entity.order_id).await? {
            Some(booking) => booking,
            None => return self.unmatched(EventKind::Captured, entity).await,
        };

        let details = self
            .store
            .find_show(booking.show_id)
            .await?
            .ok_or_else(|| anyhow!("Booking {} references missing show {}", booking.id, booking.show_id))?;
        let schedule = FeeSchedule::new(self.store.fee_slabs().await?);
        let final_fee = platform_fee(&booking.total_amount, &schedule.effective_fraction(&details.show));

        let transition = BookingTransition {
            to: BookingStatus::Confirmed,
            payment_id: Some(entity.id.clone()),
            platform_fee: Some(final_fee),
            event_id: event_id.map(str::to_string),
        };

        match self.store.transition_booking(booking.id, &transition).await? {
            TransitionOutcome::Applied(booking) => {
                info!(
                    "✅ Booking {} confirmed: {} ticket(s) sold, platform fee {}",
                    booking.id, booking.quantity, booking.platform_fee
                );
                Ok(WebhookOutcome::Confirmed(booking))
            }
            TransitionOutcome::AlreadyProcessed => Ok(WebhookOutcome::Duplicate),
            TransitionOutcome::NotFound => Err(AppError::not_found("Booking not found")),
        }
    }

    async fn fail(&self, entity: &PaymentEntity, event_id: Option<&str>) -> AppResult<WebhookOutcome> {
        let booking = match self.store.find_pending_booking_by_payment(&entity.order_id).await? {
            Some(booking) => booking,
            None => return self.unmatched(EventKind::Failed, entity).await,
        };

        let transition = BookingTransition {
            event_id: event_id.map(str::to_string),
            ..BookingTransition::to(BookingStatus::Failed)
        };

        match self.store.transition_booking(booking.id, &transition).await? {
            TransitionOutcome::Applied(booking) => {
                info!(
                    "↩️ Booking {} failed ({}); {} ticket(s) back on sale",
                    booking.id,
                    entity.error_description.as_deref().unwrap_or("no reason given"),
                    booking.quantity
                );
                Ok(WebhookOutcome::Failed(booking))
            }
            TransitionOutcome::AlreadyProcessed => Ok(WebhookOutcome::Duplicate),
            TransitionOutcome::NotFound => Err(AppError::not_found("Booking not found")),
        }
    }

    /// No PENDING booking carries this order. A booking that already left
    /// PENDING means a redelivery; nothing at all means an unknown order.
    async fn unmatched(&self, kind: EventKind, entity: &PaymentEntity) -> AppResult<WebhookOutcome> {
        let previous = match self.store.find_booking_by_payment(&entity.id).await? {
            Some(booking) => Some(booking),
            None => self.store.find_booking_by_payment(&entity.order_id).await?,
        };

        match previous {
            Some(booking) if kind.target() == Some(booking.status) => {
                info!("Duplicate webhook for booking {} ({}), skipping", booking.id, booking.status);
                Ok(WebhookOutcome::Duplicate)
            }
            Some(booking) => {
                warn!(
                    "⚠️ Payment {} reported for booking {} which is already {}; needs manual reconciliation",
                    entity.id, booking.id, booking.status
                );
                Ok(WebhookOutcome::Duplicate)
            }
            None => {
                warn!("No booking found for order {}", entity.order_id);
                Err(AppError::not_found("Booking not found"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TicketInventory;
    use crate::services::booking::{BookingService, CreateBookingRequest};
    use crate::services::payment_gateway::OfflineGateway;
    use crate::services::test_support::{seed_show, seed_user, test_config, TEST_WEBHOOK_SECRET};
    use crate::store::MemoryStore;
    use bigdecimal::BigDecimal;
    use chrono::Duration;
    use serde_json::json;
    use std::str::FromStr;
    use uuid::Uuid;

    struct Fixture {
        store: Arc<MemoryStore>,
        webhooks: WebhookService,
        signer: WebhookVerifier,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        Fixture {
            webhooks: WebhookService::new(store.clone(), WebhookVerifier::new(TEST_WEBHOOK_SECRET)),
            signer: WebhookVerifier::new(TEST_WEBHOOK_SECRET),
            store,
        }
    }

    impl Fixture {
        async fn book(&self, price: &str, total: i32, quantity: i32) -> Booking {
            let show = seed_show(&self.store, price, total, Duration::days(2)).await;
            BookingService::new(self.store.clone(), Arc::new(OfflineGateway), Arc::new(test_config()))
                .create_booking(seed_user(&self.store).await, CreateBookingRequest { show_id: show.id, quantity })
                .await
                .unwrap()
                .booking
        }

        async fn deliver(&self, event: &str, order_id: &str, payment_id: &str, event_id: Option<&str>) -> AppResult<WebhookOutcome> {
            let body = json!({
                "event": event,
                "payload": { "payment": { "entity": { "id": payment_id, "order_id": order_id } } }
            })
            .to_string();
            let signature = self.signer.sign(order_id, payment_id).unwrap();
            self.webhooks.handle(body.as_bytes(), Some(&signature), event_id).await
        }

        async fn inventory(&self, show_id: Uuid) -> TicketInventory {
            self.store.find_show(show_id).await.unwrap().unwrap().inventory
        }
    }

    fn order_of(booking: &Booking) -> String {
        booking.payment_id.clone().unwrap()
    }

    #[tokio::test]
    async fn capture_confirms_and_sells_locked_tickets() {
        let f = fixture();
        let booking = f.book("100", 10, 2).await;
        let inv = f.inventory(booking.show_id).await;
        assert_eq!((inv.available, inv.locked), (8, 2));

        let outcome = f.deliver("payment.captured", &order_of(&booking), "pay_B", None).await.unwrap();
        let confirmed = match outcome {
            WebhookOutcome::Confirmed(b) => b,
            other => panic!("expected confirmation, got {:?}", other),
        };

        assert_eq!(confirmed.status, BookingStatus::Confirmed);
        assert_eq!(confirmed.payment_id.as_deref(), Some("pay_B"));
        let inv = f.inventory(booking.show_id).await;
        assert_eq!((inv.available, inv.locked), (8, 0));
    }

    #[tokio::test]
    async fn failure_returns_tickets_to_sale() {
        let f = fixture();
        let booking = f.book("100", 10, 4).await;
        let inv = f.inventory(booking.show_id).await;
        assert_eq!((inv.available, inv.locked), (6, 4));

        let outcome = f.deliver("payment.failed", &order_of(&booking), "pay_C", None).await.unwrap();
        assert!(matches!(outcome, WebhookOutcome::Failed(ref b) if b.status == BookingStatus::Failed));

        let inv = f.inventory(booking.show_id).await;
        assert_eq!((inv.available, inv.locked), (10, 0));
    }

    #[tokio::test]
    async fn redelivered_capture_is_a_no_op() {
        let f = fixture();
        let booking = f.book("100", 10, 2).await;
        let order_id = order_of(&booking);

        f.deliver("payment.captured", &order_id, "pay_1", None).await.unwrap();
        let second = f.deliver("payment.captured", &order_id, "pay_1", None).await.unwrap();
        assert!(matches!(second, WebhookOutcome::Duplicate));

        let inv = f.inventory(booking.show_id).await;
        assert_eq!((inv.available, inv.locked), (8, 0));
    }

    #[tokio::test]
    async fn redelivered_failure_is_a_no_op() {
        let f = fixture();
        let booking = f.book("100", 10, 3).await;
        let order_id = order_of(&booking);

        f.deliver("payment.failed", &order_id, "pay_1", None).await.unwrap();
        let second = f.deliver("payment.failed", &order_id, "pay_1", None).await.unwrap();
        assert!(matches!(second, WebhookOutcome::Duplicate));

        let inv = f.inventory(booking.show_id).await;
        assert_eq!((inv.available, inv.locked), (10, 0));
    }

    #[tokio::test]
    async fn seen_event_ids_are_skipped() {
        let f = fixture();
        let first = f.book("100", 10, 1).await;
        let second = f.book("100", 10, 1).await;

        f.deliver("payment.captured", &order_of(&first), "pay_1", Some("evt_1"))
            .await
            .unwrap();
        // same event id on a different booking must not touch it
        let outcome = f
            .deliver("payment.captured", &order_of(&second), "pay_2", Some("evt_1"))
            .await
            .unwrap();
        assert!(matches!(outcome, WebhookOutcome::Duplicate));

        let untouched = f.store.find_booking(second.id).await.unwrap().unwrap();
        assert_eq!(untouched.status, BookingStatus::Pending);
        let inv = f.inventory(second.show_id).await;
        assert_eq!((inv.available, inv.locked), (9, 1));
    }

    #[tokio::test]
    async fn bad_or_missing_signature_changes_nothing() {
        let f = fixture();
        let booking = f.book("100", 10, 2).await;
        let body = json!({
            "event": "payment.captured",
            "payload": { "payment": { "entity": { "id": "pay_x", "order_id": order_of(&booking) } } }
        })
        .to_string();

        let forged = WebhookVerifier::new("not-the-secret").sign(&order_of(&booking), "pay_x").unwrap();
        for signature in [Some(forged.as_str()), Some(""), None] {
            let err = f.webhooks.handle(body.as_bytes(), signature, None).await.unwrap_err();
            assert!(matches!(err, AppError::Validation(_)));
        }

        let still_pending = f.store.find_booking(booking.id).await.unwrap().unwrap();
        assert_eq!(still_pending.status, BookingStatus::Pending);
        let inv = f.inventory(booking.show_id).await;
        assert_eq!((inv.available, inv.locked), (8, 2));
    }

    #[tokio::test]
    async fn garbage_body_is_rejected() {
        let f = fixture();
        let err = f.webhooks.handle(b"{not json", Some("abcd"), None).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn unknown_orders_are_not_found() {
        let f = fixture();
        for event in ["payment.captured", "payment.failed"] {
            let err = f.deliver(event, "order_missing", "pay_missing", None).await.unwrap_err();
            assert!(matches!(err, AppError::NotFound(_)));
        }
    }

    #[tokio::test]
    async fn other_events_are_acknowledged() {
        let f = fixture();
        let outcome = f.deliver("refund.processed", "order_1", "pay_1", None).await.unwrap();
        assert!(matches!(outcome, WebhookOutcome::Ignored));

        let bare = json!({ "event": "order.paid", "payload": {} }).to_string();
        let outcome = f.webhooks.handle(bare.as_bytes(), Some("abcd"), None).await.unwrap();
        assert!(matches!(outcome, WebhookOutcome::Ignored));
    }

    #[tokio::test]
    async fn final_fee_uses_tier_or_override() {
        let f = fixture();

        let tiered = f.book("250", 10, 2).await;
        assert_eq!(tiered.platform_fee, BigDecimal::from(40));
        let outcome = f.deliver("payment.captured", &order_of(&tiered), "pay_t", None).await.unwrap();
        let WebhookOutcome::Confirmed(confirmed) = outcome else {
            panic!("expected confirmation");
        };
        assert_eq!(confirmed.platform_fee, BigDecimal::from(35));

        let custom = f.book("250", 10, 2).await;
        f.store
            .set_show_platform_fee(custom.show_id, Some(&BigDecimal::from_str("12.5").unwrap()))
            .await
            .unwrap();
        let outcome = f.deliver("payment.captured", &order_of(&custom), "pay_c", None).await.unwrap();
        let WebhookOutcome::Confirmed(confirmed) = outcome else {
            panic!("expected confirmation");
        };
        assert_eq!(confirmed.platform_fee, BigDecimal::from_str("62.50").unwrap());
    }
}
