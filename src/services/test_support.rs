use crate::config::Config;
use crate::models::{AdminShowUpdate, CreateShowRequest, NewShow, OnboardRequest, Role, Show};
use crate::services::payment_gateway::{OfflineGateway, OrderRequest, PaymentGateway, PaymentOrder};
use crate::store::{MemoryStore, Store};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use chrono::{Duration, Utc};
use std::str::FromStr;
use std::sync::Mutex;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "unit-test-jwt-secret-0123456789abcdef";
pub const TEST_WEBHOOK_SECRET: &str = "whsec_unit_test";

pub fn test_config() -> Config {
    Config::with_defaults(TEST_JWT_SECRET, TEST_WEBHOOK_SECRET)
}

/// Onboards an audience member so their bookings satisfy the user reference.
pub async fn seed_user(store: &MemoryStore) -> Uuid {
    let id = Uuid::new_v4();
    let request = OnboardRequest {
        display_name: "Front Row Fan".to_string(),
        email: None,
        role: Role::Audience,
    };
    store.upsert_user(id, &request).await.unwrap();
    id
}

/// Creates and publishes a show starting `starts_in` from now.
pub async fn seed_show(store: &MemoryStore, price: &str, total_tickets: i32, starts_in: Duration) -> Show {
    seed_show_for(store, Uuid::new_v4(), price, total_tickets, starts_in).await
}

pub async fn seed_show_for(
    store: &MemoryStore,
    created_by: Uuid,
    price: &str,
    total_tickets: i32,
    starts_in: Duration,
) -> Show {
    let new_show = NewShow {
        id: Uuid::new_v4(),
        created_by,
        request: CreateShowRequest {
            title: "Open Mic Night".to_string(),
            description: None,
            date: Utc::now() + starts_in,
            venue: "Blue Frog".to_string(),
            ticket_price: BigDecimal::from_str(price).unwrap(),
            total_tickets,
        },
        custom_platform_fee: None,
        platform_fee_percent: BigDecimal::from(5),
    };
    let details = store.create_show(&new_show).await.unwrap();
    store
        .admin_update_show(
            details.show.id,
            &AdminShowUpdate {
                is_published: Some(true),
                is_disbursed: None,
            },
        )
        .await
        .unwrap()
        .unwrap()
}

pub struct FailingGateway;

#[async_trait]
impl PaymentGateway for FailingGateway {
    async fn create_order(&self, _request: &OrderRequest) -> Result<PaymentOrder> {
        Err(anyhow!("gateway unavailable"))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

/// Offline gateway that remembers every order request it saw.
#[derive(Default)]
pub struct RecordingGateway {
    requests: Mutex<Vec<OrderRequest>>,
}

impl RecordingGateway {
    pub fn requests(&self) -> Vec<OrderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl PaymentGateway for RecordingGateway {
    async fn create_order(&self, request: &OrderRequest) -> Result<PaymentOrder> {
        self.requests.lock().unwrap().push(request.clone());
        OfflineGateway.create_order(request).await
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
