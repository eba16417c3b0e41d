// These tests need a real Postgres. Run with:
//   TEST_DATABASE_URL=postgres://... cargo test --test postgres_store -- --ignored
use bigdecimal::BigDecimal;
use chrono::{Duration, Utc};
use sqlx::PgPool;
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

use punchline::models::{
    BookingStatus, BookingTransition, CreateShowRequest, NewBooking, NewShow, OnboardRequest, Role,
    TransitionOutcome,
};
use punchline::store::{PgStore, Store};

async fn setup_test_db() -> PgPool {
    dotenv::from_filename(".env.test").ok();
    dotenv::dotenv().ok();

    let database_url = env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .expect("TEST_DATABASE_URL or DATABASE_URL must be set for integration tests");

    println!("🔌 Connecting to test database...");
    let pool = sqlx::PgPool::connect(&database_url)
        .await
        .expect("Failed to connect to test database");

    println!("🔄 Running migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run migrations");

    pool
}

async fn create_test_user(store: &PgStore, role: Role) -> Uuid {
    let id = Uuid::new_v4();
    store
        .upsert_user(
            id,
            &OnboardRequest {
                display_name: format!("test_{}", id.simple()),
                email: None,
                role,
            },
        )
        .await
        .expect("Failed to create test user");
    id
}

async fn create_test_show(store: &PgStore, creator: Uuid, total_tickets: i32) -> Uuid {
    let details = store
        .create_show(&NewShow {
            id: Uuid::new_v4(),
            created_by: creator,
            request: CreateShowRequest {
                title: "Late Night Set".to_string(),
                description: None,
                date: Utc::now() + Duration::days(3),
                venue: "Canvas Laugh Club".to_string(),
                ticket_price: BigDecimal::from(100),
                total_tickets,
            },
            custom_platform_fee: None,
            platform_fee_percent: BigDecimal::from(5),
        })
        .await
        .expect("Failed to create test show");
    details.show.id
}

fn pending_booking(show_id: Uuid, user_id: Uuid, quantity: i32) -> NewBooking {
    NewBooking {
        id: Uuid::new_v4(),
        show_id,
        user_id,
        quantity,
        total_amount: BigDecimal::from(100 * quantity),
        platform_fee: BigDecimal::from(8 * quantity),
        booking_fee: BigDecimal::from(0),
        status: BookingStatus::Pending,
        payment_id: Some(format!("order_{}", Uuid::new_v4().simple())),
    }
}

#[actix_rt::test]
#[ignore]
async fn test_concurrent_reservations_never_oversell() {
    let store = Arc::new(PgStore::new(setup_test_db().await));
    let creator = create_test_user(&store, Role::Comedian).await;
    let buyer = create_test_user(&store, Role::Audience).await;
    let show_id = create_test_show(&store, creator, 5).await;

    let attempts = (0..12).map(|_| {
        let store = store.clone();
        let booking = pending_booking(show_id, buyer, 1);
        async move { store.reserve_booking(&booking).await }
    });
    let results = futures::future::join_all(attempts).await;

    let reserved = results
        .into_iter()
        .map(|r| r.expect("reservation query failed"))
        .filter(Option::is_some)
        .count();
    assert_eq!(reserved, 5);

    let details = store.find_show(show_id).await.unwrap().unwrap();
    assert_eq!(details.inventory.available, 0);
    assert_eq!(details.inventory.locked, 5);
    println!("✅ {} of 12 concurrent reservations succeeded", reserved);
}

#[actix_rt::test]
#[ignore]
async fn test_transition_applies_once_and_records_event() {
    let store = PgStore::new(setup_test_db().await);
    let creator = create_test_user(&store, Role::Organizer).await;
    let buyer = create_test_user(&store, Role::Audience).await;
    let show_id = create_test_show(&store, creator, 10).await;

    let booking = store
        .reserve_booking(&pending_booking(show_id, buyer, 3))
        .await
        .unwrap()
        .expect("tickets should be available");

    let event_id = format!("evt_{}", Uuid::new_v4().simple());
    let capture = BookingTransition {
        to: BookingStatus::Confirmed,
        payment_id: Some("pay_pg_1".to_string()),
        platform_fee: Some(BigDecimal::from_str("21.00").unwrap()),
        event_id: Some(event_id.clone()),
    };

    let first = store.transition_booking(booking.id, &capture).await.unwrap();
    assert!(matches!(first, TransitionOutcome::Applied(ref b) if b.status == BookingStatus::Confirmed));

    let again = store.transition_booking(booking.id, &capture).await.unwrap();
    assert!(matches!(again, TransitionOutcome::AlreadyProcessed));

    let details = store.find_show(show_id).await.unwrap().unwrap();
    assert_eq!(details.inventory.available, 7);
    assert_eq!(details.inventory.locked, 0);

    let latest = store.find_booking_by_payment("pay_pg_1").await.unwrap().unwrap();
    assert_eq!(latest.id, booking.id);

    let revenue = store.show_revenue(show_id).await.unwrap();
    assert_eq!(revenue.tickets_sold, 3);
    assert_eq!(revenue.gross_revenue, BigDecimal::from(300));
}

#[actix_rt::test]
#[ignore]
async fn test_failed_payment_releases_inventory() {
    let store = PgStore::new(setup_test_db().await);
    let creator = create_test_user(&store, Role::Comedian).await;
    let buyer = create_test_user(&store, Role::Audience).await;
    let show_id = create_test_show(&store, creator, 4).await;

    let booking = store
        .reserve_booking(&pending_booking(show_id, buyer, 4))
        .await
        .unwrap()
        .unwrap();
    assert!(store
        .reserve_booking(&pending_booking(show_id, buyer, 1))
        .await
        .unwrap()
        .is_none());

    let outcome = store
        .transition_booking(booking.id, &BookingTransition::to(BookingStatus::Failed))
        .await
        .unwrap();
    assert!(matches!(outcome, TransitionOutcome::Applied(_)));

    let details = store.find_show(show_id).await.unwrap().unwrap();
    assert_eq!(details.inventory.available, 4);
    assert_eq!(details.inventory.locked, 0);
}
