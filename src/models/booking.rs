use super::UnknownVariant;
use anyhow::Result;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use rand::{distr::Alphanumeric, Rng};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction as SqlxTransaction};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    ConfirmedUnpaid,
    Cancelled,
    Failed,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::ConfirmedUnpaid => "CONFIRMED_UNPAID",
            BookingStatus::Cancelled => "CANCELLED",
            BookingStatus::Failed => "FAILED",
        }
    }

    /// Statuses whose tickets count as sold.
    pub fn is_sold(&self) -> bool {
        matches!(self, BookingStatus::Confirmed | BookingStatus::ConfirmedUnpaid)
    }

    /// Leaving PENDING for this status returns the locked tickets to `available`.
    pub fn releases_inventory(&self) -> bool {
        matches!(self, BookingStatus::Cancelled | BookingStatus::Failed)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(BookingStatus::Pending),
            "CONFIRMED" => Ok(BookingStatus::Confirmed),
            "CONFIRMED_UNPAID" => Ok(BookingStatus::ConfirmedUnpaid),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            "FAILED" => Ok(BookingStatus::Failed),
            other => Err(UnknownVariant::new("booking status", other)),
        }
    }
}

impl TryFrom<String> for BookingStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Booking {
    pub id: Uuid,
    pub show_id: Uuid,
    pub user_id: Uuid,
    pub quantity: i32,
    pub total_amount: BigDecimal,
    pub platform_fee: BigDecimal,
    pub booking_fee: BigDecimal,
    #[sqlx(try_from = "String")]
    pub status: BookingStatus,
    /// Gateway order id while pending; the gateway payment id once captured.
    pub payment_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewBooking {
    pub id: Uuid,
    pub show_id: Uuid,
    pub user_id: Uuid,
    pub quantity: i32,
    pub total_amount: BigDecimal,
    pub platform_fee: BigDecimal,
    pub booking_fee: BigDecimal,
    /// PENDING for paid shows, CONFIRMED for free ones.
    pub status: BookingStatus,
    pub payment_id: Option<String>,
}

/// A move out of PENDING. Only applied if the booking is still PENDING.
#[derive(Debug, Clone)]
pub struct BookingTransition {
    pub to: BookingStatus,
    pub payment_id: Option<String>,
    pub platform_fee: Option<BigDecimal>,
    /// Gateway event id; a transition carrying an already-seen id is dropped.
    pub event_id: Option<String>,
}

impl BookingTransition {
    pub fn to(status: BookingStatus) -> Self {
        Self {
            to: status,
            payment_id: None,
            platform_fee: None,
            event_id: None,
        }
    }
}

#[derive(Debug, Clone)]
pub enum TransitionOutcome {
    Applied(Booking),
    /// The booking had already left PENDING or the event was already processed.
    AlreadyProcessed,
    NotFound,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ShowRevenue {
    pub tickets_sold: i64,
    pub gross_revenue: BigDecimal,
    pub platform_fees: BigDecimal,
}

#[derive(sqlx::FromRow)]
struct RevenueRow {
    tickets_sold: Option<i64>,
    gross_revenue: Option<BigDecimal>,
    platform_fees: Option<BigDecimal>,
}

impl Booking {
    fn generate_random_receipt_suffix() -> String {
        use rand::rng;

        rng()
            .sample_iter(&Alphanumeric)
            .take(8)
            .map(char::from)
            .collect()
    }

    /// Receipt reference handed to the payment gateway with the order.
    pub fn generate_receipt(now: DateTime<Utc>) -> String {
        format!(
            "BKG-{}-{}",
            now.format("%Y%m%d"),
            Self::generate_random_receipt_suffix()
        )
    }

    pub async fn insert_in_tx(tx: &mut SqlxTransaction<'_, Postgres>, booking: &NewBooking) -> Result<Self> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            INSERT INTO bookings (
                id, show_id, user_id, quantity, total_amount, platform_fee, booking_fee,
                status, payment_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(booking.id)
        .bind(booking.show_id)
        .bind(booking.user_id)
        .bind(booking.quantity)
        .bind(&booking.total_amount)
        .bind(&booking.platform_fee)
        .bind(&booking.booking_fee)
        .bind(booking.status.as_str())
        .bind(&booking.payment_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(booking)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let booking = sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(booking)
    }

    pub async fn find_pending_by_payment_id(pool: &PgPool, payment_id: &str) -> Result<Option<Self>> {
        let booking = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE payment_id = $1 AND status = 'PENDING'",
        )
        .bind(payment_id)
        .fetch_optional(pool)
        .await?;

        Ok(booking)
    }

    pub async fn find_latest_by_payment_id(pool: &PgPool, payment_id: &str) -> Result<Option<Self>> {
        let booking = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE payment_id = $1 ORDER BY created_at DESC LIMIT 1",
        )
        .bind(payment_id)
        .fetch_optional(pool)
        .await?;

        Ok(booking)
    }

    pub async fn find_by_user(pool: &PgPool, user_id: Uuid, show_id: Option<Uuid>) -> Result<Vec<Self>> {
        let bookings = sqlx::query_as::<_, Booking>(
            r#"
            SELECT * FROM bookings
            WHERE user_id = $1 AND ($2::UUID IS NULL OR show_id = $2)
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .bind(show_id)
        .fetch_all(pool)
        .await?;

        Ok(bookings)
    }

    pub async fn find_pending_created_before(pool: &PgPool, cutoff: DateTime<Utc>) -> Result<Vec<Self>> {
        let bookings = sqlx::query_as::<_, Booking>(
            r#"
            SELECT * FROM bookings
            WHERE status = 'PENDING' AND created_at < $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(cutoff)
        .fetch_all(pool)
        .await?;

        Ok(bookings)
    }

    /// Conditional status update keyed on `status = 'PENDING'`.
    /// `None` means another writer already moved the booking.
    pub async fn transition_in_tx(
        tx: &mut SqlxTransaction<'_, Postgres>,
        id: Uuid,
        transition: &BookingTransition,
    ) -> Result<Option<Self>> {
        let booking = sqlx::query_as::<_, Booking>(
            r#"
            UPDATE bookings SET
                status = $1,
                payment_id = COALESCE($2, payment_id),
                platform_fee = COALESCE($3, platform_fee),
                updated_at = NOW()
            WHERE id = $4 AND status = 'PENDING'
            RETURNING *
            "#,
        )
        .bind(transition.to.as_str())
        .bind(&transition.payment_id)
        .bind(&transition.platform_fee)
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(booking)
    }

    pub async fn revenue_for_show(pool: &PgPool, show_id: Uuid) -> Result<ShowRevenue> {
        let row = sqlx::query_as::<_, RevenueRow>(
            r#"
            SELECT
                SUM(quantity)::BIGINT AS tickets_sold,
                SUM(total_amount) AS gross_revenue,
                SUM(platform_fee) AS platform_fees
            FROM bookings
            WHERE show_id = $1 AND status = 'CONFIRMED'
            "#,
        )
        .bind(show_id)
        .fetch_one(pool)
        .await?;

        Ok(ShowRevenue {
            tickets_sold: row.tickets_sold.unwrap_or(0),
            gross_revenue: row.gross_revenue.unwrap_or_default(),
            platform_fees: row.platform_fees.unwrap_or_default(),
        })
    }
}

/// Marks a gateway event id as processed. Returns `false` if it was seen before.
pub async fn record_webhook_event_in_tx(tx: &mut SqlxTransaction<'_, Postgres>, event_id: &str) -> Result<bool> {
    let inserted = sqlx::query(
        r#"
        INSERT INTO processed_webhook_events (event_id, processed_at)
        VALUES ($1, NOW())
        ON CONFLICT (event_id) DO NOTHING
        "#,
    )
    .bind(event_id)
    .execute(&mut **tx)
    .await?
    .rows_affected();

    Ok(inserted == 1)
}
