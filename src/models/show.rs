use crate::models::ticket_inventory::TicketInventory;
use anyhow::Result;
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction as SqlxTransaction};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Show {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub venue: String,
    pub ticket_price: BigDecimal,
    pub total_tickets: i32,
    pub created_by: Uuid,
    pub is_published: bool,
    pub is_disbursed: bool,
    /// Percentage (0-100); wins over the tiered default when set.
    pub custom_platform_fee: Option<BigDecimal>,
    /// Tier-derived default percentage, kept in sync with the fee slabs.
    pub platform_fee_percent: BigDecimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Show {
    pub fn is_upcoming(&self, now: DateTime<Utc>) -> bool {
        self.date > now
    }

    pub fn is_free(&self) -> bool {
        self.ticket_price == BigDecimal::from(0)
    }
}

/// A show together with its inventory row.
#[derive(Debug, Clone, Serialize)]
pub struct ShowDetails {
    #[serde(flatten)]
    pub show: Show,
    pub inventory: TicketInventory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateShowRequest {
    pub title: String,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub venue: String,
    pub ticket_price: BigDecimal,
    pub total_tickets: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateShowRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub venue: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminShowUpdate {
    pub is_published: Option<bool>,
    pub is_disbursed: Option<bool>,
}

/// Everything needed to insert a show row; produced by the show service after validation.
#[derive(Debug, Clone)]
pub struct NewShow {
    pub id: Uuid,
    pub created_by: Uuid,
    pub request: CreateShowRequest,
    pub custom_platform_fee: Option<BigDecimal>,
    pub platform_fee_percent: BigDecimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteShowOutcome {
    Deleted,
    NotFound,
    HasBookings,
}

/// Escapes `LIKE` metacharacters so user search text matches literally.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl Show {
    pub async fn create_in_tx(tx: &mut SqlxTransaction<'_, Postgres>, new_show: &NewShow) -> Result<Self> {
        let show = sqlx::query_as::<_, Show>(
            r#"
            INSERT INTO shows (
                id, title, description, date, venue, ticket_price, total_tickets, created_by,
                is_published, is_disbursed, custom_platform_fee, platform_fee_percent, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, FALSE, FALSE, $9, $10, NOW(), NOW())
            RETURNING *
            "#,
        )
        .bind(new_show.id)
        .bind(&new_show.request.title)
        .bind(&new_show.request.description)
        .bind(new_show.request.date)
        .bind(&new_show.request.venue)
        .bind(&new_show.request.ticket_price)
        .bind(new_show.request.total_tickets)
        .bind(new_show.created_by)
        .bind(&new_show.custom_platform_fee)
        .bind(&new_show.platform_fee_percent)
        .fetch_one(&mut **tx)
        .await?;

        Ok(show)
    }

    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let show = sqlx::query_as::<_, Show>("SELECT * FROM shows WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await?;

        Ok(show)
    }

    pub async fn find_published_upcoming(
        pool: &PgPool,
        search: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Vec<Self>> {
        let pattern = search.map(|s| format!("%{}%", escape_like(s.trim())));

        let shows = sqlx::query_as::<_, Show>(
            r#"
            SELECT * FROM shows
            WHERE is_published = TRUE
            AND date > $1
            AND ($2::VARCHAR IS NULL OR title ILIKE $2 ESCAPE '\' OR venue ILIKE $2 ESCAPE '\')
            ORDER BY date ASC
            "#,
        )
        .bind(now)
        .bind(pattern)
        .fetch_all(pool)
        .await?;

        Ok(shows)
    }

    pub async fn find_by_creator(pool: &PgPool, created_by: Uuid) -> Result<Vec<Self>> {
        let shows = sqlx::query_as::<_, Show>(
            "SELECT * FROM shows WHERE created_by = $1 ORDER BY date DESC",
        )
        .bind(created_by)
        .fetch_all(pool)
        .await?;

        Ok(shows)
    }

    pub async fn find_undisbursed(pool: &PgPool) -> Result<Vec<Self>> {
        let shows = sqlx::query_as::<_, Show>("SELECT * FROM shows WHERE is_disbursed = FALSE")
            .fetch_all(pool)
            .await?;

        Ok(shows)
    }

    pub async fn update(pool: &PgPool, id: Uuid, update: &UpdateShowRequest) -> Result<Option<Self>> {
        let show = sqlx::query_as::<_, Show>(
            r#"
            UPDATE shows SET
                title = COALESCE($1, title),
                description = COALESCE($2, description),
                date = COALESCE($3, date),
                venue = COALESCE($4, venue),
                updated_at = NOW()
            WHERE id = $5
            RETURNING *
            "#,
        )
        .bind(&update.title)
        .bind(&update.description)
        .bind(update.date)
        .bind(&update.venue)
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(show)
    }

    pub async fn admin_update(pool: &PgPool, id: Uuid, update: &AdminShowUpdate) -> Result<Option<Self>> {
        let show = sqlx::query_as::<_, Show>(
            r#"
            UPDATE shows SET
                is_published = COALESCE($1, is_published),
                is_disbursed = COALESCE($2, is_disbursed),
                updated_at = NOW()
            WHERE id = $3
            RETURNING *
            "#,
        )
        .bind(update.is_published)
        .bind(update.is_disbursed)
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(show)
    }

    pub async fn set_custom_platform_fee(
        pool: &PgPool,
        id: Uuid,
        percent: Option<&BigDecimal>,
    ) -> Result<Option<Self>> {
        let show = sqlx::query_as::<_, Show>(
            r#"
            UPDATE shows SET custom_platform_fee = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(percent)
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(show)
    }

    /// Propagates a creator-level override to every show of theirs that has not been paid out.
    pub async fn propagate_creator_fee_in_tx(
        tx: &mut SqlxTransaction<'_, Postgres>,
        created_by: Uuid,
        percent: Option<&BigDecimal>,
    ) -> Result<u64> {
        let updated = sqlx::query(
            r#"
            UPDATE shows SET custom_platform_fee = $1, updated_at = NOW()
            WHERE created_by = $2 AND is_disbursed = FALSE
            "#,
        )
        .bind(percent)
        .bind(created_by)
        .execute(&mut **tx)
        .await?
        .rows_affected();

        Ok(updated)
    }

    pub async fn set_platform_fee_percent(pool: &PgPool, id: Uuid, percent: &BigDecimal) -> Result<()> {
        sqlx::query("UPDATE shows SET platform_fee_percent = $1, updated_at = NOW() WHERE id = $2")
            .bind(percent)
            .bind(id)
            .execute(pool)
            .await?;

        Ok(())
    }

    pub async fn delete_if_unbooked(pool: &PgPool, id: Uuid) -> Result<DeleteShowOutcome> {
        let mut tx = pool.begin().await?;

        let exists = sqlx::query_scalar::<_, Uuid>("SELECT id FROM shows WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        if exists.is_none() {
            return Ok(DeleteShowOutcome::NotFound);
        }

        let booking_count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM bookings WHERE show_id = $1")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        if booking_count > 0 {
            return Ok(DeleteShowOutcome::HasBookings);
        }

        sqlx::query("DELETE FROM ticket_inventory WHERE show_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM shows WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(DeleteShowOutcome::Deleted)
    }
}
