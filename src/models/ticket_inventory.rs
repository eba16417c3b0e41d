use anyhow::{anyhow, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction as SqlxTransaction};
use uuid::Uuid;

/// Unreserved (`available`) and reserved-by-pending-bookings (`locked`) counts for a show.
/// Sold tickets are not stored here; they are `total_tickets - available - locked`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TicketInventory {
    pub show_id: Uuid,
    pub available: i32,
    pub locked: i32,
    pub updated_at: DateTime<Utc>,
}

impl TicketInventory {
    pub fn new(show_id: Uuid, total_tickets: i32) -> Self {
        Self {
            show_id,
            available: total_tickets,
            locked: 0,
            updated_at: Utc::now(),
        }
    }

    pub fn sold(&self, total_tickets: i32) -> i32 {
        total_tickets - self.available - self.locked
    }

    pub async fn create_in_tx(
        tx: &mut SqlxTransaction<'_, Postgres>,
        show_id: Uuid,
        total_tickets: i32,
    ) -> Result<Self> {
        let inventory = sqlx::query_as::<_, TicketInventory>(
            r#"
            INSERT INTO ticket_inventory (show_id, available, locked, updated_at)
            VALUES ($1, $2, 0, NOW())
            RETURNING *
            "#,
        )
        .bind(show_id)
        .bind(total_tickets)
        .fetch_one(&mut **tx)
        .await?;

        Ok(inventory)
    }

    pub async fn find_by_show(pool: &PgPool, show_id: Uuid) -> Result<Option<Self>> {
        let inventory = sqlx::query_as::<_, TicketInventory>(
            "SELECT * FROM ticket_inventory WHERE show_id = $1",
        )
        .bind(show_id)
        .fetch_optional(pool)
        .await?;

        Ok(inventory)
    }

    pub async fn find_by_shows(pool: &PgPool, show_ids: &[Uuid]) -> Result<Vec<Self>> {
        let inventories = sqlx::query_as::<_, TicketInventory>(
            "SELECT * FROM ticket_inventory WHERE show_id = ANY($1)",
        )
        .bind(show_ids)
        .fetch_all(pool)
        .await?;

        Ok(inventories)
    }

    /// Moves `quantity` tickets from available to locked in one conditional
    /// statement. Returns `None` when fewer than `quantity` are available.
    pub async fn reserve_in_tx(
        tx: &mut SqlxTransaction<'_, Postgres>,
        show_id: Uuid,
        quantity: i32,
    ) -> Result<Option<Self>> {
        let inventory = sqlx::query_as::<_, TicketInventory>(
            r#"
            UPDATE ticket_inventory
            SET available = available - $1, locked = locked + $1, updated_at = NOW()
            WHERE show_id = $2 AND available >= $1
            RETURNING *
            "#,
        )
        .bind(quantity)
        .bind(show_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(inventory)
    }

    /// Sells straight out of available (free shows never pass through locked).
    pub async fn sell_in_tx(
        tx: &mut SqlxTransaction<'_, Postgres>,
        show_id: Uuid,
        quantity: i32,
    ) -> Result<Option<Self>> {
        let inventory = sqlx::query_as::<_, TicketInventory>(
            r#"
            UPDATE ticket_inventory
            SET available = available - $1, updated_at = NOW()
            WHERE show_id = $2 AND available >= $1
            RETURNING *
            "#,
        )
        .bind(quantity)
        .bind(show_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(inventory)
    }

    /// Locked tickets become sold.
    pub async fn settle_locked_in_tx(
        tx: &mut SqlxTransaction<'_, Postgres>,
        show_id: Uuid,
        quantity: i32,
    ) -> Result<Self> {
        sqlx::query_as::<_, TicketInventory>(
            r#"
            UPDATE ticket_inventory
            SET locked = locked - $1, updated_at = NOW()
            WHERE show_id = $2 AND locked >= $1
            RETURNING *
            "#,
        )
        .bind(quantity)
        .bind(show_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| anyhow!("Locked inventory for show {} is below {}", show_id, quantity))
    }

    /// Locked tickets go back to available.
    pub async fn release_locked_in_tx(
        tx: &mut SqlxTransaction<'_, Postgres>,
        show_id: Uuid,
        quantity: i32,
    ) -> Result<Self> {
        sqlx::query_as::<_, TicketInventory>(
            r#"
            UPDATE ticket_inventory
            SET locked = locked - $1, available = available + $1, updated_at = NOW()
            WHERE show_id = $2 AND locked >= $1
            RETURNING *
            "#,
        )
        .bind(quantity)
        .bind(show_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| anyhow!("Locked inventory for show {} is below {}", show_id, quantity))
    }
}
