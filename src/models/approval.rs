use crate::models::user::ApprovalStatus;
use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction as SqlxTransaction};
use uuid::Uuid;

/// Audit row written every time an admin approves or rejects a creator.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ApprovalRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub admin_id: Uuid,
    #[sqlx(try_from = "String")]
    pub decision: ApprovalStatus,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl ApprovalRecord {
    pub async fn create_in_tx(
        tx: &mut SqlxTransaction<'_, Postgres>,
        user_id: Uuid,
        admin_id: Uuid,
        decision: ApprovalStatus,
        reason: Option<&str>,
    ) -> Result<Self> {
        let record = sqlx::query_as::<_, ApprovalRecord>(
            r#"
            INSERT INTO approval_history (id, user_id, admin_id, decision, reason, created_at)
            VALUES ($1, $2, $3, $4, $5, NOW())
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(admin_id)
        .bind(decision.as_str())
        .bind(reason)
        .fetch_one(&mut **tx)
        .await?;

        Ok(record)
    }

    pub async fn find_by_user(pool: &PgPool, user_id: Uuid) -> Result<Vec<Self>> {
        let records = sqlx::query_as::<_, ApprovalRecord>(
            "SELECT * FROM approval_history WHERE user_id = $1 ORDER BY created_at DESC",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await?;

        Ok(records)
    }
}
