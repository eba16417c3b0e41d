use anyhow::Result;
use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// One price band of the tiered platform fee. `fee` is a fraction (0.07 == 7%).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct FeeSlab {
    pub id: Uuid,
    pub position: i32,
    pub min_price: BigDecimal,
    /// `None` means the slab is open-ended.
    pub max_price: Option<BigDecimal>,
    pub fee: BigDecimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeeSlabInput {
    pub min_price: BigDecimal,
    pub max_price: Option<BigDecimal>,
    pub fee: BigDecimal,
}

impl FeeSlab {
    pub async fn find_all(pool: &PgPool) -> Result<Vec<Self>> {
        let slabs = sqlx::query_as::<_, FeeSlab>("SELECT * FROM fee_slabs ORDER BY position ASC")
            .fetch_all(pool)
            .await?;

        Ok(slabs)
    }

    /// Replaces the whole slab table; slabs keep the order they were given in.
    pub async fn replace_all(pool: &PgPool, slabs: &[FeeSlabInput]) -> Result<Vec<Self>> {
        let mut tx = pool.begin().await?;

        sqlx::query("DELETE FROM fee_slabs").execute(&mut *tx).await?;

        let mut saved = Vec::with_capacity(slabs.len());
        for (position, slab) in slabs.iter().enumerate() {
            let row = sqlx::query_as::<_, FeeSlab>(
                r#"
                INSERT INTO fee_slabs (id, position, min_price, max_price, fee)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(position as i32)
            .bind(&slab.min_price)
            .bind(&slab.max_price)
            .bind(&slab.fee)
            .fetch_one(&mut *tx)
            .await?;
            saved.push(row);
        }

        tx.commit().await?;
        Ok(saved)
    }
}
