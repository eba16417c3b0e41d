use crate::models::{FeeSlab, FeeSlabInput, Show, ShowRevenue};
use bigdecimal::{BigDecimal, RoundingMode};
use serde::Serialize;
use std::str::FromStr;
use uuid::Uuid;

/// Fraction applied when no slab table exists, and as the provisional fee
/// charged at booking time before the final fee is worked out on capture.
pub const FALLBACK_FEE_FRACTION: &str = "0.08";

fn decimal(value: &str) -> BigDecimal {
    // only ever called with literals defined in this module
    BigDecimal::from_str(value).unwrap_or_default()
}

pub fn fallback_fraction() -> BigDecimal {
    decimal(FALLBACK_FEE_FRACTION)
}

/// Rounds a money or percentage value to 2 decimal places, half away from zero.
pub fn round_money(value: &BigDecimal) -> BigDecimal {
    value.with_scale_round(2, RoundingMode::HalfUp)
}

/// The three tiers the platform ships with.
pub fn default_fee_slabs() -> Vec<FeeSlab> {
    [
        (1u128, "0", Some("199.99"), "0.05"),
        (2, "200", Some("400"), "0.07"),
        (3, "400.01", None, "0.08"),
    ]
    .into_iter()
    .enumerate()
    .map(|(position, (id, min, max, fee))| FeeSlab {
        id: Uuid::from_u128(id),
        position: position as i32,
        min_price: decimal(min),
        max_price: max.map(decimal),
        fee: decimal(fee),
    })
    .collect()
}

/// Ordered fee slabs plus the lookup rules over them.
#[derive(Debug, Clone)]
pub struct FeeSchedule {
    slabs: Vec<FeeSlab>,
}

impl FeeSchedule {
    pub fn new(mut slabs: Vec<FeeSlab>) -> Self {
        slabs.sort_by_key(|s| s.position);
        Self { slabs }
    }

    pub fn slabs(&self) -> &[FeeSlab] {
        &self.slabs
    }

    /// First slab containing `price` wins. A price in a gap between slabs
    /// falls back to the last slab starting at or below it.
    pub fn fee_for_price(&self, price: &BigDecimal) -> BigDecimal {
        let containing = self.slabs.iter().find(|slab| {
            &slab.min_price <= price && slab.max_price.as_ref().map_or(true, |max| price <= max)
        });

        if let Some(slab) = containing {
            return slab.fee.clone();
        }

        self.slabs
            .iter()
            .filter(|slab| &slab.min_price <= price)
            .last()
            .map(|slab| slab.fee.clone())
            .unwrap_or_else(fallback_fraction)
    }

    /// Tier-derived percentage stored on a show as its default fee.
    pub fn default_percent_for_price(&self, price: &BigDecimal) -> BigDecimal {
        round_money(&(self.fee_for_price(price) * BigDecimal::from(100)))
    }

    /// The fraction that applies to a show: its custom override if set,
    /// otherwise the slab for its ticket price.
    pub fn effective_fraction(&self, show: &Show) -> BigDecimal {
        match &show.custom_platform_fee {
            Some(percent) => percent / BigDecimal::from(100),
            None => self.fee_for_price(&show.ticket_price),
        }
    }
}

pub fn platform_fee(total_amount: &BigDecimal, fraction: &BigDecimal) -> BigDecimal {
    round_money(&(total_amount * fraction))
}

/// Checks a replacement slab table before it is stored.
pub fn validate_slabs(slabs: &[FeeSlabInput]) -> Result<(), String> {
    let zero = BigDecimal::from(0);
    let one = BigDecimal::from(1);

    for (index, slab) in slabs.iter().enumerate() {
        if slab.min_price < zero {
            return Err(format!("slab {}: min_price cannot be negative", index));
        }
        if let Some(max) = &slab.max_price {
            if max < &slab.min_price {
                return Err(format!("slab {}: max_price must be at least min_price", index));
            }
        }
        if slab.fee < zero || slab.fee > one {
            return Err(format!("slab {}: fee must be a fraction between 0 and 1", index));
        }
    }

    Ok(())
}

pub fn validate_percent(percent: &BigDecimal) -> Result<(), String> {
    if percent < &BigDecimal::from(0) || percent > &BigDecimal::from(100) {
        return Err("percent must be between 0 and 100".to_string());
    }
    Ok(())
}

#[derive(Debug, Clone, Serialize)]
pub struct Payout {
    pub show_id: Uuid,
    pub tickets_sold: i64,
    pub gross_revenue: BigDecimal,
    pub platform_fees: BigDecimal,
    pub creator_payout: BigDecimal,
    pub is_disbursed: bool,
}

pub fn payout(show: &Show, revenue: ShowRevenue) -> Payout {
    let creator_payout = round_money(&(&revenue.gross_revenue - &revenue.platform_fees));
    Payout {
        show_id: show.id,
        tickets_sold: revenue.tickets_sold,
        gross_revenue: round_money(&revenue.gross_revenue),
        platform_fees: round_money(&revenue.platform_fees),
        creator_payout,
        is_disbursed: show.is_disbursed,
    }
}
