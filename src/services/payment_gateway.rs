// Payment gateway client (Razorpay orders API) and webhook signature checks.

use crate::config::RazorpayCredentials;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive};
use hmac::{Hmac, Mac};
use log::{error, info};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::Duration;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

const RAZORPAY_API_URL: &str = "https://api.razorpay.com/v1";

#[derive(Debug, Clone, Serialize)]
pub struct OrderNotes {
    pub show_id: Uuid,
    pub user_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    /// Amount in the currency's minor unit (paise for INR).
    pub amount: i64,
    pub currency: String,
    pub receipt: String,
    pub notes: OrderNotes,
}

/// What the client needs to open the gateway checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentOrder {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub receipt: Option<String>,
    #[serde(default)]
    pub key_id: Option<String>,
}

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_order(&self, request: &OrderRequest) -> Result<PaymentOrder>;

    fn name(&self) -> &'static str;
}

/// Converts a major-unit amount to minor units, rounding half up.
pub fn to_minor_units(amount: &BigDecimal) -> Result<i64> {
    (amount * BigDecimal::from(100))
        .with_scale_round(0, RoundingMode::HalfUp)
        .to_i64()
        .ok_or_else(|| anyhow!("Amount {} does not fit in minor units", amount))
}

pub struct RazorpayGateway {
    client: Client,
    base_url: String,
    key_id: String,
    key_secret: String,
}

impl RazorpayGateway {
    pub fn new(credentials: &RazorpayCredentials) -> Result<Self> {
        Self::with_base_url(credentials, RAZORPAY_API_URL)
    }

    pub fn with_base_url(credentials: &RazorpayCredentials, base_url: &str) -> Result<Self> {
        let client = Client::builder().timeout(Duration::from_secs(15)).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            key_id: credentials.key_id.clone(),
            key_secret: credentials.key_secret.clone(),
        })
    }
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    async fn create_order(&self, request: &OrderRequest) -> Result<PaymentOrder> {
        let url = format!("{}/orders", self.base_url);
        info!(
            "💳 Creating gateway order: receipt {}, amount {} {}",
            request.receipt, request.amount, request.currency
        );

        let response = self
            .client
            .post(&url)
            .basic_auth(&self.key_id, Some(&self.key_secret))
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            error!("Gateway order creation failed: HTTP {}: {}", status, error_text);
            return Err(anyhow!("Gateway order creation failed: HTTP {}", status));
        }

        let mut order: PaymentOrder = response.json().await?;
        order.key_id = Some(self.key_id.clone());

        info!("✅ Gateway order {} created", order.id);
        Ok(order)
    }

    fn name(&self) -> &'static str {
        "razorpay"
    }
}

/// Issues local order ids when no gateway credentials are configured.
/// Payments against these orders can only be confirmed by a signed webhook
/// delivered by hand.
#[derive(Debug, Default)]
pub struct OfflineGateway;

#[async_trait]
impl PaymentGateway for OfflineGateway {
    async fn create_order(&self, request: &OrderRequest) -> Result<PaymentOrder> {
        let order = PaymentOrder {
            id: format!("order_{}", Uuid::new_v4().simple()),
            amount: request.amount,
            currency: request.currency.clone(),
            receipt: Some(request.receipt.clone()),
            key_id: None,
        };
        info!("🧾 Offline order {} issued for receipt {}", order.id, request.receipt);
        Ok(order)
    }

    fn name(&self) -> &'static str {
        "offline"
    }
}

/// Signs and checks `order_id|payment_id` with the webhook secret.
#[derive(Clone)]
pub struct WebhookVerifier {
    secret: String,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>) -> Self {
        Self { secret: secret.into() }
    }

    fn mac(&self, order_id: &str, payment_id: &str) -> Result<HmacSha256> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| anyhow!("Invalid webhook secret: {}", e))?;
        mac.update(format!("{}|{}", order_id, payment_id).as_bytes());
        Ok(mac)
    }

    pub fn sign(&self, order_id: &str, payment_id: &str) -> Result<String> {
        Ok(hex::encode(self.mac(order_id, payment_id)?.finalize().into_bytes()))
    }

    /// Constant-time comparison against a hex signature.
    pub fn verify(&self, order_id: &str, payment_id: &str, signature: &str) -> bool {
        let Ok(expected) = hex::decode(signature.trim()) else {
            return false;
        };
        match self.mac(order_id, payment_id) {
            Ok(mac) => mac.verify_slice(&expected).is_ok(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn minor_units_round_half_up() {
        assert_eq!(to_minor_units(&BigDecimal::from_str("499.99").unwrap()).unwrap(), 49999);
        assert_eq!(to_minor_units(&BigDecimal::from_str("0.005").unwrap()).unwrap(), 1);
        assert_eq!(to_minor_units(&BigDecimal::from(0)).unwrap(), 0);
    }

    #[test]
    fn verifier_accepts_its_own_signature() {
        let verifier = WebhookVerifier::new("whsec_test");
        let signature = verifier.sign("order_1", "pay_1").unwrap();

        assert!(verifier.verify("order_1", "pay_1", &signature));
        assert!(!verifier.verify("order_1", "pay_2", &signature));
        assert!(!WebhookVerifier::new("other").verify("order_1", "pay_1", &signature));
    }

    #[test]
    fn verifier_rejects_garbage() {
        let verifier = WebhookVerifier::new("whsec_test");
        assert!(!verifier.verify("order_1", "pay_1", "not-hex"));
        assert!(!verifier.verify("order_1", "pay_1", ""));
    }

    #[tokio::test]
    async fn offline_gateway_issues_unique_orders() {
        let request = OrderRequest {
            amount: 50000,
            currency: "INR".to_string(),
            receipt: "BKG-20260101-abcdefgh".to_string(),
            notes: OrderNotes {
                show_id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                quantity: 2,
            },
        };
        let first = OfflineGateway.create_order(&request).await.unwrap();
        let second = OfflineGateway.create_order(&request).await.unwrap();

        assert!(first.id.starts_with("order_"));
        assert_ne!(first.id, second.id);
        assert_eq!(first.amount, 50000);
    }
}
