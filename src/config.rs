use anyhow::{anyhow, bail, Context, Result};
use bigdecimal::BigDecimal;
use log::{info, warn};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(StorageBackend::Postgres),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(anyhow!("STORAGE must be 'postgres' or 'memory', got '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RazorpayCredentials {
    pub key_id: String,
    pub key_secret: String,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageBackend,
    pub database_url: Option<String>,
    pub jwt_secret: String,
    pub server_host: String,
    pub server_port: u16,
    pub cors_allowed_origins: Vec<String>,
    /// `None` runs the offline gateway.
    pub razorpay: Option<RazorpayCredentials>,
    pub webhook_secret: String,
    pub admin_password_hash: Option<String>,
    pub payment_currency: String,
    pub booking_fee_per_ticket: BigDecimal,
    pub pending_booking_ttl_minutes: i64,
}

impl Config {
    /// In-memory configuration with every optional setting at its default.
    pub fn with_defaults(jwt_secret: impl Into<String>, webhook_secret: impl Into<String>) -> Self {
        Self {
            storage: StorageBackend::Memory,
            database_url: None,
            jwt_secret: jwt_secret.into(),
            server_host: "0.0.0.0".to_string(),
            server_port: 8080,
            cors_allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://localhost:5173".to_string(),
            ],
            razorpay: None,
            webhook_secret: webhook_secret.into(),
            admin_password_hash: None,
            payment_currency: "INR".to_string(),
            booking_fee_per_ticket: BigDecimal::from(0),
            pending_booking_ttl_minutes: 30,
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup, validating as it goes.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let jwt_secret = get("JWT_SECRET").ok_or_else(|| anyhow!("JWT_SECRET must be set"))?;
        if jwt_secret.len() < 32 {
            bail!("JWT_SECRET must be at least 32 characters long");
        }

        let webhook_secret =
            get("RAZORPAY_WEBHOOK_SECRET").ok_or_else(|| anyhow!("RAZORPAY_WEBHOOK_SECRET must be set"))?;

        let mut config = Self::with_defaults(jwt_secret, webhook_secret);

        config.storage = match get("STORAGE") {
            Some(value) => value.parse()?,
            None => StorageBackend::Postgres,
        };
        config.database_url = get("DATABASE_URL");
        if config.storage == StorageBackend::Postgres && config.database_url.is_none() {
            bail!("DATABASE_URL must be set when STORAGE=postgres");
        }

        if let Some(host) = get("SERVER_HOST") {
            config.server_host = host;
        }
        if let Some(port) = get("SERVER_PORT") {
            config.server_port = port
                .parse()
                .with_context(|| format!("SERVER_PORT must be a valid port number, got '{}'", port))?;
        }
        if let Some(origins) = get("CORS_ALLOWED_ORIGINS") {
            config.cors_allowed_origins = origins
                .split(',')
                .map(|o| o.trim().to_string())
                .filter(|o| !o.is_empty())
                .collect();
        }

        config.razorpay = match (get("RAZORPAY_KEY_ID"), get("RAZORPAY_KEY_SECRET")) {
            (Some(key_id), Some(key_secret)) => Some(RazorpayCredentials { key_id, key_secret }),
            (None, None) => None,
            _ => bail!("RAZORPAY_KEY_ID and RAZORPAY_KEY_SECRET must be set together"),
        };

        config.admin_password_hash = get("ADMIN_PASSWORD_HASH");

        if let Some(currency) = get("PAYMENT_CURRENCY") {
            config.payment_currency = currency.trim().to_ascii_uppercase();
        }
        if let Some(fee) = get("BOOKING_FEE_PER_TICKET") {
            let fee = BigDecimal::from_str(fee.trim())
                .with_context(|| format!("BOOKING_FEE_PER_TICKET must be a decimal, got '{}'", fee))?;
            if fee < BigDecimal::from(0) {
                bail!("BOOKING_FEE_PER_TICKET cannot be negative");
            }
            config.booking_fee_per_ticket = fee;
        }
        if let Some(ttl) = get("PENDING_BOOKING_TTL_MINUTES") {
            let ttl: i64 = ttl
                .trim()
                .parse()
                .with_context(|| format!("PENDING_BOOKING_TTL_MINUTES must be an integer, got '{}'", ttl))?;
            if ttl <= 0 {
                bail!("PENDING_BOOKING_TTL_MINUTES must be positive");
            }
            config.pending_booking_ttl_minutes = ttl;
        }

        Ok(config)
    }

    /// Logs which optional features are switched off.
    pub fn log_summary(&self) {
        info!(
            "Storage: {:?}, currency: {}, pending booking TTL: {} minutes",
            self.storage, self.payment_currency, self.pending_booking_ttl_minutes
        );
        if self.razorpay.is_none() {
            warn!("RAZORPAY_KEY_ID/RAZORPAY_KEY_SECRET not set; using the offline payment gateway");
        }
        if self.admin_password_hash.is_none() {
            warn!("ADMIN_PASSWORD_HASH not set; admin login is disabled");
        }
    }
}
