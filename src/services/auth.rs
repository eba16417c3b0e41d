// Token issuing/verification and the admin password login.

use crate::error::{AppError, AppResult};
use crate::models::Role;
use anyhow::{anyhow, Result};
use bcrypt::verify;
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use log::{debug, info, warn};
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const ADMIN_SESSION_COOKIE: &str = "admin_session";
const ADMIN_SESSION_HOURS: i64 = 12;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    /// Only admin sessions carry a role; everyone else's role lives on their user row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub iat: i64,
    #[serde(default)]
    pub jti: String,
}

/// Identity taken from a verified token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenIdentity {
    pub user_id: Uuid,
    pub is_admin: bool,
}

#[derive(Clone)]
pub struct AuthService {
    jwt_secret: String,
    admin_password_hash: Option<String>,
}

impl AuthService {
    pub fn new(jwt_secret: impl Into<String>, admin_password_hash: Option<String>) -> Self {
        Self {
            jwt_secret: jwt_secret.into(),
            admin_password_hash,
        }
    }

    pub fn issue_token(&self, user_id: Uuid, role: Option<Role>, lifetime: Duration) -> Result<String> {
        let now = Utc::now();
        let expiration = now
            .checked_add_signed(lifetime)
            .ok_or_else(|| anyhow!("Invalid timestamp calculation"))?
            .timestamp();

        let random_bytes: [u8; 16] = rand::rng().random();
        let claims = Claims {
            sub: user_id.to_string(),
            exp: expiration,
            role: role.map(|r| r.as_str().to_string()),
            iat: now.timestamp(),
            jti: hex::encode(random_bytes),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )?;

        debug!("🎫 Token issued for {} (expires {})", user_id, expiration);
        Ok(token)
    }

    pub fn verify_token(&self, token: &str) -> Result<TokenIdentity> {
        let mut validation = Validation::default();
        validation.validate_exp = true;
        validation.leeway = 60;

        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &validation,
        )?;

        let user_id = Uuid::parse_str(&token_data.claims.sub)
            .map_err(|_| anyhow!("Token subject is not a user id"))?;
        let is_admin = token_data.claims.role.as_deref() == Some(Role::Admin.as_str());

        Ok(TokenIdentity { user_id, is_admin })
    }

    /// Checks the admin password and returns a session token.
    /// The admin is not a stored user, so the session subject is the nil UUID.
    pub fn admin_login(&self, password: &str) -> AppResult<String> {
        let hash = self
            .admin_password_hash
            .as_deref()
            .ok_or_else(|| AppError::unauthorized("Admin login is not configured"))?;

        let valid = verify(password, hash).map_err(|e| anyhow!("Stored admin hash is unusable: {}", e))?;
        if !valid {
            warn!("❌ Admin login failed: wrong password");
            return Err(AppError::unauthorized("Invalid credentials"));
        }

        let token = self.issue_token(Uuid::nil(), Some(Role::Admin), Duration::hours(ADMIN_SESSION_HOURS))?;
        info!("🔐 Admin session started");
        Ok(token)
    }

    pub fn admin_session_seconds(&self) -> i64 {
        ADMIN_SESSION_HOURS * 3600
    }
}
