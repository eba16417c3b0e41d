use crate::error::{AppError, AppResult};
use crate::services::auth::ADMIN_SESSION_COOKIE;
use crate::services::show::Viewer;
use crate::state::AppState;
use actix_web::{dev::Payload, http, web, Error, FromRequest, HttpRequest};
use log::{debug, error, warn};
use std::future::{ready, Ready};
use uuid::Uuid;

/// Caller identity from a verified bearer token or admin session cookie.
#[derive(Clone, Copy, Debug)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub is_admin: bool,
}

impl AuthenticatedUser {
    pub fn viewer(&self) -> Viewer {
        Viewer {
            user_id: self.id,
            is_admin: self.is_admin,
        }
    }
}

fn bearer_token(req: &HttpRequest) -> AppResult<Option<String>> {
    let Some(header) = req.headers().get(http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let value = header.to_str().map_err(|_| {
        warn!("Invalid authorization header format");
        AppError::unauthorized("Invalid authorization header format")
    })?;

    let token = value.strip_prefix("Bearer ").ok_or_else(|| {
        warn!("Authorization header without Bearer scheme");
        AppError::unauthorized("Bearer token required")
    })?;

    if token.trim().is_empty() {
        warn!("Empty token provided");
        return Err(AppError::unauthorized("Token cannot be empty"));
    }
    Ok(Some(token.trim().to_string()))
}

fn authenticate(req: &HttpRequest) -> AppResult<AuthenticatedUser> {
    let state = req.app_data::<web::Data<AppState>>().ok_or_else(|| {
        error!("Application state not found in app data");
        AppError::Internal(anyhow::anyhow!("Application state not configured"))
    })?;

    let token = match bearer_token(req)? {
        Some(token) => token,
        None => match req.cookie(ADMIN_SESSION_COOKIE) {
            Some(cookie) => cookie.value().to_string(),
            None => {
                warn!("❌ Request to {} without credentials", req.path());
                return Err(AppError::unauthorized("Authorization header required"));
            }
        },
    };

    match state.auth.verify_token(&token) {
        Ok(identity) => {
            debug!("🎉 Token verified for {}", identity.user_id);
            Ok(AuthenticatedUser {
                id: identity.user_id,
                is_admin: identity.is_admin,
            })
        }
        Err(e) => {
            warn!("Token verification failed: {}", e);
            Err(AppError::unauthorized("Invalid or expired token"))
        }
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req).map_err(Error::from))
    }
}

pub fn require_admin(user: &AuthenticatedUser) -> AppResult<()> {
    if !user.is_admin {
        warn!("Non-admin user {} attempted admin access", user.id);
        return Err(AppError::forbidden("Admin access required"));
    }
    Ok(())
}
