use crate::error::{AppError, AppResult};
use crate::models::{OnboardRequest, Role, User};
use crate::store::Store;
use log::info;
use std::sync::Arc;
use uuid::Uuid;

pub struct UserService {
    store: Arc<dyn Store>,
}

impl UserService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Creates or updates the caller's profile. Organizers and comedians
    /// (re)enter the approval queue whenever they take on that role.
    pub async fn onboard(&self, user_id: Uuid, request: OnboardRequest) -> AppResult<User> {
        if request.role == Role::Admin {
            return Err(AppError::forbidden("The admin role cannot be self-assigned"));
        }

        let request = OnboardRequest {
            display_name: request.display_name.trim().to_string(),
            email: request.email.map(|e| e.trim().to_string()).filter(|e| !e.is_empty()),
            role: request.role,
        };
        if request.display_name.is_empty() {
            return Err(AppError::validation("display_name is required"));
        }
        if let Some(email) = &request.email {
            if !email.contains('@') {
                return Err(AppError::validation("email is not valid"));
            }
        }

        let user = self.store.upsert_user(user_id, &request).await?;
        info!(
            "👤 User {} onboarded as {} ({})",
            user.id, user.role, user.approval_status
        );
        Ok(user)
    }

    pub async fn profile(&self, user_id: Uuid) -> AppResult<User> {
        self.store
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User has not onboarded yet"))
    }

    pub async fn require_approved_creator(&self, user_id: Uuid) -> AppResult<User> {
        let user = self
            .store
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::forbidden("Complete onboarding before listing shows"))?;

        if !user.is_approved_creator() {
            return Err(AppError::forbidden("Only approved organizers and comedians can list shows"));
        }
        Ok(user)
    }
}
