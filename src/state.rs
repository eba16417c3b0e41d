use crate::config::Config;
use crate::services::admin::AdminService;
use crate::services::auth::AuthService;
use crate::services::booking::BookingService;
use crate::services::payment_gateway::{PaymentGateway, WebhookVerifier};
use crate::services::show::ShowService;
use crate::services::user::UserService;
use crate::services::webhook::WebhookService;
use crate::store::Store;
use std::sync::Arc;

/// Shared by every worker; services are cheap views over these handles.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub gateway: Arc<dyn PaymentGateway>,
    pub config: Arc<Config>,
    pub auth: AuthService,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, gateway: Arc<dyn PaymentGateway>, config: Config) -> Self {
        let auth = AuthService::new(config.jwt_secret.clone(), config.admin_password_hash.clone());
        Self {
            store,
            gateway,
            config: Arc::new(config),
            auth,
        }
    }

    pub fn bookings(&self) -> BookingService {
        BookingService::new(self.store.clone(), self.gateway.clone(), self.config.clone())
    }

    pub fn webhooks(&self) -> WebhookService {
        WebhookService::new(self.store.clone(), WebhookVerifier::new(self.config.webhook_secret.clone()))
    }

    pub fn shows(&self) -> ShowService {
        ShowService::new(self.store.clone())
    }

    pub fn users(&self) -> UserService {
        UserService::new(self.store.clone())
    }

    pub fn admin(&self) -> AdminService {
        AdminService::new(self.store.clone())
    }
}
