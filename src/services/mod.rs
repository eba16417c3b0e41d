pub mod admin;
pub mod auth;
pub mod booking;
pub mod fee_calculator;
pub mod payment_gateway;
pub mod scheduler;
pub mod show;
pub mod user;
pub mod webhook;

#[cfg(test)]
pub(crate) mod test_support;

pub use admin::AdminService;
pub use auth::AuthService;
pub use booking::BookingService;
pub use fee_calculator::FeeSchedule;
pub use payment_gateway::{OfflineGateway, PaymentGateway, RazorpayGateway, WebhookVerifier};
pub use scheduler::SchedulerService;
pub use show::ShowService;
pub use user::UserService;
pub use webhook::WebhookService;
