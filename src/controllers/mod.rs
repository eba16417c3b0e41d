pub mod admin;
pub mod auth;
pub mod booking;
pub mod show;
pub mod user;
pub mod webhook;

use actix_web::web;

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    auth::configure(cfg);
    booking::configure(cfg);
    webhook::configure(cfg);
    show::configure(cfg);
    user::configure(cfg);
    admin::configure(cfg);
}
