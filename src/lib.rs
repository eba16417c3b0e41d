pub mod config;
pub mod controllers;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
pub mod state;
pub mod store;

use actix_web::{HttpResponse, Responder};
use serde_json::json;

pub use controllers::configure_routes;
pub use error::{AppError, AppResult};
pub use state::AppState;

// Health check endpoint for load balancers and monitoring
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "healthy",
        "service": "punchline-api",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

pub async fn api_info() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "name": "Punchline Ticketing API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Comedy show listings, bookings and payouts",
        "endpoints": {
            "health": "/health",
            "api_docs": "/api",
            "auth": "/auth/admin/*",
            "users": "/users/*",
            "shows": "/shows/*",
            "bookings": "/bookings",
            "webhooks": "/webhooks/payment",
            "admin": "/admin/*"
        }
    }))
}

// 404 handler for undefined routes
pub async fn not_found() -> impl Responder {
    HttpResponse::NotFound().json(json!({
        "error": "Endpoint not found",
        "message": "The requested resource does not exist",
        "available_endpoints": "/api for API documentation"
    }))
}
