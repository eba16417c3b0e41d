use actix_cors::Cors;
use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::{
    middleware::{Compress, DefaultHeaders, Logger},
    web, App, HttpResponse, HttpServer,
};
use dotenv::dotenv;
use log::{error, info};
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;

use punchline::config::{Config, StorageBackend};
use punchline::services::{OfflineGateway, PaymentGateway, RazorpayGateway, SchedulerService};
use punchline::store::{MemoryStore, PgStore, Store};
use punchline::{api_info, configure_routes, health_check, not_found, AppState};

async fn connect_store(config: &Config) -> Arc<dyn Store> {
    let database_url = match (&config.storage, &config.database_url) {
        (StorageBackend::Memory, _) => {
            info!("Using in-memory storage; data is lost on restart");
            return Arc::new(MemoryStore::new());
        }
        (StorageBackend::Postgres, Some(url)) => url,
        (StorageBackend::Postgres, None) => {
            error!("DATABASE_URL must be set when STORAGE=postgres");
            std::process::exit(1);
        }
    };

    info!("Connecting to database...");
    let db_pool = match PgPoolOptions::new()
        .max_connections(20)
        .min_connections(5)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(database_url)
        .await
    {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to create database pool: {}", e);
            std::process::exit(1);
        }
    };

    match sqlx::query("SELECT 1").fetch_one(&db_pool).await {
        Ok(_) => info!("Database connection successful"),
        Err(e) => {
            error!("Database connection failed: {}", e);
            std::process::exit(1);
        }
    }

    info!("Running database migrations...");
    match sqlx::migrate!("./migrations").run(&db_pool).await {
        Ok(_) => info!("Database migrations completed successfully"),
        Err(e) => {
            error!("Database migration failed: {}", e);
            std::process::exit(1);
        }
    }

    Arc::new(PgStore::new(db_pool))
}

fn payment_gateway(config: &Config) -> Arc<dyn PaymentGateway> {
    match &config.razorpay {
        Some(credentials) => match RazorpayGateway::new(credentials) {
            Ok(gateway) => Arc::new(gateway),
            Err(e) => {
                error!("Failed to build payment gateway client: {}", e);
                std::process::exit(1);
            }
        },
        None => Arc::new(OfflineGateway),
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenv().ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_secs()
        .init();

    info!("Starting Punchline Ticketing API v{}", env!("CARGO_PKG_VERSION"));

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            error!("Please set these variables in your .env file or environment");
            std::process::exit(1);
        }
    };
    config.log_summary();

    let store = connect_store(&config).await;
    let gateway = payment_gateway(&config);
    info!("Payment gateway: {}", gateway.name());

    SchedulerService::new(store.clone(), config.pending_booking_ttl_minutes).start_scheduled_tasks();

    // 100 requests per minute per IP, bursts of 20
    let governor_conf = match GovernorConfigBuilder::default()
        .requests_per_minute(100)
        .burst_size(20)
        .finish()
    {
        Some(conf) => conf,
        None => {
            error!("Invalid rate limiter configuration");
            std::process::exit(1);
        }
    };

    let server_host = config.server_host.clone();
    let server_port = config.server_port;
    let cors_origins = config.cors_allowed_origins.clone();
    let state = web::Data::new(AppState::new(store, gateway, config));

    info!("Starting HTTP server on {}:{}", server_host, server_port);
    info!("API documentation available at: http://{}:{}/api", server_host, server_port);

    HttpServer::new(move || {
        let cors_origins = cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _req_head| {
                cors_origins
                    .iter()
                    .any(|allowed| allowed == origin.to_str().unwrap_or(""))
            })
            .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "PATCH", "OPTIONS"])
            .allowed_headers(vec!["Content-Type", "Authorization", "Accept", "X-Requested-With", "Origin"])
            .expose_headers(vec!["Content-Length", "X-Request-ID"])
            .max_age(3600)
            .supports_credentials();

        App::new()
            .app_data(state.clone())
            .app_data(
                web::JsonConfig::default()
                    .limit(1024 * 1024)
                    .error_handler(|err, _req| {
                        error!("JSON payload error: {}", err);
                        actix_web::error::InternalError::from_response(
                            err,
                            HttpResponse::BadRequest().json(json!({
                                "error": "Invalid JSON payload",
                                "message": "Request body contains invalid JSON or exceeds size limit"
                            })),
                        )
                        .into()
                    }),
            )
            .wrap(cors)
            .wrap(Governor::new(&governor_conf))
            .wrap(Compress::default())
            .wrap(Logger::new(r#"%a "%r" %s %b "%{Referer}i" "%{User-Agent}i" %T"#))
            .wrap(
                DefaultHeaders::new()
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("X-Frame-Options", "DENY"))
                    .add(("Referrer-Policy", "strict-origin-when-cross-origin"))
                    .add(("Strict-Transport-Security", "max-age=31536000; includeSubDomains"))
                    .add(("Permissions-Policy", "geolocation=(), microphone=(), camera=()")),
            )
            .configure(configure_routes)
            .route("/health", web::get().to(health_check))
            .route("/api", web::get().to(api_info))
            .default_service(web::route().to(not_found))
    })
    .bind(format!("{}:{}", server_host, server_port))?
    .workers(num_cpus::get())
    .shutdown_timeout(30)
    .run()
    .await
}
