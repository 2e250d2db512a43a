//! # StayHub Backend Service
//!
//! This is the main entry point for the backend of the StayHub
//! vacation-rental marketplace. It provides:
//!
//! - REST API for guests, hosts and admins
//! - Booking lifecycle with payments and refunds
//! - Background completion of finished stays
//! - PostgreSQL storage for every marketplace record
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        BACKEND SERVICE                           │
//! │                                                                  │
//! │  ┌─────────────────────────────┐  ┌─────────────────────────┐   │
//! │  │  REST API (Actix)           │  │   Background Services   │   │
//! │  │  rate limit → auth → handler│  │  • Stay completion      │   │
//! │  │                             │  │    sweeper              │   │
//! │  │  /listings  /bookings       │  │                         │   │
//! │  │  /host      /admin          │  │                         │   │
//! │  └─────────────────────────────┘  └─────────────────────────┘   │
//! │                 │                              │                 │
//! │                 └──────────────┬───────────────┘                 │
//! │                                │                                 │
//! │  ┌─────────────────────────────┴─────────────────────────────┐  │
//! │  │                    SERVICE LAYER                           │  │
//! │  │  ┌──────────────┐ ┌──────────────┐ ┌──────────────────┐   │  │
//! │  │  │BookingManager│ │ListingService│ │ModerationService │   │  │
//! │  │  └──────────────┘ └──────────────┘ └──────────────────┘   │  │
//! │  └───────────────────────────────────────────────────────────┘  │
//! │                                │                                 │
//! │         ┌──────────────────────┴──────────┐                      │
//! │         │                                 │                      │
//! │  ┌──────┴──────┐                   ┌──────┴──────┐              │
//! │  │  PostgreSQL │                   │   Payment   │              │
//! │  │  Database   │                   │   Gateway   │              │
//! │  └─────────────┘                   └─────────────┘              │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! 1. Set up PostgreSQL and create the database
//! 2. Copy `.env.example` to `.env` and configure
//! 3. Start the server: `cargo run` (migrations run at startup)
//!
//! ## Environment Variables
//!
//! See `.env.example` and the `config` module for all settings.

use std::sync::Arc;
use std::time::{Duration, Instant};

use actix_cors::Cors;
use actix_web::dev::Service;
use actix_web::{http, middleware, web, App, HttpServer};
use futures::future::{ready, Either, FutureExt};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod api;
mod config;
mod db;
mod models;
mod services;
mod utils;

use config::AppConfig;
use db::{Database, MarketplaceStore};
use services::{
    AccessControl, AccountService, AvailabilityEngine, BookingManager, DisputeService,
    ListingService, MockPaymentGateway, ModerationService, PaymentGateway, RateLimiter,
    StayCompletionSweeper,
};

/// Application state shared across all handlers.
///
/// This struct contains all the shared resources that API handlers
/// and background services need access to.
///
/// ## Why Arc?
/// `Arc` (Atomic Reference Counting) allows us to share ownership
/// of these resources across multiple threads safely. Every service holds
/// the same store handle, so swapping PostgreSQL for the in-memory store
/// in tests changes nothing else.
pub struct AppState {
    /// Persistence boundary (PostgreSQL in production)
    pub store: Arc<dyn MarketplaceStore>,

    /// Caller resolution for authenticated requests
    pub access: AccessControl,

    /// Registration, login and session tokens
    pub accounts: AccountService,

    /// Host onboarding, listings and search
    pub listings: ListingService,

    /// Price quotes and availability checks
    pub availability: AvailabilityEngine,

    /// Booking lifecycle, payments and refunds
    pub bookings: BookingManager,

    /// Listing approval and user suspension
    pub moderation: ModerationService,

    /// Booking disputes
    pub disputes: DisputeService,

    /// Per-client request counter
    pub rate_limiter: RateLimiter,

    /// Application configuration
    pub config: AppConfig,
}

impl AppState {
    pub fn new(
        store: Arc<dyn MarketplaceStore>,
        gateway: Arc<dyn PaymentGateway>,
        config: AppConfig,
    ) -> Self {
        Self {
            access: AccessControl::new(store.clone()),
            accounts: AccountService::new(store.clone(), config.clone()),
            listings: ListingService::new(store.clone()),
            availability: AvailabilityEngine::new(store.clone()),
            bookings: BookingManager::new(store.clone(), gateway, config.clone()),
            moderation: ModerationService::new(store.clone()),
            disputes: DisputeService::new(store.clone()),
            rate_limiter: RateLimiter::new(
                Duration::from_secs(config.rate_limit_window_secs),
                config.rate_limit_max_requests,
            ),
            store,
            config,
        }
    }
}

fn cors(config: &AppConfig) -> Cors {
    let cors = match &config.cors_allowed_origin {
        Some(origin) => Cors::default().allowed_origin(origin),
        None => Cors::default().allow_any_origin(),
    };
    cors.allowed_methods(vec!["GET", "POST", "PUT", "OPTIONS"])
        .allowed_headers(vec![http::header::AUTHORIZATION, http::header::CONTENT_TYPE])
        .max_age(3600)
}

/// Main entry point for the backend service.
///
/// This function:
/// 1. Loads configuration from environment
/// 2. Initializes database connection and schema
/// 3. Wires the services
/// 4. Starts background services
/// 5. Launches the HTTP server
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // =========================================
    // STEP 1: Initialize Logging
    // =========================================
    // RUST_LOG overrides the default level
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    info!("🚀 Starting StayHub Backend Service");

    // =========================================
    // STEP 2: Load Configuration
    // =========================================
    dotenvy::dotenv().ok(); // It's okay if .env doesn't exist

    let config = AppConfig::from_env()
        .expect("Failed to load configuration");

    info!("📋 Configuration loaded");
    info!("   Currency: {}", config.currency);
    info!(
        "   Rate limit: {} requests / {}s",
        config.rate_limit_max_requests, config.rate_limit_window_secs
    );

    // =========================================
    // STEP 3: Initialize Database
    // =========================================
    let db = Database::connect(&config.database_url, config.db_pool_size)
        .await
        .expect("Failed to connect to database");

    info!("🗄️  Database connected");

    // Run migrations to ensure schema is up to date
    db.run_migrations()
        .await
        .expect("Failed to run migrations");

    info!("📦 Database migrations complete");

    // =========================================
    // STEP 4: Initialize Services
    // =========================================
    let store: Arc<dyn MarketplaceStore> = Arc::new(db);
    let gateway: Arc<dyn PaymentGateway> = Arc::new(MockPaymentGateway::new(
        Duration::from_millis(config.payment_latency_ms),
    ));

    let app_state = Arc::new(AppState::new(store.clone(), gateway, config.clone()));

    info!("🔧 Services initialized");

    // =========================================
    // STEP 5: Bootstrap Administrator
    // =========================================
    match (&config.admin_email, &config.admin_password) {
        (Some(email), Some(password)) => {
            app_state
                .accounts
                .ensure_admin(email, password)
                .await
                .expect("Failed to bootstrap admin account");
        }
        _ => warn!("ADMIN_EMAIL/ADMIN_PASSWORD not set, no admin bootstrapped"),
    }

    // =========================================
    // STEP 6: Start Background Services
    // =========================================
    let sweeper = StayCompletionSweeper::new(store, config.clone());
    tokio::spawn(async move {
        sweeper.start_sweep_loop().await;
    });

    info!("🏁 Stay completion sweeper started");

    // =========================================
    // STEP 7: Start HTTP Server
    // =========================================
    let server_host = config.server_host.clone();
    let server_port = config.server_port;

    info!("🌐 Starting HTTP server on {}:{}", server_host, server_port);

    HttpServer::new(move || {
        App::new()
            // Attach shared application state
            .app_data(web::Data::new(app_state.clone()))

            // Fixed-window rate limit per client address
            .wrap_fn(|req, srv| {
                let allowed = req
                    .app_data::<web::Data<Arc<AppState>>>()
                    .map(|state| state.rate_limiter.check(&api::client_key(&req), Instant::now()))
                    .unwrap_or(true);

                if allowed {
                    Either::Left(srv.call(req).map(|res| res.map(|r| r.map_into_left_body())))
                } else {
                    let response = req.into_response(api::too_many_requests());
                    Either::Right(ready(Ok(response.map_into_right_body())))
                }
            })

            // Security headers on every response
            .wrap(
                middleware::DefaultHeaders::new()
                    .add(("X-Frame-Options", "DENY"))
                    .add(("X-Content-Type-Options", "nosniff"))
                    .add(("Referrer-Policy", "strict-origin-when-cross-origin"))
                    .add(("Permissions-Policy", "camera=(), microphone=(), geolocation=()")),
            )

            .wrap(cors(&app_state.config))

            // Add logging middleware
            .wrap(middleware::Logger::default())

            // Configure API routes
            .configure(api::configure_routes)
    })
    .bind(format!("{}:{}", server_host, server_port))?
    .run()
    .await
}
