//! # API Route Configuration
//!
//! This module sets up all the HTTP routes for the API.

use actix_web::{error, web, HttpRequest};

use crate::services::ServiceError;

use super::handlers;

/// Bad JSON bodies, query strings and path segments all become
/// `VALIDATION_FAILED` instead of actix's plain-text defaults.
fn json_error(err: error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ServiceError::ValidationFailed(err.to_string()).into()
}

fn query_error(err: error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    ServiceError::ValidationFailed(err.to_string()).into()
}

fn path_error(err: error::PathError, _req: &HttpRequest) -> actix_web::Error {
    ServiceError::ValidationFailed(err.to_string()).into()
}

/// Configure all API routes.
///
/// This function is called from main.rs to set up
/// all the endpoint routes.
///
/// ## Route Structure
///
/// ```text
/// /
/// ├── /health                       GET  - Health check
/// ├── /auth
/// │   ├── /register                 POST - Create account
/// │   └── /login                    POST - Get a session token
/// ├── /me                           GET  - Caller profile
/// ├── /host
/// │   ├── /profile                  POST - Become a host
/// │   ├── /listings                 GET  - Own listings
/// │   └── /bookings                 GET  - Incoming bookings
/// ├── /listings                     POST - Create / GET - Search
/// │   └── /{id}                     GET  - Detail
/// │       ├── /quote                GET  - Price + availability
/// │       ├── /pricing              PUT  - Update rates
/// │       └── /active               PUT  - Toggle visibility
/// ├── /bookings                     POST - Book / GET - Own bookings
/// │   └── /{id}                     GET  - Booking view
/// │       ├── /status               PUT  - Host decision
/// │       ├── /cancel               POST - Guest cancellation
/// │       ├── /payment              POST - Pay
/// │       ├── /review               POST - Review stay
/// │       └── /dispute              POST - Open dispute
/// ├── /reviews/{id}/response        POST - Host reply
/// └── /admin
///     ├── /listings/pending         GET
///     ├── /listings/{id}/approve    POST
///     ├── /listings/{id}/reject     POST
///     ├── /users                    GET
///     ├── /users/{id}/suspend       POST
///     ├── /users/{id}/reactivate    POST
///     ├── /disputes                 GET
///     ├── /disputes/{id}/resolve    POST
///     ├── /refund-issues            GET
///     └── /bookings/{id}/refund     POST - Manual refund retry
/// ```
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg
        .app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::QueryConfig::default().error_handler(query_error))
        .app_data(web::PathConfig::default().error_handler(path_error))

        // Root endpoint - API information
        .route("/", web::get().to(handlers::api_info))

        // Health check endpoint
        .route("/health", web::get().to(handlers::health_check))

        // Accounts
        .service(
            web::scope("/auth")
                .route("/register", web::post().to(handlers::register))
                .route("/login", web::post().to(handlers::login)),
        )
        .route("/me", web::get().to(handlers::me))

        // Host dashboard
        .service(
            web::scope("/host")
                .route("/profile", web::post().to(handlers::become_host))
                .route("/listings", web::get().to(handlers::host_listings))
                .route("/bookings", web::get().to(handlers::host_bookings)),
        )

        // Listings
        .service(
            web::scope("/listings")
                .route("", web::post().to(handlers::create_listing))
                .route("", web::get().to(handlers::search_listings))
                .route("/{id}", web::get().to(handlers::get_listing))
                .route("/{id}/quote", web::get().to(handlers::quote_listing))
                .route("/{id}/pricing", web::put().to(handlers::update_pricing))
                .route("/{id}/active", web::put().to(handlers::set_listing_active)),
        )

        // Bookings
        .service(
            web::scope("/bookings")
                .route("", web::post().to(handlers::create_booking))
                .route("", web::get().to(handlers::my_bookings))
                .route("/{id}", web::get().to(handlers::get_booking))
                .route("/{id}/status", web::put().to(handlers::update_booking_status))
                .route("/{id}/cancel", web::post().to(handlers::cancel_booking))
                .route("/{id}/payment", web::post().to(handlers::pay_booking))
                .route("/{id}/review", web::post().to(handlers::review_booking))
                .route("/{id}/dispute", web::post().to(handlers::open_dispute)),
        )
        .route("/reviews/{id}/response", web::post().to(handlers::reply_to_review))

        // Admin
        .service(
            web::scope("/admin")
                .route("/listings/pending", web::get().to(handlers::pending_listings))
                .route("/listings/{id}/approve", web::post().to(handlers::approve_listing))
                .route("/listings/{id}/reject", web::post().to(handlers::reject_listing))
                .route("/users", web::get().to(handlers::list_users))
                .route("/users/{id}/suspend", web::post().to(handlers::suspend_user))
                .route("/users/{id}/reactivate", web::post().to(handlers::reactivate_user))
                .route("/disputes", web::get().to(handlers::list_disputes))
                .route("/disputes/{id}/resolve", web::post().to(handlers::resolve_dispute))
                .route("/refund-issues", web::get().to(handlers::refund_issues))
                .route("/bookings/{id}/refund", web::post().to(handlers::retry_refund)),
        );
}
