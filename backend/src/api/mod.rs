//! # REST API Module
//!
//! This module defines all HTTP endpoints for the StayHub API.
//!
//! ## Endpoint Overview
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | POST | `/auth/register` | Create account |
//! | POST | `/auth/login` | Session token |
//! | GET | `/listings` | Search listings |
//! | GET | `/listings/{id}/quote` | Price quote |
//! | POST | `/bookings` | Request a stay |
//! | PUT | `/bookings/{id}/status` | Host decision |
//! | POST | `/bookings/{id}/payment` | Pay |
//! | GET | `/health` | Health check |
//!
//! See [`routes::configure_routes`] for the complete tree.
//!
//! ## Request/Response Format
//!
//! All requests and responses use JSON:
//!
//! ```json
//! // Success response
//! {
//!     "success": true,
//!     "data": { ... }
//! }
//!
//! // Error response
//! {
//!     "success": false,
//!     "error": {
//!         "code": "ERROR_CODE",
//!         "message": "Human readable message"
//!     }
//! }
//! ```
//!
//! ## Authentication
//!
//! Protected routes take `Authorization: Bearer <token>` where the token
//! comes from `/auth/register` or `/auth/login`.

pub mod auth;
pub mod handlers;
pub mod routes;

use actix_web::dev::ServiceRequest;
use actix_web::HttpResponse;

use crate::models::ApiResponse;

pub use routes::configure_routes;

/// Rate limiter key: the client address, honouring `X-Forwarded-For`.
pub fn client_key(req: &ServiceRequest) -> String {
    req.connection_info()
        .realip_remote_addr()
        .unwrap_or("unknown")
        .to_string()
}

/// Response for a client over its request budget.
pub fn too_many_requests() -> HttpResponse {
    HttpResponse::TooManyRequests().json(ApiResponse::<()>::error(
        "RATE_LIMITED",
        "Too many requests, slow down",
    ))
}
