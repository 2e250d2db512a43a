//! # API Request Handlers
//!
//! This module contains the handler functions for each API endpoint.
//! Each handler:
//! 1. Extracts request data (and the caller, where required)
//! 2. Calls the appropriate service, which validates and authorizes
//! 3. Returns a formatted response
//!
//! ## Error Handling
//!
//! Handlers return `Result<HttpResponse, ServiceError>`; errors render as
//! the standard envelope with the matching HTTP status:
//!
//! ```json
//! {
//!     "success": false,
//!     "error": {
//!         "code": "CONFLICT",
//!         "message": "Conflict: listing is already booked for these dates"
//!     }
//! }
//! ```

use std::sync::Arc;

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::MarketplaceStore;
use crate::models::{
    ApiResponse, AuthResponse, BecomeHostRequest, BookingResponse, BookingStatusResponse,
    CreateBookingRequest, CreateListingRequest, DisputeQuery, DisputeResponse, HealthResponse,
    ListingDetailResponse, ListingPageResponse, ListingResponse, ListingSearchQuery, LoginRequest,
    OpenDisputeRequest, PageQuery, PaymentRequest, PaymentResponse, QuoteQuery,
    RefundIssueResponse, RegisterRequest, RejectListingRequest, ResolveDisputeRequest,
    ReviewCreatedResponse, ReviewReplyRequest, ReviewRequest, ReviewResponse, SetActiveRequest,
    UpdateBookingStatusRequest, UpdatePricingRequest, UserResponse,
};
use crate::services::ServiceError;
use crate::AppState;

use super::auth::{AuthenticatedUser, MaybeAuthenticated};

type State = web::Data<Arc<AppState>>;
type HandlerResult = Result<HttpResponse, ServiceError>;

fn ok<T: serde::Serialize>(data: T) -> HandlerResult {
    Ok(HttpResponse::Ok().json(ApiResponse::success(data)))
}

fn created<T: serde::Serialize>(data: T) -> HandlerResult {
    Ok(HttpResponse::Created().json(ApiResponse::success(data)))
}

/// API information endpoint (root).
///
/// Returns information about available API endpoints.
///
/// ## Endpoint
///
/// `GET /`
pub async fn api_info() -> HttpResponse {
    let info = json!({
        "name": "StayHub API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Vacation-rental marketplace: listings, bookings, payments and moderation",
        "endpoints": {
            "health": { "method": "GET", "path": "/health" },
            "auth": {
                "register": { "method": "POST", "path": "/auth/register" },
                "login": { "method": "POST", "path": "/auth/login" },
                "me": { "method": "GET", "path": "/me" }
            },
            "host": {
                "profile": { "method": "POST", "path": "/host/profile" },
                "listings": { "method": "GET", "path": "/host/listings" },
                "bookings": { "method": "GET", "path": "/host/bookings" }
            },
            "listings": {
                "create": { "method": "POST", "path": "/listings" },
                "search": { "method": "GET", "path": "/listings" },
                "detail": { "method": "GET", "path": "/listings/{id}" },
                "quote": { "method": "GET", "path": "/listings/{id}/quote" },
                "pricing": { "method": "PUT", "path": "/listings/{id}/pricing" },
                "active": { "method": "PUT", "path": "/listings/{id}/active" }
            },
            "bookings": {
                "create": { "method": "POST", "path": "/bookings" },
                "mine": { "method": "GET", "path": "/bookings" },
                "detail": { "method": "GET", "path": "/bookings/{id}" },
                "status": { "method": "PUT", "path": "/bookings/{id}/status" },
                "cancel": { "method": "POST", "path": "/bookings/{id}/cancel" },
                "payment": { "method": "POST", "path": "/bookings/{id}/payment" },
                "review": { "method": "POST", "path": "/bookings/{id}/review" },
                "dispute": { "method": "POST", "path": "/bookings/{id}/dispute" }
            },
            "reviews": {
                "response": { "method": "POST", "path": "/reviews/{id}/response" }
            },
            "admin": {
                "pendingListings": { "method": "GET", "path": "/admin/listings/pending" },
                "approveListing": { "method": "POST", "path": "/admin/listings/{id}/approve" },
                "rejectListing": { "method": "POST", "path": "/admin/listings/{id}/reject" },
                "users": { "method": "GET", "path": "/admin/users" },
                "suspendUser": { "method": "POST", "path": "/admin/users/{id}/suspend" },
                "reactivateUser": { "method": "POST", "path": "/admin/users/{id}/reactivate" },
                "disputes": { "method": "GET", "path": "/admin/disputes" },
                "resolveDispute": { "method": "POST", "path": "/admin/disputes/{id}/resolve" },
                "refundIssues": { "method": "GET", "path": "/admin/refund-issues" },
                "retryRefund": { "method": "POST", "path": "/admin/bookings/{id}/refund" }
            }
        }
    });

    HttpResponse::Ok().json(ApiResponse::success(info))
}

/// Health check endpoint.
///
/// ## Endpoint
///
/// `GET /health`
///
/// ## Example
///
/// ```bash
/// curl http://127.0.0.1:8080/health
/// ```
///
/// ## Response
///
/// ```json
/// {
///     "success": true,
///     "data": {
///         "status": "healthy",
///         "database": true,
///         "version": "0.1.0",
///         "timestamp": "2026-01-08T12:00:00Z"
///     }
/// }
/// ```
pub async fn health_check(state: State) -> HttpResponse {
    let db_healthy = match state.store.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!("Health check: database unreachable: {}", e);
            false
        }
    };

    let response = HealthResponse {
        status: if db_healthy { "healthy" } else { "unhealthy" }.to_string(),
        database: db_healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now(),
    };

    let status_code = if db_healthy {
        actix_web::http::StatusCode::OK
    } else {
        actix_web::http::StatusCode::SERVICE_UNAVAILABLE
    };

    HttpResponse::build(status_code).json(ApiResponse::success(response))
}

// ==========================================
// ACCOUNTS
// ==========================================

/// Create an account.
///
/// ## Endpoint
///
/// `POST /auth/register`
///
/// ```bash
/// curl -X POST http://127.0.0.1:8080/auth/register \
///   -H "Content-Type: application/json" \
///   -d '{"name": "Ayesha Khan", "email": "ayesha@example.pk", "password": "secret123"}'
/// ```
pub async fn register(state: State, body: web::Json<RegisterRequest>) -> HandlerResult {
    let session = state.accounts.register(body.into_inner()).await?;
    created(AuthResponse {
        token: session.token,
        user: session.user.into(),
    })
}

/// `POST /auth/login`
pub async fn login(state: State, body: web::Json<LoginRequest>) -> HandlerResult {
    let session = state.accounts.login(body.into_inner()).await?;
    ok(AuthResponse {
        token: session.token,
        user: session.user.into(),
    })
}

/// `GET /me`
pub async fn me(state: State, user: AuthenticatedUser) -> HandlerResult {
    let me = state.accounts.me(&user.0).await?;
    ok(UserResponse::from(me))
}

// ==========================================
// HOSTS & LISTINGS
// ==========================================

/// Become a host.
///
/// ## Endpoint
///
/// `POST /host/profile`
///
/// Upgrades the caller's role to HOST. A second call returns `409 CONFLICT`.
pub async fn become_host(
    state: State,
    user: AuthenticatedUser,
    body: web::Json<BecomeHostRequest>,
) -> HandlerResult {
    let upgraded = state.listings.become_host(&user.0, body.into_inner()).await?;
    created(UserResponse::from(upgraded))
}

/// `GET /host/listings`
pub async fn host_listings(state: State, user: AuthenticatedUser) -> HandlerResult {
    let listings = state.listings.host_listings(&user.0).await?;
    ok(listings.into_iter().map(ListingResponse::from).collect::<Vec<_>>())
}

/// `GET /host/bookings`
pub async fn host_bookings(state: State, user: AuthenticatedUser) -> HandlerResult {
    let bookings = state.bookings.host_bookings(&user.0).await?;
    ok(bookings.into_iter().map(BookingResponse::from).collect::<Vec<_>>())
}

/// Submit a listing for review.
///
/// ## Endpoint
///
/// `POST /listings`
///
/// The listing is created PENDING and inactive; it appears in search
/// once an admin approves it.
pub async fn create_listing(
    state: State,
    user: AuthenticatedUser,
    body: web::Json<CreateListingRequest>,
) -> HandlerResult {
    let listing = state.listings.create_listing(&user.0, body.into_inner()).await?;
    created(ListingResponse::from(listing))
}

/// Search bookable listings.
///
/// ## Endpoint
///
/// `GET /listings?city=lahore&propertyType=APARTMENT&minPrice=5000&maxPrice=20000&sort=price_asc&page=1`
///
/// ## Response
///
/// ```json
/// {
///     "success": true,
///     "data": {
///         "listings": [ ... ],
///         "page": 1,
///         "pageSize": 12,
///         "total": 31,
///         "totalPages": 3
///     }
/// }
/// ```
pub async fn search_listings(state: State, query: web::Query<ListingSearchQuery>) -> HandlerResult {
    let page = state.listings.search(query.into_inner()).await?;
    ok(ListingPageResponse::from(page))
}

/// `GET /listings/{id}`. Token optional.
pub async fn get_listing(
    state: State,
    viewer: MaybeAuthenticated,
    path: web::Path<Uuid>,
) -> HandlerResult {
    let detail = state.listings.detail(viewer.0.as_ref(), path.into_inner()).await?;
    ok(ListingDetailResponse::from(detail))
}

/// Price preview for a stay.
///
/// ## Endpoint
///
/// `GET /listings/{id}/quote?checkIn=2030-06-01&checkOut=2030-06-04`
///
/// ## Response
///
/// ```json
/// {
///     "success": true,
///     "data": {
///         "listingId": "...",
///         "checkIn": "2030-06-01",
///         "checkOut": "2030-06-04",
///         "available": true,
///         "price": { "nightlyRate": 10000, "nights": 3, "subtotal": 30000,
///                    "cleaningFee": 2000, "serviceFee": 1500, "total": 33500 }
///     }
/// }
/// ```
pub async fn quote_listing(
    state: State,
    path: web::Path<Uuid>,
    query: web::Query<QuoteQuery>,
) -> HandlerResult {
    let quote = state
        .availability
        .quote(path.into_inner(), query.check_in, query.check_out, Utc::now().date_naive())
        .await?;
    ok(quote)
}

/// `PUT /listings/{id}/pricing`
pub async fn update_pricing(
    state: State,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdatePricingRequest>,
) -> HandlerResult {
    let listing = state
        .listings
        .update_pricing(&user.0, path.into_inner(), body.into_inner())
        .await?;
    ok(ListingResponse::from(listing))
}

/// `PUT /listings/{id}/active`
pub async fn set_listing_active(
    state: State,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<SetActiveRequest>,
) -> HandlerResult {
    let listing = state
        .listings
        .set_active(&user.0, path.into_inner(), body.active)
        .await?;
    ok(ListingResponse::from(listing))
}

// ==========================================
// BOOKINGS
// ==========================================

/// Request a stay.
///
/// ## Endpoint
///
/// `POST /bookings`
///
/// ```bash
/// curl -X POST http://127.0.0.1:8080/bookings \
///   -H "Authorization: Bearer $TOKEN" \
///   -H "Content-Type: application/json" \
///   -d '{"listingId": "...", "checkIn": "2030-06-01", "checkOut": "2030-06-04", "guestCount": 2}'
/// ```
///
/// Overlapping a pending or confirmed stay returns `409 CONFLICT`.
pub async fn create_booking(
    state: State,
    user: AuthenticatedUser,
    body: web::Json<CreateBookingRequest>,
) -> HandlerResult {
    let booking = state.bookings.create(&user.0, body.into_inner()).await?;
    created(BookingResponse::from(booking))
}

/// `GET /bookings`: the caller's own stays.
pub async fn my_bookings(state: State, user: AuthenticatedUser) -> HandlerResult {
    let bookings = state.bookings.guest_bookings(&user.0).await?;
    ok(bookings.into_iter().map(BookingResponse::from).collect::<Vec<_>>())
}

/// `GET /bookings/{id}`
pub async fn get_booking(state: State, user: AuthenticatedUser, path: web::Path<Uuid>) -> HandlerResult {
    let view = state.bookings.get(&user.0, path.into_inner()).await?;
    ok(BookingResponse::from(view))
}

/// Host decision on a booking.
///
/// ## Endpoint
///
/// `PUT /bookings/{id}/status` with `{"status": "CONFIRMED"}`
///
/// Rejecting or cancelling a paid booking attempts a refund; the outcome
/// is reported in `refund` and never undoes the status change.
pub async fn update_booking_status(
    state: State,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<UpdateBookingStatusRequest>,
) -> HandlerResult {
    let change = state
        .bookings
        .set_status(&user.0, path.into_inner(), &body.status)
        .await?;
    ok(BookingStatusResponse::from(change))
}

/// `POST /bookings/{id}/cancel`
pub async fn cancel_booking(state: State, user: AuthenticatedUser, path: web::Path<Uuid>) -> HandlerResult {
    let change = state.bookings.cancel(&user.0, path.into_inner()).await?;
    ok(BookingStatusResponse::from(change))
}

/// Pay for a booking.
///
/// ## Endpoint
///
/// `POST /bookings/{id}/payment`
///
/// ```json
/// { "method": "JAZZCASH", "details": { "mobileNumber": "03001234567" } }
/// ```
///
/// A declined charge returns `502 PAYMENT_FAILED`; a second payment for
/// the same booking returns `409 CONFLICT`.
pub async fn pay_booking(
    state: State,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<PaymentRequest>,
) -> HandlerResult {
    let booking_id = path.into_inner();
    info!("Payment request for booking {} via {}", booking_id, body.method);
    let payment = state.bookings.pay(&user.0, booking_id, body.into_inner()).await?;
    created(PaymentResponse::from(payment))
}

/// `POST /bookings/{id}/review`
pub async fn review_booking(
    state: State,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<ReviewRequest>,
) -> HandlerResult {
    let result = state
        .bookings
        .review(&user.0, path.into_inner(), body.into_inner())
        .await?;
    created(ReviewCreatedResponse::from(result))
}

/// `POST /reviews/{id}/response`
pub async fn reply_to_review(
    state: State,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<ReviewReplyRequest>,
) -> HandlerResult {
    let review = state
        .bookings
        .reply_to_review(&user.0, path.into_inner(), body.into_inner())
        .await?;
    ok(ReviewResponse::from(review))
}

/// `POST /bookings/{id}/dispute`
pub async fn open_dispute(
    state: State,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<OpenDisputeRequest>,
) -> HandlerResult {
    let dispute = state
        .disputes
        .open(&user.0, path.into_inner(), body.into_inner())
        .await?;
    created(DisputeResponse::from(dispute))
}

// ==========================================
// ADMIN
// ==========================================

pub async fn pending_listings(state: State, user: AuthenticatedUser) -> HandlerResult {
    let listings = state.moderation.pending_listings(&user.0).await?;
    ok(listings.into_iter().map(ListingResponse::from).collect::<Vec<_>>())
}

pub async fn approve_listing(state: State, user: AuthenticatedUser, path: web::Path<Uuid>) -> HandlerResult {
    let listing = state.moderation.approve_listing(&user.0, path.into_inner()).await?;
    ok(ListingResponse::from(listing))
}

pub async fn reject_listing(
    state: State,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<RejectListingRequest>,
) -> HandlerResult {
    let listing = state
        .moderation
        .reject_listing(&user.0, path.into_inner(), body.into_inner())
        .await?;
    ok(ListingResponse::from(listing))
}

/// `GET /admin/users?limit=50&offset=0`
pub async fn list_users(state: State, user: AuthenticatedUser, query: web::Query<PageQuery>) -> HandlerResult {
    let users = state
        .moderation
        .list_users(&user.0, query.limit, query.offset)
        .await?;
    ok(users.into_iter().map(UserResponse::from).collect::<Vec<_>>())
}

pub async fn suspend_user(state: State, user: AuthenticatedUser, path: web::Path<Uuid>) -> HandlerResult {
    let suspended = state.moderation.suspend_user(&user.0, path.into_inner()).await?;
    ok(UserResponse::from(suspended))
}

pub async fn reactivate_user(state: State, user: AuthenticatedUser, path: web::Path<Uuid>) -> HandlerResult {
    let reactivated = state.moderation.reactivate_user(&user.0, path.into_inner()).await?;
    ok(UserResponse::from(reactivated))
}

/// `GET /admin/disputes?status=OPEN`
pub async fn list_disputes(
    state: State,
    user: AuthenticatedUser,
    query: web::Query<DisputeQuery>,
) -> HandlerResult {
    let disputes = state.disputes.list(&user.0, query.status.as_deref()).await?;
    ok(disputes.into_iter().map(DisputeResponse::from).collect::<Vec<_>>())
}

pub async fn resolve_dispute(
    state: State,
    user: AuthenticatedUser,
    path: web::Path<Uuid>,
    body: web::Json<ResolveDisputeRequest>,
) -> HandlerResult {
    let dispute = state
        .disputes
        .resolve(&user.0, path.into_inner(), body.into_inner())
        .await?;
    ok(DisputeResponse::from(dispute))
}

pub async fn refund_issues(state: State, user: AuthenticatedUser) -> HandlerResult {
    let issues = state.moderation.refund_issues(&user.0).await?;
    ok(issues.into_iter().map(RefundIssueResponse::from).collect::<Vec<_>>())
}

/// Manual refund retry.
///
/// ## Endpoint
///
/// `POST /admin/bookings/{id}/refund`
///
/// Only for REJECTED or CANCELLED bookings. Success closes the booking's
/// open refund issues.
pub async fn retry_refund(state: State, user: AuthenticatedUser, path: web::Path<Uuid>) -> HandlerResult {
    let outcome = state.bookings.retry_refund(&user.0, path.into_inner()).await?;
    ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::configure_routes;
    use crate::config::AppConfig;
    use crate::db::memory::MemoryStore;
    use crate::services::MockPaymentGateway;
    use actix_web::http::{header, StatusCode};
    use actix_web::{test, App};
    use chrono::Duration;
    use serde_json::Value;

    fn state() -> Arc<AppState> {
        Arc::new(AppState::new(
            Arc::new(MemoryStore::new()),
            Arc::new(MockPaymentGateway::new(std::time::Duration::ZERO)),
            AppConfig::for_tests(),
        ))
    }

    macro_rules! app {
        ($state:expr) => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new($state.clone()))
                    .configure(configure_routes),
            )
            .await
        };
    }

    fn bearer(token: &str) -> (header::HeaderName, String) {
        (header::AUTHORIZATION, format!("Bearer {}", token))
    }

    fn date(days: i64) -> String {
        (Utc::now().date_naive() + Duration::days(days)).to_string()
    }

    #[actix_rt::test]
    async fn test_health_and_info() {
        let state = state();
        let app = app!(state);

        let resp = test::call_service(&app, test::TestRequest::get().uri("/health").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["status"], "healthy");

        let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
        assert!(resp.status().is_success());
    }

    #[actix_rt::test]
    async fn test_protected_route_requires_token() {
        let state = state();
        let app = app!(state);

        let resp = test::call_service(&app, test::TestRequest::get().uri("/me").to_request()).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");

        let req = test::TestRequest::get()
            .uri("/me")
            .insert_header(bearer("not-a-jwt"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_rt::test]
    async fn test_malformed_json_is_validation_failure() {
        let state = state();
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/auth/register")
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .set_payload("{\"email\": ")
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["error"]["code"], "VALIDATION_FAILED");
    }

    #[actix_rt::test]
    async fn test_unknown_listing_is_not_found() {
        let state = state();
        let app = app!(state);
        let req = test::TestRequest::get()
            .uri(&format!("/listings/{}", Uuid::new_v4()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let bad_id = test::TestRequest::get().uri("/listings/not-a-uuid").to_request();
        let resp = test::call_service(&app, bad_id).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    /// Register, become a host, list, get approved, book, pay, reject with
    /// refund: the whole marketplace loop over HTTP.
    #[actix_rt::test]
    async fn test_marketplace_flow() {
        let state = state();
        let app = app!(state);

        // host signs up and onboards
        let req = test::TestRequest::post()
            .uri("/auth/register")
            .set_json(json!({ "name": "Bilal Ahmed", "email": "bilal@example.pk", "password": "secret123" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        let host_token = body["data"]["token"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri("/host/profile")
            .insert_header(bearer(&host_token))
            .set_json(json!({
                "bio": "Family-run guest house near Mall Road.",
                "bankName": "Meezan Bank",
                "accountNumber": "01234567890"
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["role"], "HOST");

        let req = test::TestRequest::post()
            .uri("/listings")
            .insert_header(bearer(&host_token))
            .set_json(json!({
                "title": "Murree Hills Apartment",
                "description": "Two bedroom apartment with a view of the pine forest.",
                "propertyType": "APARTMENT",
                "province": "PUNJAB",
                "city": "Murree",
                "address": "Mall Road, Murree",
                "pricePerNight": 10000,
                "cleaningFee": 2000,
                "maxGuests": 4
            }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["status"], "PENDING");
        let listing_id = body["data"]["id"].as_str().unwrap().to_string();

        // admin approves
        let admin = state.accounts.ensure_admin("admin@stayhub.pk", "admin-password").await.unwrap();
        let admin_token = state.accounts.issue_token(admin.id).unwrap();
        let req = test::TestRequest::post()
            .uri(&format!("/admin/listings/{}/approve", listing_id))
            .insert_header(bearer(&admin_token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["status"], "APPROVED");

        let req = test::TestRequest::get().uri("/listings?city=murree").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["total"], 1);

        // guest books and pays
        let req = test::TestRequest::post()
            .uri("/auth/register")
            .set_json(json!({ "name": "Sana Malik", "email": "sana@example.pk", "password": "secret123" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let guest_token = body["data"]["token"].as_str().unwrap().to_string();

        let req = test::TestRequest::get()
            .uri(&format!("/listings/{}/quote?checkIn={}&checkOut={}", listing_id, date(10), date(13)))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["available"], true);
        assert_eq!(body["data"]["price"]["total"], 33_500);

        let req = test::TestRequest::post()
            .uri("/bookings")
            .insert_header(bearer(&guest_token))
            .set_json(json!({ "listingId": listing_id, "checkIn": date(10), "checkOut": date(13), "guestCount": 2 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["price"]["total"], 33_500);
        let booking_id = body["data"]["id"].as_str().unwrap().to_string();

        // overlapping request from the same guest
        let req = test::TestRequest::post()
            .uri("/bookings")
            .insert_header(bearer(&guest_token))
            .set_json(json!({ "listingId": listing_id, "checkIn": date(12), "checkOut": date(15), "guestCount": 2 }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::post()
            .uri(&format!("/bookings/{}/payment", booking_id))
            .insert_header(bearer(&guest_token))
            .set_json(json!({ "method": "JAZZCASH", "details": { "mobileNumber": "03001234567" } }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["data"]["status"], "COMPLETED");
        assert_eq!(body["data"]["amount"], 33_500);

        // guest cannot decide on their own booking
        let req = test::TestRequest::put()
            .uri(&format!("/bookings/{}/status", booking_id))
            .insert_header(bearer(&guest_token))
            .set_json(json!({ "status": "CONFIRMED" }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);

        // host rejects, payment is refunded
        let req = test::TestRequest::put()
            .uri(&format!("/bookings/{}/status", booking_id))
            .insert_header(bearer(&host_token))
            .set_json(json!({ "status": "REJECTED" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["booking"]["status"], "REJECTED");
        assert_eq!(body["data"]["refund"]["outcome"], "REFUNDED");

        let req = test::TestRequest::get()
            .uri(&format!("/bookings/{}", booking_id))
            .insert_header(bearer(&guest_token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["payment"]["status"], "REFUNDED");
    }

    #[actix_rt::test]
    async fn test_suspended_user_can_read_but_not_write() {
        let state = state();
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/auth/register")
            .set_json(json!({ "name": "Usman Tariq", "email": "usman@example.pk", "password": "secret123" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let token = body["data"]["token"].as_str().unwrap().to_string();
        let user_id: Uuid = body["data"]["user"]["id"].as_str().unwrap().parse().unwrap();

        let admin = state.accounts.ensure_admin("admin@stayhub.pk", "admin-password").await.unwrap();
        let admin_token = state.accounts.issue_token(admin.id).unwrap();
        let req = test::TestRequest::post()
            .uri(&format!("/admin/users/{}/suspend", user_id))
            .insert_header(bearer(&admin_token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["data"]["suspended"], true);

        let req = test::TestRequest::get()
            .uri("/bookings")
            .insert_header(bearer(&token))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);

        let req = test::TestRequest::post()
            .uri("/host/profile")
            .insert_header(bearer(&token))
            .set_json(json!({
                "bio": "Trying to host while suspended.",
                "bankName": "HBL",
                "accountNumber": "99887766"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    #[actix_rt::test]
    async fn test_admin_routes_reject_guests() {
        let state = state();
        let app = app!(state);

        let req = test::TestRequest::post()
            .uri("/auth/register")
            .set_json(json!({ "name": "Hina Shah", "email": "hina@example.pk", "password": "secret123" }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let token = body["data"]["token"].as_str().unwrap().to_string();

        for uri in ["/admin/users", "/admin/listings/pending", "/admin/refund-issues", "/admin/disputes"] {
            let req = test::TestRequest::get().uri(uri).insert_header(bearer(&token)).to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::FORBIDDEN, "{}", uri);
        }
    }
}
