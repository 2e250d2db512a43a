//! # API Response Models
//!
//! Structures for outgoing API response bodies.
//! All responses are wrapped in a standard format.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::db::{
    BookingRecord, BookingStatus, DisputeCategory, DisputeRecord, DisputeStatus, ListingRating,
    ListingRecord, ListingStatus, PaymentMethod, PaymentRecord, PaymentStatus, PropertyType,
    Province, RefundIssueRecord, RefundTrigger, ReviewRecord, StayRange, UserRecord, UserRole,
};
use crate::services::availability::PriceBreakdown;
use crate::services::booking_manager::{BookingView, RefundOutcome, StatusChange};
use crate::services::listing_service::{ListingDetail, ListingPage};
use crate::utils::{excerpt, format_pkr};

/// Standard API response wrapper.
///
/// All API responses follow this format:
///
/// ## Success Response
///
/// ```json
/// {
///     "success": true,
///     "data": { ... },
///     "error": null
/// }
/// ```
///
/// ## Error Response
///
/// ```json
/// {
///     "success": false,
///     "data": null,
///     "error": {
///         "code": "CONFLICT",
///         "message": "Conflict: listing is already booked for these dates"
///     }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T> {
    /// Whether the request was successful.
    pub success: bool,

    /// Response data (null on error).
    pub data: Option<T>,

    /// Error information (null on success).
    pub error: Option<ApiError>,
}

impl<T> ApiResponse<T> {
    /// Create a successful response with data.
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error response.
    pub fn error(code: &str, message: &str) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(ApiError {
                code: code.to_string(),
                message: message.to_string(),
            }),
        }
    }
}

/// API error information.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Error code (e.g., "VALIDATION_FAILED").
    pub code: String,

    /// Human-readable error message.
    pub message: String,
}

// ==========================================
// ACCOUNTS
// ==========================================

/// A user as seen by clients. The password hash never leaves the server.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    pub role: UserRole,
    pub suspended: bool,
    pub created_at: DateTime<Utc>,
}

impl From<UserRecord> for UserResponse {
    fn from(user: UserRecord) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            phone: user.phone,
            role: user.role,
            suspended: user.suspended,
            created_at: user.created_at,
        }
    }
}

/// Returned by `POST /auth/register` and `POST /auth/login`.
///
/// ```json
/// {
///     "token": "eyJhbGciOiJIUzI1NiIs...",
///     "user": { "id": "...", "email": "ayesha@example.pk", "role": "GUEST", ... }
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub token: String,
    pub user: UserResponse,
}

// ==========================================
// LISTINGS
// ==========================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingResponse {
    pub id: Uuid,
    pub host_id: Uuid,
    pub title: String,
    /// First 160 characters of the description.
    pub summary: String,
    pub description: String,
    pub property_type: PropertyType,
    pub province: Province,
    pub city: String,
    pub address: String,
    pub price_per_night: i64,
    pub cleaning_fee: i64,
    /// e.g. "Rs 12,000"
    pub formatted_price: String,
    pub max_guests: i32,
    pub bedrooms: i32,
    pub beds: i32,
    pub bathrooms: i32,
    pub amenities: Vec<String>,
    pub status: ListingStatus,
    pub is_active: bool,
    pub admin_notes: Option<String>,
    pub avg_rating: f64,
    pub review_count: i32,
    pub created_at: DateTime<Utc>,
}

impl From<ListingRecord> for ListingResponse {
    fn from(l: ListingRecord) -> Self {
        Self {
            summary: excerpt(&l.description, 160),
            formatted_price: format_pkr(l.price_per_night),
            id: l.id,
            host_id: l.host_id,
            title: l.title,
            description: l.description,
            property_type: l.property_type,
            province: l.province,
            city: l.city,
            address: l.address,
            price_per_night: l.price_per_night,
            cleaning_fee: l.cleaning_fee,
            max_guests: l.max_guests,
            bedrooms: l.bedrooms,
            beds: l.beds,
            bathrooms: l.bathrooms,
            amenities: l.amenities,
            status: l.status,
            is_active: l.is_active,
            admin_notes: l.admin_notes,
            avg_rating: l.avg_rating,
            review_count: l.review_count,
            created_at: l.created_at,
        }
    }
}

/// Returned by `GET /listings/{id}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingDetailResponse {
    pub listing: ListingResponse,
    pub images: Vec<String>,
    pub host_name: String,
    pub reviews: Vec<ReviewResponse>,
    /// Upcoming dates that cannot be booked.
    pub booked_ranges: Vec<StayRange>,
}

impl From<ListingDetail> for ListingDetailResponse {
    fn from(d: ListingDetail) -> Self {
        Self {
            listing: d.listing.into(),
            images: d.images.into_iter().map(|i| i.url).collect(),
            host_name: d.host_name,
            reviews: d.reviews.into_iter().map(ReviewResponse::from).collect(),
            booked_ranges: d.booked_ranges,
        }
    }
}

/// Returned by `GET /listings`.
///
/// ```json
/// {
///     "listings": [ ... ],
///     "page": 1,
///     "pageSize": 12,
///     "total": 31,
///     "totalPages": 3
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPageResponse {
    pub listings: Vec<ListingResponse>,
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub total_pages: i64,
}

impl From<ListingPage> for ListingPageResponse {
    fn from(p: ListingPage) -> Self {
        Self {
            listings: p.listings.into_iter().map(ListingResponse::from).collect(),
            page: p.page,
            page_size: p.page_size,
            total: p.total,
            total_pages: p.total_pages,
        }
    }
}

// ==========================================
// BOOKINGS & PAYMENTS
// ==========================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    /// Gateway transaction id of the charge.
    pub transaction_id: String,
    pub refund_reference: Option<String>,
    pub paid_at: DateTime<Utc>,
    pub refunded_at: Option<DateTime<Utc>>,
}

impl From<PaymentRecord> for PaymentResponse {
    fn from(p: PaymentRecord) -> Self {
        Self {
            id: p.id,
            booking_id: p.booking_id,
            amount: p.amount,
            currency: p.currency,
            method: p.method,
            status: p.status,
            transaction_id: p.gateway_ref,
            refund_reference: p.refund_ref,
            paid_at: p.paid_at,
            refunded_at: p.refunded_at,
        }
    }
}

/// A booking with its frozen price breakdown.
///
/// ## Example Response
///
/// ```json
/// {
///     "id": "...",
///     "listingId": "...",
///     "checkIn": "2030-06-01",
///     "checkOut": "2030-06-04",
///     "guestCount": 2,
///     "status": "PENDING",
///     "price": {
///         "nightlyRate": 10000,
///         "nights": 3,
///         "subtotal": 30000,
///         "cleaningFee": 2000,
///         "serviceFee": 1500,
///         "total": 33500
///     },
///     "formattedTotal": "Rs 33,500",
///     "payment": null
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingResponse {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub guest_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guest_count: i32,
    pub status: BookingStatus,
    pub price: PriceBreakdown,
    pub formatted_total: String,
    pub payment: Option<PaymentResponse>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookingResponse {
    pub fn new(b: BookingRecord, payment: Option<PaymentRecord>) -> Self {
        Self {
            price: PriceBreakdown {
                nightly_rate: b.nightly_rate,
                nights: b.nights,
                subtotal: b.subtotal,
                cleaning_fee: b.cleaning_fee,
                service_fee: b.service_fee,
                total: b.total_amount,
            },
            formatted_total: format_pkr(b.total_amount),
            id: b.id,
            listing_id: b.listing_id,
            guest_id: b.guest_id,
            check_in: b.check_in,
            check_out: b.check_out,
            guest_count: b.guest_count,
            status: b.status,
            payment: payment.map(PaymentResponse::from),
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

impl From<BookingRecord> for BookingResponse {
    fn from(b: BookingRecord) -> Self {
        Self::new(b, None)
    }
}

impl From<BookingView> for BookingResponse {
    fn from(v: BookingView) -> Self {
        Self::new(v.booking, v.payment)
    }
}

/// Returned by status changes and cancellations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingStatusResponse {
    pub booking: BookingResponse,
    /// Present when the change triggered a refund attempt.
    pub refund: Option<RefundOutcome>,
}

impl From<StatusChange> for BookingStatusResponse {
    fn from(c: StatusChange) -> Self {
        Self {
            booking: c.booking.into(),
            refund: c.refund,
        }
    }
}

// ==========================================
// REVIEWS & DISPUTES
// ==========================================

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewResponse {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub listing_id: Uuid,
    pub author_id: Uuid,
    pub rating: i32,
    pub comment: String,
    pub response: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<ReviewRecord> for ReviewResponse {
    fn from(r: ReviewRecord) -> Self {
        Self {
            id: r.id,
            booking_id: r.booking_id,
            listing_id: r.listing_id,
            author_id: r.author_id,
            rating: r.rating,
            comment: r.comment,
            response: r.response,
            responded_at: r.responded_at,
            created_at: r.created_at,
        }
    }
}

/// Returned by `POST /bookings/{id}/review`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewCreatedResponse {
    pub review: ReviewResponse,
    pub listing_avg_rating: f64,
    pub listing_review_count: i32,
}

impl From<(ReviewRecord, ListingRating)> for ReviewCreatedResponse {
    fn from((review, rating): (ReviewRecord, ListingRating)) -> Self {
        Self {
            review: review.into(),
            listing_avg_rating: rating.avg_rating,
            listing_review_count: rating.review_count,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisputeResponse {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub opened_by_id: Uuid,
    pub category: DisputeCategory,
    pub description: String,
    pub status: DisputeStatus,
    pub resolution: Option<String>,
    pub resolved_by_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl From<DisputeRecord> for DisputeResponse {
    fn from(d: DisputeRecord) -> Self {
        Self {
            id: d.id,
            booking_id: d.booking_id,
            opened_by_id: d.opened_by_id,
            category: d.category,
            description: d.description,
            status: d.status,
            resolution: d.resolution,
            resolved_by_id: d.resolved_by_id,
            created_at: d.created_at,
            resolved_at: d.resolved_at,
        }
    }
}

/// A refund that still needs manual attention.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefundIssueResponse {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub payment_id: Uuid,
    pub amount: i64,
    pub formatted_amount: String,
    pub trigger: RefundTrigger,
    pub reason: String,
    /// Set when the gateway already refunded; a retry only records it.
    pub refund_reference: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<RefundIssueRecord> for RefundIssueResponse {
    fn from(i: RefundIssueRecord) -> Self {
        Self {
            formatted_amount: format_pkr(i.amount),
            id: i.id,
            booking_id: i.booking_id,
            payment_id: i.payment_id,
            amount: i.amount,
            trigger: i.trigger,
            reason: i.reason,
            refund_reference: i.refund_ref,
            created_at: i.created_at,
        }
    }
}

/// Health check response.
///
/// Returned by `GET /health`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Service status: "healthy" or "unhealthy".
    pub status: String,

    /// Database connection status.
    pub database: bool,

    /// Service version.
    pub version: String,

    /// Server time.
    pub timestamp: DateTime<Utc>,
}
