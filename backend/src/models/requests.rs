//! # API Request Models
//!
//! Structures for incoming API request bodies and query strings.
//! Field rules are declared with `validator` and checked by the services
//! before any write. Enum-valued fields arrive as strings and are parsed
//! strictly by the services, so an unknown value is a validation error
//! rather than a silent default.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

// ==========================================
// ACCOUNTS
// ==========================================

/// Request to create an account.
///
/// ## Example JSON
///
/// ```json
/// {
///     "name": "Ayesha Khan",
///     "email": "ayesha@example.pk",
///     "password": "secret123",
///     "phone": "+923001234567"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 2, max = 100, message = "must be between 2 and 100 characters"))]
    pub name: String,

    #[validate(email(message = "must be a valid email address"))]
    pub email: String,

    #[validate(length(min = 6, max = 128, message = "must be at least 6 characters"))]
    pub password: String,

    #[validate(length(min = 7, max = 20, message = "must be between 7 and 20 characters"))]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[validate(email(message = "must be a valid email address"))]
    pub email: String,

    #[validate(length(min = 1, message = "is required"))]
    pub password: String,
}

/// Request to become a host.
///
/// ## Example JSON
///
/// ```json
/// {
///     "bio": "Family-run guest house near Mall Road.",
///     "bankName": "Meezan Bank",
///     "accountNumber": "01234567890"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct BecomeHostRequest {
    #[validate(length(min = 10, max = 2000, message = "must be at least 10 characters"))]
    pub bio: String,

    #[validate(length(min = 3, max = 100, message = "must be at least 3 characters"))]
    pub bank_name: String,

    #[validate(length(min = 5, max = 34, message = "must be at least 5 characters"))]
    pub account_number: String,
}

// ==========================================
// LISTINGS
// ==========================================

/// Request to create a listing. New listings wait for admin approval.
///
/// ## Example JSON
///
/// ```json
/// {
///     "title": "Hunza View Cottage",
///     "description": "Two bedroom cottage with a view of Rakaposhi.",
///     "propertyType": "COTTAGE",
///     "province": "GILGIT_BALTISTAN",
///     "city": "Karimabad",
///     "address": "Baltit Fort Road",
///     "pricePerNight": 12000,
///     "cleaningFee": 1500,
///     "maxGuests": 4,
///     "bedrooms": 2,
///     "beds": 3,
///     "bathrooms": 1,
///     "amenities": ["WiFi", "Heating"],
///     "images": ["https://cdn.example.pk/hunza-1.jpg"]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateListingRequest {
    #[validate(length(min = 5, max = 200, message = "must be at least 5 characters"))]
    pub title: String,

    #[validate(length(min = 20, max = 5000, message = "must be at least 20 characters"))]
    pub description: String,

    /// One of HOUSE, APARTMENT, GUEST_HOUSE, FARMHOUSE, ROOM, COTTAGE, BEACH_HUT, HOTEL.
    pub property_type: String,

    /// One of PUNJAB, SINDH, KPK, BALOCHISTAN, GILGIT_BALTISTAN, AJK, ICT.
    pub province: String,

    #[validate(length(min = 2, max = 100, message = "must be at least 2 characters"))]
    pub city: String,

    #[validate(length(min = 5, max = 300, message = "must be at least 5 characters"))]
    pub address: String,

    /// Whole PKR.
    #[validate(range(min = 100, max = 10_000_000, message = "must be between 100 and 10,000,000"))]
    pub price_per_night: i64,

    #[validate(range(min = 0, max = 1_000_000, message = "must be between 0 and 1,000,000"))]
    pub cleaning_fee: Option<i64>,

    #[validate(range(min = 1, max = 100, message = "must be between 1 and 100"))]
    pub max_guests: i32,

    #[serde(default)]
    #[validate(range(min = 0, max = 100, message = "cannot be negative"))]
    pub bedrooms: i32,

    #[serde(default)]
    #[validate(range(min = 0, max = 100, message = "cannot be negative"))]
    pub beds: i32,

    #[serde(default)]
    #[validate(range(min = 0, max = 100, message = "cannot be negative"))]
    pub bathrooms: i32,

    #[serde(default)]
    #[validate(length(max = 50, message = "at most 50 amenities"))]
    pub amenities: Vec<String>,

    /// Already-hosted image URLs.
    #[serde(default)]
    #[validate(length(max = 20, message = "at most 20 images"))]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePricingRequest {
    #[validate(range(min = 100, max = 10_000_000, message = "must be between 100 and 10,000,000"))]
    pub price_per_night: i64,

    #[validate(range(min = 0, max = 1_000_000, message = "must be between 0 and 1,000,000"))]
    pub cleaning_fee: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetActiveRequest {
    pub active: bool,
}

/// Query string for `GET /listings`.
///
/// `GET /listings?city=lahore&propertyType=APARTMENT&minPrice=5000&sort=price_asc&page=2`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingSearchQuery {
    pub city: Option<String>,
    pub property_type: Option<String>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    /// newest | price_asc | price_desc | rating
    pub sort: Option<String>,
    /// 1-based.
    pub page: Option<u32>,
}

/// Query string for `GET /listings/{id}/quote`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteQuery {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

// ==========================================
// BOOKINGS
// ==========================================

/// Request to book a listing.
///
/// ## Example JSON
///
/// ```json
/// {
///     "listingId": "550e8400-e29b-41d4-a716-446655440000",
///     "checkIn": "2030-06-01",
///     "checkOut": "2030-06-04",
///     "guestCount": 2
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub listing_id: Uuid,

    pub check_in: NaiveDate,

    /// Exclusive.
    pub check_out: NaiveDate,

    #[validate(range(min = 1, message = "must be at least 1"))]
    pub guest_count: i32,
}

/// Host decision on a booking: CONFIRMED, REJECTED, CANCELLED or COMPLETED.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookingStatusRequest {
    pub status: String,
}

/// Request to pay for a booking.
///
/// ## Example JSON
///
/// ```json
/// {
///     "method": "EASYPAISA",
///     "details": { "mobileNumber": "03001234567" }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRequest {
    /// One of JAZZCASH, EASYPAISA, BANK_TRANSFER, CASH_ON_ARRIVAL.
    pub method: String,

    /// Method-specific details forwarded to the gateway untouched.
    #[serde(default)]
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    #[validate(range(min = 1, max = 5, message = "must be between 1 and 5"))]
    pub rating: i32,

    #[validate(length(min = 10, max = 2000, message = "must be at least 10 characters"))]
    pub comment: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReviewReplyRequest {
    #[validate(length(min = 1, max = 1000, message = "must be between 1 and 1000 characters"))]
    pub response: String,
}

// ==========================================
// DISPUTES & MODERATION
// ==========================================

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OpenDisputeRequest {
    /// One of PROPERTY_MISMATCH, CLEANLINESS, DAMAGE, PAYMENT_ISSUE,
    /// CANCELLATION, SAFETY, OTHER.
    pub category: String,

    #[validate(length(min = 10, max = 5000, message = "must be at least 10 characters"))]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ResolveDisputeRequest {
    /// RESOLVED or DISMISSED.
    pub status: String,

    #[validate(length(min = 5, max = 5000, message = "must be at least 5 characters"))]
    pub resolution: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RejectListingRequest {
    #[validate(length(min = 5, max = 1000, message = "must be at least 5 characters"))]
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DisputeQuery {
    pub status: Option<String>,
}

/// Query parameters for paged admin lists.
///
/// `GET /admin/users?limit=50&offset=0`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageQuery {
    /// Maximum number of results (default: 50, max: 200).
    #[serde(default = "default_limit")]
    pub limit: i64,

    /// Number of results to skip (for pagination).
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    50
}
