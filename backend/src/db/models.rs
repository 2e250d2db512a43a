//! # Database Models
//!
//! This module defines the data structures that map to database tables.
//! Each struct represents a row in a table.
//!
//! ## Table Overview
//!
//! | Table | Description |
//! |-------|-------------|
//! | `users` | Accounts, roles and suspension flags |
//! | `host_profiles` | Payout details of users who host |
//! | `listings` | Rentable properties and their moderation state |
//! | `listing_images` | Image URLs attached to a listing |
//! | `bookings` | Stays with their frozen price snapshot |
//! | `payments` | At most one completed charge per booking |
//! | `reviews` | At most one guest review per booking |
//! | `disputes` | At most one dispute per booking |
//! | `refund_issues` | Refunds that could not be completed |
//!
//! ## Relationship Diagram
//!
//! ```text
//! ┌──────────┐      ┌────────────┐      ┌────────────┐
//! │  users   │─────<│  listings  │─────<│  bookings  │
//! │          │      │            │      │            │
//! │ role     │      │ host_id    │      │ listing_id │
//! │ suspended│      │ status     │      │ guest_id   │
//! └──────────┘      └────────────┘      └────────────┘
//!                                             │
//!                    ┌──────────────┬─────────┼──────────────┐
//!                    ▼              ▼         ▼              ▼
//!              ┌──────────┐  ┌──────────┐ ┌──────────┐ ┌──────────────┐
//!              │ payments │  │ reviews  │ │ disputes │ │refund_issues │
//!              │ (0..1)   │  │ (0..1)   │ │ (0..1)   │ │ (0..n)       │
//!              └──────────┘  └──────────┘ └──────────┘ └──────────────┘
//! ```
//!
//! ## Enumerations
//!
//! Every status/category column is stored as upper-case text and parsed
//! into a typed enum with [`FromStr`]. Unknown strings are an error, never
//! a silent default.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Error returned when a string does not name a known enum value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind}: '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

/// Declares a text-backed enum with `as_str`, `Display`, `FromStr` and serde
/// impls that all agree on the same wire values.
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident ($kind:literal) {
            $($(#[$vmeta:meta])* $variant:ident => $value:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $($(#[$vmeta])* #[serde(rename = $value)] $variant),+
        }

        impl $name {
            #[allow(dead_code)]
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok($name::$variant),)+
                    other => Err(ParseEnumError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

text_enum! {
    /// Account role. Ordered GUEST < HOST < ADMIN.
    pub enum UserRole ("role") {
        Guest => "GUEST",
        Host => "HOST",
        Admin => "ADMIN",
    }
}

impl UserRole {
    /// Numeric level used for hierarchy comparisons.
    pub fn level(&self) -> u8 {
        match self {
            UserRole::Guest => 1,
            UserRole::Host => 2,
            UserRole::Admin => 3,
        }
    }
}

text_enum! {
    /// Moderation state of a listing.
    pub enum ListingStatus ("listing status") {
        Pending => "PENDING",
        Approved => "APPROVED",
        Rejected => "REJECTED",
    }
}

text_enum! {
    pub enum PropertyType ("property type") {
        House => "HOUSE",
        Apartment => "APARTMENT",
        GuestHouse => "GUEST_HOUSE",
        Farmhouse => "FARMHOUSE",
        Room => "ROOM",
        Cottage => "COTTAGE",
        BeachHut => "BEACH_HUT",
        Hotel => "HOTEL",
    }
}

text_enum! {
    pub enum Province ("province") {
        Punjab => "PUNJAB",
        Sindh => "SINDH",
        Kpk => "KPK",
        Balochistan => "BALOCHISTAN",
        GilgitBaltistan => "GILGIT_BALTISTAN",
        Ajk => "AJK",
        Ict => "ICT",
    }
}

text_enum! {
    /// Booking lifecycle state.
    ///
    /// ```text
    /// PENDING ──► CONFIRMED ──► COMPLETED
    ///    │            │
    ///    ▼            ▼
    /// REJECTED    CANCELLED
    /// ```
    pub enum BookingStatus ("booking status") {
        Pending => "PENDING",
        Confirmed => "CONFIRMED",
        Rejected => "REJECTED",
        Cancelled => "CANCELLED",
        Completed => "COMPLETED",
    }
}

impl BookingStatus {
    /// Statuses that hold the listing's dates.
    pub const BLOCKING: [BookingStatus; 2] = [BookingStatus::Pending, BookingStatus::Confirmed];

    /// Whether this booking still occupies its date range.
    pub fn blocks_dates(&self) -> bool {
        Self::BLOCKING.contains(self)
    }

    /// Whether the state machine allows `self -> next`.
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Pending, BookingStatus::Rejected)
                | (BookingStatus::Confirmed, BookingStatus::Cancelled)
                | (BookingStatus::Confirmed, BookingStatus::Completed)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BookingStatus::Rejected | BookingStatus::Cancelled | BookingStatus::Completed
        )
    }
}

text_enum! {
    pub enum PaymentMethod ("payment method") {
        JazzCash => "JAZZCASH",
        EasyPaisa => "EASYPAISA",
        BankTransfer => "BANK_TRANSFER",
        CashOnArrival => "CASH_ON_ARRIVAL",
    }
}

text_enum! {
    pub enum PaymentStatus ("payment status") {
        Pending => "PENDING",
        Completed => "COMPLETED",
        Refunding => "REFUNDING",
        Refunded => "REFUNDED",
        Failed => "FAILED",
    }
}

text_enum! {
    pub enum DisputeCategory ("dispute category") {
        PropertyMismatch => "PROPERTY_MISMATCH",
        Cleanliness => "CLEANLINESS",
        Damage => "DAMAGE",
        PaymentIssue => "PAYMENT_ISSUE",
        Cancellation => "CANCELLATION",
        Safety => "SAFETY",
        Other => "OTHER",
    }
}

text_enum! {
    pub enum DisputeStatus ("dispute status") {
        Open => "OPEN",
        Resolved => "RESOLVED",
        Dismissed => "DISMISSED",
    }
}

text_enum! {
    /// What caused a refund attempt.
    pub enum RefundTrigger ("refund trigger") {
        Rejected => "REJECTED",
        Cancelled => "CANCELLED",
        Manual => "MANUAL",
    }
}

text_enum! {
    /// Result ordering for listing search.
    pub enum ListingSort ("sort order") {
        Newest => "newest",
        PriceAsc => "price_asc",
        PriceDesc => "price_desc",
        Rating => "rating",
    }
}

impl Default for ListingSort {
    fn default() -> Self {
        ListingSort::Newest
    }
}

// ============================================
// RECORDS
// ============================================

/// A row of `users`.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    /// Always stored lower-cased.
    pub email: String,
    pub name: String,
    pub phone: Option<String>,
    /// bcrypt hash, never serialized.
    pub password_hash: String,
    pub role: UserRole,
    pub suspended: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payout details of a host. One per user.
#[derive(Debug, Clone)]
pub struct HostProfileRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub bio: String,
    pub bank_name: String,
    pub account_number: String,
    pub created_at: DateTime<Utc>,
}

/// A rentable property.
///
/// Prices are whole PKR. A listing can be booked only while it is
/// APPROVED and active.
#[derive(Debug, Clone)]
pub struct ListingRecord {
    pub id: Uuid,
    pub host_id: Uuid,
    pub title: String,
    pub description: String,
    pub property_type: PropertyType,
    pub province: Province,
    pub city: String,
    pub address: String,
    pub price_per_night: i64,
    pub cleaning_fee: i64,
    pub max_guests: i32,
    pub bedrooms: i32,
    pub beds: i32,
    pub bathrooms: i32,
    pub amenities: Vec<String>,
    pub status: ListingStatus,
    pub is_active: bool,
    /// Reason given by an admin on rejection.
    pub admin_notes: Option<String>,
    pub avg_rating: f64,
    pub review_count: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ListingRecord {
    pub fn is_bookable(&self) -> bool {
        self.status == ListingStatus::Approved && self.is_active
    }
}

#[derive(Debug, Clone)]
pub struct ListingImageRecord {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

/// A stay request.
///
/// The price fields are a snapshot taken when the booking was created and
/// are never recomputed from the listing.
#[derive(Debug, Clone)]
pub struct BookingRecord {
    pub id: Uuid,
    pub listing_id: Uuid,
    pub guest_id: Uuid,
    pub check_in: NaiveDate,
    /// Exclusive: the guest leaves on this day.
    pub check_out: NaiveDate,
    pub guest_count: i32,
    pub nightly_rate: i64,
    pub nights: i32,
    pub subtotal: i64,
    pub cleaning_fee: i64,
    pub service_fee: i64,
    pub total_amount: i64,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BookingRecord {
    /// Half-open overlap test against `[check_in, check_out)`.
    pub fn overlaps(&self, check_in: NaiveDate, check_out: NaiveDate) -> bool {
        check_in < self.check_out && check_out > self.check_in
    }
}

/// A charge recorded against a booking.
#[derive(Debug, Clone)]
pub struct PaymentRecord {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    /// Transaction id returned by the gateway for the charge.
    pub gateway_ref: String,
    /// Transaction id returned by the gateway for the refund.
    pub refund_ref: Option<String>,
    pub paid_at: DateTime<Utc>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ReviewRecord {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub listing_id: Uuid,
    pub author_id: Uuid,
    /// The host of the reviewed listing.
    pub subject_id: Uuid,
    pub rating: i32,
    pub comment: String,
    pub response: Option<String>,
    pub responded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct DisputeRecord {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub opened_by_id: Uuid,
    pub category: DisputeCategory,
    pub description: String,
    pub status: DisputeStatus,
    pub resolution: Option<String>,
    pub resolved_by_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// A refund that failed and needs manual reconciliation.
#[derive(Debug, Clone)]
pub struct RefundIssueRecord {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub payment_id: Uuid,
    pub amount: i64,
    pub trigger: RefundTrigger,
    pub reason: String,
    /// Gateway refund id when the money moved but the payment row was not
    /// updated. A retry finalizes with it instead of refunding again.
    pub refund_ref: Option<String>,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Aggregate rating written back to a listing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ListingRating {
    pub avg_rating: f64,
    pub review_count: i32,
}

/// A date range held by a PENDING or CONFIRMED booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StayRange {
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
}

/// Search criteria for bookable listings.
#[derive(Debug, Clone, Default)]
pub struct ListingFilter {
    /// Case-insensitive substring of the city.
    pub city: Option<String>,
    pub property_type: Option<PropertyType>,
    pub min_price: Option<i64>,
    pub max_price: Option<i64>,
    pub sort: ListingSort,
    pub limit: i64,
    pub offset: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_round_trips_through_text() {
        for method in PaymentMethod::ALL {
            assert_eq!(method.as_str().parse::<PaymentMethod>().unwrap(), *method);
        }
        assert_eq!("GUEST_HOUSE".parse::<PropertyType>().unwrap(), PropertyType::GuestHouse);
    }

    #[test]
    fn test_unknown_enum_value_is_rejected() {
        let err = "PAYPAL".parse::<PaymentMethod>().unwrap_err();
        assert_eq!(err.kind, "payment method");
        assert_eq!(err.value, "PAYPAL");
        assert!("easypaisa".parse::<PaymentMethod>().is_err());
        assert!("".parse::<Province>().is_err());
    }

    #[test]
    fn test_booking_state_machine() {
        use BookingStatus::*;
        assert!(Pending.can_transition_to(Confirmed));
        assert!(Pending.can_transition_to(Rejected));
        assert!(Confirmed.can_transition_to(Cancelled));
        assert!(Confirmed.can_transition_to(Completed));

        assert!(!Pending.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Cancelled));
        assert!(!Confirmed.can_transition_to(Rejected));
        for terminal in [Rejected, Cancelled, Completed] {
            assert!(terminal.is_terminal());
            for next in BookingStatus::ALL {
                assert!(!terminal.can_transition_to(*next));
            }
        }
    }

    #[test]
    fn test_role_levels_are_ordered() {
        assert!(UserRole::Guest.level() < UserRole::Host.level());
        assert!(UserRole::Host.level() < UserRole::Admin.level());
    }

    #[test]
    fn test_serde_uses_wire_values() {
        let json = serde_json::to_string(&BookingStatus::Confirmed).unwrap();
        assert_eq!(json, "\"CONFIRMED\"");
        let sort: ListingSort = serde_json::from_str("\"price_desc\"").unwrap();
        assert_eq!(sort, ListingSort::PriceDesc);
    }
}
