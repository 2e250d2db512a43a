//! # Availability & Pricing Engine
//!
//! Date validation, the overlap check and the price breakdown used when a
//! booking is created.
//!
//! ## Pricing
//!
//! ```text
//! nights      = whole days between check-in and check-out
//! subtotal    = nightly_rate × nights
//! service_fee = round(subtotal × 5%)        (halves round up)
//! total       = subtotal + cleaning_fee + service_fee
//! ```
//!
//! Example: 10,000/night, 3 nights, 2,000 cleaning
//! → subtotal 30,000, service fee 1,500, total 33,500.
//!
//! ## Overlap
//!
//! Ranges are half-open `[check_in, check_out)`, so a stay may start on the
//! day another one ends. Only PENDING and CONFIRMED bookings hold dates.

use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use uuid::Uuid;

use crate::db::{ListingRecord, MarketplaceStore};

use super::ServiceError;

/// Platform fee charged on top of the stay, in percent of the subtotal.
pub const SERVICE_FEE_PERCENT: i64 = 5;

/// Longest stay a single booking may cover.
pub const MAX_STAY_NIGHTS: i64 = 365;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceBreakdown {
    pub nightly_rate: i64,
    pub nights: i32,
    pub subtotal: i64,
    pub cleaning_fee: i64,
    pub service_fee: i64,
    pub total: i64,
}

fn too_expensive() -> ServiceError {
    ServiceError::ValidationFailed("stay price is out of range".to_string())
}

/// Service fee for a subtotal, rounded half up. `None` on overflow.
pub fn service_fee(subtotal: i64) -> Option<i64> {
    subtotal
        .checked_mul(SERVICE_FEE_PERCENT)?
        .checked_add(50)
        .map(|v| v.div_euclid(100))
}

/// Full breakdown; amounts that do not fit in an `i64` are rejected.
pub fn price_breakdown(
    nightly_rate: i64,
    cleaning_fee: i64,
    nights: i32,
) -> Result<PriceBreakdown, ServiceError> {
    let subtotal = nightly_rate
        .checked_mul(i64::from(nights))
        .ok_or_else(too_expensive)?;
    let service_fee = service_fee(subtotal).ok_or_else(too_expensive)?;
    let total = subtotal
        .checked_add(cleaning_fee)
        .and_then(|v| v.checked_add(service_fee))
        .ok_or_else(too_expensive)?;

    Ok(PriceBreakdown {
        nightly_rate,
        nights,
        subtotal,
        cleaning_fee,
        service_fee,
        total,
    })
}

/// Breakdown for a stay at the listing's current rates.
pub fn quote_listing(listing: &ListingRecord, nights: i32) -> Result<PriceBreakdown, ServiceError> {
    price_breakdown(listing.price_per_night, listing.cleaning_fee, nights)
}

/// Check the requested dates and return the number of nights.
pub fn validate_stay(
    check_in: NaiveDate,
    check_out: NaiveDate,
    today: NaiveDate,
) -> Result<i32, ServiceError> {
    if check_in >= check_out {
        return Err(ServiceError::ValidationFailed(
            "check-out must be after check-in".to_string(),
        ));
    }
    if check_in < today {
        return Err(ServiceError::ValidationFailed(
            "check-in cannot be in the past".to_string(),
        ));
    }

    let nights = (check_out - check_in).num_days();
    if nights > MAX_STAY_NIGHTS {
        return Err(ServiceError::ValidationFailed(format!(
            "stays are limited to {} nights",
            MAX_STAY_NIGHTS
        )));
    }
    i32::try_from(nights)
        .map_err(|_| ServiceError::ValidationFailed("stay is too long".to_string()))
}

/// Price preview plus whether the dates are still free.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StayQuote {
    pub listing_id: Uuid,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub available: bool,
    pub price: PriceBreakdown,
}

/// Store-backed availability checks.
#[derive(Clone)]
pub struct AvailabilityEngine {
    store: Arc<dyn MarketplaceStore>,
}

impl AvailabilityEngine {
    pub fn new(store: Arc<dyn MarketplaceStore>) -> Self {
        Self { store }
    }

    /// True iff no PENDING/CONFIRMED booking overlaps `[check_in, check_out)`.
    pub async fn check_availability(
        &self,
        listing_id: Uuid,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<bool, ServiceError> {
        let taken = self
            .store
            .has_conflicting_booking(listing_id, check_in, check_out)
            .await?;
        Ok(!taken)
    }

    /// Read-only price preview for a bookable listing.
    pub async fn quote(
        &self,
        listing_id: Uuid,
        check_in: NaiveDate,
        check_out: NaiveDate,
        today: NaiveDate,
    ) -> Result<StayQuote, ServiceError> {
        let listing = self
            .store
            .get_listing(listing_id)
            .await?
            .filter(ListingRecord::is_bookable)
            .ok_or_else(|| ServiceError::NotFound(format!("listing {}", listing_id)))?;

        let nights = validate_stay(check_in, check_out, today)?;
        let available = self.check_availability(listing_id, check_in, check_out).await?;

        Ok(StayQuote {
            listing_id,
            check_in,
            check_out,
            available,
            price: quote_listing(&listing, nights)?,
        })
    }
}
