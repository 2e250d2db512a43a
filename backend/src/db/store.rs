//! # Marketplace Store
//!
//! The persistence boundary used by every service. The PostgreSQL
//! implementation lives on [`Database`] and forwards to [`queries`];
//! unit tests use the in-memory store in `db::memory`.
//!
//! Methods that combine a read with a write (`insert_booking`,
//! `insert_review`, `create_host_profile`) are atomic units in every
//! implementation.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use super::models::*;
use super::{queries, Database, DatabaseError};

#[async_trait]
pub trait MarketplaceStore: Send + Sync {
    /// Round trip used by the health check.
    async fn ping(&self) -> Result<(), DatabaseError>;

    // ---- users ----

    async fn insert_user(&self, user: &UserRecord) -> Result<(), DatabaseError>;
    async fn get_user(&self, id: Uuid) -> Result<Option<UserRecord>, DatabaseError>;
    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, DatabaseError>;
    async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<UserRecord>, DatabaseError>;
    async fn set_user_suspended(&self, id: Uuid, suspended: bool) -> Result<UserRecord, DatabaseError>;
    async fn set_user_role(&self, id: Uuid, role: UserRole) -> Result<UserRecord, DatabaseError>;
    /// Insert the profile and upgrade the user to HOST atomically.
    async fn create_host_profile(&self, profile: &HostProfileRecord) -> Result<UserRecord, DatabaseError>;
    async fn get_host_profile(&self, user_id: Uuid) -> Result<Option<HostProfileRecord>, DatabaseError>;

    // ---- listings ----

    async fn insert_listing(
        &self,
        listing: &ListingRecord,
        images: &[ListingImageRecord],
    ) -> Result<(), DatabaseError>;
    async fn get_listing(&self, id: Uuid) -> Result<Option<ListingRecord>, DatabaseError>;
    async fn list_listing_images(&self, listing_id: Uuid) -> Result<Vec<ListingImageRecord>, DatabaseError>;
    /// One page of bookable listings plus the total number of matches.
    async fn search_listings(&self, filter: &ListingFilter) -> Result<(Vec<ListingRecord>, i64), DatabaseError>;
    async fn list_host_listings(&self, host_id: Uuid) -> Result<Vec<ListingRecord>, DatabaseError>;
    async fn list_listings_by_status(&self, status: ListingStatus) -> Result<Vec<ListingRecord>, DatabaseError>;
    async fn update_listing_pricing(
        &self,
        id: Uuid,
        price_per_night: i64,
        cleaning_fee: i64,
    ) -> Result<ListingRecord, DatabaseError>;
    async fn set_listing_active(&self, id: Uuid, active: bool) -> Result<ListingRecord, DatabaseError>;
    async fn set_listing_moderation(
        &self,
        id: Uuid,
        status: ListingStatus,
        active: bool,
        admin_notes: Option<String>,
    ) -> Result<ListingRecord, DatabaseError>;

    // ---- bookings ----

    async fn has_conflicting_booking(
        &self,
        listing_id: Uuid,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<bool, DatabaseError>;
    /// Insert a booking unless its dates overlap a PENDING/CONFIRMED one
    /// (`Conflict`). Check and insert are one atomic unit.
    async fn insert_booking(&self, booking: &BookingRecord) -> Result<(), DatabaseError>;
    async fn get_booking(&self, id: Uuid) -> Result<Option<BookingRecord>, DatabaseError>;
    /// Compare-and-set on status. `Ok(None)` when the booking was not in `from`.
    async fn transition_booking(
        &self,
        id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Option<BookingRecord>, DatabaseError>;
    async fn complete_finished_stays(&self, today: NaiveDate) -> Result<Vec<Uuid>, DatabaseError>;
    async fn list_guest_bookings(&self, guest_id: Uuid) -> Result<Vec<BookingRecord>, DatabaseError>;
    async fn list_host_bookings(&self, host_id: Uuid) -> Result<Vec<BookingRecord>, DatabaseError>;
    async fn list_booked_ranges(&self, listing_id: Uuid, from: NaiveDate) -> Result<Vec<StayRange>, DatabaseError>;

    // ---- payments ----

    async fn get_payment_for_booking(&self, booking_id: Uuid) -> Result<Option<PaymentRecord>, DatabaseError>;
    async fn insert_payment(&self, payment: &PaymentRecord) -> Result<(), DatabaseError>;
    /// COMPLETED → REFUNDING; `None` when another refund already holds it.
    async fn claim_payment_for_refund(&self, payment_id: Uuid) -> Result<Option<PaymentRecord>, DatabaseError>;
    /// REFUNDING → COMPLETED after the gateway refused.
    async fn release_payment_claim(&self, payment_id: Uuid) -> Result<(), DatabaseError>;
    /// REFUNDING → REFUNDED with the gateway's refund id.
    async fn mark_payment_refunded(&self, payment_id: Uuid, refund_ref: &str) -> Result<PaymentRecord, DatabaseError>;
    async fn insert_refund_issue(&self, issue: &RefundIssueRecord) -> Result<(), DatabaseError>;
    async fn list_open_refund_issues(&self) -> Result<Vec<RefundIssueRecord>, DatabaseError>;
    async fn resolve_refund_issues(&self, booking_id: Uuid) -> Result<u64, DatabaseError>;

    // ---- reviews ----

    /// Insert a review and recompute the listing rating atomically.
    async fn insert_review(&self, review: &ReviewRecord) -> Result<ListingRating, DatabaseError>;
    async fn get_review(&self, id: Uuid) -> Result<Option<ReviewRecord>, DatabaseError>;
    async fn get_review_for_booking(&self, booking_id: Uuid) -> Result<Option<ReviewRecord>, DatabaseError>;
    async fn set_review_response(&self, id: Uuid, response: &str) -> Result<ReviewRecord, DatabaseError>;
    async fn list_listing_reviews(&self, listing_id: Uuid, limit: i64) -> Result<Vec<ReviewRecord>, DatabaseError>;

    // ---- disputes ----

    async fn insert_dispute(&self, dispute: &DisputeRecord) -> Result<(), DatabaseError>;
    async fn get_dispute(&self, id: Uuid) -> Result<Option<DisputeRecord>, DatabaseError>;
    async fn get_dispute_for_booking(&self, booking_id: Uuid) -> Result<Option<DisputeRecord>, DatabaseError>;
    /// Close an OPEN dispute. `Ok(None)` when it was not OPEN.
    async fn resolve_dispute(
        &self,
        id: Uuid,
        status: DisputeStatus,
        resolution: &str,
        resolved_by: Uuid,
    ) -> Result<Option<DisputeRecord>, DatabaseError>;
    async fn list_disputes(&self, status: Option<DisputeStatus>) -> Result<Vec<DisputeRecord>, DatabaseError>;
}

#[async_trait]
impl MarketplaceStore for Database {
    async fn ping(&self) -> Result<(), DatabaseError> {
        Database::ping(self).await
    }

    async fn insert_user(&self, user: &UserRecord) -> Result<(), DatabaseError> {
        queries::insert_user(self.pool(), user).await
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<UserRecord>, DatabaseError> {
        queries::get_user(self.pool(), id).await
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, DatabaseError> {
        queries::get_user_by_email(self.pool(), email).await
    }

    async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<UserRecord>, DatabaseError> {
        queries::list_users(self.pool(), limit, offset).await
    }

    async fn set_user_suspended(&self, id: Uuid, suspended: bool) -> Result<UserRecord, DatabaseError> {
        queries::set_user_suspended(self.pool(), id, suspended).await
    }

    async fn set_user_role(&self, id: Uuid, role: UserRole) -> Result<UserRecord, DatabaseError> {
        queries::set_user_role(self.pool(), id, role).await
    }

    async fn create_host_profile(&self, profile: &HostProfileRecord) -> Result<UserRecord, DatabaseError> {
        queries::create_host_profile(self.pool(), profile).await
    }

    async fn get_host_profile(&self, user_id: Uuid) -> Result<Option<HostProfileRecord>, DatabaseError> {
        queries::get_host_profile(self.pool(), user_id).await
    }

    async fn insert_listing(
        &self,
        listing: &ListingRecord,
        images: &[ListingImageRecord],
    ) -> Result<(), DatabaseError> {
        queries::insert_listing(self.pool(), listing, images).await
    }

    async fn get_listing(&self, id: Uuid) -> Result<Option<ListingRecord>, DatabaseError> {
        queries::get_listing(self.pool(), id).await
    }

    async fn list_listing_images(&self, listing_id: Uuid) -> Result<Vec<ListingImageRecord>, DatabaseError> {
        queries::list_listing_images(self.pool(), listing_id).await
    }

    async fn search_listings(&self, filter: &ListingFilter) -> Result<(Vec<ListingRecord>, i64), DatabaseError> {
        queries::search_listings(self.pool(), filter).await
    }

    async fn list_host_listings(&self, host_id: Uuid) -> Result<Vec<ListingRecord>, DatabaseError> {
        queries::list_host_listings(self.pool(), host_id).await
    }

    async fn list_listings_by_status(&self, status: ListingStatus) -> Result<Vec<ListingRecord>, DatabaseError> {
        queries::list_listings_by_status(self.pool(), status).await
    }

    async fn update_listing_pricing(
        &self,
        id: Uuid,
        price_per_night: i64,
        cleaning_fee: i64,
    ) -> Result<ListingRecord, DatabaseError> {
        queries::update_listing_pricing(self.pool(), id, price_per_night, cleaning_fee).await
    }

    async fn set_listing_active(&self, id: Uuid, active: bool) -> Result<ListingRecord, DatabaseError> {
        queries::set_listing_active(self.pool(), id, active).await
    }

    async fn set_listing_moderation(
        &self,
        id: Uuid,
        status: ListingStatus,
        active: bool,
        admin_notes: Option<String>,
    ) -> Result<ListingRecord, DatabaseError> {
        queries::set_listing_moderation(self.pool(), id, status, active, admin_notes).await
    }

    async fn has_conflicting_booking(
        &self,
        listing_id: Uuid,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<bool, DatabaseError> {
        queries::has_conflicting_booking(self.pool(), listing_id, check_in, check_out).await
    }

    async fn insert_booking(&self, booking: &BookingRecord) -> Result<(), DatabaseError> {
        queries::insert_booking(self.pool(), booking).await
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<BookingRecord>, DatabaseError> {
        queries::get_booking(self.pool(), id).await
    }

    async fn transition_booking(
        &self,
        id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Option<BookingRecord>, DatabaseError> {
        queries::transition_booking(self.pool(), id, from, to).await
    }

    async fn complete_finished_stays(&self, today: NaiveDate) -> Result<Vec<Uuid>, DatabaseError> {
        queries::complete_finished_stays(self.pool(), today).await
    }

    async fn list_guest_bookings(&self, guest_id: Uuid) -> Result<Vec<BookingRecord>, DatabaseError> {
        queries::list_guest_bookings(self.pool(), guest_id).await
    }

    async fn list_host_bookings(&self, host_id: Uuid) -> Result<Vec<BookingRecord>, DatabaseError> {
        queries::list_host_bookings(self.pool(), host_id).await
    }

    async fn list_booked_ranges(&self, listing_id: Uuid, from: NaiveDate) -> Result<Vec<StayRange>, DatabaseError> {
        queries::list_booked_ranges(self.pool(), listing_id, from).await
    }

    async fn get_payment_for_booking(&self, booking_id: Uuid) -> Result<Option<PaymentRecord>, DatabaseError> {
        queries::get_payment_for_booking(self.pool(), booking_id).await
    }

    async fn insert_payment(&self, payment: &PaymentRecord) -> Result<(), DatabaseError> {
        queries::insert_payment(self.pool(), payment).await
    }

    async fn claim_payment_for_refund(&self, payment_id: Uuid) -> Result<Option<PaymentRecord>, DatabaseError> {
        queries::claim_payment_for_refund(self.pool(), payment_id).await
    }

    async fn release_payment_claim(&self, payment_id: Uuid) -> Result<(), DatabaseError> {
        queries::release_payment_claim(self.pool(), payment_id).await
    }

    async fn mark_payment_refunded(&self, payment_id: Uuid, refund_ref: &str) -> Result<PaymentRecord, DatabaseError> {
        queries::mark_payment_refunded(self.pool(), payment_id, refund_ref).await
    }

    async fn insert_refund_issue(&self, issue: &RefundIssueRecord) -> Result<(), DatabaseError> {
        queries::insert_refund_issue(self.pool(), issue).await
    }

    async fn list_open_refund_issues(&self) -> Result<Vec<RefundIssueRecord>, DatabaseError> {
        queries::list_open_refund_issues(self.pool()).await
    }

    async fn resolve_refund_issues(&self, booking_id: Uuid) -> Result<u64, DatabaseError> {
        queries::resolve_refund_issues(self.pool(), booking_id).await
    }

    async fn insert_review(&self, review: &ReviewRecord) -> Result<ListingRating, DatabaseError> {
        queries::insert_review(self.pool(), review).await
    }

    async fn get_review(&self, id: Uuid) -> Result<Option<ReviewRecord>, DatabaseError> {
        queries::get_review(self.pool(), id).await
    }

    async fn get_review_for_booking(&self, booking_id: Uuid) -> Result<Option<ReviewRecord>, DatabaseError> {
        queries::get_review_for_booking(self.pool(), booking_id).await
    }

    async fn set_review_response(&self, id: Uuid, response: &str) -> Result<ReviewRecord, DatabaseError> {
        queries::set_review_response(self.pool(), id, response).await
    }

    async fn list_listing_reviews(&self, listing_id: Uuid, limit: i64) -> Result<Vec<ReviewRecord>, DatabaseError> {
        queries::list_listing_reviews(self.pool(), listing_id, limit).await
    }

    async fn insert_dispute(&self, dispute: &DisputeRecord) -> Result<(), DatabaseError> {
        queries::insert_dispute(self.pool(), dispute).await
    }

    async fn get_dispute(&self, id: Uuid) -> Result<Option<DisputeRecord>, DatabaseError> {
        queries::get_dispute(self.pool(), id).await
    }

    async fn get_dispute_for_booking(&self, booking_id: Uuid) -> Result<Option<DisputeRecord>, DatabaseError> {
        queries::get_dispute_for_booking(self.pool(), booking_id).await
    }

    async fn resolve_dispute(
        &self,
        id: Uuid,
        status: DisputeStatus,
        resolution: &str,
        resolved_by: Uuid,
    ) -> Result<Option<DisputeRecord>, DatabaseError> {
        queries::resolve_dispute(self.pool(), id, status, resolution, resolved_by).await
    }

    async fn list_disputes(&self, status: Option<DisputeStatus>) -> Result<Vec<DisputeRecord>, DatabaseError> {
        queries::list_disputes(self.pool(), status).await
    }
}
