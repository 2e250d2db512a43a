//! # Booking Manager Service
//!
//! Owns the booking lifecycle: creation, host decisions, guest
//! cancellation, payment, refunds and reviews.
//!
//! ## State Machine
//!
//! ```text
//!             host confirms              host completes / sweeper
//! PENDING ─────────────────► CONFIRMED ─────────────────────────► COMPLETED
//!    │                           │
//!    │ host rejects              │ host or guest cancels
//!    ▼                           ▼
//! REJECTED ──► refund         CANCELLED ──► refund
//! ```
//!
//! Every transition is a compare-and-set on the current status, so of two
//! racing requests only one applies.
//!
//! ## Flow Example: Payment
//!
//! ```text
//! 1. Guest calls pay(booking, method)
//!                ↓
//! 2. Ownership, status and "not already paid" checks
//!                ↓
//! 3. Gateway charge (fixed latency, may fail)
//!                ↓
//! 4. Success only: insert COMPLETED payment with the gateway reference
//!                ↓
//! 5. Lost a race on the unique key? Refund the fresh charge, report Conflict
//! ```
//!
//! ## Refunds
//!
//! Rejecting or cancelling a paid booking attempts a refund after the
//! status change is committed. A failed refund never undoes the
//! transition; it is logged and stored as a refund issue for an admin.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::config::AppConfig;
use crate::db::{
    BookingRecord, BookingStatus, ListingRating, ListingRecord, MarketplaceStore, PaymentMethod,
    PaymentRecord, PaymentStatus, RefundIssueRecord, RefundTrigger, ReviewRecord, UserRole,
};
use crate::models::{CreateBookingRequest, PaymentRequest, ReviewReplyRequest, ReviewRequest};

use super::access::{authorize, authorize_read, ensure_owner, Actor};
use super::availability::{quote_listing, validate_stay, AvailabilityEngine};
use super::payment_gateway::PaymentGateway;
use super::ServiceError;

/// What happened to the money when a booking was rejected or cancelled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RefundOutcome {
    /// Nothing was paid.
    NotApplicable,
    Refunded { reference: String },
    /// Recorded as a refund issue for manual follow-up.
    Failed { reason: String },
}

/// Result of a status change.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub booking: BookingRecord,
    pub refund: Option<RefundOutcome>,
}

/// A booking together with its payment, if any.
#[derive(Debug, Clone)]
pub struct BookingView {
    pub booking: BookingRecord,
    pub payment: Option<PaymentRecord>,
}

#[derive(Clone)]
pub struct BookingManager {
    store: Arc<dyn MarketplaceStore>,
    gateway: Arc<dyn PaymentGateway>,
    availability: AvailabilityEngine,
    config: AppConfig,
}

fn refund_in_progress() -> ServiceError {
    ServiceError::Conflict("a refund for this booking is already in progress".to_string())
}

impl BookingManager {
    pub fn new(
        store: Arc<dyn MarketplaceStore>,
        gateway: Arc<dyn PaymentGateway>,
        config: AppConfig,
    ) -> Self {
        let availability = AvailabilityEngine::new(store.clone());
        Self {
            store,
            gateway,
            availability,
            config,
        }
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    async fn load_booking(&self, booking_id: Uuid) -> Result<BookingRecord, ServiceError> {
        self.store
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("booking {}", booking_id)))
    }

    async fn load_listing(&self, listing_id: Uuid) -> Result<ListingRecord, ServiceError> {
        self.store
            .get_listing(listing_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("listing {}", listing_id)))
    }

    // ==========================================
    // CREATION
    // ==========================================

    /// Request a stay. The booking starts PENDING with a frozen price.
    pub async fn create(
        &self,
        actor: &Actor,
        request: CreateBookingRequest,
    ) -> Result<BookingRecord, ServiceError> {
        authorize(actor, UserRole::Guest)?;
        request.validate()?;

        let listing = self.load_listing(request.listing_id).await?;
        if !listing.is_bookable() {
            return Err(ServiceError::ValidationFailed(
                "listing is not accepting bookings".to_string(),
            ));
        }
        if listing.host_id == actor.id {
            return Err(ServiceError::Forbidden(
                "hosts cannot book their own listing".to_string(),
            ));
        }

        let nights = validate_stay(request.check_in, request.check_out, Self::today())?;
        if request.guest_count > listing.max_guests {
            return Err(ServiceError::ValidationFailed(format!(
                "listing allows at most {} guests",
                listing.max_guests
            )));
        }

        // Fast path; the store re-checks atomically on insert.
        if !self
            .availability
            .check_availability(listing.id, request.check_in, request.check_out)
            .await?
        {
            return Err(ServiceError::Conflict(
                "listing is already booked for these dates".to_string(),
            ));
        }

        let price = quote_listing(&listing, nights)?;
        let now = Utc::now();
        let booking = BookingRecord {
            id: Uuid::new_v4(),
            listing_id: listing.id,
            guest_id: actor.id,
            check_in: request.check_in,
            check_out: request.check_out,
            guest_count: request.guest_count,
            nightly_rate: price.nightly_rate,
            nights: price.nights,
            subtotal: price.subtotal,
            cleaning_fee: price.cleaning_fee,
            service_fee: price.service_fee,
            total_amount: price.total,
            status: BookingStatus::Pending,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_booking(&booking).await.map_err(|e| match ServiceError::from(e) {
            ServiceError::Conflict(_) => {
                ServiceError::Conflict("listing is already booked for these dates".to_string())
            }
            other => other,
        })?;

        info!(
            "📅 Booking {} created: listing {} {}..{} total {}",
            booking.id, listing.id, booking.check_in, booking.check_out, booking.total_amount
        );
        Ok(booking)
    }

    // ==========================================
    // STATUS TRANSITIONS
    // ==========================================

    /// Host decision on a booking of one of their listings.
    pub async fn set_status(
        &self,
        actor: &Actor,
        booking_id: Uuid,
        status: &str,
    ) -> Result<StatusChange, ServiceError> {
        authorize(actor, UserRole::Host)?;
        let next: BookingStatus = status
            .parse()
            .map_err(|e: crate::db::ParseEnumError| ServiceError::ValidationFailed(e.to_string()))?;

        let booking = self.load_booking(booking_id).await?;
        let listing = self.load_listing(booking.listing_id).await?;
        ensure_owner(actor, listing.host_id, "listing")?;

        if !booking.status.can_transition_to(next) {
            return Err(ServiceError::ValidationFailed(format!(
                "cannot move booking from {} to {}",
                booking.status, next
            )));
        }
        if next == BookingStatus::Completed && booking.check_out > Self::today() {
            return Err(ServiceError::ValidationFailed(
                "stay has not ended yet".to_string(),
            ));
        }

        self.apply_transition(booking, next).await
    }

    /// Guest cancels their own confirmed booking before check-in.
    pub async fn cancel(&self, actor: &Actor, booking_id: Uuid) -> Result<StatusChange, ServiceError> {
        authorize(actor, UserRole::Guest)?;

        let booking = self.load_booking(booking_id).await?;
        ensure_owner(actor, booking.guest_id, "booking")?;

        if booking.status != BookingStatus::Confirmed {
            return Err(ServiceError::ValidationFailed(format!(
                "only confirmed bookings can be cancelled (current status {})",
                booking.status
            )));
        }
        if booking.check_in <= Self::today() {
            return Err(ServiceError::ValidationFailed(
                "bookings can only be cancelled before check-in".to_string(),
            ));
        }

        self.apply_transition(booking, BookingStatus::Cancelled).await
    }

    async fn apply_transition(
        &self,
        booking: BookingRecord,
        next: BookingStatus,
    ) -> Result<StatusChange, ServiceError> {
        let updated = self
            .store
            .transition_booking(booking.id, booking.status, next)
            .await?
            .ok_or_else(|| {
                ServiceError::Conflict("booking status changed concurrently".to_string())
            })?;

        info!("Booking {}: {} -> {}", updated.id, booking.status, next);

        let refund = match next {
            BookingStatus::Rejected => Some(self.refund_booking(&updated, RefundTrigger::Rejected).await),
            BookingStatus::Cancelled => Some(self.refund_booking(&updated, RefundTrigger::Cancelled).await),
            _ => None,
        };

        Ok(StatusChange {
            booking: updated,
            refund,
        })
    }

    // ==========================================
    // PAYMENTS
    // ==========================================

    /// Charge the booking's total through the gateway.
    pub async fn pay(
        &self,
        actor: &Actor,
        booking_id: Uuid,
        request: PaymentRequest,
    ) -> Result<PaymentRecord, ServiceError> {
        authorize(actor, UserRole::Guest)?;
        let method: PaymentMethod = request
            .method
            .parse()
            .map_err(|e: crate::db::ParseEnumError| ServiceError::ValidationFailed(e.to_string()))?;

        let booking = self.load_booking(booking_id).await?;
        ensure_owner(actor, booking.guest_id, "booking")?;

        if !booking.status.blocks_dates() {
            return Err(ServiceError::ValidationFailed(format!(
                "cannot pay for a {} booking",
                booking.status
            )));
        }
        if let Some(existing) = self.store.get_payment_for_booking(booking.id).await? {
            return Err(ServiceError::Conflict(format!(
                "booking already has a {} payment",
                existing.status
            )));
        }

        let receipt = self
            .gateway
            .charge(booking.total_amount, &self.config.currency, method, &request.details)
            .await
            .map_err(|e| {
                warn!("Charge for booking {} failed: {}", booking.id, e);
                ServiceError::ExternalFailure(e.to_string())
            })?;

        let now = Utc::now();
        let payment = PaymentRecord {
            id: Uuid::new_v4(),
            booking_id: booking.id,
            amount: booking.total_amount,
            currency: self.config.currency.clone(),
            method,
            status: PaymentStatus::Completed,
            gateway_ref: receipt.transaction_id,
            refund_ref: None,
            paid_at: now,
            refunded_at: None,
            created_at: now,
            updated_at: now,
        };

        if let Err(e) = self.store.insert_payment(&payment).await {
            // The money moved but the record did not; give it back.
            error!(
                "Payment {} for booking {} charged but not recorded: {}",
                payment.gateway_ref, booking.id, e
            );
            if let Err(refund_err) = self.gateway.refund(&payment.gateway_ref, payment.amount).await {
                error!(
                    "Reversal of unrecorded charge {} failed: {}",
                    payment.gateway_ref, refund_err
                );
            }
            return Err(e.into());
        }

        info!(
            "💰 Booking {} paid: {} {} via {} ({})",
            booking.id, payment.amount, payment.currency, method, payment.gateway_ref
        );
        Ok(payment)
    }

    /// Best-effort refund of a booking's completed payment. Never fails;
    /// problems end up in the outcome and the refund issue log.
    pub async fn refund_booking(&self, booking: &BookingRecord, trigger: RefundTrigger) -> RefundOutcome {
        let payment = match self.store.get_payment_for_booking(booking.id).await {
            Ok(Some(p)) if p.status == PaymentStatus::Completed => p,
            Ok(_) => {
                debug!("Booking {} has nothing to refund", booking.id);
                return RefundOutcome::NotApplicable;
            }
            Err(e) => {
                error!("Could not load payment of booking {}: {}", booking.id, e);
                return RefundOutcome::Failed {
                    reason: "payment record unavailable".to_string(),
                };
            }
        };

        match self.claim_and_refund(&payment, trigger).await {
            Some(outcome) => outcome,
            None => {
                debug!("Payment {} is already being refunded", payment.id);
                RefundOutcome::NotApplicable
            }
        }
    }

    /// Claim the payment, then refund it through the gateway. `None` when
    /// another refund holds the claim, so the gateway is called at most
    /// once per payment.
    async fn claim_and_refund(&self, payment: &PaymentRecord, trigger: RefundTrigger) -> Option<RefundOutcome> {
        let claimed = match self.store.claim_payment_for_refund(payment.id).await {
            Ok(Some(p)) => p,
            Ok(None) => return None,
            Err(e) => {
                error!("Could not claim payment {} for refund: {}", payment.id, e);
                return Some(RefundOutcome::Failed {
                    reason: "payment record unavailable".to_string(),
                });
            }
        };

        let outcome = match self.gateway.refund(&claimed.gateway_ref, claimed.amount).await {
            Ok(receipt) => self.finish_refund(&claimed, &receipt.transaction_id, trigger).await,
            Err(e) => {
                warn!("⚠️  Refund for booking {} failed: {}", claimed.booking_id, e);
                if let Err(release_err) = self.store.release_payment_claim(claimed.id).await {
                    error!("Payment {} left in REFUNDING: {}", claimed.id, release_err);
                }
                let reason = e.to_string();
                self.record_refund_issue(&claimed, trigger, &reason, None).await;
                RefundOutcome::Failed { reason }
            }
        };
        Some(outcome)
    }

    /// Record a refund the gateway has already made.
    async fn finish_refund(&self, payment: &PaymentRecord, reference: &str, trigger: RefundTrigger) -> RefundOutcome {
        match self.store.mark_payment_refunded(payment.id, reference).await {
            Ok(_) => {
                if let Err(e) = self.store.resolve_refund_issues(payment.booking_id).await {
                    warn!("Could not close refund issues of booking {}: {}", payment.booking_id, e);
                }
                info!("↩️  Booking {} refunded ({})", payment.booking_id, reference);
                RefundOutcome::Refunded {
                    reference: reference.to_string(),
                }
            }
            Err(e) => {
                let reason = format!(
                    "gateway refunded {} but the payment was not updated: {}",
                    reference, e
                );
                error!("Booking {}: {}", payment.booking_id, reason);
                self.record_refund_issue(payment, trigger, &reason, Some(reference)).await;
                RefundOutcome::Failed { reason }
            }
        }
    }

    async fn record_refund_issue(
        &self,
        payment: &PaymentRecord,
        trigger: RefundTrigger,
        reason: &str,
        refund_ref: Option<&str>,
    ) {
        let issue = RefundIssueRecord {
            id: Uuid::new_v4(),
            booking_id: payment.booking_id,
            payment_id: payment.id,
            amount: payment.amount,
            trigger,
            reason: reason.to_string(),
            refund_ref: refund_ref.map(str::to_string),
            resolved: false,
            created_at: Utc::now(),
            resolved_at: None,
        };
        if let Err(e) = self.store.insert_refund_issue(&issue).await {
            error!(
                "Refund issue for booking {} could not be stored ({}): {}",
                payment.booking_id, reason, e
            );
        }
    }

    /// Admin retry of a refund that previously failed.
    ///
    /// A payment stuck in REFUNDING whose issue carries a gateway refund id
    /// is finalized without another gateway call. One with no such id is
    /// still in flight and gets `Conflict`.
    pub async fn retry_refund(&self, actor: &Actor, booking_id: Uuid) -> Result<RefundOutcome, ServiceError> {
        authorize(actor, UserRole::Admin)?;
        let booking = self.load_booking(booking_id).await?;
        if !matches!(booking.status, BookingStatus::Rejected | BookingStatus::Cancelled) {
            return Err(ServiceError::ValidationFailed(format!(
                "refunds only apply to rejected or cancelled bookings (current status {})",
                booking.status
            )));
        }

        let payment = match self.store.get_payment_for_booking(booking.id).await? {
            Some(p) => p,
            None => return Ok(RefundOutcome::NotApplicable),
        };

        match payment.status {
            PaymentStatus::Completed => self
                .claim_and_refund(&payment, RefundTrigger::Manual)
                .await
                .ok_or_else(refund_in_progress),
            PaymentStatus::Refunding => {
                let reference = self
                    .store
                    .list_open_refund_issues()
                    .await?
                    .into_iter()
                    .filter(|i| i.payment_id == payment.id)
                    .find_map(|i| i.refund_ref)
                    .ok_or_else(refund_in_progress)?;
                info!("Finalizing refund {} of booking {} without calling the gateway again", reference, booking.id);
                Ok(self.finish_refund(&payment, &reference, RefundTrigger::Manual).await)
            }
            _ => Ok(RefundOutcome::NotApplicable),
        }
    }

    // ==========================================
    // REVIEWS
    // ==========================================

    /// Guest review of a confirmed or completed stay.
    pub async fn review(
        &self,
        actor: &Actor,
        booking_id: Uuid,
        request: ReviewRequest,
    ) -> Result<(ReviewRecord, ListingRating), ServiceError> {
        authorize(actor, UserRole::Guest)?;
        request.validate()?;

        let booking = self.load_booking(booking_id).await?;
        ensure_owner(actor, booking.guest_id, "booking")?;

        if !matches!(booking.status, BookingStatus::Confirmed | BookingStatus::Completed) {
            return Err(ServiceError::ValidationFailed(format!(
                "cannot review a {} booking",
                booking.status
            )));
        }
        if self.store.get_review_for_booking(booking.id).await?.is_some() {
            return Err(ServiceError::Conflict("booking has already been reviewed".to_string()));
        }

        let listing = self.load_listing(booking.listing_id).await?;
        let review = ReviewRecord {
            id: Uuid::new_v4(),
            booking_id: booking.id,
            listing_id: listing.id,
            author_id: actor.id,
            subject_id: listing.host_id,
            rating: request.rating,
            comment: request.comment,
            response: None,
            responded_at: None,
            created_at: Utc::now(),
        };

        let rating = self.store.insert_review(&review).await?;
        Ok((review, rating))
    }

    /// Host reply to a review of one of their listings.
    pub async fn reply_to_review(
        &self,
        actor: &Actor,
        review_id: Uuid,
        request: ReviewReplyRequest,
    ) -> Result<ReviewRecord, ServiceError> {
        authorize(actor, UserRole::Host)?;
        request.validate()?;

        let review = self
            .store
            .get_review(review_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("review {}", review_id)))?;
        let listing = self.load_listing(review.listing_id).await?;
        ensure_owner(actor, listing.host_id, "listing")?;

        Ok(self.store.set_review_response(review.id, &request.response).await?)
    }

    // ==========================================
    // READ MODELS
    // ==========================================

    async fn with_payments(&self, bookings: Vec<BookingRecord>) -> Result<Vec<BookingView>, ServiceError> {
        let mut views = Vec::with_capacity(bookings.len());
        for booking in bookings {
            let payment = self.store.get_payment_for_booking(booking.id).await?;
            views.push(BookingView { booking, payment });
        }
        Ok(views)
    }

    pub async fn guest_bookings(&self, actor: &Actor) -> Result<Vec<BookingView>, ServiceError> {
        let bookings = self.store.list_guest_bookings(actor.id).await?;
        self.with_payments(bookings).await
    }

    pub async fn host_bookings(&self, actor: &Actor) -> Result<Vec<BookingView>, ServiceError> {
        authorize_read(actor, UserRole::Host)?;
        let bookings = self.store.list_host_bookings(actor.id).await?;
        self.with_payments(bookings).await
    }

    /// Visible to the booking's guest, the listing's host and admins.
    pub async fn get(&self, actor: &Actor, booking_id: Uuid) -> Result<BookingView, ServiceError> {
        let booking = self.load_booking(booking_id).await?;
        if actor.id != booking.guest_id && actor.role != UserRole::Admin {
            let listing = self.load_listing(booking.listing_id).await?;
            ensure_owner(actor, listing.host_id, "booking")?;
        }
        let payment = self.store.get_payment_for_booking(booking.id).await?;
        Ok(BookingView { booking, payment })
    }
}
