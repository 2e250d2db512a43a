//! In-memory [`MarketplaceStore`] for unit tests.
//!
//! Mirrors the constraints of the PostgreSQL schema (unique keys, the
//! booking overlap exclusion, compare-and-set updates) so service tests
//! exercise the same failure modes without a database.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use uuid::Uuid;

use super::models::*;
use super::{DatabaseError, MarketplaceStore};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, UserRecord>,
    host_profiles: HashMap<Uuid, HostProfileRecord>,
    listings: HashMap<Uuid, ListingRecord>,
    images: Vec<ListingImageRecord>,
    bookings: HashMap<Uuid, BookingRecord>,
    payments: HashMap<Uuid, PaymentRecord>,
    refund_issues: Vec<RefundIssueRecord>,
    reviews: HashMap<Uuid, ReviewRecord>,
    disputes: HashMap<Uuid, DisputeRecord>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    fail_refund_updates: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with<T>(&self, f: impl FnOnce(&mut Tables) -> T) -> T {
        let mut tables = self.tables.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut tables)
    }

    /// Insert a booking without any checks, for seeding past stays.
    pub fn seed_booking(&self, booking: BookingRecord) {
        self.with(|t| t.bookings.insert(booking.id, booking));
    }

    pub fn payment_count(&self, booking_id: Uuid) -> usize {
        self.with(|t| t.payments.values().filter(|p| p.booking_id == booking_id).count())
    }

    pub fn refund_issue_count(&self) -> usize {
        self.with(|t| t.refund_issues.len())
    }

    /// Make `mark_payment_refunded` fail, as if the database dropped out
    /// right after the gateway answered.
    pub fn fail_refund_updates(&self, fail: bool) {
        self.fail_refund_updates.store(fail, Ordering::SeqCst);
    }
}

fn not_found(what: &str, id: Uuid) -> DatabaseError {
    DatabaseError::NotFound(format!("{} {}", what, id))
}

fn newest_first<T>(mut rows: Vec<T>, created: impl Fn(&T) -> chrono::DateTime<Utc>) -> Vec<T> {
    rows.sort_by(|a, b| created(b).cmp(&created(a)));
    rows
}

#[async_trait]
impl MarketplaceStore for MemoryStore {
    async fn ping(&self) -> Result<(), DatabaseError> {
        Ok(())
    }

    async fn insert_user(&self, user: &UserRecord) -> Result<(), DatabaseError> {
        self.with(|t| {
            if t.users.values().any(|u| u.email == user.email) {
                return Err(DatabaseError::Conflict("duplicate value violates users_email_key".into()));
            }
            t.users.insert(user.id, user.clone());
            Ok(())
        })
    }

    async fn get_user(&self, id: Uuid) -> Result<Option<UserRecord>, DatabaseError> {
        Ok(self.with(|t| t.users.get(&id).cloned()))
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, DatabaseError> {
        Ok(self.with(|t| t.users.values().find(|u| u.email == email).cloned()))
    }

    async fn list_users(&self, limit: i64, offset: i64) -> Result<Vec<UserRecord>, DatabaseError> {
        let users = self.with(|t| t.users.values().cloned().collect::<Vec<_>>());
        Ok(newest_first(users, |u| u.created_at)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn set_user_suspended(&self, id: Uuid, suspended: bool) -> Result<UserRecord, DatabaseError> {
        self.with(|t| {
            let user = t.users.get_mut(&id).ok_or_else(|| not_found("user", id))?;
            user.suspended = suspended;
            user.updated_at = Utc::now();
            Ok(user.clone())
        })
    }

    async fn set_user_role(&self, id: Uuid, role: UserRole) -> Result<UserRecord, DatabaseError> {
        self.with(|t| {
            let user = t.users.get_mut(&id).ok_or_else(|| not_found("user", id))?;
            user.role = role;
            user.updated_at = Utc::now();
            Ok(user.clone())
        })
    }

    async fn create_host_profile(&self, profile: &HostProfileRecord) -> Result<UserRecord, DatabaseError> {
        self.with(|t| {
            if t.host_profiles.contains_key(&profile.user_id) {
                return Err(DatabaseError::Conflict("duplicate value violates host_profiles_user_id_key".into()));
            }
            let user = t
                .users
                .get_mut(&profile.user_id)
                .ok_or_else(|| not_found("user", profile.user_id))?;
            if user.role != UserRole::Admin {
                user.role = UserRole::Host;
            }
            user.updated_at = Utc::now();
            let user = user.clone();
            t.host_profiles.insert(profile.user_id, profile.clone());
            Ok(user)
        })
    }

    async fn get_host_profile(&self, user_id: Uuid) -> Result<Option<HostProfileRecord>, DatabaseError> {
        Ok(self.with(|t| t.host_profiles.get(&user_id).cloned()))
    }

    async fn insert_listing(
        &self,
        listing: &ListingRecord,
        images: &[ListingImageRecord],
    ) -> Result<(), DatabaseError> {
        self.with(|t| {
            t.listings.insert(listing.id, listing.clone());
            t.images.extend(images.iter().cloned());
        });
        Ok(())
    }

    async fn get_listing(&self, id: Uuid) -> Result<Option<ListingRecord>, DatabaseError> {
        Ok(self.with(|t| t.listings.get(&id).cloned()))
    }

    async fn list_listing_images(&self, listing_id: Uuid) -> Result<Vec<ListingImageRecord>, DatabaseError> {
        Ok(self.with(|t| {
            t.images
                .iter()
                .filter(|i| i.listing_id == listing_id)
                .cloned()
                .collect()
        }))
    }

    async fn search_listings(&self, filter: &ListingFilter) -> Result<(Vec<ListingRecord>, i64), DatabaseError> {
        let mut matches: Vec<ListingRecord> = self.with(|t| {
            t.listings
                .values()
                .filter(|l| l.is_bookable())
                .filter(|l| {
                    filter
                        .city
                        .as_ref()
                        .map_or(true, |c| l.city.to_lowercase().contains(&c.to_lowercase()))
                })
                .filter(|l| filter.property_type.map_or(true, |p| l.property_type == p))
                .filter(|l| filter.min_price.map_or(true, |p| l.price_per_night >= p))
                .filter(|l| filter.max_price.map_or(true, |p| l.price_per_night <= p))
                .cloned()
                .collect()
        });

        matches.sort_by(|a, b| match filter.sort {
            ListingSort::Newest => b.created_at.cmp(&a.created_at),
            ListingSort::PriceAsc => a.price_per_night.cmp(&b.price_per_night),
            ListingSort::PriceDesc => b.price_per_night.cmp(&a.price_per_night),
            ListingSort::Rating => b
                .avg_rating
                .partial_cmp(&a.avg_rating)
                .unwrap_or(std::cmp::Ordering::Equal),
        });

        let total = matches.len() as i64;
        let page = matches
            .into_iter()
            .skip(filter.offset as usize)
            .take(filter.limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn list_host_listings(&self, host_id: Uuid) -> Result<Vec<ListingRecord>, DatabaseError> {
        let listings = self.with(|t| {
            t.listings
                .values()
                .filter(|l| l.host_id == host_id)
                .cloned()
                .collect::<Vec<_>>()
        });
        Ok(newest_first(listings, |l| l.created_at))
    }

    async fn list_listings_by_status(&self, status: ListingStatus) -> Result<Vec<ListingRecord>, DatabaseError> {
        let mut listings = self.with(|t| {
            t.listings
                .values()
                .filter(|l| l.status == status)
                .cloned()
                .collect::<Vec<_>>()
        });
        listings.sort_by_key(|l| l.created_at);
        Ok(listings)
    }

    async fn update_listing_pricing(
        &self,
        id: Uuid,
        price_per_night: i64,
        cleaning_fee: i64,
    ) -> Result<ListingRecord, DatabaseError> {
        self.with(|t| {
            let listing = t.listings.get_mut(&id).ok_or_else(|| not_found("listing", id))?;
            listing.price_per_night = price_per_night;
            listing.cleaning_fee = cleaning_fee;
            listing.updated_at = Utc::now();
            Ok(listing.clone())
        })
    }

    async fn set_listing_active(&self, id: Uuid, active: bool) -> Result<ListingRecord, DatabaseError> {
        self.with(|t| {
            let listing = t.listings.get_mut(&id).ok_or_else(|| not_found("listing", id))?;
            listing.is_active = active;
            listing.updated_at = Utc::now();
            Ok(listing.clone())
        })
    }

    async fn set_listing_moderation(
        &self,
        id: Uuid,
        status: ListingStatus,
        active: bool,
        admin_notes: Option<String>,
    ) -> Result<ListingRecord, DatabaseError> {
        self.with(|t| {
            let listing = t.listings.get_mut(&id).ok_or_else(|| not_found("listing", id))?;
            listing.status = status;
            listing.is_active = active;
            listing.admin_notes = admin_notes;
            listing.updated_at = Utc::now();
            Ok(listing.clone())
        })
    }

    async fn has_conflicting_booking(
        &self,
        listing_id: Uuid,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> Result<bool, DatabaseError> {
        Ok(self.with(|t| {
            t.bookings.values().any(|b| {
                b.listing_id == listing_id && b.status.blocks_dates() && b.overlaps(check_in, check_out)
            })
        }))
    }

    async fn insert_booking(&self, booking: &BookingRecord) -> Result<(), DatabaseError> {
        self.with(|t| {
            match t.listings.get(&booking.listing_id) {
                None => return Err(not_found("listing", booking.listing_id)),
                Some(l) if !l.is_bookable() => return Err(not_found("listing", booking.listing_id)),
                Some(_) => {}
            }
            let clash = t.bookings.values().any(|b| {
                b.listing_id == booking.listing_id
                    && b.status.blocks_dates()
                    && b.overlaps(booking.check_in, booking.check_out)
            });
            if clash {
                return Err(DatabaseError::Conflict("dates overlap an existing booking".into()));
            }
            t.bookings.insert(booking.id, booking.clone());
            Ok(())
        })
    }

    async fn get_booking(&self, id: Uuid) -> Result<Option<BookingRecord>, DatabaseError> {
        Ok(self.with(|t| t.bookings.get(&id).cloned()))
    }

    async fn transition_booking(
        &self,
        id: Uuid,
        from: BookingStatus,
        to: BookingStatus,
    ) -> Result<Option<BookingRecord>, DatabaseError> {
        Ok(self.with(|t| match t.bookings.get_mut(&id) {
            Some(b) if b.status == from => {
                b.status = to;
                b.updated_at = Utc::now();
                Some(b.clone())
            }
            _ => None,
        }))
    }

    async fn complete_finished_stays(&self, today: NaiveDate) -> Result<Vec<Uuid>, DatabaseError> {
        Ok(self.with(|t| {
            t.bookings
                .values_mut()
                .filter(|b| b.status == BookingStatus::Confirmed && b.check_out <= today)
                .map(|b| {
                    b.status = BookingStatus::Completed;
                    b.updated_at = Utc::now();
                    b.id
                })
                .collect()
        }))
    }

    async fn list_guest_bookings(&self, guest_id: Uuid) -> Result<Vec<BookingRecord>, DatabaseError> {
        let bookings = self.with(|t| {
            t.bookings
                .values()
                .filter(|b| b.guest_id == guest_id)
                .cloned()
                .collect::<Vec<_>>()
        });
        Ok(newest_first(bookings, |b| b.created_at))
    }

    async fn list_host_bookings(&self, host_id: Uuid) -> Result<Vec<BookingRecord>, DatabaseError> {
        let bookings = self.with(|t| {
            t.bookings
                .values()
                .filter(|b| {
                    t.listings
                        .get(&b.listing_id)
                        .map_or(false, |l| l.host_id == host_id)
                })
                .cloned()
                .collect::<Vec<_>>()
        });
        Ok(newest_first(bookings, |b| b.created_at))
    }

    async fn list_booked_ranges(&self, listing_id: Uuid, from: NaiveDate) -> Result<Vec<StayRange>, DatabaseError> {
        let mut ranges: Vec<StayRange> = self.with(|t| {
            t.bookings
                .values()
                .filter(|b| b.listing_id == listing_id && b.status.blocks_dates() && b.check_out > from)
                .map(|b| StayRange {
                    check_in: b.check_in,
                    check_out: b.check_out,
                })
                .collect()
        });
        ranges.sort_by_key(|r| r.check_in);
        Ok(ranges)
    }

    async fn get_payment_for_booking(&self, booking_id: Uuid) -> Result<Option<PaymentRecord>, DatabaseError> {
        Ok(self.with(|t| t.payments.values().find(|p| p.booking_id == booking_id).cloned()))
    }

    async fn insert_payment(&self, payment: &PaymentRecord) -> Result<(), DatabaseError> {
        self.with(|t| {
            if t.payments.values().any(|p| p.booking_id == payment.booking_id) {
                return Err(DatabaseError::Conflict("duplicate value violates payments_booking_id_key".into()));
            }
            t.payments.insert(payment.id, payment.clone());
            Ok(())
        })
    }

    async fn claim_payment_for_refund(&self, payment_id: Uuid) -> Result<Option<PaymentRecord>, DatabaseError> {
        Ok(self.with(|t| match t.payments.get_mut(&payment_id) {
            Some(p) if p.status == PaymentStatus::Completed => {
                p.status = PaymentStatus::Refunding;
                p.updated_at = Utc::now();
                Some(p.clone())
            }
            _ => None,
        }))
    }

    async fn release_payment_claim(&self, payment_id: Uuid) -> Result<(), DatabaseError> {
        self.with(|t| match t.payments.get_mut(&payment_id) {
            Some(p) if p.status == PaymentStatus::Refunding => {
                p.status = PaymentStatus::Completed;
                p.updated_at = Utc::now();
                Ok(())
            }
            _ => Err(DatabaseError::Conflict(format!("payment {} is not being refunded", payment_id))),
        })
    }

    async fn mark_payment_refunded(&self, payment_id: Uuid, refund_ref: &str) -> Result<PaymentRecord, DatabaseError> {
        if self.fail_refund_updates.load(Ordering::SeqCst) {
            return Err(DatabaseError::ConnectionError("connection reset".into()));
        }
        self.with(|t| match t.payments.get_mut(&payment_id) {
            Some(p) if p.status == PaymentStatus::Refunding => {
                let now = Utc::now();
                p.status = PaymentStatus::Refunded;
                p.refund_ref = Some(refund_ref.to_string());
                p.refunded_at = Some(now);
                p.updated_at = now;
                Ok(p.clone())
            }
            _ => Err(DatabaseError::Conflict(format!("payment {} is not refundable", payment_id))),
        })
    }

    async fn insert_refund_issue(&self, issue: &RefundIssueRecord) -> Result<(), DatabaseError> {
        self.with(|t| t.refund_issues.push(issue.clone()));
        Ok(())
    }

    async fn list_open_refund_issues(&self) -> Result<Vec<RefundIssueRecord>, DatabaseError> {
        Ok(self.with(|t| t.refund_issues.iter().filter(|i| !i.resolved).cloned().collect()))
    }

    async fn resolve_refund_issues(&self, booking_id: Uuid) -> Result<u64, DatabaseError> {
        Ok(self.with(|t| {
            let mut closed = 0;
            for issue in t
                .refund_issues
                .iter_mut()
                .filter(|i| i.booking_id == booking_id && !i.resolved)
            {
                issue.resolved = true;
                issue.resolved_at = Some(Utc::now());
                closed += 1;
            }
            closed
        }))
    }

    async fn insert_review(&self, review: &ReviewRecord) -> Result<ListingRating, DatabaseError> {
        self.with(|t| {
            if !t.listings.contains_key(&review.listing_id) {
                return Err(not_found("listing", review.listing_id));
            }
            if t.reviews.values().any(|r| r.booking_id == review.booking_id) {
                return Err(DatabaseError::Conflict("duplicate value violates reviews_booking_id_key".into()));
            }
            t.reviews.insert(review.id, review.clone());

            let ratings: Vec<i32> = t
                .reviews
                .values()
                .filter(|r| r.listing_id == review.listing_id)
                .map(|r| r.rating)
                .collect();
            let rating = ListingRating {
                avg_rating: ratings.iter().sum::<i32>() as f64 / ratings.len() as f64,
                review_count: ratings.len() as i32,
            };

            if let Some(listing) = t.listings.get_mut(&review.listing_id) {
                listing.avg_rating = rating.avg_rating;
                listing.review_count = rating.review_count;
            }
            Ok(rating)
        })
    }

    async fn get_review(&self, id: Uuid) -> Result<Option<ReviewRecord>, DatabaseError> {
        Ok(self.with(|t| t.reviews.get(&id).cloned()))
    }

    async fn get_review_for_booking(&self, booking_id: Uuid) -> Result<Option<ReviewRecord>, DatabaseError> {
        Ok(self.with(|t| t.reviews.values().find(|r| r.booking_id == booking_id).cloned()))
    }

    async fn set_review_response(&self, id: Uuid, response: &str) -> Result<ReviewRecord, DatabaseError> {
        self.with(|t| {
            let review = t.reviews.get_mut(&id).ok_or_else(|| not_found("review", id))?;
            review.response = Some(response.to_string());
            review.responded_at = Some(Utc::now());
            Ok(review.clone())
        })
    }

    async fn list_listing_reviews(&self, listing_id: Uuid, limit: i64) -> Result<Vec<ReviewRecord>, DatabaseError> {
        let reviews = self.with(|t| {
            t.reviews
                .values()
                .filter(|r| r.listing_id == listing_id)
                .cloned()
                .collect::<Vec<_>>()
        });
        Ok(newest_first(reviews, |r| r.created_at)
            .into_iter()
            .take(limit as usize)
            .collect())
    }

    async fn insert_dispute(&self, dispute: &DisputeRecord) -> Result<(), DatabaseError> {
        self.with(|t| {
            if t.disputes.values().any(|d| d.booking_id == dispute.booking_id) {
                return Err(DatabaseError::Conflict("duplicate value violates disputes_booking_id_key".into()));
            }
            t.disputes.insert(dispute.id, dispute.clone());
            Ok(())
        })
    }

    async fn get_dispute(&self, id: Uuid) -> Result<Option<DisputeRecord>, DatabaseError> {
        Ok(self.with(|t| t.disputes.get(&id).cloned()))
    }

    async fn get_dispute_for_booking(&self, booking_id: Uuid) -> Result<Option<DisputeRecord>, DatabaseError> {
        Ok(self.with(|t| t.disputes.values().find(|d| d.booking_id == booking_id).cloned()))
    }

    async fn resolve_dispute(
        &self,
        id: Uuid,
        status: DisputeStatus,
        resolution: &str,
        resolved_by: Uuid,
    ) -> Result<Option<DisputeRecord>, DatabaseError> {
        Ok(self.with(|t| match t.disputes.get_mut(&id) {
            Some(d) if d.status == DisputeStatus::Open => {
                let now = Utc::now();
                d.status = status;
                d.resolution = Some(resolution.to_string());
                d.resolved_by_id = Some(resolved_by);
                d.resolved_at = Some(now);
                d.updated_at = now;
                Some(d.clone())
            }
            _ => None,
        }))
    }

    async fn list_disputes(&self, status: Option<DisputeStatus>) -> Result<Vec<DisputeRecord>, DatabaseError> {
        let disputes = self.with(|t| {
            t.disputes
                .values()
                .filter(|d| status.map_or(true, |s| d.status == s))
                .cloned()
                .collect::<Vec<_>>()
        });
        Ok(newest_first(disputes, |d| d.created_at))
    }
}
