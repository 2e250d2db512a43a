//! # Listing Service
//!
//! Host onboarding, listing management and public search.
//!
//! ```text
//! create_listing ──► PENDING, inactive
//!                        │ admin approves
//!                        ▼
//!                    APPROVED, active ◄──► APPROVED, inactive   (host toggles)
//! ```
//!
//! Only APPROVED + active listings appear in search and accept bookings.

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::db::{
    HostProfileRecord, ListingFilter, ListingImageRecord, ListingRecord, ListingSort, ListingStatus,
    MarketplaceStore, ParseEnumError, PropertyType, Province, ReviewRecord, StayRange, UserRecord,
    UserRole,
};
use crate::models::{
    BecomeHostRequest, CreateListingRequest, ListingSearchQuery, UpdatePricingRequest,
};

use crate::utils::mask_tail;

use super::access::{authorize, authorize_read, ensure_owner, Actor};
use super::ServiceError;

/// Listings per search page.
pub const SEARCH_PAGE_SIZE: i64 = 12;

/// Reviews shown on a listing page.
pub const DETAIL_REVIEW_COUNT: i64 = 5;

#[derive(Debug, Clone)]
pub struct ListingDetail {
    pub listing: ListingRecord,
    pub images: Vec<ListingImageRecord>,
    pub host_name: String,
    pub reviews: Vec<ReviewRecord>,
    /// Upcoming dates held by pending or confirmed bookings.
    pub booked_ranges: Vec<StayRange>,
}

#[derive(Debug, Clone)]
pub struct ListingPage {
    pub listings: Vec<ListingRecord>,
    pub page: i64,
    pub page_size: i64,
    pub total: i64,
    pub total_pages: i64,
}

fn parse_strict<T>(value: &str) -> Result<T, ServiceError>
where
    T: std::str::FromStr<Err = ParseEnumError>,
{
    value
        .parse()
        .map_err(|e: ParseEnumError| ServiceError::ValidationFailed(e.to_string()))
}

#[derive(Clone)]
pub struct ListingService {
    store: Arc<dyn MarketplaceStore>,
}

impl ListingService {
    pub fn new(store: Arc<dyn MarketplaceStore>) -> Self {
        Self { store }
    }

    async fn load_listing(&self, listing_id: Uuid) -> Result<ListingRecord, ServiceError> {
        self.store
            .get_listing(listing_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("listing {}", listing_id)))
    }

    /// Create the caller's host profile and upgrade them to HOST.
    pub async fn become_host(
        &self,
        actor: &Actor,
        request: BecomeHostRequest,
    ) -> Result<UserRecord, ServiceError> {
        authorize(actor, UserRole::Guest)?;
        request.validate()?;

        if self.store.get_host_profile(actor.id).await?.is_some() {
            return Err(ServiceError::Conflict("host profile already exists".to_string()));
        }

        let profile = HostProfileRecord {
            id: Uuid::new_v4(),
            user_id: actor.id,
            bio: request.bio,
            bank_name: request.bank_name,
            account_number: request.account_number,
            created_at: Utc::now(),
        };
        let user = self.store.create_host_profile(&profile).await?;
        info!(
            "🏠 User {} is now a host (payout {} {})",
            user.id,
            profile.bank_name,
            mask_tail(&profile.account_number)
        );
        Ok(user)
    }

    pub async fn create_listing(
        &self,
        actor: &Actor,
        request: CreateListingRequest,
    ) -> Result<ListingRecord, ServiceError> {
        authorize(actor, UserRole::Host)?;
        request.validate()?;

        let property_type: PropertyType = parse_strict(&request.property_type)?;
        let province: Province = parse_strict(&request.province)?;

        let now = Utc::now();
        let listing = ListingRecord {
            id: Uuid::new_v4(),
            host_id: actor.id,
            title: request.title.trim().to_string(),
            description: request.description,
            property_type,
            province,
            city: request.city.trim().to_string(),
            address: request.address,
            price_per_night: request.price_per_night,
            cleaning_fee: request.cleaning_fee.unwrap_or(0),
            max_guests: request.max_guests,
            bedrooms: request.bedrooms,
            beds: request.beds,
            bathrooms: request.bathrooms,
            amenities: request.amenities,
            status: ListingStatus::Pending,
            is_active: false,
            admin_notes: None,
            avg_rating: 0.0,
            review_count: 0,
            created_at: now,
            updated_at: now,
        };

        let images: Vec<ListingImageRecord> = request
            .images
            .into_iter()
            .map(|url| ListingImageRecord {
                id: Uuid::new_v4(),
                listing_id: listing.id,
                url,
                created_at: now,
            })
            .collect();

        self.store.insert_listing(&listing, &images).await?;
        info!(
            "Listing {} '{}' submitted for review by host {}",
            listing.id, listing.title, actor.id
        );
        Ok(listing)
    }

    /// New rates apply to future bookings only.
    pub async fn update_pricing(
        &self,
        actor: &Actor,
        listing_id: Uuid,
        request: UpdatePricingRequest,
    ) -> Result<ListingRecord, ServiceError> {
        authorize(actor, UserRole::Host)?;
        request.validate()?;

        let listing = self.load_listing(listing_id).await?;
        ensure_owner(actor, listing.host_id, "listing")?;

        Ok(self
            .store
            .update_listing_pricing(listing.id, request.price_per_night, request.cleaning_fee)
            .await?)
    }

    pub async fn set_active(
        &self,
        actor: &Actor,
        listing_id: Uuid,
        active: bool,
    ) -> Result<ListingRecord, ServiceError> {
        authorize(actor, UserRole::Host)?;

        let listing = self.load_listing(listing_id).await?;
        ensure_owner(actor, listing.host_id, "listing")?;

        if active && listing.status != ListingStatus::Approved {
            return Err(ServiceError::ValidationFailed(format!(
                "a {} listing cannot be activated",
                listing.status
            )));
        }

        Ok(self.store.set_listing_active(listing.id, active).await?)
    }

    pub async fn search(&self, query: ListingSearchQuery) -> Result<ListingPage, ServiceError> {
        let property_type = query
            .property_type
            .as_deref()
            .map(parse_strict::<PropertyType>)
            .transpose()?;
        let sort = query
            .sort
            .as_deref()
            .map(parse_strict::<ListingSort>)
            .transpose()?
            .unwrap_or_default();

        if let (Some(min), Some(max)) = (query.min_price, query.max_price) {
            if min > max {
                return Err(ServiceError::ValidationFailed(
                    "minPrice cannot exceed maxPrice".to_string(),
                ));
            }
        }

        let page = i64::from(query.page.unwrap_or(1).max(1));
        let filter = ListingFilter {
            city: query
                .city
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            property_type,
            min_price: query.min_price,
            max_price: query.max_price,
            sort,
            limit: SEARCH_PAGE_SIZE,
            offset: (page - 1) * SEARCH_PAGE_SIZE,
        };

        let (listings, total) = self.store.search_listings(&filter).await?;
        Ok(ListingPage {
            listings,
            page,
            page_size: SEARCH_PAGE_SIZE,
            total,
            total_pages: (total + SEARCH_PAGE_SIZE - 1) / SEARCH_PAGE_SIZE,
        })
    }

    /// Public listing page. Listings that cannot be booked are hidden from
    /// everyone except their host and admins.
    pub async fn detail(&self, viewer: Option<&Actor>, listing_id: Uuid) -> Result<ListingDetail, ServiceError> {
        let listing = self.load_listing(listing_id).await?;

        if !listing.is_bookable() {
            let privileged = viewer
                .map(|v| v.id == listing.host_id || v.role == UserRole::Admin)
                .unwrap_or(false);
            if !privileged {
                return Err(ServiceError::NotFound(format!("listing {}", listing_id)));
            }
        }

        let images = self.store.list_listing_images(listing.id).await?;
        let host_name = self
            .store
            .get_user(listing.host_id)
            .await?
            .map(|u| u.name)
            .unwrap_or_default();
        let reviews = self
            .store
            .list_listing_reviews(listing.id, DETAIL_REVIEW_COUNT)
            .await?;
        let booked_ranges = self
            .store
            .list_booked_ranges(listing.id, Utc::now().date_naive())
            .await?;

        Ok(ListingDetail {
            listing,
            images,
            host_name,
            reviews,
            booked_ranges,
        })
    }

    pub async fn host_listings(&self, actor: &Actor) -> Result<Vec<ListingRecord>, ServiceError> {
        authorize_read(actor, UserRole::Host)?;
        Ok(self.store.list_host_listings(actor.id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::services::booking_manager::tests::{listing, user};

    struct Fixture {
        store: Arc<MemoryStore>,
        service: ListingService,
        host: Actor,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let host = user(UserRole::Host);
        store.insert_user(&host).await.unwrap();
        Fixture {
            service: ListingService::new(store.clone()),
            store,
            host: Actor::from(&host),
        }
    }

    fn create_request() -> CreateListingRequest {
        CreateListingRequest {
            title: "Hunza View Cottage".to_string(),
            description: "Two bedroom cottage with a view of Rakaposhi.".to_string(),
            property_type: "COTTAGE".to_string(),
            province: "GILGIT_BALTISTAN".to_string(),
            city: "Karimabad".to_string(),
            address: "Baltit Fort Road".to_string(),
            price_per_night: 12_000,
            cleaning_fee: Some(1_500),
            max_guests: 4,
            bedrooms: 2,
            beds: 3,
            bathrooms: 1,
            amenities: vec!["WiFi".to_string()],
            images: vec!["https://cdn.example.pk/hunza-1.jpg".to_string()],
        }
    }

    async fn seed(store: &MemoryStore, host_id: Uuid, city: &str, price: i64) -> ListingRecord {
        let mut record = listing(host_id, price, 0);
        record.city = city.to_string();
        store.insert_listing(&record, &[]).await.unwrap();
        record
    }

    #[actix_rt::test]
    async fn test_become_host_upgrades_role_once() {
        let f = fixture().await;
        let guest = user(UserRole::Guest);
        f.store.insert_user(&guest).await.unwrap();

        let request = BecomeHostRequest {
            bio: "Family-run guest house near Mall Road.".to_string(),
            bank_name: "Meezan Bank".to_string(),
            account_number: "01234567890".to_string(),
        };
        let upgraded = f
            .service
            .become_host(&Actor::from(&guest), request.clone())
            .await
            .unwrap();
        assert_eq!(upgraded.role, UserRole::Host);

        let again = f.service.become_host(&Actor::from(&upgraded), request).await;
        assert!(matches!(again, Err(ServiceError::Conflict(_))));
    }

    #[actix_rt::test]
    async fn test_new_listing_waits_for_approval() {
        let f = fixture().await;
        let created = f.service.create_listing(&f.host, create_request()).await.unwrap();
        assert_eq!(created.status, ListingStatus::Pending);
        assert!(!created.is_active);
        assert_eq!(created.cleaning_fee, 1_500);

        let images = f.store.list_listing_images(created.id).await.unwrap();
        assert_eq!(images.len(), 1);

        // hidden from the public, visible to its host
        let public = f.service.detail(None, created.id).await;
        assert!(matches!(public, Err(ServiceError::NotFound(_))));
        assert!(f.service.detail(Some(&f.host), created.id).await.is_ok());

        // cannot be switched on before approval
        let activate = f.service.set_active(&f.host, created.id, true).await;
        assert!(matches!(activate, Err(ServiceError::ValidationFailed(_))));
    }

    #[actix_rt::test]
    async fn test_create_listing_rules() {
        let f = fixture().await;
        let guest = user(UserRole::Guest);
        let denied = f.service.create_listing(&Actor::from(&guest), create_request()).await;
        assert!(matches!(denied, Err(ServiceError::Forbidden(_))));

        let mut bad_type = create_request();
        bad_type.property_type = "castle".to_string();
        assert!(matches!(
            f.service.create_listing(&f.host, bad_type).await,
            Err(ServiceError::ValidationFailed(_))
        ));

        let mut cheap = create_request();
        cheap.price_per_night = 50;
        assert!(matches!(
            f.service.create_listing(&f.host, cheap).await,
            Err(ServiceError::ValidationFailed(_))
        ));
    }

    #[actix_rt::test]
    async fn test_only_owner_updates_pricing() {
        let f = fixture().await;
        let record = seed(&f.store, f.host.id, "Lahore", 10_000).await;
        let other = user(UserRole::Host);

        let request = UpdatePricingRequest {
            price_per_night: 15_000,
            cleaning_fee: 500,
        };
        let denied = f
            .service
            .update_pricing(&Actor::from(&other), record.id, request.clone())
            .await;
        assert!(matches!(denied, Err(ServiceError::Forbidden(_))));

        let updated = f.service.update_pricing(&f.host, record.id, request).await.unwrap();
        assert_eq!(updated.price_per_night, 15_000);
        assert_eq!(updated.cleaning_fee, 500);
    }

    #[actix_rt::test]
    async fn test_search_filters_and_pages() {
        let f = fixture().await;
        for i in 0..14 {
            seed(&f.store, f.host.id, "Lahore", 5_000 + i * 100).await;
        }
        seed(&f.store, f.host.id, "Karachi", 9_000).await;
        let hidden = seed(&f.store, f.host.id, "Lahore", 1_000).await;
        f.store.set_listing_active(hidden.id, false).await.unwrap();

        let first = f
            .service
            .search(ListingSearchQuery {
                city: Some("lahore".to_string()),
                sort: Some("price_asc".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(first.total, 14);
        assert_eq!(first.total_pages, 2);
        assert_eq!(first.listings.len(), 12);
        assert_eq!(first.listings[0].price_per_night, 5_000);

        let second = f
            .service
            .search(ListingSearchQuery {
                city: Some("LAH".to_string()),
                page: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(second.listings.len(), 2);

        let priced = f
            .service
            .search(ListingSearchQuery {
                min_price: Some(6_000),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(priced.total, 5);
    }

    #[actix_rt::test]
    async fn test_search_rejects_unknown_sort() {
        let f = fixture().await;
        let result = f
            .service
            .search(ListingSearchQuery {
                sort: Some("cheapest".to_string()),
                ..Default::default()
            })
            .await;
        assert!(matches!(result, Err(ServiceError::ValidationFailed(_))));
    }

    #[actix_rt::test]
    async fn test_host_listings_include_unapproved() {
        let f = fixture().await;
        f.service.create_listing(&f.host, create_request()).await.unwrap();
        seed(&f.store, f.host.id, "Murree", 8_000).await;
        let mine = f.service.host_listings(&f.host).await.unwrap();
        assert_eq!(mine.len(), 2);
    }
}
