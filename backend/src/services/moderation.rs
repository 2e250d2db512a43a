//! Admin moderation: listing approval and user suspension.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::db::{ListingRecord, ListingStatus, MarketplaceStore, RefundIssueRecord, UserRecord, UserRole};
use crate::models::RejectListingRequest;

use super::access::{authorize, authorize_read, Actor};
use super::ServiceError;

/// Upper bound for paged admin lists.
pub const MAX_PAGE_SIZE: i64 = 200;

#[derive(Clone)]
pub struct ModerationService {
    store: Arc<dyn MarketplaceStore>,
}

impl ModerationService {
    pub fn new(store: Arc<dyn MarketplaceStore>) -> Self {
        Self { store }
    }

    async fn ensure_listing(&self, listing_id: Uuid) -> Result<(), ServiceError> {
        self.store
            .get_listing(listing_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| ServiceError::NotFound(format!("listing {}", listing_id)))
    }

    pub async fn approve_listing(&self, actor: &Actor, listing_id: Uuid) -> Result<ListingRecord, ServiceError> {
        authorize(actor, UserRole::Admin)?;
        self.ensure_listing(listing_id).await?;

        let listing = self
            .store
            .set_listing_moderation(listing_id, ListingStatus::Approved, true, None)
            .await?;
        info!("✅ Listing {} approved by {}", listing_id, actor.id);
        Ok(listing)
    }

    pub async fn reject_listing(
        &self,
        actor: &Actor,
        listing_id: Uuid,
        request: RejectListingRequest,
    ) -> Result<ListingRecord, ServiceError> {
        authorize(actor, UserRole::Admin)?;
        request.validate()?;
        self.ensure_listing(listing_id).await?;

        let listing = self
            .store
            .set_listing_moderation(listing_id, ListingStatus::Rejected, false, Some(request.reason))
            .await?;
        info!("❌ Listing {} rejected by {}", listing_id, actor.id);
        Ok(listing)
    }

    pub async fn pending_listings(&self, actor: &Actor) -> Result<Vec<ListingRecord>, ServiceError> {
        authorize_read(actor, UserRole::Admin)?;
        Ok(self.store.list_listings_by_status(ListingStatus::Pending).await?)
    }

    pub async fn suspend_user(&self, actor: &Actor, user_id: Uuid) -> Result<UserRecord, ServiceError> {
        authorize(actor, UserRole::Admin)?;
        if actor.id == user_id {
            return Err(ServiceError::ValidationFailed(
                "admins cannot suspend themselves".to_string(),
            ));
        }

        let user = self.store.set_user_suspended(user_id, true).await?;
        warn!("🚫 User {} suspended by {}", user_id, actor.id);
        Ok(user)
    }

    pub async fn reactivate_user(&self, actor: &Actor, user_id: Uuid) -> Result<UserRecord, ServiceError> {
        authorize(actor, UserRole::Admin)?;
        let user = self.store.set_user_suspended(user_id, false).await?;
        info!("User {} reactivated by {}", user_id, actor.id);
        Ok(user)
    }

    pub async fn list_users(&self, actor: &Actor, limit: i64, offset: i64) -> Result<Vec<UserRecord>, ServiceError> {
        authorize_read(actor, UserRole::Admin)?;
        Ok(self
            .store
            .list_users(limit.clamp(1, MAX_PAGE_SIZE), offset.max(0))
            .await?)
    }

    pub async fn refund_issues(&self, actor: &Actor) -> Result<Vec<RefundIssueRecord>, ServiceError> {
        authorize_read(actor, UserRole::Admin)?;
        Ok(self.store.list_open_refund_issues().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use crate::services::booking_manager::tests::{listing, user};

    async fn setup() -> (Arc<MemoryStore>, ModerationService, Actor) {
        let store = Arc::new(MemoryStore::new());
        let admin = user(UserRole::Admin);
        store.insert_user(&admin).await.unwrap();
        (store.clone(), ModerationService::new(store), Actor::from(&admin))
    }

    #[actix_rt::test]
    async fn test_approve_and_reject_listing() {
        let (store, moderation, admin) = setup().await;
        let mut pending = listing(Uuid::new_v4(), 9_000, 0);
        pending.status = ListingStatus::Pending;
        pending.is_active = false;
        store.insert_listing(&pending, &[]).await.unwrap();

        assert_eq!(moderation.pending_listings(&admin).await.unwrap().len(), 1);

        let approved = moderation.approve_listing(&admin, pending.id).await.unwrap();
        assert!(approved.is_bookable());
        assert!(moderation.pending_listings(&admin).await.unwrap().is_empty());

        let rejected = moderation
            .reject_listing(
                &admin,
                pending.id,
                RejectListingRequest {
                    reason: "Photos do not match the address".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(rejected.status, ListingStatus::Rejected);
        assert!(!rejected.is_active);
        assert_eq!(rejected.admin_notes.as_deref(), Some("Photos do not match the address"));
    }

    #[actix_rt::test]
    async fn test_moderation_requires_admin() {
        let (_, moderation, _) = setup().await;
        let host = Actor::from(&user(UserRole::Host));
        let result = moderation.approve_listing(&host, Uuid::new_v4()).await;
        assert!(matches!(result, Err(ServiceError::Forbidden(_))));
        assert!(matches!(
            moderation.list_users(&host, 10, 0).await,
            Err(ServiceError::Forbidden(_))
        ));
    }

    #[actix_rt::test]
    async fn test_suspend_and_reactivate() {
        let (store, moderation, admin) = setup().await;
        let guest = user(UserRole::Guest);
        store.insert_user(&guest).await.unwrap();

        let suspended = moderation.suspend_user(&admin, guest.id).await.unwrap();
        assert!(suspended.suspended);
        let back = moderation.reactivate_user(&admin, guest.id).await.unwrap();
        assert!(!back.suspended);

        let own = moderation.suspend_user(&admin, admin.id).await;
        assert!(matches!(own, Err(ServiceError::ValidationFailed(_))));

        let missing = moderation.suspend_user(&admin, Uuid::new_v4()).await;
        assert!(matches!(missing, Err(ServiceError::NotFound(_))));
    }
}
