//! # Dispute Service
//!
//! Either party of a booking may open one dispute; an admin closes it.
//!
//! ```text
//! OPEN ──► RESOLVED
//!   └────► DISMISSED
//! ```

use std::sync::Arc;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::db::{
    DisputeCategory, DisputeRecord, DisputeStatus, MarketplaceStore, ParseEnumError, UserRole,
};
use crate::models::{OpenDisputeRequest, ResolveDisputeRequest};

use super::access::{authorize, authorize_read, Actor};
use super::ServiceError;

#[derive(Clone)]
pub struct DisputeService {
    store: Arc<dyn MarketplaceStore>,
}

impl DisputeService {
    pub fn new(store: Arc<dyn MarketplaceStore>) -> Self {
        Self { store }
    }

    /// Open a dispute on a booking. The caller must be its guest or the
    /// listing's host.
    pub async fn open(
        &self,
        actor: &Actor,
        booking_id: Uuid,
        request: OpenDisputeRequest,
    ) -> Result<DisputeRecord, ServiceError> {
        authorize(actor, UserRole::Guest)?;
        request.validate()?;
        let category: DisputeCategory = request
            .category
            .parse()
            .map_err(|e: ParseEnumError| ServiceError::ValidationFailed(e.to_string()))?;

        let booking = self
            .store
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("booking {}", booking_id)))?;

        if actor.id != booking.guest_id {
            let listing = self
                .store
                .get_listing(booking.listing_id)
                .await?
                .ok_or_else(|| ServiceError::NotFound(format!("listing {}", booking.listing_id)))?;
            if actor.id != listing.host_id {
                return Err(ServiceError::Forbidden(
                    "only the guest or host of this booking can open a dispute".to_string(),
                ));
            }
        }

        if self.store.get_dispute_for_booking(booking.id).await?.is_some() {
            return Err(ServiceError::Conflict(
                "a dispute is already open for this booking".to_string(),
            ));
        }

        let now = Utc::now();
        let dispute = DisputeRecord {
            id: Uuid::new_v4(),
            booking_id: booking.id,
            opened_by_id: actor.id,
            category,
            description: request.description,
            status: DisputeStatus::Open,
            resolution: None,
            resolved_by_id: None,
            created_at: now,
            updated_at: now,
            resolved_at: None,
        };
        self.store.insert_dispute(&dispute).await?;

        info!("⚖️  Dispute {} ({}) opened on booking {}", dispute.id, category, booking.id);
        Ok(dispute)
    }

    pub async fn resolve(
        &self,
        actor: &Actor,
        dispute_id: Uuid,
        request: ResolveDisputeRequest,
    ) -> Result<DisputeRecord, ServiceError> {
        authorize(actor, UserRole::Admin)?;
        request.validate()?;

        let status: DisputeStatus = request
            .status
            .parse()
            .map_err(|e: ParseEnumError| ServiceError::ValidationFailed(e.to_string()))?;
        if status == DisputeStatus::Open {
            return Err(ServiceError::ValidationFailed(
                "status must be RESOLVED or DISMISSED".to_string(),
            ));
        }

        if self.store.get_dispute(dispute_id).await?.is_none() {
            return Err(ServiceError::NotFound(format!("dispute {}", dispute_id)));
        }

        let dispute = self
            .store
            .resolve_dispute(dispute_id, status, &request.resolution, actor.id)
            .await?
            .ok_or_else(|| ServiceError::Conflict("dispute is already closed".to_string()))?;

        info!("Dispute {} closed as {} by {}", dispute.id, status, actor.id);
        Ok(dispute)
    }

    pub async fn list(&self, actor: &Actor, status: Option<&str>) -> Result<Vec<DisputeRecord>, ServiceError> {
        authorize_read(actor, UserRole::Admin)?;
        let status = status
            .map(|s| {
                s.parse::<DisputeStatus>()
                    .map_err(|e| ServiceError::ValidationFailed(e.to_string()))
            })
            .transpose()?;
        Ok(self.store.list_disputes(status).await?)
    }
}
