//! # Access Control
//!
//! Every mutating operation starts with [`authorize`]: the caller must not
//! be suspended and must hold at least the required role. Ownership rules
//! ("only the listing's host", "only the booking's guest") are separate
//! checks applied afterwards with [`ensure_owner`].
//!
//! ```text
//! GUEST (1)  <  HOST (2)  <  ADMIN (3)
//! has_role(actual, required) = level(actual) >= level(required)
//! ```

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::db::{MarketplaceStore, UserRecord, UserRole};

use super::ServiceError;

/// The authenticated caller, loaded fresh from the store per request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: UserRole,
    pub suspended: bool,
}

impl From<&UserRecord> for Actor {
    fn from(user: &UserRecord) -> Self {
        Self {
            id: user.id,
            role: user.role,
            suspended: user.suspended,
        }
    }
}

pub fn has_role(actual: UserRole, required: UserRole) -> bool {
    actual.level() >= required.level()
}

/// Gate for mutating operations.
pub fn authorize(actor: &Actor, required: UserRole) -> Result<(), ServiceError> {
    if actor.suspended {
        debug!("Rejected write from suspended user {}", actor.id);
        return Err(ServiceError::Forbidden("account is suspended".to_string()));
    }
    if !has_role(actor.role, required) {
        return Err(ServiceError::Forbidden(format!(
            "requires {} role",
            required.as_str().to_lowercase()
        )));
    }
    Ok(())
}

/// Read-side gate: role only, suspension does not matter.
pub fn authorize_read(actor: &Actor, required: UserRole) -> Result<(), ServiceError> {
    if has_role(actor.role, required) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(format!(
            "requires {} role",
            required.as_str().to_lowercase()
        )))
    }
}

pub fn ensure_owner(actor: &Actor, owner_id: Uuid, what: &str) -> Result<(), ServiceError> {
    if actor.id == owner_id {
        Ok(())
    } else {
        Err(ServiceError::Forbidden(format!("not the owner of this {}", what)))
    }
}

/// Resolves session user ids into [`Actor`]s.
#[derive(Clone)]
pub struct AccessControl {
    store: Arc<dyn MarketplaceStore>,
}

impl AccessControl {
    pub fn new(store: Arc<dyn MarketplaceStore>) -> Self {
        Self { store }
    }

    /// Load the caller. A token for a user that no longer exists is
    /// `Unauthorized`.
    pub async fn resolve(&self, user_id: Uuid) -> Result<Actor, ServiceError> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or(ServiceError::Unauthorized)?;
        Ok(Actor::from(&user))
    }
}
