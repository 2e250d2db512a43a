//! # Account Service
//!
//! Registration, login and session tokens.
//!
//! Passwords are hashed with bcrypt on a blocking thread. Sessions are
//! stateless HS256 JWTs whose `sub` is the user id; the user row is loaded
//! again on every request, so suspension and role changes apply at once.

use std::sync::Arc;

use bcrypt::{hash, verify};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::config::AppConfig;
use crate::db::{MarketplaceStore, UserRecord, UserRole};
use crate::models::{LoginRequest, RegisterRequest};

use super::access::Actor;
use super::ServiceError;

#[cfg(not(test))]
const BCRYPT_COST: u32 = bcrypt::DEFAULT_COST;
#[cfg(test)]
const BCRYPT_COST: u32 = 4;

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: String,
    pub iat: usize,
    pub exp: usize,
}

/// A user together with a freshly issued session token.
#[derive(Debug, Clone)]
pub struct Session {
    pub user: UserRecord,
    pub token: String,
}

#[derive(Clone)]
pub struct AccountService {
    store: Arc<dyn MarketplaceStore>,
    config: AppConfig,
}

impl AccountService {
    pub fn new(store: Arc<dyn MarketplaceStore>, config: AppConfig) -> Self {
        Self { store, config }
    }

    pub async fn register(&self, request: RegisterRequest) -> Result<Session, ServiceError> {
        request.validate()?;
        let email = normalize_email(&request.email);

        if self.store.get_user_by_email(&email).await?.is_some() {
            return Err(ServiceError::Conflict("email is already registered".to_string()));
        }

        let now = Utc::now();
        let user = UserRecord {
            id: Uuid::new_v4(),
            email,
            name: request.name.trim().to_string(),
            phone: request.phone,
            password_hash: hash_password(request.password).await?,
            role: UserRole::Guest,
            suspended: false,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_user(&user).await.map_err(|e| match ServiceError::from(e) {
            ServiceError::Conflict(_) => {
                ServiceError::Conflict("email is already registered".to_string())
            }
            other => other,
        })?;

        info!("👤 Registered user {} ({})", user.id, user.email);
        let token = self.issue_token(user.id)?;
        Ok(Session { user, token })
    }

    /// Unknown email and wrong password are indistinguishable to the caller.
    pub async fn login(&self, request: LoginRequest) -> Result<Session, ServiceError> {
        request.validate()?;
        let email = normalize_email(&request.email);

        let user = self
            .store
            .get_user_by_email(&email)
            .await?
            .ok_or(ServiceError::Unauthorized)?;

        if !verify_password(request.password, user.password_hash.clone()).await? {
            warn!("Failed login for {}", email);
            return Err(ServiceError::Unauthorized);
        }

        let token = self.issue_token(user.id)?;
        Ok(Session { user, token })
    }

    pub async fn me(&self, actor: &Actor) -> Result<UserRecord, ServiceError> {
        self.store
            .get_user(actor.id)
            .await?
            .ok_or(ServiceError::Unauthorized)
    }

    /// Create or promote the bootstrap administrator.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<UserRecord, ServiceError> {
        let email = normalize_email(email);

        if let Some(existing) = self.store.get_user_by_email(&email).await? {
            if existing.role == UserRole::Admin {
                return Ok(existing);
            }
            let promoted = self.store.set_user_role(existing.id, UserRole::Admin).await?;
            info!("🔑 Promoted {} to admin", email);
            return Ok(promoted);
        }

        let now = Utc::now();
        let admin = UserRecord {
            id: Uuid::new_v4(),
            email: email.clone(),
            name: "Administrator".to_string(),
            phone: None,
            password_hash: hash_password(password.to_string()).await?,
            role: UserRole::Admin,
            suspended: false,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_user(&admin).await?;
        info!("🔑 Created admin account {}", email);
        Ok(admin)
    }

    pub fn issue_token(&self, user_id: Uuid) -> Result<String, ServiceError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user_id.to_string(),
            iat: now.timestamp() as usize,
            exp: (now + Duration::hours(self.config.jwt_ttl_hours)).timestamp() as usize,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.config.jwt_secret.as_bytes()),
        )
        .map_err(|e| ServiceError::Internal(format!("token signing failed: {}", e)))
    }

    /// Validate signature and expiry, returning the user id.
    pub fn verify_token(&self, token: &str) -> Result<Uuid, ServiceError> {
        let data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.config.jwt_secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|_| ServiceError::Unauthorized)?;

        Uuid::parse_str(&data.claims.sub).map_err(|_| ServiceError::Unauthorized)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

async fn hash_password(password: String) -> Result<String, ServiceError> {
    tokio::task::spawn_blocking(move || hash(password, BCRYPT_COST))
        .await
        .map_err(|e| ServiceError::Internal(e.to_string()))?
        .map_err(|e| ServiceError::Internal(format!("password hashing failed: {}", e)))
}

async fn verify_password(password: String, password_hash: String) -> Result<bool, ServiceError> {
    tokio::task::spawn_blocking(move || verify(password, &password_hash))
        .await
        .map_err(|e| ServiceError::Internal(e.to_string()))?
        .map_err(|e| ServiceError::Internal(format!("password check failed: {}", e)))
}
