//! # Request Authentication
//!
//! Extractors that turn an `Authorization: Bearer <jwt>` header into the
//! caller's [`Actor`].
//!
//! ```text
//! Bearer token ──► verify signature + expiry ──► user id
//!                                                  │
//!                         load user from the store ▼
//!                                        Actor { id, role, suspended }
//! ```
//!
//! The user is loaded on every request, so a suspension or role change
//! takes effect immediately without revoking tokens.

use std::sync::Arc;

use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::{web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;

use crate::services::{Actor, ServiceError};
use crate::AppState;

/// The authenticated caller. Rejects the request with 401 when the token
/// is missing, invalid or belongs to a deleted user.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub Actor);

/// The caller if a valid token was sent, otherwise `None`.
#[derive(Debug, Clone, Copy)]
pub struct MaybeAuthenticated(pub Option<Actor>);

fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

async fn resolve(state: Option<web::Data<Arc<AppState>>>, token: Option<String>) -> Result<Actor, ServiceError> {
    let state = state.ok_or_else(|| ServiceError::Internal("application state missing".to_string()))?;
    let token = token.ok_or(ServiceError::Unauthorized)?;
    let user_id = state.accounts.verify_token(&token)?;
    state.access.resolve(user_id).await
}

impl FromRequest for AuthenticatedUser {
    type Error = ServiceError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<Arc<AppState>>>().cloned();
        let token = bearer_token(req);
        Box::pin(async move { resolve(state, token).await.map(AuthenticatedUser) })
    }
}

impl FromRequest for MaybeAuthenticated {
    type Error = ServiceError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<Arc<AppState>>>().cloned();
        let token = bearer_token(req);
        Box::pin(async move {
            if token.is_none() {
                return Ok(MaybeAuthenticated(None));
            }
            match resolve(state, token).await {
                Ok(actor) => Ok(MaybeAuthenticated(Some(actor))),
                Err(ServiceError::Unauthorized) => Ok(MaybeAuthenticated(None)),
                Err(e) => Err(e),
            }
        })
    }
}
