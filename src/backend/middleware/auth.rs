/**
 * Authentication Middleware
 *
 * `auth_middleware` verifies the bearer token and attaches the caller's
 * `Identity` to the request extensions. Handlers read it back with the
 * `AuthUser` extractor and then apply the access guards below.
 *
 * The token comes from `Authorization: Bearer <token>` or, for WebSocket
 * clients that cannot set headers, a `token` query parameter.
 */

use axum::{
    extract::{FromRequestParts, Query, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use std::time::Instant;
use uuid::Uuid;

use crate::backend::auth::sessions::verify_token;
use crate::backend::error::BackendError;
use crate::backend::server::state::AppState;
use crate::backend::store::{BotStore, MemberStore};
use crate::shared::Identity;

#[derive(Debug, Deserialize)]
struct TokenQuery {
    token: Option<String>,
}

fn bearer_token(request: &Request) -> Option<String> {
    let from_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(|t| t.trim().to_string());
    if from_header.is_some() {
        return from_header;
    }

    Query::<TokenQuery>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(q)| q.token)
        .filter(|t| !t.is_empty())
}

/// Authentication middleware
///
/// Returns 401 when the token is missing, invalid, expired or carries
/// incomplete claims.
pub async fn auth_middleware(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, BackendError> {
    let token = bearer_token(&request).ok_or_else(|| {
        tracing::warn!("[Auth] Missing bearer token");
        BackendError::unauthorized("missing token")
    })?;

    let claims = verify_token(&token, &app_state.config.jwt_secret).map_err(|e| {
        tracing::warn!("[Auth] Invalid token: {:?}", e);
        BackendError::unauthorized("invalid token")
    })?;

    let identity = Identity::try_from(&claims).map_err(|e| {
        tracing::warn!("[Auth] Incomplete claims: {}", e);
        BackendError::unauthorized("invalid token")
    })?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Record bot activity, at most once per interval per bot
///
/// Runs after `auth_middleware`. The write happens in the background and
/// never delays or fails the request.
pub async fn track_last_seen(State(app_state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(Identity::Bot {
        bot_id, bot_space_id, ..
    }) = request.extensions().get::<Identity>().copied()
    {
        if app_state.last_seen.should_record(bot_space_id, bot_id, Instant::now()) {
            let bots = app_state.stores.bots.clone();
            tokio::spawn(async move {
                if let Err(e) = bots.update_last_seen(bot_id).await {
                    tracing::warn!("[Auth] Failed to update last seen for bot {}: {}", bot_id, e);
                }
            });
        }
    }
    next.run(request).await
}

/// Axum extractor for the authenticated caller
#[derive(Clone, Copy, Debug)]
pub struct AuthUser(pub Identity);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = BackendError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .copied()
            .map(AuthUser)
            .ok_or_else(|| {
                tracing::warn!("[Auth] Identity not found in request extensions");
                BackendError::unauthorized("not authenticated")
            })
    }
}

/// Allow bots of this space and human members of it
pub async fn require_space_access(
    identity: &Identity,
    bot_space_id: Uuid,
    members: &dyn MemberStore,
) -> Result<(), BackendError> {
    match *identity {
        Identity::Bot {
            bot_space_id: own, ..
        } if own == bot_space_id => Ok(()),
        Identity::Bot { .. } => Err(BackendError::forbidden("access denied")),
        Identity::User { user_id } => {
            if members.is_member(bot_space_id, user_id).await? {
                Ok(())
            } else {
                Err(BackendError::forbidden("access denied"))
            }
        }
    }
}

/// Allow only a manager bot of this space; returns its bot id
pub fn require_manager_bot(identity: &Identity, bot_space_id: Uuid) -> Result<Uuid, BackendError> {
    match *identity {
        Identity::Bot {
            bot_id,
            bot_space_id: own,
            is_manager: true,
        } if own == bot_space_id => Ok(bot_id),
        _ => Err(BackendError::forbidden("manager bot access required")),
    }
}

/// Allow only a human owner of this space; returns their user id
pub async fn require_owner(
    identity: &Identity,
    bot_space_id: Uuid,
    members: &dyn MemberStore,
) -> Result<Uuid, BackendError> {
    match *identity {
        Identity::Bot { .. } => Err(BackendError::forbidden("bots cannot perform this action")),
        Identity::User { user_id } => {
            if members.is_owner(bot_space_id, user_id).await? {
                Ok(user_id)
            } else {
                Err(BackendError::forbidden("only the owner can perform this action"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::store::MemoryStore;
    use crate::shared::User;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn test_bot_limited_to_own_space() {
        let store = MemoryStore::new();
        let space = Uuid::new_v4();
        let bot = Identity::bot(space, Uuid::new_v4(), false);

        assert!(require_space_access(&bot, space, &store).await.is_ok());
        let err = require_space_access(&bot, Uuid::new_v4(), &store).await.unwrap_err();
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_user_needs_membership() {
        let store = MemoryStore::new();
        let space = Uuid::new_v4();
        let user = User {
            id: Uuid::new_v4(),
            email: "ops@example.com".to_string(),
            display_name: None,
        };
        let identity = Identity::user(user.id);

        assert!(require_space_access(&identity, space, &store).await.is_err());
        store.add_member(space, user).await;
        assert!(require_space_access(&identity, space, &store).await.is_ok());
    }

    #[tokio::test]
    async fn test_owner_guard() {
        let store = MemoryStore::new();
        let space = Uuid::new_v4();
        let user = |email: &str| User {
            id: Uuid::new_v4(),
            email: email.to_string(),
            display_name: None,
        };
        let (owner, member) = (user("owner@example.com"), user("member@example.com"));
        store.add_owner(space, owner.clone()).await;
        store.add_member(space, member.clone()).await;

        let ok = require_owner(&Identity::user(owner.id), space, &store).await.unwrap();
        assert_eq!(ok, owner.id);

        let err = require_owner(&Identity::user(member.id), space, &store).await.unwrap_err();
        assert_eq!(err.message(), "only the owner can perform this action");
        let manager = Identity::bot(space, Uuid::new_v4(), true);
        let err = require_owner(&manager, space, &store).await.unwrap_err();
        assert_eq!(err.message(), "bots cannot perform this action");
    }

    #[test]
    fn test_manager_guard() {
        let space = Uuid::new_v4();
        let manager = Identity::bot(space, Uuid::new_v4(), true);
        assert_eq!(require_manager_bot(&manager, space).ok(), manager.bot_id());

        assert!(require_manager_bot(&manager, Uuid::new_v4()).is_err());
        assert!(require_manager_bot(&Identity::bot(space, Uuid::new_v4(), false), space).is_err());
        assert!(require_manager_bot(&Identity::user(Uuid::new_v4()), space).is_err());
    }

    #[test]
    fn test_token_from_header_or_query() {
        let request = axum::http::Request::builder()
            .uri("/api/v1/bot-spaces/x/messages")
            .header(AUTHORIZATION, "Bearer abc")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&request).as_deref(), Some("abc"));

        let request = axum::http::Request::builder()
            .uri("/api/v1/bot-spaces/x/messages/ws?token=xyz")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&request).as_deref(), Some("xyz"));

        let request = axum::http::Request::builder()
            .uri("/api/v1/bot-spaces/x/messages")
            .body(axum::body::Body::empty())
            .unwrap();
        assert_eq!(bearer_token(&request), None);
    }
}
