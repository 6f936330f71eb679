//! Per-user bearer token authentication.

use std::sync::Arc;

use async_trait::async_trait;

use super::{AuthError, AuthRequest, Authenticator, Identity};
use crate::users::UserStore;

/// Authenticator that resolves a bearer token to a user account.
///
/// Accepts the token in either:
/// - `Authorization: Bearer <token>` header
/// - `X-API-Key: <token>` header
pub struct UserTokenAuthenticator {
    users: Arc<dyn UserStore>,
}

impl UserTokenAuthenticator {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Extract the token from request headers.
    fn extract_token(&self, request: &AuthRequest) -> Option<String> {
        if let Some(auth_header) = request.headers.get("authorization") {
            if let Some(token) = auth_header.strip_prefix("Bearer ") {
                return Some(token.to_string());
            }
            // Also support lowercase
            if let Some(token) = auth_header.strip_prefix("bearer ") {
                return Some(token.to_string());
            }
        }

        if let Some(token) = request.headers.get("x-api-key") {
            return Some(token.clone());
        }

        None
    }
}

#[async_trait]
impl Authenticator for UserTokenAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        let token = self
            .extract_token(request)
            .ok_or(AuthError::NotAuthenticated)?;

        let user = self
            .users
            .find_by_token(&token)
            .map_err(|e| AuthError::ServiceUnavailable(e.to_string()))?
            .ok_or_else(|| AuthError::InvalidCredentials("Invalid token".to_string()))?;

        Ok(Identity {
            user_id: user.id,
            name: user.name,
            role: user.role,
            method: "user_token".to_string(),
        })
    }

    fn method_name(&self) -> &'static str {
        "user_token"
    }
}
