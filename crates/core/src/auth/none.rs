use std::sync::Arc;

use async_trait::async_trait;

use super::{AuthError, AuthRequest, Authenticator, Identity};
use crate::users::UserStore;

/// Authenticator for development and testing: requests are anonymous
/// super-admins, unless an `x-user-id` header names an existing account to
/// act as. Must be explicitly configured - the system won't default to this.
pub struct NoneAuthenticator {
    users: Arc<dyn UserStore>,
}

impl NoneAuthenticator {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl Authenticator for NoneAuthenticator {
    async fn authenticate(&self, request: &AuthRequest) -> Result<Identity, AuthError> {
        if let Some(user_id) = request.headers.get("x-user-id") {
            let user = self
                .users
                .get(user_id)
                .map_err(|e| AuthError::ServiceUnavailable(e.to_string()))?
                .ok_or_else(|| {
                    AuthError::InvalidCredentials(format!("Unknown user: {}", user_id))
                })?;
            return Ok(Identity {
                user_id: user.id,
                name: user.name,
                role: user.role,
                method: "none".to_string(),
            });
        }

        Ok(Identity::anonymous())
    }

    fn method_name(&self) -> &'static str {
        "none"
    }
}
