//! User storage trait.

use thiserror::Error;

use super::{NewUser, User};
use crate::auth::Role;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found: {0}")]
    NotFound(String),

    #[error("Email already registered: {0}")]
    DuplicateEmail(String),

    // Deliberately does not echo the token back.
    #[error("Token already in use")]
    DuplicateToken,

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// Trait for user account storage.
pub trait UserStore: Send + Sync {
    /// Create a user. Fails on duplicate email or token.
    fn create(&self, user: NewUser) -> Result<User, UserError>;

    /// Get a user by ID.
    fn get(&self, id: &str) -> Result<Option<User>, UserError>;

    /// Look up a user by bearer token (exact match).
    fn find_by_token(&self, token: &str) -> Result<Option<User>, UserError>;

    /// All users, ordered by name.
    fn list(&self) -> Result<Vec<User>, UserError>;

    /// All users with the given role, ordered by name.
    fn list_by_role(&self, role: Role) -> Result<Vec<User>, UserError>;
}
