//! User account types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::Role;

/// A staff account: admin, selling agent, treasurer or gate guard.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    /// Bearer token used by the user_token auth method. Never serialized
    /// into API responses.
    #[serde(skip_serializing)]
    pub token: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

/// Request to create a user account.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub token: String,
    pub role: Role,
}
