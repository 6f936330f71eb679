//! User account handlers.

use axum::{
    extract::State,
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use turnstile_core::users::{NewUser, User};
use turnstile_core::{Operation, Role};

use crate::state::AppState;

use super::error::ApiError;
use super::middleware::{require, Actor};

/// Query parameters for listing users
#[derive(Debug, Deserialize)]
pub struct ListUsersParams {
    pub role: Option<Role>,
}

/// Create a user account
pub async fn create(
    State(state): State<Arc<AppState>>,
    Actor(identity): Actor,
    Json(body): Json<NewUser>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    require(&identity, Operation::ManageUsers)?;

    let user = state.user_store().create(body)?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// List user accounts, optionally filtered by role
pub async fn list(
    State(state): State<Arc<AppState>>,
    Actor(identity): Actor,
    axum::extract::Query(params): axum::extract::Query<ListUsersParams>,
) -> Result<Json<Vec<User>>, ApiError> {
    require(&identity, Operation::ManageUsers)?;

    let users = match params.role {
        Some(role) => state.user_store().list_by_role(role)?,
        None => state.user_store().list()?,
    };
    Ok(Json(users))
}
