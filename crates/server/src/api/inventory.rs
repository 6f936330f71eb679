//! Inventory administration handlers: seed, assign, edit, ban, reset.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use turnstile_core::audit::AuditEvent;
use turnstile_core::ticket::{AdminEdit, SeedTicket, Ticket, TicketFilter, TicketStatus};
use turnstile_core::Operation;

use crate::state::AppState;

use super::error::ApiError;
use super::middleware::{require, Actor};

/// Maximum allowed limit for inventory queries
const MAX_LIMIT: i64 = 1000;

/// Default limit for inventory queries
const DEFAULT_LIMIT: i64 = 100;

// ============================================================================
// Request/Response Types
// ============================================================================

/// Request body for seeding tickets
#[derive(Debug, Deserialize)]
pub struct SeedBody {
    pub tickets: Vec<SeedTicket>,
}

/// Response for the seed endpoint
#[derive(Debug, Serialize)]
pub struct SeedResponse {
    pub inserted: u64,
    pub skipped: u64,
}

/// Request body for batch assignment by serial range
#[derive(Debug, Deserialize)]
pub struct AssignBody {
    pub agent_id: String,
    pub start_serial: String,
    pub end_serial: String,
}

/// Response for the assign endpoint
#[derive(Debug, Serialize)]
pub struct AssignResponse {
    pub assigned: u64,
}

/// Query parameters for listing inventory
#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub status: Option<TicketStatus>,
    pub agent_id: Option<String>,
    /// Substring match over serial, code and customer name
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Response for listing inventory
#[derive(Debug, Serialize)]
pub struct ListResponse {
    pub tickets: Vec<Ticket>,
    pub total: i64,
    pub limit: i64,
    pub offset: i64,
}

/// Request body for a direct admin edit. Absent fields are untouched;
/// `agent_id: ""` clears the assignment.
#[derive(Debug, Deserialize, Default)]
pub struct EditBody {
    pub serial_number: Option<String>,
    pub code: Option<String>,
    pub status: Option<TicketStatus>,
    pub agent_id: Option<String>,
    pub payment_settled: Option<bool>,
}

impl EditBody {
    fn changed_fields(&self) -> Vec<String> {
        let mut fields = Vec::new();
        if self.serial_number.is_some() {
            fields.push("serial_number".to_string());
        }
        if self.code.is_some() {
            fields.push("code".to_string());
        }
        if self.status.is_some() {
            fields.push("status".to_string());
        }
        if self.agent_id.is_some() {
            fields.push("agent_id".to_string());
        }
        if self.payment_settled.is_some() {
            fields.push("payment_settled".to_string());
        }
        fields
    }
}

impl From<EditBody> for AdminEdit {
    fn from(body: EditBody) -> Self {
        Self {
            serial_number: body.serial_number,
            code: body.code,
            status: body.status,
            agent_id: body.agent_id,
            payment_settled: body.payment_settled,
        }
    }
}

/// Response for the reset endpoint
#[derive(Debug, Serialize)]
pub struct ResetResponse {
    pub reset: u64,
}

// ============================================================================
// Handlers
// ============================================================================

/// Seed a batch of manufactured tickets into stock
pub async fn seed(
    State(state): State<Arc<AppState>>,
    Actor(identity): Actor,
    Json(body): Json<SeedBody>,
) -> Result<(StatusCode, Json<SeedResponse>), ApiError> {
    require(&identity, Operation::ManageInventory)?;

    if body.tickets.is_empty() {
        return Err(ApiError::bad_request("Empty seed batch"));
    }

    let total = body.tickets.len() as u64;
    let inserted = state.ticket_store().seed(&body.tickets)?;
    let skipped = total - inserted;

    state.audit().try_emit(AuditEvent::TicketsSeeded {
        actor_id: identity.user_id.clone(),
        inserted,
        skipped,
    });

    Ok((StatusCode::CREATED, Json(SeedResponse { inserted, skipped })))
}

/// Assign a serial range of in-stock tickets to an agent
pub async fn assign(
    State(state): State<Arc<AppState>>,
    Actor(identity): Actor,
    Json(body): Json<AssignBody>,
) -> Result<Json<AssignResponse>, ApiError> {
    require(&identity, Operation::ManageInventory)?;

    let agent = state
        .user_store()
        .get(&body.agent_id)?
        .ok_or_else(|| ApiError::not_found(format!("Agent not found: {}", body.agent_id)))?;

    let assigned =
        state
            .ticket_store()
            .assign_range(&body.start_serial, &body.end_serial, &agent.id)?;

    state.audit().try_emit(AuditEvent::BatchAssigned {
        actor_id: identity.user_id.clone(),
        agent_id: agent.id,
        start_serial: body.start_serial,
        end_serial: body.end_serial,
        count: assigned,
    });

    Ok(Json(AssignResponse { assigned }))
}

/// List inventory with optional filters
pub async fn list(
    State(state): State<Arc<AppState>>,
    Actor(identity): Actor,
    Query(params): Query<ListParams>,
) -> Result<Json<ListResponse>, ApiError> {
    require(&identity, Operation::ManageInventory)?;

    let limit = params.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);
    let offset = params.offset.unwrap_or(0).max(0);

    let mut filter = TicketFilter::new().with_limit(limit).with_offset(offset);
    if let Some(status) = params.status {
        filter = filter.with_status(status);
    }
    if let Some(ref agent_id) = params.agent_id {
        filter = filter.with_assigned_to(agent_id);
    }
    if let Some(ref search) = params.search {
        filter = filter.with_search(search);
    }

    let tickets = state.ticket_store().list(&filter)?;
    let total = state.ticket_store().count(&filter)?;

    Ok(Json(ListResponse {
        tickets,
        total,
        limit,
        offset,
    }))
}

/// Get a single ticket by ID
pub async fn get(
    State(state): State<Arc<AppState>>,
    Actor(identity): Actor,
    Path(id): Path<String>,
) -> Result<Json<Ticket>, ApiError> {
    require(&identity, Operation::ManageInventory)?;

    let ticket = state
        .ticket_store()
        .get(&id)?
        .ok_or_else(|| ApiError::not_found(format!("Ticket not found: {}", id)))?;
    Ok(Json(ticket))
}

/// Directly edit a ticket's fields
pub async fn edit(
    State(state): State<Arc<AppState>>,
    Actor(identity): Actor,
    Path(id): Path<String>,
    Json(body): Json<EditBody>,
) -> Result<Json<Ticket>, ApiError> {
    require(&identity, Operation::ManageInventory)?;

    let changed_fields = body.changed_fields();
    if changed_fields.is_empty() {
        return Err(ApiError::bad_request("No fields to edit"));
    }

    let ticket = state.ticket_store().admin_edit(&id, &body.into())?;

    state.audit().try_emit(AuditEvent::TicketEdited {
        ticket_id: ticket.id.clone(),
        actor_id: identity.user_id.clone(),
        changed_fields,
    });

    Ok(Json(ticket))
}

/// Ban a ticket: move it to the invalid state so the gate refuses it
pub async fn ban(
    State(state): State<Arc<AppState>>,
    Actor(identity): Actor,
    Path(id): Path<String>,
) -> Result<Json<Ticket>, ApiError> {
    require(&identity, Operation::ManageInventory)?;

    let previous = state
        .ticket_store()
        .get(&id)?
        .ok_or_else(|| ApiError::not_found(format!("Ticket not found: {}", id)))?;
    let previous_status = previous.status.as_str().to_string();

    let ticket = state.ticket_store().ban(&id)?;

    state.audit().try_emit(AuditEvent::TicketBanned {
        ticket_id: ticket.id.clone(),
        actor_id: identity.user_id.clone(),
        previous_status,
    });

    Ok(Json(ticket))
}

/// Reset the entire inventory to factory state
pub async fn reset(
    State(state): State<Arc<AppState>>,
    Actor(identity): Actor,
) -> Result<Json<ResetResponse>, ApiError> {
    require(&identity, Operation::ManageInventory)?;

    let count = state.ticket_store().reset_all()?;

    state.audit().try_emit(AuditEvent::InventoryReset {
        actor_id: identity.user_id.clone(),
        count,
    });

    Ok(Json(ResetResponse { reset: count }))
}
