//! Agent-facing handlers: sell, transfer, wallet.
//!
//! Agents only ever act on their own holdings; the acting agent is always
//! the authenticated identity, never a request field.

use axum::{
    extract::State,
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use turnstile_core::audit::AuditEvent;
use turnstile_core::ledger::AgentWallet;
use turnstile_core::ticket::{SaleDetails, Ticket};
use turnstile_core::{Operation, Role};

use crate::state::AppState;

use super::error::ApiError;
use super::middleware::{require, Actor};

/// Request body for recording a sale
#[derive(Debug, Deserialize)]
pub struct SellBody {
    pub ticket_id: String,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
}

/// Request body for transferring tickets to another agent
#[derive(Debug, Deserialize)]
pub struct TransferBody {
    pub ticket_ids: Vec<String>,
    pub to_agent_id: String,
}

/// Response for the transfer endpoint
#[derive(Debug, Serialize)]
pub struct TransferResponse {
    pub transferred: u64,
}

/// Record a cash sale of a held ticket
pub async fn sell(
    State(state): State<Arc<AppState>>,
    Actor(identity): Actor,
    Json(body): Json<SellBody>,
) -> Result<Json<Ticket>, ApiError> {
    require(&identity, Operation::SellTickets)?;

    let details = SaleDetails {
        customer_name: body.customer_name,
        customer_phone: body.customer_phone,
    };

    let ticket = state
        .ticket_store()
        .mark_sold(&body.ticket_id, &identity.user_id, &details)?;

    state.audit().try_emit(AuditEvent::TicketSold {
        ticket_id: ticket.id.clone(),
        agent_id: identity.user_id.clone(),
        customer_name: ticket.customer_name.clone(),
    });

    Ok(Json(ticket))
}

/// Transfer unsold tickets to another agent, all-or-nothing
pub async fn transfer(
    State(state): State<Arc<AppState>>,
    Actor(identity): Actor,
    Json(body): Json<TransferBody>,
) -> Result<Json<TransferResponse>, ApiError> {
    require(&identity, Operation::TransferTickets)?;

    if body.ticket_ids.is_empty() {
        return Err(ApiError::bad_request("Empty transfer batch"));
    }
    if body.to_agent_id == identity.user_id {
        return Err(ApiError::bad_request("Cannot transfer to yourself"));
    }

    let recipient = state
        .user_store()
        .get(&body.to_agent_id)?
        .ok_or_else(|| {
            ApiError::not_found(format!("Agent not found: {}", body.to_agent_id))
        })?;
    if recipient.role != Role::Agent {
        return Err(ApiError::bad_request(format!(
            "Recipient {} is not an agent",
            recipient.id
        )));
    }

    let transferred =
        state
            .ticket_store()
            .transfer(&body.ticket_ids, &identity.user_id, &recipient.id)?;

    state.audit().try_emit(AuditEvent::TicketsTransferred {
        from_agent: identity.user_id.clone(),
        to_agent: recipient.id,
        count: transferred,
    });

    Ok(Json(TransferResponse { transferred }))
}

/// The calling agent's wallet: held tickets plus outstanding debt
pub async fn wallet(
    State(state): State<Arc<AppState>>,
    Actor(identity): Actor,
) -> Result<Json<AgentWallet>, ApiError> {
    require(&identity, Operation::ViewOwnWallet)?;

    let wallet = state.ledger().wallet(&identity.user_id)?;
    Ok(Json(wallet))
}
