//! Treasury handlers: the per-agent ledger and cash settlement.

use axum::{
    extract::State,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;
use turnstile_core::ledger::{AgentLedgerSummary, SettlementReceipt};
use turnstile_core::Operation;

use crate::state::AppState;

use super::error::ApiError;
use super::middleware::{require, Actor};

/// Request body for settling an agent's debt
#[derive(Debug, Deserialize)]
pub struct SettleBody {
    pub agent_id: String,
    /// Tickets the treasurer is collecting for. The store re-filters the
    /// list to eligible rows; ineligible ids are silently skipped.
    pub ticket_ids: Vec<String>,
    /// Cash amount the treasurer counted. Informational only; the receipt
    /// carries the recomputed amount.
    #[serde(default)]
    pub amount: Option<i64>,
}

/// Treasury overview: one ledger summary per agent
pub async fn agents(
    State(state): State<Arc<AppState>>,
    Actor(identity): Actor,
) -> Result<Json<Vec<AgentLedgerSummary>>, ApiError> {
    require(&identity, Operation::ViewLedger)?;

    let overview = state.ledger().overview()?;
    Ok(Json(overview))
}

/// Record a cash collection from an agent
pub async fn settle(
    State(state): State<Arc<AppState>>,
    Actor(identity): Actor,
    Json(body): Json<SettleBody>,
) -> Result<Json<SettlementReceipt>, ApiError> {
    require(&identity, Operation::SettlePayments)?;

    if body.ticket_ids.is_empty() {
        return Err(ApiError::bad_request("Empty settlement batch"));
    }

    let receipt = state
        .ledger()
        .settle(&body.agent_id, &body.ticket_ids, &identity.user_id)?;
    Ok(Json(receipt))
}
