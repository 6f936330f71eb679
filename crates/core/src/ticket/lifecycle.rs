//! Pure lifecycle decision logic.
//!
//! The guarded transitions themselves run as conditional updates inside the
//! store; this module holds the parts that are pure functions of a ticket
//! value: classifying why a guarded update matched nothing, and computing
//! the field-level effects of an administrative direct edit.

use chrono::{DateTime, Utc};

use super::{AdminEdit, Ticket, TicketError, TicketStatus};

/// Explain a failed sell attempt. Called after the conditional update
/// matched zero rows, with the ticket as re-read from the store.
pub fn classify_sell_failure(ticket: Option<&Ticket>, agent_id: &str, id: &str) -> TicketError {
    match ticket {
        None => TicketError::NotFound(id.to_string()),
        Some(t) if t.assigned_to.as_deref() != Some(agent_id) => TicketError::NotOwned {
            ticket_id: id.to_string(),
            agent_id: agent_id.to_string(),
        },
        Some(t) => TicketError::WrongStatus {
            ticket_id: id.to_string(),
            status: t.status.as_str().to_string(),
            operation: "sell".to_string(),
        },
    }
}

/// Compute the result of an administrative direct edit.
///
/// Side-effect rules:
/// - target `InStock`: clear the agent unless the same edit sets a new one;
///   always clear `payment_settled`; always clear `scanned_at`.
/// - target `Assigned` or `Sold`: always clear `scanned_at`, so a corrected
///   ticket cannot carry a stale "already used" mark.
/// - target `Sold`: stamp `sold_at`.
///
/// The explicit `payment_settled` override is applied before the
/// status-dependent effects, so it cannot leave an `InStock` ticket marked
/// settled.
///
/// When the edit carries no explicit status, agent and status are kept
/// consistent rather than drifting independently: setting an agent on an
/// `InStock` ticket promotes it to `Assigned`, and clearing the agent of an
/// `Assigned` ticket reverts it to `InStock`. An explicit target status
/// always wins over this derivation.
pub fn apply_admin_edit(ticket: &Ticket, edit: &AdminEdit, now: DateTime<Utc>) -> Ticket {
    let mut next = ticket.clone();

    if let Some(ref serial) = edit.serial_number {
        next.serial_number = serial.clone();
    }
    if let Some(ref code) = edit.code {
        next.code = code.clone();
    }

    let clears_agent = edit.agent_id.as_deref() == Some("");
    let sets_agent = matches!(edit.agent_id.as_deref(), Some(id) if !id.is_empty());

    match edit.agent_id.as_deref() {
        Some("") => next.assigned_to = None,
        Some(id) => next.assigned_to = Some(id.to_string()),
        None => {}
    }

    // Applied before the target-status effects: a target of IN_STOCK must
    // end unsettled even when the same edit tries to set the flag.
    if let Some(settled) = edit.payment_settled {
        next.payment_settled = settled;
    }

    match edit.status {
        Some(target) => {
            next.status = target;
            match target {
                TicketStatus::InStock => {
                    if !sets_agent {
                        next.assigned_to = None;
                    }
                    next.payment_settled = false;
                    next.scanned_at = None;
                }
                TicketStatus::Assigned => {
                    next.scanned_at = None;
                }
                TicketStatus::Sold => {
                    next.scanned_at = None;
                    next.sold_at = Some(now);
                }
                TicketStatus::Scanned | TicketStatus::Invalid => {}
            }
        }
        None => {
            if sets_agent && ticket.status == TicketStatus::InStock {
                next.status = TicketStatus::Assigned;
            } else if clears_agent && ticket.status == TicketStatus::Assigned {
                next.status = TicketStatus::InStock;
            }
        }
    }

    next.updated_at = now;
    next
}
