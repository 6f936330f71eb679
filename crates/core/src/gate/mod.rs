//! Gate decision engine.
//!
//! Turns a scanned QR payload into a grant-or-deny decision. VERIFY mode is
//! a dry run; ENTRY mode additionally consumes the ticket through the
//! store's compare-and-set claim, so two gates scanning the same code admit
//! exactly one person.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::audit::{AuditEvent, AuditHandle};
use crate::ticket::{Ticket, TicketError, TicketStatus, TicketStore};

/// How a scan should be treated.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ScanMode {
    /// Grant and consume the ticket.
    Entry,
    /// Report what would happen without touching the ticket.
    Verify,
}

impl ScanMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanMode::Entry => "entry",
            ScanMode::Verify => "verify",
        }
    }
}

/// Decision for one scan, in priority order: the first matching outcome
/// from the top wins.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ScanOutcome {
    /// Code matches no ticket.
    NotFound,
    /// Ticket was administratively invalidated.
    Banned,
    /// Ticket already passed the gate.
    Used,
    /// Ticket never left stock; nobody should be holding it.
    NotIssued,
    /// Admitted, but the sale was never recorded: collect payment.
    Warning,
    /// Admitted cleanly.
    Valid,
}

impl ScanOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanOutcome::NotFound => "NOT_FOUND",
            ScanOutcome::Banned => "BANNED",
            ScanOutcome::Used => "USED",
            ScanOutcome::NotIssued => "NOT_ISSUED",
            ScanOutcome::Warning => "WARNING",
            ScanOutcome::Valid => "VALID",
        }
    }

    /// Whether the holder is admitted.
    pub fn is_allowed(&self) -> bool {
        matches!(self, ScanOutcome::Warning | ScanOutcome::Valid)
    }
}

/// Result of a scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanResult {
    pub outcome: ScanOutcome,
    pub allowed: bool,
    pub mode: ScanMode,
    /// Operator-facing description of the decision.
    pub message: String,
    /// The matched ticket, post-claim for granted ENTRY scans.
    pub ticket: Option<Ticket>,
}

impl ScanResult {
    fn new(outcome: ScanOutcome, mode: ScanMode, ticket: Option<Ticket>) -> Self {
        Self {
            outcome,
            allowed: outcome.is_allowed(),
            mode,
            message: outcome_message(outcome, ticket.as_ref()),
            ticket,
        }
    }
}

/// Operator-facing message for an outcome. USED includes the original scan
/// time so the door can tell the holder when the ticket went through.
fn outcome_message(outcome: ScanOutcome, ticket: Option<&Ticket>) -> String {
    match outcome {
        ScanOutcome::NotFound => "Code matches no ticket".to_string(),
        ScanOutcome::Banned => "Ticket has been invalidated".to_string(),
        ScanOutcome::Used => match ticket.and_then(|t| t.scanned_at) {
            Some(at) => format!("Ticket already used at {}", at.to_rfc3339()),
            None => "Ticket already used".to_string(),
        },
        ScanOutcome::NotIssued => "Ticket was never issued".to_string(),
        ScanOutcome::Warning => "Admitted, but no sale recorded: collect payment".to_string(),
        ScanOutcome::Valid => "Admitted".to_string(),
    }
}

/// Extract the scan code from a raw QR payload.
///
/// Scanners hand us either the bare code or the full magic link; a link is
/// recognized by the configured path marker and the code is whatever
/// follows its last occurrence, trimmed of a trailing slash.
pub fn extract_code<'a>(payload: &'a str, link_marker: &str) -> &'a str {
    let payload = payload.trim();
    match payload.rfind(link_marker) {
        Some(pos) => payload[pos + link_marker.len()..].trim_end_matches('/'),
        None => payload,
    }
}

/// Pure outcome table. The claim step may still downgrade an allowed
/// outcome when a concurrent scan wins the race.
pub fn evaluate(ticket: Option<&Ticket>) -> ScanOutcome {
    match ticket {
        None => ScanOutcome::NotFound,
        Some(t) => match t.status {
            TicketStatus::Invalid => ScanOutcome::Banned,
            TicketStatus::Scanned => ScanOutcome::Used,
            // A scan mark counts as used even when the status drifted out
            // of SCANNED; the two are written together but guarded
            // separately.
            _ if t.scanned_at.is_some() => ScanOutcome::Used,
            TicketStatus::InStock => ScanOutcome::NotIssued,
            TicketStatus::Assigned => ScanOutcome::Warning,
            TicketStatus::Sold => ScanOutcome::Valid,
        },
    }
}

/// The gate engine: code extraction, outcome evaluation and the ENTRY
/// claim, with every decision audited.
pub struct GateEngine {
    tickets: Arc<dyn TicketStore>,
    audit: AuditHandle,
    link_marker: String,
}

impl GateEngine {
    pub fn new(tickets: Arc<dyn TicketStore>, audit: AuditHandle, link_marker: String) -> Self {
        Self {
            tickets,
            audit,
            link_marker,
        }
    }

    /// Process one scan.
    pub fn scan(
        &self,
        payload: &str,
        mode: ScanMode,
        operator_id: &str,
    ) -> Result<ScanResult, TicketError> {
        let code = extract_code(payload, &self.link_marker);
        if code.is_empty() {
            return Err(TicketError::Validation("Empty scan payload".to_string()));
        }

        let ticket = self.tickets.find_by_code(code)?;
        let outcome = evaluate(ticket.as_ref());

        let result = match (mode, outcome.is_allowed()) {
            (ScanMode::Verify, _) | (ScanMode::Entry, false) => {
                ScanResult::new(outcome, mode, ticket)
            }
            (ScanMode::Entry, true) => {
                // evaluate() saw a grantable status; claim it with that same
                // status as the guard. Zero rows means someone else got
                // there first.
                let observed = ticket.as_ref().map(|t| t.status).unwrap_or(TicketStatus::Sold);
                let id = ticket.as_ref().map(|t| t.id.clone()).unwrap_or_default();
                match self.tickets.claim_entry(&id, observed)? {
                    Some(claimed) => ScanResult::new(outcome, mode, Some(claimed)),
                    None => {
                        let after = self.tickets.get(&id)?;
                        ScanResult::new(evaluate(after.as_ref()), mode, after)
                    }
                }
            }
        };

        self.audit_scan(code, &result, operator_id);
        Ok(result)
    }

    fn audit_scan(&self, code: &str, result: &ScanResult, operator_id: &str) {
        // VERIFY scans are read-only checks and not audited.
        if result.mode != ScanMode::Entry {
            return;
        }

        let event = if result.allowed {
            AuditEvent::GateEntry {
                ticket_id: result
                    .ticket
                    .as_ref()
                    .map(|t| t.id.clone())
                    .unwrap_or_default(),
                code: code.to_string(),
                mode: result.mode.as_str().to_string(),
                actor_id: operator_id.to_string(),
                warning: result.outcome == ScanOutcome::Warning,
            }
        } else {
            AuditEvent::GateDenied {
                code: code.to_string(),
                outcome: result.outcome.as_str().to_string(),
                mode: result.mode.as_str().to_string(),
                actor_id: operator_id.to_string(),
                ticket_id: result.ticket.as_ref().map(|t| t.id.clone()),
            }
        };

        self.audit.try_emit(event);
    }
}
