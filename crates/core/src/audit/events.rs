use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Audit event types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    // System events
    ServiceStarted {
        version: String,
        config_hash: String,
    },
    ServiceStopped {
        reason: String,
    },

    // Inventory events
    TicketsSeeded {
        /// Who ran the seeding
        actor_id: String,
        /// Rows inserted
        inserted: u64,
        /// Rows skipped (duplicate codes)
        skipped: u64,
    },
    BatchAssigned {
        /// Who performed the assignment
        actor_id: String,
        /// Receiving agent
        agent_id: String,
        /// First serial of the range (inclusive)
        start_serial: String,
        /// Last serial of the range (inclusive)
        end_serial: String,
        /// Tickets actually assigned
        count: u64,
    },
    TicketEdited {
        ticket_id: String,
        /// Who performed the edit
        actor_id: String,
        /// Fields that were present in the edit request
        changed_fields: Vec<String>,
    },
    TicketBanned {
        ticket_id: String,
        /// Who banned the ticket
        actor_id: String,
        /// Status before the ban
        previous_status: String,
    },
    InventoryReset {
        /// Who triggered the reset
        actor_id: String,
        /// Tickets returned to stock
        count: u64,
    },

    // Sales events
    TicketSold {
        ticket_id: String,
        /// Selling agent
        agent_id: String,
        customer_name: Option<String>,
    },
    TicketsTransferred {
        /// Sending agent
        from_agent: String,
        /// Receiving agent
        to_agent: String,
        /// Tickets moved
        count: u64,
    },

    // Gate events
    GateEntry {
        ticket_id: String,
        /// Scanned code
        code: String,
        /// "entry" or "verify"
        mode: String,
        /// Gate operator
        actor_id: String,
        /// Whether the grant carried an unpaid warning
        warning: bool,
    },
    GateDenied {
        /// Scanned code (raw payload may not match any ticket)
        code: String,
        /// Denial outcome label
        outcome: String,
        /// "entry" or "verify"
        mode: String,
        /// Gate operator
        actor_id: String,
        /// Matched ticket, if the code resolved to one
        ticket_id: Option<String>,
    },

    // Treasury events
    PaymentsSettled {
        /// Agent whose debt was collected
        agent_id: String,
        /// Treasurer who recorded the collection
        actor_id: String,
        /// Tickets settled
        count: u64,
        /// Cash amount collected
        amount: i64,
    },
}

impl AuditEvent {
    /// Returns the event type as a string for storage
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::ServiceStarted { .. } => "service_started",
            Self::ServiceStopped { .. } => "service_stopped",
            Self::TicketsSeeded { .. } => "tickets_seeded",
            Self::BatchAssigned { .. } => "batch_assigned",
            Self::TicketEdited { .. } => "ticket_edited",
            Self::TicketBanned { .. } => "ticket_banned",
            Self::InventoryReset { .. } => "inventory_reset",
            Self::TicketSold { .. } => "ticket_sold",
            Self::TicketsTransferred { .. } => "tickets_transferred",
            Self::GateEntry { .. } => "gate_entry",
            Self::GateDenied { .. } => "gate_denied",
            Self::PaymentsSettled { .. } => "payments_settled",
        }
    }

    /// Extract ticket_id if this event is about a single ticket
    pub fn ticket_id(&self) -> Option<&str> {
        match self {
            Self::TicketEdited { ticket_id, .. }
            | Self::TicketBanned { ticket_id, .. }
            | Self::TicketSold { ticket_id, .. }
            | Self::GateEntry { ticket_id, .. } => Some(ticket_id),
            Self::GateDenied { ticket_id, .. } => ticket_id.as_deref(),
            _ => None,
        }
    }

    /// Extract the acting user, if the event was triggered by one
    pub fn actor_id(&self) -> Option<&str> {
        match self {
            Self::TicketsSeeded { actor_id, .. }
            | Self::BatchAssigned { actor_id, .. }
            | Self::TicketEdited { actor_id, .. }
            | Self::TicketBanned { actor_id, .. }
            | Self::InventoryReset { actor_id, .. }
            | Self::GateEntry { actor_id, .. }
            | Self::GateDenied { actor_id, .. }
            | Self::PaymentsSettled { actor_id, .. } => Some(actor_id),
            Self::TicketSold { agent_id, .. } => Some(agent_id),
            Self::TicketsTransferred { from_agent, .. } => Some(from_agent),
            Self::ServiceStarted { .. } | Self::ServiceStopped { .. } => None,
        }
    }
}

/// A stored audit record with metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub event_type: String,
    pub ticket_id: Option<String>,
    pub actor_id: Option<String>,
    pub data: AuditEvent,
}
