//! Ticket storage trait and request types.

use thiserror::Error;

use super::{SaleDetails, SeedTicket, Ticket, TicketStatus};

/// Error type for ticket operations.
#[derive(Debug, Error)]
pub enum TicketError {
    #[error("Ticket not found: {0}")]
    NotFound(String),

    /// Ownership guard failed: the ticket exists but is held by someone else.
    #[error("Ticket {ticket_id} is not held by agent {agent_id}")]
    NotOwned { ticket_id: String, agent_id: String },

    /// Status guard failed: the operation's precondition on current status
    /// does not hold.
    #[error("Cannot {operation} ticket {ticket_id}: status is {status}")]
    WrongStatus {
        ticket_id: String,
        status: String,
        operation: String,
    },

    /// A batch operation matched nothing eligible.
    #[error("No eligible tickets")]
    NoEligibleTickets,

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// Filter for inventory queries.
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    /// Filter by exact status.
    pub status: Option<TicketStatus>,
    /// Filter by owning agent.
    pub assigned_to: Option<String>,
    /// Substring search over serial number, code and customer name.
    pub search: Option<String>,
    /// Maximum number of results.
    pub limit: i64,
    /// Offset for pagination.
    pub offset: i64,
}

impl TicketFilter {
    pub fn new() -> Self {
        Self {
            status: None,
            assigned_to: None,
            search: None,
            limit: 100,
            offset: 0,
        }
    }

    pub fn with_status(mut self, status: TicketStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_assigned_to(mut self, agent_id: impl Into<String>) -> Self {
        self.assigned_to = Some(agent_id.into());
        self
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    pub fn with_limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Administrative direct edit of a single ticket.
///
/// Every field is optional; only present fields are touched. `agent_id`
/// follows the wire convention of the admin UI: `Some("")` clears the
/// assignment, `Some(id)` sets it, `None` leaves it alone.
#[derive(Debug, Clone, Default)]
pub struct AdminEdit {
    pub serial_number: Option<String>,
    pub code: Option<String>,
    pub status: Option<TicketStatus>,
    pub agent_id: Option<String>,
    pub payment_settled: Option<bool>,
}

/// Trait for ticket storage backends.
///
/// Every guarded transition is expressed as a single conditional update so
/// that concurrent callers race on the store's row filter, not on stale
/// in-process reads.
pub trait TicketStore: Send + Sync {
    /// Bulk-insert seeded tickets in `InStock`. Rows whose code already
    /// exists are skipped. Returns the number of rows inserted.
    fn seed(&self, batch: &[SeedTicket]) -> Result<u64, TicketError>;

    /// Get a ticket by ID.
    fn get(&self, id: &str) -> Result<Option<Ticket>, TicketError>;

    /// Look up a ticket by its scan code (exact, case-sensitive).
    fn find_by_code(&self, code: &str) -> Result<Option<Ticket>, TicketError>;

    /// List tickets matching the filter, ordered by serial number.
    fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, TicketError>;

    /// Count tickets matching the filter.
    fn count(&self, filter: &TicketFilter) -> Result<i64, TicketError>;

    /// All tickets held by an agent, ordered by serial number.
    fn list_by_agent(&self, agent_id: &str) -> Result<Vec<Ticket>, TicketError>;

    /// Assign every `InStock` ticket whose serial number falls within
    /// [start, end] (inclusive, lexicographic) to the agent. Tickets in the
    /// range that are already assigned, sold or scanned are left untouched.
    /// Returns the number of tickets assigned.
    fn assign_range(
        &self,
        start_serial: &str,
        end_serial: &str,
        agent_id: &str,
    ) -> Result<u64, TicketError>;

    /// Sell a ticket: conditional update guarded on ownership and `Assigned`
    /// status. A zero-row match is classified into `NotFound` / `NotOwned` /
    /// `WrongStatus` by a follow-up read.
    fn mark_sold(
        &self,
        id: &str,
        agent_id: &str,
        sale: &SaleDetails,
    ) -> Result<Ticket, TicketError>;

    /// Move tickets between agents. All-or-nothing: fails without mutating
    /// anything if any ticket is not owned-and-`Assigned` by `from_agent`.
    fn transfer(
        &self,
        ids: &[String],
        from_agent: &str,
        to_agent: &str,
    ) -> Result<u64, TicketError>;

    /// Consume a ticket at the gate: set status to `Scanned` and stamp
    /// `scanned_at`, guarded on the status the gate engine observed and on
    /// `scanned_at` still being null. Returns `None` when the conditional
    /// update matched zero rows (a concurrent scan won the race).
    fn claim_entry(
        &self,
        id: &str,
        expected: TicketStatus,
    ) -> Result<Option<Ticket>, TicketError>;

    /// Mark tickets settled: filters the id list server-side to tickets that
    /// belong to the agent, are sold or scanned, and are still unsettled.
    /// Returns how many rows the filter matched (0 means nothing eligible).
    fn settle(&self, ids: &[String], agent_id: &str) -> Result<u64, TicketError>;

    /// Apply an administrative direct edit, including its status-dependent
    /// side effects (see [`crate::ticket::lifecycle`]).
    fn admin_edit(&self, id: &str, edit: &AdminEdit) -> Result<Ticket, TicketError>;

    /// Ban a ticket: force status to `Invalid` from any non-`Invalid` state.
    fn ban(&self, id: &str) -> Result<Ticket, TicketError>;

    /// Return every ticket to factory state: `InStock`, no agent, no
    /// customer, unsettled, timestamps cleared. Returns the number of rows.
    fn reset_all(&self) -> Result<u64, TicketError>;
}
