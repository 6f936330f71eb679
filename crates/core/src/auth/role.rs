//! Roles and the capability table.

use serde::{Deserialize, Serialize};

/// Closed set of roles. Stored as strings; anything unrecognized in the
/// database fails to load rather than silently granting nothing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    SuperAdmin,
    Agent,
    Treasurer,
    GateGuard,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SuperAdmin => "SUPER_ADMIN",
            Role::Agent => "AGENT",
            Role::Treasurer => "TREASURER",
            Role::GateGuard => "GATE_GUARD",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "SUPER_ADMIN" => Some(Role::SuperAdmin),
            "AGENT" => Some(Role::Agent),
            "TREASURER" => Some(Role::Treasurer),
            "GATE_GUARD" => Some(Role::GateGuard),
            _ => None,
        }
    }

    /// Whether this role may perform the operation. `SuperAdmin` may do
    /// everything; the others get exactly their own surface.
    pub fn allows(&self, op: Operation) -> bool {
        if matches!(self, Role::SuperAdmin) {
            return true;
        }
        match op {
            Operation::ManageInventory | Operation::ManageUsers | Operation::ViewAudit => false,
            Operation::SellTickets | Operation::TransferTickets | Operation::ViewOwnWallet => {
                matches!(self, Role::Agent)
            }
            Operation::SettlePayments | Operation::ViewLedger => {
                matches!(self, Role::Treasurer)
            }
            Operation::ScanTickets => matches!(self, Role::GateGuard),
        }
    }
}

/// Operations gated by role checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Seed, assign, edit, ban, reset
    ManageInventory,
    /// Create and list user accounts
    ManageUsers,
    /// Read the audit trail
    ViewAudit,
    /// Record a sale
    SellTickets,
    /// Move tickets to another agent
    TransferTickets,
    /// Read one's own wallet
    ViewOwnWallet,
    /// Collect cash and mark payments settled
    SettlePayments,
    /// Read per-agent settlement summaries
    ViewLedger,
    /// Run gate scans
    ScanTickets,
}
