//! Core ticket data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Classification printed on the physical ticket. Does not affect lifecycle.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketKind {
    #[default]
    Normal,
    Vip,
}

impl TicketKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketKind::Normal => "NORMAL",
            TicketKind::Vip => "VIP",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "VIP" => TicketKind::Vip,
            _ => TicketKind::Normal,
        }
    }
}

/// Current lifecycle status of a ticket.
///
/// ```text
/// IN_STOCK -> ASSIGNED -> SOLD -> SCANNED
/// ```
///
/// `Invalid` is a terminal side-state reachable from anywhere by an
/// administrative ban. A bulk reset returns any ticket to `InStock`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TicketStatus {
    InStock,
    Assigned,
    Sold,
    Scanned,
    Invalid,
}

impl TicketStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::InStock => "IN_STOCK",
            TicketStatus::Assigned => "ASSIGNED",
            TicketStatus::Sold => "SOLD",
            TicketStatus::Scanned => "SCANNED",
            TicketStatus::Invalid => "INVALID",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "IN_STOCK" => Some(TicketStatus::InStock),
            "ASSIGNED" => Some(TicketStatus::Assigned),
            "SOLD" => Some(TicketStatus::Sold),
            "SCANNED" => Some(TicketStatus::Scanned),
            "INVALID" => Some(TicketStatus::Invalid),
            _ => None,
        }
    }

    /// Returns true if a gate ENTRY scan may consume a ticket in this status.
    /// `Sold` grants cleanly; `Assigned` grants with a payment warning.
    pub fn is_grantable(&self) -> bool {
        matches!(self, TicketStatus::Sold | TicketStatus::Assigned)
    }
}

/// A serialized access code tracked from stock to venue entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ticket {
    /// Unique identifier (UUID), assigned at seeding.
    pub id: String,

    /// Human-facing sequence label, e.g. "0001". Admin-correctable.
    pub serial_number: String,

    /// Human-readable alphanumeric code embedded in the QR payload.
    /// Unique; primary lookup key for gate scans.
    pub code: String,

    /// Full URL encoding `code`; fallback when a scanner decodes the URL.
    pub magic_link: String,

    pub kind: TicketKind,

    /// Single source of truth for where the ticket sits in its life.
    pub status: TicketStatus,

    /// Owning agent, set when the ticket enters `Assigned`.
    pub assigned_to: Option<String>,

    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,

    /// True once treasury has collected the cash for this sale.
    pub payment_settled: bool,

    pub sold_at: Option<DateTime<Utc>>,

    /// Non-null iff the ticket passed a granted ENTRY scan. Cleared only by
    /// administrative edit or inventory reset.
    pub scanned_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    /// True when the agent holding this ticket still owes treasury its cash:
    /// sold (or already scanned) but not yet settled.
    pub fn carries_unsettled_cash(&self) -> bool {
        matches!(self.status, TicketStatus::Sold | TicketStatus::Scanned) && !self.payment_settled
    }
}

/// One row of a bulk seeding batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedTicket {
    pub serial_number: String,
    pub code: String,
    pub magic_link: String,
    #[serde(default)]
    pub kind: TicketKind,
}

/// Customer details captured at sale time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SaleDetails {
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
}
