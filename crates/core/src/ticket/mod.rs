//! Ticket inventory: data types, lifecycle rules and storage.

pub mod lifecycle;
mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteTicketStore;
pub use store::{AdminEdit, TicketError, TicketFilter, TicketStore};
pub use types::{SaleDetails, SeedTicket, Ticket, TicketKind, TicketStatus};
