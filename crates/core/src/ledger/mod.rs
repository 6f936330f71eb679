//! Settlement ledger.
//!
//! Tracks the cash agents owe treasury. Every ticket has the same fixed
//! price; a ticket is pending settlement while it is sold or scanned and
//! its payment has not been collected. Entry at the gate never clears a
//! debt: a scanned-but-unsettled ticket stays on the agent's tab.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::audit::{AuditEvent, AuditHandle};
use crate::ticket::{Ticket, TicketError, TicketStatus, TicketStore};
use crate::users::{User, UserError, UserStore};
use crate::auth::Role;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("No eligible tickets")]
    NoEligibleTickets,

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),
}

impl From<TicketError> for LedgerError {
    fn from(e: TicketError) -> Self {
        match e {
            TicketError::NoEligibleTickets => LedgerError::NoEligibleTickets,
            TicketError::Validation(msg) => LedgerError::Validation(msg),
            other => LedgerError::Database(other.to_string()),
        }
    }
}

impl From<UserError> for LedgerError {
    fn from(e: UserError) -> Self {
        LedgerError::Database(e.to_string())
    }
}

/// Per-status counts over one agent's tickets.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct WalletCounts {
    pub assigned: u64,
    pub sold: u64,
    pub scanned: u64,
    pub invalid: u64,
}

/// An agent's own view: held tickets plus what they owe.
#[derive(Debug, Clone, Serialize)]
pub struct AgentWallet {
    pub agent_id: String,
    pub counts: WalletCounts,
    pub pending_count: u64,
    pub pending_amount: i64,
    pub tickets: Vec<Ticket>,
}

/// Treasury's view of one agent.
#[derive(Debug, Clone, Serialize)]
pub struct AgentLedgerSummary {
    pub agent_id: String,
    pub agent_name: String,
    pub counts: WalletCounts,
    pub pending_count: u64,
    pub pending_amount: i64,
    pub settled_count: u64,
    pub settled_amount: i64,
}

/// Receipt for one settlement batch.
#[derive(Debug, Clone, Serialize)]
pub struct SettlementReceipt {
    pub agent_id: String,
    pub count: u64,
    pub amount: i64,
}

/// The ledger aggregates over the ticket store; it holds no state of its
/// own beyond the configured price.
pub struct Ledger {
    tickets: Arc<dyn TicketStore>,
    users: Arc<dyn UserStore>,
    audit: AuditHandle,
    ticket_price: i64,
}

impl Ledger {
    pub fn new(
        tickets: Arc<dyn TicketStore>,
        users: Arc<dyn UserStore>,
        audit: AuditHandle,
        ticket_price: i64,
    ) -> Self {
        Self {
            tickets,
            users,
            audit,
            ticket_price,
        }
    }

    pub fn ticket_price(&self) -> i64 {
        self.ticket_price
    }

    fn tally(tickets: &[Ticket]) -> (WalletCounts, u64, u64) {
        let mut counts = WalletCounts::default();
        let mut pending = 0u64;
        let mut settled = 0u64;
        for t in tickets {
            match t.status {
                TicketStatus::Assigned => counts.assigned += 1,
                TicketStatus::Sold => counts.sold += 1,
                TicketStatus::Scanned => counts.scanned += 1,
                TicketStatus::Invalid => counts.invalid += 1,
                TicketStatus::InStock => {}
            }
            if t.carries_unsettled_cash() {
                pending += 1;
            } else if t.payment_settled {
                settled += 1;
            }
        }
        (counts, pending, settled)
    }

    /// An agent's wallet: the tickets they hold and the cash they owe.
    pub fn wallet(&self, agent_id: &str) -> Result<AgentWallet, LedgerError> {
        let tickets = self.tickets.list_by_agent(agent_id)?;
        let (counts, pending, _) = Self::tally(&tickets);

        Ok(AgentWallet {
            agent_id: agent_id.to_string(),
            counts,
            pending_count: pending,
            pending_amount: pending as i64 * self.ticket_price,
            tickets,
        })
    }

    /// Treasury overview: one summary per agent account.
    pub fn overview(&self) -> Result<Vec<AgentLedgerSummary>, LedgerError> {
        let agents: Vec<User> = self.users.list_by_role(Role::Agent)?;

        let mut summaries = Vec::with_capacity(agents.len());
        for agent in agents {
            let tickets = self.tickets.list_by_agent(&agent.id)?;
            let (counts, pending, settled) = Self::tally(&tickets);
            summaries.push(AgentLedgerSummary {
                agent_id: agent.id,
                agent_name: agent.name,
                counts,
                pending_count: pending,
                pending_amount: pending as i64 * self.ticket_price,
                settled_count: settled,
                settled_amount: settled as i64 * self.ticket_price,
            });
        }

        Ok(summaries)
    }

    /// Record a cash collection: mark the listed tickets settled.
    ///
    /// The id list is advisory; the store re-filters it to tickets that are
    /// held by the agent, sold or scanned, and still unsettled. An empty
    /// match is an error so a treasurer cannot mistake a no-op for a
    /// collection.
    pub fn settle(
        &self,
        agent_id: &str,
        ticket_ids: &[String],
        actor_id: &str,
    ) -> Result<SettlementReceipt, LedgerError> {
        let agent = self
            .users
            .get(agent_id)?
            .ok_or_else(|| LedgerError::AgentNotFound(agent_id.to_string()))?;

        let count = self.tickets.settle(ticket_ids, &agent.id)?;
        if count == 0 {
            return Err(LedgerError::NoEligibleTickets);
        }

        let amount = count as i64 * self.ticket_price;
        self.audit.try_emit(AuditEvent::PaymentsSettled {
            agent_id: agent.id.clone(),
            actor_id: actor_id.to_string(),
            count,
            amount,
        });

        Ok(SettlementReceipt {
            agent_id: agent.id,
            count,
            amount,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditHandle;
    use crate::ticket::{SaleDetails, SeedTicket, SqliteTicketStore, TicketKind};
    use crate::users::{NewUser, SqliteUserStore};
    use tokio::sync::mpsc;

    struct Fixture {
        ledger: Ledger,
        tickets: Arc<SqliteTicketStore>,
        agent_id: String,
        rx: mpsc::Receiver<crate::audit::AuditEventEnvelope>,
    }

    fn fixture() -> Fixture {
        let tickets = Arc::new(SqliteTicketStore::in_memory().unwrap());
        let users = Arc::new(SqliteUserStore::in_memory().unwrap());

        let agent = users
            .create(NewUser {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                token: "tok-ada".to_string(),
                role: Role::Agent,
            })
            .unwrap();

        let batch: Vec<SeedTicket> = (1..=5)
            .map(|i| SeedTicket {
                serial_number: format!("{:04}", i),
                code: format!("C{:04}", i),
                magic_link: format!("https://x/t/C{:04}", i),
                kind: TicketKind::Normal,
            })
            .collect();
        tickets.seed(&batch).unwrap();
        tickets.assign_range("0001", "0004", &agent.id).unwrap();

        let (tx, rx) = mpsc::channel(100);
        let ledger = Ledger::new(tickets.clone(), users, AuditHandle::new(tx), 1500);

        Fixture {
            ledger,
            tickets,
            agent_id: agent.id,
            rx,
        }
    }

    fn sell_n(f: &Fixture, n: usize) -> Vec<String> {
        let held = f.tickets.list_by_agent(&f.agent_id).unwrap();
        held.iter()
            .take(n)
            .map(|t| {
                f.tickets
                    .mark_sold(&t.id, &f.agent_id, &SaleDetails::default())
                    .unwrap();
                t.id.clone()
            })
            .collect()
    }

    #[test]
    fn test_wallet_counts_and_pending() {
        let f = fixture();
        let sold = sell_n(&f, 2);
        f.tickets
            .claim_entry(&sold[0], TicketStatus::Sold)
            .unwrap();

        let wallet = f.ledger.wallet(&f.agent_id).unwrap();
        assert_eq!(wallet.counts.assigned, 2);
        assert_eq!(wallet.counts.sold, 1);
        assert_eq!(wallet.counts.scanned, 1);
        // Scanned-but-unsettled still counts toward the debt.
        assert_eq!(wallet.pending_count, 2);
        assert_eq!(wallet.pending_amount, 3000);
        assert_eq!(wallet.tickets.len(), 4);
    }

    #[test]
    fn test_settle_marks_and_audits() {
        let mut f = fixture();
        let sold = sell_n(&f, 3);

        let receipt = f.ledger.settle(&f.agent_id, &sold, "treasurer-1").unwrap();
        assert_eq!(receipt.count, 3);
        assert_eq!(receipt.amount, 4500);

        let wallet = f.ledger.wallet(&f.agent_id).unwrap();
        assert_eq!(wallet.pending_count, 0);

        let envelope = f.rx.try_recv().unwrap();
        assert_eq!(envelope.event.event_type(), "payments_settled");
    }

    #[test]
    fn test_settle_nothing_eligible_fails() {
        let f = fixture();
        let sold = sell_n(&f, 1);

        f.ledger.settle(&f.agent_id, &sold, "treasurer-1").unwrap();
        // Same ids again: nothing left to settle.
        let result = f.ledger.settle(&f.agent_id, &sold, "treasurer-1");
        assert!(matches!(result, Err(LedgerError::NoEligibleTickets)));
    }

    #[test]
    fn test_settle_unknown_agent_fails() {
        let f = fixture();
        let result = f
            .ledger
            .settle("no-such-agent", &["x".to_string()], "treasurer-1");
        assert!(matches!(result, Err(LedgerError::AgentNotFound(_))));
    }

    #[test]
    fn test_settle_filters_foreign_ids() {
        let f = fixture();
        sell_n(&f, 1);
        // Ticket 0005 is unassigned stock; listing it settles nothing extra.
        let stray = f.tickets.find_by_code("C0005").unwrap().unwrap();
        let held = f.tickets.list_by_agent(&f.agent_id).unwrap();
        let sold_id = held
            .iter()
            .find(|t| t.status == TicketStatus::Sold)
            .unwrap()
            .id
            .clone();

        let receipt = f
            .ledger
            .settle(&f.agent_id, &[sold_id, stray.id], "treasurer-1")
            .unwrap();
        assert_eq!(receipt.count, 1);
        assert_eq!(receipt.amount, 1500);
    }

    #[test]
    fn test_overview_per_agent() {
        let f = fixture();
        let sold = sell_n(&f, 2);
        f.ledger
            .settle(&f.agent_id, &sold[..1].to_vec(), "treasurer-1")
            .unwrap();

        let overview = f.ledger.overview().unwrap();
        assert_eq!(overview.len(), 1);
        let summary = &overview[0];
        assert_eq!(summary.agent_name, "Ada");
        assert_eq!(summary.counts.sold, 2);
        assert_eq!(summary.pending_count, 1);
        assert_eq!(summary.pending_amount, 1500);
        assert_eq!(summary.settled_count, 1);
        assert_eq!(summary.settled_amount, 1500);
    }
}
