use std::sync::Arc;

use turnstile_core::audit::{AuditHandle, AuditStore};
use turnstile_core::gate::GateEngine;
use turnstile_core::ledger::Ledger;
use turnstile_core::ticket::TicketStore;
use turnstile_core::users::UserStore;
use turnstile_core::{Authenticator, Config, SanitizedConfig};

/// Shared application state
pub struct AppState {
    config: Config,
    authenticator: Arc<dyn Authenticator>,
    audit_handle: AuditHandle,
    audit_store: Arc<dyn AuditStore>,
    ticket_store: Arc<dyn TicketStore>,
    user_store: Arc<dyn UserStore>,
    gate: GateEngine,
    ledger: Ledger,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Config,
        authenticator: Arc<dyn Authenticator>,
        audit_handle: AuditHandle,
        audit_store: Arc<dyn AuditStore>,
        ticket_store: Arc<dyn TicketStore>,
        user_store: Arc<dyn UserStore>,
        gate: GateEngine,
        ledger: Ledger,
    ) -> Self {
        Self {
            config,
            authenticator,
            audit_handle,
            audit_store,
            ticket_store,
            user_store,
            gate,
            ledger,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn authenticator(&self) -> &dyn Authenticator {
        self.authenticator.as_ref()
    }

    pub fn audit(&self) -> &AuditHandle {
        &self.audit_handle
    }

    pub fn audit_store(&self) -> &dyn AuditStore {
        self.audit_store.as_ref()
    }

    pub fn ticket_store(&self) -> &dyn TicketStore {
        self.ticket_store.as_ref()
    }

    pub fn user_store(&self) -> &dyn UserStore {
        self.user_store.as_ref()
    }

    pub fn gate(&self) -> &GateEngine {
        &self.gate
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }
}
