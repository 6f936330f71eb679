//! SQLite-backed ticket store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::lifecycle::{apply_admin_edit, classify_sell_failure};
use super::{
    AdminEdit, SaleDetails, SeedTicket, Ticket, TicketError, TicketFilter, TicketKind,
    TicketStatus, TicketStore,
};

const TICKET_COLUMNS: &str = "id, serial_number, code, magic_link, kind, status, assigned_to, \
     customer_name, customer_phone, payment_settled, sold_at, scanned_at, created_at, updated_at";

/// SQLite-backed ticket store.
pub struct SqliteTicketStore {
    conn: Mutex<Connection>,
}

impl SqliteTicketStore {
    /// Create a new SQLite ticket store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, TicketError> {
        let conn = Connection::open(path).map_err(|e| TicketError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite ticket store (useful for testing).
    pub fn in_memory() -> Result<Self, TicketError> {
        let conn =
            Connection::open_in_memory().map_err(|e| TicketError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), TicketError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS tickets (
                id TEXT PRIMARY KEY,
                serial_number TEXT NOT NULL,
                code TEXT NOT NULL UNIQUE,
                magic_link TEXT NOT NULL,
                kind TEXT NOT NULL DEFAULT 'NORMAL',
                status TEXT NOT NULL DEFAULT 'IN_STOCK',
                assigned_to TEXT,
                customer_name TEXT,
                customer_phone TEXT,
                payment_settled INTEGER NOT NULL DEFAULT 0,
                sold_at TEXT,
                scanned_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_tickets_serial_number ON tickets(serial_number);
            CREATE INDEX IF NOT EXISTS idx_tickets_status ON tickets(status);
            CREATE INDEX IF NOT EXISTS idx_tickets_assigned_to ON tickets(assigned_to);
            "#,
        )
        .map_err(|e| TicketError::Database(e.to_string()))?;

        Ok(())
    }

    fn build_where_clause(filter: &TicketFilter) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = Vec::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(status) = filter.status {
            conditions.push("status = ?");
            params.push(Box::new(status.as_str().to_string()));
        }

        if let Some(ref agent_id) = filter.assigned_to {
            conditions.push("assigned_to = ?");
            params.push(Box::new(agent_id.clone()));
        }

        if let Some(ref term) = filter.search {
            conditions.push(
                "(serial_number LIKE ? OR code LIKE ? OR customer_name LIKE ?)",
            );
            let pattern = format!("%{}%", term);
            params.push(Box::new(pattern.clone()));
            params.push(Box::new(pattern.clone()));
            params.push(Box::new(pattern));
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };

        (where_clause, params)
    }

    fn row_to_ticket(row: &rusqlite::Row) -> rusqlite::Result<Ticket> {
        let id: String = row.get(0)?;
        let serial_number: String = row.get(1)?;
        let code: String = row.get(2)?;
        let magic_link: String = row.get(3)?;
        let kind_str: String = row.get(4)?;
        let status_str: String = row.get(5)?;
        let assigned_to: Option<String> = row.get(6)?;
        let customer_name: Option<String> = row.get(7)?;
        let customer_phone: Option<String> = row.get(8)?;
        let payment_settled: bool = row.get(9)?;
        let sold_at_str: Option<String> = row.get(10)?;
        let scanned_at_str: Option<String> = row.get(11)?;
        let created_at_str: String = row.get(12)?;
        let updated_at_str: String = row.get(13)?;

        let status = TicketStatus::parse(&status_str).unwrap_or(TicketStatus::Invalid);
        let kind = TicketKind::parse(&kind_str);

        Ok(Ticket {
            id,
            serial_number,
            code,
            magic_link,
            kind,
            status,
            assigned_to,
            customer_name,
            customer_phone,
            payment_settled,
            sold_at: parse_optional_timestamp(sold_at_str),
            scanned_at: parse_optional_timestamp(scanned_at_str),
            created_at: parse_timestamp(&created_at_str),
            updated_at: parse_timestamp(&updated_at_str),
        })
    }

    fn get_locked(conn: &Connection, id: &str) -> Result<Option<Ticket>, TicketError> {
        let result = conn.query_row(
            &format!("SELECT {} FROM tickets WHERE id = ?", TICKET_COLUMNS),
            params![id],
            Self::row_to_ticket,
        );

        match result {
            Ok(ticket) => Ok(Some(ticket)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(TicketError::Database(e.to_string())),
        }
    }
}

/// Build a `?,?,?` placeholder list for an `IN (...)` clause.
fn in_placeholders(n: usize) -> String {
    let mut s = String::with_capacity(n * 2);
    for i in 0..n {
        if i > 0 {
            s.push(',');
        }
        s.push('?');
    }
    s
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_optional_timestamp(s: Option<String>) -> Option<DateTime<Utc>> {
    s.and_then(|s| {
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
    })
}

fn write_timestamp(t: Option<DateTime<Utc>>) -> Option<String> {
    t.map(|t| t.to_rfc3339())
}

impl TicketStore for SqliteTicketStore {
    fn seed(&self, batch: &[SeedTicket]) -> Result<u64, TicketError> {
        let mut conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        let tx = conn
            .transaction()
            .map_err(|e| TicketError::Database(e.to_string()))?;

        let mut inserted = 0u64;
        {
            let mut stmt = tx
                .prepare(
                    "INSERT OR IGNORE INTO tickets \
                     (id, serial_number, code, magic_link, kind, status, created_at, updated_at) \
                     VALUES (?, ?, ?, ?, ?, 'IN_STOCK', ?, ?)",
                )
                .map_err(|e| TicketError::Database(e.to_string()))?;

            for row in batch {
                let id = uuid::Uuid::new_v4().to_string();
                let changed = stmt
                    .execute(params![
                        id,
                        row.serial_number,
                        row.code,
                        row.magic_link,
                        row.kind.as_str(),
                        now,
                        now,
                    ])
                    .map_err(|e| TicketError::Database(e.to_string()))?;
                inserted += changed as u64;
            }
        }

        tx.commit().map_err(|e| TicketError::Database(e.to_string()))?;
        Ok(inserted)
    }

    fn get(&self, id: &str) -> Result<Option<Ticket>, TicketError> {
        let conn = self.conn.lock().unwrap();
        Self::get_locked(&conn, id)
    }

    fn find_by_code(&self, code: &str) -> Result<Option<Ticket>, TicketError> {
        let conn = self.conn.lock().unwrap();

        let result = conn.query_row(
            &format!("SELECT {} FROM tickets WHERE code = ?", TICKET_COLUMNS),
            params![code],
            Self::row_to_ticket,
        );

        match result {
            Ok(ticket) => Ok(Some(ticket)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(TicketError::Database(e.to_string())),
        }
    }

    fn list(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, TicketError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!(
            "SELECT {} FROM tickets {} ORDER BY serial_number ASC LIMIT ? OFFSET ?",
            TICKET_COLUMNS, where_clause
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| TicketError::Database(e.to_string()))?;

        let mut all_params: Vec<Box<dyn rusqlite::ToSql>> = params;
        all_params.push(Box::new(filter.limit));
        all_params.push(Box::new(filter.offset));

        let param_refs: Vec<&dyn rusqlite::ToSql> = all_params.iter().map(|p| p.as_ref()).collect();

        let rows = stmt
            .query_map(param_refs.as_slice(), Self::row_to_ticket)
            .map_err(|e| TicketError::Database(e.to_string()))?;

        let mut tickets = Vec::new();
        for row_result in rows {
            let ticket = row_result.map_err(|e| TicketError::Database(e.to_string()))?;
            tickets.push(ticket);
        }

        Ok(tickets)
    }

    fn count(&self, filter: &TicketFilter) -> Result<i64, TicketError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, params) = Self::build_where_clause(filter);

        let sql = format!("SELECT COUNT(*) FROM tickets {}", where_clause);

        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let count: i64 = conn
            .query_row(&sql, param_refs.as_slice(), |row| row.get(0))
            .map_err(|e| TicketError::Database(e.to_string()))?;

        Ok(count)
    }

    fn list_by_agent(&self, agent_id: &str) -> Result<Vec<Ticket>, TicketError> {
        let conn = self.conn.lock().unwrap();

        let sql = format!(
            "SELECT {} FROM tickets WHERE assigned_to = ? ORDER BY serial_number ASC",
            TICKET_COLUMNS
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| TicketError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![agent_id], Self::row_to_ticket)
            .map_err(|e| TicketError::Database(e.to_string()))?;

        let mut tickets = Vec::new();
        for row_result in rows {
            let ticket = row_result.map_err(|e| TicketError::Database(e.to_string()))?;
            tickets.push(ticket);
        }

        Ok(tickets)
    }

    fn assign_range(
        &self,
        start_serial: &str,
        end_serial: &str,
        agent_id: &str,
    ) -> Result<u64, TicketError> {
        if start_serial > end_serial {
            return Err(TicketError::Validation(format!(
                "Invalid serial range: {} > {}",
                start_serial, end_serial
            )));
        }

        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        let changed = conn
            .execute(
                "UPDATE tickets SET status = 'ASSIGNED', assigned_to = ?, updated_at = ? \
                 WHERE serial_number >= ? AND serial_number <= ? AND status = 'IN_STOCK'",
                params![agent_id, now, start_serial, end_serial],
            )
            .map_err(|e| TicketError::Database(e.to_string()))?;

        Ok(changed as u64)
    }

    fn mark_sold(
        &self,
        id: &str,
        agent_id: &str,
        sale: &SaleDetails,
    ) -> Result<Ticket, TicketError> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        let changed = conn
            .execute(
                "UPDATE tickets SET status = 'SOLD', customer_name = ?, customer_phone = ?, \
                 sold_at = ?, updated_at = ? \
                 WHERE id = ? AND assigned_to = ? AND status = 'ASSIGNED'",
                params![
                    sale.customer_name,
                    sale.customer_phone,
                    now,
                    now,
                    id,
                    agent_id,
                ],
            )
            .map_err(|e| TicketError::Database(e.to_string()))?;

        if changed == 0 {
            let ticket = Self::get_locked(&conn, id)?;
            return Err(classify_sell_failure(ticket.as_ref(), agent_id, id));
        }

        Self::get_locked(&conn, id)?.ok_or_else(|| TicketError::NotFound(id.to_string()))
    }

    fn transfer(
        &self,
        ids: &[String],
        from_agent: &str,
        to_agent: &str,
    ) -> Result<u64, TicketError> {
        if ids.is_empty() {
            return Err(TicketError::Validation("No tickets selected".to_string()));
        }

        let mut conn = self.conn.lock().unwrap();
        let tx = conn
            .transaction()
            .map_err(|e| TicketError::Database(e.to_string()))?;

        let placeholders = in_placeholders(ids.len());

        let mut tx_params: Vec<Box<dyn rusqlite::ToSql>> =
            vec![Box::new(from_agent.to_string())];
        for id in ids {
            tx_params.push(Box::new(id.clone()));
        }
        let param_refs: Vec<&dyn rusqlite::ToSql> = tx_params.iter().map(|p| p.as_ref()).collect();

        let eligible: i64 = tx
            .query_row(
                &format!(
                    "SELECT COUNT(*) FROM tickets \
                     WHERE assigned_to = ? AND status = 'ASSIGNED' AND id IN ({})",
                    placeholders
                ),
                param_refs.as_slice(),
                |row| row.get(0),
            )
            .map_err(|e| TicketError::Database(e.to_string()))?;

        // All-or-nothing: a single unsold-but-foreign or already-sold ticket
        // fails the whole batch without mutating anything.
        if eligible as usize != ids.len() {
            return Err(TicketError::Validation(
                "Some tickets are not transferable (not held by the sending agent, or already sold)"
                    .to_string(),
            ));
        }

        let now = Utc::now().to_rfc3339();
        let mut update_params: Vec<Box<dyn rusqlite::ToSql>> = vec![
            Box::new(to_agent.to_string()),
            Box::new(now),
            Box::new(from_agent.to_string()),
        ];
        for id in ids {
            update_params.push(Box::new(id.clone()));
        }
        let param_refs: Vec<&dyn rusqlite::ToSql> =
            update_params.iter().map(|p| p.as_ref()).collect();

        let changed = tx
            .execute(
                &format!(
                    "UPDATE tickets SET assigned_to = ?, updated_at = ? \
                     WHERE assigned_to = ? AND status = 'ASSIGNED' AND id IN ({})",
                    placeholders
                ),
                param_refs.as_slice(),
            )
            .map_err(|e| TicketError::Database(e.to_string()))?;

        tx.commit().map_err(|e| TicketError::Database(e.to_string()))?;
        Ok(changed as u64)
    }

    fn claim_entry(
        &self,
        id: &str,
        expected: TicketStatus,
    ) -> Result<Option<Ticket>, TicketError> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        // Compare-and-set: the row filter repeats the status the caller
        // observed plus `scanned_at IS NULL`, so of two concurrent scans
        // exactly one matches a row.
        let changed = conn
            .execute(
                "UPDATE tickets SET status = 'SCANNED', scanned_at = ?, updated_at = ? \
                 WHERE id = ? AND status = ? AND scanned_at IS NULL",
                params![now, now, id, expected.as_str()],
            )
            .map_err(|e| TicketError::Database(e.to_string()))?;

        if changed == 0 {
            return Ok(None);
        }

        Self::get_locked(&conn, id)?
            .ok_or_else(|| TicketError::NotFound(id.to_string()))
            .map(Some)
    }

    fn settle(&self, ids: &[String], agent_id: &str) -> Result<u64, TicketError> {
        if ids.is_empty() {
            return Err(TicketError::Validation("No tickets selected".to_string()));
        }

        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        let placeholders = in_placeholders(ids.len());

        let mut settle_params: Vec<Box<dyn rusqlite::ToSql>> =
            vec![Box::new(now), Box::new(agent_id.to_string())];
        for id in ids {
            settle_params.push(Box::new(id.clone()));
        }
        let param_refs: Vec<&dyn rusqlite::ToSql> =
            settle_params.iter().map(|p| p.as_ref()).collect();

        // The id list is re-filtered server-side; ids that are foreign,
        // unsold or already settled simply fall out of the match.
        let changed = conn
            .execute(
                &format!(
                    "UPDATE tickets SET payment_settled = 1, updated_at = ? \
                     WHERE assigned_to = ? AND status IN ('SOLD', 'SCANNED') \
                     AND payment_settled = 0 AND id IN ({})",
                    placeholders
                ),
                param_refs.as_slice(),
            )
            .map_err(|e| TicketError::Database(e.to_string()))?;

        Ok(changed as u64)
    }

    fn admin_edit(&self, id: &str, edit: &AdminEdit) -> Result<Ticket, TicketError> {
        let conn = self.conn.lock().unwrap();

        let current =
            Self::get_locked(&conn, id)?.ok_or_else(|| TicketError::NotFound(id.to_string()))?;

        let next = apply_admin_edit(&current, edit, Utc::now());

        conn.execute(
            "UPDATE tickets SET serial_number = ?, code = ?, status = ?, assigned_to = ?, \
             customer_name = ?, customer_phone = ?, payment_settled = ?, sold_at = ?, \
             scanned_at = ?, updated_at = ? WHERE id = ?",
            params![
                next.serial_number,
                next.code,
                next.status.as_str(),
                next.assigned_to,
                next.customer_name,
                next.customer_phone,
                next.payment_settled,
                write_timestamp(next.sold_at),
                write_timestamp(next.scanned_at),
                next.updated_at.to_rfc3339(),
                id,
            ],
        )
        .map_err(|e| TicketError::Database(e.to_string()))?;

        Ok(next)
    }

    fn ban(&self, id: &str) -> Result<Ticket, TicketError> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        let changed = conn
            .execute(
                "UPDATE tickets SET status = 'INVALID', updated_at = ? \
                 WHERE id = ? AND status != 'INVALID'",
                params![now, id],
            )
            .map_err(|e| TicketError::Database(e.to_string()))?;

        if changed == 0 {
            return match Self::get_locked(&conn, id)? {
                None => Err(TicketError::NotFound(id.to_string())),
                Some(t) => Err(TicketError::WrongStatus {
                    ticket_id: id.to_string(),
                    status: t.status.as_str().to_string(),
                    operation: "ban".to_string(),
                }),
            };
        }

        Self::get_locked(&conn, id)?.ok_or_else(|| TicketError::NotFound(id.to_string()))
    }

    fn reset_all(&self) -> Result<u64, TicketError> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now().to_rfc3339();

        let changed = conn
            .execute(
                "UPDATE tickets SET status = 'IN_STOCK', assigned_to = NULL, \
                 customer_name = NULL, customer_phone = NULL, payment_settled = 0, \
                 sold_at = NULL, scanned_at = NULL, updated_at = ?",
                params![now],
            )
            .map_err(|e| TicketError::Database(e.to_string()))?;

        Ok(changed as u64)
    }
}
