//! SQLite-backed user store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use super::{NewUser, User, UserError, UserStore};
use crate::auth::Role;

/// SQLite-backed user store.
pub struct SqliteUserStore {
    conn: Mutex<Connection>,
}

impl SqliteUserStore {
    /// Create a new SQLite user store, creating the database file and tables if needed.
    pub fn new(path: &Path) -> Result<Self, UserError> {
        let conn = Connection::open(path).map_err(|e| UserError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite user store (useful for testing).
    pub fn in_memory() -> Result<Self, UserError> {
        let conn = Connection::open_in_memory().map_err(|e| UserError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), UserError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL UNIQUE,
                token TEXT NOT NULL UNIQUE,
                role TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_users_role ON users(role);
            "#,
        )
        .map_err(|e| UserError::Database(e.to_string()))?;

        Ok(())
    }

    fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<(User, String)> {
        let id: String = row.get(0)?;
        let name: String = row.get(1)?;
        let email: String = row.get(2)?;
        let token: String = row.get(3)?;
        let role_str: String = row.get(4)?;
        let created_at_str: String = row.get(5)?;

        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        Ok((
            User {
                id,
                name,
                email,
                token,
                // Placeholder; the caller rejects unknown role strings.
                role: Role::parse(&role_str).unwrap_or(Role::GateGuard),
                created_at,
            },
            role_str,
        ))
    }

    fn query_one(&self, sql: &str, param: &str) -> Result<Option<User>, UserError> {
        let conn = self.conn.lock().unwrap();

        let result = conn.query_row(sql, params![param], Self::row_to_user);

        match result {
            Ok((user, role_str)) => {
                if Role::parse(&role_str).is_none() {
                    return Err(UserError::Database(format!(
                        "Unknown role in database: {}",
                        role_str
                    )));
                }
                Ok(Some(user))
            }
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(UserError::Database(e.to_string())),
        }
    }
}

const USER_COLUMNS: &str = "id, name, email, token, role, created_at";

impl UserStore for SqliteUserStore {
    fn create(&self, user: NewUser) -> Result<User, UserError> {
        if user.name.trim().is_empty() {
            return Err(UserError::Validation("Name must not be empty".to_string()));
        }
        if user.token.trim().is_empty() {
            return Err(UserError::Validation("Token must not be empty".to_string()));
        }

        let conn = self.conn.lock().unwrap();
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();

        let result = conn.execute(
            &format!("INSERT INTO users ({}) VALUES (?, ?, ?, ?, ?, ?)", USER_COLUMNS),
            params![
                id,
                user.name,
                user.email,
                user.token,
                user.role.as_str(),
                now.to_rfc3339(),
            ],
        );

        match result {
            Ok(_) => Ok(User {
                id,
                name: user.name,
                email: user.email,
                token: user.token,
                role: user.role,
                created_at: now,
            }),
            Err(rusqlite::Error::SqliteFailure(e, msg))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                // Both email and token are UNIQUE; SQLite names the column
                // in the failure message.
                if msg.as_deref().is_some_and(|m| m.contains("users.token")) {
                    Err(UserError::DuplicateToken)
                } else {
                    Err(UserError::DuplicateEmail(user.email))
                }
            }
            Err(e) => Err(UserError::Database(e.to_string())),
        }
    }

    fn get(&self, id: &str) -> Result<Option<User>, UserError> {
        self.query_one(
            &format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS),
            id,
        )
    }

    fn find_by_token(&self, token: &str) -> Result<Option<User>, UserError> {
        self.query_one(
            &format!("SELECT {} FROM users WHERE token = ?", USER_COLUMNS),
            token,
        )
    }

    fn list(&self) -> Result<Vec<User>, UserError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM users ORDER BY name ASC",
                USER_COLUMNS
            ))
            .map_err(|e| UserError::Database(e.to_string()))?;

        let rows = stmt
            .query_map([], Self::row_to_user)
            .map_err(|e| UserError::Database(e.to_string()))?;

        let mut users = Vec::new();
        for row_result in rows {
            let (user, _) = row_result.map_err(|e| UserError::Database(e.to_string()))?;
            users.push(user);
        }

        Ok(users)
    }

    fn list_by_role(&self, role: Role) -> Result<Vec<User>, UserError> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(&format!(
                "SELECT {} FROM users WHERE role = ? ORDER BY name ASC",
                USER_COLUMNS
            ))
            .map_err(|e| UserError::Database(e.to_string()))?;

        let rows = stmt
            .query_map(params![role.as_str()], Self::row_to_user)
            .map_err(|e| UserError::Database(e.to_string()))?;

        let mut users = Vec::new();
        for row_result in rows {
            let (user, _) = row_result.map_err(|e| UserError::Database(e.to_string()))?;
            users.push(user);
        }

        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_store() -> SqliteUserStore {
        SqliteUserStore::in_memory().unwrap()
    }

    fn new_user(name: &str, email: &str, role: Role) -> NewUser {
        NewUser {
            name: name.to_string(),
            email: email.to_string(),
            token: format!("token-{}", email),
            role,
        }
    }

    #[test]
    fn test_create_and_get() {
        let store = create_test_store();
        let created = store
            .create(new_user("Ada", "ada@example.com", Role::Agent))
            .unwrap();

        assert!(!created.id.is_empty());
        let fetched = store.get(&created.id).unwrap().unwrap();
        assert_eq!(fetched.email, "ada@example.com");
        assert_eq!(fetched.role, Role::Agent);
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let store = create_test_store();
        store
            .create(new_user("Ada", "ada@example.com", Role::Agent))
            .unwrap();

        let mut dup = new_user("Other", "ada@example.com", Role::Treasurer);
        dup.token = "different-token".to_string();
        let result = store.create(dup);
        assert!(matches!(result, Err(UserError::DuplicateEmail(_))));
    }

    #[test]
    fn test_duplicate_token_rejected() {
        let store = create_test_store();
        store
            .create(new_user("Ada", "ada@example.com", Role::Agent))
            .unwrap();

        let mut dup = new_user("Other", "other@example.com", Role::Treasurer);
        dup.token = "token-ada@example.com".to_string();
        let result = store.create(dup);
        assert!(matches!(result, Err(UserError::DuplicateToken)));
    }

    #[test]
    fn test_find_by_token() {
        let store = create_test_store();
        store
            .create(new_user("Ada", "ada@example.com", Role::Agent))
            .unwrap();

        let found = store.find_by_token("token-ada@example.com").unwrap();
        assert!(found.is_some());
        assert_eq!(found.unwrap().name, "Ada");

        assert!(store.find_by_token("bogus").unwrap().is_none());
    }

    #[test]
    fn test_list_by_role() {
        let store = create_test_store();
        store
            .create(new_user("Ada", "ada@example.com", Role::Agent))
            .unwrap();
        store
            .create(new_user("Bob", "bob@example.com", Role::Agent))
            .unwrap();
        store
            .create(new_user("Tess", "tess@example.com", Role::Treasurer))
            .unwrap();

        let agents = store.list_by_role(Role::Agent).unwrap();
        assert_eq!(agents.len(), 2);
        assert_eq!(agents[0].name, "Ada");

        assert_eq!(store.list().unwrap().len(), 3);
    }

    #[test]
    fn test_empty_name_rejected() {
        let store = create_test_store();
        let result = store.create(new_user("  ", "x@example.com", Role::Agent));
        assert!(matches!(result, Err(UserError::Validation(_))));
    }
}
