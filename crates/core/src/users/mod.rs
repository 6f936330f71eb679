//! User accounts and their storage.

mod sqlite_store;
mod store;
mod types;

pub use sqlite_store::SqliteUserStore;
pub use store::{UserError, UserStore};
pub use types::{NewUser, User};
