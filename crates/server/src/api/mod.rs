pub mod agent;
pub mod audit;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod inventory;
pub mod middleware;
pub mod routes;
pub mod treasury;
pub mod users;

pub use routes::create_router;
