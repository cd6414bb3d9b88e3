pub mod auth;
pub mod error;
pub mod ledger;
pub mod models;
pub mod notify;
pub mod openapi;
pub mod rate_limit;
pub mod repo;
pub mod routes;
pub mod security;

// Re-export commonly used items for tests / external users
pub use ledger::{Ledger, LedgerError};
pub use routes::{config, AppState};
pub use security::SecurityHeaders;
