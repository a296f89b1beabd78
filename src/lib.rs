pub mod config;
pub mod extract;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod store;
pub mod utils;
pub mod workflow;

use config::Config;
use store::{PgStore, ReceiptStore};

/// Shared state behind every handler; wrapped in an `Arc` by the router.
pub struct AppState {
    pub store: PgStore,
    pub receipts: ReceiptStore,
    pub config: Config,
}
