//! Shared application state.

use duka_db::Database;

/// State handed to every handler. `Database` is a cheap pool handle, so
/// cloning per-request is fine.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
}

impl AppState {
    pub fn new(db: Database) -> Self {
        AppState { db }
    }
}
