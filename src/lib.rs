// Library Crate Root
// lib.rs

// main.rs imports through lib.rs like an external crate
pub mod api;
pub mod config;
pub mod database;
pub mod jobs;
pub mod models;
pub mod provider;
pub mod sync;

#[cfg(test)]
mod test_support;

// pub use = re-export at crate root
pub use api::{create_router, AppState};
pub use config::AppConfig;
pub use models::{Quote, Symbol, SyncRun};
pub use sync::SyncCoordinator;
