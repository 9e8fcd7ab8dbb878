/// Database module for the PostgreSQL quote store
///
/// This module provides:
/// - Connection pooling and embedded migrations
/// - Repository pattern implementations over the `live_prices` table
/// - Database models and schema
/// - Diesel ORM integration

pub mod connection;
pub mod models;
pub mod repositories;
pub mod schema;

pub use connection::{establish_connection_pool, DatabaseError, DatabasePool};
