/// Repository implementations for the quote store
///
/// - `QuoteRepositoryImpl`: Postgres `live_prices` table via diesel
/// - `InMemoryQuoteRepository`: process-local store for database-less runs

pub mod memory_repository;
pub mod quote_repository;

pub use memory_repository::InMemoryQuoteRepository;
pub use quote_repository::{QuoteRepository, QuoteRepositoryImpl};
