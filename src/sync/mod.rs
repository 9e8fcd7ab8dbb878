//! Quote synchronization engine
//!
//! A run reads the symbol universe, fetches quotes in rate-limited batches,
//! drops unchanged prices and upserts the rest. `SyncCoordinator` drives the
//! pipeline; everything else is a single-purpose stage it composes.

pub mod change_detector;
pub mod coordinator;
pub mod errors;
pub mod fetcher;
pub mod gateway;
pub mod normalizer;
pub mod orchestrator;
pub mod run_guard;

pub use change_detector::ChangeDetector;
pub use coordinator::SyncCoordinator;
pub use errors::{FetchError, PersistenceError};
pub use fetcher::{FetchOutcome, Fetcher, SymbolOutcome};
pub use gateway::{write_quotes, PersistenceGateway, RepositoryGateway, WriteReport};
pub use normalizer::SymbolNormalizer;
pub use orchestrator::{BatchOrchestrator, BatchReport};
pub use run_guard::{GuardDenied, RunGuard, RunGuardState, RunPermit};
