/// Cron jobs and scheduled tasks module
///
/// Contains background jobs that run on a schedule:
/// - Quote synchronization against the market data provider

pub mod quote_sync_job;

pub use quote_sync_job::QuoteSyncJob;
