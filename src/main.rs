use quote_sync_api::config::AppConfig;
use quote_sync_api::database::repositories::{InMemoryQuoteRepository, QuoteRepository, QuoteRepositoryImpl};
use quote_sync_api::jobs::QuoteSyncJob;
use quote_sync_api::provider::YahooQuoteProvider;
use quote_sync_api::sync::{PersistenceGateway, RepositoryGateway, SyncCoordinator};
use quote_sync_api::create_router;
use std::sync::Arc;
use tokio_cron_scheduler::JobScheduler;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Load environment variables from .env file (if present)
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "quote_sync_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Invalid configuration: {}", e);
            return;
        }
    };

    let Some(repository) = initialize_repository(&config) else {
        return;
    };
    let gateway: Arc<dyn PersistenceGateway> = Arc::new(RepositoryGateway::new(repository));

    let provider = match YahooQuoteProvider::new(&config.provider, &config.sync.normalizer) {
        Ok(provider) => Arc::new(provider),
        Err(e) => {
            tracing::error!("❌ Failed to create quote provider: {}", e);
            return;
        }
    };

    // Root token: cancelled on Ctrl-C, observed by every sync run
    let shutdown = CancellationToken::new();

    let coordinator = Arc::new(SyncCoordinator::new(
        gateway,
        provider,
        &config.sync,
        shutdown.clone(),
    ));

    seed_universe(&coordinator, &config.seed_symbols).await;

    let scheduler = initialize_cron_scheduler(coordinator.clone(), &config.schedule).await;

    let app = create_router(coordinator);

    let listener = match tokio::net::TcpListener::bind(&config.server_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("❌ Failed to bind {}: {}", config.server_addr, e);
            return;
        }
    };

    let addr = &config.server_addr;
    tracing::info!("🚀 Quote Sync API server running on http://{}", addr);
    tracing::info!("📊 Health check: http://{}/health", addr);
    tracing::info!("📚 Swagger UI: http://{}/swagger-ui", addr);
    tracing::info!("🔄 Trigger sync: POST http://{}/api/v1/sync", addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await
    {
        tracing::error!("❌ Server error: {}", e);
    }

    if let Some(mut scheduler) = scheduler {
        if let Err(e) = scheduler.shutdown().await {
            tracing::error!("❌ Failed to stop cron scheduler: {}", e);
        }
    }

    tracing::info!("👋 Shutdown complete");
}

/// Pick the quote store: Postgres when DATABASE_URL is set, memory otherwise
fn initialize_repository(config: &AppConfig) -> Option<Arc<dyn QuoteRepository>> {
    use quote_sync_api::database::establish_connection_pool;

    let Some(database_url) = config.database_url.as_deref() else {
        tracing::warn!("🗄️  DATABASE_URL not set, quotes are kept in memory only");
        return Some(Arc::new(InMemoryQuoteRepository::new()));
    };

    tracing::info!("🗄️  Initializing PostgreSQL connection...");

    let pool = match establish_connection_pool(database_url, config.pool_size) {
        Ok(pool) => pool,
        Err(e) => {
            tracing::error!("❌ Failed to establish database connection: {}", e);
            return None;
        }
    };

    match pool.run_migrations() {
        Ok(applied) => tracing::info!("✅ Database ready ({} migration(s) applied)", applied),
        Err(e) => {
            tracing::error!("❌ Failed to run migrations: {}", e);
            return None;
        }
    }

    Some(Arc::new(QuoteRepositoryImpl::new(move || pool.get_conn())))
}

/// Register configured symbols in the universe without touching stored prices
async fn seed_universe(coordinator: &SyncCoordinator, seed_symbols: &[String]) {
    if seed_symbols.is_empty() {
        return;
    }

    let keys: Vec<String> = coordinator
        .normalizer()
        .normalize_all(seed_symbols)
        .into_iter()
        .map(|symbol| symbol.storage_key)
        .collect();

    match coordinator.gateway().register_symbols(&keys).await {
        Ok(added) => tracing::info!("📋 Symbol universe seeded: {} new of {} configured", added, keys.len()),
        Err(e) => tracing::error!("❌ Failed to seed symbol universe: {}", e),
    }
}

/// Initialize cron scheduler for periodic sync
async fn initialize_cron_scheduler(coordinator: Arc<SyncCoordinator>, schedule: &str) -> Option<JobScheduler> {
    tracing::info!("⏰ Initializing cron scheduler...");

    let scheduler = match JobScheduler::new().await {
        Ok(scheduler) => scheduler,
        Err(e) => {
            tracing::error!("❌ Failed to create cron scheduler: {}", e);
            return None;
        }
    };

    if let Err(e) = QuoteSyncJob::new(coordinator, schedule).register(&scheduler).await {
        tracing::error!("❌ Failed to register quote sync job: {}", e);
        return None;
    }

    if let Err(e) = scheduler.start().await {
        tracing::error!("❌ Failed to start cron scheduler: {}", e);
        return None;
    }

    tracing::info!("✅ Cron scheduler started (quote sync: {})", schedule);

    Some(scheduler)
}

/// Resolve on Ctrl-C after cancelling in-flight sync runs
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("❌ Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }

    tracing::info!("🛑 Shutdown requested, cancelling sync runs...");
    shutdown.cancel();
}
