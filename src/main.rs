use anyhow::Context;
use junket_ledger::orchestration::spawn_reconcile_job;
use junket_ledger::{api, config::Config, db::init_db, Repository};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    let config = Config::from_env().context("Configuration error")?;
    let port = config.port;

    let pool = init_db(&config.database_path)
        .await
        .context("Failed to initialize database")?;
    let repo = Arc::new(Repository::new(pool));

    repo.seed_rolling_commission_rate(config.default_rolling_commission_rate)
        .await
        .context("Failed to seed default rolling commission rate")?;

    let state = api::AppState::new(repo, config.clone());

    if config.reconcile_interval_secs > 0 {
        spawn_reconcile_job(
            state.orchestrator.recomputer().clone(),
            Duration::from_secs(config.reconcile_interval_secs),
        );
        tracing::info!(
            interval_secs = config.reconcile_interval_secs,
            "Scheduled reconciliation enabled"
        );
    }

    let app = api::create_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
