//! API server entry point

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use domain_claims::{ClaimStore, InMemoryClaimStore, TracingNotifier};
use domain_governance::GovernanceEngine;
use infra_db::PostgresClaimStore;
use infra_gateways::{HttpLedgerGateway, HttpRiskScorer, LedgerGatewayConfig, RiskScorerConfig};
use interface_api::{create_router, ApiConfig, AppState};
use orchestrator::{resume_monitors, ClaimOrchestrator, OrchestratorConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = load_config();
    init_tracing(&config.log_level);

    let store = build_store(&config).await?;
    let scorer = Arc::new(
        HttpRiskScorer::new(RiskScorerConfig::new(
            config.risk_api_url.clone(),
            config.risk_api_key.clone(),
        ))
        .context("failed to build risk scorer client")?,
    );
    let ledger = Arc::new(
        HttpLedgerGateway::new(LedgerGatewayConfig::new(
            config.ledger_api_url.clone(),
            config.ledger_api_key.clone(),
        ))
        .context("failed to build ledger gateway client")?,
    );

    let orchestrator = Arc::new(ClaimOrchestrator::new(
        store,
        scorer,
        ledger,
        Arc::new(GovernanceEngine::new()),
        Arc::new(TracingNotifier),
        OrchestratorConfig::default(),
    ));

    let resumed = resume_monitors(&orchestrator)
        .await
        .context("failed to resume resolution monitors")?;
    if resumed > 0 {
        tracing::info!(resumed, "resolution monitors restored from the store");
    }

    let addr = config.server_addr();
    let app = create_router(AppState {
        orchestrator: Arc::clone(&orchestrator),
    });

    tracing::info!(%addr, "starting claims API server");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    orchestrator.monitors().shutdown();
    tracing::info!("server stopped");
    Ok(())
}

fn load_config() -> ApiConfig {
    match ApiConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load config from environment: {e}. Using defaults.");
            let mut config = ApiConfig::default();
            if let Ok(url) = std::env::var("DATABASE_URL") {
                config.database_url = Some(url);
            }
            if let Ok(port) = std::env::var("PORT") {
                if let Ok(port) = port.parse() {
                    config.port = port;
                }
            }
            config
        }
    }
}

fn init_tracing(log_level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

async fn build_store(config: &ApiConfig) -> anyhow::Result<Arc<dyn ClaimStore>> {
    match &config.database_url {
        Some(url) => {
            let pool = infra_db::create_pool_from_url(url)
                .await
                .context("failed to connect to database")?;
            infra_db::MIGRATOR
                .run(&pool)
                .await
                .context("failed to run database migrations")?;
            tracing::info!("connected to PostgreSQL claim store");
            Ok(Arc::new(PostgresClaimStore::new(pool)))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory claim store");
            Ok(Arc::new(InMemoryClaimStore::new()))
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install ctrl-c handler");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => tracing::error!(error = %e, "failed to install terminate handler"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("shutdown signal received");
}
