use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;

use servicegate_api::{AppState, build_app, config::ApiConfig};
use servicegate_auth::{ScopeEvaluator, ServiceCatalog};
use servicegate_infra::{PgQueryExecutor, QueryExecutor, ScriptedQueryExecutor};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    servicegate_observability::init();

    let config = ApiConfig::from_env()?;
    let catalog = ServiceCatalog::standard().context("invalid service policy")?;

    let executor: Arc<dyn QueryExecutor> = match &config.database_url {
        Some(url) => {
            let pool = PgPool::connect(url)
                .await
                .context("failed to connect to Postgres")?;
            Arc::new(PgQueryExecutor::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; tenant lookups will find no organizations");
            Arc::new(ScriptedQueryExecutor::new())
        }
    };

    let app = build_app(AppState::new(catalog, ScopeEvaluator::default(), executor));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
