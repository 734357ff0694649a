use std::sync::Arc;

use opsdeck_agent::{AgentDeps, AgentRunner, AnthropicClient, InMemoryRetrieval};
use opsdeck_core::{AgentError, AppConfig, ConfigError, LoadOptions};
use opsdeck_db::{
    connect_with_settings, migrations, ConversationRepository, DbPool, SqlConversationRepository,
    SqlKnowledgeStore, SqlRunStore,
};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub runner: Arc<AgentRunner>,
    pub conversations: Arc<dyn ConversationRepository>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("llm client initialization failed: {0}")]
    LlmClient(#[source] AgentError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(event_name = "system.bootstrap.start", "starting application bootstrap");

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(event_name = "system.bootstrap.database_connected", "database connection established");

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(event_name = "system.bootstrap.migrations_applied", "database migrations applied");

    // No credential means every pipeline runs its deterministic mock path.
    let llm = match (&config.llm.api_key, config.llm.credential_present()) {
        (Some(api_key), true) => {
            let client =
                AnthropicClient::new(api_key.clone(), &config.llm.model, config.llm.timeout_secs)
                    .map_err(BootstrapError::LlmClient)?;
            Some(Arc::new(client) as Arc<dyn opsdeck_agent::LlmClient>)
        }
        _ => None,
    };
    info!(
        event_name = "system.bootstrap.agent_mode",
        mode = if llm.is_some() { "live" } else { "mock" },
        model = %config.llm.model,
        "agent runtime mode resolved"
    );

    let deps = AgentDeps {
        llm,
        retrieval: Arc::new(InMemoryRetrieval::new()),
        knowledge: Arc::new(SqlKnowledgeStore::new(db_pool.clone())),
    };
    let runner = Arc::new(AgentRunner::new(
        deps,
        Arc::new(SqlRunStore::new(db_pool.clone())),
        config.llm.model.clone(),
        config.llm.pricing(),
    ));
    let conversations: Arc<dyn ConversationRepository> =
        Arc::new(SqlConversationRepository::new(db_pool.clone()));

    Ok(Application { config, db_pool, runner, conversations })
}
