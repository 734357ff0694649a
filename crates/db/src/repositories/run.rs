//! Durable store for run records and token usage events.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, Row};
use uuid::Uuid;

use opsdeck_core::{
    AgentId, PersistenceSink, RunRecord, RunStatus, StepRecord, StorageError, TokenUsageEvent,
};

use super::RepositoryError;
use crate::DbPool;

pub struct SqlRunStore {
    pool: DbPool,
}

impl SqlRunStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn insert_run(&self, mut record: RunRecord) -> Result<RunRecord, RepositoryError> {
        if record.id.is_none() {
            record.id = Some(Uuid::new_v4().to_string());
        }
        let steps_json = serde_json::to_string(&record.steps)
            .map_err(|e| RepositoryError::Decode(format!("steps not serializable: {e}")))?;

        sqlx::query(
            r#"
            INSERT INTO agent_runs (
                id, agent_id, conversation_id, status, duration_ms, error,
                steps, tokens_used, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(record.id.as_deref())
        .bind(record.agent.as_str())
        .bind(record.conversation_id.as_deref())
        .bind(run_status_str(record.status))
        .bind(record.duration_ms as i64)
        .bind(record.error.as_deref())
        .bind(steps_json)
        .bind(record.tokens_used as i64)
        .bind(record.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    async fn insert_usage(&self, mut event: TokenUsageEvent) -> Result<(), RepositoryError> {
        if event.id.is_none() {
            event.id = Some(Uuid::new_v4().to_string());
        }

        sqlx::query(
            r#"
            INSERT INTO token_usage (
                id, model, input_tokens, output_tokens, total_tokens,
                cost_usd, conversation_id, occurred_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.id.as_deref())
        .bind(&event.model)
        .bind(event.input_tokens as i64)
        .bind(event.output_tokens as i64)
        .bind(event.total_tokens as i64)
        .bind(event.cost_usd)
        .bind(event.conversation_id.as_deref())
        .bind(event.occurred_at.to_rfc3339())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Most recent runs first.
    pub async fn recent_runs(&self, limit: i64) -> Result<Vec<RunRecord>, RepositoryError> {
        let rows = sqlx::query(
            r#"
            SELECT id, agent_id, conversation_id, status, duration_ms, error,
                   steps, tokens_used, created_at
            FROM agent_runs
            ORDER BY created_at DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(run_record_from_row).collect()
    }

    /// Total tokens attributed to one conversation across all usage events.
    pub async fn tokens_for_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<i64, RepositoryError> {
        let row = sqlx::query(
            "SELECT IFNULL(SUM(total_tokens), 0) AS total
             FROM token_usage WHERE conversation_id = ?",
        )
        .bind(conversation_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.get::<i64, _>("total"))
    }
}

#[async_trait]
impl PersistenceSink for SqlRunStore {
    async fn save_run(&self, record: RunRecord) -> Result<RunRecord, StorageError> {
        Ok(self.insert_run(record).await?)
    }

    async fn record_token_usage(&self, event: TokenUsageEvent) -> Result<(), StorageError> {
        Ok(self.insert_usage(event).await?)
    }
}

fn run_status_str(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Completed => "completed",
        RunStatus::Failed => "failed",
    }
}

fn run_record_from_row(row: &SqliteRow) -> Result<RunRecord, RepositoryError> {
    let agent_id: String = row.try_get("agent_id")?;
    let status: String = row.try_get("status")?;
    let steps_json: String = row.try_get("steps")?;
    let created_at: String = row.try_get("created_at")?;

    let steps: Vec<StepRecord> = serde_json::from_str(&steps_json)
        .map_err(|e| RepositoryError::Decode(format!("invalid steps json: {e}")))?;

    Ok(RunRecord {
        id: Some(row.try_get("id")?),
        agent: AgentId::from_str(&agent_id)
            .map_err(|_| RepositoryError::Decode(format!("invalid agent_id: {agent_id}")))?,
        conversation_id: row.try_get("conversation_id")?,
        status: match status.as_str() {
            "completed" => RunStatus::Completed,
            "failed" => RunStatus::Failed,
            other => {
                return Err(RepositoryError::Decode(format!("invalid run status: {other}")))
            }
        },
        duration_ms: row.try_get::<i64, _>("duration_ms")? as u64,
        error: row.try_get("error")?,
        steps,
        tokens_used: row.try_get::<i64, _>("tokens_used")? as u64,
        created_at: parse_timestamp("created_at", created_at)?,
    })
}

pub(crate) fn parse_timestamp(
    column: &str,
    value: String,
) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(&value)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Decode(format!("invalid timestamp in `{column}`: {e}")))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use opsdeck_core::{
        AgentId, PersistenceSink, RunRecord, RunStatus, StepRecord, TokenUsageEvent,
    };

    use super::SqlRunStore;
    use crate::{connect_with_settings, migrations, DbPool};

    #[tokio::test]
    async fn save_run_assigns_id_and_round_trips_steps() {
        let pool = setup_pool().await;
        let store = SqlRunStore::new(pool.clone());

        let record = RunRecord {
            id: None,
            agent: AgentId::Doc,
            conversation_id: None,
            status: RunStatus::Completed,
            duration_ms: 42,
            error: None,
            steps: vec![
                StepRecord::completed("retrieve_docs", 12, Some("query"), Some("Retrieved 1 documents")),
                StepRecord::completed("generate_response", 30, Some("Query: query"), Some("answer")),
            ],
            tokens_used: 265,
            created_at: Utc::now(),
        };

        let saved = store.save_run(record.clone()).await.expect("save run");
        assert!(saved.id.is_some());

        let recent = store.recent_runs(10).await.expect("recent runs");
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].agent, AgentId::Doc);
        assert_eq!(recent[0].steps, record.steps);
        assert_eq!(recent[0].tokens_used, 265);

        pool.close().await;
    }

    #[tokio::test]
    async fn failed_runs_keep_their_error_text() {
        let pool = setup_pool().await;
        let store = SqlRunStore::new(pool.clone());

        let record = RunRecord {
            id: None,
            agent: AgentId::Incident,
            conversation_id: None,
            status: RunStatus::Failed,
            duration_ms: 7,
            error: Some("provider call failed: rate limited".to_string()),
            steps: Vec::new(),
            tokens_used: 0,
            created_at: Utc::now(),
        };

        store.save_run(record).await.expect("save run");

        let recent = store.recent_runs(1).await.expect("recent runs");
        assert_eq!(recent[0].status, RunStatus::Failed);
        assert_eq!(recent[0].error.as_deref(), Some("provider call failed: rate limited"));

        pool.close().await;
    }

    #[tokio::test]
    async fn usage_events_sum_per_conversation() {
        let pool = setup_pool().await;
        let store = SqlRunStore::new(pool.clone());

        for (input, output) in [(300u32, 50u32), (250, 20)] {
            store
                .record_token_usage(TokenUsageEvent {
                    id: None,
                    model: "claude-3-5-sonnet-20241022".to_string(),
                    input_tokens: input,
                    output_tokens: output,
                    total_tokens: u64::from(input) + u64::from(output),
                    cost_usd: 0.0,
                    conversation_id: Some("conv-1".to_string()),
                    occurred_at: Utc::now(),
                })
                .await
                .expect("record usage");
        }

        let total = store.tokens_for_conversation("conv-1").await.expect("sum");
        assert_eq!(total, 620);
        let other = store.tokens_for_conversation("conv-2").await.expect("sum");
        assert_eq!(other, 0);

        pool.close().await;
    }

    async fn setup_pool() -> DbPool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30)
            .await
            .expect("connect test pool");
        migrations::run_pending(&pool).await.expect("run migrations");
        pool
    }
}
