//! Execution log repository functions. Entries are never updated.

use chrono::Utc;
use sqlx::types::Json;
use uuid::Uuid;

use crate::{
    models::{ExecutionLogRow, NewExecutionLog},
    DbError, DbPool,
};

const COLUMNS: &str = "id, workflow_id, task_id, node_id, status, message, data, created_at";

/// Append one log entry.
pub async fn append_log(pool: &DbPool, new: NewExecutionLog) -> Result<ExecutionLogRow, DbError> {
    let row = sqlx::query_as::<_, ExecutionLogRow>(&format!(
        r#"
        INSERT INTO execution_logs
            (id, workflow_id, task_id, node_id, status, message, data, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(Uuid::new_v4())
    .bind(new.workflow_id)
    .bind(new.task_id)
    .bind(new.node_id)
    .bind(new.status)
    .bind(new.message)
    .bind(new.data.map(Json))
    .bind(Utc::now())
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// All log entries of a workflow, oldest first.
pub async fn list_logs_for_workflow(
    pool: &DbPool,
    workflow_id: Uuid,
) -> Result<Vec<ExecutionLogRow>, DbError> {
    let rows = sqlx::query_as::<_, ExecutionLogRow>(&format!(
        "SELECT {COLUMNS} FROM execution_logs WHERE workflow_id = ?1 ORDER BY rowid ASC"
    ))
    .bind(workflow_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// All log entries that reference a task, oldest first.
pub async fn list_logs_for_task(
    pool: &DbPool,
    task_id: Uuid,
) -> Result<Vec<ExecutionLogRow>, DbError> {
    let rows = sqlx::query_as::<_, ExecutionLogRow>(&format!(
        "SELECT {COLUMNS} FROM execution_logs WHERE task_id = ?1 ORDER BY rowid ASC"
    ))
    .bind(task_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
