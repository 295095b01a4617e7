//! Task repository functions.

use chrono::Utc;
use sqlx::types::Json;
use uuid::Uuid;

use crate::{
    models::{NewTask, TaskRow, TaskStatus},
    DbError, DbPool,
};

const COLUMNS: &str = "id, workflow_id, node_id, name, task_type, configuration, status, \
                       result, created_at, started_at, completed_at";

/// Insert a task in `RUNNING` state with `created_at = started_at = now`.
pub async fn create_task(pool: &DbPool, new: NewTask) -> Result<TaskRow, DbError> {
    let id = Uuid::new_v4();
    let now = Utc::now();
    let configuration = (!new.configuration.is_null()).then(|| Json(new.configuration));

    let row = sqlx::query_as::<_, TaskRow>(&format!(
        r#"
        INSERT INTO tasks
            (id, workflow_id, node_id, name, task_type, configuration, status, created_at, started_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(id)
    .bind(new.workflow_id)
    .bind(new.node_id)
    .bind(new.name)
    .bind(new.task_type)
    .bind(configuration)
    .bind(TaskStatus::Running)
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Fetch a single task by its primary key.
pub async fn get_task(pool: &DbPool, id: Uuid) -> Result<TaskRow, DbError> {
    let row = sqlx::query_as::<_, TaskRow>(&format!("SELECT {COLUMNS} FROM tasks WHERE id = ?1"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound("tasks"))?;

    Ok(row)
}

/// Persist the final `status`, `result` and `completed_at` of a `RUNNING`
/// task.
///
/// Returns `false` (and changes nothing) when the task has already left
/// `RUNNING`, e.g. because it was cancelled while its node was executing.
pub async fn update_task(pool: &DbPool, task: &TaskRow) -> Result<bool, DbError> {
    let result = sqlx::query(
        r#"
        UPDATE tasks
        SET status = ?1, result = ?2, completed_at = ?3
        WHERE id = ?4 AND status = ?5
        "#,
    )
    .bind(task.status)
    .bind(task.result.clone())
    .bind(task.completed_at)
    .bind(task.id)
    .bind(TaskStatus::Running)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// Atomically move a `RUNNING` task to `CANCELLED`.
///
/// Returns `false` (and changes nothing) when the task is already terminal
/// or does not exist.
pub async fn cancel_running_task(
    pool: &DbPool,
    id: Uuid,
    reason: &str,
) -> Result<bool, DbError> {
    let result = sqlx::query(
        r#"
        UPDATE tasks
        SET status = ?1, result = ?2, completed_at = ?3
        WHERE id = ?4 AND status = ?5
        "#,
    )
    .bind(TaskStatus::Cancelled)
    .bind(Json(serde_json::Value::String(reason.to_owned())))
    .bind(Utc::now())
    .bind(id)
    .bind(TaskStatus::Running)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() == 1)
}

/// All tasks of a workflow in creation order.
pub async fn list_tasks_for_workflow(
    pool: &DbPool,
    workflow_id: Uuid,
) -> Result<Vec<TaskRow>, DbError> {
    let rows = sqlx::query_as::<_, TaskRow>(&format!(
        "SELECT {COLUMNS} FROM tasks WHERE workflow_id = ?1 ORDER BY rowid ASC"
    ))
    .bind(workflow_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// All tasks currently in `status`, in creation order.
pub async fn list_tasks_by_status(
    pool: &DbPool,
    status: TaskStatus,
) -> Result<Vec<TaskRow>, DbError> {
    let rows = sqlx::query_as::<_, TaskRow>(&format!(
        "SELECT {COLUMNS} FROM tasks WHERE status = ?1 ORDER BY rowid ASC"
    ))
    .bind(status)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
