//! Workflow CRUD operations.

use chrono::Utc;
use sqlx::types::Json;
use uuid::Uuid;

use crate::{
    models::{NewWorkflow, WorkflowRow},
    DbError, DbPool,
};

const COLUMNS: &str = "id, name, description, active, definition, created_at, updated_at";

/// Insert a new workflow into the database.
///
/// `definition` must be the JSON produced by serialising the domain graph
/// (nodes and edges) from the `engine` crate.
pub async fn create_workflow(pool: &DbPool, new: NewWorkflow) -> Result<WorkflowRow, DbError> {
    let now = Utc::now();

    let row = sqlx::query_as::<_, WorkflowRow>(&format!(
        r#"
        INSERT INTO workflows (id, name, description, active, definition, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(new.id)
    .bind(new.name)
    .bind(new.description)
    .bind(new.active)
    .bind(Json(new.definition))
    .bind(now)
    .fetch_one(pool)
    .await?;

    Ok(row)
}

/// Fetch a single workflow by its primary key.
pub async fn get_workflow(pool: &DbPool, id: Uuid) -> Result<WorkflowRow, DbError> {
    let row = sqlx::query_as::<_, WorkflowRow>(&format!(
        "SELECT {COLUMNS} FROM workflows WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound("workflows"))?;

    Ok(row)
}

/// Return all workflows ordered by creation time (newest first).
pub async fn list_workflows(pool: &DbPool) -> Result<Vec<WorkflowRow>, DbError> {
    let rows = sqlx::query_as::<_, WorkflowRow>(&format!(
        "SELECT {COLUMNS} FROM workflows ORDER BY created_at DESC, rowid DESC"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Return only active workflows, newest first.
pub async fn list_active_workflows(pool: &DbPool) -> Result<Vec<WorkflowRow>, DbError> {
    let rows = sqlx::query_as::<_, WorkflowRow>(&format!(
        "SELECT {COLUMNS} FROM workflows WHERE active = TRUE ORDER BY created_at DESC, rowid DESC"
    ))
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Flip the `active` flag and bump `updated_at`.
pub async fn set_workflow_active(
    pool: &DbPool,
    id: Uuid,
    active: bool,
) -> Result<WorkflowRow, DbError> {
    let row = sqlx::query_as::<_, WorkflowRow>(&format!(
        r#"
        UPDATE workflows SET active = ?1, updated_at = ?2
        WHERE id = ?3
        RETURNING {COLUMNS}
        "#
    ))
    .bind(active)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(pool)
    .await?
    .ok_or(DbError::NotFound("workflows"))?;

    Ok(row)
}

/// Permanently delete a workflow by its primary key.
///
/// Returns `DbError::NotFound` if no row was deleted. Tasks and logs of the
/// workflow are kept.
pub async fn delete_workflow(pool: &DbPool, id: Uuid) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM workflows WHERE id = ?1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound("workflows"));
    }

    Ok(())
}
