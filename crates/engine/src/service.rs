//! `WorkflowService`: the store-backed entry points used by callers
//! (CLI, an API layer): registering workflows, triggering and executing
//! them, cancelling tasks, and reading back task and log history.

use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use db::models::{ExecutionLogRow, TaskRow};
use db::repository::{logs, tasks, workflows};
use db::DbError;
use nodes::NodeOutput;
use notifier::{EventType, Notification};

use crate::executor::{RunSummary, WorkflowEngine};
use crate::models::Workflow;
use crate::trigger::can_trigger;
use crate::EngineError;

/// Result written to a task cancelled through [`WorkflowService::cancel_task`].
pub const CANCELLED_RESULT: &str = "Task cancelled by user";

/// Outcome of [`WorkflowService::trigger`].
#[derive(Debug, Clone, PartialEq)]
pub enum TriggerOutcome {
    /// The gate refused the event; nothing was run or recorded.
    Rejected,
    Completed(RunSummary),
}

pub struct WorkflowService {
    engine: WorkflowEngine,
}

impl WorkflowService {
    pub fn new(engine: WorkflowEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &WorkflowEngine {
        &self.engine
    }

    // -----------------------------------------------------------------------
    // Workflows
    // -----------------------------------------------------------------------

    /// Persist a workflow definition and return it as stored.
    pub async fn register(&self, workflow: &Workflow) -> Result<Workflow, EngineError> {
        let row = workflows::create_workflow(self.engine.pool(), workflow.to_new_row()?).await?;
        info!(workflow_id = %row.id, name = %row.name, "workflow registered");
        Workflow::try_from(row)
    }

    pub async fn load(&self, workflow_id: Uuid) -> Result<Workflow, EngineError> {
        let row = workflows::get_workflow(self.engine.pool(), workflow_id)
            .await
            .map_err(|e| not_found(e, EngineError::WorkflowNotFound(workflow_id)))?;
        Workflow::try_from(row)
    }

    pub async fn list(&self) -> Result<Vec<Workflow>, EngineError> {
        workflows::list_workflows(self.engine.pool())
            .await?
            .into_iter()
            .map(Workflow::try_from)
            .collect()
    }

    pub async fn activate(&self, workflow_id: Uuid) -> Result<Workflow, EngineError> {
        self.set_active(workflow_id, true).await
    }

    pub async fn deactivate(&self, workflow_id: Uuid) -> Result<Workflow, EngineError> {
        self.set_active(workflow_id, false).await
    }

    async fn set_active(&self, workflow_id: Uuid, active: bool) -> Result<Workflow, EngineError> {
        let row = workflows::set_workflow_active(self.engine.pool(), workflow_id, active)
            .await
            .map_err(|e| not_found(e, EngineError::WorkflowNotFound(workflow_id)))?;
        Workflow::try_from(row)
    }

    // -----------------------------------------------------------------------
    // Runs
    // -----------------------------------------------------------------------

    /// Gate an incoming event and, if it qualifies, run the workflow.
    #[instrument(skip(self, payload))]
    pub async fn trigger(
        &self,
        workflow_id: Uuid,
        trigger_type: &str,
        payload: Option<NodeOutput>,
    ) -> Result<TriggerOutcome, EngineError> {
        let workflow = self.load(workflow_id).await?;

        if !can_trigger(trigger_type, payload.as_ref()) {
            info!("trigger rejected");
            return Ok(TriggerOutcome::Rejected);
        }

        let summary = self.engine.run(&workflow, payload).await?;
        Ok(TriggerOutcome::Completed(summary))
    }

    /// Run a stored workflow without gating.
    pub async fn execute(
        &self,
        workflow_id: Uuid,
        payload: Option<NodeOutput>,
    ) -> Result<RunSummary, EngineError> {
        let workflow = self.load(workflow_id).await?;
        self.engine.run(&workflow, payload).await
    }

    // -----------------------------------------------------------------------
    // Tasks and logs
    // -----------------------------------------------------------------------

    /// Move a `RUNNING` task to `CANCELLED` and announce it.
    ///
    /// Has no effect on a traversal that already passed the node.
    #[instrument(skip(self))]
    pub async fn cancel_task(&self, task_id: Uuid) -> Result<TaskRow, EngineError> {
        let pool = self.engine.pool();

        if !tasks::cancel_running_task(pool, task_id, CANCELLED_RESULT).await? {
            let task = tasks::get_task(pool, task_id)
                .await
                .map_err(|e| not_found(e, EngineError::TaskNotFound(task_id)))?;
            return Err(EngineError::TaskAlreadyTerminal {
                id: task.id,
                status: task.status,
            });
        }

        let task = tasks::get_task(pool, task_id).await?;
        info!(node_id = %task.node_id, "task cancelled");
        self.engine.notifier().broadcast(Notification::new(
            EventType::TaskCancelled,
            json!({
                "taskId": task.id,
                "workflowId": task.workflow_id,
                "nodeId": task.node_id,
            }),
        ));

        Ok(task)
    }

    pub async fn tasks_for_workflow(&self, workflow_id: Uuid) -> Result<Vec<TaskRow>, EngineError> {
        Ok(tasks::list_tasks_for_workflow(self.engine.pool(), workflow_id).await?)
    }

    pub async fn logs_for_workflow(
        &self,
        workflow_id: Uuid,
    ) -> Result<Vec<ExecutionLogRow>, EngineError> {
        Ok(logs::list_logs_for_workflow(self.engine.pool(), workflow_id).await?)
    }
}

fn not_found(err: DbError, replacement: EngineError) -> EngineError {
    if err.is_not_found() {
        replacement
    } else {
        err.into()
    }
}
