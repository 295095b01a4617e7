//! Workflow execution engine.
//!
//! `WorkflowEngine` is the central orchestrator:
//! 1. Records a `STARTED` log and announces the run.
//! 2. Locates the trigger node (first `trigger` in node-list order).
//! 3. Walks the graph depth-first in edge-list order, dispatching each node
//!    through the injected `NodeExecutor` and passing its output as the
//!    input of every qualifying successor.
//! 4. Persists one task plus one log entry per visited node via `db`.
//! 5. Records and announces the final outcome.
//!
//! There are no retries: any node failure is terminal for the run.

use std::sync::Arc;

use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use db::models::{Json, LogStatus, NewExecutionLog, NewTask, TaskRow, TaskStatus};
use db::repository::{logs, tasks};
use db::DbPool;
use nodes::{NodeExecutor, NodeOutput};
use notifier::{EventType, Notification, Notifier};

use crate::condition::ConditionEvaluator;
use crate::models::{Workflow, WorkflowNode};
use crate::EngineError;

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Tuning knobs for the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on node visits per run. Diamonds and cycles revisit
    /// nodes, so this is what stops a cyclic graph.
    pub max_node_visits: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_node_visits: 1000,
        }
    }
}

// ---------------------------------------------------------------------------
// Output of a completed run
// ---------------------------------------------------------------------------

/// What a successful run did.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub workflow_id: Uuid,
    /// Node ids in visit order; a node appears once per visit.
    pub visited: Vec<String>,
    /// Task created for each visit, aligned with `visited`.
    pub task_ids: Vec<Uuid>,
}

impl RunSummary {
    fn new(workflow_id: Uuid) -> Self {
        Self {
            workflow_id,
            visited: Vec::new(),
            task_ids: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// WorkflowEngine
// ---------------------------------------------------------------------------

/// Runs workflows against a store, a node executor and a notifier.
///
/// Holds no per-run state, so one engine can serve concurrent runs.
pub struct WorkflowEngine {
    pool: DbPool,
    executor: Arc<dyn NodeExecutor>,
    notifier: Arc<dyn Notifier>,
    conditions: ConditionEvaluator,
    config: EngineConfig,
}

impl WorkflowEngine {
    pub fn new(
        pool: DbPool,
        executor: Arc<dyn NodeExecutor>,
        notifier: Arc<dyn Notifier>,
        config: EngineConfig,
    ) -> Self {
        Self {
            pool,
            executor,
            notifier,
            conditions: ConditionEvaluator,
            config,
        }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    /// Run `workflow` from its trigger node.
    ///
    /// `payload` becomes the trigger node's input (an empty mapping when
    /// absent).
    ///
    /// # Errors
    /// Missing trigger, node failure, visit cap, or database problems. Each
    /// is recorded as a `FAILED` workflow log and a `WORKFLOW_FAILED`
    /// notification before being returned.
    #[instrument(skip(self, workflow, payload), fields(workflow_id = %workflow.id))]
    pub async fn run(
        &self,
        workflow: &Workflow,
        payload: Option<NodeOutput>,
    ) -> Result<RunSummary, EngineError> {
        let mut started =
            NewExecutionLog::workflow(workflow.id, LogStatus::Started, "Workflow execution started");
        if let Some(payload) = &payload {
            started = started.with_data(Value::Object(payload.clone()));
        }
        logs::append_log(&self.pool, started).await?;

        info!(name = %workflow.name, "workflow execution started");
        self.announce(EventType::WorkflowStarted, workflow, None);

        match self.execute(workflow, payload.unwrap_or_default()).await {
            Ok(summary) => {
                info!(visited = summary.visited.len(), "workflow execution completed");
                self.announce(EventType::WorkflowCompleted, workflow, None);
                Ok(summary)
            }
            Err(err) => {
                error!(error = %err, "workflow execution failed");
                let failed = NewExecutionLog::workflow(
                    workflow.id,
                    LogStatus::Failed,
                    format!("Workflow execution failed: {err}"),
                );
                if let Err(log_err) = logs::append_log(&self.pool, failed).await {
                    error!(error = %log_err, "could not record workflow failure");
                }
                self.announce(EventType::WorkflowFailed, workflow, Some(&err));
                Err(err)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Internal: traversal
    // -----------------------------------------------------------------------

    /// Everything between the `STARTED` and the final log; any error here
    /// fails the run.
    async fn execute(
        &self,
        workflow: &Workflow,
        input: NodeOutput,
    ) -> Result<RunSummary, EngineError> {
        let trigger = workflow.trigger_node().ok_or(EngineError::MissingTrigger)?;

        let mut summary = RunSummary::new(workflow.id);
        let mut stack: Vec<(&WorkflowNode, NodeOutput)> = vec![(trigger, input)];

        while let Some((node, input)) = stack.pop() {
            if summary.visited.len() >= self.config.max_node_visits {
                return Err(EngineError::VisitLimitExceeded {
                    limit: self.config.max_node_visits,
                });
            }

            let (task_id, output) = self.visit(workflow, node, &input).await?;
            summary.visited.push(node.node_id.clone());
            summary.task_ids.push(task_id);

            // Reverse so the first qualifying edge is popped first.
            let successors = self.successors(workflow, node, &output);
            for target in successors.into_iter().rev() {
                stack.push((target, output.clone()));
            }
        }

        logs::append_log(
            &self.pool,
            NewExecutionLog::workflow(
                workflow.id,
                LogStatus::Completed,
                "Workflow execution completed successfully",
            ),
        )
        .await?;

        Ok(summary)
    }

    /// Targets of `node`'s outgoing edges whose condition holds against
    /// `output`, in edge-list order. Edges to unknown nodes are skipped.
    fn successors<'w>(
        &self,
        workflow: &'w Workflow,
        node: &WorkflowNode,
        output: &NodeOutput,
    ) -> Vec<&'w WorkflowNode> {
        workflow
            .outgoing(&node.node_id)
            .filter_map(|edge| {
                let Some(target) = workflow.node(&edge.target_node_id) else {
                    debug!(target = %edge.target_node_id, "skipping edge to unknown node");
                    return None;
                };
                self.conditions
                    .evaluate(edge.condition.as_deref(), output)
                    .then_some(target)
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Internal: a single node visit
    // -----------------------------------------------------------------------

    /// Create the node's task, execute it and persist the outcome.
    async fn visit(
        &self,
        workflow: &Workflow,
        node: &WorkflowNode,
        input: &NodeOutput,
    ) -> Result<(Uuid, NodeOutput), EngineError> {
        let mut task = tasks::create_task(
            &self.pool,
            NewTask {
                workflow_id: workflow.id,
                node_id: node.node_id.clone(),
                name: node.label.clone(),
                task_type: node.kind.to_string(),
                configuration: node.configuration.clone(),
            },
        )
        .await?;

        info!(node_id = %node.node_id, node_type = %node.kind, "executing node");

        match self.complete(&mut task, node, input).await {
            Ok(output) => Ok((task.id, output)),
            Err(err) => {
                error!(node_id = %node.node_id, error = %err, "node failed");
                self.record_failure(&mut task, &err).await;
                Err(err)
            }
        }
    }

    async fn complete(
        &self,
        task: &mut TaskRow,
        node: &WorkflowNode,
        input: &NodeOutput,
    ) -> Result<NodeOutput, EngineError> {
        let mut output = self
            .executor
            .execute(node, input)
            .await
            .map_err(|source| EngineError::NodeFailed {
                node_id: node.node_id.clone(),
                source,
            })?;

        let now = Utc::now();
        output.insert("nodeId".into(), json!(node.node_id));
        output.insert("nodeType".into(), json!(node.kind.as_str()));
        output.insert("timestamp".into(), json!(now.timestamp_millis()));

        task.status = TaskStatus::Completed;
        task.result = Some(Json(Value::Object(output.clone())));
        task.completed_at = Some(now);
        if !tasks::update_task(&self.pool, task).await? {
            warn!(task_id = %task.id, "task left RUNNING during execution, keeping its status");
        }

        logs::append_log(
            &self.pool,
            NewExecutionLog::node(task, LogStatus::Completed, "Node executed successfully")
                .with_data(Value::Object(output.clone())),
        )
        .await?;

        Ok(output)
    }

    /// Mark the task `FAILED` and log it. Storage problems here are only
    /// logged; the original error is what the caller sees.
    async fn record_failure(&self, task: &mut TaskRow, err: &EngineError) {
        let message = format!("Node execution failed: {err}");

        task.status = TaskStatus::Failed;
        task.result = Some(Json(Value::String(message.clone())));
        task.completed_at = Some(Utc::now());
        match tasks::update_task(&self.pool, task).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(task_id = %task.id, "task left RUNNING during execution, keeping its status")
            }
            Err(db_err) => error!(task_id = %task.id, error = %db_err, "could not mark task failed"),
        }

        let entry = NewExecutionLog::node(task, LogStatus::Failed, message);
        if let Err(db_err) = logs::append_log(&self.pool, entry).await {
            error!(task_id = %task.id, error = %db_err, "could not record node failure");
        }
    }

    // -----------------------------------------------------------------------
    // Internal: notifications
    // -----------------------------------------------------------------------

    fn announce(&self, event: EventType, workflow: &Workflow, err: Option<&EngineError>) {
        let mut data = json!({
            "workflowId": workflow.id,
            "workflowName": workflow.name,
        });
        if let Some(err) = err {
            data["error"] = json!(err.to_string());
        }
        self.notifier.broadcast(Notification::new(event, data));
    }
}
