//! Engine tests against an in-memory SQLite store.
//!
//! Node behaviour comes from `nodes::mock::ScriptedExecutor` (the built-in
//! executor with zero latency, plus per-node overrides and failures), and a
//! recording notifier captures every broadcast.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};

use db::models::{LogStatus, TaskStatus};
use db::pool::create_memory_pool;
use db::repository::{logs, tasks};
use db::DbPool;
use nodes::mock::ScriptedExecutor;
use nodes::{NodeError, NodeExecutor, NodeOutput};
use notifier::{EventType, Notification, Notifier};

use crate::service::CANCELLED_RESULT;
use crate::{
    sample_workflow, EngineConfig, EngineError, Workflow, WorkflowEdge, WorkflowEngine,
    WorkflowNode,
};

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

#[derive(Default)]
struct RecordingNotifier {
    seen: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    fn events(&self) -> Vec<EventType> {
        self.seen.lock().unwrap().iter().map(|n| n.event).collect()
    }

    fn last(&self) -> Notification {
        self.seen.lock().unwrap().last().cloned().expect("no notifications")
    }
}

impl Notifier for RecordingNotifier {
    fn broadcast(&self, notification: Notification) {
        self.seen.lock().unwrap().push(notification);
    }
}

struct Harness {
    pool: DbPool,
    engine: WorkflowEngine,
    executor: Arc<ScriptedExecutor>,
    notifier: Arc<RecordingNotifier>,
}

async fn harness(executor: ScriptedExecutor) -> Harness {
    harness_with(executor, EngineConfig::default()).await
}

async fn harness_with(executor: ScriptedExecutor, config: EngineConfig) -> Harness {
    let pool = create_memory_pool().await.unwrap();
    let executor = Arc::new(executor);
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = WorkflowEngine::new(
        pool.clone(),
        executor.clone(),
        notifier.clone(),
        config,
    );
    Harness {
        pool,
        engine,
        executor,
        notifier,
    }
}

fn node(id: &str, kind: &str) -> WorkflowNode {
    WorkflowNode::new(id, kind, id, Value::Null)
}

fn edge(from: &str, to: &str) -> WorkflowEdge {
    WorkflowEdge::new(from, to)
}

fn payload(value: Value) -> NodeOutput {
    value.as_object().cloned().unwrap_or_default()
}

// ============================================================
// Traversal order
// ============================================================

#[tokio::test]
async fn sample_false_branch_skips_hr_approval() {
    let h = harness(ScriptedExecutor::default()).await;
    let wf = sample_workflow();

    let summary = h.engine.run(&wf, None).await.unwrap();

    assert_eq!(summary.visited, vec!["start-1", "approval-1", "condition-1", "end-1"]);
    assert_eq!(h.executor.call_count("hr-approval-1"), 0);
}

#[tokio::test]
async fn sample_true_branch_visits_hr_approval_before_end() {
    let exec = ScriptedExecutor::default().with_output("condition-1", "conditionResult", json!(true));
    let h = harness(exec).await;

    let summary = h.engine.run(&sample_workflow(), None).await.unwrap();

    assert_eq!(
        summary.visited,
        vec!["start-1", "approval-1", "condition-1", "hr-approval-1", "end-1"]
    );
}

#[tokio::test]
async fn senior_application_reaches_hr_approval() {
    let h = harness(ScriptedExecutor::default()).await;
    let form = payload(json!({ "formData": { "position": "Senior" } }));

    let summary = h.engine.run(&sample_workflow(), Some(form)).await.unwrap();

    assert_eq!(
        summary.visited,
        vec!["start-1", "approval-1", "condition-1", "hr-approval-1", "end-1"]
    );
}

#[tokio::test]
async fn junior_application_skips_hr_approval() {
    let h = harness(ScriptedExecutor::default()).await;
    let form = payload(json!({ "formData": { "position": "Junior" } }));

    let summary = h.engine.run(&sample_workflow(), Some(form)).await.unwrap();

    assert_eq!(summary.visited, vec!["start-1", "approval-1", "condition-1", "end-1"]);
}

#[tokio::test]
async fn branches_are_walked_depth_first_in_edge_order() {
    //      t
    //    /   \
    //   a     b
    //   |     |
    //   a2    b2
    let wf = Workflow::new(
        "dfs",
        vec![
            node("t", "trigger"),
            node("a", "action"),
            node("b", "action"),
            node("a2", "end"),
            node("b2", "end"),
        ],
        vec![edge("t", "a"), edge("t", "b"), edge("a", "a2"), edge("b", "b2")],
    );
    let h = harness(ScriptedExecutor::default()).await;

    let summary = h.engine.run(&wf, None).await.unwrap();

    assert_eq!(summary.visited, vec!["t", "a", "a2", "b", "b2"]);
    assert_eq!(summary.task_ids.len(), 5);
}

#[tokio::test]
async fn first_trigger_in_node_order_is_used() {
    let wf = Workflow::new(
        "two-triggers",
        vec![node("x", "action"), node("t1", "trigger"), node("t2", "trigger")],
        vec![edge("t1", "x"), edge("t2", "x")],
    );
    let h = harness(ScriptedExecutor::default()).await;

    let summary = h.engine.run(&wf, None).await.unwrap();

    assert_eq!(summary.visited, vec!["t1", "x"]);
}

#[tokio::test]
async fn each_node_receives_its_predecessors_output() {
    let wf = Workflow::new(
        "chain",
        vec![node("t", "trigger"), node("a", "action")],
        vec![edge("t", "a")],
    );
    let h = harness(ScriptedExecutor::default()).await;

    h.engine
        .run(&wf, Some(payload(json!({ "formData": { "name": "Ada" } }))))
        .await
        .unwrap();

    let calls = h.executor.call_log();
    let calls = calls.lock().unwrap();
    assert_eq!(calls[0].input["formData"]["name"], "Ada");
    assert_eq!(calls[1].input["nodeId"], "t");
    assert_eq!(calls[1].input["triggerData"]["formData"]["name"], "Ada");
}

// ============================================================
// Edge handling
// ============================================================

#[tokio::test]
async fn diamond_target_is_visited_once_per_incoming_path() {
    let wf = Workflow::new(
        "diamond",
        vec![node("t", "trigger"), node("b", "action"), node("c", "action"), node("d", "end")],
        vec![edge("t", "b"), edge("t", "c"), edge("b", "d"), edge("c", "d")],
    );
    let h = harness(ScriptedExecutor::default()).await;

    let summary = h.engine.run(&wf, None).await.unwrap();

    assert_eq!(summary.visited, vec!["t", "b", "d", "c", "d"]);
    assert_eq!(h.executor.call_count("d"), 2);
}

#[tokio::test]
async fn dangling_edges_and_false_conditions_are_not_followed() {
    let wf = Workflow::new(
        "dangling",
        vec![node("t", "trigger"), node("a", "action"), node("b", "action")],
        vec![edge("t", "ghost"), edge("t", "a").when("false"), edge("t", "b")],
    );
    let h = harness(ScriptedExecutor::default()).await;

    let summary = h.engine.run(&wf, None).await.unwrap();

    assert_eq!(summary.visited, vec!["t", "b"]);
}

#[tokio::test]
async fn cycle_is_stopped_by_the_visit_cap() {
    let wf = Workflow::new(
        "loop",
        vec![node("t", "trigger"), node("a", "action")],
        vec![edge("t", "a"), edge("a", "a")],
    );
    let h = harness_with(ScriptedExecutor::default(), EngineConfig { max_node_visits: 5 }).await;

    let err = h.engine.run(&wf, None).await.unwrap_err();

    assert!(matches!(err, EngineError::VisitLimitExceeded { limit: 5 }));
    assert_eq!(h.executor.call_count("a"), 4);

    // Every visited node completed; only the run failed.
    let stored = tasks::list_tasks_for_workflow(&h.pool, wf.id).await.unwrap();
    assert_eq!(stored.len(), 5);
    assert!(stored.iter().all(|t| t.status == TaskStatus::Completed));
    assert_eq!(h.notifier.events().last(), Some(&EventType::WorkflowFailed));
}

// ============================================================
// Persistence
// ============================================================

#[tokio::test]
async fn successful_run_persists_completed_tasks_and_logs() {
    let h = harness(ScriptedExecutor::default()).await;
    let wf = sample_workflow();
    let data = json!({ "formData": { "position": "Junior" } });

    h.engine.run(&wf, Some(payload(data.clone()))).await.unwrap();

    let stored = tasks::list_tasks_for_workflow(&h.pool, wf.id).await.unwrap();
    assert_eq!(stored.len(), 4);
    for task in &stored {
        assert_eq!(task.status, TaskStatus::Completed);
        assert!(task.completed_at.is_some());
        let result = &task.result.as_ref().unwrap().0;
        assert_eq!(result["nodeId"], task.node_id.as_str());
        assert_eq!(result["nodeType"], task.task_type.as_str());
        assert!(result["timestamp"].is_i64());
    }
    assert_eq!(stored[0].name, "Application Received");
    assert_eq!(stored[0].configuration.as_ref().unwrap().0["triggerType"], "form");

    let entries = logs::list_logs_for_workflow(&h.pool, wf.id).await.unwrap();
    let shape: Vec<_> = entries
        .iter()
        .map(|e| (e.status, e.node_id.clone(), e.message.as_str()))
        .collect();
    assert_eq!(
        shape,
        vec![
            (LogStatus::Started, None, "Workflow execution started"),
            (LogStatus::Completed, Some("start-1".into()), "Node executed successfully"),
            (LogStatus::Completed, Some("approval-1".into()), "Node executed successfully"),
            (LogStatus::Completed, Some("condition-1".into()), "Node executed successfully"),
            (LogStatus::Completed, Some("end-1".into()), "Node executed successfully"),
            (LogStatus::Completed, None, "Workflow execution completed successfully"),
        ]
    );
    assert_eq!(entries[0].data.as_ref().unwrap().0, data);
    assert_eq!(entries[1].task_id, Some(stored[0].id));
}

#[tokio::test]
async fn missing_trigger_fails_before_any_task() {
    let wf = Workflow::new("no-trigger", vec![node("a", "action")], vec![]);
    let h = harness(ScriptedExecutor::default()).await;

    let err = h.engine.run(&wf, None).await.unwrap_err();

    assert!(matches!(err, EngineError::MissingTrigger));
    assert!(tasks::list_tasks_for_workflow(&h.pool, wf.id).await.unwrap().is_empty());

    let entries = logs::list_logs_for_workflow(&h.pool, wf.id).await.unwrap();
    let statuses: Vec<_> = entries.iter().map(|e| e.status).collect();
    assert_eq!(statuses, vec![LogStatus::Started, LogStatus::Failed]);
    assert!(entries[1].message.starts_with("Workflow execution failed: "));
    assert_eq!(
        h.notifier.events(),
        vec![EventType::WorkflowStarted, EventType::WorkflowFailed]
    );
}

#[tokio::test]
async fn node_failure_marks_task_failed_and_stops_the_run() {
    // t → a → b, and t → c. `a` fails: neither `b` nor `c` may run.
    let wf = Workflow::new(
        "failing",
        vec![node("t", "trigger"), node("a", "action"), node("b", "end"), node("c", "end")],
        vec![edge("t", "a"), edge("a", "b"), edge("t", "c")],
    );
    let h = harness(ScriptedExecutor::default().failing("a", "smtp unreachable")).await;

    let err = h.engine.run(&wf, None).await.unwrap_err();

    assert!(matches!(&err, EngineError::NodeFailed { node_id, .. } if node_id == "a"));
    assert_eq!(h.executor.visited(), vec!["t", "a"]);

    let stored = tasks::list_tasks_for_workflow(&h.pool, wf.id).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0].status, TaskStatus::Completed);
    assert_eq!(stored[1].status, TaskStatus::Failed);
    assert!(stored[1].completed_at.is_some());
    let result = stored[1].result.as_ref().unwrap().0.as_str().unwrap().to_owned();
    assert!(result.starts_with("Node execution failed: "));
    assert!(result.contains("smtp unreachable"));

    let failed = logs::list_logs_for_task(&h.pool, stored[1].id).await.unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].status, LogStatus::Failed);

    let entries = logs::list_logs_for_workflow(&h.pool, wf.id).await.unwrap();
    let last = entries.last().unwrap();
    assert!(last.is_workflow_level());
    assert_eq!(last.status, LogStatus::Failed);
}

/// Cancels every `RUNNING` task while `node_id` executes, the way a
/// concurrent `cancel_task` call would.
struct CancelDuring {
    node_id: &'static str,
    pool: DbPool,
    inner: ScriptedExecutor,
}

#[async_trait]
impl NodeExecutor for CancelDuring {
    async fn execute(
        &self,
        node: &WorkflowNode,
        input: &NodeOutput,
    ) -> Result<NodeOutput, NodeError> {
        if node.node_id == self.node_id {
            for task in tasks::list_tasks_by_status(&self.pool, TaskStatus::Running).await.unwrap() {
                tasks::cancel_running_task(&self.pool, task.id, CANCELLED_RESULT)
                    .await
                    .unwrap();
            }
        }
        self.inner.execute(node, input).await
    }
}

async fn run_cancelling(node_id: &'static str, inner: ScriptedExecutor, wf: &Workflow) -> DbPool {
    let pool = create_memory_pool().await.unwrap();
    let executor = CancelDuring {
        node_id,
        pool: pool.clone(),
        inner,
    };
    let engine = WorkflowEngine::new(
        pool.clone(),
        Arc::new(executor),
        Arc::new(RecordingNotifier::default()),
        EngineConfig::default(),
    );
    let _ = engine.run(wf, None).await;
    pool
}

#[tokio::test]
async fn task_cancelled_mid_execution_stays_cancelled() {
    let wf = sample_workflow();
    let pool = run_cancelling("approval-1", ScriptedExecutor::default(), &wf).await;

    let stored = tasks::list_tasks_for_workflow(&pool, wf.id).await.unwrap();
    let statuses: Vec<_> = stored.iter().map(|t| (t.node_id.as_str(), t.status)).collect();
    assert_eq!(
        statuses,
        vec![
            ("start-1", TaskStatus::Completed),
            ("approval-1", TaskStatus::Cancelled),
            ("condition-1", TaskStatus::Completed),
            ("end-1", TaskStatus::Completed),
        ]
    );
    assert_eq!(stored[1].result.as_ref().unwrap().0, json!(CANCELLED_RESULT));
}

#[tokio::test]
async fn failure_after_cancellation_keeps_the_task_cancelled() {
    let wf = sample_workflow();
    let failing = ScriptedExecutor::default().failing("approval-1", "approver on leave");
    let pool = run_cancelling("approval-1", failing, &wf).await;

    let stored = tasks::list_tasks_for_workflow(&pool, wf.id).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[1].status, TaskStatus::Cancelled);

    let entries = logs::list_logs_for_task(&pool, stored[1].id).await.unwrap();
    assert_eq!(entries[0].status, LogStatus::Failed);
}

// ============================================================
// Notifications
// ============================================================

#[tokio::test]
async fn successful_run_announces_start_and_completion() {
    let h = harness(ScriptedExecutor::default()).await;
    let wf = sample_workflow();

    h.engine.run(&wf, None).await.unwrap();

    assert_eq!(
        h.notifier.events(),
        vec![EventType::WorkflowStarted, EventType::WorkflowCompleted]
    );
    let done = h.notifier.last();
    assert_eq!(done.data["workflowId"], json!(wf.id));
    assert_eq!(done.data["workflowName"], "New Hire Approval Process");
    assert!(done.data.get("error").is_none());
}

#[tokio::test]
async fn failed_run_announces_the_error() {
    let h = harness(ScriptedExecutor::default().failing("approval-1", "approver on leave")).await;

    h.engine.run(&sample_workflow(), None).await.unwrap_err();

    let failed = h.notifier.last();
    assert_eq!(failed.event, EventType::WorkflowFailed);
    assert!(failed.data["error"]
        .as_str()
        .unwrap()
        .contains("approver on leave"));
}
