//! Built-in demo workflow used by the CLI and tests.

use serde_json::json;

use crate::models::{Workflow, WorkflowEdge, WorkflowNode};

/// The five-node "New Hire Approval Process".
///
/// `condition-1` checks the submitted form's `position` field, which
/// reaches it through `approval-1`'s `input`.
///
/// ```text
/// start-1 → approval-1 → condition-1 ─(true)→ hr-approval-1 → end-1
///                                    └(false)→ end-1
/// ```
pub fn sample_workflow() -> Workflow {
    let nodes = vec![
        WorkflowNode::new(
            "start-1",
            "trigger",
            "Application Received",
            json!({ "triggerType": "form", "formName": "Job Application" }),
        )
        .at(100.0, 100.0),
        WorkflowNode::new(
            "approval-1",
            "approval",
            "Manager Approval",
            json!({ "approver": "manager@example.com", "timeout": "24h" }),
        )
        .at(300.0, 100.0),
        WorkflowNode::new(
            "condition-1",
            "condition",
            "Position Applied",
            json!({
                "field": "input.triggerData.formData.position",
                "operator": "equals",
                "value": "Senior"
            }),
        )
        .at(500.0, 100.0),
        WorkflowNode::new(
            "hr-approval-1",
            "approval",
            "HR Final Approval",
            json!({ "approver": "hr@example.com", "timeout": "48h" }),
        )
        .at(700.0, 50.0),
        WorkflowNode::new("end-1", "end", "Process Complete", json!({})).at(900.0, 100.0),
    ];

    let edges = vec![
        WorkflowEdge::new("start-1", "approval-1"),
        WorkflowEdge::new("approval-1", "condition-1"),
        WorkflowEdge::new("condition-1", "hr-approval-1").when("conditionResult == true"),
        WorkflowEdge::new("condition-1", "end-1").when("conditionResult == false"),
        WorkflowEdge::new("hr-approval-1", "end-1"),
    ];

    let mut workflow = Workflow::new("New Hire Approval Process", nodes, edges);
    workflow.description = "Sample workflow for new employee approval process".into();
    workflow
}
