//! `engine` crate: workflow domain model, condition evaluation, trigger
//! gating, and the graph-walking execution engine.

pub mod condition;
pub mod dag;
pub mod error;
pub mod executor;
pub mod models;
pub mod sample;
pub mod service;
pub mod trigger;

pub use condition::ConditionEvaluator;
pub use dag::{validate_graph, GraphReport, GraphWarning};
pub use error::EngineError;
pub use executor::{EngineConfig, RunSummary, WorkflowEngine};
pub use models::{NodeKind, Workflow, WorkflowEdge, WorkflowNode};
pub use sample::sample_workflow;
pub use service::{TriggerOutcome, WorkflowService};
pub use trigger::{can_trigger, TriggerKind};

#[cfg(test)]
mod executor_tests;
