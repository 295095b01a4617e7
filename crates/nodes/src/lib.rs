//! `nodes` crate: workflow node model, the `NodeExecutor` trait and the
//! built-in per-type node behaviour.
//!
//! The engine crate dispatches every visited node through a [`NodeExecutor`]
//! trait object; [`BuiltinExecutor`] is the production implementation.

pub mod builtin;
pub mod error;
pub mod mock;
pub mod model;
pub mod path;
pub mod traits;

pub use builtin::{BuiltinExecutor, LatencyConfig};
pub use error::NodeError;
pub use model::{NodeKind, WorkflowNode};
pub use traits::{NodeExecutor, NodeOutput};
