//! Trigger gating: does an incoming event qualify to start a run?

use std::fmt;

use serde::{Deserialize, Serialize};

use nodes::NodeOutput;

/// How a workflow run was requested.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TriggerKind {
    /// Inbound HTTP call carrying a payload.
    Webhook,
    /// Fired by an external scheduler.
    Schedule,
    /// Started by a user.
    Manual,
    /// Submission of a form; the payload must carry `formData`.
    Form,
    Unknown(String),
}

impl TriggerKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Webhook => "webhook",
            Self::Schedule => "schedule",
            Self::Manual => "manual",
            Self::Form => "form",
            Self::Unknown(other) => other,
        }
    }

    /// Whether `data` is acceptable for this kind of trigger.
    pub fn admits(&self, data: Option<&NodeOutput>) -> bool {
        match self {
            Self::Webhook => data.is_some_and(|d| !d.is_empty()),
            Self::Schedule | Self::Manual => true,
            Self::Form => data.is_some_and(|d| d.contains_key("formData")),
            Self::Unknown(_) => false,
        }
    }
}

impl From<&str> for TriggerKind {
    fn from(s: &str) -> Self {
        match s {
            "webhook" => Self::Webhook,
            "schedule" => Self::Schedule,
            "manual" => Self::Manual,
            "form" => Self::Form,
            other => Self::Unknown(other.to_owned()),
        }
    }
}

impl From<String> for TriggerKind {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<TriggerKind> for String {
    fn from(kind: TriggerKind) -> Self {
        kind.as_str().to_owned()
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decide whether an event of `trigger_type` carrying `data` may start a run.
pub fn can_trigger(trigger_type: &str, data: Option<&NodeOutput>) -> bool {
    TriggerKind::from(trigger_type).admits(data)
}
