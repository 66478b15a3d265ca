//! Workflow step machine — which screen the visitor is on.

use serde::{Deserialize, Serialize};

use crate::profile::AgentProfile;

/// The steps of a demo session.
///
/// Progresses Form → Analyzing → Ready → LiveDemo. A failed analysis returns
/// to Form, and leaving the live demo starts over at Form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStep {
    #[default]
    Form,
    Analyzing,
    Ready,
    LiveDemo,
}

impl WorkflowStep {
    /// Check if a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: WorkflowStep) -> bool {
        use WorkflowStep::*;
        matches!(
            (self, target),
            (Form, Analyzing)
                | (Analyzing, Ready)
                | (Analyzing, Form)
                | (Ready, LiveDemo)
                | (LiveDemo, Form)
        )
    }
}

impl std::fmt::Display for WorkflowStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Form => "form",
            Self::Analyzing => "analyzing",
            Self::Ready => "ready",
            Self::LiveDemo => "live_demo",
        };
        write!(f, "{s}")
    }
}

/// Send state of the "secure demo" request. Not persisted, never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    #[default]
    Idle,
    Sending,
    Sent,
}

/// Events pushed to the front-end while the workflow runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowEvent {
    StepChanged { step: WorkflowStep },
    /// Cosmetic analysis progress.
    Progress { percent: u8, status: String },
    ProfileReady { profile: AgentProfile },
    /// The analysis failed; the message must be acknowledged by the visitor.
    Failed { message: String },
    DeliveryChanged { status: DeliveryStatus },
}
