//! Demo workflow: Form → Analyzing → Ready → LiveDemo.

pub mod orchestrator;
pub mod progress;
pub mod state;

pub use orchestrator::{Workflow, WorkflowDeps, WorkflowSnapshot};
pub use progress::ProgressTicker;
pub use state::{DeliveryStatus, WorkflowEvent, WorkflowStep};
