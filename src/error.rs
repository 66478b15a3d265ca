//! Error types for the voice agent demo.

use crate::workflow::WorkflowStep;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Provisioning error: {0}")]
    Provision(#[from] ProvisionError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{key} fehlt. {hint}")]
    MissingCredential { key: String, hint: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors from the text-generation service.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

/// Errors from creating a hosted assistant.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Vapi API Error: {0}")]
    Api(String),

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Invalid response from assistant API: {0}")]
    InvalidResponse(String),
}

/// Errors from the real-time voice session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Failed to start call: {0}")]
    StartFailed(String),

    #[error("Keine Assistant ID gefunden.")]
    NoAssistant,
}

/// Errors from best-effort notification delivery.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("Webhook {kind} request failed: {reason}")]
    RequestFailed { kind: String, reason: String },

    #[error("Webhook {kind} rejected with status {status}")]
    Rejected { kind: String, status: u16 },
}

/// Workflow step machine errors.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Invalid form input: {0}")]
    InvalidInput(String),

    #[error("Cannot {action} while in step {step}")]
    InvalidStep { action: String, step: WorkflowStep },

    #[error(transparent)]
    Analysis(#[from] LlmError),

    #[error(transparent)]
    Provisioning(#[from] ProvisionError),
}

/// Result type alias for the demo service.
pub type Result<T> = std::result::Result<T, Error>;
