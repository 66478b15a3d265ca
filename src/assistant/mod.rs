//! Hosted assistant provisioning.

pub mod provisioner;

pub use provisioner::{AssistantHost, CreateAssistantRequest, VapiProvisioner};
