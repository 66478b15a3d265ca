//! Creates persistent voice assistants on the Vapi assistant API.

use async_trait::async_trait;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::config::VapiConfig;
use crate::error::{ConfigError, ProvisionError};
use crate::profile::AgentProfile;

/// Something that can host a voice assistant for a profile.
#[async_trait]
pub trait AssistantHost: Send + Sync {
    /// Create the assistant and return its identifier.
    async fn create_assistant(&self, profile: &AgentProfile) -> Result<String, ProvisionError>;
}

/// Body of `POST /assistant`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssistantRequest {
    pub name: String,
    pub model: ModelBlock,
    pub voice: VoiceBlock,
    pub first_message: String,
    pub transcriber: TranscriberBlock,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelBlock {
    pub provider: String,
    pub model: String,
    pub messages: Vec<SeedMessage>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeedMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VoiceBlock {
    pub provider: String,
    pub voice_id: String,
    pub model: String,
    pub stability: f32,
    pub similarity_boost: f32,
}

#[derive(Debug, Clone, Serialize)]
pub struct TranscriberBlock {
    pub provider: String,
    pub model: String,
    pub language: String,
}

impl CreateAssistantRequest {
    pub fn from_profile(profile: &AgentProfile, config: &VapiConfig) -> Self {
        Self {
            name: profile.company_name.clone(),
            model: ModelBlock {
                provider: config.model_provider.clone(),
                model: config.model.clone(),
                messages: vec![SeedMessage {
                    role: "system".to_string(),
                    content: profile.system_instruction.clone(),
                }],
            },
            voice: VoiceBlock {
                provider: config.voice.provider.clone(),
                voice_id: config.voice.voice_id.clone(),
                model: config.voice.model.clone(),
                stability: config.voice.stability,
                similarity_boost: config.voice.similarity_boost,
            },
            first_message: profile.welcome_message.clone(),
            transcriber: TranscriberBlock {
                provider: config.transcriber.provider.clone(),
                model: config.transcriber.model.clone(),
                language: config.transcriber.language.clone(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatedAssistant {
    id: Option<String>,
}

/// Extract the `message` field of a Vapi error body. Vapi sends either a
/// string or a list of validation messages.
fn api_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("message")? {
        serde_json::Value::String(s) if !s.is_empty() => Some(s.clone()),
        serde_json::Value::Array(items) => {
            let joined = items
                .iter()
                .filter_map(|v| v.as_str())
                .collect::<Vec<_>>()
                .join("; ");
            (!joined.is_empty()).then_some(joined)
        }
        _ => None,
    }
}

/// `AssistantHost` backed by the Vapi REST API.
pub struct VapiProvisioner {
    client: reqwest::Client,
    config: VapiConfig,
}

impl VapiProvisioner {
    pub fn new(config: VapiConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/assistant", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl AssistantHost for VapiProvisioner {
    async fn create_assistant(&self, profile: &AgentProfile) -> Result<String, ProvisionError> {
        let Some(private_key) = self.config.private_key.as_ref() else {
            warn!("VAPI_PRIVATE_KEY is missing, cannot create assistant");
            return Err(ConfigError::MissingCredential {
                key: "VAPI_PRIVATE_KEY".to_string(),
                hint: "Assistent kann nicht erstellt werden.".to_string(),
            }
            .into());
        };

        let body = CreateAssistantRequest::from_profile(profile, &self.config);
        info!(company = %profile.company_name, "Creating hosted assistant");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(private_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| ProvisionError::Http(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = api_error_message(&text)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
            warn!(status = status.as_u16(), message = %message, "Assistant creation rejected");
            return Err(ProvisionError::Api(message));
        }

        let created: CreatedAssistant = response
            .json()
            .await
            .map_err(|e| ProvisionError::InvalidResponse(e.to_string()))?;

        let id = created
            .id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ProvisionError::InvalidResponse("missing assistant id".to_string()))?;

        info!(assistant_id = %id, "Hosted assistant created");
        Ok(id)
    }
}
