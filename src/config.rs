//! Configuration types, read from the environment.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Complete service configuration.
#[derive(Debug, Clone, Default)]
pub struct DemoConfig {
    pub gemini: GeminiConfig,
    pub vapi: VapiConfig,
    pub webhooks: WebhookConfig,
    pub workflow: WorkflowConfig,
    pub server: ServerConfig,
}

impl DemoConfig {
    /// Load every section from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            gemini: GeminiConfig::from_env(),
            vapi: VapiConfig::from_env(),
            webhooks: WebhookConfig::from_env(),
            workflow: WorkflowConfig::from_env()?,
            server: ServerConfig::from_env()?,
        })
    }
}

/// Text-generation service (Gemini) settings.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// `None` means every generation call fails with a configuration error.
    pub api_key: Option<SecretString>,
    pub model: String,
    pub base_url: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gemini-2.5-flash".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
        }
    }
}

impl GeminiConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let api_key = secret_var("GEMINI_API_KEY").or_else(|| secret_var("API_KEY"));
        Self {
            api_key,
            model: std::env::var("GEMINI_MODEL").unwrap_or(defaults.model),
            base_url: std::env::var("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
        }
    }
}

/// Speech-synthesis voice block of a created assistant.
#[derive(Debug, Clone)]
pub struct VoiceSettings {
    pub provider: String,
    pub voice_id: String,
    pub model: String,
    pub stability: f32,
    pub similarity_boost: f32,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            provider: "11labs".to_string(),
            // Works with the multilingual model, which German needs.
            voice_id: "21m00Tcm4TlvDq8ikWAM".to_string(),
            model: "eleven_multilingual_v2".to_string(),
            stability: 0.5,
            similarity_boost: 0.75,
        }
    }
}

/// Speech-to-text block of a created assistant.
#[derive(Debug, Clone)]
pub struct TranscriberSettings {
    pub provider: String,
    pub model: String,
    pub language: String,
}

impl Default for TranscriberSettings {
    fn default() -> Self {
        Self {
            provider: "deepgram".to_string(),
            model: "nova-2".to_string(),
            language: "de".to_string(),
        }
    }
}

/// Assistant-hosting API (Vapi) settings.
#[derive(Debug, Clone)]
pub struct VapiConfig {
    /// Server-side key used to create assistants.
    pub private_key: Option<SecretString>,
    /// Client key used to open web calls.
    pub public_key: Option<SecretString>,
    pub base_url: String,
    pub model_provider: String,
    pub model: String,
    pub voice: VoiceSettings,
    pub transcriber: TranscriberSettings,
}

impl Default for VapiConfig {
    fn default() -> Self {
        Self {
            private_key: None,
            public_key: None,
            base_url: "https://api.vapi.ai".to_string(),
            model_provider: "google".to_string(),
            model: "gemini-2.0-flash-exp".to_string(),
            voice: VoiceSettings::default(),
            transcriber: TranscriberSettings::default(),
        }
    }
}

impl VapiConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            private_key: secret_var("VAPI_PRIVATE_KEY"),
            public_key: secret_var("VAPI_PUBLIC_KEY"),
            base_url: std::env::var("VAPI_BASE_URL").unwrap_or(defaults.base_url),
            ..defaults
        }
    }
}

/// Fire-and-forget webhook targets. Unset targets are skipped.
#[derive(Debug, Clone, Default)]
pub struct WebhookConfig {
    pub form_submitted_url: Option<String>,
    pub secure_demo_url: Option<String>,
}

impl WebhookConfig {
    pub fn from_env() -> Self {
        Self {
            form_submitted_url: non_empty_var("DEMO_FORM_WEBHOOK_URL"),
            secure_demo_url: non_empty_var("DEMO_SECURE_WEBHOOK_URL"),
        }
    }
}

/// Step machine timing.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// How long the `Ready` step is shown before switching to the live demo.
    pub ready_delay: Duration,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            ready_delay: Duration::from_millis(1500),
        }
    }
}

impl WorkflowConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let ready_delay = match non_empty_var("DEMO_READY_DELAY_MS") {
            Some(raw) => Duration::from_millis(parse_var("DEMO_READY_DELAY_MS", &raw)?),
            None => Self::default().ready_delay,
        };
        Ok(Self { ready_delay })
    }
}

/// HTTP listener settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 8080 }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match non_empty_var("DEMO_PORT") {
            Some(raw) => parse_var("DEMO_PORT", &raw)?,
            None => Self::default().port,
        };
        Ok(Self { port })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn secret_var(key: &str) -> Option<SecretString> {
    non_empty_var(key).map(SecretString::from)
}

fn parse_var<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}
