use std::sync::Arc;

use anyhow::Context;

use voice_agent_demo::assistant::VapiProvisioner;
use voice_agent_demo::call::{CallController, VapiWebSession};
use voice_agent_demo::config::DemoConfig;
use voice_agent_demo::llm::{GeminiClient, GenerationService};
use voice_agent_demo::notify::WebhookNotifier;
use voice_agent_demo::profile::ProfileDeriver;
use voice_agent_demo::web::{AppState, demo_routes};
use voice_agent_demo::workflow::{Workflow, WorkflowDeps};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = DemoConfig::from_env().context("Invalid configuration")?;

    if config.gemini.api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY not set, every analysis will fail");
    }
    if config.vapi.private_key.is_none() {
        tracing::warn!("VAPI_PRIVATE_KEY not set, assistants cannot be created");
    }
    if config.vapi.public_key.is_none() {
        tracing::warn!("VAPI_PUBLIC_KEY not set, calls cannot be started");
    }

    let llm = Arc::new(GeminiClient::new(&config.gemini));
    eprintln!("📞 Voice Agent Demo v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   Model: {}", llm.model_name());
    eprintln!("   API:   http://0.0.0.0:{}/api/workflow", config.server.port);
    eprintln!("   WS:    ws://0.0.0.0:{}/ws\n", config.server.port);

    let session = Arc::new(VapiWebSession::new(&config.vapi));
    let session_events = session.event_source();

    let workflow = Workflow::new(
        WorkflowDeps {
            deriver: Arc::new(ProfileDeriver::new(llm)),
            host: Arc::new(VapiProvisioner::new(config.vapi.clone())),
            notifier: Arc::new(WebhookNotifier::new(config.webhooks.clone())),
            call: CallController::new(session),
        },
        config.workflow.clone(),
    );

    let app = demo_routes(AppState {
        workflow,
        session_events: Some(session_events),
    });

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.server.port))
        .await
        .context("Failed to bind server port")?;
    tracing::info!(port = config.server.port, "Demo server started");
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
