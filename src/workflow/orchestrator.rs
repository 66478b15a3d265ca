//! Workflow orchestrator — drives one demo session from form to live call.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock, broadcast};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::progress::ProgressTicker;
use super::state::{DeliveryStatus, WorkflowEvent, WorkflowStep};
use crate::assistant::AssistantHost;
use crate::call::{CallController, CallSnapshot};
use crate::config::WorkflowConfig;
use crate::error::WorkflowError;
use crate::notify::{self, Notification, Notifier, SecureDemoRequest};
use crate::profile::{AgentProfile, ProfileDeriver, UserData};

const EVENT_CAPACITY: usize = 128;

/// Collaborators the workflow calls out to.
pub struct WorkflowDeps {
    pub deriver: Arc<ProfileDeriver>,
    pub host: Arc<dyn AssistantHost>,
    pub notifier: Arc<dyn Notifier>,
    pub call: CallController,
}

#[derive(Debug, Default)]
struct WorkflowState {
    step: WorkflowStep,
    user: Option<UserData>,
    profile: Option<AgentProfile>,
    error: Option<String>,
    delivery: DeliveryStatus,
    run_id: Option<Uuid>,
}

/// Everything the front-end needs to render the current screen.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSnapshot {
    pub step: WorkflowStep,
    pub user_data: Option<UserData>,
    pub agent_profile: Option<AgentProfile>,
    pub error: Option<String>,
    pub delivery: DeliveryStatus,
    pub call: CallSnapshot,
}

/// Owns the session state. All mutation goes through here.
pub struct Workflow {
    deps: WorkflowDeps,
    config: WorkflowConfig,
    state: RwLock<WorkflowState>,
    tx: broadcast::Sender<WorkflowEvent>,
    ticker: Mutex<Option<ProgressTicker>>,
}

impl Workflow {
    pub fn new(deps: WorkflowDeps, config: WorkflowConfig) -> Arc<Self> {
        let (tx, _rx) = broadcast::channel(EVENT_CAPACITY);
        Arc::new(Self {
            deps,
            config,
            state: RwLock::new(WorkflowState::default()),
            tx,
            ticker: Mutex::new(None),
        })
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.tx.subscribe()
    }

    pub fn call(&self) -> &CallController {
        &self.deps.call
    }

    pub async fn step(&self) -> WorkflowStep {
        self.state.read().await.step
    }

    pub async fn snapshot(&self) -> WorkflowSnapshot {
        let call = self.deps.call.snapshot().await;
        let state = self.state.read().await;
        WorkflowSnapshot {
            step: state.step,
            user_data: state.user.clone(),
            agent_profile: state.profile.clone(),
            error: state.error.clone(),
            delivery: state.delivery,
            call,
        }
    }

    /// Accept the contact form and start the analysis in the background.
    ///
    /// Returns once the step is `analyzing`; the outcome arrives as events.
    pub async fn submit_form(self: &Arc<Self>, user: UserData) -> Result<(), WorkflowError> {
        user.validate().map_err(WorkflowError::InvalidInput)?;

        let run_id = Uuid::new_v4();
        {
            let mut state = self.state.write().await;
            self.transition(&mut state, WorkflowStep::Analyzing, "submit the form")?;
            state.user = Some(user.clone());
            state.profile = None;
            state.error = None;
            state.delivery = DeliveryStatus::Idle;
            state.run_id = Some(run_id);
        }
        info!(run_id = %run_id, website = %user.website, "Form submitted");

        notify::dispatch(
            Arc::clone(&self.deps.notifier),
            Notification::form_submitted(&user),
        );

        *self.ticker.lock().await = Some(ProgressTicker::start(self.tx.clone()));
        tokio::spawn(Arc::clone(self).run_pipeline(run_id, user));
        Ok(())
    }

    async fn analyze(&self, user: &UserData) -> Result<AgentProfile, WorkflowError> {
        let profile = self.deps.deriver.derive(user).await?;
        debug!(company = %profile.company_name, "Profile derived");
        let assistant_id = self.deps.host.create_assistant(&profile).await?;
        Ok(profile.with_assistant_id(assistant_id))
    }

    async fn run_pipeline(self: Arc<Self>, run_id: Uuid, user: UserData) {
        let outcome = self.analyze(&user).await;
        self.ticker.lock().await.take();

        match outcome {
            Ok(profile) => {
                info!(
                    run_id = %run_id,
                    company = %profile.company_name,
                    assistant_id = ?profile.assistant_id,
                    "Analysis complete"
                );
                {
                    let mut state = self.state.write().await;
                    if state.run_id != Some(run_id) {
                        return;
                    }
                    state.profile = Some(profile.clone());
                    if let Err(e) = self.transition(&mut state, WorkflowStep::Ready, "finish analysis") {
                        warn!(error = %e, "Dropping analysis result");
                        return;
                    }
                }
                let _ = self.tx.send(WorkflowEvent::ProfileReady { profile });

                tokio::time::sleep(self.config.ready_delay).await;

                let mut state = self.state.write().await;
                if state.run_id == Some(run_id) && state.step == WorkflowStep::Ready {
                    let _ = self.transition(&mut state, WorkflowStep::LiveDemo, "open the live demo");
                }
            }
            Err(e) => {
                error!(run_id = %run_id, error = %e, "Analysis failed");
                let message = format!("Fehler: {e}");
                let mut state = self.state.write().await;
                if state.run_id != Some(run_id) {
                    return;
                }
                state.user = None;
                state.profile = None;
                state.error = Some(message.clone());
                state.run_id = None;
                let _ = self.transition(&mut state, WorkflowStep::Form, "report a failure");
                let _ = self.tx.send(WorkflowEvent::Failed { message });
            }
        }
    }

    /// Dismiss the stored failure message.
    pub async fn acknowledge_error(&self) {
        self.state.write().await.error = None;
    }

    /// Leave the live demo and start over with an empty form.
    pub async fn go_back(&self) -> Result<(), WorkflowError> {
        {
            let mut state = self.state.write().await;
            self.transition(&mut state, WorkflowStep::Form, "go back")?;
            state.user = None;
            state.profile = None;
            state.error = None;
            state.delivery = DeliveryStatus::Idle;
            state.run_id = None;
        }
        self.deps.call.stop().await;
        self.deps.call.reset().await;
        Ok(())
    }

    async fn live_assistant_id(&self, action: &str) -> Result<Option<String>, WorkflowError> {
        let state = self.state.read().await;
        if state.step != WorkflowStep::LiveDemo {
            return Err(WorkflowError::InvalidStep {
                action: action.to_string(),
                step: state.step,
            });
        }
        Ok(state.profile.as_ref().and_then(|p| p.assistant_id.clone()))
    }

    /// Start the call if idle, stop it if active.
    pub async fn toggle_call(&self) -> Result<CallSnapshot, WorkflowError> {
        let assistant_id = self.live_assistant_id("toggle the call").await?;
        self.deps.call.toggle(assistant_id.as_deref()).await;
        Ok(self.deps.call.snapshot().await)
    }

    pub async fn stop_call(&self) -> Result<CallSnapshot, WorkflowError> {
        self.live_assistant_id("stop the call").await?;
        self.deps.call.stop().await;
        Ok(self.deps.call.snapshot().await)
    }

    pub async fn reset_call(&self) -> Result<CallSnapshot, WorkflowError> {
        self.live_assistant_id("reset the call").await?;
        self.deps.call.reset().await;
        Ok(self.deps.call.snapshot().await)
    }

    /// Forward the lead to the collector. Only the first request is sent.
    ///
    /// The status becomes `sent` even when delivery fails.
    pub async fn request_secure_demo(&self) -> Result<DeliveryStatus, WorkflowError> {
        let (request, run_id) = {
            let mut state = self.state.write().await;
            if state.step != WorkflowStep::LiveDemo {
                return Err(WorkflowError::InvalidStep {
                    action: "secure the demo".to_string(),
                    step: state.step,
                });
            }
            if state.delivery != DeliveryStatus::Idle {
                return Ok(state.delivery);
            }
            let (Some(user), Some(profile)) = (&state.user, &state.profile) else {
                return Err(WorkflowError::InvalidStep {
                    action: "secure the demo without a profile".to_string(),
                    step: state.step,
                });
            };
            let request = SecureDemoRequest::new(user, profile);
            state.delivery = DeliveryStatus::Sending;
            let _ = self.tx.send(WorkflowEvent::DeliveryChanged {
                status: DeliveryStatus::Sending,
            });
            (request, state.run_id)
        };

        let notification = Notification::SecureDemoRequested(request);
        match self.deps.notifier.deliver(&notification).await {
            Ok(()) => info!("Secure demo request delivered"),
            Err(e) => warn!(error = %e, "Secure demo delivery failed, reporting as sent"),
        }

        let mut state = self.state.write().await;
        if state.run_id == run_id && state.delivery == DeliveryStatus::Sending {
            state.delivery = DeliveryStatus::Sent;
            let _ = self.tx.send(WorkflowEvent::DeliveryChanged {
                status: DeliveryStatus::Sent,
            });
        }
        Ok(state.delivery)
    }

    fn transition(
        &self,
        state: &mut WorkflowState,
        to: WorkflowStep,
        action: &str,
    ) -> Result<(), WorkflowError> {
        if !state.step.can_transition_to(to) {
            return Err(WorkflowError::InvalidStep {
                action: action.to_string(),
                step: state.step,
            });
        }
        info!(from = %state.step, to = %to, "Workflow step changed");
        state.step = to;
        let _ = self.tx.send(WorkflowEvent::StepChanged { step: to });
        Ok(())
    }
}
