//! Cosmetic progress ticker shown while the analysis runs.

use std::time::Duration;

use rand::Rng;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use super::state::WorkflowEvent;

const TICK: Duration = Duration::from_millis(800);
const MAX_STEP: f32 = 10.0;
const CEILING: f32 = 90.0;

const INITIAL_STATUS: &str = "System initialisiert...";

/// Status lines and when they appear, relative to the ticker's start.
const STATUS_TIMELINE: [(Duration, &str); 4] = [
    (Duration::from_millis(1000), "Webseite wird analysiert..."),
    (Duration::from_millis(3000), "Geschäftslogik wird extrahiert..."),
    (Duration::from_millis(5000), "KI-Telefonassistenz wird konfiguriert..."),
    (Duration::from_millis(7000), "Interface wird finalisiert..."),
];

/// Repeating progress task. Aborted when dropped.
pub struct ProgressTicker {
    handle: JoinHandle<()>,
}

impl ProgressTicker {
    /// Must be called from within a tokio runtime.
    pub fn start(tx: broadcast::Sender<WorkflowEvent>) -> Self {
        let handle = tokio::spawn(run(tx));
        Self { handle }
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl Drop for ProgressTicker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Advance by a random amount, never past the ceiling.
fn advance(percent: f32, step: f32) -> f32 {
    if percent >= CEILING {
        percent
    } else {
        (percent + step).min(CEILING)
    }
}

fn emit(tx: &broadcast::Sender<WorkflowEvent>, percent: f32, status: &str) {
    let _ = tx.send(WorkflowEvent::Progress {
        percent: percent.round() as u8,
        status: status.to_string(),
    });
}

async fn run(tx: broadcast::Sender<WorkflowEvent>) {
    let started = Instant::now();
    let mut percent = 0.0_f32;
    let mut status = INITIAL_STATUS;
    emit(&tx, percent, status);

    let mut ticker = tokio::time::interval(TICK);
    // Skip immediate first tick
    ticker.tick().await;

    let mut timeline = STATUS_TIMELINE.iter();
    let mut next_status = timeline.next();

    loop {
        let deadline = next_status.map(|(at, _)| started + *at);
        let milestone = async move {
            match deadline {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending::<()>().await,
            }
        };

        tokio::select! {
            _ = ticker.tick() => {
                let step = rand::thread_rng().gen_range(0.0..MAX_STEP);
                percent = advance(percent, step);
            }
            _ = milestone => {
                if let Some((_, text)) = next_status {
                    status = text;
                }
                next_status = timeline.next();
            }
        }
        emit(&tx, percent, status);
    }
}
