//! The agent control loop.
//!
//! One cooperative task per run: observe, think, validate, act, settle.
//! External control arrives through an [`AgentController`]: pause/resume
//! flips an atomic flag, cancellation flows through a watch channel and is
//! honored at the top of every iteration and inside every sleep.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use redress_api::{AppLauncher, DecisionTransport, EventSink, NullSink};
use redress_drivers::AccessibilityEngine;
use redress_types::{
    ActionOutcome, AgentEvent, AgentResult, CaseContext, PolicyDecision,
};
use tokio::sync::watch;
use tokio::time::{sleep, Instant};

use crate::channel::DecisionChannel;
use crate::dispatch::ActionExecutor;
use crate::format::format_for_llm;
use crate::policy::{PolicyConfig, SafetyPolicy};
use crate::prompt;

/// Pause poll cadence.
const PAUSE_SLICE_MS: u64 = 500;

/// Identical consecutive decisions tolerated before one is skipped.
const DUPLICATE_LIMIT: u32 = 3;

/// Unchanged screens tolerated before the model is nudged.
const STAGNATION_LIMIT: u32 = 3;

/// Consecutive decision-channel failures tolerated before giving up.
const MAX_DECISION_FAILURES: u32 = 5;

/// Backoff for transient decision failures: base doubling up to the cap.
const BACKOFF_BASE_MS: u64 = 3000;
const BACKOFF_CAP_MS: u64 = 30_000;

/// Post-action settle window.
const SETTLE_TIMEOUT_MS: u64 = 3000;

/// Own-app recovery: total window, poll cadence, relaunch cadence, extra
/// launch attempts after the first.
const RECOVERY_WINDOW_MS: u64 = 60_000;
const RECOVERY_POLL_MS: u64 = 1000;
const RECOVERY_RELAUNCH_MS: u64 = 8000;
const RECOVERY_EXTRA_LAUNCHES: u32 = 4;

/// Lifecycle of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentPhase {
    Idle,
    Running,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

/// External control surface of a running agent.
#[derive(Clone)]
pub struct AgentController {
    paused: Arc<AtomicBool>,
    cancel: Arc<watch::Sender<bool>>,
    phase: watch::Receiver<AgentPhase>,
}

impl AgentController {
    pub fn pause(&self) {
        self.paused.store(true, Ordering::SeqCst);
    }

    pub fn resume(&self) {
        self.paused.store(false, Ordering::SeqCst);
    }

    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    pub fn phase(&self) -> AgentPhase {
        *self.phase.borrow()
    }
}

/// Cooperative-cancellation marker.
struct Cancelled;

/// Drives one support case through the target app.
pub struct CaseAgent {
    engine: Arc<AccessibilityEngine>,
    channel: DecisionChannel,
    policy: SafetyPolicy,
    sink: Arc<dyn EventSink>,
    launcher: Option<Arc<dyn AppLauncher>>,
    /// The host app's own package; landing here means we fell out of the
    /// target app.
    own_package: Option<String>,
    paused: Arc<AtomicBool>,
    cancel: Arc<watch::Sender<bool>>,
    phase: Arc<watch::Sender<AgentPhase>>,
}

impl CaseAgent {
    pub fn new(engine: Arc<AccessibilityEngine>, transport: Arc<dyn DecisionTransport>) -> Self {
        let (cancel, _) = watch::channel(false);
        let (phase, _) = watch::channel(AgentPhase::Idle);
        Self {
            engine,
            channel: DecisionChannel::new(transport),
            policy: SafetyPolicy::default(),
            sink: Arc::new(NullSink),
            launcher: None,
            own_package: None,
            paused: Arc::new(AtomicBool::new(false)),
            cancel: Arc::new(cancel),
            phase: Arc::new(phase),
        }
    }

    pub fn with_policy(mut self, config: PolicyConfig) -> Self {
        self.policy = SafetyPolicy::new(config);
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_launcher(mut self, launcher: Arc<dyn AppLauncher>) -> Self {
        self.launcher = Some(launcher);
        self
    }

    pub fn with_own_package(mut self, package: &str) -> Self {
        self.own_package = Some(package.to_string());
        self
    }

    pub fn controller(&self) -> AgentController {
        AgentController {
            paused: self.paused.clone(),
            cancel: self.cancel.clone(),
            phase: self.phase.subscribe(),
        }
    }

    /// Runs the case to a terminal result.
    pub async fn run(&self, case: &CaseContext) -> AgentResult {
        self.set_phase(AgentPhase::Running);
        self.emit(AgentEvent::Started { case_id: case.case_id.clone() }).await;

        let result = match self.drive(case).await {
            Ok(result) => result,
            Err(Cancelled) => {
                self.emit(AgentEvent::Cancelled).await;
                AgentResult::Cancelled
            }
        };

        self.set_phase(match &result {
            AgentResult::Resolved { .. } | AgentResult::NeedsHumanReview { .. } => {
                AgentPhase::Completed
            }
            AgentResult::Failed { .. } => AgentPhase::Failed,
            AgentResult::Cancelled => AgentPhase::Cancelled,
        });
        result
    }

    async fn drive(&self, case: &CaseContext) -> Result<AgentResult, Cancelled> {
        let system_prompt = prompt::system_prompt(case);
        let executor = ActionExecutor::new(&self.engine);
        let max_iterations = self.policy.config().max_iterations;
        let min_delay = self.policy.config().min_action_delay_ms;

        let mut history: Vec<String> = Vec::new();
        let mut iterations: u32 = 0;
        let mut decision_failures: u32 = 0;
        let mut last_signature: Option<String> = None;
        let mut duplicate_count: u32 = 0;
        let mut last_fingerprint = None;
        let mut stagnant_count: u32 = 0;

        loop {
            self.check_cancelled()?;
            self.wait_while_paused().await?;

            // Observe.
            let screen = self.engine.capture_screen_state();
            self.emit(AgentEvent::ScreenCaptured {
                package_name: screen.package_name.clone(),
                element_count: screen.elements.len(),
            })
            .await;

            // Falling back into our own app means the target app is gone;
            // recovery does not consume iterations.
            if let Some(own) = &self.own_package {
                if !own.is_empty() && screen.package_name == *own {
                    if self.recover_target_app(own).await? {
                        continue;
                    }
                    return Ok(self.fail("could not open target app").await);
                }
            }

            // Stagnation nudge: the same fingerprint over and over means our
            // actions are not landing.
            let fingerprint = screen.fingerprint();
            if last_fingerprint == Some(fingerprint) {
                stagnant_count += 1;
            } else {
                stagnant_count = 1;
                last_fingerprint = Some(fingerprint);
            }
            if stagnant_count >= STAGNATION_LIMIT {
                history.push(
                    "NOTE: the screen has not changed after the last few actions; try something else"
                        .to_string(),
                );
                stagnant_count = 0;
            }

            // Think.
            let formatted = format_for_llm(&screen);
            self.emit(AgentEvent::ThinkingStarted).await;
            let user_message = prompt::user_message(
                case,
                &formatted,
                &history,
                iterations + 1,
                max_iterations,
            );

            let decision = match self
                .channel
                .decide(&system_prompt, &user_message, decision_failures)
                .await
            {
                Ok(decision) => {
                    decision_failures = 0;
                    decision
                }
                Err(error) => {
                    self.emit(AgentEvent::Error {
                        message: format!("decision request failed: {}", error),
                    })
                    .await;

                    if error.is_permanent() {
                        return Ok(self.fail(error.user_message()).await);
                    }

                    decision_failures += 1;
                    if decision_failures >= MAX_DECISION_FAILURES {
                        return Ok(self.fail(error.user_message()).await);
                    }

                    let backoff = (BACKOFF_BASE_MS << (decision_failures - 1)).min(BACKOFF_CAP_MS);
                    tracing::warn!(
                        failures = decision_failures,
                        backoff_ms = backoff,
                        "transient decision failure; backing off"
                    );
                    self.sleep_cancellable(backoff).await?;
                    continue;
                }
            };

            self.emit(AgentEvent::DecisionMade {
                action: decision.action.describe(),
                reasoning: decision.reasoning.clone(),
            })
            .await;

            // Validate.
            match self.policy.validate(iterations, &decision.action) {
                PolicyDecision::Allowed => {}
                PolicyDecision::NeedsApproval { reason } => {
                    self.emit(AgentEvent::ApprovalNeeded { reason: reason.clone() }).await;
                    return Ok(AgentResult::NeedsHumanReview {
                        reason,
                        iterations: iterations + 1,
                    });
                }
                PolicyDecision::Blocked { reason } => {
                    self.emit(AgentEvent::ActionBlocked { reason: reason.clone() }).await;
                    if iterations >= max_iterations {
                        return Ok(self.fail(&reason).await);
                    }
                    tracing::warn!(%reason, "action blocked by policy");
                    iterations += 1;
                    self.sleep_cancellable(min_delay).await?;
                    continue;
                }
            }

            // Oscillation guard.
            let signature = decision.action.describe();
            if last_signature.as_ref() == Some(&signature) {
                duplicate_count += 1;
            } else {
                last_signature = Some(signature.clone());
                duplicate_count = 1;
            }
            if duplicate_count >= DUPLICATE_LIMIT {
                history.push(format!("REPEATED ACTION SKIPPED: {}", signature));
                duplicate_count = 0;
                iterations += 1;
                self.sleep_cancellable(min_delay).await?;
                continue;
            }

            // Act.
            match executor.execute(&decision.action, &screen).await {
                ActionOutcome::Success => {
                    history.push(signature.clone());
                    self.emit(AgentEvent::ActionExecuted { description: signature, ok: true })
                        .await;
                }
                ActionOutcome::Failed { reason } => {
                    history.push(format!("FAILED: {} ({})", signature, reason));
                    self.emit(AgentEvent::ActionExecuted { description: signature, ok: false })
                        .await;
                }
                ActionOutcome::Resolved { summary } => {
                    iterations += 1;
                    self.emit(AgentEvent::Resolved { summary: summary.clone() }).await;
                    return Ok(AgentResult::Resolved { summary, iterations });
                }
                ActionOutcome::HumanReviewNeeded { reason, input_prompt } => {
                    iterations += 1;
                    self.emit(AgentEvent::HumanReviewRequested {
                        reason: reason.clone(),
                        input_prompt: input_prompt.clone(),
                    })
                    .await;
                    return Ok(AgentResult::NeedsHumanReview { reason, iterations });
                }
            }
            iterations += 1;

            // Pace, then let the screen settle before the next look.
            self.sleep_cancellable(min_delay).await?;
            self.engine.wait_for_content_change(SETTLE_TIMEOUT_MS).await;
        }
    }

    /// Brings the target app back to the foreground: launch, poll every
    /// second, relaunch every eight, give up after a minute.
    async fn recover_target_app(&self, own_package: &str) -> Result<bool, Cancelled> {
        tracing::warn!("landed in own app; attempting to reopen the target app");
        let deadline = Instant::now() + Duration::from_millis(RECOVERY_WINDOW_MS);
        let mut launches: u32 = 0;
        let mut next_launch = Instant::now();

        loop {
            self.check_cancelled()?;
            if Instant::now() >= deadline {
                return Ok(false);
            }

            if Instant::now() >= next_launch && launches <= RECOVERY_EXTRA_LAUNCHES {
                if let Some(launcher) = &self.launcher {
                    launcher.launch_target_app().await;
                }
                launches += 1;
                next_launch = Instant::now() + Duration::from_millis(RECOVERY_RELAUNCH_MS);
            }

            self.sleep_cancellable(RECOVERY_POLL_MS).await?;

            let screen = self.engine.capture_screen_state();
            if screen.package_name != own_package {
                return Ok(true);
            }
        }
    }

    async fn wait_while_paused(&self) -> Result<(), Cancelled> {
        if !self.paused.load(Ordering::SeqCst) {
            return Ok(());
        }
        self.set_phase(AgentPhase::Paused);
        while self.paused.load(Ordering::SeqCst) {
            self.sleep_cancellable(PAUSE_SLICE_MS).await?;
        }
        self.set_phase(AgentPhase::Running);
        Ok(())
    }

    fn check_cancelled(&self) -> Result<(), Cancelled> {
        if *self.cancel.borrow() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// A sleep that wakes immediately on cancellation.
    async fn sleep_cancellable(&self, ms: u64) -> Result<(), Cancelled> {
        let mut cancel_rx = self.cancel.subscribe();
        if *cancel_rx.borrow() {
            return Err(Cancelled);
        }
        tokio::select! {
            _ = sleep(Duration::from_millis(ms)) => Ok(()),
            _ = async {
                loop {
                    if cancel_rx.changed().await.is_err() {
                        // Controller gone; nothing can cancel us any more.
                        std::future::pending::<()>().await;
                    }
                    if *cancel_rx.borrow() {
                        break;
                    }
                }
            } => Err(Cancelled),
        }
    }

    async fn fail(&self, reason: &str) -> AgentResult {
        self.emit(AgentEvent::Failed { reason: reason.to_string() }).await;
        AgentResult::Failed { reason: reason.to_string() }
    }

    async fn emit(&self, event: AgentEvent) {
        if let Err(error) = self.sink.on_event(event).await {
            tracing::warn!(%error, "event sink failed");
        }
    }

    fn set_phase(&self, phase: AgentPhase) {
        self.phase.send_replace(phase);
    }
}
